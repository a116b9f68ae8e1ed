//! # Search Tests
//!
//! ```bash
//! cargo test --test search_test
//! ```

use sqlx::sqlite::SqlitePool;

use crafty_kid::catalog::{upsert_category, upsert_class, upsert_instructor, upsert_venue};
use crafty_kid::db::create_test_connection_in_temporary_file;
use crafty_kid::queries::catalog::ClassRow;
use crafty_kid::search::search;

/// Helper to create two published classes and one hidden draft
async fn create_catalog(pool: &SqlitePool) {
    let category_id = upsert_category(pool, "clay", "Clay & Pottery").await.unwrap();
    let venue_id = upsert_venue(pool, "Oak Studio", "5 Oak Rd", "Riverton")
        .await
        .unwrap();
    let instructor_id = upsert_instructor(
        pool,
        None,
        "Marta Kiln",
        "Potter for twenty years",
        None,
        "pottery, sculpture",
    )
    .await
    .unwrap();

    let classes = [
        ("Pottery Wheel Basics", "Throw your first bowl", true),
        ("Clay Creatures", "Hand-build a pottery pet", true),
        ("Secret Pottery Masterclass", "Not announced yet", false),
    ];
    for (title, description, is_published) in classes {
        upsert_class(
            pool,
            &ClassRow {
                title,
                description,
                category_id,
                instructor_id,
                venue_id,
                price_cents: 3000,
                min_age: 7,
                max_age: 12,
                image_url: None,
                is_published,
            },
        )
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    create_catalog(&pool).await;

    let results = search(&pool, "POTTERY").await.unwrap();
    let mut titles: Vec<&str> = results.classes.iter().map(|c| c.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Clay Creatures", "Pottery Wheel Basics"]);

    assert_eq!(results.instructors.len(), 1);
    assert_eq!(results.instructors[0].display_name, "Marta Kiln");
}

#[tokio::test]
async fn test_search_excludes_unpublished_classes() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    create_catalog(&pool).await;

    let results = search(&pool, "masterclass").await.unwrap();
    assert!(results.classes.is_empty());
}

#[tokio::test]
async fn test_empty_query_returns_nothing() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    create_catalog(&pool).await;

    for query in ["", "   "] {
        let results = search(&pool, query).await.unwrap();
        assert!(results.is_empty(), "query {:?} should match nothing", query);
    }
}

#[tokio::test]
async fn test_like_wildcards_are_literal() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    create_catalog(&pool).await;

    let results = search(&pool, "%").await.unwrap();
    assert!(results.is_empty());

    let results = search(&pool, "kiln").await.unwrap();
    assert!(results.classes.is_empty());
    assert_eq!(results.instructors.len(), 1);
}
