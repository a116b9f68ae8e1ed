//! # Page Rendering Tests
//!
//! Renders stored pages end to end: database row, block list, site chrome.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test pipeline_test
//! ```

use serde_json::json;

use crafty_kid::auth::{Role, Viewer};
use crafty_kid::block::{Block, BlockInstance, CtaSectionProps};
use crafty_kid::db::{create_test_connection_in_temporary_file, now_ms};
use crafty_kid::pages::{create_page, NewPage, PageStatus, Seo};
use crafty_kid::pipeline::render_page;
use crafty_kid::seed::run_seed;
use crafty_kid::AppError;

fn new_page(slug: &str, status: PageStatus, blocks: Vec<BlockInstance>) -> NewPage {
    NewPage {
        slug: slug.to_string(),
        title: format!("{} title", slug),
        status,
        seo: Seo::default(),
        publish_at_ms: None,
        blocks,
    }
}

fn cta(headline: &str) -> BlockInstance {
    BlockInstance::new(Block::CtaSection(CtaSectionProps {
        headline: headline.to_string(),
        ..Default::default()
    }))
}

#[tokio::test]
async fn test_empty_page_renders_chrome_only() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    create_page(&pool, &new_page("empty", PageStatus::Published, vec![]))
        .await
        .unwrap();

    let html = render_page(&pool, "empty", &Viewer::anonymous())
        .await
        .unwrap();

    assert!(html.contains("site-header"));
    assert!(html.contains("site-footer"));
    assert!(!html.contains(r#"class="block"#));
}

#[tokio::test]
async fn test_unknown_block_does_not_stop_later_blocks() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let unknown = BlockInstance::from_value(json!({
        "id": "legacy-1",
        "type": "CountdownTimer",
        "endsAt": 123
    }));
    assert!(!unknown.is_supported());

    let blocks = vec![cta("Before"), unknown, cta("After the unknown one")];
    create_page(&pool, &new_page("mixed", PageStatus::Published, blocks))
        .await
        .unwrap();

    let html = render_page(&pool, "mixed", &Viewer::anonymous())
        .await
        .unwrap();

    let before = html.find("Before").unwrap();
    let after = html.find("After the unknown one").unwrap();
    assert!(before < after);
    assert!(html.contains("<!-- unsupported block legacy-1"));
    assert!(!html.contains("Unsupported block:"));
}

#[tokio::test]
async fn test_seeded_faq_page_renders_all_items_in_order() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let report = run_seed(&pool).await;
    assert_eq!(report.failed, 0);

    let html = render_page(&pool, "faq", &Viewer::anonymous())
        .await
        .unwrap();

    assert_eq!(html.matches(r#"class="block faq-accordion""#).count(), 3);
    assert_eq!(html.matches(r#"class="faq-item""#).count(), 12);

    // Accordion sections keep their stored order
    let positions: Vec<usize> = ["faq-booking", "faq-payment", "faq-classes"]
        .iter()
        .map(|id| {
            html.find(&format!(r#"data-block-id="{}""#, id))
                .unwrap_or_else(|| panic!("missing block {}", id))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    assert_eq!(run_seed(&pool).await.failed, 0);
    assert_eq!(run_seed(&pool).await.failed, 0);

    let pages = crafty_kid::pages::list_pages(&pool).await.unwrap();
    let faq_count = pages.iter().filter(|p| p.slug == "faq").count();
    assert_eq!(faq_count, 1);
}

#[tokio::test]
async fn test_draft_page_hidden_from_public_visible_to_admin() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    create_page(
        &pool,
        &new_page("secret", PageStatus::Draft, vec![cta("Draft headline")]),
    )
    .await
    .unwrap();

    let public = render_page(&pool, "secret", &Viewer::anonymous()).await;
    assert!(matches!(public, Err(AppError::NotFound(_))));

    let parent = render_page(&pool, "secret", &Viewer::with_role("p1", Role::Parent)).await;
    assert!(matches!(parent, Err(AppError::NotFound(_))));

    let html = render_page(&pool, "secret", &Viewer::with_role("a1", Role::Admin))
        .await
        .unwrap();
    assert!(html.contains("Draft headline"));
}

#[tokio::test]
async fn test_missing_page_is_not_found() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let result = render_page(&pool, "nowhere", &Viewer::with_role("a1", Role::Admin)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_scheduled_page_visible_once_time_passes() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();

    let mut future = new_page("launch", PageStatus::Scheduled, vec![cta("Launching")]);
    future.publish_at_ms = Some(now_ms() + 3_600_000);
    create_page(&pool, &future).await.unwrap();

    let mut past = new_page("launched", PageStatus::Scheduled, vec![cta("Launched")]);
    past.publish_at_ms = Some(now_ms() - 1_000);
    create_page(&pool, &past).await.unwrap();

    let hidden = render_page(&pool, "launch", &Viewer::anonymous()).await;
    assert!(matches!(hidden, Err(AppError::NotFound(_))));

    let html = render_page(&pool, "launched", &Viewer::anonymous())
        .await
        .unwrap();
    assert!(html.contains("Launched"));
}

#[tokio::test]
async fn test_seo_title_used_for_document_title() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let mut page = new_page("about-us", PageStatus::Published, vec![]);
    page.seo = Seo {
        title: Some("About our makers".to_string()),
        description: Some("Who runs the classes".to_string()),
        keywords: vec!["crafts".to_string()],
    };
    create_page(&pool, &page).await.unwrap();

    let html = render_page(&pool, "about-us", &Viewer::anonymous())
        .await
        .unwrap();
    assert!(html.contains("<title>About our makers | "));
    assert!(html.contains(r#"content="Who runs the classes""#));
}
