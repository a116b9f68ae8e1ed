//! # HTTP Tests
//!
//! Starts the full router on an ephemeral port and talks to it with reqwest,
//! covering health, admin access control, sign-in redirects, the HTML form
//! redirects and the payment webhook.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test http_test
//! ```

use reqwest::{redirect::Policy, StatusCode};
use serde_json::json;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;

use crafty_kid::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use crafty_kid::config::AppConfig;
use crafty_kid::db::create_test_connection_in_temporary_file;
use crafty_kid::payment::WEBHOOK_SECRET_HEADER;
use crafty_kid::seed::run_seed;
use crafty_kid::serve::{build_router, AppState};

const WEBHOOK_SECRET: &str = "whsec_test";

fn test_config() -> AppConfig {
    toml::from_str(&format!(
        r#"
database_path = "unused.sqlite"
sign_in_url = "/sign-in"

[payment]
publishable_key = "pk_test"
webhook_secret = "{}"
"#,
        WEBHOOK_SECRET
    ))
    .unwrap()
}

/// Helper to serve a seeded database; returns the base URL and the temp dir guard
async fn start_server() -> (String, tempfile::TempDir) {
    let (base, _pool, guard) = start_server_with_pool().await;
    (base, guard)
}

/// Same as [`start_server`], also handing back the pool for direct lookups
async fn start_server_with_pool() -> (String, SqlitePool, tempfile::TempDir) {
    let (pool, guard) = create_test_connection_in_temporary_file().await.unwrap();
    assert_eq!(run_seed(&pool).await.failed, 0);

    let app = build_router(Arc::new(AppState {
        pool: pool.clone(),
        config: test_config(),
    }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), pool, guard)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (base, _guard) = start_server().await;
    let response = client()
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_public_pages_render() {
    let (base, _guard) = start_server().await;
    let client = client();

    let home = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(home.status(), StatusCode::OK);
    assert!(home.text().await.unwrap().contains("block hero-search"));

    let faq = client.get(format!("{}/faq", base)).send().await.unwrap();
    assert_eq!(faq.status(), StatusCode::OK);

    let missing = client
        .get(format!("{}/no-such-page", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_api_requires_admin() {
    let (base, _guard) = start_server().await;
    let client = client();
    let url = format!("{}/api/admin/pages", base);

    let anonymous = client.get(&url).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let parent = client
        .get(&url)
        .header(USER_ID_HEADER, "p-1")
        .header(USER_ROLE_HEADER, "parent")
        .send()
        .await
        .unwrap();
    assert_eq!(parent.status(), StatusCode::FORBIDDEN);

    let admin = client
        .get(&url)
        .header(USER_ID_HEADER, "a-1")
        .header(USER_ROLE_HEADER, "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
    let pages: serde_json::Value = admin.json().await.unwrap();
    assert!(pages
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["slug"] == "faq"));
}

#[tokio::test]
async fn test_create_page_duplicate_slug_conflicts() {
    let (base, _guard) = start_server().await;
    let client = client();
    let url = format!("{}/api/admin/pages", base);
    let body = json!({"slug": "summer-camp", "title": "Summer camp"});

    let created = client
        .post(&url)
        .header(USER_ID_HEADER, "a-1")
        .header(USER_ROLE_HEADER, "ADMIN")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = client
        .post(&url)
        .header(USER_ID_HEADER, "a-1")
        .header(USER_ROLE_HEADER, "ADMIN")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_webhook_secret_checked() {
    let (base, _guard) = start_server().await;
    let client = client();
    let url = format!("{}/api/payments/webhook", base);
    let event = json!({"booking_id": 1, "payment_reference": "pi_1", "status": "succeeded"});

    let missing = client.post(&url).json(&event).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .post(&url)
        .header(WEBHOOK_SECRET_HEADER, "not-the-secret")
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    // Right secret, unknown booking
    let unknown = client
        .post(&url)
        .header(WEBHOOK_SECRET_HEADER, WEBHOOK_SECRET)
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_html_redirects_to_sign_in() {
    let (base, _guard) = start_server().await;
    let response = client()
        .get(format!("{}/admin", base))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(location, "/sign-in?return_to=%2Fadmin");
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_booking_forms_redirect_with_see_other() {
    let (base, pool, _guard) = start_server_with_pool().await;
    let client = client();
    let schedule_id: i64 = sqlx::query_scalar(
        "SELECT id FROM class_schedules WHERE seats_remaining > 0 ORDER BY starts_at_ms LIMIT 1",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let reserved = client
        .post(format!("{}/booking/reserve", base))
        .header(USER_ID_HEADER, "parent-1")
        .header(USER_ROLE_HEADER, "parent")
        .form(&[("schedule_id", schedule_id.to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(reserved.status(), StatusCode::SEE_OTHER);
    let payment_url = location(&reserved).to_string();
    let booking_id: i64 = payment_url
        .strip_prefix("/booking/")
        .and_then(|rest| rest.strip_suffix("/payment"))
        .unwrap()
        .parse()
        .unwrap();

    let payment_page = client
        .get(format!("{}{}", base, payment_url))
        .header(USER_ID_HEADER, "parent-1")
        .header(USER_ROLE_HEADER, "parent")
        .send()
        .await
        .unwrap();
    assert_eq!(payment_page.status(), StatusCode::OK);

    let cancelled = client
        .post(format!("{}/booking/{}/cancel", base, booking_id))
        .header(USER_ID_HEADER, "parent-1")
        .header(USER_ROLE_HEADER, "parent")
        .send()
        .await
        .unwrap();
    assert_eq!(cancelled.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&cancelled),
        format!("/booking/{}/confirmation", booking_id)
    );
}

#[tokio::test]
async fn test_admin_op_form_redirects_to_editor() {
    let (base, pool, _guard) = start_server_with_pool().await;
    let response = client()
        .post(format!("{}/admin/pages/faq/ops", base))
        .header(USER_ID_HEADER, "a-1")
        .header(USER_ROLE_HEADER, "admin")
        .form(&[("op", "move_down"), ("id", "faq-booking")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/pages/faq");

    let page = crafty_kid::pages::require_page(&pool, "faq").await.unwrap();
    let ids: Vec<&str> = page.blocks.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids.iter().position(|id| *id == "faq-booking"), Some(1));
}

#[tokio::test]
async fn test_search_api() {
    let (base, _guard) = start_server().await;
    let response = client()
        .get(format!("{}/api/search?q=", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let results: serde_json::Value = response.json().await.unwrap();
    assert_eq!(results["classes"], json!([]));
    assert_eq!(results["instructors"], json!([]));
}
