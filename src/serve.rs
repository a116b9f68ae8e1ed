use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc as StdArc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::auth::{ensure_user, sign_in_redirect, Viewer};
use crate::block::BlockInstance;
use crate::booking::{self, Booking};
use crate::catalog::{
    get_class_detail, get_instructor_detail, get_schedule, list_categories, list_classes,
};
use crate::config::AppConfig;
use crate::constants::HOME_SLUG;
use crate::db::{now_ms, open_and_prepare, DynError};
use crate::editor::{BlockEditor, EditOp};
use crate::error::AppError;
use crate::pages::{
    create_page, list_pages, require_page, save_blocks, update_page_meta, NewPage, Page,
    PageMetaUpdate,
};
use crate::payment::{apply_payment_event, verify_webhook_secret, PaymentEvent, PaymentForm};
use crate::pipeline::{render_page, resolve_render_context};
use crate::queries::catalog::ClassFilter;
use crate::render::render_blocks;
use crate::search::{search, SearchResults};
use crate::site::{load_site_settings, save_site_settings, SiteSettings};
use crate::views;

/// Shared state for every handler
pub struct AppState {
    pub pool: SqlitePool,
    pub config: AppConfig,
}

/// Open the database, start the reservation release task and serve HTTP
pub fn serve(config: AppConfig) -> Result<(), DynError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool = open_and_prepare(&config.database_path).await?;
        let port = config.port;

        spawn_reservation_release_task(
            pool.clone(),
            config.booking.reservation_hold_minutes,
            config.booking.release_interval_secs,
        );

        let app_state = StdArc::new(AppState { pool, config });
        let app = build_router(app_state);

        info!("Listening on: http://[::]:{} (IPv4 + IPv6)", port);
        let listener = tokio::net::TcpListener::bind(format!("[::]:{}", port))
            .await
            .map_err(|e| format!("Failed to bind to port {}: {}", port, e))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| format!("Server error: {}", e))?;

        Ok::<(), DynError>(())
    })
}

/// Periodically cancel unpaid reservations older than the hold window
fn spawn_reservation_release_task(pool: SqlitePool, hold_minutes: i64, interval_secs: u64) {
    info!(
        "Reservation release: every {}s, hold {} min",
        interval_secs, hold_minutes
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let cutoff = now_ms().saturating_sub(hold_minutes.saturating_mul(60_000));
            if let Err(e) = booking::release_expired_reservations(&pool, cutoff).await {
                error!("Failed to release expired reservations: {}", e);
            }
        }
    });
}

/// All routes; the JSON API gets a permissive CORS layer
pub fn build_router(app_state: StdArc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/search", get(search_api_handler))
        .route("/api/bookings", post(reserve_api_handler))
        .route("/api/bookings/{id}/cancel", post(cancel_api_handler))
        .route("/api/payments/webhook", post(payment_webhook_handler))
        .route(
            "/api/admin/pages",
            get(admin_list_pages_handler).post(admin_create_page_handler),
        )
        .route(
            "/api/admin/pages/{slug}",
            get(admin_get_page_handler).patch(admin_update_page_handler),
        )
        .route(
            "/api/admin/pages/{slug}/blocks",
            axum::routing::put(admin_put_blocks_handler),
        )
        .route("/api/admin/pages/{slug}/edits", post(admin_edits_handler))
        .route(
            "/api/admin/site",
            get(admin_get_site_handler).put(admin_put_site_handler),
        )
        .layer(cors);

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/", get(home_handler))
        .route("/classes", get(classes_handler))
        .route("/class/{id}", get(class_detail_handler))
        .route("/instructor/{id}", get(instructor_handler))
        .route("/search", get(search_page_handler))
        .route("/booking/reserve", post(reserve_form_handler))
        .route("/booking/{id}/payment", get(payment_page_handler))
        .route("/booking/{id}/confirmation", get(confirmation_page_handler))
        .route("/booking/{id}/cancel", post(cancel_form_handler))
        .route("/admin", get(admin_index_handler))
        .route("/admin/pages/{slug}", get(admin_editor_handler))
        .route("/admin/pages/{slug}/ops", post(admin_ops_form_handler))
        .route("/{slug}", get(page_handler))
        .merge(api_routes)
        .fallback(fallback_handler);

    if let Some(static_dir) = &app_state.config.static_dir {
        app = app.nest_service("/static", ServeDir::new(static_dir));
    }

    app.with_state(app_state)
}

// Health check endpoint - returns 200 OK if server is running
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// HTML helpers
// ============================================================================

/// Site settings for error pages; a broken settings row must not hide the error
async fn site_or_default(pool: &SqlitePool) -> SiteSettings {
    match load_site_settings(pool).await {
        Ok(site) => site,
        Err(e) => {
            error!("Failed to load site settings: {}", e);
            SiteSettings::default()
        }
    }
}

async fn html_error(state: &AppState, uri: &Uri, err: AppError) -> Response {
    if let AppError::Unauthenticated = err {
        let return_to = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        return Redirect::to(&sign_in_redirect(&state.config.sign_in_url, return_to))
            .into_response();
    }
    let status = err.status_code();
    if status.is_server_error() {
        error!("{} {}: {}", status, uri, err);
    }
    let site = site_or_default(&state.pool).await;
    (status, Html(views::error_page(&site, &err))).into_response()
}

/// Turn an HTML handler result into a response; unauthenticated visitors are
/// redirected to sign in and come back to `uri` afterwards
async fn html_response(
    state: &AppState,
    uri: &Uri,
    result: Result<String, AppError>,
) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(err) => html_error(state, uri, err).await,
    }
}

async fn fallback_handler(State(state): State<StdArc<AppState>>, uri: Uri) -> Response {
    html_error(&state, &uri, AppError::NotFound(uri.path().to_string())).await
}

// ============================================================================
// Public pages
// ============================================================================

async fn home_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result = render_page(&state.pool, HOME_SLUG, &viewer).await;
    html_response(&state, &uri, result).await
}

async fn page_handler(
    State(state): State<StdArc<AppState>>,
    Path(slug): Path<String>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result = render_page(&state.pool, &slug, &viewer).await;
    html_response(&state, &uri, result).await
}

#[derive(Debug, Deserialize)]
struct ClassesQuery {
    category: Option<String>,
}

async fn classes_handler(
    State(state): State<StdArc<AppState>>,
    Query(query): Query<ClassesQuery>,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        let category = query.category.as_deref().filter(|c| !c.is_empty());
        let classes = list_classes(
            &state.pool,
            &ClassFilter {
                category_slug: category,
                published_only: true,
                ..Default::default()
            },
        )
        .await?;
        let categories = list_categories(&state.pool).await?;
        let site = load_site_settings(&state.pool).await?;
        Ok(views::classes_page(&site, &classes, &categories, category))
    }
    .await;
    html_response(&state, &uri, result).await
}

async fn class_detail_handler(
    State(state): State<StdArc<AppState>>,
    Path(class_id): Path<i64>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        let detail =
            get_class_detail(&state.pool, class_id, viewer.is_editor(), now_ms()).await?;
        let site = load_site_settings(&state.pool).await?;
        Ok(views::class_detail_page(&site, &detail))
    }
    .await;
    html_response(&state, &uri, result).await
}

async fn instructor_handler(
    State(state): State<StdArc<AppState>>,
    Path(instructor_id): Path<i64>,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        let detail = get_instructor_detail(&state.pool, instructor_id).await?;
        let site = load_site_settings(&state.pool).await?;
        Ok(views::instructor_page(&site, &detail))
    }
    .await;
    html_response(&state, &uri, result).await
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_page_handler(
    State(state): State<StdArc<AppState>>,
    Query(query): Query<SearchQuery>,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        let results = search(&state.pool, &query.q).await?;
        let site = load_site_settings(&state.pool).await?;
        Ok(views::search_page(&site, &query.q, &results))
    }
    .await;
    html_response(&state, &uri, result).await
}

async fn search_api_handler(
    State(state): State<StdArc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    Ok(Json(search(&state.pool, &query.q).await?))
}

// ============================================================================
// Bookings and payment
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReserveRequest {
    schedule_id: i64,
}

async fn reserve_for_viewer(
    pool: &SqlitePool,
    viewer: &Viewer,
    schedule_id: i64,
) -> Result<Booking, AppError> {
    let identity = viewer.require_parent()?;
    ensure_user(pool, identity).await?;
    booking::reserve(pool, schedule_id, &identity.user_id).await
}

/// Load a booking the viewer owns (or any booking for an admin)
async fn owned_booking(
    pool: &SqlitePool,
    viewer: &Viewer,
    booking_id: i64,
) -> Result<Booking, AppError> {
    viewer.require_user()?;
    let booking = booking::require_booking(pool, booking_id).await?;
    viewer.require_owner(&booking.parent_id)?;
    Ok(booking)
}

async fn reserve_api_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = reserve_for_viewer(&state.pool, &viewer, request.schedule_id).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn reserve_form_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
    uri: Uri,
    Form(request): Form<ReserveRequest>,
) -> Response {
    match reserve_for_viewer(&state.pool, &viewer, request.schedule_id).await {
        Ok(booking) => {
            Redirect::to(&format!("/booking/{}/payment", booking.id)).into_response()
        }
        Err(AppError::Unauthenticated) => {
            // Come back to the class page rather than the POST-only endpoint
            let return_to = match get_schedule(&state.pool, request.schedule_id).await {
                Ok(Some(schedule)) => format!("/class/{}", schedule.class_id),
                _ => "/classes".to_string(),
            };
            Redirect::to(&sign_in_redirect(&state.config.sign_in_url, &return_to))
                .into_response()
        }
        Err(err) => html_error(&state, &uri, err).await,
    }
}

async fn cancel_api_handler(
    State(state): State<StdArc<AppState>>,
    Path(booking_id): Path<i64>,
    viewer: Viewer,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state.pool, &viewer, booking_id).await?;
    Ok(Json(booking::cancel(&state.pool, booking_id).await?))
}

async fn cancel_form_handler(
    State(state): State<StdArc<AppState>>,
    Path(booking_id): Path<i64>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result: Result<Booking, AppError> = async {
        owned_booking(&state.pool, &viewer, booking_id).await?;
        booking::cancel(&state.pool, booking_id).await
    }
    .await;
    match result {
        Ok(booking) => {
            Redirect::to(&format!("/booking/{}/confirmation", booking.id)).into_response()
        }
        Err(err) => html_error(&state, &uri, err).await,
    }
}

async fn payment_page_handler(
    State(state): State<StdArc<AppState>>,
    Path(booking_id): Path<i64>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        let booking = owned_booking(&state.pool, &viewer, booking_id).await?;
        let form = PaymentForm::for_booking(&booking, &state.config.payment);
        let site = load_site_settings(&state.pool).await?;
        Ok(views::payment_page(&site, &booking, &form))
    }
    .await;
    html_response(&state, &uri, result).await
}

async fn confirmation_page_handler(
    State(state): State<StdArc<AppState>>,
    Path(booking_id): Path<i64>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        let booking = owned_booking(&state.pool, &viewer, booking_id).await?;
        let site = load_site_settings(&state.pool).await?;
        Ok(views::confirmation_page(&site, &booking))
    }
    .await;
    html_response(&state, &uri, result).await
}

/// The secret is checked before the body is parsed
async fn payment_webhook_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    verify_webhook_secret(&headers, &state.config.payment.webhook_secret)?;
    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?;
    Ok(Json(apply_payment_event(&state.pool, &event).await?))
}

// ============================================================================
// Admin JSON API
// ============================================================================

async fn admin_list_pages_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
) -> Result<Json<Vec<Page>>, AppError> {
    viewer.require_admin()?;
    Ok(Json(list_pages(&state.pool).await?))
}

async fn admin_create_page_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
    Json(new_page): Json<NewPage>,
) -> Result<(StatusCode, Json<Page>), AppError> {
    viewer.require_admin()?;
    let page = create_page(&state.pool, &new_page).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn admin_get_page_handler(
    State(state): State<StdArc<AppState>>,
    Path(slug): Path<String>,
    viewer: Viewer,
) -> Result<Json<Page>, AppError> {
    viewer.require_admin()?;
    Ok(Json(require_page(&state.pool, &slug).await?))
}

async fn admin_update_page_handler(
    State(state): State<StdArc<AppState>>,
    Path(slug): Path<String>,
    viewer: Viewer,
    Json(update): Json<PageMetaUpdate>,
) -> Result<Json<Page>, AppError> {
    viewer.require_admin()?;
    Ok(Json(update_page_meta(&state.pool, &slug, &update).await?))
}

async fn admin_put_blocks_handler(
    State(state): State<StdArc<AppState>>,
    Path(slug): Path<String>,
    viewer: Viewer,
    Json(blocks): Json<Vec<BlockInstance>>,
) -> Result<Json<Page>, AppError> {
    viewer.require_admin()?;
    Ok(Json(save_blocks(&state.pool, &slug, &blocks).await?))
}

#[derive(Debug, Deserialize)]
struct EditsRequest {
    ops: Vec<EditOp>,
}

#[derive(Debug, Serialize)]
struct EditsResponse {
    page: Page,
    /// Ids of blocks created by `add` and `duplicate`, in op order
    created_ids: Vec<String>,
}

/// Apply all operations in memory, then save once; any failing op aborts the save
async fn admin_edits_handler(
    State(state): State<StdArc<AppState>>,
    Path(slug): Path<String>,
    viewer: Viewer,
    Json(request): Json<EditsRequest>,
) -> Result<Json<EditsResponse>, AppError> {
    viewer.require_admin()?;
    let page = require_page(&state.pool, &slug).await?;
    let mut editor = BlockEditor::load(&page);
    let mut created_ids = Vec::new();
    for op in &request.ops {
        if let Some(id) = editor.apply(op)? {
            created_ids.push(id);
        }
    }
    let page = editor.save(&state.pool, &slug).await?;
    Ok(Json(EditsResponse { page, created_ids }))
}

async fn admin_get_site_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
) -> Result<Json<SiteSettings>, AppError> {
    viewer.require_admin()?;
    Ok(Json(load_site_settings(&state.pool).await?))
}

async fn admin_put_site_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
    Json(settings): Json<SiteSettings>,
) -> Result<Json<SiteSettings>, AppError> {
    viewer.require_admin()?;
    save_site_settings(&state.pool, &settings).await?;
    Ok(Json(settings))
}

// ============================================================================
// Admin HTML editor
// ============================================================================

async fn admin_index_handler(
    State(state): State<StdArc<AppState>>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        viewer.require_admin()?;
        let pages = list_pages(&state.pool).await?;
        let site = load_site_settings(&state.pool).await?;
        Ok(views::admin_index_page(&site, &pages))
    }
    .await;
    html_response(&state, &uri, result).await
}

async fn render_editor(
    pool: &SqlitePool,
    page: &Page,
    message: Option<&str>,
) -> Result<String, AppError> {
    let ctx = resolve_render_context(pool, &page.blocks, true).await?;
    let preview = render_blocks(&page.blocks, &ctx);
    let site = load_site_settings(pool).await?;
    Ok(views::admin_editor_page(&site, page, &preview, message))
}

async fn admin_editor_handler(
    State(state): State<StdArc<AppState>>,
    Path(slug): Path<String>,
    viewer: Viewer,
    uri: Uri,
) -> Response {
    let result: Result<String, AppError> = async {
        viewer.require_admin()?;
        let page = require_page(&state.pool, &slug).await?;
        render_editor(&state.pool, &page, None).await
    }
    .await;
    html_response(&state, &uri, result).await
}

/// Apply one form-posted op and redirect back to the editor; a rejected op
/// re-renders the editor with the error message
async fn admin_ops_form_handler(
    State(state): State<StdArc<AppState>>,
    Path(slug): Path<String>,
    viewer: Viewer,
    uri: Uri,
    Form(form): Form<views::EditForm>,
) -> Response {
    if let Err(err) = viewer.require_admin() {
        return html_error(&state, &uri, err).await;
    }
    let page = match require_page(&state.pool, &slug).await {
        Ok(page) => page,
        Err(err) => return html_error(&state, &uri, err).await,
    };

    let mut editor = BlockEditor::load(&page);
    let applied = form.into_op().and_then(|op| editor.apply(&op));
    match applied {
        Ok(_) => match editor.save(&state.pool, &slug).await {
            Ok(_) => Redirect::to(&format!("/admin/pages/{}", slug)).into_response(),
            Err(err) => html_error(&state, &uri, err).await,
        },
        Err(err @ (AppError::Validation(_) | AppError::BlockNotFound(_))) => {
            let status = err.status_code();
            let message = err.to_string();
            match render_editor(&state.pool, &page, Some(&message)).await {
                Ok(html) => (status, Html(html)).into_response(),
                Err(render_err) => html_error(&state, &uri, render_err).await,
            }
        }
        Err(err) => html_error(&state, &uri, err).await,
    }
}
