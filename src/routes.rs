use crate::{
    handlers, // Import handlers module
    AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
///
/// CORS is restricted to the configured origins; the browser only ever
/// sends GET/POST with JSON bodies and an optional bearer token.
pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/contact", post(handlers::create_contact))
        .route("/api/contacts", get(handlers::list_contacts))
        .route("/api/donate", post(handlers::create_donation))
        .route("/api/webhook", post(handlers::stripe_webhook))
        .route("/api/mpesa", post(handlers::mpesa_stk_push))
        .route("/api/mpesa-callback", post(handlers::mpesa_callback))
        .route("/api/donations", get(handlers::list_donations))
        .route("/api/admin/stats", get(handlers::admin_stats))
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/api/blog/{slug}", get(handlers::get_post))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB is plenty for JSON payloads
        .with_state(state) // Pass the application state
}
