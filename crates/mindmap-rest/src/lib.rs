pub mod handlers;
pub mod identity;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use mindmap_core::query::MindMapEngine;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Construct the Axum router for the user-facing `/api` routes.
///
/// The router carries `Arc<MindMapEngine>` as shared state. Callers are
/// identified by the [`identity::USER_EMAIL_HEADER`] header, which the auth
/// gateway in front of this service sets after a successful login.
///
/// CORS is restrictive by default (localhost only). Set the
/// `MINDMAP_CORS_ORIGINS` environment variable to a comma-separated
/// list of allowed origins to override, or to `*` to allow all origins.
pub fn router(engine: Arc<MindMapEngine>) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .route("/api/health", get(handlers::health_handler))
        .route("/api/login", post(handlers::login_handler))
        .route("/api/user", get(handlers::user_handler))
        .route("/api/logout", post(handlers::logout_handler))
        .route("/api/generate-mindmap", post(handlers::generate_handler))
        .route("/api/mindmaps", get(handlers::mindmaps_handler))
        .route("/api/related-images", get(handlers::related_images_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(engine)
}

/// CORS policy shared by every router of the service.
pub fn build_cors_layer() -> CorsLayer {
    use axum::http::{HeaderName, Method};

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static(identity::USER_EMAIL_HEADER),
        ])
        .allow_credentials(false)
        .max_age(std::time::Duration::from_secs(3600));

    match std::env::var("MINDMAP_CORS_ORIGINS") {
        Ok(val) if val == "*" => base.allow_origin(AllowOrigin::any()),
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            base.allow_origin(origins)
        }
        Err(_) => {
            let origins: Vec<_> = [
                "http://localhost:3000",
                "http://localhost:5000",
                "http://127.0.0.1:3000",
                "http://127.0.0.1:5000",
            ]
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
            base.allow_origin(origins)
        }
    }
}
