pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use mindmap_core::query::MindMapEngine;

/// Construct the Axum router for the administrative API.
///
/// Every route requires the caller (as identified by the auth gateway) to be
/// the configured administrator; anyone else gets 403. The router carries
/// `Arc<MindMapEngine>` as shared state and the same CORS policy as the
/// user-facing router.
///
/// # Routes
///
/// | Method | Path                             | Description                          |
/// |--------|----------------------------------|--------------------------------------|
/// | GET    | `/api/admin/sessions`            | Logged-in users with activity, usage |
/// | POST   | `/api/admin/terminate-session`   | Drop a user's profile and session    |
/// | GET    | `/api/admin/stats`               | User, online and mind map totals     |
/// | POST   | `/api/admin/reset-mindmaps`      | Clear a user's mind map ledger       |
/// | POST   | `/api/admin/set-limit`           | Change a user's mind map limit       |
/// | POST   | `/api/admin/ban`                 | Ban a user                           |
/// | POST   | `/api/admin/unban`               | Lift a ban                           |
/// | GET    | `/api/admin/cached-maps`         | Cached `(topic, map_type)` pairs     |
/// | GET    | `/api/admin/list-cache`          | Same, wrapped as `{maps: [...]}`     |
/// | POST   | `/api/admin/clear-cache`         | Remove one cached diagram            |
/// | POST   | `/api/admin/clear-cached-map`    | Same, `{topic, type}`, 200 if absent |
/// | GET    | `/api/admin/all-users`           | Every user with their limit          |
pub fn router(engine: Arc<MindMapEngine>) -> Router {
    Router::new()
        .route("/api/admin/sessions", get(handlers::sessions_handler))
        .route(
            "/api/admin/terminate-session",
            post(handlers::terminate_session_handler),
        )
        .route("/api/admin/stats", get(handlers::stats_handler))
        .route(
            "/api/admin/reset-mindmaps",
            post(handlers::reset_mindmaps_handler),
        )
        .route("/api/admin/set-limit", post(handlers::set_limit_handler))
        .route("/api/admin/ban", post(handlers::ban_handler))
        .route("/api/admin/unban", post(handlers::unban_handler))
        .route("/api/admin/cached-maps", get(handlers::cached_maps_handler))
        .route("/api/admin/list-cache", get(handlers::list_cache_handler))
        .route("/api/admin/clear-cache", post(handlers::clear_cache_handler))
        .route(
            "/api/admin/clear-cached-map",
            post(handlers::clear_cached_map_handler),
        )
        .route("/api/admin/all-users", get(handlers::all_users_handler))
        .layer(mindmap_rest::build_cors_layer())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(engine)
}
