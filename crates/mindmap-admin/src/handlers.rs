use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use mindmap_core::error::Error as CoreError;
use mindmap_core::model::mindmap::CachedMapKey;
use mindmap_core::query::MindMapEngine;
use mindmap_core::query::admin::{SessionInfo, Stats, UserListing};
use mindmap_rest::identity::email_from_headers;

type AppState = Arc<MindMapEngine>;

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

pub struct AdminError(CoreError);

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self.0 {
            CoreError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            CoreError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            CoreError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            CoreError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            other => {
                tracing::error!("internal error: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({"error": msg}))).into_response()
    }
}

impl From<CoreError> for AdminError {
    fn from(e: CoreError) -> Self {
        AdminError(e)
    }
}

/// Extractor that admits only the configured administrator.
pub struct Admin(pub String);

impl FromRequestParts<AppState> for Admin {
    type Rejection = AdminError;

    async fn from_request_parts(
        parts: &mut Parts,
        engine: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(email) = email_from_headers(&parts.headers) else {
            return Err(CoreError::Unauthorized("not logged in".to_string()).into());
        };
        if !engine.is_admin(&email) {
            tracing::warn!(user = %email, "admin route refused");
            return Err(CoreError::Forbidden("admin access required".to_string()).into());
        }
        Ok(Admin(email))
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SetLimitBody {
    #[serde(default)]
    pub email: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ClearCacheBody {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub map_type: String,
}

/// Body of the lenient clear route, which names the map type `type`.
#[derive(Debug, Deserialize)]
pub struct ClearCachedMapBody {
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "type", default)]
    pub map_type: String,
}

#[derive(Debug, Serialize)]
pub struct CacheListing {
    pub maps: Vec<CachedMapKey>,
}

fn success(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({"success": true, "message": message.into()}))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/admin/sessions -- users who logged in through the gateway.
pub async fn sessions_handler(
    State(engine): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<SessionInfo>>, AdminError> {
    Ok(Json(engine.session_overview().await?))
}

/// POST /api/admin/terminate-session -- body `{email}`.
pub async fn terminate_session_handler(
    State(engine): State<AppState>,
    Admin(admin): Admin,
    Json(body): Json<EmailBody>,
) -> Result<Json<serde_json::Value>, AdminError> {
    engine.terminate_session(&body.email).await?;
    tracing::info!(admin = %admin, user = %body.email, "session terminated by admin");
    Ok(success(format!("Session for {} terminated", body.email.trim())))
}

/// GET /api/admin/stats
pub async fn stats_handler(
    State(engine): State<AppState>,
    _admin: Admin,
) -> Result<Json<Stats>, AdminError> {
    Ok(Json(engine.stats().await?))
}

/// POST /api/admin/reset-mindmaps -- body `{email}`.
pub async fn reset_mindmaps_handler(
    State(engine): State<AppState>,
    _admin: Admin,
    Json(body): Json<EmailBody>,
) -> Result<Json<serde_json::Value>, AdminError> {
    engine.reset_mind_maps(&body.email).await?;
    Ok(success(format!("Mind maps reset for {}", body.email.trim())))
}

/// POST /api/admin/set-limit -- body `{email, limit}`.
pub async fn set_limit_handler(
    State(engine): State<AppState>,
    _admin: Admin,
    Json(body): Json<SetLimitBody>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let limit = body
        .limit
        .ok_or_else(|| CoreError::Validation("limit is required".to_string()))?;
    engine.set_limit(&body.email, limit).await?;
    Ok(success(format!("Limit for {} set to {limit}", body.email.trim())))
}

/// POST /api/admin/ban -- body `{email}`.
pub async fn ban_handler(
    State(engine): State<AppState>,
    _admin: Admin,
    Json(body): Json<EmailBody>,
) -> Result<Json<serde_json::Value>, AdminError> {
    engine.set_banned(&body.email, true).await?;
    Ok(success(format!("{} banned", body.email.trim())))
}

/// POST /api/admin/unban -- body `{email}`.
pub async fn unban_handler(
    State(engine): State<AppState>,
    _admin: Admin,
    Json(body): Json<EmailBody>,
) -> Result<Json<serde_json::Value>, AdminError> {
    engine.set_banned(&body.email, false).await?;
    Ok(success(format!("{} unbanned", body.email.trim())))
}

/// GET /api/admin/cached-maps
pub async fn cached_maps_handler(
    State(engine): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<CachedMapKey>>, AdminError> {
    Ok(Json(engine.cached_maps().await?))
}

/// GET /api/admin/list-cache
pub async fn list_cache_handler(
    State(engine): State<AppState>,
    _admin: Admin,
) -> Result<Json<CacheListing>, AdminError> {
    Ok(Json(CacheListing {
        maps: engine.cached_maps().await?,
    }))
}

/// POST /api/admin/clear-cache -- body `{topic, map_type}`.
pub async fn clear_cache_handler(
    State(engine): State<AppState>,
    _admin: Admin,
    Json(body): Json<ClearCacheBody>,
) -> Result<Json<serde_json::Value>, AdminError> {
    engine.clear_cached_map(&body.topic, &body.map_type).await?;
    Ok(success("Cache entry removed"))
}

/// POST /api/admin/clear-cached-map -- body `{topic, type}`. Succeeds
/// whether or not an entry existed.
pub async fn clear_cached_map_handler(
    State(engine): State<AppState>,
    _admin: Admin,
    Json(body): Json<ClearCachedMapBody>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let removed = engine.forget_cached_map(&body.topic, &body.map_type).await?;
    Ok(Json(serde_json::json!({"success": true, "removed": removed})))
}

/// GET /api/admin/all-users
pub async fn all_users_handler(
    State(engine): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<UserListing>>, AdminError> {
    Ok(Json(engine.all_users().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(error: CoreError) -> (StatusCode, serde_json::Value) {
        let response = AdminError::from(error).into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_errors_are_hidden() {
        let (status, json) = render(CoreError::Storage("disk full at /var/db".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal server error");

        let (status, json) = render(CoreError::Internal("bad json".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal server error");
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let (status, json) = render(CoreError::NotFound("no cached map".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "no cached map");
    }
}
