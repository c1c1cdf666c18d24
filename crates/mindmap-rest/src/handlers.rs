use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use mindmap_core::error::Error as CoreError;
use mindmap_core::images::ImageResult;
use mindmap_core::model::mindmap::MindMapRecord;
use mindmap_core::model::user::{LoginProfile, UserRecord};
use mindmap_core::query::MindMapEngine;
use mindmap_core::query::account::CurrentUser;
use mindmap_core::query::generate::{GenerateRequest, GenerateResponse};

use crate::identity::{Identity, email_from_headers};

type AppState = Arc<MindMapEngine>;

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

pub struct AppError(CoreError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

/// HTTP status for a core error.
pub fn status_for(error: &CoreError) -> StatusCode {
    match error {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self.0 {
            CoreError::Validation(m)
            | CoreError::Unauthorized(m)
            | CoreError::Forbidden(m)
            | CoreError::NotFound(m) => m.clone(),
            CoreError::QuotaExceeded { limit, .. } => {
                format!("You have reached your limit of {limit} mind maps")
            }
            upstream if upstream.is_upstream() => {
                tracing::error!("upstream failure: {upstream}");
                upstream.to_string()
            }
            other => {
                tracing::error!("internal error: {other}");
                "internal server error".to_string()
            }
        };
        (status, Json(serde_json::json!({"error": msg}))).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        AppError(e)
    }
}

// ---------------------------------------------------------------------------
// Query / body helper structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RelatedImagesParams {
    #[serde(default)]
    pub topic: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/health
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// POST /api/login -- the auth gateway reports a completed login.
pub async fn login_handler(
    State(engine): State<AppState>,
    Json(profile): Json<LoginProfile>,
) -> Result<Json<UserRecord>, AppError> {
    let user = engine.login(&profile).await?;
    Ok(Json(user))
}

/// GET /api/user
pub async fn user_handler(
    State(engine): State<AppState>,
    Identity(email): Identity,
) -> Result<Json<CurrentUser>, AppError> {
    Ok(Json(engine.current_user(&email).await?))
}

/// POST /api/logout
pub async fn logout_handler(
    State(engine): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(email) = email_from_headers(&headers) {
        engine.logout(&email).await?;
    }
    Ok(Json(serde_json::json!({"message": "Logged out"})))
}

/// POST /api/generate-mindmap -- body `{topic, type, text?}`.
pub async fn generate_handler(
    State(engine): State<AppState>,
    Identity(email): Identity,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let response = engine.generate(&email, request).await?;
    Ok(Json(response))
}

/// GET /api/mindmaps -- the caller's maps, newest first.
pub async fn mindmaps_handler(
    State(engine): State<AppState>,
    Identity(email): Identity,
) -> Result<Json<Vec<MindMapRecord>>, AppError> {
    Ok(Json(engine.list_mind_maps(&email).await?))
}

/// GET /api/related-images?topic=...
pub async fn related_images_handler(
    State(engine): State<AppState>,
    Query(params): Query<RelatedImagesParams>,
) -> Result<Json<Vec<ImageResult>>, AppError> {
    Ok(Json(engine.related_images(&params.topic).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&CoreError::QuotaExceeded { used: 5, limit: 5 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&CoreError::Generation("down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&CoreError::ImageSearch("blocked".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&CoreError::Storage("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&CoreError::Forbidden("banned".into())),
            StatusCode::FORBIDDEN
        );
    }
}
