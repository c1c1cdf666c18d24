//! Caller identity as asserted by the auth gateway.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use mindmap_core::error::Error as CoreError;

use crate::handlers::AppError;

/// Header carrying the signed-in user's email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Email of the caller, if the gateway supplied a non-empty one.
pub fn email_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extractor for an identified caller. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct Identity(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        email_from_headers(&parts.headers)
            .map(Identity)
            .ok_or_else(|| AppError::from(CoreError::Unauthorized("not logged in".to_string())))
    }
}
