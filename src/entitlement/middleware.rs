//! Axum-facing helpers: session token extraction and the limit-gate
//! error response.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::limits::{can_add_more, FreeLimits, ResourceKind};
use super::state::EntitlementSnapshot;

/// Pull the bearer session token out of the Authorization header.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[derive(Debug, Serialize)]
pub struct LimitErrorResponse {
    pub error: String,
    pub code: LimitErrorCode,
    pub kind: ResourceKind,
    pub upgrade_url: String,
    pub current: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitErrorCode {
    FreeLimitReached,
}

impl LimitErrorResponse {
    const UPGRADE_URL: &'static str = "https://myhorsemanager.app/premium";

    pub fn free_limit_reached(kind: ResourceKind, current: u32, limit: u32) -> Self {
        Self {
            error: format!("{} limit reached ({}/{})", kind.as_str(), current, limit),
            code: LimitErrorCode::FreeLimitReached,
            kind,
            upgrade_url: Self::UPGRADE_URL.to_string(),
            current,
            limit,
        }
    }
}

impl IntoResponse for LimitErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::PAYMENT_REQUIRED, Json(self)).into_response()
    }
}

/// Guard for create endpoints: Ok to proceed, Err carries the 402 payload.
#[allow(clippy::result_large_err)]
pub fn check_resource_limit(
    snapshot: &EntitlementSnapshot,
    limits: &FreeLimits,
    kind: ResourceKind,
    current_count: u32,
) -> Result<(), LimitErrorResponse> {
    if can_add_more(&snapshot.state, limits, kind, current_count) {
        Ok(())
    } else {
        Err(LimitErrorResponse::free_limit_reached(
            kind,
            current_count,
            limits.limit_for(kind),
        ))
    }
}
