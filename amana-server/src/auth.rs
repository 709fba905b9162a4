//! Static token gate for the write endpoints

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

/// Alternative header carrying the token
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extract the caller's token.
///
/// `X-API-Key: <token>` wins over `Authorization`; the latter may be
/// `Bearer <token>` (scheme matched case-insensitively) or the bare token.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .or_else(|| headers.get(AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(strip_bearer)
        .filter(|s| !s.is_empty())
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    }
}

/// Reject requests without a token (401) or with an unknown one (403)
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let rejection = match extract_token(request.headers()) {
        None => Some((
            "missing",
            ApiError::Unauthorized("Authentication token required".to_string()),
        )),
        Some(token) if !state.is_valid_token(token) => Some((
            "invalid",
            ApiError::Forbidden("Invalid authentication token".to_string()),
        )),
        Some(_) => None,
    };

    match rejection {
        Some((reason, err)) => {
            warn!(
                "Rejected {} {}: {} token",
                request.method(),
                request.uri().path(),
                reason
            );
            crate::metrics::record_auth_rejection(reason);
            Err(err)
        }
        None => Ok(next.run(request).await),
    }
}
