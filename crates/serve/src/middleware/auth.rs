//! Shared-token authentication
//!
//! Guarded routes require the configured token in the `X-API-Token` header.
//! `Authorization: Bearer <token>` is accepted as well. With no token
//! configured every guarded request is refused.

use crate::handlers::{ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Token presented by the caller, if any
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
        })
        .filter(|token| !token.is_empty())
}

/// API token guard
///
/// Layered on the `/api/v1` router with
/// `axum::middleware::from_fn_with_state`; a rejected request never reaches a
/// handler.
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = match (state.api_token.as_deref(), presented_token(request.headers())) {
        (Some(expected), Some(presented)) => expected.as_bytes() == presented.as_bytes(),
        _ => false,
    };

    if !authorized {
        tracing::warn!(
            method = %request.method(),
            uri = %request.uri(),
            "Rejected request with missing or invalid API token"
        );
        return Err(ApiError::unauthorized());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_presented_token_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_TOKEN_HEADER, HeaderValue::from_static("s3cret"));
        assert_eq!(presented_token(&headers), Some("s3cret"));
    }

    #[test]
    fn test_presented_token_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(presented_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(presented_token(&headers), None);
    }

    #[test]
    fn test_presented_token_prefers_api_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_TOKEN_HEADER, HeaderValue::from_static("one"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer two"));
        assert_eq!(presented_token(&headers), Some("one"));
    }

    #[test]
    fn test_empty_token_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(API_TOKEN_HEADER, HeaderValue::from_static(""));
        assert_eq!(presented_token(&headers), None);
    }
}
