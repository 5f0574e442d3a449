use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::http::error::ApiError;
use crate::http::server::AppState;

/// Require `Authorization: Bearer <admin.api_key>`.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(key) if key_matches(key, &state.config.admin.api_key) => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            ApiError::Unauthorized.into_response()
        }
    }
}

/// Constant-time key check. An empty expected key matches nothing.
fn key_matches(presented: &str, expected: &str) -> bool {
    let expected = expected.as_bytes();
    if expected.is_empty() {
        return false;
    }
    let presented = presented.as_bytes();
    if presented.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    presented.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches() {
        assert!(key_matches("s3cret", "s3cret"));
        assert!(!key_matches("s3cres", "s3cret"));
        assert!(!key_matches("s3cret-longer", "s3cret"));
        assert!(!key_matches("", ""));
        assert!(!key_matches("anything", ""));
    }
}
