use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Admin routes accept the shared key via `x-admin-key` or a bearer token.
/// Without a configured key they are only reachable with dev overrides on.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = state.config.admin_api_key.as_deref() else {
        if state.config.auth_dev_overrides_enabled() {
            return Ok(());
        }
        return Err(AppError::Forbidden(
            "Admin access is not configured.".to_string(),
        ));
    };

    let provided = admin_key_from_headers(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing admin key.".to_string()))?;

    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        return Err(AppError::Unauthorized("Invalid admin key.".to_string()));
    }
    Ok(())
}

fn admin_key_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = header_value(headers, ADMIN_KEY_HEADER) {
        return Some(value);
    }
    header_value(headers, AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, StatusCode};

    use super::{admin_key_from_headers, constant_time_eq};

    #[test]
    fn reads_key_from_either_header() {
        let mut headers = HeaderMap::new();
        assert!(admin_key_from_headers(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(admin_key_from_headers(&headers), Some("s3cret"));

        headers.insert("x-admin-key", HeaderValue::from_static(" other "));
        assert_eq!(admin_key_from_headers(&headers), Some("other"));
    }

    #[test]
    fn compares_keys_exactly() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let error = crate::error::AppError::Unauthorized("Missing admin key.".to_string());
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }
}
