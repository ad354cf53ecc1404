//! Caller identity and authorization.
//!
//! # Purpose
//! Groups the verified caller identity, the static admin allowlist policy, and
//! bearer-token header parsing.
pub mod policy;
pub mod principal;

use axum::http::HeaderMap;

/// Bearer token from the `Authorization` header, if well formed.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
