pub mod carts;
pub mod checkout;
pub mod health;
pub mod orders;

use axum::http::HeaderMap;

/// Pulls the raw `Authorization` header value, if any. The auth gate decides
/// whether it is acceptable.
pub(crate) fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}
