//! API authentication.
//!
//! The bearer token comes from `config.server.api_token` or the env var
//! named by `config.server.api_token_env` (default `CC_API_TOKEN`). It is
//! read **once at startup** and only its SHA-256 digest is kept in
//! `AppState`.
//! - With a token configured, every protected request must carry
//!   `Authorization: Bearer <token>`.
//! - Without one, the server logs a warning once and allows
//!   unauthenticated access (dev mode).
//!
//! `/call-data` can additionally be signed with HMAC-SHA256 over the raw
//! body (`X-Signature-256: sha256=<hex>`).

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::error::api_error;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature-256";

/// Axum middleware that enforces bearer-token authentication on protected
/// routes. Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected_hash = match &state.api_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Compare fixed-length digests so the token length does not leak.
    let provided_hash = Sha256::digest(provided.as_bytes());

    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return api_error(StatusCode::UNAUTHORIZED, "invalid or missing API token");
    }

    next.run(req).await
}

/// Hex HMAC-SHA256 of `body` under `secret`, as sent in the signature
/// header (without the `sha256=` prefix).
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        // HMAC takes keys of any length.
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check the `X-Signature-256` header against `body`.
pub fn verify_signature(secret: &[u8], headers: &HeaderMap, body: &[u8]) -> bool {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let provided = header.strip_prefix("sha256=").unwrap_or(header);
    if provided.is_empty() {
        return false;
    }
    let computed = sign(secret, body);
    computed.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn signature_round_trips_through_header() {
        let body = br#"{"elderId":1}"#;
        let mut headers = HeaderMap::new();
        let sig = format!("sha256={}", sign(b"s3cret", body));
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());

        assert!(verify_signature(b"s3cret", &headers, body));
        assert!(!verify_signature(b"other", &headers, body));
        assert!(!verify_signature(b"s3cret", &headers, b"{}"));
    }

    #[test]
    fn missing_signature_is_rejected() {
        assert!(!verify_signature(b"s3cret", &HeaderMap::new(), b"{}"));
    }
}
