//! Webhook request authentication.
//!
//! The vendor signs every webhook with an HMAC-SHA1 over the public URL
//! and the sorted form parameters, keyed by the account's auth token.
//! Requests that fail verification never reach a step handler.

use crate::app::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header::HOST, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::hmac;
use tracing::warn;

const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

/// Webhook bodies are small form payloads; anything larger is bogus.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub async fn validate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(uri = %parts.uri, "unable to read webhook body: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let host = parts
        .headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    // The vendor signs the public https URL it was configured with.
    let url = format!("https://{}{}", host, parts.uri);

    if !verify(&state.config.twilio.auth_token, &url, &bytes, signature) {
        warn!(uri = %parts.uri, "rejecting webhook with invalid signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

/// Checks `provided` against the signature of `url` plus the form `body`:
/// the parameters are appended to the URL as `{name}{value}`, sorted by
/// name, and the whole string is HMAC-SHA1 signed with the auth token.
pub fn verify(auth_token: &str, url: &str, body: &Bytes, provided: &str) -> bool {
    let mut params: Vec<(String, String)> = url::form_urlencoded::parse(body)
        .into_owned()
        .collect();
    params.sort();

    let mut signed = String::from(url);
    for (name, value) in &params {
        signed.push_str(name);
        signed.push_str(value);
    }

    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, auth_token.as_bytes());
    let tag = hmac::sign(&key, signed.as_bytes());
    let expected = STANDARD.encode(tag.as_ref());

    ring::constant_time::verify_slices_are_equal(expected.as_bytes(), provided.as_bytes()).is_ok()
}
