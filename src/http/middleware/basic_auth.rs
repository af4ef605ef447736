//! Shared-secret basic authentication.
//!
//! Both sides of each comparison are hashed to fixed-length SHA-256 digests and
//! compared with `subtle`, so neither the mismatching byte nor the length of the
//! expected value is observable through timing. The username and password checks
//! are both always evaluated.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::http::middleware::audit::redact_uri;
use crate::observability::{metrics, Rejection};

const CHALLENGE: &str = r#"Basic realm="Restricted""#;

/// Expected credentials, stored as digests.
pub struct BasicAuth {
    user: [u8; 32],
    password: [u8; 32],
}

impl BasicAuth {
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            user: digest(user),
            password: digest(password),
        }
    }

    /// Constant-time check of both credentials.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        let user_ok = digest(user).as_slice().ct_eq(self.user.as_slice());
        let password_ok = digest(password).as_slice().ct_eq(self.password.as_slice());
        bool::from(user_ok & password_ok)
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

/// Extract `(user, password)` from an `Authorization: Basic ...` header.
pub fn parse_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

pub async fn basic_auth_middleware(
    State(auth): State<Arc<BasicAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let credentials = parse_basic_credentials(request.headers());
    let user = credentials
        .as_ref()
        .map(|(user, _)| user.as_str())
        .unwrap_or_default();

    let authorized = credentials
        .as_ref()
        .is_some_and(|(user, password)| auth.verify(user, password));

    if !authorized {
        tracing::info!(
            method = %request.method(),
            url = %redact_uri(request.uri()),
            user = %user,
            "unauthorized request"
        );
        metrics::record_rejection(Rejection::Unauthorized);
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
            "Unauthorized",
        )
            .into_response();
    }

    tracing::info!(
        method = %request.method(),
        url = %redact_uri(request.uri()),
        user = %user,
        "authorized request"
    );
    next.run(request).await
}
