//! Signed admin session cookies.
//!
//! A cookie value is `base64url(json claims) "." base64url(hmac-sha256)`.
//! Only the signature protects the claims; nothing secret is stored in them.

use axum::http::{header, HeaderMap};
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SESSION_COOKIE: &str = "admin_session";
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub exp: i64,
}

#[derive(Clone)]
pub struct SessionSigner {
    key: hmac::Key,
    ttl: Duration,
}

impl SessionSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> String {
        let claims = SessionClaims {
            email: email.to_string(),
            exp: now.timestamp() + self.ttl.as_secs() as i64,
        };
        // Serializing a struct of a String and an i64 cannot fail.
        let payload = B64.encode(serde_json::to_vec(&claims).unwrap_or_default());
        let signature = hmac::sign(&self.key, payload.as_bytes());
        format!("{}.{}", payload, B64.encode(signature.as_ref()))
    }

    /// Returns the claims of a well-signed, unexpired cookie value.
    pub fn verify(&self, value: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        let (payload, signature) = value.split_once('.')?;
        let signature = B64.decode(signature).ok()?;
        hmac::verify(&self.key, payload.as_bytes(), &signature).ok()?;

        let claims: SessionClaims = serde_json::from_slice(&B64.decode(payload).ok()?).ok()?;
        if claims.exp <= now.timestamp() {
            return None;
        }
        Some(claims)
    }
}

/// Extract a cookie value from the request headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find_map(|kv| {
            let (key, value) = kv.split_once('=')?;
            (key == name).then_some(value)
        })
}

pub fn session_cookie(value: &str, path: &str, max_age: Duration, secure: bool) -> String {
    let secure = if secure { " Secure;" } else { "" };
    format!(
        "{}={}; Path={}; HttpOnly;{} SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        value,
        path,
        secure,
        max_age.as_secs()
    )
}

pub fn clear_session_cookie(path: &str, secure: bool) -> String {
    session_cookie("", path, Duration::ZERO, secure)
}
