//! Extraction of the session credential from an HTTP request
//!
//! A credential is read from `Authorization: Bearer <token>` first, then from
//! the `AuthSessionId` cookie. A missing credential is not an error.

use crate::types::Credential;
use axum_extra::extract::cookie::Cookie;
use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Name of the cookie carrying the session credential
pub const SESSION_COOKIE_NAME: &str = "AuthSessionId";

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)bearer\s+(.+)$").expect("valid bearer regex"));

/// Credential present in the request but unreadable
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("cookie AuthSessionId is not a valid percent-encoded string: {0}")]
    Decoding(String),
}

/// Extract the credential from request headers.
///
/// Returns `Ok(None)` when neither the `Authorization` header nor the session
/// cookie carries a value.
pub fn extract_credential(headers: &HeaderMap) -> Result<Option<Credential>, CredentialError> {
    let bearer = headers
        .get_all(AUTHORIZATION)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(parse_bearer);
    if let Some(token) = bearer {
        return Ok(Some(Credential::new(token)));
    }

    match session_cookie(headers) {
        Some(raw) => strict_percent_decode(&raw).map(|v| Some(Credential::new(v))),
        None => Ok(None),
    }
}

/// Parse `Bearer <token>` with a case-insensitive scheme.
///
/// At least one whitespace character must separate the scheme from the token,
/// which is everything after it, trailing characters included.
pub fn parse_bearer(header: &str) -> Option<&str> {
    BEARER_RE
        .captures(header)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str())
}

/// Raw value of the session cookie, scanning every `Cookie` header.
///
/// Values are returned as sent, without percent-decoding.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value_trimmed().to_string())
}

/// Percent-decode, rejecting malformed escapes instead of passing them through.
fn strict_percent_decode(raw: &str) -> Result<String, CredentialError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(CredentialError::Decoding(format!(
                    "invalid escape at offset {i}"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| CredentialError::Decoding(e.to_string()))
}
