//! Canonical string construction and HMAC computation for ELS-signed requests.
//!
//! The canonical string is never transmitted. Client and service each build
//! it from the request and compare HMACs, so its layout is fixed:
//! ```text
//! POST
//! 5a1b...e9            (hex MD5 of body, empty if no body)
//! application/json;charset=utf-8   (empty if no body)
//! 2015-01-01T00:00:00Z
//! /1.0/path
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Content type every signed request with a body must carry.
pub const REQUIRED_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Scheme tag that prefixes the `Authorization` header value.
pub const AUTH_SCHEME: &str = "ELS";

/// Header carrying the signing timestamp (sent as `X-Els-Date`).
pub const DATE_HEADER: &str = "x-els-date";

/// Format a signing time as RFC 3339 UTC with second precision,
/// e.g. `2015-01-01T00:00:00Z`.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the canonical string for a request.
///
/// # Arguments
/// * `method` - HTTP method, as sent
/// * `body_md5` - Hex MD5 of the body, `None` when there is no body
/// * `timestamp` - Value of the date header
/// * `path` - Percent-decoded URL path without query string
pub fn build_canonical_string(
    method: &str,
    body_md5: Option<&str>,
    timestamp: &str,
    path: &str,
) -> String {
    let (digest, content_type) = match body_md5 {
        Some(digest) => (digest, REQUIRED_CONTENT_TYPE),
        None => ("", ""),
    };
    format!(
        "{}\n{}\n{}\n{}\n{}",
        method, digest, content_type, timestamp, path
    )
}

/// HMAC-SHA256 of `data` keyed by `secret`, base64-encoded.
pub fn hmac_sha256_b64(secret: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(data);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// `Authorization` header value: `ELS <id>:<signature>`.
pub fn format_authorization(credential_id: &str, signature_b64: &str) -> String {
    format!("{} {}:{}", AUTH_SCHEME, credential_id, signature_b64)
}
