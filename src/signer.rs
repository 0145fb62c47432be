//! ELS request signing.
//!
//! An [`ApiSigner`] holds one access key and turns an outgoing request into an
//! ELS-signed request by adding `Authorization`, `X-Els-Date` and (for
//! requests with a body) `Content-Type` headers.

use crate::config::DEFAULT_API_VERSION;
use crate::crypto::digest::md5_hex;
use crate::crypto::signing::{
    build_canonical_string, format_authorization, format_timestamp, hmac_sha256_b64,
    DATE_HEADER, REQUIRED_CONTENT_TYPE,
};
use crate::protocol::credential::Credential;
use crate::ElsError;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Body, Request};
use tracing::debug;

/// A credential must stay valid this long past the signing time (1 minute).
pub const SIGNING_HORIZON_SECONDS: i64 = 60;

/// Capability to ELS-sign a request.
///
/// The dispatcher only depends on this trait, so tests can substitute
/// signers with deterministic behaviour.
pub trait Sign: Send + Sync {
    /// Sign `request` as of `now`, mutating its headers (and re-buffering its
    /// body). `None` fails with [`ElsError::NoRequest`].
    fn sign(&self, request: Option<&mut Request>, now: DateTime<Utc>) -> Result<(), ElsError>;
}

/// Signs requests with a single access key.
#[derive(Debug, Clone)]
pub struct ApiSigner {
    credential: Credential,
    version_prefix: String,
}

impl ApiSigner {
    /// Create a signer for the current API version.
    ///
    /// # Errors
    /// - `NoCredential` - `credential` is `None`
    /// - `InvalidCredential` - the credential lacks an id or secret
    pub fn new(credential: Option<Credential>) -> Result<Self, ElsError> {
        let credential = credential.ok_or(ElsError::NoCredential)?;
        if !credential.can_sign() {
            return Err(ElsError::InvalidCredential);
        }
        Ok(Self {
            credential,
            version_prefix: format!("/{}/", DEFAULT_API_VERSION),
        })
    }

    /// Accept request paths for another API version instead of the current one.
    pub fn with_api_version(mut self, version: &str) -> Self {
        self.version_prefix = format!("/{}/", version);
        self
    }

    /// The access key used for signing.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

impl Sign for ApiSigner {
    fn sign(&self, request: Option<&mut Request>, now: DateTime<Utc>) -> Result<(), ElsError> {
        let request = request.ok_or(ElsError::NoRequest)?;

        // Only requests already completed against the API host are signable.
        // The service rebuilds the canonical string from the decoded path.
        let path = percent_decode_str(request.url().path())
            .decode_utf8_lossy()
            .into_owned();
        if !path.starts_with(&self.version_prefix) {
            return Err(ElsError::InvalidUrl(path));
        }

        let horizon = chrono::Duration::seconds(SIGNING_HORIZON_SECONDS);
        if !self.credential.valid_until(now, horizon) {
            return Err(ElsError::ExpiredCredential);
        }

        let buffered = match request.body() {
            Some(body) => Some(body.as_bytes().ok_or(ElsError::UnbufferedBody)?.to_vec()),
            None => None,
        };
        let body_md5 = buffered.map(|bytes| {
            let digest = md5_hex(&bytes);
            *request.body_mut() = Some(Body::from(bytes));
            digest
        });

        let timestamp = format_timestamp(now);
        let canonical = build_canonical_string(
            request.method().as_str(),
            body_md5.as_deref(),
            &timestamp,
            &path,
        );
        let signature = hmac_sha256_b64(self.credential.secret.as_bytes(), canonical.as_bytes());
        let authorization = format_authorization(&self.credential.id, &signature);

        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization).map_err(|_| ElsError::InvalidCredential)?,
        );
        headers.insert(
            HeaderName::from_static(DATE_HEADER),
            HeaderValue::from_str(&timestamp).map_err(|_| ElsError::InvalidCredential)?,
        );
        if body_md5.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(REQUIRED_CONTENT_TYPE));
        }

        debug!(
            method = %request.method(),
            path = %path,
            timestamp = %timestamp,
            key_id = %self.credential.id,
            has_body = body_md5.is_some(),
            "signed request"
        );

        Ok(())
    }
}
