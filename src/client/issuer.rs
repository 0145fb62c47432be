//! Access key issuance.
//!
//! Exchanges a user's email and password for a temporary [`Credential`]
//! with one Basic-Auth POST to the `accessKeys` endpoint.

use crate::config::ElsConfig;
use crate::context::CallContext;
use crate::crypto::digest::prehash_password;
use crate::protocol::credential::Credential;
use crate::ElsError;
use reqwest::{Client, StatusCode, Url};
use std::future::Future;
use tracing::debug;

/// A credential returned by the service together with the status it came with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// The new access key.
    pub credential: Credential,

    /// HTTP status of the issuing response (always 201 on success).
    pub status: u16,
}

/// Capability to obtain access keys for a user.
pub trait IssueCredential: Send + Sync {
    /// Request a new access key for `email` that expires after `expiry_days`.
    ///
    /// Pass `None` as `ctx` for a default context bounded by the configured
    /// request timeout. Set `password_prehashed` when `password` is already
    /// the hex SHA-256 of the plaintext.
    ///
    /// # Errors
    /// - `UnexpectedStatusCode` - the service answered with anything but 201
    /// - `Context` - the context ended before the exchange completed
    /// - `Transport` / `Decode` - passed through from the HTTP and JSON layers
    fn create_credential(
        &self,
        ctx: Option<&CallContext>,
        email: &str,
        password: &str,
        password_prehashed: bool,
        expiry_days: u32,
    ) -> impl Future<Output = Result<IssuedCredential, ElsError>> + Send;
}

/// Issues access keys against the configured ELS host.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    client: Client,
    config: ElsConfig,
}

impl CredentialIssuer {
    /// Create an issuer using `client` for all calls.
    pub fn new(client: Client, config: ElsConfig) -> Self {
        Self { client, config }
    }

    /// The endpoint configuration.
    pub fn config(&self) -> &ElsConfig {
        &self.config
    }

    /// `POST <prefix>/users/<email>/accessKeys?expires=1&numDaysTillExpiry=<n>`
    pub fn access_keys_url(&self, email: &str, expiry_days: u32) -> Result<Url, ElsError> {
        let mut url = Url::parse(&self.config.url_prefix())
            .map_err(|e| ElsError::Config(format!("Invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ElsError::Config("API URL cannot carry a path".to_string()))?
            .extend(["users", email, "accessKeys"]);
        url.query_pairs_mut()
            .append_pair("expires", "1")
            .append_pair("numDaysTillExpiry", &expiry_days.to_string());
        Ok(url)
    }
}

impl IssueCredential for CredentialIssuer {
    async fn create_credential(
        &self,
        ctx: Option<&CallContext>,
        email: &str,
        password: &str,
        password_prehashed: bool,
        expiry_days: u32,
    ) -> Result<IssuedCredential, ElsError> {
        let default_ctx;
        let ctx = match ctx {
            Some(ctx) => ctx,
            None => {
                default_ctx = CallContext::with_timeout(self.config.request_timeout);
                &default_ctx
            }
        };

        let password = if password_prehashed {
            password.to_string()
        } else {
            prehash_password(password)
        };

        let url = self.access_keys_url(email, expiry_days)?;
        let request = self
            .client
            .post(url)
            .basic_auth(email, Some(&password))
            .build()?;

        debug!(
            email = %email,
            expiry_days,
            password_prehashed,
            "requesting access key"
        );

        let response = ctx.run(self.client.execute(request)).await??;

        let status = response.status();
        if status != StatusCode::CREATED {
            debug!(status = status.as_u16(), "access key request rejected");
            return Err(ElsError::UnexpectedStatusCode {
                status: status.as_u16(),
            });
        }

        let body = ctx.run(response.bytes()).await??;
        let credential: Credential = serde_json::from_slice(&body)?;

        debug!(key_id = %credential.id, expiry = ?credential.expiry, "access key issued");

        Ok(IssuedCredential {
            credential,
            status: status.as_u16(),
        })
    }
}
