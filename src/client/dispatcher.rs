//! API call dispatcher.
//!
//! The [`Dispatcher`] completes first-party URLs against the configured ELS
//! host, optionally ELS-signs the request, and sends it under a call context.
//! It remembers when a call last failed to get a response.

use crate::client::issuer::{CredentialIssuer, IssueCredential, IssuedCredential};
use crate::clock::{Clock, SystemClock};
use crate::config::ElsConfig;
use crate::context::CallContext;
use crate::signer::Sign;
use crate::ElsError;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Request, Response, Url};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Capability to make ELS and third-party API calls.
pub trait ApiCaller: IssueCredential {
    /// Execute `request`.
    ///
    /// - `ctx`: `None` uses a fresh context bounded by the configured request
    ///   timeout; a supplied context is used as-is.
    /// - `signer`: when present, the request is ELS-signed before sending.
    /// - `first_party`: when true, scheme, host and version prefix are
    ///   rewritten to the configured API; otherwise the URL is left untouched.
    ///
    /// Any response is returned regardless of status code.
    fn execute(
        &self,
        ctx: Option<&CallContext>,
        request: Request,
        signer: Option<&dyn Sign>,
        first_party: bool,
    ) -> impl Future<Output = Result<Response, ElsError>> + Send;

    /// Execute a GET of `url` with no body. First-party URLs may be relative
    /// (e.g. `/users/me`).
    fn get(
        &self,
        ctx: Option<&CallContext>,
        url: &str,
        signer: Option<&dyn Sign>,
        first_party: bool,
    ) -> impl Future<Output = Result<Response, ElsError>> + Send;

    /// When a call last failed to get a response, `None` if never.
    fn last_failure_time(&self) -> Option<DateTime<Utc>>;
}

/// Sends (optionally signed) requests to the ELS and to third-party APIs.
///
/// Create one per API version and share it; concurrent calls are safe.
pub struct Dispatcher {
    issuer: CredentialIssuer,
    client: Client,
    clock: Arc<dyn Clock>,
    last_failure: RwLock<Option<DateTime<Utc>>>,
}

impl Dispatcher {
    /// Create a dispatcher using the system clock and a default HTTP client.
    ///
    /// # Errors
    /// Returns an error if configuration validation or client creation fails.
    pub fn new(config: ElsConfig) -> Result<Self, ElsError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a dispatcher whose signing time comes from `clock`.
    pub fn with_clock(config: ElsConfig, clock: Arc<dyn Clock>) -> Result<Self, ElsError> {
        let client = Client::builder().user_agent(build_user_agent()).build()?;
        Self::with_client(config, client, clock)
    }

    /// Create a dispatcher around a caller-supplied HTTP client.
    pub fn with_client(
        config: ElsConfig,
        client: Client,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ElsError> {
        config.validate()?;
        Ok(Self {
            issuer: CredentialIssuer::new(client.clone(), config),
            client,
            clock,
            last_failure: RwLock::new(None),
        })
    }

    /// The endpoint configuration.
    pub fn config(&self) -> &ElsConfig {
        self.issuer.config()
    }

    /// Build a first-party request for a path relative to the API version,
    /// e.g. `/users/me?full=1`. The URL is completed when executed.
    pub fn new_request(&self, method: Method, path: &str) -> Result<Request, ElsError> {
        Ok(Request::new(method, self.target_url(path, true)?))
    }

    /// Point `request` at the configured API host and version, keeping its
    /// path and query.
    pub fn complete_url(&self, request: &mut Request) -> Result<(), ElsError> {
        let original = request.url();
        let mut completed = Url::parse(&format!(
            "{}{}",
            self.config().url_prefix(),
            original.path()
        ))
        .map_err(|e| ElsError::InvalidUrl(format!("{}: {}", original, e)))?;
        completed.set_query(original.query());
        *request.url_mut() = completed;
        Ok(())
    }

    /// Complete (for first-party calls) and sign `request` without sending it.
    pub fn prepare(
        &self,
        mut request: Request,
        signer: Option<&dyn Sign>,
        first_party: bool,
    ) -> Result<Request, ElsError> {
        if first_party {
            self.complete_url(&mut request)?;
        }
        if let Some(signer) = signer {
            if let Err(e) = signer.sign(Some(&mut request), self.clock.now_utc()) {
                debug!(error = %e, url = %request.url(), "failed to sign request");
                return Err(e);
            }
        }
        Ok(request)
    }

    fn target_url(&self, url: &str, first_party: bool) -> Result<Url, ElsError> {
        let parsed = if first_party {
            let base = format!("{}://{}/", self.config().scheme, self.config().host);
            Url::parse(&base).and_then(|base| base.join(url))
        } else {
            Url::parse(url)
        };
        parsed.map_err(|e| ElsError::InvalidUrl(format!("{}: {}", url, e)))
    }

    fn record_failure(&self, error: &dyn Display) {
        let now = self.clock.now_utc();
        let mut last = self
            .last_failure
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(now);
        warn!(error = %error, at = %now, "API call failed");
    }
}

impl ApiCaller for Dispatcher {
    async fn execute(
        &self,
        ctx: Option<&CallContext>,
        request: Request,
        signer: Option<&dyn Sign>,
        first_party: bool,
    ) -> Result<Response, ElsError> {
        let default_ctx;
        let ctx = match ctx {
            Some(ctx) => ctx,
            None => {
                default_ctx = CallContext::with_timeout(self.config().request_timeout);
                &default_ctx
            }
        };

        let request = self.prepare(request, signer, first_party)?;

        debug!(
            method = %request.method(),
            url = %request.url(),
            signed = signer.is_some(),
            first_party,
            "dispatching request"
        );

        match ctx.run(self.client.execute(request)).await {
            Ok(Ok(response)) => {
                debug!(status = response.status().as_u16(), "received response");
                Ok(response)
            }
            Ok(Err(e)) => {
                self.record_failure(&e);
                Err(ElsError::Transport(e))
            }
            Err(reason) => {
                self.record_failure(&reason);
                Err(ElsError::Context(reason))
            }
        }
    }

    async fn get(
        &self,
        ctx: Option<&CallContext>,
        url: &str,
        signer: Option<&dyn Sign>,
        first_party: bool,
    ) -> Result<Response, ElsError> {
        let request = Request::new(Method::GET, self.target_url(url, first_party)?);
        self.execute(ctx, request, signer, first_party).await
    }

    fn last_failure_time(&self) -> Option<DateTime<Utc>> {
        *self
            .last_failure
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IssueCredential for Dispatcher {
    fn create_credential(
        &self,
        ctx: Option<&CallContext>,
        email: &str,
        password: &str,
        password_prehashed: bool,
        expiry_days: u32,
    ) -> impl Future<Output = Result<IssuedCredential, ElsError>> + Send {
        self.issuer
            .create_credential(ctx, email, password, password_prehashed, expiry_days)
    }
}

/// User-Agent sent on every call: `els-client/<version>`.
pub fn build_user_agent() -> String {
    format!("els-client/{}", env!("CARGO_PKG_VERSION"))
}
