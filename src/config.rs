//! ELS API endpoint configuration.

use crate::ElsError;
use std::time::Duration;

/// Scheme used for ELS API calls.
pub const DEFAULT_API_SCHEME: &str = "https";

/// Production ELS API host.
pub const DEFAULT_API_HOST: &str = "api.elasticlicensing.com";

/// Current ELS API version.
pub const DEFAULT_API_VERSION: &str = "1.0";

/// Timeout applied to calls made without a caller-supplied context.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where first-party API calls are sent and how long they may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElsConfig {
    /// HTTP scheme, usually "https". Overridden for local test servers.
    pub scheme: String,

    /// API host, optionally with a port (e.g. "api.elasticlicensing.com").
    pub host: String,

    /// API version prefixed to every first-party path (e.g. "1.0").
    pub version: String,

    /// Deadline for calls made without a caller-supplied context.
    pub request_timeout: Duration,
}

impl Default for ElsConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_API_SCHEME.to_string(),
            host: DEFAULT_API_HOST.to_string(),
            version: DEFAULT_API_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ElsConfig {
    /// Set the scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the host (and port).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the API version. An empty string keeps the default version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = if version.is_empty() {
            DEFAULT_API_VERSION.to_string()
        } else {
            version
        };
        self
    }

    /// Set the default request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `<scheme>://<host>/<version>`, the prefix of every first-party URL.
    pub fn url_prefix(&self) -> String {
        format!("{}://{}/{}", self.scheme, self.host, self.version)
    }

    /// Path prefix a completed first-party request starts with (e.g. "/1.0/").
    pub fn version_prefix(&self) -> String {
        format!("/{}/", self.version)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), ElsError> {
        if self.scheme.is_empty() {
            return Err(ElsError::Config("scheme cannot be empty".to_string()));
        }
        if self.host.is_empty() {
            return Err(ElsError::Config("host cannot be empty".to_string()));
        }
        if self.version.is_empty() || self.version.contains('/') {
            return Err(ElsError::Config(format!(
                "version must be a single path segment, got {:?}",
                self.version
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ElsError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
