//! ELS client error types.

use thiserror::Error;

/// Why a call context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context was cancelled explicitly.
    #[error("context canceled")]
    Canceled,

    /// The context deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Errors returned by signing, dispatching and credential issuance.
#[derive(Debug, Error)]
pub enum ElsError {
    /// A signer was requested without a credential.
    #[error("No access key")]
    NoCredential,

    /// The credential is missing its id or secret and cannot sign.
    #[error("Invalid access key")]
    InvalidCredential,

    /// There was no request to sign.
    #[error("No request")]
    NoRequest,

    /// The request path does not start with the supported API version.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The credential has expired or expires within the signing horizon.
    #[error("Expired access key")]
    ExpiredCredential,

    /// The request body is a stream and cannot be hashed without consuming it.
    #[error("Request body is not buffered and cannot be signed")]
    UnbufferedBody,

    /// Credential issuance returned something other than 201 Created.
    #[error("Unexpected status code: {status}")]
    UnexpectedStatusCode {
        /// The status code the service answered with.
        status: u16,
    },

    /// The call context was cancelled or its deadline elapsed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// HTTP transport error, passed through from reqwest.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// JSON decode error, passed through from serde_json.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ElsError {
    /// Status code carried by an `UnexpectedStatusCode` error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatusCode { status } => Some(*status),
            _ => None,
        }
    }

    /// True when the error came from the call context rather than the network.
    pub fn is_context(&self) -> bool {
        matches!(self, Self::Context(_))
    }
}
