//! # els-client
//!
//! **Access-key acquisition and request signing for the Elastic Licensing
//! Service (ELS) API.**
//!
//! A client exchanges a user's email and password for a short-lived access
//! key, then ELS-signs every API call with it so the service can reject
//! tampered or replayed requests.
//!
//! ## Features
//!
//! - **HMAC-SHA256 request signing** over method, body MD5, content type,
//!   timestamp and path
//! - **Body-safe signing**: the body is buffered once and survives hashing
//! - **Context-bounded calls**: caller-supplied cancellation/deadline, or a
//!   per-call default timeout
//! - **First-party URL completion**: relative paths are pointed at the
//!   configured API host and version; third-party URLs pass through untouched
//! - **Failure tracking**: the time of the last failed call is kept per
//!   dispatcher
//!
//! ## Quickstart
//!
//! ```no_run
//! use els_client::{ApiCaller, ApiSigner, Dispatcher, ElsConfig, IssueCredential};
//!
//! # async fn run() -> Result<(), els_client::ElsError> {
//! let dispatcher = Dispatcher::new(ElsConfig::default())?;
//!
//! let issued = dispatcher
//!     .create_credential(None, "user@example.com", "password", false, 1)
//!     .await?;
//! let signer = ApiSigner::new(Some(issued.credential))?;
//!
//! let response = dispatcher
//!     .get(None, "/users/user@example.com", Some(&signer), true)
//!     .await?;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```
//!
//! ## Wire format
//!
//! ```text
//! Authorization: ELS <accessKeyId>:<base64(HMAC-SHA256(secret, canonical))>
//! X-Els-Date:    2015-01-01T00:00:00Z
//! Content-Type:  application/json;charset=utf-8      (requests with a body)
//! ```
//!
//! Retry, backoff and credential renewal are left to the caller.

#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod context;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Signing
pub mod signer;

// Client layer
pub mod client;

// Test doubles
#[cfg(any(test, feature = "test-seams"))]
pub mod mock;

// Re-exports for public API
pub use client::dispatcher::{ApiCaller, Dispatcher};
pub use client::issuer::{CredentialIssuer, IssueCredential, IssuedCredential};
pub use clock::{Clock, SystemClock};
pub use config::ElsConfig;
pub use context::CallContext;
pub use errors::{ContextError, ElsError};
pub use protocol::credential::Credential;
pub use signer::{ApiSigner, Sign};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
