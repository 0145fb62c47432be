//! Scripted [`ApiCaller`] for testing code that talks to the ELS.
//!
//! Script each call the code under test is expected to make with
//! [`MockApiCaller::expect`], run it, then inspect what each call was
//! invoked with via [`MockApiCaller::call`].
//!
//! The mock panics if it is invoked more times than scripted or with a
//! different method than the next scripted call, failing the test.

use crate::client::dispatcher::ApiCaller;
use crate::client::issuer::{IssueCredential, IssuedCredential};
use crate::context::CallContext;
use crate::signer::Sign;
use crate::ElsError;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Method, Request, Response, Url};
use std::sync::Mutex;
use std::time::Duration;

/// Which [`ApiCaller`] method a scripted call expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// [`ApiCaller::execute`]
    Execute,
    /// [`ApiCaller::get`]
    Get,
    /// [`IssueCredential::create_credential`]
    CreateCredential,
}

/// Simulated outcome of a scripted call.
#[derive(Debug)]
pub enum Reply {
    /// An HTTP response for `execute` or `get`.
    Response {
        /// Status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// An issued credential for `create_credential`.
    Credential(IssuedCredential),
    /// An error for any call, e.g. `ElsError::Context(DeadlineExceeded)`
    /// to simulate a timeout.
    Error(ElsError),
}

/// Snapshot of a request passed to `execute`.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Request URL, as passed (not completed).
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Buffered body bytes, if any.
    pub body: Option<Vec<u8>>,
}

/// Arguments a scripted call was invoked with.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    /// Whether a context was supplied.
    pub had_context: bool,
    /// Email passed to `create_credential`.
    pub email: String,
    /// Password passed to `create_credential`.
    pub password: String,
    /// `password_prehashed` passed to `create_credential`.
    pub password_prehashed: bool,
    /// `expiry_days` passed to `create_credential`.
    pub expiry_days: u32,
    /// Request passed to `execute`.
    pub request: Option<RecordedRequest>,
    /// URL passed to `get`.
    pub url: String,
    /// Whether a signer was supplied to `execute` or `get`.
    pub signed: bool,
    /// `first_party` passed to `execute` or `get`.
    pub first_party: bool,
}

/// One scripted call and, once made, the arguments it received.
#[derive(Debug)]
struct ExpectedCall {
    kind: CallKind,
    delay: Duration,
    args: CallArgs,
    reply: Option<Reply>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<ExpectedCall>,
    made: usize,
}

/// [`ApiCaller`] that replays scripted replies.
#[derive(Debug, Default)]
pub struct MockApiCaller {
    state: Mutex<MockState>,
    last_failure: Mutex<Option<DateTime<Utc>>>,
}

impl MockApiCaller {
    /// Create a mock with no scripted calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next expected call. Returns the number of scripted calls.
    pub fn expect(&self, kind: CallKind, reply: Reply) -> usize {
        self.expect_delayed(kind, Duration::ZERO, reply)
    }

    /// Script the next expected call, replying after `delay`.
    pub fn expect_delayed(&self, kind: CallKind, delay: Duration, reply: Reply) -> usize {
        let mut state = self.lock();
        state.calls.push(ExpectedCall {
            kind,
            delay,
            args: CallArgs::default(),
            reply: Some(reply),
        });
        state.calls.len()
    }

    /// Arguments the `i`th scripted call was invoked with.
    ///
    /// # Panics
    /// Panics if fewer than `i + 1` calls were scripted.
    pub fn call(&self, i: usize) -> CallArgs {
        let state = self.lock();
        match state.calls.get(i) {
            Some(call) => call.args.clone(),
            None => panic!("MockApiCaller: call {} does not exist", i),
        }
    }

    /// True once every scripted call has been made.
    pub fn all_calls_made(&self) -> bool {
        let state = self.lock();
        state.made == state.calls.len()
    }

    /// Number of calls made so far.
    pub fn num_calls_made(&self) -> usize {
        self.lock().made
    }

    /// Value reported by `last_failure_time`.
    pub fn set_last_failure(&self, at: Option<DateTime<Utc>>) {
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = at;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `args` against the next scripted call and return its reply.
    async fn next_call(&self, kind: CallKind, args: CallArgs) -> Reply {
        let (delay, reply) = {
            let mut state = self.lock();
            let index = state.made;
            let scripted = state.calls.len();
            let Some(call) = state.calls.get_mut(index) else {
                panic!(
                    "MockApiCaller: invoked too many times (scripted calls = {})",
                    scripted
                );
            };
            if call.kind != kind {
                panic!(
                    "MockApiCaller: call #{}: expected {:?}, was actually {:?}",
                    index + 1,
                    call.kind,
                    kind
                );
            }
            call.args = args;
            let reply = call.reply.take();
            let delay = call.delay;
            state.made += 1;
            (delay, reply)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.unwrap_or_else(|| panic!("MockApiCaller: reply already consumed"))
    }
}

fn into_response(reply: Reply) -> Result<Response, ElsError> {
    match reply {
        Reply::Response { status, body } => {
            let response = http::Response::builder()
                .status(status)
                .body(body)
                .unwrap_or_else(|e| panic!("MockApiCaller: invalid response: {}", e));
            Ok(Response::from(response))
        }
        Reply::Error(e) => Err(e),
        Reply::Credential(_) => panic!("MockApiCaller: credential reply scripted for an HTTP call"),
    }
}

impl ApiCaller for MockApiCaller {
    async fn execute(
        &self,
        ctx: Option<&CallContext>,
        request: Request,
        signer: Option<&dyn Sign>,
        first_party: bool,
    ) -> Result<Response, ElsError> {
        let recorded = RecordedRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| b.to_vec()),
        };
        let args = CallArgs {
            had_context: ctx.is_some(),
            request: Some(recorded),
            signed: signer.is_some(),
            first_party,
            ..Default::default()
        };
        into_response(self.next_call(CallKind::Execute, args).await)
    }

    async fn get(
        &self,
        ctx: Option<&CallContext>,
        url: &str,
        signer: Option<&dyn Sign>,
        first_party: bool,
    ) -> Result<Response, ElsError> {
        let args = CallArgs {
            had_context: ctx.is_some(),
            url: url.to_string(),
            signed: signer.is_some(),
            first_party,
            ..Default::default()
        };
        into_response(self.next_call(CallKind::Get, args).await)
    }

    fn last_failure_time(&self) -> Option<DateTime<Utc>> {
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IssueCredential for MockApiCaller {
    async fn create_credential(
        &self,
        ctx: Option<&CallContext>,
        email: &str,
        password: &str,
        password_prehashed: bool,
        expiry_days: u32,
    ) -> Result<IssuedCredential, ElsError> {
        let args = CallArgs {
            had_context: ctx.is_some(),
            email: email.to_string(),
            password: password.to_string(),
            password_prehashed,
            expiry_days,
            ..Default::default()
        };
        match self.next_call(CallKind::CreateCredential, args).await {
            Reply::Credential(issued) => Ok(issued),
            Reply::Error(e) => Err(e),
            Reply::Response { .. } => {
                panic!("MockApiCaller: HTTP reply scripted for create_credential")
            }
        }
    }
}
