//! Dispatcher behaviour against a local server.

mod common;

use common::{closed_addr, FixedClock, TestServer};
use els_client::crypto::digest::md5_hex;
use els_client::crypto::signing::{build_canonical_string, hmac_sha256_b64};
use els_client::{
    ApiCaller, ApiSigner, CallContext, ContextError, Credential, Dispatcher, ElsConfig, ElsError,
    Sign,
};
use percent_encoding::percent_decode_str;
use reqwest::{Body, Method, Request, Url};
use std::sync::Arc;
use std::time::Duration;

const REQ_CONTENT: &str = r#"{"some":"req"}"#;
const REP_CONTENT: &str = r#"{"some":"data"}"#;

fn signer() -> ApiSigner {
    ApiSigner::new(Some(Credential::new("AK", "SAK", None, "example@test.com"))).unwrap()
}

fn dispatcher(config: ElsConfig) -> Dispatcher {
    Dispatcher::with_clock(config, Arc::new(FixedClock::default())).unwrap()
}

#[tokio::test]
async fn test_get_completes_first_party_url() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let dispatcher = dispatcher(server.config());

    let response = dispatcher
        .get(None, "/path/to/route?query1=a", None, true)
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), REP_CONTENT);

    let received = server.last_request();
    assert_eq!(received.method, Method::GET);
    assert_eq!(received.uri.path(), "/1.0/path/to/route");
    assert_eq!(received.uri.query(), Some("query1=a"));
}

#[tokio::test]
async fn test_signed_request_verifies_on_server() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let dispatcher = dispatcher(server.config());
    let mut request = dispatcher.new_request(Method::POST, "/path/to/route").unwrap();
    *request.body_mut() = Some(Body::from(REQ_CONTENT));

    let response = dispatcher
        .execute(None, request, Some(&signer()), true)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let received = server.last_request();
    assert_eq!(received.body, REQ_CONTENT.as_bytes());
    assert_eq!(
        received.header("content-type"),
        Some("application/json;charset=utf-8")
    );
    assert_eq!(received.header("x-els-date"), Some("2015-01-01T00:00:00Z"));

    // Recompute the signature from what arrived, as the service does.
    let md5 = md5_hex(&received.body);
    let canonical = build_canonical_string(
        received.method.as_str(),
        Some(&md5),
        received.header("x-els-date").unwrap(),
        received.uri.path(),
    );
    let expected = format!("ELS AK:{}", hmac_sha256_b64(b"SAK", canonical.as_bytes()));
    assert_eq!(received.header("authorization"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_encoded_path_verifies_on_server() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let dispatcher = dispatcher(server.config());

    dispatcher
        .get(None, "/users/a b@test.com", Some(&signer()), true)
        .await
        .unwrap();

    let received = server.last_request();
    assert_eq!(received.uri.path(), "/1.0/users/a%20b@test.com");

    let path = percent_decode_str(received.uri.path()).decode_utf8().unwrap();
    let canonical = build_canonical_string(
        received.method.as_str(),
        None,
        received.header("x-els-date").unwrap(),
        &path,
    );
    let expected = format!("ELS AK:{}", hmac_sha256_b64(b"SAK", canonical.as_bytes()));
    assert_eq!(received.header("authorization"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_unbounded_default_timeout() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let config = server.config().with_timeout(Duration::MAX);
    let dispatcher = dispatcher(config);

    let response = dispatcher.get(None, "/path", None, true).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_unsigned_request_has_no_auth_headers() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let dispatcher = dispatcher(server.config());

    dispatcher.get(None, "/path", None, true).await.unwrap();

    let received = server.last_request();
    assert!(received.header("authorization").is_none());
    assert!(received.header("x-els-date").is_none());
}

#[tokio::test]
async fn test_third_party_url_is_not_changed() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    // First-party calls would go to the production host; this one must not.
    let dispatcher = dispatcher(ElsConfig::default());
    let request = Request::new(Method::GET, Url::parse(&server.url("/a/b?x=y")).unwrap());

    let response = dispatcher.execute(None, request, None, false).await.unwrap();

    assert_eq!(response.text().await.unwrap(), REP_CONTENT);
    let received = server.last_request();
    assert_eq!(received.uri.path(), "/a/b");
    assert_eq!(received.uri.query(), Some("x=y"));
}

#[tokio::test]
async fn test_error_status_is_returned_as_response() {
    let server = TestServer::start(500, r#"{"error":"boom"}"#, Duration::ZERO).await;
    let dispatcher = dispatcher(server.config());

    let response = dispatcher.get(None, "/path", None, true).await.unwrap();

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(dispatcher.last_failure_time(), None);
}

#[tokio::test]
async fn test_default_timeout_returns_deadline_exceeded() {
    let server = TestServer::start(200, REP_CONTENT, Duration::from_millis(500)).await;
    let config = server.config().with_timeout(Duration::from_millis(1));
    let dispatcher = Dispatcher::new(config).unwrap();

    let before = chrono::Utc::now();
    let result = dispatcher.get(None, "/slow", None, true).await;
    let after = chrono::Utc::now();

    assert!(matches!(
        result,
        Err(ElsError::Context(ContextError::DeadlineExceeded))
    ));
    let failed_at = dispatcher.last_failure_time().expect("failure recorded");
    assert!(failed_at >= before && failed_at <= after);
}

#[tokio::test]
async fn test_caller_context_replaces_default_timeout() {
    let server = TestServer::start(200, REP_CONTENT, Duration::from_millis(50)).await;
    let config = server.config().with_timeout(Duration::from_millis(1));
    let dispatcher = dispatcher(config);
    let ctx = CallContext::background();

    let response = dispatcher.get(Some(&ctx), "/slow", None, true).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(dispatcher.last_failure_time(), None);
}

#[tokio::test]
async fn test_caller_context_deadline_is_honoured() {
    let server = TestServer::start(200, REP_CONTENT, Duration::from_millis(500)).await;
    let dispatcher = dispatcher(server.config());
    let ctx = CallContext::with_timeout(Duration::from_millis(20));

    let result = dispatcher.get(Some(&ctx), "/slow", None, true).await;

    assert!(matches!(
        result,
        Err(ElsError::Context(ContextError::DeadlineExceeded))
    ));
    assert_eq!(
        dispatcher.last_failure_time(),
        Some(FixedClock::default().0)
    );
}

#[tokio::test]
async fn test_signing_error_prevents_call() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let dispatcher = dispatcher(server.config());
    let expired = Credential::new(
        "AK",
        "SAK",
        Some(FixedClock::default().0),
        "example@test.com",
    );
    let signer = ApiSigner::new(Some(expired)).unwrap();

    let result = dispatcher.get(None, "/path", Some(&signer), true).await;

    assert!(matches!(result, Err(ElsError::ExpiredCredential)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_connection_failure_is_recorded() {
    let addr = closed_addr().await;
    let config = ElsConfig::default()
        .with_scheme("http")
        .with_host(addr.to_string());
    let dispatcher = dispatcher(config);

    let result = dispatcher.get(None, "/path", None, true).await;

    assert!(matches!(result, Err(ElsError::Transport(_))));
    assert_eq!(
        dispatcher.last_failure_time(),
        Some(FixedClock::default().0)
    );
}

#[tokio::test]
async fn test_concurrent_calls_share_failure_tracking() {
    let slow = TestServer::start(200, REP_CONTENT, Duration::from_millis(500)).await;
    let fast = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let dispatcher = Arc::new(dispatcher(slow.config()));
    let fast_url = fast.url("/fast");

    let mut handles = Vec::new();
    for i in 0..8 {
        let dispatcher = dispatcher.clone();
        let fast_url = fast_url.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let ctx = CallContext::with_timeout(Duration::from_millis(10));
                dispatcher.get(Some(&ctx), "/slow", None, true).await.is_ok()
            } else {
                dispatcher.get(None, &fast_url, None, false).await.is_ok()
            }
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 4);
    assert_eq!(fast.requests().len(), 4);
    assert_eq!(
        dispatcher.last_failure_time(),
        Some(FixedClock::default().0)
    );
}

#[tokio::test]
async fn test_prepare_matches_what_is_sent() {
    let server = TestServer::start(200, REP_CONTENT, Duration::ZERO).await;
    let dispatcher = dispatcher(server.config());
    let signer = signer();

    let request = dispatcher.new_request(Method::GET, "/path").unwrap();
    let prepared = dispatcher
        .prepare(request, Some(&signer as &dyn Sign), true)
        .unwrap();
    let expected_auth = prepared
        .headers()
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    dispatcher.get(None, "/path", Some(&signer), true).await.unwrap();

    assert_eq!(
        server.last_request().header("authorization"),
        Some(expected_auth.as_str())
    );
}
