mod support;

use pretty_assertions::assert_eq;
use webreview_sync::api_client::{HttpSigningService, SigningService};
use webreview_sync::session::{API_KEY_HEADER, Session};
use webreview_sync::signer::build_batch_signing_request;
use webreview_sync::types::Verb;
use webreview_sync::SyncError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIGN_PATH: &str = "/_ah/api/webreview/v0/sign_requests";
const FINALIZE_PATH: &str = "/_ah/api/webreview/v0/finalize";

fn service(server: &MockServer, session: Session) -> HttpSigningService {
    let config = support::test_config(&server.address().to_string());
    HttpSigningService::new(&config, session).unwrap()
}

fn sign_request() -> webreview_sync::types::SignRequestsRequest {
    build_batch_signing_request(
        Verb::Get,
        &support::test_fileset(),
        &support::paths_only(&["/a.txt", "/b.txt"]),
    )
}

#[tokio::test]
async fn api_root_follows_config() {
    let server = MockServer::start().await;
    let svc = service(&server, Session::Anonymous);
    assert_eq!(svc.api_root(), format!("{}/_ah/api/webreview/v0", server.uri()));
}

#[tokio::test]
async fn sign_requests_posts_batch_and_parses_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .and(body_partial_json(serde_json::json!({
            "fileset": { "name": "staging", "project": { "nickname": "site" } },
            "unsigned_requests": [
                { "path": "/a.txt", "verb": "GET" },
                { "path": "/b.txt", "verb": "GET" }
            ]
        })))
        .respond_with(support::SigningResponder {
            store_uri: "http://store.test".into(),
        })
        .expect(1)
        .mount(&server)
        .await;

    let resp = service(&server, Session::Anonymous)
        .sign_requests(&sign_request())
        .await
        .unwrap();
    assert_eq!(resp.signed_requests.len(), 2);
    assert_eq!(resp.signed_requests[0].url, "http://store.test/bucket/a.txt");
    assert_eq!(resp.signed_requests[1].params.expires, 1_700_000_000);
}

#[tokio::test]
async fn api_key_session_sends_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .and(header(API_KEY_HEADER, "key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = service(&server, Session::ApiKey("key-123".into()))
        .sign_requests(&sign_request())
        .await
        .unwrap();
    assert!(resp.signed_requests.is_empty());
}

#[tokio::test]
async fn access_token_session_sends_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FINALIZE_PATH))
        .and(header("Authorization", "Bearer ya29.token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = service(&server, Session::AccessToken("ya29.token".into()))
        .finalize(&support::test_fileset())
        .await
        .unwrap();
    assert_eq!(resp, serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn endpoints_error_becomes_signing_rpc_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "You do not have access to owner/site." }
        })))
        .mount(&server)
        .await;

    let err = service(&server, Session::Anonymous)
        .sign_requests(&sign_request())
        .await
        .unwrap_err();
    match err {
        SyncError::SigningRpc { status, message } => {
            assert_eq!(status, Some(403));
            assert_eq!(message, "You do not have access to owner/site.");
        }
        other => panic!("expected SigningRpc, got {other:?}"),
    }
}

#[tokio::test]
async fn finalize_failure_is_signing_rpc_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FINALIZE_PATH))
        .and(body_partial_json(serde_json::json!({ "fileset": { "name": "staging" } })))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = service(&server, Session::Anonymous)
        .finalize(&support::test_fileset())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::SigningRpc { status: Some(500), ref message } if message == "Internal Server Error"
    ));
}

#[tokio::test]
async fn finalize_with_empty_body_is_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FINALIZE_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let resp = service(&server, Session::Anonymous)
        .finalize(&support::test_fileset())
        .await
        .unwrap();
    assert_eq!(resp, serde_json::json!({}));
}

#[tokio::test]
async fn malformed_response_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = service(&server, Session::Anonymous)
        .sign_requests(&sign_request())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Serialization(_)));
}

#[tokio::test]
async fn unreachable_service_has_no_status() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let svc = HttpSigningService::new(&support::test_config(&host), Session::Anonymous).unwrap();
    let err = svc.sign_requests(&sign_request()).await.unwrap_err();
    assert!(matches!(err, SyncError::SigningRpc { status: None, .. }));
}

/// Answers one request with a 500 whose body stops short of its Content-Length.
fn serve_truncated_error() -> String {
    use std::io::{Read, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let host = listener.local_addr().unwrap().to_string();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).unwrap();
            received.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&received);
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if received.len() >= end + 4 + body_len {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        stream
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\nshort")
            .unwrap();
    });
    host
}

#[tokio::test]
async fn unreadable_error_body_is_named_in_message() {
    let host = serve_truncated_error();
    let svc = HttpSigningService::new(&support::test_config(&host), Session::Anonymous).unwrap();

    let err = svc.sign_requests(&sign_request()).await.unwrap_err();
    match err {
        SyncError::SigningRpc { status, message } => {
            assert_eq!(status, Some(500));
            assert!(message.starts_with("<unreadable body: "), "message: {message}");
        }
        other => panic!("expected SigningRpc, got {other:?}"),
    }
}

#[test]
fn session_debug_redacts_secrets() {
    let rendered = format!("{:?}", Session::ApiKey("super-secret".into()));
    assert!(!rendered.contains("super-secret"));
    assert!(Session::default().is_anonymous());
}
