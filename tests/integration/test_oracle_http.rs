//! Integration tests for the Messages API oracle client
//!
//! These tests run `ClaudeOracle` against a local axum server that imitates
//! the Anthropic Messages API, covering successful answers, HTTP failures and
//! malformed bodies, and a full session turn over HTTP.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use lingo_tutor::{
    ClaudeOracle, Config, Oracle, OracleConfig, SessionManager, TransportKind, TutorError,
    FALLBACK_REPLY,
};
use serde_json::{json, Value};

/// One canned HTTP response.
#[derive(Clone)]
struct MockReply {
    status: StatusCode,
    body: String,
}

impl MockReply {
    fn text(text: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({
                "id": "msg_test",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": text}],
                "stop_reason": "end_turn"
            })
            .to_string(),
        }
    }

    fn status(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// Shared state of the mock server.
#[derive(Default)]
struct MockState {
    replies: Mutex<Vec<MockReply>>,
    requests: Mutex<Vec<(HeaderMap, Value)>>,
}

async fn handle_messages(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push((headers, body));

    let mut replies = state.replies.lock().unwrap();
    let reply = if replies.is_empty() {
        MockReply::status(StatusCode::INTERNAL_SERVER_ERROR, "script exhausted")
    } else {
        replies.remove(0)
    };

    (
        reply.status,
        [("content-type", "application/json")],
        reply.body,
    )
}

/// Finds an available port for the test server.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Spawns the mock server and returns its endpoint URL and shared state.
async fn spawn_mock_server(replies: Vec<MockReply>) -> (String, Arc<MockState>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let endpoint = format!("http://{addr}/v1/messages");

    let state = Arc::new(MockState {
        replies: Mutex::new(replies),
        requests: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route("/v1/messages", post(handle_messages))
        .with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (endpoint, state)
}

fn oracle_config(endpoint: &str) -> OracleConfig {
    OracleConfig {
        endpoint: endpoint.to_string(),
        timeout_seconds: 5,
        ..OracleConfig::default()
    }
}

fn transport_kind(err: &TutorError) -> Option<TransportKind> {
    match err {
        TutorError::OracleTransport { kind, .. } => Some(*kind),
        _ => None,
    }
}

#[tokio::test]
async fn test_successful_completion() {
    let (endpoint, state) = spawn_mock_server(vec![MockReply::text("Bonjour!")]).await;
    let oracle = ClaudeOracle::new("test-key", &oracle_config(&endpoint)).unwrap();

    let answer = oracle.complete("Say hello in French").await.unwrap();
    assert_eq!(answer, "Bonjour!");

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (headers, body) = &requests[0];
    assert_eq!(headers["x-api-key"], "test-key");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["model"], OracleConfig::default().model);
    assert_eq!(body["max_tokens"], 1024);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "Say hello in French");
}

#[tokio::test]
async fn test_text_blocks_are_concatenated() {
    let body = json!({
        "content": [
            {"type": "text", "text": "Hola, "},
            {"type": "tool_use", "id": "x", "name": "noop", "input": {}},
            {"type": "text", "text": "amigo"}
        ]
    })
    .to_string();
    let (endpoint, _) = spawn_mock_server(vec![MockReply::status(StatusCode::OK, &body)]).await;
    let oracle = ClaudeOracle::new("k", &oracle_config(&endpoint)).unwrap();

    assert_eq!(oracle.complete("hi").await.unwrap(), "Hola, amigo");
}

#[tokio::test]
async fn test_http_failures_are_classified() {
    let cases = [
        (StatusCode::UNAUTHORIZED, TransportKind::Authentication),
        (StatusCode::TOO_MANY_REQUESTS, TransportKind::RateLimit),
        (StatusCode::INTERNAL_SERVER_ERROR, TransportKind::Server),
        (StatusCode::GATEWAY_TIMEOUT, TransportKind::Timeout),
        (StatusCode::BAD_REQUEST, TransportKind::Other),
    ];
    let replies = cases
        .iter()
        .map(|(status, _)| MockReply::status(*status, r#"{"type":"error"}"#))
        .collect();
    let (endpoint, _) = spawn_mock_server(replies).await;
    let oracle = ClaudeOracle::new("k", &oracle_config(&endpoint)).unwrap();

    for (status, expected) in cases {
        let err = oracle.complete("hi").await.unwrap_err();
        assert_eq!(transport_kind(&err), Some(expected), "status {status}");
        assert!(err.to_string().contains(status.as_str()));
    }
}

#[tokio::test]
async fn test_malformed_body_is_transport_error() {
    let (endpoint, _) = spawn_mock_server(vec![
        MockReply::status(StatusCode::OK, "not json at all"),
        MockReply::status(StatusCode::OK, r#"{"content": []}"#),
    ])
    .await;
    let oracle = ClaudeOracle::new("k", &oracle_config(&endpoint)).unwrap();

    let err = oracle.complete("hi").await.unwrap_err();
    assert_eq!(transport_kind(&err), Some(TransportKind::Other));

    let err = oracle.complete("hi").await.unwrap_err();
    assert_eq!(transport_kind(&err), Some(TransportKind::Other));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let port = find_available_port();
    let endpoint = format!("http://127.0.0.1:{port}/v1/messages");
    let oracle = ClaudeOracle::new("k", &oracle_config(&endpoint)).unwrap();

    let err = oracle.complete("hi").await.unwrap_err();
    assert_eq!(transport_kind(&err), Some(TransportKind::Network));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_session_turn_over_http() {
    let analysis = json!({
        "grammarErrors": [
            {"error": "I seen", "correction": "I saw", "explanation": "Use simple past tense"}
        ],
        "positiveAspects": ["Good sentence structure"],
        "overallFeedback": "Nice",
        "suggestedImprovement": "Irregular verbs"
    })
    .to_string();
    let (endpoint, state) = spawn_mock_server(vec![
        MockReply::text(&analysis),
        MockReply::text("  Who did you see?  "),
    ])
    .await;

    let config = Config {
        oracle: oracle_config(&endpoint),
        ..Config::default()
    };
    let oracle = ClaudeOracle::new("k", &config.oracle).unwrap();
    let session = SessionManager::new(Arc::new(oracle), &config);

    let outcome = session.submit("I seen him yesterday").await;
    let report = outcome.report().expect("turn should complete");

    assert_eq!(report.tutor_message.text, "Who did you see?");
    assert_eq!(report.feedback[0].message(), "\"I seen\" → \"I saw\"");
    assert_eq!(session.stats().await.grammar_correction_count, 1);
    assert_eq!(state.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_session_turn_with_server_down_uses_fallbacks() {
    let (endpoint, _) = spawn_mock_server(vec![
        MockReply::status(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
        MockReply::status(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
    ])
    .await;

    let config = Config {
        oracle: oracle_config(&endpoint),
        ..Config::default()
    };
    let oracle = ClaudeOracle::new("k", &config.oracle).unwrap();
    let session = SessionManager::new(Arc::new(oracle), &config);

    let outcome = session.submit("Hello there").await;
    let report = outcome.report().expect("turn should complete");

    assert_eq!(report.tutor_message.text, FALLBACK_REPLY);
    assert!(!report.degraded);
    assert_eq!(session.stats().await.message_count, 1);
}
