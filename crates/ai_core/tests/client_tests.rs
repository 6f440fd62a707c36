//! End-to-end client behavior against a mock upstream

use ai_core::{
    ChatCompletions, ChatRequest, GenerationParams, NvidiaClient, UpstreamConfig, UpstreamError,
    delta_stream,
};
use futures::StreamExt;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn config_for(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig {
        base_url: server.uri(),
        retry_attempts: 2,
        ..UpstreamConfig::default()
    }
}

fn client_for(server: &MockServer) -> NvidiaClient {
    NvidiaClient::new(
        config_for(server),
        Some(SecretString::from("test-key-0123456789")),
    )
    .unwrap()
}

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"content": text}}]
    }))
}

#[tokio::test]
async fn buffered_completion_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key-0123456789"))
        .respond_with(completion("Hello!"))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server)
        .complete(ChatRequest::from_prompt("hi"))
        .await
        .unwrap();
    assert_eq!(text, "Hello!");
}

#[tokio::test]
async fn retries_on_rate_limit_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(FlakyUpstream::new(1, completion("after retry")))
        .expect(2)
        .mount(&server)
        .await;

    let text = client_for(&server)
        .complete(ChatRequest::from_prompt("hi"))
        .await
        .unwrap();
    assert_eq!(text, "after retry");
}

#[tokio::test]
async fn retry_caps_max_tokens() {
    let server = MockServer::start().await;
    // First attempt fails; the retry must carry the capped token budget.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 64})))
        .respond_with(completion("short"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 200})))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let request = ChatRequest::from_prompt("hi").with_params(GenerationParams {
        max_tokens: 200,
        ..GenerationParams::default()
    });
    let text = client_for(&server).complete(request).await.unwrap();
    assert_eq!(text, "short");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "bad prompt"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(ChatRequest::from_prompt("hi"))
        .await
        .unwrap_err();
    match err {
        UpstreamError::Rejected { status, message, .. } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad prompt");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn exhausted_retries_surface_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(ChatRequest::from_prompt("hi"))
        .await
        .unwrap_err();
    match err {
        UpstreamError::Rejected { status, .. } => assert_eq!(status, 503),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_credential_short_circuits() {
    let server = MockServer::start().await;
    let client = NvidiaClient::new(config_for(&server), None).unwrap();

    let err = client
        .complete(ChatRequest::from_prompt("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::MissingCredential));
    assert!(!client.has_credential());
    assert!(client.credential_hint().is_none());

    let Err(err) = client.complete_stream(ChatRequest::from_prompt("hi")).await else {
        panic!("expected a missing-credential error");
    };
    assert!(matches!(err, UpstreamError::MissingCredential));
}

#[tokio::test]
async fn streaming_relays_raw_bytes() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"there\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let stream = client_for(&server)
        .complete_stream(ChatRequest::from_prompt("hi"))
        .await
        .unwrap();
    let deltas: Vec<String> = delta_stream(stream).map(|d| d.unwrap()).collect().await;
    assert_eq!(deltas, vec!["Hi ".to_string(), "there".to_string()]);
}

#[tokio::test]
async fn streaming_rejection_surfaces_before_any_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "invalid key"}
        })))
        .mount(&server)
        .await;

    let Err(err) = client_for(&server)
        .complete_stream(ChatRequest::from_prompt("hi"))
        .await
    else {
        panic!("expected a rejection before any bytes");
    };
    match err {
        UpstreamError::Rejected { status, message, .. } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Fails the first `failures` requests with 429, then delegates.
struct FlakyUpstream {
    failures: usize,
    seen: std::sync::atomic::AtomicUsize,
    success: ResponseTemplate,
}

impl FlakyUpstream {
    fn new(failures: usize, success: ResponseTemplate) -> Self {
        Self {
            failures,
            seen: std::sync::atomic::AtomicUsize::new(0),
            success,
        }
    }
}

impl Respond for FlakyUpstream {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n < self.failures {
            ResponseTemplate::new(429)
        } else {
            self.success.clone()
        }
    }
}
