//! Chat backend against a mock OpenAI-compatible server

use std::time::Duration;

use docbot_core::{LanguageModel, Message};
use docbot_llm::{LlmConfig, LlmError, OpenAiBackend};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer, max_retries: u32) -> OpenAiBackend {
    OpenAiBackend::new(LlmConfig {
        endpoint: server.uri(),
        api_key: Some("sk-test".to_string()),
        max_retries,
        initial_backoff: Duration::from_millis(5),
        ..Default::default()
    })
    .unwrap()
}

fn completion(content: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
    }))
}

#[tokio::test]
async fn sends_messages_and_reads_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "reglas"},
                {"role": "user", "content": "como creo una cuenta?"}
            ]
        })))
        .respond_with(completion(json!("Ingrese a Plan de cuentas.")))
        .expect(1)
        .mount(&server)
        .await;

    let text = backend_for(&server, 0)
        .complete(&[Message::system("reglas"), Message::user("como creo una cuenta?")])
        .await
        .unwrap();
    assert_eq!(text, "Ingrese a Plan de cuentas.");
}

#[tokio::test]
async fn normalizes_content_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(json!([
            {"type": "text", "text": "Uno. "},
            {"type": "text", "text": "Dos."}
        ])))
        .mount(&server)
        .await;

    let text = backend_for(&server, 0).generate(&[Message::user("q")]).await.unwrap();
    assert_eq!(text, "Uno. Dos.");
}

#[tokio::test]
async fn retries_server_errors_then_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let err = backend_for(&server, 2).generate(&[Message::user("q")]).await.unwrap_err();
    assert!(matches!(err, LlmError::Network(_)));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend_for(&server, 3).generate(&[Message::user("q")]).await.unwrap_err();
    assert!(matches!(err, LlmError::Api(_)));
}

#[tokio::test]
async fn empty_completion_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(json!("   ")))
        .mount(&server)
        .await;

    let err = backend_for(&server, 0).generate(&[Message::user("q")]).await.unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse(_)));
}

#[tokio::test]
async fn availability_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    assert!(backend_for(&server, 0).is_available().await);
}
