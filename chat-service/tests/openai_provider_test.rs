//! OpenAI provider against a stubbed `/chat/completions` endpoint.

use chat_service::models::Message;
use chat_service::services::providers::{
    CompletionError, CompletionProvider, OpenAiConfig, OpenAiProvider,
};
use secrecy::Secret;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer, timeout_secs: u64) -> OpenAiProvider {
    OpenAiProvider::new(OpenAiConfig {
        api_key: Secret::new("sk-test".to_string()),
        base_url: format!("{}/v1", server.uri()),
        model: "gpt-4o-mini".to_string(),
        timeout_secs,
    })
    .expect("provider should build")
}

fn conversation() -> Vec<Message> {
    vec![
        Message::system("be kind"),
        Message::user("I miss my ex"),
    ]
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
    })
}

#[tokio::test]
async fn sends_fixed_parameters_and_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 500,
            "messages": [
                {"role": "system", "content": "be kind"},
                {"role": "user", "content": "I miss my ex"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("That sounds hard.")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = provider_for(&server, 5).complete(&conversation()).await;
    assert_eq!(reply, Ok("That sounds hard.".to_string()));
}

#[tokio::test]
async fn maps_unauthorized_with_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server, 5)
        .complete(&conversation())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CompletionError::Unauthorized("Incorrect API key provided".to_string())
    );
}

#[tokio::test]
async fn maps_rate_limit_and_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = provider_for(&server, 5);

    let err = provider.complete(&conversation()).await.unwrap_err();
    assert_eq!(err, CompletionError::RateLimited("slow down".to_string()));

    let err = provider.complete(&conversation()).await.unwrap_err();
    assert_eq!(err.to_string(), "Error code: 500 - boom");
}

#[tokio::test]
async fn does_not_retry_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider_for(&server, 5).complete(&conversation()).await;
    assert!(matches!(result, Err(CompletionError::Api { status: 503, .. })));
}

#[tokio::test]
async fn rejects_malformed_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let provider = provider_for(&server, 5);

    for _ in 0..2 {
        let result = provider.complete(&conversation()).await;
        assert!(matches!(result, Err(CompletionError::MalformedResponse(_))));
    }
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = provider_for(&server, 1).complete(&conversation()).await;
    assert_eq!(result, Err(CompletionError::Timeout(1)));
}

#[tokio::test]
async fn health_check_lists_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(provider_for(&server, 5).health_check().await, Ok(()));
}
