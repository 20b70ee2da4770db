//! OpenAI adapter against a mocked chat completions endpoint.

use function_forge::llm::chat::{ new_client, ChatClient, ChatError };
use function_forge::llm::chat::openai::OpenAIChatClient;
use function_forge::llm::{ LlmConfig, LlmType };
use function_forge::models::Conversation;
use serde_json::json;
use wiremock::matchers::{ body_partial_json, header, method, path };
use wiremock::{ Mock, MockServer, ResponseTemplate };

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn sends_full_conversation_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(
            body_partial_json(
                json!({
                "model": "gpt-4",
                "max_tokens": 1024,
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "q1" },
                    { "role": "assistant", "content": "a1" },
                    { "role": "user", "content": "q2" }
                ]
            })
            )
        )
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("a2")))
        .expect(1)
        .mount(&server).await;

    let client = OpenAIChatClient::new("sk-test", None, Some(server.uri())).unwrap();
    let mut conversation = Conversation::with_system("sys");
    conversation.push_user("q1");
    conversation.push_assistant("a1");
    conversation.push_user("q2");

    let resp = client.complete(&conversation, 1024).await.unwrap();
    assert_eq!(resp.response, "a2");
}

#[tokio::test]
async fn factory_honours_configured_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(1)
        .mount(&server).await;

    let config = LlmConfig {
        llm_type: LlmType::OpenAI,
        api_key: Some("sk-test".to_string()),
        completion_model: Some("gpt-4o-mini".to_string()),
        base_url: Some(server.uri()),
    };
    let client = new_client(&config).unwrap();
    assert_eq!(client.get_model(), "gpt-4o-mini");

    let resp = client.complete(&Conversation::single_user("hi"), 8).await.unwrap();
    assert_eq!(resp.response, "ok");
}

#[tokio::test]
async fn empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server).await;

    let client = OpenAIChatClient::new("sk-test", None, Some(server.uri())).unwrap();
    let err = client.complete(&Conversation::single_user("hi"), 8).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyResponse(LlmType::OpenAI)));
}

#[tokio::test]
async fn http_errors_propagate_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server).await;

    let client = OpenAIChatClient::new("sk-test", None, Some(server.uri())).unwrap();
    let err = client.complete(&Conversation::single_user("hi"), 8).await.unwrap_err();
    match err {
        ChatError::Http(e) => assert_eq!(e.status().map(|s| s.as_u16()), Some(429)),
        other => panic!("unexpected error: {other}"),
    }
}
