use function_forge::llm::chat::ollama::OllamaClient;
use function_forge::llm::chat::ChatClient;
use function_forge::models::Conversation;
use serde_json::json;
use wiremock::matchers::{ body_partial_json, method, path };
use wiremock::{ Mock, MockServer, ResponseTemplate };

#[tokio::test]
async fn posts_messages_to_chat_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(
            body_partial_json(
                json!({
                "model": "llama3",
                "stream": false,
                "options": { "num_predict": 32 },
                "messages": [{ "role": "user", "content": "hi" }]
            })
            )
        )
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                json!({
                "model": "llama3",
                "message": { "role": "assistant", "content": "hello" },
                "done": true
            })
            )
        )
        .expect(1)
        .mount(&server).await;

    let client = OllamaClient::new(Some(server.uri()), None);
    let resp = client.complete(&Conversation::single_user("hi"), 32).await.unwrap();
    assert_eq!(resp.response, "hello");
}
