use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ bearer_headers, require_api_key, ChatClient, ChatError, CompletionResponse };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::Conversation;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: Option<String>,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ChatError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let http = HttpClient::builder().default_headers(bearer_headers(api_key)?).build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_key = require_api_key(config)?;
        Self::new(&api_key, config.completion_model.clone(), config.base_url.clone())
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        conversation: &Conversation,
        max_tokens: u32
    ) -> Result<CompletionResponse, ChatError> {
        let url = self.endpoint();

        let messages = conversation
            .messages()
            .iter()
            .map(|m| OpenAIMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
            })
            .collect();

        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
        };

        debug!("OpenAI request: {} messages to {}", conversation.len(), url);
        let resp = self.http
            .post(&url)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<OpenAIResponse>().await?;

        let content = resp.choices
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyResponse(LlmType::OpenAI))?
            .message.content
            .unwrap_or_default();

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn get_llm_type(&self) -> LlmType {
        LlmType::OpenAI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> OpenAIChatClient {
        OpenAIChatClient::new("sk-test", None, Some(base_url.to_string())).unwrap()
    }

    #[test]
    fn defaults_to_gpt4_on_public_api() {
        let client = OpenAIChatClient::new("sk-test", None, None).unwrap();
        assert_eq!(client.get_model(), "gpt-4");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn endpoint_accepts_common_base_url_shapes() {
        assert_eq!(client("http://x/").endpoint(), "http://x/v1/chat/completions");
        assert_eq!(client("http://x/v1").endpoint(), "http://x/v1/chat/completions");
        assert_eq!(
            client("http://x/v1/chat/completions").endpoint(),
            "http://x/v1/chat/completions"
        );
    }
}
