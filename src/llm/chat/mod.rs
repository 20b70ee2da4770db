pub mod ollama;
pub mod openai;
pub mod replicate;

use async_trait::async_trait;
use reqwest::header::{ HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE };
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use super::{ LlmConfig, LlmType };
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use self::replicate::ReplicateClient;
use crate::models::Conversation;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub response: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{provider} API key is required (set {var} or pass --api-key)")]
    MissingApiKey {
        provider: LlmType,
        var: &'static str,
    },
    #[error("Invalid API key format: {0}")]
    InvalidApiKey(#[from] InvalidHeaderValue),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("No response from {0} API")]
    EmptyResponse(LlmType),
    #[error("Prediction {id} {status}: {message}")]
    Prediction {
        id: String,
        status: String,
        message: String,
    },
}

/// Remote text-completion capability.
///
/// Implementations replay the whole conversation on each call and return a
/// single completion. They never retry.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        conversation: &Conversation,
        max_tokens: u32
    ) -> Result<CompletionResponse, ChatError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
    fn get_llm_type(&self) -> LlmType;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ChatError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Replicate => {
            let specific_client = ReplicateClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

pub(crate) fn require_api_key(config: &LlmConfig) -> Result<String, ChatError> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(ChatError::MissingApiKey {
            provider: config.llm_type,
            var: config.llm_type.api_key_var().unwrap_or("CHAT_API_KEY"),
        }),
    }
}

pub(crate) fn bearer_headers(api_key: &str) -> Result<HeaderMap, ChatError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", api_key))?);
    Ok(headers)
}
