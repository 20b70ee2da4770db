use async_trait::async_trait;
use log::{ debug, info };
use reqwest::header::HeaderValue;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{ bearer_headers, require_api_key, ChatClient, ChatError, CompletionResponse };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::{ Conversation, Role };

pub const DEFAULT_MODEL: &str = "meta/meta-llama-3-8b-instruct";
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Client for Replicate's hosted prediction API.
///
/// Accepts either `owner/name` (latest version of an official model) or
/// `owner/name:version` model identifiers.
pub struct ReplicateClient {
    http: HttpClient,
    model: String,
    base_url: String,
    poll_interval: Duration,
}

#[derive(Serialize)]
struct PredictionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    input: PredictionInput,
}

#[derive(Serialize)]
struct PredictionInput {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<String>,
    max_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<JsonValue>,
    #[serde(default)]
    error: Option<JsonValue>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Deserialize, Debug)]
struct PredictionUrls {
    get: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }
}

impl ReplicateClient {
    pub fn new(
        api_token: &str,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ChatError> {
        let mut headers = bearer_headers(api_token)?;
        headers.insert("prefer", HeaderValue::from_static("wait"));

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_token = require_api_key(config)?;
        Self::new(&api_token, config.completion_model.clone(), config.base_url.clone())
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn create_request(&self, input: PredictionInput) -> (String, PredictionRequest) {
        let base = self.base_url.trim_end_matches('/');
        match self.model.split_once(':') {
            Some((_, version)) => (
                format!("{}/v1/predictions", base),
                PredictionRequest { version: Some(version.to_string()), input },
            ),
            None => (
                format!("{}/v1/models/{}/predictions", base, self.model),
                PredictionRequest { version: None, input },
            ),
        }
    }

    async fn wait_for(&self, mut prediction: Prediction) -> Result<Prediction, ChatError> {
        while !prediction.is_terminal() {
            let Some(url) = prediction.urls.as_ref().and_then(|u| u.get.clone()) else {
                return Err(ChatError::Prediction {
                    id: prediction.id,
                    status: prediction.status,
                    message: "no polling URL returned".to_string(),
                });
            };
            debug!("Prediction {} is {}, polling again", prediction.id, prediction.status);
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.http
                .get(&url)
                .send().await?
                .error_for_status()?
                .json::<Prediction>().await?;
        }
        Ok(prediction)
    }
}

/// Flattens a conversation into Replicate's `prompt` / `system_prompt` pair.
fn render_prompt(conversation: &Conversation) -> (String, Option<String>) {
    let system = conversation
        .messages()
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>();
    let system_prompt = if system.is_empty() { None } else { Some(system.join("\n\n")) };

    let turns = conversation
        .messages()
        .iter()
        .filter(|m| m.role != Role::System)
        .collect::<Vec<_>>();

    let prompt = match turns.as_slice() {
        [only] if only.role == Role::User => only.content.clone(),
        _ => {
            let mut rendered = turns
                .iter()
                .map(|m| {
                    let speaker = if m.role == Role::User { "User" } else { "Assistant" };
                    format!("{}: {}", speaker, m.content)
                })
                .collect::<Vec<_>>();
            rendered.push("Assistant:".to_string());
            rendered.join("\n\n")
        }
    };

    (prompt, system_prompt)
}

fn join_output(output: Option<JsonValue>) -> String {
    match output {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s,
        Some(JsonValue::Array(chunks)) =>
            chunks
                .into_iter()
                .map(|chunk| match chunk {
                    JsonValue::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        Some(other) => other.to_string(),
    }
}

fn error_message(error: Option<JsonValue>) -> String {
    match error {
        Some(JsonValue::String(s)) => s,
        None | Some(JsonValue::Null) => "no error detail".to_string(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl ChatClient for ReplicateClient {
    async fn complete(
        &self,
        conversation: &Conversation,
        max_tokens: u32
    ) -> Result<CompletionResponse, ChatError> {
        let (prompt, system_prompt) = render_prompt(conversation);
        let (url, req) = self.create_request(PredictionInput { prompt, system_prompt, max_tokens });

        debug!("Replicate request: model {} via {}", self.model, url);
        let created = self.http
            .post(&url)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<Prediction>().await?;
        info!("Replicate prediction {} created ({})", created.id, created.status);

        let prediction = self.wait_for(created).await?;
        if prediction.status != "succeeded" {
            return Err(ChatError::Prediction {
                id: prediction.id,
                status: prediction.status,
                message: error_message(prediction.error),
            });
        }

        Ok(CompletionResponse { response: join_output(prediction.output) })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn get_llm_type(&self) -> LlmType {
        LlmType::Replicate
    }
}
