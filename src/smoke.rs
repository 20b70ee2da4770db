use log::info;
use std::io::{ self, Write };
use thiserror::Error;

use crate::llm::chat::{ ChatClient, ChatError };
use crate::models::Conversation;

pub const DEFAULT_MAX_TOKENS: u32 = 50;

#[derive(Debug, Error)]
pub enum SmokeError {
    #[error("Smoke completion failed: {0}")]
    Chat(#[from] ChatError),
    #[error("Failed to write smoke output: {0}")]
    Io(#[from] io::Error),
}

/// One-shot prompt against the configured provider, printed as `AI says: ...`.
pub async fn run_smoke<W: Write + ?Sized>(
    client: &dyn ChatClient,
    prompt: &str,
    max_tokens: u32,
    out: &mut W
) -> Result<String, SmokeError> {
    info!("Smoke test against {} model {}", client.get_llm_type(), client.get_model());
    let completion = client.complete(&Conversation::single_user(prompt), max_tokens).await?;
    let reply = completion.response.trim().to_string();
    writeln!(out, "AI says: {}", reply)?;
    Ok(reply)
}
