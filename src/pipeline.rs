//! Three-stage function development: implement, document, then test.
//!
//! Every stage appends a user prompt, replays the whole transcript to the
//! chat client, extracts the first code block from the reply and appends it
//! back as a fenced assistant turn. The transcript therefore grows by exactly
//! two messages per stage.

use log::{ debug, info };
use std::io::{ self, Write };
use std::time::Duration;
use thiserror::Error;

use crate::extract::{ extract_code_block, fence };
use crate::llm::chat::{ ChatClient, ChatError };
use crate::models::Conversation;

pub const SYSTEM_PROMPT: &str = "You are a Python expert helping to develop a function.";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Completion failed during {stage}: {source}")]
    Chat {
        stage: &'static str,
        #[source]
        source: ChatError,
    },
    #[error("Failed to write pipeline output: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Implement,
    Document,
    Test,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Implement => "Initial Function",
            Stage::Document => "Documented Function",
            Stage::Test => "Test Cases",
        }
    }

    pub fn prompt(&self, description: &str) -> String {
        match self {
            Stage::Implement =>
                format!(
                    "Write a Python function that {}. Output the function in a ```python code block```.",
                    description
                ),
            Stage::Document =>
                "Add comprehensive documentation to this function, including description, parameters, \
                 return value, examples, and edge cases. Output the function in a ```python code block```.".to_string(),
            Stage::Test =>
                "Add unittest test cases for this function, including tests for basic functionality, \
                 edge cases, error cases, and various input scenarios. Output the code in a ```python code block```.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub max_tokens: u32,
    /// Pause after every successful completion call.
    pub call_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            call_delay: DEFAULT_CALL_DELAY,
        }
    }
}

impl PipelineSettings {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_call_delay(mut self, call_delay: Duration) -> Self {
        self.call_delay = call_delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub initial_function: String,
    pub documented_function: String,
    pub test_cases: String,
    pub transcript: Conversation,
}

pub struct FunctionPipeline<'a> {
    client: &'a dyn ChatClient,
    settings: PipelineSettings,
}

impl<'a> FunctionPipeline<'a> {
    pub fn new(client: &'a dyn ChatClient, settings: PipelineSettings) -> Self {
        Self { client, settings }
    }

    pub async fn run<W: Write + ?Sized>(
        &self,
        description: &str,
        out: &mut W
    ) -> Result<PipelineOutput, PipelineError> {
        let mut conversation = Conversation::with_system(SYSTEM_PROMPT);

        let initial_function = self.report_stage(Stage::Implement, description, &mut conversation, out).await?;
        let documented_function = self.report_stage(Stage::Document, description, &mut conversation, out).await?;
        let test_cases = self.report_stage(Stage::Test, description, &mut conversation, out).await?;

        Ok(PipelineOutput {
            initial_function,
            documented_function,
            test_cases,
            transcript: conversation,
        })
    }

    async fn report_stage<W: Write + ?Sized>(
        &self,
        stage: Stage,
        description: &str,
        conversation: &mut Conversation,
        out: &mut W
    ) -> Result<String, PipelineError> {
        let code = self.run_stage(stage, description, conversation).await?;
        writeln!(out, "\n=== {} ===", stage.label())?;
        writeln!(out, "{}", code)?;
        Ok(code)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        description: &str,
        conversation: &mut Conversation
    ) -> Result<String, PipelineError> {
        info!("Stage '{}' started ({} messages so far)", stage.label(), conversation.len());
        conversation.push_user(stage.prompt(description));

        let raw = self.generate(conversation).await.map_err(|source| PipelineError::Chat {
            stage: stage.label(),
            source,
        })?;
        let code = extract_code_block(&raw).to_string();

        conversation.push_assistant(fence(&code));
        info!("Stage '{}' finished ({} chars extracted)", stage.label(), code.len());
        Ok(code)
    }

    async fn generate(&self, conversation: &Conversation) -> Result<String, ChatError> {
        let completion = self.client.complete(conversation, self.settings.max_tokens).await?;
        if !self.settings.call_delay.is_zero() {
            debug!("Throttling for {:?}", self.settings.call_delay);
            tokio::time::sleep(self.settings.call_delay).await;
        }
        Ok(completion.response)
    }
}
