use clap::{ Parser, Subcommand };
use std::io::{ self, BufRead, Write };
use std::time::Duration;

use crate::llm::{ LlmConfig, LlmType, ParseLlmTypeError };
use crate::{ pipeline, smoke };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Type of LLM provider for chat completion (openai, replicate, ollama).
    /// Defaults to openai for `develop` and replicate for `smoke`.
    #[arg(long, env = "CHAT_LLM_TYPE", global = true)]
    pub llm_type: Option<String>,

    /// API key for the chat provider. Falls back to OPENAI_API_KEY or REPLICATE_API_TOKEN.
    #[arg(long, env = "CHAT_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name (e.g., gpt-4, meta/meta-llama-3-8b-instruct, llama3)
    #[arg(long, env = "CHAT_MODEL", global = true)] // No default, rely on command/adapter defaults
    pub model: Option<String>,

    /// Base URL for the provider API
    #[arg(long, env = "CHAT_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Maximum number of tokens per completion
    #[arg(long, env = "CHAT_MAX_TOKENS", global = true)]
    pub max_tokens: Option<u32>,

    /// Pause in milliseconds after each pipeline completion call (default 1000).
    #[arg(long, env = "CALL_DELAY_MS", global = true)]
    pub call_delay_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a Python function, then document it, then write unit tests for it.
    Develop {
        /// What the function should do. Read from stdin when omitted.
        #[arg(long, short = 'd')]
        description: Option<String>,
    },
    /// Send one prompt to a hosted model and print the reply.
    Smoke {
        #[arg(long, short = 'p', default_value = "Write a short motivational quote.")]
        prompt: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Develop { .. } => "develop",
            Command::Smoke { .. } => "smoke",
        }
    }

    pub fn default_llm_type(&self) -> LlmType {
        match self {
            Command::Develop { .. } => LlmType::OpenAI,
            Command::Smoke { .. } => LlmType::Replicate,
        }
    }

    pub fn default_max_tokens(&self) -> u32 {
        match self {
            Command::Develop { .. } => pipeline::DEFAULT_MAX_TOKENS,
            Command::Smoke { .. } => smoke::DEFAULT_MAX_TOKENS,
        }
    }
}

impl Args {
    pub fn llm_type(&self) -> Result<LlmType, ParseLlmTypeError> {
        match self.llm_type.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse(),
            _ => Ok(self.command.default_llm_type()),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or_else(|| self.command.default_max_tokens())
    }

    pub fn call_delay(&self) -> Duration {
        self.call_delay_ms.map(Duration::from_millis).unwrap_or(pipeline::DEFAULT_CALL_DELAY)
    }

    /// Builds the client configuration, taking the credential from `--api-key`
    /// first and the provider's own variable second.
    pub fn llm_config<F>(&self, lookup: F) -> Result<LlmConfig, ParseLlmTypeError>
        where F: Fn(&str) -> Option<String>
    {
        let llm_type = self.llm_type()?;
        let api_key = non_empty(self.api_key.clone()).or_else(||
            llm_type
                .api_key_var()
                .and_then(|var| non_empty(lookup(var)))
        );

        Ok(LlmConfig {
            llm_type,
            api_key,
            completion_model: non_empty(self.model.clone()),
            base_url: non_empty(self.base_url.clone()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Asks for the function description and reads a single line.
pub fn read_description<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<String> {
    writeln!(output, "\nWhat kind of function would you like to create?")?;
    writeln!(output, "Example: 'A function that calculates the factorial of a number'")?;
    write!(output, "Your description: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
