pub mod cli;
pub mod extract;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod smoke;

use cli::{ Args, Command };
use llm::chat::{ new_client, ChatClient };
use log::{ info, warn };
use pipeline::{ FunctionPipeline, PipelineSettings };
use std::error::Error;
use std::io::{ self, Write };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = args.llm_config(|var| std::env::var(var).ok())?;

    info!("--- Core Configuration ---");
    info!("Command: {}", args.command.name());
    info!("Chat LLM Type: {}", config.llm_type);
    info!("Max Tokens: {}", args.max_tokens());
    info!("Call Delay: {:?}", args.call_delay());
    info!("-------------------------");

    let stdout = io::stdout();
    match &args.command {
        Command::Develop { description } => {
            let client = new_client(&config)?;
            log_client(client.as_ref());
            let description = match description {
                Some(d) => d.trim().to_string(),
                None => cli::read_description(&mut io::stdin().lock(), &mut stdout.lock())?,
            };
            if description.is_empty() {
                warn!("Empty function description; the model will have to guess");
            }

            let settings = PipelineSettings::default()
                .with_max_tokens(args.max_tokens())
                .with_call_delay(args.call_delay());
            let mut out = stdout.lock();
            FunctionPipeline::new(client.as_ref(), settings).run(&description, &mut out).await?;
            out.flush()?;
        }
        Command::Smoke { prompt } => {
            println!("Token loaded? {}", config.api_key.is_some());
            let client = new_client(&config)?;
            log_client(client.as_ref());
            let mut out = stdout.lock();
            smoke::run_smoke(client.as_ref(), prompt, args.max_tokens(), &mut out).await?;
        }
    }

    Ok(())
}

fn log_client(client: &dyn ChatClient) {
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={}",
        client.get_llm_type(),
        client.get_model(),
        client.get_base_url().as_deref().unwrap_or("none")
    );
}
