use anyhow::Result;
use std::sync::Arc;

use dialogos_llm::{Bot, CallParams, OpenAiProvider, Provider};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY")?;
    let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(api_key)?);

    let mut bot = Bot::new(provider).with_defaults(CallParams::new().model("gpt-4o-mini"));

    // Nothing is sent yet; the backlog resolves in one call on first read
    bot.system("You answer in one sentence.")
        .user("What is the capital of France?");

    if let Some(reply) = bot.reply().await? {
        println!("Response: {}", reply.content.as_text().unwrap_or_default());
    }

    if let Some(usage) = bot.usage() {
        println!("Tokens used: {}", usage.total_tokens);
    }

    Ok(())
}
