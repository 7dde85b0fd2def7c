use anyhow::Result;
use std::sync::Arc;

use dialogos_llm::{Bot, CallParams, OpenAiProvider, Provider, QueueMode};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY")?;
    let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(api_key)?);

    let mut bot = Bot::new(provider)
        .with_defaults(CallParams::new().model("gpt-4o-mini"))
        .with_mode(QueueMode::Response);

    bot.user("Pick a random animal and describe it in one sentence.");
    if let Some(reply) = bot.reply().await? {
        println!("First: {}", reply.content.as_text().unwrap_or_default());
    }

    // The provider-assigned response id is threaded automatically, so the
    // follow-up continues the exchange without resending history
    bot.user("What does it eat?");
    if let Some(reply) = bot.reply().await? {
        println!("Second: {}", reply.content.as_text().unwrap_or_default());
    }

    Ok(())
}
