use anyhow::Result;
use std::sync::Arc;

use dialogos_llm::{Bot, CallParams, OpenAiProvider, Provider, WriteSink};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY")?;
    let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(api_key)?);

    let mut bot = Bot::new(provider).with_defaults(CallParams::new().model("gpt-4o-mini"));

    bot.user("Tell me a two-sentence story about a lighthouse.");

    // Deltas are echoed to the sink as they arrive; the completed
    // conversation is still materialized afterwards
    bot.stream(Box::new(WriteSink::new(std::io::stdout()))).await?;
    println!();

    Ok(())
}
