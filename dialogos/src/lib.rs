//! # Dialogos - Unified LLM Client for Rust
//!
//! Dialogos gives several LLM provider APIs one consistent interface with:
//! - **Lazy conversations** (queued turns resolve in exactly one call on first read)
//! - **Real-time streaming** (token-by-token deltas over SSE, merged incrementally)
//! - **Stateless and stateful modes** (chat completions or response chaining)
//! - **Async/await** (built on Tokio)
//! - **Type-safe** (provider dialects behind one trait)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dialogos::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut bot = BotBuilder::new()
//!         .openai_key(std::env::var("OPENAI_API_KEY")?)
//!         .model("gpt-4o-mini")
//!         .build()?;
//!
//!     // Turns queue without any network I/O...
//!     bot.system("You are terse.").user("What is the capital of France?");
//!
//!     // ...and the first read resolves the whole backlog in one call
//!     if let Some(reply) = bot.reply().await? {
//!         println!("{}", reply.content.as_text().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use dialogos::prelude::*;
//! use dialogos::llm::WriteSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut bot = BotBuilder::new()
//!         .openai_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!
//!     bot.user("Tell me a short story.");
//!     bot.stream(Box::new(WriteSink::new(std::io::stdout()))).await?;
//!     Ok(())
//! }
//! ```

// Re-export the core crate
pub use dialogos_llm as llm;

// Re-export commonly used types
pub use dialogos_llm::{
    Bot, CallParams, ClientFactory, Content, ConversationBuffer, LlmError, Message, Provider,
    ProviderConfig, QueueMode, Role, StreamEvent, TextSink, TokenUsage, Tool, ToolCall,
};

/// High-level builder for creating conversation bots
pub mod builder;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::BotBuilder;
    pub use crate::llm::{Bot, CallParams, Content, Message, QueueMode, Role};
    pub use anyhow::Result;
}
