pub mod bot;
pub mod buffer;
pub mod compat;
pub mod config;
pub mod error;
pub mod merge;
pub mod openai;
pub mod sse;
pub mod streaming;
pub mod traits;
pub mod types;

pub use bot::Bot;
pub use buffer::{ConversationBuffer, PendingEntry, QueueMode};
pub use config::{ClientFactory, CompatConfig, OpenAiConfig, ProviderConfig, ProviderType};
pub use error::LlmError;
pub use merge::{ChatMerger, ChunkParse, MergeVisitor, ResponsesMerger, StreamMerger};
pub use sse::{EventDispatcher, EventVisitor, SseTokenizer, WireEvent};
pub use streaming::{drive_merge, stream_events, StreamEvent, TextSink, WriteSink};
pub use traits::{
    ByteStream, CallParams, ChatProvider, ChatRequest, CompletionOutcome, Provider,
    ResponseOutcome, ResponseProvider, ResponseRequest,
};
pub use types::{Content, ContentPart, Extra, Message, Role, TokenUsage, Tool, ToolCall, ToolChoice};

pub use compat::CompatProvider;
pub use openai::OpenAiProvider;
