pub mod content;
pub mod extra;
pub mod message;
pub mod tool;

pub use content::{Content, ContentPart};
pub use extra::{Extra, TokenUsage};
pub use message::{Message, Role};
pub use tool::{FunctionCall, FunctionDefinition, Tool, ToolCall, ToolChoice};
