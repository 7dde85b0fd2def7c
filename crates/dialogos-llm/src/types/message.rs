use serde::{Deserialize, Serialize};

use super::content::Content;
use super::extra::Extra;
use super::tool::ToolCall;

/// Conversation role, normalized to one canonical string per variant
///
/// `Model` is the assistant-equivalent role used by Gemini-style dialects;
/// which of the two a provider produces is reported by
/// `Provider::assistant_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Developer,
    Model,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Developer => "developer",
            Self::Model => "model",
            Self::Tool => "tool",
        }
    }

    /// Normalize an arbitrary provider role string
    ///
    /// Unrecognized strings fall back to `Assistant` since they only appear
    /// on provider-produced output.
    pub fn parse(s: &str) -> Self {
        match s {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "developer" => Self::Developer,
            "model" => Self::Model,
            "tool" => Self::Tool,
            _ => Self::Assistant,
        }
    }

    /// True for the roles providers use for generated turns
    pub fn is_assistant_equivalent(&self) -> bool {
        matches!(self, Self::Assistant | Self::Model)
    }
}

/// One conversation turn (provider-agnostic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Provider metadata: token counts, tool-call records, response ids
    #[serde(flatten)]
    pub extra: Extra,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            extra: Extra::new(),
        }
    }

    /// Create system message
    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create user message
    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create assistant message
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create developer message
    pub fn developer(content: impl Into<Content>) -> Self {
        Self::new(Role::Developer, content)
    }

    /// Create assistant message that only carries tool calls
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Self::new(Role::Assistant, Content::empty());
        message.extra.set_tool_calls(&tool_calls);
        message
    }

    /// Create tool result message
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        let mut message = Self::new(Role::Tool, content);
        message.extra.set_tool_call_id(tool_call_id);
        message
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.extra.set_tool_calls(&tool_calls);
        self
    }

    /// Get role as its canonical string
    pub fn role_str(&self) -> &'static str {
        self.role.as_str()
    }

    /// Tool calls recorded on this message, if any
    pub fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        self.extra.tool_calls()
    }
}
