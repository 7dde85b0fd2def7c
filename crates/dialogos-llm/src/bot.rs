use std::sync::Arc;

use anyhow::Result;

use crate::buffer::{ConversationBuffer, QueueMode};
use crate::streaming::TextSink;
use crate::traits::{CallParams, Provider};
use crate::types::{Content, Message, Role, TokenUsage, ToolCall};

/// Role-qualified conversation facade over a `ConversationBuffer`
///
/// Holds conversation-wide default parameters; per-call overrides win via a
/// shallow merge. Turns queue lazily and resolve on the first read.
pub struct Bot {
    buffer: ConversationBuffer,
    defaults: CallParams,
    mode: QueueMode,
}

impl Bot {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            buffer: ConversationBuffer::new(provider),
            defaults: CallParams::default(),
            mode: QueueMode::Completion,
        }
    }

    /// Conversation-wide defaults (model, tools, schema, sampling knobs)
    pub fn with_defaults(mut self, defaults: CallParams) -> Self {
        self.defaults = defaults;
        self
    }

    /// Switch between stateless chat and stateful response chaining
    pub fn with_mode(mut self, mode: QueueMode) -> Self {
        self.mode = mode;
        self
    }

    /// Queue a system turn
    pub fn system(&mut self, content: impl Into<Content>) -> &mut Self {
        self.push(Message::system(content), None)
    }

    /// Queue a user turn
    pub fn user(&mut self, content: impl Into<Content>) -> &mut Self {
        self.push(Message::user(content), None)
    }

    /// Queue a user turn with per-call parameter overrides
    pub fn user_with(&mut self, content: impl Into<Content>, params: CallParams) -> &mut Self {
        self.push(Message::user(content), Some(params))
    }

    /// Queue an assistant turn (e.g. replayed history)
    pub fn assistant(&mut self, content: impl Into<Content>) -> &mut Self {
        self.push(Message::assistant(content), None)
    }

    /// Queue a developer turn
    pub fn developer(&mut self, content: impl Into<Content>) -> &mut Self {
        self.push(Message::developer(content), None)
    }

    /// Queue the result of a tool call the model asked for
    pub fn tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        content: impl Into<Content>,
    ) -> &mut Self {
        self.push(Message::tool_result(tool_call_id, content), None)
    }

    /// Queue an arbitrary prepared message
    pub fn push_message(&mut self, message: Message, params: Option<CallParams>) -> &mut Self {
        self.push(message, params)
    }

    fn push(&mut self, message: Message, params: Option<CallParams>) -> &mut Self {
        let params = match params {
            Some(overrides) => overrides.merge_over(&self.defaults),
            None => self.defaults.clone(),
        };
        self.buffer.enqueue(message, params, self.mode);
        self
    }

    /// Force resolution and return the whole conversation
    pub async fn drain(&mut self) -> Result<&[Message]> {
        self.buffer.messages().await
    }

    /// Force resolution without reading anything back
    pub async fn flush(&mut self) -> Result<()> {
        self.buffer.flush().await
    }

    /// Force resolution over the streamed transport, echoing deltas to `sink`
    pub async fn stream(&mut self, sink: Box<dyn TextSink>) -> Result<()> {
        self.buffer.flush_streaming(sink).await
    }

    /// Most recent generated turn, in the provider's own role dialect
    pub async fn reply(&mut self) -> Result<Option<&Message>> {
        let role = self.buffer.provider().assistant_role();
        self.buffer.last_message(role).await
    }

    pub async fn last_message(&mut self, role: Role) -> Result<Option<&Message>> {
        self.buffer.last_message(role).await
    }

    /// Tool calls the model has asked for that no queued or completed
    /// tool-result message answers yet
    pub fn functions(&self) -> Vec<ToolCall> {
        let answered: Vec<&str> = self
            .buffer
            .completed()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.extra.tool_call_id())
            .collect();

        self.buffer
            .completed()
            .iter()
            .filter(|m| m.role.is_assistant_equivalent())
            .filter_map(|m| m.extra.tool_calls())
            .flatten()
            .filter(|call| !answered.contains(&call.id.as_str()))
            .collect()
    }

    /// Token accounting of the most recent generated turn
    pub fn usage(&self) -> Option<TokenUsage> {
        self.buffer
            .completed()
            .iter()
            .rev()
            .find(|m| m.role.is_assistant_equivalent())
            .and_then(|m| m.extra.usage())
    }

    /// The underlying buffer, for direct queue/read access
    pub fn buffer(&mut self) -> &mut ConversationBuffer {
        &mut self.buffer
    }
}
