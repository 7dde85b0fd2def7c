use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::types::{Message, Role, TokenUsage, Tool, ToolChoice};

/// Raw byte channel a streamed call feeds into the tokenizer
///
/// Terminated when the transport signals end-of-body; the consumer drives
/// it chunk by chunk with no read-ahead.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Stateless chat-completions style interface
///
/// Full message history is resent on every call.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Non-streaming completion
    async fn complete(&self, request: ChatRequest) -> Result<CompletionOutcome>;

    /// Streaming completion; returns the raw event-framed byte stream
    async fn complete_stream(&self, request: ChatRequest) -> Result<ByteStream>;
}

/// Stateful responses style interface
///
/// A provider-assigned id lets a later call continue from a prior exchange
/// without resending history.
#[async_trait]
pub trait ResponseProvider: Send + Sync {
    /// Non-streaming response
    async fn respond(&self, request: ResponseRequest) -> Result<ResponseOutcome>;

    /// Streaming response; returns the raw event-framed byte stream
    async fn respond_stream(&self, request: ResponseRequest) -> Result<ByteStream>;
}

/// A fully usable provider: both call shapes plus identity
pub trait Provider: ChatProvider + ResponseProvider {
    /// Model used when a request does not name one
    fn default_model(&self) -> &str;

    /// Role this provider uses for generated turns ("assistant" for most,
    /// "model" for Gemini-style dialects)
    fn assistant_role(&self) -> Role {
        Role::Assistant
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub params: CallParams,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            params: CallParams::default(),
        }
    }

    pub fn with_params(mut self, params: CallParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ResponseRequest {
    pub model: String,
    pub input: Vec<Message>,
    /// Continues the exchange recorded under this id, when present
    pub previous_response_id: Option<String>,
    pub params: CallParams,
}

impl ResponseRequest {
    pub fn new(model: impl Into<String>, input: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            input,
            previous_response_id: None,
            params: CallParams::default(),
        }
    }

    pub fn with_previous_response(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: CallParams) -> Self {
        self.params = params;
        self
    }
}

/// Per-call parameters, also usable as conversation-wide defaults
#[derive(Debug, Clone, Default)]
pub struct CallParams {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    pub reasoning_effort: Option<String>,
    /// JSON schema constraining the response format
    pub schema: Option<Value>,
}

impl CallParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Shallow merge: fields set here win over `defaults`, field by field;
    /// nested option objects are not deep-merged
    pub fn merge_over(self, defaults: &CallParams) -> CallParams {
        CallParams {
            model: self.model.or_else(|| defaults.model.clone()),
            temperature: self.temperature.or(defaults.temperature),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            tools: self.tools.or_else(|| defaults.tools.clone()),
            tool_choice: self.tool_choice.or_else(|| defaults.tool_choice.clone()),
            reasoning_effort: self
                .reasoning_effort
                .or_else(|| defaults.reasoning_effort.clone()),
            schema: self.schema.or_else(|| defaults.schema.clone()),
        }
    }
}

/// Provider-parsed result of a non-streamed completion call
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub messages: Vec<Message>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
    pub raw: Value,
}

/// Provider-parsed result of a non-streamed response call
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    /// Id to thread into the next call of the same conversation
    pub id: Option<String>,
    pub messages: Vec<Message>,
    pub usage: Option<TokenUsage>,
    pub status: Option<String>,
    pub raw: Value,
}
