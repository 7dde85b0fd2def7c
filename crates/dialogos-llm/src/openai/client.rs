// OpenAI provider implementation (HTTP direct, no SDK)

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::openai::ResponsesDocument;
use crate::traits::{
    ByteStream, CallParams, ChatProvider, ChatRequest, CompletionOutcome, Provider,
    ResponseOutcome, ResponseProvider, ResponseRequest,
};
use crate::types::{Content, ContentPart, Message, Role, TokenUsage, ToolCall};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI provider, the reference dialect
pub struct OpenAiProvider {
    http_client: reqwest::Client,
    base_url: String,
    default_model: String,
}

impl OpenAiProvider {
    /// Create new provider with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENAI_API_BASE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Build chat completion request payload
    fn build_chat_payload(&self, request: &ChatRequest, stream: bool) -> Result<Value> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(message_to_value)
            .collect::<Result<Vec<_>>>()?;

        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
        });
        let obj = payload.as_object_mut().unwrap();

        if stream {
            // Ask for the usage-bearing final chunk
            obj.insert(
                "stream_options".to_string(),
                json!({ "include_usage": true }),
            );
        }
        apply_chat_params(obj, &request.model, &request.params);

        Ok(payload)
    }

    /// Build responses request payload
    fn build_response_payload(&self, request: &ResponseRequest, stream: bool) -> Result<Value> {
        let input: Vec<Value> = request
            .input
            .iter()
            .map(message_to_value)
            .collect::<Result<Vec<_>>>()?;

        let mut payload = json!({
            "model": request.model,
            "input": input,
            "stream": stream,
        });
        let obj = payload.as_object_mut().unwrap();

        if let Some(previous) = &request.previous_response_id {
            obj.insert("previous_response_id".to_string(), json!(previous));
        }
        if let Some(temperature) = request.params.temperature {
            obj.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = request.params.max_tokens {
            obj.insert("max_output_tokens".to_string(), json!(max_tokens));
        }
        if let Some(effort) = &request.params.reasoning_effort {
            obj.insert("reasoning".to_string(), json!({ "effort": effort }));
        }
        if let Some(schema) = &request.params.schema {
            obj.insert("text".to_string(), json!({ "format": schema }));
        }

        Ok(payload)
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;
        check_status(response).await
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, request: ChatRequest) -> Result<CompletionOutcome> {
        let payload = self.build_chat_payload(&request, false)?;
        let response = self.post("/chat/completions", &payload).await?;

        let document: ChatDocument = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(document.into_outcome())
    }

    async fn complete_stream(&self, request: ChatRequest) -> Result<ByteStream> {
        let payload = self.build_chat_payload(&request, true)?;
        let response = self.post("/chat/completions", &payload).await?;
        Ok(byte_stream(response))
    }
}

#[async_trait]
impl ResponseProvider for OpenAiProvider {
    async fn respond(&self, request: ResponseRequest) -> Result<ResponseOutcome> {
        let payload = self.build_response_payload(&request, false)?;
        let response = self.post("/responses", &payload).await?;

        let document: ResponsesDocument = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(ResponseOutcome {
            id: Some(document.id.clone()),
            messages: document.to_messages(),
            usage: Some(document.token_usage()),
            status: Some(document.status.clone()),
            raw: serde_json::to_value(&document)?,
        })
    }

    async fn respond_stream(&self, request: ResponseRequest) -> Result<ByteStream> {
        let payload = self.build_response_payload(&request, true)?;
        let response = self.post("/responses", &payload).await?;
        Ok(byte_stream(response))
    }
}

impl Provider for OpenAiProvider {
    fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Surface non-success statuses as typed, inspectable errors; never retried
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api { status, body }.into())
}

pub(crate) fn byte_stream(response: reqwest::Response) -> ByteStream {
    Box::pin(response.bytes_stream().map(|chunk| {
        chunk
            .map(|bytes| bytes.to_vec())
            .map_err(|e| anyhow::anyhow!("Stream error: {}", e))
    }))
}

/// Shared knob application for the chat-completions dialects
pub(crate) fn apply_chat_params(
    obj: &mut serde_json::Map<String, Value>,
    model: &str,
    params: &CallParams,
) {
    // o1 and gpt-5 models take different parameter names
    let is_reasoning_model = model.starts_with("o1") || model.starts_with("gpt-5");

    if let Some(temperature) = params.temperature {
        if !is_reasoning_model {
            obj.insert("temperature".to_string(), json!(temperature));
        }
    }
    if let Some(max_tokens) = params.max_tokens {
        let field = if is_reasoning_model {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };
        obj.insert(field.to_string(), json!(max_tokens));
    }
    if let Some(effort) = &params.reasoning_effort {
        obj.insert("reasoning_effort".to_string(), json!(effort));
    }
    if let Some(tools) = &params.tools {
        if let Ok(tools) = serde_json::to_value(tools) {
            obj.insert("tools".to_string(), tools);
        }
    }
    if let Some(choice) = &params.tool_choice {
        obj.insert("tool_choice".to_string(), choice.to_value());
    }
    if let Some(schema) = &params.schema {
        obj.insert(
            "response_format".to_string(),
            json!({ "type": "json_schema", "json_schema": schema }),
        );
    }
}

/// Convert a provider-agnostic message to the wire shape
///
/// Content the dialect cannot represent surfaces as a prompt error before
/// any network call.
pub(crate) fn message_to_value(message: &Message) -> Result<Value> {
    // This dialect has no "model" role; normalize to its assistant equivalent
    let role = if message.role == Role::Model {
        Role::Assistant
    } else {
        message.role
    };

    let mut value = json!({ "role": role.as_str() });
    let obj = value.as_object_mut().unwrap();

    if role == Role::Tool {
        let id = message.extra.tool_call_id().ok_or_else(|| {
            LlmError::Prompt("tool message is missing its tool_call_id".to_string())
        })?;
        obj.insert("tool_call_id".to_string(), json!(id));
        obj.insert("content".to_string(), content_to_value(&message.content)?);
        return Ok(value);
    }

    let tool_calls = message.extra.tool_calls();
    if !message.content.is_empty() || tool_calls.is_none() {
        obj.insert("content".to_string(), content_to_value(&message.content)?);
    }
    if let Some(calls) = tool_calls {
        obj.insert("tool_calls".to_string(), serde_json::to_value(calls)?);
    }
    if let Some(name) = &message.name {
        obj.insert("name".to_string(), json!(name));
    }

    Ok(value)
}

/// Convert content to the wire shape (string or part array)
pub(crate) fn content_to_value(content: &Content) -> Result<Value> {
    match content {
        Content::Text(text) => Ok(json!(text)),
        Content::Parts(parts) => {
            let mut converted = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    ContentPart::Text { text } => {
                        converted.push(json!({ "type": "text", "text": text }));
                    }
                    ContentPart::File { url, mime_type } => {
                        let is_image = mime_type
                            .as_deref()
                            .map(|m| m.starts_with("image/"))
                            .unwrap_or(true);
                        if !is_image {
                            return Err(LlmError::Prompt(format!(
                                "cannot represent a file part of type {} in a chat prompt",
                                mime_type.as_deref().unwrap_or("unknown")
                            ))
                            .into());
                        }
                        converted.push(json!({
                            "type": "image_url",
                            "image_url": { "url": url },
                        }));
                    }
                    ContentPart::ToolResult { .. } => {
                        return Err(LlmError::Prompt(
                            "tool results must be sent as tool-role messages".to_string(),
                        )
                        .into());
                    }
                }
            }
            Ok(json!(converted))
        }
    }
}

// ============================================================================
// CHAT COMPLETIONS RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatDocument {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChoiceMessage {
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatDocument {
    pub(crate) fn into_outcome(self) -> CompletionOutcome {
        let usage = self.usage.as_ref().map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
            reasoning_tokens: None,
        });
        let finish_reason = self
            .choices
            .first()
            .and_then(|c| c.finish_reason.clone());

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut messages = Vec::with_capacity(self.choices.len());
        for choice in &self.choices {
            let mut message = Message::new(
                Role::parse(&choice.message.role),
                choice.message.content.clone().unwrap_or_default(),
            );
            if let Some(calls) = &choice.message.tool_calls {
                if !calls.is_empty() {
                    message.extra.set_tool_calls(calls);
                }
            }
            if let Some(reason) = &choice.finish_reason {
                message.extra.set_finish_reason(reason);
            }
            if let Some(usage) = &usage {
                message.extra.set_usage(usage);
            }
            message.extra.set_response_id(&self.id);
            message.extra.set_created_at(created_at);
            messages.push(message);
        }

        let raw = serde_json::to_value(&self).unwrap_or(Value::Null);
        CompletionOutcome {
            messages,
            usage,
            finish_reason,
            raw,
        }
    }
}
