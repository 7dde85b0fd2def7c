// OpenAI Responses API document types
// https://platform.openai.com/docs/api-reference/responses

use serde::{Deserialize, Serialize};

use crate::types::{Message, Role, TokenUsage, ToolCall};

/// Non-streaming document from /v1/responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesDocument {
    pub id: String,
    pub object: String,
    pub created_at: i64,
    pub status: String,
    pub model: String,
    pub output: Vec<OutputItem>,
    pub usage: Usage,
}

/// Item in the output array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Reasoning {
        id: String,
        summary: Vec<SummaryText>,
    },
    Message {
        id: String,
        status: String,
        role: String,
        content: Vec<OutputContent>,
    },
    FunctionCall {
        id: String,
        call_id: String,
        name: String,
        arguments: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryText {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    OutputText {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        annotations: Option<Vec<serde_json::Value>>,
    },
    Refusal {
        refusal: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens_details: Option<OutputTokensDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTokensDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

impl ResponsesDocument {
    pub fn token_usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.usage.input_tokens,
            output_tokens: self.usage.output_tokens,
            total_tokens: self.usage.total_tokens,
            reasoning_tokens: self
                .usage
                .output_tokens_details
                .as_ref()
                .and_then(|d| d.reasoning_tokens),
        }
    }

    /// Assemble provider-agnostic messages from the output items
    ///
    /// Message items become one message each; function-call items are
    /// collected onto the trailing assistant message (or a fresh one when
    /// the output carried calls only). Reasoning summaries land in `extra`.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut out: Vec<Message> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut reasoning: Vec<String> = Vec::new();

        for item in &self.output {
            match item {
                OutputItem::Message { role, content, .. } => {
                    let text: String = content
                        .iter()
                        .filter_map(|part| match part {
                            OutputContent::OutputText { text, .. } => Some(text.as_str()),
                            OutputContent::Refusal { .. } => None,
                        })
                        .collect();
                    out.push(Message::new(Role::parse(role), text));
                }
                OutputItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                    ..
                } => {
                    tool_calls.push(ToolCall::function(call_id, name, arguments));
                }
                OutputItem::Reasoning { summary, .. } => {
                    let text: Vec<&str> = summary.iter().map(|s| s.text.as_str()).collect();
                    if !text.is_empty() {
                        reasoning.push(text.join(" "));
                    }
                }
            }
        }

        if !tool_calls.is_empty() {
            match out.last_mut() {
                Some(last) if last.role.is_assistant_equivalent() => {
                    last.extra.set_tool_calls(&tool_calls);
                }
                _ => {
                    let mut message =
                        Message::new(Role::Assistant, crate::types::Content::empty());
                    message.extra.set_tool_calls(&tool_calls);
                    out.push(message);
                }
            }
        }

        let usage = self.token_usage();
        for (position, message) in out.iter_mut().enumerate() {
            message.extra.set_response_id(&self.id);
            message.extra.set_usage(&usage);
            if position == 0 && !reasoning.is_empty() {
                message.extra.insert(
                    "reasoning",
                    serde_json::Value::String(reasoning.join("\n")),
                );
            }
            message
                .extra
                .set_created_at(chrono::Utc::now().timestamp_millis());
        }

        out
    }
}
