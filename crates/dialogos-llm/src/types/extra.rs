use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tool::ToolCall;

/// Token accounting reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

/// Open bag of provider metadata attached to a message
///
/// Known keys (`tool_calls`, `tool_call_id`, `usage`, `response_id`,
/// `created_at`, `finish_reason`) get typed accessors; unknown keys are
/// preserved untyped and reachable through `get`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extra(Map<String, Value>);

impl Extra {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        let value = self.0.get("tool_calls")?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn set_tool_calls(&mut self, tool_calls: &[ToolCall]) {
        if let Ok(value) = serde_json::to_value(tool_calls) {
            self.0.insert("tool_calls".to_string(), value);
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.0.get("tool_call_id").and_then(|v| v.as_str())
    }

    pub fn set_tool_call_id(&mut self, id: impl Into<String>) {
        self.0.insert("tool_call_id".to_string(), Value::String(id.into()));
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        let value = self.0.get("usage")?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn set_usage(&mut self, usage: &TokenUsage) {
        if let Ok(value) = serde_json::to_value(usage) {
            self.0.insert("usage".to_string(), value);
        }
    }

    /// Provider-assigned id of the response that produced this message
    pub fn response_id(&self) -> Option<&str> {
        self.0.get("response_id").and_then(|v| v.as_str())
    }

    pub fn set_response_id(&mut self, id: impl Into<String>) {
        self.0.insert("response_id".to_string(), Value::String(id.into()));
    }

    /// Completion timestamp, epoch milliseconds
    pub fn created_at(&self) -> Option<i64> {
        self.0.get("created_at").and_then(|v| v.as_i64())
    }

    pub fn set_created_at(&mut self, millis: i64) {
        self.0.insert("created_at".to_string(), Value::from(millis));
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.0.get("finish_reason").and_then(|v| v.as_str())
    }

    pub fn set_finish_reason(&mut self, reason: impl Into<String>) {
        self.0
            .insert("finish_reason".to_string(), Value::String(reason.into()));
    }
}
