use serde_json::{json, Map, Value};

use super::{append_str, is_unset, slot_mut, StreamMerger};
use crate::streaming::{StreamEvent, TextSink};
use crate::types::{Message, Role, TokenUsage, ToolCall};

/// Accumulator for the chat-completions streaming dialect
///
/// Chunks look like `{"choices":[{"index":0,"delta":{...},"finish_reason":..}]}`.
/// The merger folds them into a document shaped like the non-streamed
/// response: top-level metadata set on first occurrence, per-choice message
/// content appended delta by delta, tool-call argument fragments
/// concatenated raw until the choice finishes.
pub struct ChatMerger {
    body: Value,
    sink: Option<Box<dyn TextSink>>,
}

impl ChatMerger {
    pub fn new() -> Self {
        Self {
            body: Value::Object(Map::new()),
            sink: None,
        }
    }

    /// Attach a live-echo sink; every content increment is forwarded to it
    /// exactly once
    pub fn with_sink(mut self, sink: Box<dyn TextSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Default for ChatMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMerger for ChatMerger {
    fn apply(&mut self, chunk: &Value) {
        let Self { body, sink } = self;
        let Some(chunk_obj) = chunk.as_object() else {
            return;
        };
        let Some(body_obj) = body.as_object_mut() else {
            return;
        };

        for key in ["id", "object", "created", "model", "system_fingerprint"] {
            if !body_obj.contains_key(key) {
                if let Some(value) = chunk_obj.get(key) {
                    if !value.is_null() {
                        body_obj.insert(key.to_string(), value.clone());
                    }
                }
            }
        }

        // Usage arrives once, on the final chunk when the caller asked for it
        if let Some(usage) = chunk_obj.get("usage") {
            if !usage.is_null() {
                body_obj.insert("usage".to_string(), usage.clone());
            }
        }

        let Some(choices) = chunk_obj.get("choices").and_then(|c| c.as_array()) else {
            return;
        };
        let slots = body_obj
            .entry("choices")
            .or_insert_with(|| Value::Array(Vec::new()));
        let Some(slots) = slots.as_array_mut() else {
            return;
        };

        for choice in choices {
            apply_choice(slots, choice, sink.as_deref_mut());
        }
    }

    fn body(&self) -> &Value {
        &self.body
    }

    fn is_done(&self) -> bool {
        let Some(choices) = self.body.get("choices").and_then(|c| c.as_array()) else {
            return false;
        };
        !choices.is_empty()
            && choices
                .iter()
                .all(|c| c.get("finish_reason").map(|r| !r.is_null()).unwrap_or(false))
    }

    fn messages(&self) -> Vec<Message> {
        let mut out = Vec::new();
        let Some(body) = self.body.as_object() else {
            return out;
        };
        let usage = body.get("usage").and_then(usage_from_value);
        let Some(choices) = body.get("choices").and_then(|c| c.as_array()) else {
            return out;
        };

        for choice in choices {
            let Some(message) = choice.get("message").and_then(|m| m.as_object()) else {
                continue;
            };
            let role = message
                .get("role")
                .and_then(|r| r.as_str())
                .map(Role::parse)
                .unwrap_or(Role::Assistant);
            let content = message
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default();

            let mut built = Message::new(role, content);
            if let Some(calls) = message.get("tool_calls") {
                if let Ok(calls) = serde_json::from_value::<Vec<ToolCall>>(calls.clone()) {
                    if !calls.is_empty() {
                        built.extra.set_tool_calls(&calls);
                    }
                }
            }
            if let Some(reason) = choice.get("finish_reason").and_then(|r| r.as_str()) {
                built.extra.set_finish_reason(reason);
            }
            if let Some(usage) = &usage {
                built.extra.set_usage(usage);
            }
            if let Some(id) = body.get("id").and_then(|v| v.as_str()) {
                built.extra.set_response_id(id);
            }
            built
                .extra
                .set_created_at(chrono::Utc::now().timestamp_millis());
            out.push(built);
        }
        out
    }
}

fn apply_choice(
    slots: &mut Vec<Value>,
    choice: &Value,
    mut sink: Option<&mut (dyn TextSink + 'static)>,
) {
    let Some(choice_obj) = choice.as_object() else {
        return;
    };
    let Some(index) = choice_obj.get("index").and_then(|i| i.as_u64()) else {
        return;
    };

    let slot = slot_mut(slots, index as usize);
    if is_unset(slot) {
        *slot = json!({
            "index": index,
            "message": { "role": "assistant", "content": "" },
        });
    }
    let Some(slot_obj) = slot.as_object_mut() else {
        return;
    };

    let finished = choice_obj
        .get("finish_reason")
        .filter(|r| !r.is_null())
        .cloned();
    if let Some(reason) = &finished {
        slot_obj.insert("finish_reason".to_string(), reason.clone());
    }

    let Some(message) = slot_obj.get_mut("message").and_then(|m| m.as_object_mut()) else {
        return;
    };

    if let Some(delta) = choice_obj.get("delta").and_then(|d| d.as_object()) {
        if let Some(role) = delta.get("role").and_then(|r| r.as_str()) {
            message.insert("role".to_string(), json!(role));
        }
        if let Some(text) = delta.get("content").and_then(|c| c.as_str()) {
            if !text.is_empty() {
                append_str(message, "content", text);
                if let Some(sink) = sink.as_mut() {
                    sink.append(text);
                }
            }
        }
        if let Some(fragments) = delta.get("tool_calls").and_then(|t| t.as_array()) {
            apply_tool_fragments(message, fragments);
        }
    }

    // Choice terminal marker: argument fragments are complete now, so this
    // is the first point JSON parsing of them is attempted at all
    if finished.is_some() {
        validate_tool_arguments(message);
    }
}

fn apply_tool_fragments(message: &mut Map<String, Value>, fragments: &[Value]) {
    let calls = message
        .entry("tool_calls")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(calls) = calls.as_array_mut() else {
        return;
    };

    for fragment in fragments {
        let Some(frag) = fragment.as_object() else {
            continue;
        };
        let Some(index) = frag.get("index").and_then(|i| i.as_u64()) else {
            continue;
        };

        let call = slot_mut(calls, index as usize);
        if is_unset(call) {
            *call = json!({
                "id": "",
                "type": "function",
                "function": { "name": "", "arguments": "" },
            });
        }
        let Some(call_obj) = call.as_object_mut() else {
            continue;
        };

        if let Some(id) = frag.get("id").and_then(|v| v.as_str()) {
            call_obj.insert("id".to_string(), json!(id));
        }
        if let Some(function) = frag.get("function").and_then(|f| f.as_object()) {
            let Some(target) = call_obj
                .get_mut("function")
                .and_then(|f| f.as_object_mut())
            else {
                continue;
            };
            if let Some(name) = function.get("name").and_then(|n| n.as_str()) {
                if target.get("name").and_then(|n| n.as_str()).unwrap_or("").is_empty() {
                    target.insert("name".to_string(), json!(name));
                }
            }
            if let Some(arguments) = function.get("arguments").and_then(|a| a.as_str()) {
                append_str(target, "arguments", arguments);
            }
        }
    }
}

fn validate_tool_arguments(message: &Map<String, Value>) {
    let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) else {
        return;
    };
    for call in calls {
        let arguments = call
            .get("function")
            .and_then(|f| f.get("arguments"))
            .and_then(|a| a.as_str())
            .unwrap_or_default();
        if !arguments.is_empty() {
            if let Err(err) = serde_json::from_str::<Value>(arguments) {
                tracing::debug!("tool call arguments did not assemble to valid JSON: {}", err);
            }
        }
    }
}

fn usage_from_value(value: &Value) -> Option<TokenUsage> {
    Some(TokenUsage {
        input_tokens: value.get("prompt_tokens")?.as_u64()? as u32,
        output_tokens: value.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: value.get("total_tokens")?.as_u64()? as u32,
        reasoning_tokens: value
            .get("completion_tokens_details")
            .and_then(|d| d.get("reasoning_tokens"))
            .and_then(|r| r.as_u64())
            .map(|r| r as u32),
    })
}

/// Translate one chat chunk into public stream events
///
/// Used by the event-stream surface; the merger itself does not go through
/// this.
pub(crate) fn chunk_events(chunk: &Value) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    let Some(choice) = chunk
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        return events;
    };

    if let Some(delta) = choice.get("delta") {
        if let Some(text) = delta.get("content").and_then(|c| c.as_str()) {
            if !text.is_empty() {
                events.push(StreamEvent::Message {
                    content: text.to_string(),
                });
            }
        }
        if let Some(calls) = delta.get("tool_calls").and_then(|t| t.as_array()) {
            for call in calls {
                let Some(index) = call.get("index").and_then(|i| i.as_u64()) else {
                    continue;
                };
                events.push(StreamEvent::ToolCall {
                    index: index as u32,
                    id: call.get("id").and_then(|v| v.as_str()).map(String::from),
                    name: call
                        .get("function")
                        .and_then(|f| f.get("name"))
                        .and_then(|n| n.as_str())
                        .map(String::from),
                    arguments: call
                        .get("function")
                        .and_then(|f| f.get("arguments"))
                        .and_then(|a| a.as_str())
                        .map(String::from),
                });
            }
        }
    }

    if let Some(reason) = choice.get("finish_reason").and_then(|r| r.as_str()) {
        events.push(StreamEvent::Done {
            finish_reason: Some(reason.to_string()),
        });
    }

    events
}
