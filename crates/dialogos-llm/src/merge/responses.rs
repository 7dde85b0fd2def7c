use serde_json::{Map, Value};

use super::{append_str, is_unset, slot_mut, StreamMerger};
use crate::streaming::TextSink;
use crate::types::{Content, Message, Role, TokenUsage, ToolCall};

/// Accumulator for the stateful responses streaming dialect
///
/// Unlike the chat dialect, every chunk carries an explicit `type` tag:
/// `response.created` seeds the document, `response.output_item.added`
/// initializes an output slot, `response.output_text.delta` appends text,
/// `response.function_call_arguments.delta` appends raw argument fragments,
/// `response.output_item.done` is the per-item block stop (the only point
/// argument JSON is parsed), and `response.completed` freezes the document.
pub struct ResponsesMerger {
    body: Value,
    sink: Option<Box<dyn TextSink>>,
    done: bool,
}

impl ResponsesMerger {
    pub fn new() -> Self {
        Self {
            body: Value::Object(Map::new()),
            sink: None,
            done: false,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn TextSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Provider-assigned response id, once known
    pub fn response_id(&self) -> Option<&str> {
        self.body.get("id").and_then(|v| v.as_str())
    }
}

impl Default for ResponsesMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMerger for ResponsesMerger {
    fn apply(&mut self, chunk: &Value) {
        let Self { body, sink, done } = self;
        let Some(obj) = chunk.as_object() else {
            return;
        };
        let Some(event_type) = obj.get("type").and_then(|t| t.as_str()) else {
            return;
        };

        match event_type {
            "response.created" | "response.in_progress" => {
                if is_unset(body) {
                    if let Some(response) = obj.get("response") {
                        *body = response.clone();
                    }
                }
            }

            "response.output_item.added" => {
                let (Some(index), Some(item)) = (output_index(obj), obj.get("item")) else {
                    return;
                };
                let Some(output) = output_array(body) else {
                    return;
                };
                let slot = slot_mut(output, index);
                if is_unset(slot) {
                    *slot = item.clone();
                }
            }

            "response.content_part.added" => {
                let (Some(index), Some(content_index), Some(part)) = (
                    output_index(obj),
                    obj.get("content_index").and_then(|i| i.as_u64()),
                    obj.get("part"),
                ) else {
                    return;
                };
                let Some(content) = item_content(body, index) else {
                    return;
                };
                let slot = slot_mut(content, content_index as usize);
                if is_unset(slot) {
                    *slot = part.clone();
                }
            }

            "response.output_text.delta" => {
                let (Some(index), Some(delta)) = (
                    output_index(obj),
                    obj.get("delta").and_then(|d| d.as_str()),
                ) else {
                    return;
                };
                let content_index = obj
                    .get("content_index")
                    .and_then(|i| i.as_u64())
                    .unwrap_or(0) as usize;

                // A delta for a part that was never announced is skipped
                let Some(content) = item_content(body, index) else {
                    return;
                };
                let Some(part) = content
                    .get_mut(content_index)
                    .and_then(|p| p.as_object_mut())
                else {
                    return;
                };

                append_str(part, "text", delta);
                if let Some(sink) = sink.as_mut() {
                    sink.append(delta);
                }
            }

            "response.function_call_arguments.delta" => {
                let (Some(index), Some(delta)) = (
                    output_index(obj),
                    obj.get("delta").and_then(|d| d.as_str()),
                ) else {
                    return;
                };
                let Some(output) = output_array(body) else {
                    return;
                };
                // Raw text concatenation only; parsing waits for the block stop
                let Some(item) = output.get_mut(index).and_then(|i| i.as_object_mut()) else {
                    return;
                };
                append_str(item, "arguments", delta);
            }

            "response.output_item.done" => {
                let (Some(index), Some(item)) = (output_index(obj), obj.get("item")) else {
                    return;
                };
                let Some(output) = output_array(body) else {
                    return;
                };
                let slot = slot_mut(output, index);
                *slot = item.clone();

                if slot.get("type").and_then(|t| t.as_str()) == Some("function_call") {
                    let arguments = slot
                        .get("arguments")
                        .and_then(|a| a.as_str())
                        .unwrap_or_default();
                    if let Err(err) = serde_json::from_str::<Value>(arguments) {
                        tracing::debug!(
                            "function call arguments did not assemble to valid JSON: {}",
                            err
                        );
                    }
                }
            }

            "response.completed" => {
                if let Some(response) = obj.get("response") {
                    *body = response.clone();
                }
                *done = true;
            }

            // Unknown event types leave the accumulator untouched
            _ => {}
        }
    }

    fn body(&self) -> &Value {
        &self.body
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn messages(&self) -> Vec<Message> {
        let mut out: Vec<Message> = Vec::new();
        let Some(body) = self.body.as_object() else {
            return out;
        };

        let usage = body.get("usage").and_then(usage_from_value);
        let response_id = body.get("id").and_then(|v| v.as_str());
        let status = body.get("status").and_then(|v| v.as_str());

        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut reasoning: Vec<String> = Vec::new();

        if let Some(output) = body.get("output").and_then(|o| o.as_array()) {
            for item in output {
                match item.get("type").and_then(|t| t.as_str()) {
                    Some("message") => {
                        let role = item
                            .get("role")
                            .and_then(|r| r.as_str())
                            .map(Role::parse)
                            .unwrap_or(Role::Assistant);
                        let text: String = item
                            .get("content")
                            .and_then(|c| c.as_array())
                            .map(|parts| {
                                parts
                                    .iter()
                                    .filter(|p| {
                                        p.get("type").and_then(|t| t.as_str())
                                            == Some("output_text")
                                    })
                                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                                    .collect()
                            })
                            .unwrap_or_default();
                        out.push(Message::new(role, text));
                    }
                    Some("function_call") => {
                        let id = item
                            .get("call_id")
                            .or_else(|| item.get("id"))
                            .and_then(|v| v.as_str())
                            .unwrap_or_default();
                        let name = item
                            .get("name")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default();
                        let arguments = item
                            .get("arguments")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default();
                        tool_calls.push(ToolCall::function(id, name, arguments));
                    }
                    Some("reasoning") => {
                        if let Some(summary) = item.get("summary").and_then(|s| s.as_array()) {
                            let text: Vec<&str> = summary
                                .iter()
                                .filter_map(|s| s.get("text").and_then(|t| t.as_str()))
                                .collect();
                            if !text.is_empty() {
                                reasoning.push(text.join(" "));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        if !tool_calls.is_empty() {
            match out.last_mut() {
                Some(last) if last.role.is_assistant_equivalent() => {
                    last.extra.set_tool_calls(&tool_calls);
                }
                _ => {
                    let mut message = Message::new(Role::Assistant, Content::empty());
                    message.extra.set_tool_calls(&tool_calls);
                    out.push(message);
                }
            }
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        for (position, message) in out.iter_mut().enumerate() {
            if let Some(id) = response_id {
                message.extra.set_response_id(id);
            }
            if let Some(usage) = &usage {
                message.extra.set_usage(usage);
            }
            if let Some(status) = status {
                message.extra.insert("status", Value::String(status.to_string()));
            }
            if position == 0 && !reasoning.is_empty() {
                message
                    .extra
                    .insert("reasoning", Value::String(reasoning.join("\n")));
            }
            message.extra.set_created_at(created_at);
        }

        out
    }
}

fn output_index(obj: &Map<String, Value>) -> Option<usize> {
    obj.get("output_index").and_then(|i| i.as_u64()).map(|i| i as usize)
}

fn output_array(body: &mut Value) -> Option<&mut Vec<Value>> {
    body.as_object_mut()?
        .entry("output")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
}

/// Content array of an already-initialized output item; `None` (skip) when
/// the item was never announced
fn item_content(body: &mut Value, index: usize) -> Option<&mut Vec<Value>> {
    let output = output_array(body)?;
    let item = output.get_mut(index)?.as_object_mut()?;
    if item.is_empty() {
        return None;
    }
    item.entry("content")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
}

fn usage_from_value(value: &Value) -> Option<TokenUsage> {
    Some(TokenUsage {
        input_tokens: value.get("input_tokens")?.as_u64()? as u32,
        output_tokens: value.get("output_tokens")?.as_u64()? as u32,
        total_tokens: value.get("total_tokens")?.as_u64()? as u32,
        reasoning_tokens: value
            .get("output_tokens_details")
            .and_then(|d| d.get("reasoning_tokens"))
            .and_then(|r| r.as_u64())
            .map(|r| r as u32),
    })
}
