mod chat;
mod responses;

pub use chat::ChatMerger;
pub use responses::ResponsesMerger;

pub(crate) use chat::chunk_events;

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::sse::{EventVisitor, WireEvent};
use crate::types::Message;

/// Literal terminal marker some transports send instead of JSON
pub const DONE_MARKER: &str = "[DONE]";

/// Outcome of parsing one `data:` payload
///
/// `Skip` is the deliberate drop of a malformed chunk: partial JSON can
/// appear mid-stream on some transports and losing one chunk beats aborting
/// a working session. Modeled as a variant rather than an error so the skip
/// path is directly assertable.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkParse {
    Chunk(Value),
    Done,
    Skip,
}

impl ChunkParse {
    /// Classify a data-line payload; the `[DONE]` sentinel short-circuits
    /// before any JSON parsing
    pub fn from_data(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed == DONE_MARKER {
            return Self::Done;
        }

        match serde_json::from_str(trimmed) {
            Ok(chunk) => Self::Chunk(chunk),
            Err(err) => {
                tracing::debug!("dropping unparseable stream chunk: {}", err);
                Self::Skip
            }
        }
    }
}

/// A stateful accumulator for one in-flight streamed response
///
/// One instance owns one response document for the lifetime of one flush.
/// `apply` must be deterministic regardless of arrival granularity: a chunk
/// may carry a whole new structural element or a one-token delta of an
/// existing one. Fields absent from a chunk are left untouched; malformed
/// or out-of-order paths are skipped, never errors.
pub trait StreamMerger: Send {
    /// Merge one parsed chunk into the accumulator
    fn apply(&mut self, chunk: &Value);

    /// Live accumulator; not stable until the terminal event was observed
    fn body(&self) -> &Value;

    /// Whether the dialect's terminal marker has been observed
    fn is_done(&self) -> bool;

    /// Messages assembled from the current accumulator state
    fn messages(&self) -> Vec<Message>;
}

/// Adapter feeding dispatched `data:` events into a shared merger
///
/// `Done` and `Skip` payloads produce no merger mutation.
pub struct MergeVisitor<M> {
    merger: Arc<Mutex<M>>,
}

impl<M: StreamMerger> MergeVisitor<M> {
    pub fn new(merger: Arc<Mutex<M>>) -> Self {
        Self { merger }
    }
}

impl<M: StreamMerger> EventVisitor for MergeVisitor<M> {
    fn on_data(&mut self, event: &WireEvent) {
        if let ChunkParse::Chunk(chunk) = ChunkParse::from_data(&event.value) {
            if let Ok(mut merger) = self.merger.lock() {
                merger.apply(&chunk);
            }
        }
    }
}

/// Grow an array so `index` exists, filling gaps with empty objects
pub(crate) fn slot_mut(arr: &mut Vec<Value>, index: usize) -> &mut Value {
    while arr.len() <= index {
        arr.push(Value::Object(Map::new()));
    }
    &mut arr[index]
}

/// A position that has not been initialized yet
pub(crate) fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// String-append `delta` at `key`, creating the field when absent
pub(crate) fn append_str(obj: &mut Map<String, Value>, key: &str, delta: &str) {
    match obj.get_mut(key) {
        Some(Value::String(existing)) => existing.push_str(delta),
        _ => {
            obj.insert(key.to_string(), Value::String(delta.to_string()));
        }
    }
}
