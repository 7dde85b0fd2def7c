use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::merge::{chunk_events, ChunkParse, MergeVisitor, StreamMerger};
use crate::sse::{EventDispatcher, SseTokenizer};
use crate::traits::ByteStream;

/// Provider-agnostic incremental event, the public streaming surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Reasoning {
        content: String,
    },

    Message {
        content: String,
    },

    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

/// Caller-supplied destination for live text echo during streaming
///
/// The merger writes each increment from whatever task performs the flush;
/// callers needing thread-safe output supply a thread-safe sink. Optional
/// everywhere it is accepted: absence simply disables echo.
pub trait TextSink: Send {
    fn append(&mut self, delta: &str);
}

/// Sink writing increments straight to any `io::Write`
pub struct WriteSink<W: std::io::Write + Send> {
    writer: W,
}

impl<W: std::io::Write + Send> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: std::io::Write + Send> TextSink for WriteSink<W> {
    fn append(&mut self, delta: &str) {
        if self.writer.write_all(delta.as_bytes()).is_ok() {
            let _ = self.writer.flush();
        }
    }
}

/// Channel senders double as sinks, for UI tasks consuming deltas elsewhere
impl TextSink for tokio::sync::mpsc::UnboundedSender<String> {
    fn append(&mut self, delta: &str) {
        let _ = self.send(delta.to_string());
    }
}

/// Drive a raw byte stream through tokenizer, dispatcher and merger
///
/// Each transport chunk synchronously feeds every completed wire event to
/// the merger before the next chunk is read, so events are processed
/// strictly in arrival order. Returns when the transport closes.
pub async fn drive_merge<M>(mut stream: ByteStream, merger: Arc<Mutex<M>>) -> Result<()>
where
    M: StreamMerger + 'static,
{
    let mut tokenizer = SseTokenizer::new();
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Box::new(MergeVisitor::new(Arc::clone(&merger))));

    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        for event in tokenizer.append(&bytes) {
            dispatcher.dispatch(&event);
        }
    }
    Ok(())
}

/// Expose a chat-dialect byte stream as provider-agnostic events
pub fn stream_events(
    byte_stream: ByteStream,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>> {
    Box::pin(async_stream::stream! {
        let mut byte_stream = byte_stream;
        let mut tokenizer = SseTokenizer::new();

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in tokenizer.append(&bytes) {
                        if event.field != "data" {
                            continue;
                        }
                        match ChunkParse::from_data(&event.value) {
                            ChunkParse::Done => {
                                yield Ok(StreamEvent::Done { finish_reason: None });
                                return;
                            }
                            ChunkParse::Chunk(value) => {
                                for event in chunk_events(&value) {
                                    yield Ok(event);
                                }
                            }
                            ChunkParse::Skip => {}
                        }
                    }
                }
                Err(e) => yield Err(e),
            }
        }
    })
}
