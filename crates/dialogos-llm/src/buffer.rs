use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::error::LlmError;
use crate::merge::{ChatMerger, ResponsesMerger, StreamMerger};
use crate::streaming::{drive_merge, TextSink};
use crate::traits::{CallParams, ChatRequest, Provider, ResponseRequest};
use crate::types::{Message, Role};

/// Which call shape a queued turn resolves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Stateless chat completions; history is resent each call
    Completion,
    /// Stateful responses; a recorded id continues the prior exchange
    Response,
}

/// One queued, not-yet-sent turn with its resolved parameter snapshot
///
/// Consumed exactly once when the buffer flushes.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub message: Message,
    pub params: CallParams,
    pub mode: QueueMode,
}

/// Defers network calls until a response is actually needed
///
/// Turns are enqueued without I/O; the first read resolves the entire
/// backlog in exactly one provider call. The most recently queued entry is
/// the driving turn and decides the call shape; everything queued before it
/// travels along as plain context. Completed messages are append-only and
/// keep conversation order for the life of the buffer.
///
/// Not internally synchronized: one logical owner at a time, at most one
/// flush in flight.
pub struct ConversationBuffer {
    provider: Arc<dyn Provider>,
    pending: Vec<PendingEntry>,
    completed: Vec<Message>,
    last_response_id: Option<String>,
    read_cursor: usize,
}

impl ConversationBuffer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            pending: Vec::new(),
            completed: Vec::new(),
            last_response_id: None,
            read_cursor: 0,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Queue a turn; never performs I/O
    pub fn enqueue(&mut self, message: Message, params: CallParams, mode: QueueMode) {
        self.pending.push(PendingEntry {
            message,
            params,
            mode,
        });
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Completed log as currently materialized; does not flush
    pub fn completed(&self) -> &[Message] {
        &self.completed
    }

    /// Id recorded from the most recent response-mode flush
    pub fn last_response_id(&self) -> Option<&str> {
        self.last_response_id.as_deref()
    }

    /// Resolve the pending backlog in one provider call
    ///
    /// No-op on an empty queue, so repeated reads cost nothing. On failure
    /// the completed log is untouched; the pending queue is already drained
    /// and callers wanting a retry must re-enqueue.
    pub async fn flush(&mut self) -> Result<()> {
        self.flush_inner(None).await
    }

    /// Like `flush`, but over the streamed transport, echoing text deltas
    /// to `sink` as they arrive
    pub async fn flush_streaming(&mut self, sink: Box<dyn TextSink>) -> Result<()> {
        self.flush_inner(Some(sink)).await
    }

    async fn flush_inner(&mut self, sink: Option<Box<dyn TextSink>>) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut batch = std::mem::take(&mut self.pending);
        let Some(driving) = batch.pop() else {
            return Ok(());
        };
        if batch.iter().any(|entry| entry.mode != driving.mode) {
            return Err(LlmError::MixedModes.into());
        }

        let context: Vec<Message> = batch.into_iter().map(|entry| entry.message).collect();
        let model = driving
            .params
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());

        tracing::debug!(
            "flushing {} queued turn(s) through {:?} mode on {}",
            context.len() + 1,
            driving.mode,
            model
        );

        match driving.mode {
            QueueMode::Completion => {
                let mut messages = self.completed.clone();
                messages.extend(context.iter().cloned());
                messages.push(driving.message.clone());

                let request = ChatRequest {
                    model,
                    messages,
                    params: driving.params.clone(),
                };

                let produced = match sink {
                    None => self.provider.complete(request).await?.messages,
                    Some(sink) => {
                        let stream = self.provider.complete_stream(request).await?;
                        let merger = Arc::new(Mutex::new(ChatMerger::new().with_sink(sink)));
                        drive_merge(stream, Arc::clone(&merger)).await?;
                        merger
                            .lock()
                            .map(|m| m.messages())
                            .map_err(|_| anyhow!("stream merger lock poisoned"))?
                    }
                };
                let produced = self.relabel(produced);
                self.commit(context, driving.message, produced);
            }

            QueueMode::Response => {
                let mut input = context.clone();
                input.push(driving.message.clone());

                let request = ResponseRequest {
                    model,
                    input,
                    previous_response_id: self.last_response_id.clone(),
                    params: driving.params.clone(),
                };

                let (produced, response_id) = match sink {
                    None => {
                        let outcome = self.provider.respond(request).await?;
                        (outcome.messages, outcome.id)
                    }
                    Some(sink) => {
                        let stream = self.provider.respond_stream(request).await?;
                        let merger =
                            Arc::new(Mutex::new(ResponsesMerger::new().with_sink(sink)));
                        drive_merge(stream, Arc::clone(&merger)).await?;
                        let guard = merger
                            .lock()
                            .map_err(|_| anyhow!("stream merger lock poisoned"))?;
                        (guard.messages(), guard.response_id().map(String::from))
                    }
                };

                if let Some(id) = response_id {
                    self.last_response_id = Some(id);
                }
                let produced = self.relabel(produced);
                self.commit(context, driving.message, produced);
            }
        }

        Ok(())
    }

    /// Append a resolved flush to the completed log: context turns in
    /// enqueue order, then the driving turn, then what the provider produced
    fn commit(&mut self, context: Vec<Message>, driving: Message, produced: Vec<Message>) {
        self.completed.extend(context);
        self.completed.push(driving);
        self.completed.extend(produced);
    }

    /// Rewrite generated roles to the provider's dialect
    fn relabel(&self, mut produced: Vec<Message>) -> Vec<Message> {
        let role = self.provider.assistant_role();
        if role != Role::Assistant {
            for message in produced.iter_mut() {
                if message.role == Role::Assistant {
                    message.role = role;
                }
            }
        }
        produced
    }

    /// All completed messages, materializing the backlog first
    pub async fn messages(&mut self) -> Result<&[Message]> {
        self.flush().await?;
        Ok(&self.completed)
    }

    /// Indexed access; prefers the completed log and only flushes when the
    /// index is not there yet
    pub async fn get(&mut self, index: usize) -> Result<Option<&Message>> {
        if index >= self.completed.len() {
            self.flush().await?;
        }
        Ok(self.completed.get(index))
    }

    pub async fn find<P>(&mut self, predicate: P) -> Result<Option<&Message>>
    where
        P: Fn(&Message) -> bool,
    {
        self.flush().await?;
        Ok(self.completed.iter().find(|m| predicate(m)))
    }

    pub async fn last(&mut self) -> Result<Option<&Message>> {
        self.flush().await?;
        Ok(self.completed.last())
    }

    /// Most recent message with exactly this role, scanning from the end
    pub async fn last_message(&mut self, role: Role) -> Result<Option<&Message>> {
        self.flush().await?;
        Ok(self.completed.iter().rev().find(|m| m.role == role))
    }

    /// Completed messages not yet marked read
    pub async fn unread(&mut self) -> Result<&[Message]> {
        self.flush().await?;
        Ok(&self.completed[self.read_cursor..])
    }

    /// Advance the read cursor past everything currently completed
    pub fn mark_read(&mut self) {
        self.read_cursor = self.completed.len();
    }
}
