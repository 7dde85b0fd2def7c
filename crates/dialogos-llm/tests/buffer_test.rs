use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use dialogos_llm::{
    Bot, ByteStream, CallParams, ChatProvider, ChatRequest, CompletionOutcome,
    ConversationBuffer, LlmError, Message, Provider, QueueMode, ResponseOutcome,
    ResponseProvider, ResponseRequest, Role, TextSink, TokenUsage,
};

/// Provider double: counts calls, records requests, replies with a canned
/// assistant turn
struct MockProvider {
    calls: AtomicUsize,
    reply: String,
    fail: bool,
    seen_messages: Mutex<Vec<Message>>,
    seen_previous_id: Mutex<Option<String>>,
}

impl MockProvider {
    fn new(reply: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
            fail: false,
            seen_messages: Mutex::new(Vec::new()),
            seen_previous_id: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        let mut mock = Self::new("unused");
        mock.fail = true;
        mock
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn complete(&self, request: ChatRequest) -> Result<CompletionOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_messages.lock().unwrap() = request.messages.clone();
        if self.fail {
            anyhow::bail!("mock transport failure");
        }

        let mut message = Message::assistant(self.reply.clone());
        message.extra.set_usage(&TokenUsage {
            input_tokens: 3,
            output_tokens: 5,
            total_tokens: 8,
            reasoning_tokens: None,
        });
        Ok(CompletionOutcome {
            messages: vec![message],
            usage: None,
            finish_reason: Some("stop".to_string()),
            raw: json!({}),
        })
    }

    async fn complete_stream(&self, request: ChatRequest) -> Result<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_messages.lock().unwrap() = request.messages.clone();
        if self.fail {
            anyhow::bail!("mock transport failure");
        }

        let chunks: Vec<Result<Vec<u8>>> = vec![
            Ok(br#"data: {"id":"chatcmpl-1","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"}}]}"#.to_vec()),
            Ok(b"\n".to_vec()),
            Ok(br#"data: {"choices":[{"index":0,"delta":{"content":"lo"}}]}"#.to_vec()),
            Ok(b"\n".to_vec()),
            Ok(br#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#.to_vec()),
            Ok(b"\ndata: [DONE]\n".to_vec()),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[async_trait]
impl ResponseProvider for MockProvider {
    async fn respond(&self, request: ResponseRequest) -> Result<ResponseOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.seen_previous_id.lock().unwrap() = request.previous_response_id.clone();
        if self.fail {
            anyhow::bail!("mock transport failure");
        }

        let id = format!("resp_{call}");
        let mut message = Message::assistant(self.reply.clone());
        message.extra.set_response_id(&id);
        Ok(ResponseOutcome {
            id: Some(id),
            messages: vec![message],
            usage: None,
            status: Some("completed".to_string()),
            raw: json!({}),
        })
    }

    async fn respond_stream(&self, request: ResponseRequest) -> Result<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_previous_id.lock().unwrap() = request.previous_response_id.clone();

        let chunks: Vec<Result<Vec<u8>>> = vec![
            Ok(br#"data: {"type":"response.created","response":{"id":"resp_s1","status":"in_progress","output":[]}}"#.to_vec()),
            Ok(b"\n".to_vec()),
            Ok(br#"data: {"type":"response.output_item.added","output_index":0,"item":{"type":"message","role":"assistant","content":[]}}"#.to_vec()),
            Ok(b"\n".to_vec()),
            Ok(br#"data: {"type":"response.content_part.added","output_index":0,"content_index":0,"part":{"type":"output_text","text":""}}"#.to_vec()),
            Ok(b"\n".to_vec()),
            Ok(br#"data: {"type":"response.output_text.delta","output_index":0,"content_index":0,"delta":"streamed"}"#.to_vec()),
            Ok(b"\n".to_vec()),
            Ok(br#"data: {"type":"response.completed","response":{"id":"resp_s1","status":"completed","output":[{"type":"message","role":"assistant","content":[{"type":"output_text","text":"streamed"}]}]}}"#.to_vec()),
            Ok(b"\n".to_vec()),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

impl Provider for MockProvider {
    fn default_model(&self) -> &str {
        "mock-model"
    }
}

struct VecSink(Arc<Mutex<Vec<String>>>);

impl TextSink for VecSink {
    fn append(&mut self, delta: &str) {
        self.0.lock().unwrap().push(delta.to_string());
    }
}

fn buffer_with(mock: &Arc<MockProvider>) -> ConversationBuffer {
    ConversationBuffer::new(Arc::clone(mock) as Arc<dyn Provider>)
}

#[tokio::test]
async fn test_enqueue_is_lazy() {
    let mock = Arc::new(MockProvider::new("hi"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::system("be terse"), CallParams::new(), QueueMode::Completion);
    buffer.enqueue(Message::user("one"), CallParams::new(), QueueMode::Completion);
    buffer.enqueue(Message::user("two"), CallParams::new(), QueueMode::Completion);

    assert_eq!(mock.calls(), 0);
    assert_eq!(buffer.pending_len(), 3);

    let messages = buffer.messages().await.unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_flush_ordering_invariant() {
    let mock = Arc::new(MockProvider::new("answer"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::system("sys"), CallParams::new(), QueueMode::Completion);
    buffer.enqueue(Message::user("context"), CallParams::new(), QueueMode::Completion);
    buffer.enqueue(Message::user("driving"), CallParams::new(), QueueMode::Completion);
    buffer.flush().await.unwrap();

    // Completed log: context turns in enqueue order, driving turn, reply
    let completed = buffer.completed();
    assert_eq!(completed.len(), 4);
    assert_eq!(completed[0].role, Role::System);
    assert_eq!(completed[0].content.as_text(), Some("sys"));
    assert_eq!(completed[1].content.as_text(), Some("context"));
    assert_eq!(completed[2].content.as_text(), Some("driving"));
    assert_eq!(completed[3].role, Role::Assistant);
    assert_eq!(completed[3].content.as_text(), Some("answer"));

    // The single request saw the full backlog, driving turn last
    let seen = mock.seen_messages.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2].content.as_text(), Some("driving"));
}

#[tokio::test]
async fn test_rereads_are_idempotent() {
    let mock = Arc::new(MockProvider::new("hi"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::user("hello"), CallParams::new(), QueueMode::Completion);
    buffer.messages().await.unwrap();
    buffer.messages().await.unwrap();
    buffer.last().await.unwrap();

    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_flush_on_empty_queue_is_noop() {
    let mock = Arc::new(MockProvider::new("hi"));
    let mut buffer = buffer_with(&mock);

    buffer.flush().await.unwrap();
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_second_flush_resends_history() {
    let mock = Arc::new(MockProvider::new("reply"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::user("first"), CallParams::new(), QueueMode::Completion);
    buffer.flush().await.unwrap();
    buffer.enqueue(Message::user("second"), CallParams::new(), QueueMode::Completion);
    buffer.flush().await.unwrap();

    // Completion mode resends the whole completed log plus the new turn
    let seen = mock.seen_messages.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].content.as_text(), Some("first"));
    assert_eq!(seen[1].content.as_text(), Some("reply"));
    assert_eq!(seen[2].content.as_text(), Some("second"));
}

#[tokio::test]
async fn test_mixed_mode_batch_fails_loud() {
    let mock = Arc::new(MockProvider::new("hi"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::user("a"), CallParams::new(), QueueMode::Completion);
    buffer.enqueue(Message::user("b"), CallParams::new(), QueueMode::Response);

    let err = buffer.flush().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LlmError>(),
        Some(LlmError::MixedModes)
    ));
    // Failed before any I/O
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_failed_flush_leaves_completed_log_untouched() {
    let mock = Arc::new(MockProvider::failing());
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::user("hello"), CallParams::new(), QueueMode::Completion);
    assert!(buffer.flush().await.is_err());

    assert!(buffer.completed().is_empty());
    // Queue state after a failed flush: drained; callers re-enqueue to retry
    assert_eq!(buffer.pending_len(), 0);
}

#[tokio::test]
async fn test_response_mode_threads_previous_id() {
    let mock = Arc::new(MockProvider::new("ok"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::user("one"), CallParams::new(), QueueMode::Response);
    buffer.flush().await.unwrap();
    assert_eq!(mock.seen_previous_id.lock().unwrap().as_deref(), None);
    assert_eq!(buffer.last_response_id(), Some("resp_1"));

    buffer.enqueue(Message::user("two"), CallParams::new(), QueueMode::Response);
    buffer.flush().await.unwrap();
    assert_eq!(
        mock.seen_previous_id.lock().unwrap().as_deref(),
        Some("resp_1")
    );
}

#[tokio::test]
async fn test_indexed_access_triggers_flush() {
    let mock = Arc::new(MockProvider::new("hi"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::user("hello"), CallParams::new(), QueueMode::Completion);

    let message = buffer.get(1).await.unwrap().cloned();
    assert_eq!(mock.calls(), 1);
    assert_eq!(message.unwrap().role, Role::Assistant);

    // In range of the materialized log: no further call
    buffer.get(0).await.unwrap();
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_last_message_by_role_scans_from_end() {
    let mock = Arc::new(MockProvider::new("the answer"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::system("sys"), CallParams::new(), QueueMode::Completion);
    buffer.enqueue(Message::user("q1"), CallParams::new(), QueueMode::Completion);
    buffer.enqueue(Message::user("q2"), CallParams::new(), QueueMode::Completion);

    let found = buffer.last_message(Role::Assistant).await.unwrap().cloned();
    assert_eq!(found.unwrap().content.as_text(), Some("the answer"));

    let user = buffer.last_message(Role::User).await.unwrap().cloned();
    assert_eq!(user.unwrap().content.as_text(), Some("q2"));
}

#[tokio::test]
async fn test_unread_and_mark_read() {
    let mock = Arc::new(MockProvider::new("hi"));
    let mut buffer = buffer_with(&mock);

    buffer.enqueue(Message::user("hello"), CallParams::new(), QueueMode::Completion);
    assert_eq!(buffer.unread().await.unwrap().len(), 2);

    buffer.mark_read();
    assert!(buffer.unread().await.unwrap().is_empty());

    buffer.enqueue(Message::user("more"), CallParams::new(), QueueMode::Completion);
    assert_eq!(buffer.unread().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_streamed_flush_echoes_and_commits() {
    let mock = Arc::new(MockProvider::new("unused"));
    let mut buffer = buffer_with(&mock);

    let parts = Arc::new(Mutex::new(Vec::new()));
    buffer.enqueue(Message::user("hello"), CallParams::new(), QueueMode::Completion);
    buffer
        .flush_streaming(Box::new(VecSink(Arc::clone(&parts))))
        .await
        .unwrap();

    // Sink saw exactly the increments, in order
    assert_eq!(*parts.lock().unwrap(), vec!["Hel", "lo"]);

    let completed = buffer.completed();
    assert_eq!(completed.len(), 2);
    assert_eq!(completed[1].role, Role::Assistant);
    assert_eq!(completed[1].content.as_text(), Some("Hello"));
}

#[tokio::test]
async fn test_streamed_response_mode_records_id() {
    let mock = Arc::new(MockProvider::new("unused"));
    let mut buffer = buffer_with(&mock);

    let parts = Arc::new(Mutex::new(Vec::new()));
    buffer.enqueue(Message::user("hello"), CallParams::new(), QueueMode::Response);
    buffer
        .flush_streaming(Box::new(VecSink(Arc::clone(&parts))))
        .await
        .unwrap();

    assert_eq!(*parts.lock().unwrap(), vec!["streamed"]);
    assert_eq!(buffer.last_response_id(), Some("resp_s1"));

    let completed = buffer.completed();
    assert_eq!(completed[1].content.as_text(), Some("streamed"));
}

#[tokio::test]
async fn test_bot_facade_roles_and_usage() {
    let mock = Arc::new(MockProvider::new("bonjour"));
    let mut bot = Bot::new(Arc::clone(&mock) as Arc<dyn Provider>)
        .with_defaults(CallParams::new().model("mock-model").temperature(0.1));

    bot.system("translate to french").user("hello");
    assert_eq!(mock.calls(), 0);

    let reply = bot.reply().await.unwrap().cloned();
    assert_eq!(reply.unwrap().content.as_text(), Some("bonjour"));
    assert_eq!(mock.calls(), 1);

    let usage = bot.usage().unwrap();
    assert_eq!(usage.total_tokens, 8);
}
