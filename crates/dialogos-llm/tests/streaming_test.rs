use anyhow::Result;
use futures::StreamExt;

use dialogos_llm::{stream_events, ByteStream, StreamEvent};

fn bytes(chunks: Vec<&str>) -> ByteStream {
    let owned: Vec<Result<Vec<u8>>> = chunks
        .into_iter()
        .map(|c| Ok(c.as_bytes().to_vec()))
        .collect();
    Box::pin(futures::stream::iter(owned))
}

#[tokio::test]
async fn test_stream_events_over_fragmented_transport() {
    // Line boundaries intentionally split across transport chunks
    let stream = bytes(vec![
        "data: {\"choices\":[{\"index\":0,\"del",
        "ta\":{\"content\":\"Hel\"}}]}\ndata: {\"choices\":[{\"index\":0,",
        "\"delta\":{\"content\":\"lo\"}}]}\n",
        "data: [DONE]\n",
    ]);

    let events: Vec<StreamEvent> = stream_events(stream)
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    match &events[0] {
        StreamEvent::Message { content } => assert_eq!(content, "Hel"),
        other => panic!("expected message, got {:?}", other),
    }
    match &events[1] {
        StreamEvent::Message { content } => assert_eq!(content, "lo"),
        other => panic!("expected message, got {:?}", other),
    }
    assert!(matches!(events[2], StreamEvent::Done { .. }));
}

#[tokio::test]
async fn test_stream_events_skips_malformed_chunks() {
    let stream = bytes(vec![
        "data: {broken\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"}}]}\n",
        "data: [DONE]\n",
    ]);

    let events: Vec<StreamEvent> = stream_events(stream)
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    match &events[0] {
        StreamEvent::Message { content } => assert_eq!(content, "ok"),
        other => panic!("expected message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_events_tool_calls_and_finish() {
    let stream = bytes(vec![
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"get_weather\",\"arguments\":\"{}\"}}]}}]}\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n",
    ]);

    let events: Vec<StreamEvent> = stream_events(stream)
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    match &events[0] {
        StreamEvent::ToolCall { index, id, name, .. } => {
            assert_eq!(*index, 0);
            assert_eq!(id.as_deref(), Some("call_1"));
            assert_eq!(name.as_deref(), Some("get_weather"));
        }
        other => panic!("expected tool call, got {:?}", other),
    }
    match &events[1] {
        StreamEvent::Done { finish_reason } => {
            assert_eq!(finish_reason.as_deref(), Some("tool_calls"))
        }
        other => panic!("expected done, got {:?}", other),
    }
}

#[test]
fn test_stream_event_serialization() {
    let event = StreamEvent::Message {
        content: "Test".to_string(),
    };

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"message\""));
    assert!(json.contains("Test"));
}

#[test]
fn test_stream_event_deserialization() {
    let json = r#"{"type":"tool_call","index":0,"id":"call_1","name":"test","arguments":"{}"}"#;
    let event: StreamEvent = serde_json::from_str(json).unwrap();

    match event {
        StreamEvent::ToolCall { index, .. } => assert_eq!(index, 0),
        _ => panic!("Expected ToolCall variant"),
    }
}

#[test]
fn test_stream_event_done_without_reason() {
    let json = serde_json::to_string(&StreamEvent::Done {
        finish_reason: None,
    })
    .unwrap();
    assert_eq!(json, r#"{"type":"done"}"#);
}
