use std::sync::{Arc, Mutex};

use serde_json::json;

use dialogos_llm::{
    ChatMerger, ChunkParse, EventDispatcher, MergeVisitor, ResponsesMerger, Role, SseTokenizer,
    StreamMerger, TextSink,
};

struct VecSink(Arc<Mutex<Vec<String>>>);

impl TextSink for VecSink {
    fn append(&mut self, delta: &str) {
        self.0.lock().unwrap().push(delta.to_string());
    }
}

fn sink() -> (Arc<Mutex<Vec<String>>>, Box<dyn TextSink>) {
    let parts = Arc::new(Mutex::new(Vec::new()));
    (Arc::clone(&parts), Box::new(VecSink(parts)))
}

#[test]
fn test_chat_first_occurrence_then_delta_merge() {
    let mut merger = ChatMerger::new();

    merger.apply(&json!({"choices":[{"index":0,"delta":{"content":"Hel"}}]}));
    merger.apply(&json!({"choices":[{"index":0,"delta":{"content":"lo"}}]}));

    // Concatenation, not replacement
    assert_eq!(merger.body()["choices"][0]["message"]["content"], "Hello");
}

#[test]
fn test_chat_sink_receives_exact_increments() {
    let (parts, sink) = sink();
    let mut merger = ChatMerger::new().with_sink(sink);

    merger.apply(&json!({"choices":[{"index":0,"delta":{"content":"Hel"}}]}));
    merger.apply(&json!({"choices":[{"index":0,"delta":{"content":"lo"}}]}));

    assert_eq!(*parts.lock().unwrap(), vec!["Hel", "lo"]);
}

#[test]
fn test_chat_top_level_fields_set_once() {
    let mut merger = ChatMerger::new();

    merger.apply(&json!({"id":"chatcmpl-1","model":"gpt-4o","choices":[]}));
    merger.apply(&json!({"id":"chatcmpl-IGNORED","choices":[]}));

    assert_eq!(merger.body()["id"], "chatcmpl-1");
    assert_eq!(merger.body()["model"], "gpt-4o");
}

#[test]
fn test_chat_absent_fields_left_untouched() {
    let mut merger = ChatMerger::new();

    merger.apply(&json!({"choices":[{"index":0,"delta":{"role":"assistant","content":"hi"}}]}));
    // A chunk with no content delta must not null anything out
    merger.apply(&json!({"choices":[{"index":0,"delta":{}}]}));

    assert_eq!(merger.body()["choices"][0]["message"]["content"], "hi");
    assert_eq!(merger.body()["choices"][0]["message"]["role"], "assistant");
}

#[test]
fn test_chat_parallel_choice_indexes() {
    let mut merger = ChatMerger::new();

    merger.apply(&json!({"choices":[{"index":1,"delta":{"content":"B"}}]}));
    merger.apply(&json!({"choices":[{"index":0,"delta":{"content":"A"}}]}));

    assert_eq!(merger.body()["choices"][0]["message"]["content"], "A");
    assert_eq!(merger.body()["choices"][1]["message"]["content"], "B");
}

#[test]
fn test_chat_tool_call_fragments_concatenate() {
    let mut merger = ChatMerger::new();

    merger.apply(&json!({"choices":[{"index":0,"delta":{"tool_calls":[
        {"index":0,"id":"call_1","function":{"name":"get_weather","arguments":"{\"ci"}}
    ]}}]}));
    merger.apply(&json!({"choices":[{"index":0,"delta":{"tool_calls":[
        {"index":0,"function":{"arguments":"ty\":\"NYC\"}"}}
    ]}}]}));
    merger.apply(&json!({"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}));

    let messages = merger.messages();
    assert_eq!(messages.len(), 1);

    let calls = messages[0].tool_calls().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].function.name, "get_weather");
    assert_eq!(calls[0].function.arguments, r#"{"city":"NYC"}"#);
    assert_eq!(calls[0].arguments_value().unwrap()["city"], "NYC");
}

#[test]
fn test_chat_usage_from_final_chunk() {
    let mut merger = ChatMerger::new();

    merger.apply(&json!({"choices":[{"index":0,"delta":{"content":"hi"},"finish_reason":"stop"}]}));
    merger.apply(&json!({"choices":[],"usage":{"prompt_tokens":7,"completion_tokens":2,"total_tokens":9}}));

    assert!(merger.is_done());
    let messages = merger.messages();
    let usage = messages[0].extra.usage().unwrap();
    assert_eq!(usage.input_tokens, 7);
    assert_eq!(usage.total_tokens, 9);
}

#[test]
fn test_done_sentinel_produces_no_mutation_or_echo() {
    let (parts, sink) = sink();
    let merger = Arc::new(Mutex::new(ChatMerger::new().with_sink(sink)));

    let mut tokenizer = SseTokenizer::new();
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Box::new(MergeVisitor::new(Arc::clone(&merger))));

    for event in tokenizer.append("data: [DONE]\n") {
        dispatcher.dispatch(&event);
    }

    assert!(parts.lock().unwrap().is_empty());
    let guard = merger.lock().unwrap();
    assert_eq!(guard.body(), &json!({}));
}

#[test]
fn test_malformed_chunk_is_dropped_and_stream_continues() {
    let merger = Arc::new(Mutex::new(ChatMerger::new()));

    let mut tokenizer = SseTokenizer::new();
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Box::new(MergeVisitor::new(Arc::clone(&merger))));

    let stream = "data: {not valid json\n\
                  data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"still fine\"}}]}\n";
    for event in tokenizer.append(stream) {
        dispatcher.dispatch(&event);
    }

    let guard = merger.lock().unwrap();
    assert_eq!(guard.body()["choices"][0]["message"]["content"], "still fine");
}

#[test]
fn test_skip_path_is_directly_assertable() {
    assert_eq!(ChunkParse::from_data("{broken"), ChunkParse::Skip);
    assert_eq!(ChunkParse::from_data("[DONE]"), ChunkParse::Done);
}

#[test]
fn test_responses_merge_lifecycle() {
    let (parts, sink) = sink();
    let mut merger = ResponsesMerger::new().with_sink(sink);

    merger.apply(&json!({"type":"response.created","response":{"id":"resp_1","status":"in_progress","output":[]}}));
    merger.apply(&json!({"type":"response.output_item.added","output_index":0,
        "item":{"type":"message","role":"assistant","content":[]}}));
    merger.apply(&json!({"type":"response.content_part.added","output_index":0,"content_index":0,
        "part":{"type":"output_text","text":""}}));
    merger.apply(&json!({"type":"response.output_text.delta","output_index":0,"content_index":0,"delta":"Hel"}));
    merger.apply(&json!({"type":"response.output_text.delta","output_index":0,"content_index":0,"delta":"lo"}));
    assert!(!merger.is_done());

    merger.apply(&json!({"type":"response.completed","response":{
        "id":"resp_1","status":"completed",
        "output":[{"type":"message","role":"assistant","content":[{"type":"output_text","text":"Hello"}]}],
        "usage":{"input_tokens":4,"output_tokens":2,"total_tokens":6}
    }}));

    assert!(merger.is_done());
    assert_eq!(*parts.lock().unwrap(), vec!["Hel", "lo"]);
    assert_eq!(merger.response_id(), Some("resp_1"));

    let messages = merger.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content.as_text(), Some("Hello"));
    assert_eq!(messages[0].extra.response_id(), Some("resp_1"));
    assert_eq!(messages[0].extra.usage().unwrap().total_tokens, 6);
}

#[test]
fn test_responses_delta_for_unannounced_item_is_skipped() {
    let mut merger = ResponsesMerger::new();

    // No output_item.added for index 0: the delta must be guarded, not panic
    merger.apply(&json!({"type":"response.output_text.delta","output_index":0,"content_index":0,"delta":"lost"}));

    assert!(merger.messages().is_empty());
}

#[test]
fn test_responses_function_call_arguments_assemble_at_block_stop() {
    let mut merger = ResponsesMerger::new();

    merger.apply(&json!({"type":"response.output_item.added","output_index":0,
        "item":{"type":"function_call","id":"fc_1","call_id":"call_9","name":"lookup","arguments":""}}));
    merger.apply(&json!({"type":"response.function_call_arguments.delta","output_index":0,"delta":"{\"q\":"}));
    merger.apply(&json!({"type":"response.function_call_arguments.delta","output_index":0,"delta":"\"rust\"}"}));
    merger.apply(&json!({"type":"response.output_item.done","output_index":0,
        "item":{"type":"function_call","id":"fc_1","call_id":"call_9","name":"lookup","arguments":"{\"q\":\"rust\"}"}}));

    let messages = merger.messages();
    assert_eq!(messages.len(), 1);

    let calls = messages[0].tool_calls().unwrap();
    assert_eq!(calls[0].id, "call_9");
    assert_eq!(calls[0].function.arguments, r#"{"q":"rust"}"#);
}

#[test]
fn test_responses_unknown_event_types_are_ignored() {
    let mut merger = ResponsesMerger::new();

    merger.apply(&json!({"type":"response.created","response":{"id":"resp_1","output":[]}}));
    merger.apply(&json!({"type":"response.audio.delta","output_index":0,"delta":"zzz"}));

    assert_eq!(merger.body()["id"], "resp_1");
    assert!(!merger.is_done());
}
