//! Contract tests for the SSE wire format.
//!
//! Clients parse these records directly, so field names, omission rules,
//! and the record layout are part of the public API.

use research_stream::models::event::{
    EngineItem, ExecutionEvent, ExecutionMetadata, MessageFragment, Suspension, ToolCallChunk,
    ToolResult,
};
use research_stream::models::wire::{ErrorEvent, WireEvent};
use research_stream::orchestrator::framer::{frame, frame_payload, SERIALIZATION_FAILED};
use research_stream::orchestrator::interrupt::FALLBACK_INTERRUPT_ID;
use research_stream::orchestrator::translator::translate;

fn payload(text: &str) -> serde_json::Value {
    let (_, json) = text
        .trim_end_matches('\n')
        .split_once("\ndata: ")
        .expect("data line");
    serde_json::from_str(json).expect("json body")
}

fn message(content: &str) -> EngineItem {
    EngineItem::new(ExecutionEvent::Message(MessageFragment {
        id: "run-1".into(),
        content: content.into(),
        ..MessageFragment::default()
    }))
    .with_agent_path(&["coordinator:abc"])
}

#[test]
fn record_layout_is_event_then_data_then_blank_line() {
    let record = frame(&translate(message("hi"), "t1"));
    assert_eq!(record.event_type, "message_chunk");
    assert!(record.text.starts_with("event: message_chunk\ndata: {"));
    assert!(record.text.ends_with("}\n\n"));
    assert_eq!(record.text.matches('\n').count(), 3);
}

#[test]
fn message_chunk_fields() {
    let record = frame(&translate(message("hi"), "t1"));
    assert_eq!(
        payload(&record.text),
        serde_json::json!({
            "thread_id": "t1",
            "agent": "coordinator",
            "id": "run-1",
            "role": "assistant",
            "content": "hi",
        })
    );
}

#[test]
fn message_events_carry_graph_position() {
    let mut item = message("hi");
    item.metadata = ExecutionMetadata {
        node: Some("researcher".into()),
        step: Some(4),
        checkpoint_ns: Some("researcher:7f3a".into()),
        path: vec!["__pregel_pull".into(), "researcher".into()],
    };
    let body = payload(&frame(&translate(item, "t1")).text);
    assert_eq!(body["checkpoint_ns"], "researcher:7f3a");
    assert_eq!(body["langgraph_node"], "researcher");
    assert_eq!(body["langgraph_path"], serde_json::json!(["__pregel_pull", "researcher"]));
    assert_eq!(body["langgraph_step"], 4);
    assert_eq!(body["agent"], "coordinator");
}

#[test]
fn interrupt_events_carry_no_graph_position() {
    let item = EngineItem::new(ExecutionEvent::Suspension(Suspension {
        id: Some("int-1".into()),
        ..Suspension::default()
    }))
    .with_node("human_feedback");
    let body = payload(&frame(&translate(item, "t1")).text);
    assert!(body.get("langgraph_node").is_none());
    assert!(body.get("checkpoint_ns").is_none());
    assert_eq!(body["agent"], "human_feedback");
}

#[test]
fn empty_content_is_omitted() {
    let record = frame(&translate(message(""), "t1"));
    let body = payload(&record.text);
    assert!(body.get("content").is_none());
    assert!(body.get("finish_reason").is_none());
    assert!(body.get("reasoning_content").is_none());
}

#[test]
fn non_ascii_is_written_verbatim() {
    let record = frame(&translate(message("量子计算 – café"), "t1"));
    assert!(record.text.contains("量子计算 – café"));
    assert!(!record.text.contains("\\u"));
}

#[test]
fn finish_and_reasoning_are_included_when_present() {
    let item = EngineItem::new(ExecutionEvent::Message(MessageFragment {
        id: "run-2".into(),
        content: "done".into(),
        reasoning_content: Some("thinking".into()),
        finish_reason: Some("stop".into()),
        ..MessageFragment::default()
    }));
    let record = frame(&translate(item, "t1"));
    let body = payload(&record.text);
    assert_eq!(body["finish_reason"], "stop");
    assert_eq!(body["reasoning_content"], "thinking");
    assert_eq!(body["agent"], "unknown");
    assert_eq!(record.finish_reason, "stop");
}

#[test]
fn chunk_only_message_is_tool_call_chunks() {
    let item = EngineItem::new(ExecutionEvent::Message(MessageFragment {
        id: "run-3".into(),
        tool_call_chunks: vec![ToolCallChunk {
            name: "crawl".into(),
            args: r#"{"url": "https://exa"#.into(),
            id: "call-9".into(),
            index: 0,
            kind: "tool_call_chunk".into(),
        }],
        ..MessageFragment::default()
    }));
    let record = frame(&translate(item, "t1"));
    assert_eq!(record.event_type, "tool_call_chunks");
    let body = payload(&record.text);
    let chunk = &body["tool_call_chunks"][0];
    assert_eq!(chunk["name"], "crawl");
    assert_eq!(chunk["type"], "tool_call_chunk");
    let args: serde_json::Value =
        serde_json::from_str(chunk["args"].as_str().expect("args text")).expect("repaired");
    assert_eq!(args["url"], "https://exa");
}

#[test]
fn tool_call_result_fields() {
    let item = EngineItem::new(ExecutionEvent::ToolResult(ToolResult {
        id: "tool-1".into(),
        tool_call_id: "call-9".into(),
        content: "page text".into(),
    }))
    .with_node("researcher");
    let record = frame(&translate(item, "t1"));
    assert_eq!(record.event_type, "tool_call_result");
    let body = payload(&record.text);
    assert_eq!(body["tool_call_id"], "call-9");
    assert_eq!(body["agent"], "researcher");
    assert_eq!(body["content"], "page text");
}

#[test]
fn interrupt_without_identifiers_uses_fallback_id() {
    let item = EngineItem::new(ExecutionEvent::Suspension(Suspension {
        id: None,
        ns: Vec::new(),
        value: serde_json::json!({ "title": "Plan" }),
    }));
    let record = frame(&translate(item, "t1"));
    let body = payload(&record.text);
    assert_eq!(body["id"], FALLBACK_INTERRUPT_ID);
    assert_eq!(body["finish_reason"], "interrupt");
    assert_eq!(body["role"], "assistant");
    assert_eq!(
        body["options"],
        serde_json::json!([
            { "text": "Edit plan", "value": "edit_plan" },
            { "text": "Start research", "value": "accepted" },
        ])
    );
    let content: serde_json::Value =
        serde_json::from_str(body["content"].as_str().expect("content")).expect("json content");
    assert_eq!(content, serde_json::json!({ "title": "Plan" }));
}

#[test]
fn interrupt_namespace_is_used_when_id_missing() {
    let item = EngineItem::new(ExecutionEvent::Suspension(Suspension {
        id: None,
        ns: vec!["human_feedback:77".into()],
        value: serde_json::json!("plan text"),
    }));
    let body = payload(&frame(&translate(item, "t1")).text);
    assert_eq!(body["id"], "human_feedback:77");
    assert_eq!(body["content"], "plan text");
}

#[test]
fn decoded_interrupt_with_only_an_id_keeps_that_id() {
    let item: EngineItem = serde_json::from_value(serde_json::json!({
        "event": { "type": "interrupt", "id": "int-7" }
    }))
    .expect("decodes");
    let body = payload(&frame(&translate(item, "t1")).text);
    assert_eq!(body["id"], "int-7");
    assert_eq!(body["finish_reason"], "interrupt");
}

#[test]
fn error_event_fields() {
    let record = frame(&WireEvent::Error(ErrorEvent {
        thread_id: "t1".into(),
        error: "workflow execution failed".into(),
    }));
    assert_eq!(record.event_type, "error");
    assert_eq!(
        payload(&record.text),
        serde_json::json!({ "thread_id": "t1", "error": "workflow execution failed" })
    );
}

struct Unserializable;

impl serde::Serialize for Unserializable {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cannot encode"))
    }
}

#[test]
fn serialization_failure_becomes_error_record() {
    let record = frame_payload("message_chunk", "t1", "stop", &Unserializable);
    assert_eq!(record.event_type, "error");
    assert_eq!(record.thread_id, "t1");
    assert_eq!(
        record.text,
        format!("event: error\ndata: {{\"error\":\"{SERIALIZATION_FAILED}\"}}\n\n")
    );
}
