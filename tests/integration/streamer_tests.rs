//! Integration tests for the streaming pipeline: ordering, checkpoint
//! scoping, failure records, side-log fan-out, and thread state.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use research_stream::models::workflow::WorkflowInput;
use research_stream::orchestrator::streamer::{CHECKPOINT_UNAVAILABLE, WORKFLOW_FAILED};
use research_stream::orchestrator::thread_registry::ThreadStatus;
use research_stream::persistence::chat_log::{ChatLogEntry, ChatLogSink, MemoryChatLog};
use research_stream::{AppError, BoxFuture, Result};

use super::test_helpers::{
    collect, data, event_types, finished, fresh_plan, resume_plan, streamer, suspension, text,
    tool_call, tool_result, CountingConnector, ScriptedEngine, Step,
};

struct FailingChatLog;

impl ChatLogSink for FailingChatLog {
    fn append<'a>(
        &'a self,
        _thread_id: &'a str,
        _record: &'a str,
        _finish_reason: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Err(AppError::Db("disk full".into())) })
    }

    fn list<'a>(&'a self, _thread_id: &'a str) -> BoxFuture<'a, Result<Vec<ChatLogEntry>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn purge_inactive(&self, _cutoff: chrono::DateTime<chrono::Utc>) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async { Err(AppError::Db("disk full".into())) })
    }
}

#[tokio::test]
async fn records_follow_engine_order_and_reach_side_log() {
    let connector = Arc::new(CountingConnector::new());
    let log = Arc::new(MemoryChatLog::new());
    let engine = ScriptedEngine::new(vec![
        text("m1", "Hello"),
        tool_call("m2", "call-1"),
        tool_result("t1", "call-1", "3 results"),
        finished("m3", " done"),
    ]);
    let streamer = streamer(engine, connector, log.clone());

    let records = collect(streamer.stream(fresh_plan("thread-a", "research rust"))).await;

    assert_eq!(
        event_types(&records),
        vec!["message_chunk", "tool_calls", "tool_call_result", "message_chunk"]
    );
    assert!(records.iter().all(|r| r.thread_id == "thread-a"));

    let entries = log.list("thread-a").await.unwrap();
    assert_eq!(entries.len(), records.len() + 1);
    let logged: Vec<&str> = entries[1..].iter().map(|e| e.record.as_str()).collect();
    let sent: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(logged, sent);
    assert_eq!(entries[4].finish_reason, "stop");
}

#[tokio::test]
async fn initial_messages_are_logged_as_user_chunks() {
    let log = Arc::new(MemoryChatLog::new());
    let streamer = streamer(
        ScriptedEngine::new(vec![text("m1", "ok")]),
        Arc::new(CountingConnector::new()),
        log.clone(),
    );

    collect(streamer.stream(fresh_plan("thread-b", "research rust"))).await;

    let entries = log.list("thread-b").await.unwrap();
    let first = &entries[0];
    assert_eq!(first.finish_reason, "none");
    assert!(first.record.starts_with("event: message_chunk\n"));
    let line = first.record.lines().nth(1).unwrap().strip_prefix("data: ").unwrap();
    let payload: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(payload["role"], "user");
    assert_eq!(payload["content"], "research rust");
    assert!(payload["id"].as_str().unwrap().starts_with("run--"));
}

#[tokio::test]
async fn tool_call_chunks_carry_repaired_arguments() {
    let streamer = streamer(
        ScriptedEngine::new(vec![tool_call("m1", "call-1")]),
        Arc::new(CountingConnector::new()),
        Arc::new(MemoryChatLog::new()),
    );

    let records = collect(streamer.stream(fresh_plan("thread-c", "q"))).await;
    let payload = data(&records[0]);

    assert_eq!(payload["agent"], "researcher");
    assert_eq!(payload["tool_calls"][0]["name"], "web_search");
    let args = payload["tool_call_chunks"][0]["args"].as_str().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(args).unwrap();
    assert_eq!(parsed["query"], "ru");
}

#[tokio::test]
async fn checkpoint_scope_brackets_the_run() {
    let connector = Arc::new(CountingConnector::new());
    let engine = ScriptedEngine::new(vec![text("m1", "a"), text("m1", "b"), finished("m1", "c")])
        .watching(&connector.counters);
    let observed = engine.clone();
    let streamer = streamer(engine, connector.clone(), Arc::new(MemoryChatLog::new()));

    let records = collect(streamer.stream(fresh_plan("thread-d", "q"))).await;

    assert_eq!(records.len(), 3);
    assert_eq!(connector.counters.acquired(), 1);
    assert_eq!(connector.counters.released(), 1);
    assert_eq!(observed.bindings(), 1);
    let open = observed.open_during_run.lock().unwrap().clone();
    assert_eq!(open, vec![true, true, true]);
}

#[tokio::test]
async fn engine_failure_ends_with_error_record_and_releases_scope() {
    let connector = Arc::new(CountingConnector::new());
    let log = Arc::new(MemoryChatLog::new());
    let streamer = streamer(
        ScriptedEngine::new(vec![
            text("m1", "a"),
            text("m1", "b"),
            text("m1", "c"),
            Step::Fail("model provider returned 500"),
            text("m1", "never"),
        ]),
        connector.clone(),
        log.clone(),
    );

    let records = collect(streamer.stream(fresh_plan("thread-e", "q"))).await;

    assert_eq!(
        event_types(&records),
        vec!["message_chunk", "message_chunk", "message_chunk", "error"]
    );
    let payload = data(&records[3]);
    assert_eq!(payload["thread_id"], "thread-e");
    assert_eq!(payload["error"], WORKFLOW_FAILED);
    assert_eq!(connector.counters.released(), 1);
    assert_eq!(log.list("thread-e").await.unwrap().len(), 5);
}

#[tokio::test]
async fn unreachable_backend_yields_single_error_record() {
    let engine = ScriptedEngine::new(vec![text("m1", "never")]);
    let observed = engine.clone();
    let streamer = streamer(
        engine,
        Arc::new(CountingConnector::refusing()),
        Arc::new(MemoryChatLog::new()),
    );

    let records = collect(streamer.stream(fresh_plan("thread-f", "q"))).await;

    assert_eq!(event_types(&records), vec!["error"]);
    assert_eq!(data(&records[0])["error"], CHECKPOINT_UNAVAILABLE);
    assert_eq!(observed.bindings(), 0);
    assert!(observed.inputs().is_empty());
    assert_eq!(streamer.threads().status("thread-f"), None);
}

#[tokio::test]
async fn side_log_failure_does_not_interrupt_transport() {
    let streamer = streamer(
        ScriptedEngine::new(vec![text("m1", "a"), finished("m1", "b")]),
        Arc::new(CountingConnector::new()),
        Arc::new(FailingChatLog),
    );

    let records = collect(streamer.stream(fresh_plan("thread-g", "q"))).await;

    assert_eq!(event_types(&records), vec!["message_chunk", "message_chunk"]);
}

#[tokio::test]
async fn suspension_marks_thread_and_resume_reaches_engine() {
    let engine = ScriptedEngine::new(vec![
        text("m1", "Drafting plan"),
        suspension(serde_json::json!("1. Search\n2. Write")),
    ]);
    let observed = engine.clone();
    let streamer = streamer(engine, Arc::new(CountingConnector::new()), Arc::new(MemoryChatLog::new()));

    let records = collect(streamer.stream(fresh_plan("thread-h", "plan a trip"))).await;
    let last = records.last().unwrap();
    assert_eq!(last.event_type, "interrupt");
    assert_eq!(last.finish_reason, "interrupt");
    let payload = data(last);
    assert_eq!(payload["id"], "human-feedback-1");
    assert_eq!(payload["content"], "1. Search\n2. Write");
    assert_eq!(payload["options"][1]["value"], "accepted");
    assert_eq!(
        streamer.threads().status("thread-h"),
        Some(ThreadStatus::Suspended)
    );

    collect(streamer.stream(resume_plan("thread-h", "accepted", "go"))).await;

    let inputs = observed.inputs();
    assert_eq!(inputs.len(), 2);
    let WorkflowInput::Resume(command) = &inputs[1] else {
        panic!("second run must resume");
    };
    assert_eq!(command.payload(), "[accepted] go");
}

#[tokio::test]
async fn fresh_run_on_suspended_thread_abandons_suspension() {
    let streamer = streamer(
        ScriptedEngine::new(vec![finished("m1", "new answer")]),
        Arc::new(CountingConnector::new()),
        Arc::new(MemoryChatLog::new()),
    );
    streamer.threads().suspend("thread-i");

    let records = collect(streamer.stream(fresh_plan("thread-i", "new question"))).await;

    assert_eq!(records.len(), 1);
    assert_eq!(streamer.threads().status("thread-i"), None);
}

#[tokio::test]
async fn client_disconnect_releases_scope_and_thread() {
    let connector = Arc::new(CountingConnector::new());
    let streamer = streamer(
        ScriptedEngine::new(vec![text("m1", "partial"), Step::Hang]),
        connector.clone(),
        Arc::new(MemoryChatLog::new()),
    );

    let mut stream = streamer.stream(fresh_plan("thread-j", "q"));
    let first = stream.next().await.unwrap();
    assert_eq!(first.event_type, "message_chunk");
    assert_eq!(
        streamer.threads().status("thread-j"),
        Some(ThreadStatus::Running)
    );

    drop(stream);

    tokio::time::timeout(Duration::from_secs(2), async {
        while connector.counters.released() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("scope closed after disconnect");
    assert_eq!(connector.counters.acquired(), 1);
    assert_eq!(streamer.threads().status("thread-j"), None);
}
