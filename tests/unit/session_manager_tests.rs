//! Unit tests for thread resolution and engine invocation planning.

use research_stream::config::{GlobalConfig, NEW_THREAD_SENTINEL};
use research_stream::models::request::{ChatMessage, ChatRequest, ReportStyle, Resource};
use research_stream::models::workflow::WorkflowInput;
use research_stream::orchestrator::session_manager::{build_input, prepare, resolve_thread_id};
use research_stream::AppError;

fn request(messages: Vec<ChatMessage>) -> ChatRequest {
    ChatRequest {
        messages,
        thread_id: "thread-1".into(),
        ..ChatRequest::default()
    }
}

#[test]
fn sentinel_mints_distinct_uuids() {
    let first = resolve_thread_id(NEW_THREAD_SENTINEL);
    let second = resolve_thread_id(NEW_THREAD_SENTINEL);
    assert!(uuid::Uuid::parse_str(&first).is_ok());
    assert_ne!(first, second);
    assert_ne!(first, NEW_THREAD_SENTINEL);
}

#[test]
fn explicit_thread_id_is_kept() {
    assert_eq!(resolve_thread_id("abc-123"), "abc-123");
}

#[test]
fn feedback_without_auto_accept_resumes_with_last_message() {
    let mut req = request(vec![
        ChatMessage::text("user", "research rust"),
        ChatMessage::text("user", "go"),
    ]);
    req.interrupt_feedback = Some("accepted".into());

    let WorkflowInput::Resume(command) = build_input(&req) else {
        panic!("expected resume input");
    };
    assert_eq!(command.payload(), "[accepted] go");
}

#[test]
fn resume_without_messages_sends_bare_feedback() {
    let mut req = request(Vec::new());
    req.interrupt_feedback = Some("edit_plan".into());

    let WorkflowInput::Resume(command) = build_input(&req) else {
        panic!("expected resume input");
    };
    assert_eq!(command.payload(), "[edit_plan]");
}

#[test]
fn auto_accepted_plan_starts_fresh_even_with_feedback() {
    let mut req = request(vec![ChatMessage::text("user", "go")]);
    req.interrupt_feedback = Some("accepted".into());
    req.auto_accepted_plan = true;

    let WorkflowInput::Fresh(input) = build_input(&req) else {
        panic!("expected fresh input");
    };
    assert!(input.auto_accepted_plan);
    assert_eq!(input.research_topic, "go");
}

#[test]
fn empty_feedback_starts_fresh() {
    let mut req = request(vec![ChatMessage::text("user", "quantum dots")]);
    req.interrupt_feedback = Some(String::new());

    let WorkflowInput::Fresh(input) = build_input(&req) else {
        panic!("expected fresh input");
    };
    assert_eq!(input.messages.len(), 1);
    assert_eq!(input.plan_iterations, 0);
    assert!(input.final_report.is_empty());
    assert!(input.current_plan.is_none());
    assert!(input.observations.is_empty());
    assert!(input.enable_background_investigation);
    assert_eq!(input.research_topic, "quantum dots");
}

#[test]
fn prepare_rejects_mcp_settings_when_disabled() {
    let mut req = request(vec![ChatMessage::text("user", "hi")]);
    req.mcp_settings = Some(serde_json::json!({ "servers": {} }));

    let err = prepare(req, &GlobalConfig::default()).expect_err("must be rejected");
    assert!(matches!(err, AppError::FeatureDisabled(_)));
}

#[test]
fn prepare_forwards_mcp_settings_when_enabled() {
    let mut settings = GlobalConfig::default();
    settings.features.mcp_enabled = true;
    let servers = serde_json::json!({ "servers": { "search": { "transport": "stdio" } } });
    let mut req = request(vec![ChatMessage::text("user", "hi")]);
    req.mcp_settings = Some(servers.clone());

    let plan = prepare(req, &settings).expect("plan");
    assert_eq!(plan.config.mcp_settings, servers);
}

#[test]
fn prepare_defaults_mcp_settings_to_empty_object() {
    let plan = prepare(request(Vec::new()), &GlobalConfig::default()).expect("plan");
    assert_eq!(plan.config.mcp_settings, serde_json::json!({}));
}

#[test]
fn prepare_copies_request_and_server_settings() {
    let mut settings = GlobalConfig::default();
    settings.recursion_limit = 42;
    let mut req = request(vec![ChatMessage::text("user", "hi")]);
    req.max_plan_iterations = 2;
    req.max_step_num = 5;
    req.max_search_results = 7;
    req.report_style = ReportStyle::PopularScience;
    req.enable_deep_thinking = true;
    req.resources = vec![Resource {
        uri: "rag://dataset/1".into(),
        title: "Dataset".into(),
        description: None,
    }];

    let plan = prepare(req, &settings).expect("plan");
    assert_eq!(plan.thread_id, "thread-1");
    assert_eq!(plan.config.thread_id, "thread-1");
    assert_eq!(plan.config.max_plan_iterations, 2);
    assert_eq!(plan.config.max_step_num, 5);
    assert_eq!(plan.config.max_search_results, 7);
    assert_eq!(plan.config.report_style, ReportStyle::PopularScience);
    assert!(plan.config.enable_deep_thinking);
    assert_eq!(plan.config.recursion_limit, 42);
    assert_eq!(plan.config.resources.len(), 1);
    assert_eq!(plan.messages.len(), 1);
}

#[test]
fn prepare_resolves_sentinel_once_for_plan_and_config() {
    let req = ChatRequest::default();
    let plan = prepare(req, &GlobalConfig::default()).expect("plan");
    assert_ne!(plan.thread_id, NEW_THREAD_SENTINEL);
    assert_eq!(plan.thread_id, plan.config.thread_id);
}
