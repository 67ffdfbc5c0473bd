//! Thread resolution and engine invocation planning.
//!
//! Turns a client [`ChatRequest`] into a resolved thread id plus the
//! descriptor the workflow engine runs with. Nothing is persisted here;
//! checkpoint state belongs to the engine and its backend.

use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::{GlobalConfig, NEW_THREAD_SENTINEL};
use crate::models::request::{ChatMessage, ChatRequest};
use crate::models::workflow::{FreshInput, ResumeCommand, WorkflowConfig, WorkflowInput};
use crate::{AppError, Result};

/// Everything needed to start or resume one streaming call.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    /// Resolved thread id.
    pub thread_id: String,
    /// Engine input.
    pub input: WorkflowInput,
    /// Engine configuration.
    pub config: WorkflowConfig,
    /// Client messages, recorded to the side log before the run starts.
    pub messages: Vec<ChatMessage>,
}

/// Resolve a client thread token; the new-thread sentinel mints a UUID.
#[must_use]
pub fn resolve_thread_id(token: &str) -> String {
    if token == NEW_THREAD_SENTINEL {
        Uuid::new_v4().to_string()
    } else {
        token.to_owned()
    }
}

/// Choose between a fresh run and a resume command.
///
/// A request resumes only when the plan is not auto-accepted and it carries
/// non-empty interrupt feedback; the newest message then becomes the
/// resume text instead of new input.
#[must_use]
pub fn build_input(request: &ChatRequest) -> WorkflowInput {
    let feedback = request
        .interrupt_feedback
        .as_deref()
        .filter(|feedback| !feedback.is_empty());

    if let (false, Some(feedback)) = (request.auto_accepted_plan, feedback) {
        return WorkflowInput::Resume(ResumeCommand {
            feedback: feedback.to_owned(),
            message: request.messages.last().map(ChatMessage::content_text),
        });
    }

    WorkflowInput::Fresh(FreshInput {
        messages: request.messages.clone(),
        plan_iterations: 0,
        final_report: String::new(),
        current_plan: None,
        observations: Vec::new(),
        auto_accepted_plan: request.auto_accepted_plan,
        enable_background_investigation: request.enable_background_investigation,
        research_topic: request
            .messages
            .last()
            .map(ChatMessage::content_text)
            .unwrap_or_default(),
    })
}

/// Validate a request and plan its engine invocation.
///
/// # Errors
///
/// Returns `AppError::FeatureDisabled` if the request carries MCP settings
/// while the MCP feature is off. No engine work happens in that case.
pub fn prepare(request: ChatRequest, settings: &GlobalConfig) -> Result<SessionPlan> {
    if request.mcp_settings.is_some() && !settings.features.mcp_enabled {
        return Err(AppError::FeatureDisabled(
            "MCP server configuration is disabled. Set ENABLE_MCP_SERVER_CONFIGURATION=true to enable MCP features".into(),
        ));
    }

    let thread_id = resolve_thread_id(&request.thread_id);
    let span = info_span!("prepare_session", thread_id = %thread_id);
    let _guard = span.enter();

    let input = build_input(&request);
    let mcp_settings = if settings.features.mcp_enabled {
        request
            .mcp_settings
            .clone()
            .unwrap_or_else(|| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };

    let config = WorkflowConfig {
        thread_id: thread_id.clone(),
        resources: request.resources,
        max_plan_iterations: request.max_plan_iterations,
        max_step_num: request.max_step_num,
        max_search_results: request.max_search_results,
        mcp_settings,
        report_style: request.report_style,
        enable_deep_thinking: request.enable_deep_thinking,
        recursion_limit: settings.recursion_limit,
    };

    info!(resume = input.is_resume(), "session planned");

    Ok(SessionPlan {
        thread_id,
        input,
        config,
        messages: request.messages,
    })
}
