//! Workflow engine invocation descriptor.

use serde::{Deserialize, Serialize};

use super::request::{ChatMessage, ReportStyle, Resource};

/// Input for a brand-new run on a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FreshInput {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Plan revision counter; always zero on a fresh run.
    pub plan_iterations: u32,
    /// Report produced so far; always empty on a fresh run.
    pub final_report: String,
    /// Current plan; always null on a fresh run.
    pub current_plan: Option<serde_json::Value>,
    /// Collected observations; always empty on a fresh run.
    pub observations: Vec<String>,
    /// Execute plans without asking for approval.
    pub auto_accepted_plan: bool,
    /// Run a background investigation before planning.
    pub enable_background_investigation: bool,
    /// Content of the newest message.
    pub research_topic: String,
}

/// Input that continues a suspended run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResumeCommand {
    /// Chosen option tag.
    pub feedback: String,
    /// Free text accompanying the choice.
    pub message: Option<String>,
}

impl ResumeCommand {
    /// Payload understood by the engine: `[<feedback>] <message>`.
    #[must_use]
    pub fn payload(&self) -> String {
        match &self.message {
            Some(message) => format!("[{}] {message}", self.feedback),
            None => format!("[{}]", self.feedback),
        }
    }
}

/// What the engine is asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowInput {
    /// Start over on the thread.
    Fresh(FreshInput),
    /// Continue from the thread's suspension point.
    Resume(ResumeCommand),
}

impl WorkflowInput {
    /// Whether this input resumes a suspended run.
    #[must_use]
    pub fn is_resume(&self) -> bool {
        matches!(self, Self::Resume(_))
    }
}

impl Serialize for WorkflowInput {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        #[serde(tag = "kind", rename_all = "snake_case")]
        enum Repr<'a> {
            Fresh(&'a FreshInput),
            Resume { resume: String },
        }

        match self {
            Self::Fresh(input) => Repr::Fresh(input).serialize(serializer),
            Self::Resume(command) => Repr::Resume {
                resume: command.payload(),
            }
            .serialize(serializer),
        }
    }
}

/// Per-run engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    /// Thread the run belongs to; also the checkpoint key.
    pub thread_id: String,
    /// Resources to ground the research in.
    pub resources: Vec<Resource>,
    /// Maximum plan revision rounds.
    pub max_plan_iterations: u32,
    /// Maximum steps in one plan.
    pub max_step_num: u32,
    /// Maximum results per search call.
    pub max_search_results: u32,
    /// MCP server settings; empty when the feature is disabled.
    pub mcp_settings: serde_json::Value,
    /// Report writing style.
    pub report_style: ReportStyle,
    /// Ask reasoning-capable models to think before answering.
    pub enable_deep_thinking: bool,
    /// Graph recursion limit.
    pub recursion_limit: u32,
}
