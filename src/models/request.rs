//! Client-facing request bodies for the streaming and discovery APIs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::NEW_THREAD_SENTINEL;

/// Writing style the report agent should use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStyle {
    /// Formal, citation-heavy writing.
    #[default]
    #[serde(alias = "ACADEMIC")]
    Academic,
    /// Plain-language writing for a general audience.
    #[serde(alias = "POPULAR_SCIENCE")]
    PopularScience,
}

/// One chat message supplied by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Author role (`user` or `assistant`).
    pub role: String,
    /// Message body; plain text or a structured multi-part value.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Client-side identifier, when the client tracks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatMessage {
    /// Build a plain-text message.
    #[must_use]
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: serde_json::Value::String(content.into()),
            id: None,
        }
    }

    /// Content rendered as text; structured content is JSON-encoded.
    #[must_use]
    pub fn content_text(&self) -> String {
        match &self.content {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Whether the message carries any content worth recording.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content.is_null()
    }
}

/// External knowledge resource attached to a research request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    /// Resource URI understood by the retrieval provider.
    pub uri: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_thread_id() -> String {
    NEW_THREAD_SENTINEL.into()
}

fn default_max_plan_iterations() -> u32 {
    1
}

fn default_max_step_num() -> u32 {
    3
}

fn default_max_search_results() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// Body of `POST /api/chat/stream`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Conversation so far; the last entry is the newest user turn.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Resources to ground the research in.
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Thread token; `__default__` requests a new thread.
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
    /// Maximum plan revision rounds.
    #[serde(default = "default_max_plan_iterations")]
    pub max_plan_iterations: u32,
    /// Maximum steps in one plan.
    #[serde(default = "default_max_step_num")]
    pub max_step_num: u32,
    /// Maximum results per search call.
    #[serde(default = "default_max_search_results")]
    pub max_search_results: u32,
    /// Execute generated plans without asking for approval.
    #[serde(default)]
    pub auto_accepted_plan: bool,
    /// Answer to a pending interrupt (`accepted`, `edit_plan`, ...).
    #[serde(default)]
    pub interrupt_feedback: Option<String>,
    /// MCP server settings; only honoured when the MCP feature is enabled.
    #[serde(default)]
    pub mcp_settings: Option<serde_json::Value>,
    /// Run a background web investigation before planning.
    #[serde(default = "default_true")]
    pub enable_background_investigation: bool,
    /// Report writing style.
    #[serde(default)]
    pub report_style: ReportStyle,
    /// Ask reasoning-capable models to think before answering.
    #[serde(default)]
    pub enable_deep_thinking: bool,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            resources: Vec::new(),
            thread_id: default_thread_id(),
            max_plan_iterations: default_max_plan_iterations(),
            max_step_num: default_max_step_num(),
            max_search_results: default_max_search_results(),
            auto_accepted_plan: false,
            interrupt_feedback: None,
            mcp_settings: None,
            enable_background_investigation: true,
            report_style: ReportStyle::default(),
            enable_deep_thinking: false,
        }
    }
}

/// Transport used to reach an MCP server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum McpTransport {
    /// Child process speaking over stdin/stdout.
    Stdio,
    /// Legacy HTTP + Server-Sent Events.
    Sse,
    /// Streamable HTTP.
    StreamableHttp,
}

/// Body of `POST /api/mcp/server/metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpServerMetadataRequest {
    /// Connection transport.
    pub transport: McpTransport,
    /// Executable to launch (stdio).
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments for `command`.
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Server URL (sse / streamable HTTP).
    #[serde(default)]
    pub url: Option<String>,
    /// Extra environment for `command`.
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    /// Extra HTTP headers.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Override for the discovery timeout.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Response of `POST /api/mcp/server/metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpServerMetadataResponse {
    /// Connection transport.
    pub transport: McpTransport,
    /// Executable that was launched.
    pub command: Option<String>,
    /// Arguments for `command`.
    pub args: Option<Vec<String>>,
    /// Server URL.
    pub url: Option<String>,
    /// Extra environment.
    pub env: Option<HashMap<String, String>>,
    /// Extra HTTP headers.
    pub headers: Option<HashMap<String, String>>,
    /// Tools advertised by the server.
    pub tools: Vec<serde_json::Value>,
}
