//! Internal execution events yielded by the workflow engine.
//!
//! These types form the engine boundary: a remote runner emits one
//! [`EngineItem`] per NDJSON line and the orchestrator translates each into
//! exactly one wire event.

use serde::{Deserialize, Serialize};

/// A completed tool call attached to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Tool name.
    pub name: String,
    /// Parsed call arguments.
    #[serde(default)]
    pub args: serde_json::Value,
    /// Call identifier, echoed by the matching tool result.
    #[serde(default)]
    pub id: String,
    /// Call kind reported by the model provider.
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// A partial, still-streaming tool call.
///
/// `args` is a raw text fragment of a larger JSON document and may be
/// truncated or otherwise invalid on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallChunk {
    /// Tool name; usually only present on the first chunk of a call.
    #[serde(default)]
    pub name: String,
    /// Raw argument fragment.
    #[serde(default)]
    pub args: String,
    /// Call identifier; usually only present on the first chunk of a call.
    #[serde(default)]
    pub id: String,
    /// Position of the call within the message.
    #[serde(default)]
    pub index: u32,
    /// Chunk kind reported by the model provider.
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Partial assistant output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageFragment {
    /// Stable message identifier shared by all fragments of one message.
    pub id: String,
    /// Text delta; may be empty.
    #[serde(default)]
    pub content: String,
    /// Reasoning-model thinking delta.
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Provider finish reason on the last fragment.
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Completed tool calls.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Streaming tool-call fragments.
    #[serde(default)]
    pub tool_call_chunks: Vec<ToolCallChunk>,
}

/// Output of a finished tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Message identifier of the tool message.
    pub id: String,
    /// Call identifier of the originating tool call.
    pub tool_call_id: String,
    /// Tool output.
    #[serde(default)]
    pub content: String,
}

/// The engine paused and needs human input to continue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Suspension {
    /// Explicit suspension identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Legacy namespace list; the first entry doubles as an identifier.
    #[serde(default)]
    pub ns: Vec<String>,
    /// Value shown to the human (usually the proposed plan).
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Suspension {
    /// Read a suspension from whatever shape the engine produced.
    ///
    /// Never fails: string `id` and string-list `ns` keys are always
    /// honoured; `value` supplies the payload, and when it is absent the
    /// whole object stands in for it. Non-object shapes become the value of
    /// an anonymous suspension.
    #[must_use]
    pub fn from_raw(raw: serde_json::Value) -> Self {
        let serde_json::Value::Object(fields) = raw else {
            return Self {
                value: raw,
                ..Self::default()
            };
        };

        let id = match fields.get("id") {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Some(id.clone()),
            _ => None,
        };
        let ns = match fields.get("ns") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(ToOwned::to_owned))
                .collect(),
            _ => Vec::new(),
        };
        let mut fields = fields;
        let value = match fields.remove("value") {
            Some(value) => value,
            None => serde_json::Value::Object(fields),
        };

        Self { id, ns, value }
    }
}

/// One internal execution event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// Assistant output, possibly carrying tool calls.
    Message(MessageFragment),
    /// Result of a tool call.
    ToolResult(ToolResult),
    /// Workflow paused awaiting human input.
    #[serde(rename = "interrupt")]
    Suspension(
        #[serde(deserialize_with = "deserialize_suspension")] Suspension,
    ),
}

fn deserialize_suspension<'de, D>(deserializer: D) -> std::result::Result<Suspension, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(Suspension::from_raw(raw))
}

/// Where in the workflow graph an event originated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionMetadata {
    /// Node that produced the event.
    #[serde(default)]
    pub node: Option<String>,
    /// Graph step index.
    #[serde(default)]
    pub step: Option<u64>,
    /// Checkpoint namespace of the producing subgraph.
    #[serde(default)]
    pub checkpoint_ns: Option<String>,
    /// Task path of the producing node within the graph.
    #[serde(default)]
    pub path: Vec<String>,
}

/// An execution event together with its origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineItem {
    /// Subgraph path; entries look like `researcher:<task id>`.
    #[serde(default)]
    pub agent_path: Vec<String>,
    /// Execution metadata.
    #[serde(default)]
    pub metadata: ExecutionMetadata,
    /// The event itself.
    pub event: ExecutionEvent,
}

impl EngineItem {
    /// Wrap an event with empty origin information.
    #[must_use]
    pub fn new(event: ExecutionEvent) -> Self {
        Self {
            agent_path: Vec::new(),
            metadata: ExecutionMetadata::default(),
            event,
        }
    }

    /// Set the agent path.
    #[must_use]
    pub fn with_agent_path(mut self, path: &[&str]) -> Self {
        self.agent_path = path.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    /// Set the producing node.
    #[must_use]
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.metadata.node = Some(node.into());
        self
    }
}
