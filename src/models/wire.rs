//! Externally observable wire events.

use serde::Serialize;

use super::event::ToolCall;

/// Author role of a wire event.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Model or agent output.
    Assistant,
    /// Echo of client input.
    User,
}

/// Where in the workflow graph a message originated. Each field is
/// omitted from the JSON when unknown.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GraphPosition {
    /// Checkpoint namespace of the producing subgraph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_ns: Option<String>,
    /// Producing node.
    #[serde(rename = "langgraph_node", skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Task path of the producing node.
    #[serde(rename = "langgraph_path", skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    /// Graph step index.
    #[serde(rename = "langgraph_step", skip_serializing_if = "Option::is_none")]
    pub step: Option<u64>,
}

/// Fields shared by every wire event.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventHeader {
    /// Thread the event belongs to.
    pub thread_id: String,
    /// Agent that produced the event.
    pub agent: String,
    /// Stable message identifier.
    pub id: String,
    /// Author role.
    pub role: Role,
    /// Graph origin; empty for interrupts and echoed user input.
    #[serde(flatten)]
    pub position: GraphPosition,
    /// Text payload; omitted from the JSON when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Reasoning-model thinking delta.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Finish reason, present on the last fragment of a message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// A tool-call fragment as sent to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WireToolCallChunk {
    /// Tool name.
    pub name: String,
    /// Sanitized argument text.
    pub args: String,
    /// Call identifier.
    pub id: String,
    /// Position of the call within the message.
    pub index: u32,
    /// Chunk kind.
    #[serde(rename = "type")]
    pub kind: String,
}

/// A choice offered to the human when the workflow is interrupted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResumeOption {
    /// Button label.
    pub text: String,
    /// Tag sent back as `interrupt_feedback`.
    pub value: String,
}

/// Plain assistant text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessageChunkEvent {
    /// Common fields.
    #[serde(flatten)]
    pub header: EventHeader,
}

/// Assistant message carrying completed tool calls.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolCallsEvent {
    /// Common fields.
    #[serde(flatten)]
    pub header: EventHeader,
    /// Structured calls.
    pub tool_calls: Vec<ToolCall>,
    /// Sanitized argument chunks.
    pub tool_call_chunks: Vec<WireToolCallChunk>,
}

/// Assistant message carrying only streaming tool-call fragments.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolCallChunksEvent {
    /// Common fields.
    #[serde(flatten)]
    pub header: EventHeader,
    /// Sanitized argument chunks.
    pub tool_call_chunks: Vec<WireToolCallChunk>,
}

/// Output of a finished tool call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolCallResultEvent {
    /// Common fields.
    #[serde(flatten)]
    pub header: EventHeader,
    /// Call identifier of the originating tool call.
    pub tool_call_id: String,
}

/// Workflow paused awaiting human approval.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InterruptEvent {
    /// Common fields.
    #[serde(flatten)]
    pub header: EventHeader,
    /// Resume choices.
    pub options: Vec<ResumeOption>,
}

/// Substitute event for a failure that could not be rendered otherwise.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Thread the failure belongs to.
    pub thread_id: String,
    /// Error description.
    pub error: String,
}

/// One externally observable event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum WireEvent {
    /// `message_chunk`
    MessageChunk(MessageChunkEvent),
    /// `tool_calls`
    ToolCalls(ToolCallsEvent),
    /// `tool_call_chunks`
    ToolCallChunks(ToolCallChunksEvent),
    /// `tool_call_result`
    ToolCallResult(ToolCallResultEvent),
    /// `interrupt`
    Interrupt(InterruptEvent),
    /// `error`
    Error(ErrorEvent),
}

impl WireEvent {
    /// Event name written on the `event:` line.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageChunk(_) => "message_chunk",
            Self::ToolCalls(_) => "tool_calls",
            Self::ToolCallChunks(_) => "tool_call_chunks",
            Self::ToolCallResult(_) => "tool_call_result",
            Self::Interrupt(_) => "interrupt",
            Self::Error(_) => "error",
        }
    }

    /// Common fields, absent only for error events.
    #[must_use]
    pub fn header(&self) -> Option<&EventHeader> {
        match self {
            Self::MessageChunk(e) => Some(&e.header),
            Self::ToolCalls(e) => Some(&e.header),
            Self::ToolCallChunks(e) => Some(&e.header),
            Self::ToolCallResult(e) => Some(&e.header),
            Self::Interrupt(e) => Some(&e.header),
            Self::Error(_) => None,
        }
    }

    /// Thread the event belongs to.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        match self {
            Self::Error(e) => &e.thread_id,
            other => other.header().map_or("", |h| h.thread_id.as_str()),
        }
    }

    /// Finish reason, if any.
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.header().and_then(|h| h.finish_reason.as_deref())
    }
}
