//! Translation of engine execution events into wire events.
//!
//! Exactly one [`WireEvent`] is produced per [`EngineItem`]; nothing is
//! buffered or reordered here.

use crate::models::event::{
    EngineItem, ExecutionEvent, ExecutionMetadata, MessageFragment, ToolCallChunk, ToolResult,
};
use crate::models::wire::{
    EventHeader, GraphPosition, MessageChunkEvent, Role, ToolCallChunksEvent,
    ToolCallResultEvent, ToolCallsEvent, WireEvent, WireToolCallChunk,
};

use super::interrupt;
use super::sanitize::sanitize_args;

/// Agent name used when neither the agent path nor the node is known.
pub const UNKNOWN_AGENT: &str = "unknown";

/// Resolve the agent that produced an event.
///
/// The first agent-path entry wins, cut at its first `:`; otherwise the
/// producing node; otherwise [`UNKNOWN_AGENT`].
#[must_use]
pub fn resolve_agent_name(agent_path: &[String], metadata: &ExecutionMetadata) -> String {
    if let Some(first) = agent_path.first() {
        return first
            .split_once(':')
            .map_or(first.as_str(), |(name, _)| name)
            .to_owned();
    }
    metadata
        .node
        .clone()
        .unwrap_or_else(|| UNKNOWN_AGENT.to_owned())
}

/// Graph origin carried on message and tool-result events.
#[must_use]
pub fn graph_position(metadata: ExecutionMetadata) -> GraphPosition {
    GraphPosition {
        checkpoint_ns: metadata.checkpoint_ns,
        node: metadata.node,
        path: metadata.path,
        step: metadata.step,
    }
}

/// Translate one engine item for `thread_id`.
#[must_use]
pub fn translate(item: EngineItem, thread_id: &str) -> WireEvent {
    let agent = resolve_agent_name(&item.agent_path, &item.metadata);
    let position = graph_position(item.metadata);
    match item.event {
        ExecutionEvent::Message(fragment) => message_event(fragment, thread_id, agent, position),
        ExecutionEvent::ToolResult(result) => {
            tool_result_event(result, thread_id, agent, position)
        }
        ExecutionEvent::Suspension(suspension) => {
            interrupt::interrupt_event(thread_id, agent, &suspension)
        }
    }
}

fn message_event(
    fragment: MessageFragment,
    thread_id: &str,
    agent: String,
    position: GraphPosition,
) -> WireEvent {
    let header = EventHeader {
        thread_id: thread_id.to_owned(),
        agent,
        id: fragment.id,
        role: Role::Assistant,
        position,
        content: fragment.content,
        reasoning_content: fragment.reasoning_content.filter(|r| !r.is_empty()),
        finish_reason: fragment.finish_reason.filter(|r| !r.is_empty()),
    };

    if !fragment.tool_calls.is_empty() {
        WireEvent::ToolCalls(ToolCallsEvent {
            header,
            tool_calls: fragment.tool_calls,
            tool_call_chunks: sanitize_chunks(fragment.tool_call_chunks),
        })
    } else if !fragment.tool_call_chunks.is_empty() {
        WireEvent::ToolCallChunks(ToolCallChunksEvent {
            header,
            tool_call_chunks: sanitize_chunks(fragment.tool_call_chunks),
        })
    } else {
        WireEvent::MessageChunk(MessageChunkEvent { header })
    }
}

fn tool_result_event(
    result: ToolResult,
    thread_id: &str,
    agent: String,
    position: GraphPosition,
) -> WireEvent {
    WireEvent::ToolCallResult(ToolCallResultEvent {
        header: EventHeader {
            thread_id: thread_id.to_owned(),
            agent,
            id: result.id,
            role: Role::Assistant,
            position,
            content: result.content,
            reasoning_content: None,
            finish_reason: None,
        },
        tool_call_id: result.tool_call_id,
    })
}

fn sanitize_chunks(chunks: Vec<ToolCallChunk>) -> Vec<WireToolCallChunk> {
    chunks
        .into_iter()
        .map(|chunk| WireToolCallChunk {
            args: sanitize_args(&chunk.args),
            name: chunk.name,
            id: chunk.id,
            index: chunk.index,
            kind: chunk.kind,
        })
        .collect()
}
