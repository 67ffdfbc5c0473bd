//! Packaging of engine suspensions into resumable `interrupt` events.

use tracing::debug;

use crate::models::event::Suspension;
use crate::models::wire::{
    EventHeader, GraphPosition, InterruptEvent, ResumeOption, Role, WireEvent,
};

/// Identifier used when a suspension carries neither an id nor a namespace.
pub const FALLBACK_INTERRUPT_ID: &str = "interrupt";

/// Finish reason attached to every interrupt event.
pub const INTERRUPT_FINISH_REASON: &str = "interrupt";

/// Feedback tag that asks the planner to revise the plan.
pub const EDIT_PLAN: &str = "edit_plan";

/// Feedback tag that accepts the plan and starts research.
pub const ACCEPTED: &str = "accepted";

/// The fixed pair of choices offered on every interrupt.
#[must_use]
pub fn resume_options() -> Vec<ResumeOption> {
    vec![
        ResumeOption {
            text: "Edit plan".into(),
            value: EDIT_PLAN.into(),
        },
        ResumeOption {
            text: "Start research".into(),
            value: ACCEPTED.into(),
        },
    ]
}

/// Identifier precedence: explicit id, then first namespace entry, then
/// [`FALLBACK_INTERRUPT_ID`].
#[must_use]
pub fn interrupt_id(suspension: &Suspension) -> String {
    suspension
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .or_else(|| {
            suspension
                .ns
                .first()
                .map(String::as_str)
                .filter(|ns| !ns.is_empty())
        })
        .unwrap_or(FALLBACK_INTERRUPT_ID)
        .to_owned()
}

/// Human-readable content: strings verbatim, anything else as JSON text.
#[must_use]
pub fn interrupt_content(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Build the `interrupt` wire event for a suspension.
#[must_use]
pub fn interrupt_event(thread_id: &str, agent: String, suspension: &Suspension) -> WireEvent {
    let id = interrupt_id(suspension);
    debug!(thread_id, interrupt_id = %id, "workflow suspended");
    WireEvent::Interrupt(InterruptEvent {
        header: EventHeader {
            thread_id: thread_id.to_owned(),
            agent,
            id,
            role: Role::Assistant,
            position: GraphPosition::default(),
            content: interrupt_content(&suspension.value),
            reasoning_content: None,
            finish_reason: Some(INTERRUPT_FINISH_REASON.into()),
        },
        options: resume_options(),
    })
}
