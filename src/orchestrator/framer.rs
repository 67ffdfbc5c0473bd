//! Wire framing: `event: <type>` / `data: <json>` records.

use serde::Serialize;
use tracing::error;

use crate::models::wire::WireEvent;

/// Payload of the substitute event emitted when serialization fails.
pub const SERIALIZATION_FAILED: &str = "Serialization failed";

/// One framed record, ready for the transport and the side log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedRecord {
    /// Event name on the `event:` line.
    pub event_type: String,
    /// Thread the record belongs to.
    pub thread_id: String,
    /// Finish reason tag for the side log; empty when absent.
    pub finish_reason: String,
    /// Complete record text including the terminating blank line.
    pub text: String,
}

/// Render a record from its event name and JSON body.
#[must_use]
pub fn encode_record(event_type: &str, json: &str) -> String {
    format!("event: {event_type}\ndata: {json}\n\n")
}

/// Frame a wire event.
#[must_use]
pub fn frame(event: &WireEvent) -> FramedRecord {
    frame_payload(
        event.event_type(),
        event.thread_id(),
        event.finish_reason().unwrap_or_default(),
        event,
    )
}

/// Frame an arbitrary serializable payload.
///
/// Non-ASCII text is written verbatim. If the payload cannot be serialized
/// an `error` record with a fixed body is returned instead.
#[must_use]
pub fn frame_payload<T: Serialize + ?Sized>(
    event_type: &str,
    thread_id: &str,
    finish_reason: &str,
    payload: &T,
) -> FramedRecord {
    match serde_json::to_string(payload) {
        Ok(json) => FramedRecord {
            event_type: event_type.to_owned(),
            thread_id: thread_id.to_owned(),
            finish_reason: finish_reason.to_owned(),
            text: encode_record(event_type, &json),
        },
        Err(err) => {
            error!(%err, event_type, thread_id, "error serializing event data");
            let body = serde_json::json!({ "error": SERIALIZATION_FAILED });
            FramedRecord {
                event_type: "error".into(),
                thread_id: thread_id.to_owned(),
                finish_reason: String::new(),
                text: encode_record("error", &body.to_string()),
            }
        }
    }
}
