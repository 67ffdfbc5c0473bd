//! The streaming pipeline: engine run -> translation -> framing -> fan-out.
//!
//! Each framed record goes to two independent consumers: the transport
//! (the returned stream) and the side log. A side-log failure is logged and
//! never interrupts the transport.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::checkpoint::{CheckpointConnector, CheckpointScope};
use crate::engine::WorkflowEngine;
use crate::models::event::ExecutionEvent;
use crate::models::request::ChatMessage;
use crate::models::wire::{
    ErrorEvent, EventHeader, GraphPosition, MessageChunkEvent, Role, WireEvent,
};
use crate::persistence::chat_log::ChatLogSink;

use super::framer::{frame, FramedRecord};
use super::session_manager::SessionPlan;
use super::thread_registry::ThreadRegistry;
use super::translator::translate;

/// Finish-reason tag recorded for echoed client messages.
pub const INITIAL_MESSAGE_TAG: &str = "none";

/// Error text sent when the checkpoint backend cannot be reached.
pub const CHECKPOINT_UNAVAILABLE: &str = "checkpoint backend unavailable";

/// Error text sent when the workflow engine fails mid-run.
pub const WORKFLOW_FAILED: &str = "workflow execution failed";

/// Framed records of one streaming call, in engine order.
pub type RecordStream = Pin<Box<dyn Stream<Item = FramedRecord> + Send>>;

/// Drives workflow runs and streams their framed events.
#[derive(Clone)]
pub struct ChatStreamer {
    engine: Arc<dyn WorkflowEngine>,
    connector: Arc<dyn CheckpointConnector>,
    chat_log: Arc<dyn ChatLogSink>,
    threads: Arc<ThreadRegistry>,
}

impl ChatStreamer {
    /// Assemble a streamer from its collaborators.
    #[must_use]
    pub fn new(
        engine: Arc<dyn WorkflowEngine>,
        connector: Arc<dyn CheckpointConnector>,
        chat_log: Arc<dyn ChatLogSink>,
        threads: Arc<ThreadRegistry>,
    ) -> Self {
        Self {
            engine,
            connector,
            chat_log,
            threads,
        }
    }

    /// Thread state registry shared by all streams.
    #[must_use]
    pub fn threads(&self) -> &Arc<ThreadRegistry> {
        &self.threads
    }

    /// Run `plan` and stream its records.
    ///
    /// The checkpoint connection is opened before the first engine event is
    /// requested and closed after the last one, on success and on failure.
    /// Dropping the returned stream (client disconnect) tears the run down
    /// and closes the connection in the background.
    #[must_use]
    pub fn stream(&self, plan: SessionPlan) -> RecordStream {
        let this = self.clone();
        Box::pin(async_stream::stream! {
            let SessionPlan { thread_id, input, config, messages } = plan;
            let resume = input.is_resume();

            record_initial_messages(this.chat_log.as_ref(), &thread_id, &messages).await;
            let (_, run) = this.threads.enter(&thread_id, resume);

            let scope = match CheckpointScope::acquire(this.connector.as_ref()).await {
                Ok(scope) => scope,
                Err(err) => {
                    error!(thread_id = %thread_id, %err, "checkpoint backend connection failed");
                    let record = frame(&error_event(&thread_id, CHECKPOINT_UNAVAILABLE));
                    append(this.chat_log.as_ref(), &record).await;
                    drop(run);
                    yield record;
                    return;
                }
            };
            info!(thread_id = %thread_id, resume, backend = ?scope.kind(), "workflow stream started");

            let engine = this.engine.with_checkpointer(scope.saver());
            let mut events = engine.stream(input, config);
            let mut emitted = 0_usize;

            while let Some(next) = events.next().await {
                let item = match next {
                    Ok(item) => item,
                    Err(err) => {
                        error!(thread_id = %thread_id, %err, emitted, "workflow engine failed");
                        let record = frame(&error_event(&thread_id, WORKFLOW_FAILED));
                        append(this.chat_log.as_ref(), &record).await;
                        yield record;
                        break;
                    }
                };

                if matches!(item.event, ExecutionEvent::Suspension(_)) {
                    run.suspend();
                }
                let record = frame(&translate(item, &thread_id));
                append(this.chat_log.as_ref(), &record).await;
                emitted += 1;
                yield record;
            }

            drop(events);
            drop(engine);
            scope.release().await;
            drop(run);
            info!(thread_id = %thread_id, emitted, "workflow stream finished");
        })
    }
}

fn error_event(thread_id: &str, message: &str) -> WireEvent {
    WireEvent::Error(ErrorEvent {
        thread_id: thread_id.to_owned(),
        error: message.to_owned(),
    })
}

async fn append(chat_log: &dyn ChatLogSink, record: &FramedRecord) {
    if let Err(err) = chat_log
        .append(&record.thread_id, &record.text, &record.finish_reason)
        .await
    {
        warn!(thread_id = %record.thread_id, %err, "failed to append chat stream log");
    }
}

/// Record the client's messages in the side log as `user` chunks.
async fn record_initial_messages(
    chat_log: &dyn ChatLogSink,
    thread_id: &str,
    messages: &[ChatMessage],
) {
    for message in messages.iter().filter(|m| m.has_content()) {
        let id = message
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let event = WireEvent::MessageChunk(MessageChunkEvent {
            header: EventHeader {
                thread_id: thread_id.to_owned(),
                agent: "user".into(),
                id: format!("run--{id}"),
                role: Role::User,
                position: GraphPosition::default(),
                content: message.content_text(),
                reasoning_content: None,
                finish_reason: None,
            },
        });
        let mut record = frame(&event);
        record.finish_reason = INITIAL_MESSAGE_TAG.into();
        append(chat_log, &record).await;
    }
}
