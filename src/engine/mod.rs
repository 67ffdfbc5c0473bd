//! Workflow engine boundary.
//!
//! The orchestrator consumes an engine through two capabilities only:
//! binding a checkpoint backend for one call, and running (fresh or resumed)
//! while yielding an ordered stream of [`EngineItem`]s.

pub mod http;

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use crate::checkpoint::CheckpointSaver;
use crate::models::event::EngineItem;
use crate::models::workflow::{WorkflowConfig, WorkflowInput};
use crate::Result;

pub use http::HttpWorkflowEngine;

/// Ordered event stream of one run. An `Err` item ends the run.
pub type EngineStream = Pin<Box<dyn Stream<Item = Result<EngineItem>> + Send>>;

/// An agent workflow that can be started, resumed, and checkpointed.
pub trait WorkflowEngine: Send + Sync {
    /// Return a handle that persists through `checkpointer`.
    ///
    /// The receiver is left untouched, so concurrent calls never share a
    /// backend connection.
    fn with_checkpointer(&self, checkpointer: Arc<dyn CheckpointSaver>) -> Arc<dyn WorkflowEngine>;

    /// Start or resume a run.
    fn stream(&self, input: WorkflowInput, config: WorkflowConfig) -> EngineStream;
}
