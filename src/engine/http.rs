//! Engine adapter for a remote workflow runner speaking NDJSON over HTTP.
//!
//! The runner receives `{input, config, checkpoint}` and answers with one
//! JSON object per line. `event` lines carry an [`EngineItem`]; `checkpoint`
//! lines carry the thread's new state, which is written through the bound
//! saver and never reaches the orchestrator.

use std::sync::Arc;

use futures_util::{Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use super::{EngineStream, WorkflowEngine};
use crate::checkpoint::{CheckpointRecord, CheckpointSaver};
use crate::models::event::EngineItem;
use crate::models::workflow::{WorkflowConfig, WorkflowInput};
use crate::{AppError, Result};

/// Upper bound on a single NDJSON line.
const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Serialize)]
struct RunRequest<'a> {
    input: &'a WorkflowInput,
    config: &'a WorkflowConfig,
    checkpoint: Option<CheckpointRecord>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RunnerLine {
    Event(EngineItem),
    Checkpoint { data: serde_json::Value },
}

/// Workflow engine served by a remote runner.
#[derive(Clone)]
pub struct HttpWorkflowEngine {
    client: reqwest::Client,
    url: String,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
}

impl HttpWorkflowEngine {
    /// Engine posting runs to `url`.
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            checkpointer: None,
        }
    }
}

impl WorkflowEngine for HttpWorkflowEngine {
    fn with_checkpointer(&self, checkpointer: Arc<dyn CheckpointSaver>) -> Arc<dyn WorkflowEngine> {
        Arc::new(Self {
            client: self.client.clone(),
            url: self.url.clone(),
            checkpointer: Some(checkpointer),
        })
    }

    fn stream(&self, input: WorkflowInput, config: WorkflowConfig) -> EngineStream {
        Box::pin(run(self.clone(), input, config))
    }
}

fn run(
    engine: HttpWorkflowEngine,
    input: WorkflowInput,
    config: WorkflowConfig,
) -> impl Stream<Item = Result<EngineItem>> + Send {
    async_stream::try_stream! {
        let thread_id = config.thread_id.clone();

        let checkpoint = match &engine.checkpointer {
            Some(saver) => saver.get(&thread_id).await?,
            None => None,
        };
        debug!(thread_id = %thread_id, restored = checkpoint.is_some(), "posting run to workflow runner");

        let response = engine
            .client
            .post(&engine.url)
            .json(&RunRequest { input: &input, config: &config, checkpoint })
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut lines = FramedRead::new(
            StreamReader::new(body),
            LinesCodec::new_with_max_length(MAX_LINE_BYTES),
        );

        while let Some(line) = lines.next().await {
            let line = line.map_err(|err| AppError::Engine(format!("runner stream: {err}")))?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<RunnerLine>(&line)
                .map_err(|err| AppError::Engine(format!("malformed runner line: {err}")))?;
            match parsed {
                RunnerLine::Event(item) => yield item,
                RunnerLine::Checkpoint { data } => match &engine.checkpointer {
                    Some(saver) => saver.put(&thread_id, CheckpointRecord(data)).await?,
                    None => warn!(thread_id = %thread_id, "runner sent a checkpoint but no saver is bound"),
                },
            }
        }

        info!(thread_id = %thread_id, "workflow runner stream finished");
    }
}
