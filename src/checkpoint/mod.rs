//! Checkpoint store adapter.
//!
//! The workflow engine persists its resumable state through a
//! [`CheckpointSaver`]. The orchestrator never looks inside a
//! [`CheckpointRecord`]; it only selects the backend and brackets the
//! backend connection around one streaming call with a [`CheckpointScope`].

pub mod memory;
pub mod mongo;
pub mod postgres;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CheckpointConfig;
use crate::{AppError, Result};

pub use memory::{MemoryConnector, MemorySaver};
pub use mongo::MongoConnector;
pub use postgres::PostgresConnector;

pub use crate::BoxFuture;

/// Engine-owned checkpoint blob for one thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CheckpointRecord(pub serde_json::Value);

/// Concrete checkpoint backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Volatile in-process state.
    Memory,
    /// Relational backend over `postgresql://`.
    Postgres,
    /// Document-store backend over `mongodb://`.
    #[serde(rename = "mongodb")]
    MongoDb,
}

impl BackendKind {
    /// Select the backend from a connection string scheme.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for unrecognised schemes.
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgresql://") || url.starts_with("postgres://") {
            Ok(Self::Postgres)
        } else if url.starts_with("mongodb://") || url.starts_with("mongodb+srv://") {
            Ok(Self::MongoDb)
        } else {
            let scheme = url.split_once("://").map_or(url, |(scheme, _)| scheme);
            Err(AppError::Config(format!(
                "unsupported checkpoint backend scheme: {scheme}"
            )))
        }
    }
}

/// Live connection to a checkpoint backend.
pub trait CheckpointSaver: Send + Sync {
    /// Store the record for `thread_id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkpoint` if the backend write fails.
    fn put<'a>(
        &'a self,
        thread_id: &'a str,
        record: CheckpointRecord,
    ) -> BoxFuture<'a, Result<()>>;

    /// Load the record for `thread_id`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkpoint` if the backend read fails.
    fn get<'a>(&'a self, thread_id: &'a str) -> BoxFuture<'a, Result<Option<CheckpointRecord>>>;

    /// Release the underlying connection.
    fn close(&self) -> BoxFuture<'_, ()>;
}

/// Factory that opens a [`CheckpointSaver`] for one streaming call.
pub trait CheckpointConnector: Send + Sync {
    /// Backend family this connector opens.
    fn kind(&self) -> BackendKind;

    /// Open a connection, preparing backend tables or collections.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkpoint` if the backend is unreachable.
    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn CheckpointSaver>>>;
}

/// Build the connector selected by `config`.
///
/// `memory` is the process-local store used when persistence is off, so
/// suspended threads survive between requests until the process exits.
///
/// # Errors
///
/// Returns `AppError::Config` if persistence is enabled with an unknown scheme.
pub fn connector_for(
    config: &CheckpointConfig,
    memory: Arc<MemorySaver>,
) -> Result<Arc<dyn CheckpointConnector>> {
    let connector: Arc<dyn CheckpointConnector> = match config.backend()? {
        BackendKind::Memory => Arc::new(MemoryConnector::new(memory)),
        BackendKind::Postgres => Arc::new(PostgresConnector::new(config.url.clone())),
        BackendKind::MongoDb => Arc::new(MongoConnector::new(config.url.clone())),
    };
    Ok(connector)
}

/// A backend connection bracketing exactly one streaming call.
///
/// Call [`CheckpointScope::release`] once the last event has been produced
/// or the call failed. A scope dropped without release (client disconnect)
/// closes its connection on a background task.
pub struct CheckpointScope {
    saver: Arc<dyn CheckpointSaver>,
    kind: BackendKind,
    released: bool,
}

impl CheckpointScope {
    /// Open a connection through `connector`.
    ///
    /// # Errors
    ///
    /// Propagates the connector's error.
    pub async fn acquire(connector: &dyn CheckpointConnector) -> Result<Self> {
        let kind = connector.kind();
        let saver = connector.connect().await?;
        debug!(?kind, "checkpoint scope acquired");
        Ok(Self {
            saver,
            kind,
            released: false,
        })
    }

    /// Backend family of the open connection.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Handle to the open connection for the engine.
    #[must_use]
    pub fn saver(&self) -> Arc<dyn CheckpointSaver> {
        Arc::clone(&self.saver)
    }

    /// Close the connection.
    pub async fn release(mut self) {
        self.released = true;
        self.saver.close().await;
        debug!(kind = ?self.kind, "checkpoint scope released");
    }
}

impl Drop for CheckpointScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let saver = Arc::clone(&self.saver);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(kind = ?self.kind, "checkpoint scope dropped, closing in background");
                handle.spawn(async move { saver.close().await });
            }
            Err(_) => {
                warn!(kind = ?self.kind, "checkpoint scope dropped outside a runtime");
            }
        }
    }
}
