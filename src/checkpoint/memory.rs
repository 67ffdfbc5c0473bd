//! Volatile in-process checkpoint backend.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{BackendKind, BoxFuture, CheckpointConnector, CheckpointRecord, CheckpointSaver};
use crate::Result;

/// Process-local checkpoint map; lost on restart.
#[derive(Debug, Default)]
pub struct MemorySaver {
    records: RwLock<HashMap<String, CheckpointRecord>>,
}

impl MemorySaver {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with a stored record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no thread has a stored record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointSaver for MemorySaver {
    fn put<'a>(
        &'a self,
        thread_id: &'a str,
        record: CheckpointRecord,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.records
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(thread_id.to_owned(), record);
            Ok(())
        })
    }

    fn get<'a>(&'a self, thread_id: &'a str) -> BoxFuture<'a, Result<Option<CheckpointRecord>>> {
        Box::pin(async move {
            Ok(self
                .records
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(thread_id)
                .cloned())
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Connector handing out the shared process-local store.
pub struct MemoryConnector {
    store: Arc<MemorySaver>,
}

impl MemoryConnector {
    /// Wrap a shared store.
    #[must_use]
    pub fn new(store: Arc<MemorySaver>) -> Self {
        Self { store }
    }
}

impl CheckpointConnector for MemoryConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn CheckpointSaver>>> {
        let store: Arc<dyn CheckpointSaver> = Arc::clone(&self.store) as Arc<dyn CheckpointSaver>;
        Box::pin(async move { Ok(store) })
    }
}
