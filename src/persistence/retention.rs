//! Retention service for time-based purge of per-thread state.
//!
//! Runs as a background task that drops side-log threads with no record
//! newer than `retention_hours`, then forgets suspensions that waited that
//! long for a resume.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::chat_log::ChatLogSink;
use crate::orchestrator::thread_registry::ThreadRegistry;
use crate::Result;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// What one purge pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Side-log records deleted.
    pub records: u64,
    /// Suspended threads forgotten.
    pub suspensions: usize,
}

/// Spawn the retention purge background task.
///
/// The task runs hourly, starting immediately.
#[must_use]
pub fn spawn_retention_task(
    chat_log: Arc<dyn ChatLogSink>,
    threads: Arc<ThreadRegistry>,
    retention_hours: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(chat_log.as_ref(), &threads, retention_hours).await {
                        error!(%err, "retention purge failed");
                    }
                }
            }
        }
    })
}

/// Run one purge pass with a cutoff `retention_hours` in the past.
///
/// # Errors
///
/// Returns `AppError::Db` if the side-log delete fails; suspensions are
/// left untouched in that case.
pub async fn purge(
    chat_log: &dyn ChatLogSink,
    threads: &ThreadRegistry,
    retention_hours: u32,
) -> Result<PurgeReport> {
    let max_age = Duration::from_secs(u64::from(retention_hours) * 3600);
    let cutoff = Utc::now() - chrono::Duration::hours(i64::from(retention_hours));

    let records = chat_log.purge_inactive(cutoff).await?;
    let suspensions = threads.evict_suspended(max_age);

    info!(retention_hours, records, suspensions, "retention purge completed");
    Ok(PurgeReport {
        records,
        suspensions,
    })
}
