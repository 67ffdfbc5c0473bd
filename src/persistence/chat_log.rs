//! Append-only side log of every framed record, keyed by thread.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{AppError, BoxFuture, Result};

use super::db::Database;

/// One recorded wire record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLogEntry {
    /// Thread the record belongs to.
    pub thread_id: String,
    /// Position within the thread, starting at 1.
    pub seq: i64,
    /// Framed record text, exactly as sent (or prepared) for the wire.
    pub record: String,
    /// Finish reason tag; empty when the event had none.
    pub finish_reason: String,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

/// Consumer of the framed record stream that persists it per thread.
pub trait ChatLogSink: Send + Sync {
    /// Append one record to the thread's log.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    fn append<'a>(
        &'a self,
        thread_id: &'a str,
        record: &'a str,
        finish_reason: &'a str,
    ) -> BoxFuture<'a, Result<()>>;

    /// All records of a thread in append order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the read fails.
    fn list<'a>(&'a self, thread_id: &'a str) -> BoxFuture<'a, Result<Vec<ChatLogEntry>>>;

    /// Delete every thread whose newest record is older than `cutoff`,
    /// returning how many records were removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    fn purge_inactive(&self, cutoff: DateTime<Utc>) -> BoxFuture<'_, Result<u64>>;
}

/// Process-local log, used when no log file is configured.
#[derive(Debug, Default)]
pub struct MemoryChatLog {
    threads: RwLock<HashMap<String, Vec<ChatLogEntry>>>,
}

impl MemoryChatLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatLogSink for MemoryChatLog {
    fn append<'a>(
        &'a self,
        thread_id: &'a str,
        record: &'a str,
        finish_reason: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
            let entries = threads.entry(thread_id.to_owned()).or_default();
            let seq = i64::try_from(entries.len()).unwrap_or(i64::MAX) + 1;
            entries.push(ChatLogEntry {
                thread_id: thread_id.to_owned(),
                seq,
                record: record.to_owned(),
                finish_reason: finish_reason.to_owned(),
                created_at: Utc::now(),
            });
            Ok(())
        })
    }

    fn list<'a>(&'a self, thread_id: &'a str) -> BoxFuture<'a, Result<Vec<ChatLogEntry>>> {
        Box::pin(async move {
            Ok(self
                .threads
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(thread_id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn purge_inactive(&self, cutoff: DateTime<Utc>) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
            let mut removed = 0_u64;
            threads.retain(|_, entries| {
                let active = entries.last().is_some_and(|e| e.created_at >= cutoff);
                if !active {
                    removed += u64::try_from(entries.len()).unwrap_or(u64::MAX);
                }
                active
            });
            Ok(removed)
        })
    }
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ChatLogRow {
    thread_id: String,
    seq: i64,
    record: String,
    finish_reason: String,
    created_at: String,
}

impl ChatLogRow {
    fn into_entry(self) -> Result<ChatLogEntry> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| AppError::Db(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);
        Ok(ChatLogEntry {
            thread_id: self.thread_id,
            seq: self.seq,
            record: self.record,
            finish_reason: self.finish_reason,
            created_at,
        })
    }
}

/// Repository wrapper around `SQLite` for the chat stream log.
#[derive(Clone)]
pub struct ChatLogRepo {
    db: Arc<Database>,
}

impl ChatLogRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Delete every record of a thread, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_thread(&self, thread_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chat_stream_log WHERE thread_id = ?1")
            .bind(thread_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }
}

impl ChatLogSink for ChatLogRepo {
    fn append<'a>(
        &'a self,
        thread_id: &'a str,
        record: &'a str,
        finish_reason: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            let created_at = timestamp(Utc::now());

            sqlx::query(
                "INSERT INTO chat_stream_log (id, thread_id, seq, record, finish_reason, created_at)
                 SELECT ?1, ?2, COALESCE(MAX(seq), 0) + 1, ?3, ?4, ?5
                 FROM chat_stream_log WHERE thread_id = ?2",
            )
            .bind(&id)
            .bind(thread_id)
            .bind(record)
            .bind(finish_reason)
            .bind(&created_at)
            .execute(self.db.as_ref())
            .await?;
            Ok(())
        })
    }

    fn list<'a>(&'a self, thread_id: &'a str) -> BoxFuture<'a, Result<Vec<ChatLogEntry>>> {
        Box::pin(async move {
            let rows: Vec<ChatLogRow> = sqlx::query_as(
                "SELECT thread_id, seq, record, finish_reason, created_at
                 FROM chat_stream_log WHERE thread_id = ?1 ORDER BY seq ASC",
            )
            .bind(thread_id)
            .fetch_all(self.db.as_ref())
            .await?;
            rows.into_iter().map(ChatLogRow::into_entry).collect()
        })
    }

    fn purge_inactive(&self, cutoff: DateTime<Utc>) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let stale: Vec<String> = sqlx::query_scalar(
                "SELECT thread_id FROM chat_stream_log
                 GROUP BY thread_id HAVING MAX(created_at) < ?1",
            )
            .bind(timestamp(cutoff))
            .fetch_all(self.db.as_ref())
            .await?;

            let mut removed = 0;
            for thread_id in &stale {
                removed += self.purge_thread(thread_id).await?;
            }
            Ok(removed)
        })
    }
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
