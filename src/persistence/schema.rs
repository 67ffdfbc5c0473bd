//! `SQLite` schema bootstrap logic.
//!
//! All definitions use `IF NOT EXISTS`, so this is safe to re-run on every
//! server startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS chat_stream_log (
    id              TEXT PRIMARY KEY NOT NULL,
    thread_id       TEXT NOT NULL,
    seq             INTEGER NOT NULL,
    record          TEXT NOT NULL,
    finish_reason   TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    UNIQUE(thread_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_chat_stream_log_thread ON chat_stream_log(thread_id, seq);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
