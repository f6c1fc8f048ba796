//! Store lifecycle and schema.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::{SummaryCache, store_path};

/// How long a writer waits on a locked store before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

impl SummaryCache {
    /// Open (creating if needed) the store at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create cache directory: {}",
                    e
                )))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse cache path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to open cache: {}",
                e
            )))
        })?;

        let cache = Self { pool };
        cache.create_schema().await?;

        Ok(cache)
    }

    /// Open the store belonging to `index_path` inside `data_dir`
    pub async fn open_for_index(data_dir: &Path, index_path: &str) -> Result<Self> {
        let path = store_path(data_dir, index_path);
        tracing::debug!(index_path, store = %path.display(), "Opening summary cache");
        Self::open(&path).await
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL
            ) WITHOUT ROWID
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create entries table: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Close the store, waiting for pending writes
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
