//! Lookups, get-or-fetch, writes and the ordered scan.

use crate::error::DatabaseError;
use crate::fetcher::FetchOutcome;
use crate::summary::{SummaryRecord, parse_summary};
use crate::{Error, Result};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use std::future::Future;

use super::codec::{decode_value_async, encode_value_async};
use super::{CachedValue, Lookup, ScanEntry, SummaryCache};

impl SummaryCache {
    /// Whether `key` has been resolved
    pub async fn has(&self, key: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to look up cache entry: {}",
                    e
                )))
            })?;

        Ok(found.is_some())
    }

    /// Decoded value stored under `key`
    pub async fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        let value: Option<Vec<u8>> = sqlx::query_scalar("SELECT value FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to read cache entry: {}",
                    e
                )))
            })?;

        match value {
            Some(bytes) => Ok(Some(decode_value_async(bytes).await)),
            None => Ok(None),
        }
    }

    /// Store `records` under `key`
    ///
    /// An existing value is kept: the first writer of a key wins and later
    /// writes of the same key are no-ops. Returns whether a row was inserted.
    pub async fn put(&self, key: &str, records: &[SummaryRecord]) -> Result<bool> {
        let value = encode_value_async(records).await?;
        self.put_raw(key, &value).await
    }

    /// Store an already encoded value under `key` (first writer wins)
    pub async fn put_raw(&self, key: &str, value: &[u8]) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO entries (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write cache entry: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Return the cached state of `key`, fetching and storing it on a miss
    ///
    /// A hit never calls `fetch`. On a miss, a [`FetchOutcome::Found`] body is
    /// parsed and stored when it holds at least one entry; an empty body or
    /// any other outcome leaves the key missing so it is retried by a later
    /// run.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Lookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        if self.has(key).await? {
            return Ok(Lookup::Hit);
        }

        match fetch().await {
            FetchOutcome::Found(body) => {
                let records = parse_summary(&body);
                if records.is_empty() {
                    return Ok(Lookup::Empty);
                }
                if !self.put(key, &records).await? {
                    tracing::debug!(record_id = key, "Entry written concurrently, kept first value");
                }
                Ok(Lookup::Stored(records))
            }
            absent => Ok(Lookup::Absent(absent)),
        }
    }

    /// Number of resolved keys
    pub async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count cache entries: {}",
                    e
                )))
            })?;

        Ok(count as u64)
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Stream every entry in key order
    ///
    /// Values are decoded as they are read; a corrupt value is yielded as
    /// [`CachedValue::Unparseable`] instead of ending the stream. Only store
    /// errors are yielded as `Err`.
    pub fn scan(&self) -> BoxStream<'_, Result<ScanEntry>> {
        sqlx::query_as::<_, (String, Vec<u8>)>("SELECT key, value FROM entries ORDER BY key")
            .fetch(&self.pool)
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to scan cache: {}",
                    e
                )))
            })
            .and_then(|(key, bytes)| async move {
                let value = decode_value_async(bytes).await;
                if let CachedValue::Unparseable(reason) = &value {
                    tracing::warn!(record_id = %key, reason = %reason, "Skipping unparseable cache entry");
                }
                Ok(ScanEntry { key, value })
            })
            .boxed()
    }
}
