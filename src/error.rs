//! Error types for psummary-etl
//!
//! Fetch absence and corrupt cache values are not errors and never appear
//! here: they are modelled by [`FetchOutcome`](crate::fetcher::FetchOutcome)
//! and [`CachedValue`](crate::cache::CachedValue). Everything in this module
//! is fatal for the pass that produced it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for psummary-etl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for psummary-etl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "data_dir")
        key: Option<String>,
    },

    /// Dedup cache operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside of per-record fetches (index download)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The index file could not be obtained from the object store
    #[error("index {path} unavailable: HTTP {status}")]
    IndexUnavailable {
        /// Object store key of the index
        path: String,
        /// Status code returned by the object store
        status: u16,
    },

    /// A CSV output stream failed
    #[error("output {} failed: {reason}", path.display())]
    Sink {
        /// Output file of the failing stream
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A background task panicked or was aborted
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Dedup cache errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open the store
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}
