//! Dedup cache for fetched summaries
//!
//! A persistent ordered map from record id to the gzip-compressed JSON form of
//! that record's parsed summary entries, stored in SQLite.
//!
//! ## Submodules
//!
//! Methods on [`SummaryCache`] are organized by concern:
//! - [`migrations`] - store lifecycle and schema
//! - [`entries`] - lookups, get-or-fetch, writes and the ordered scan
//! - [`codec`] - value compression and decoding
//!
//! Presence of a key means the record has been resolved. A fetch that yields
//! nothing is never written, so unresolved ids are retried on the next run.

use crate::fetcher::FetchOutcome;
use crate::summary::SummaryRecord;
use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};

mod codec;
mod entries;
mod migrations;

pub use codec::{decode_value, encode_value};

/// Directory (under the data directory) holding one store per index source
pub const STORE_DIR: &str = "level";

/// Decoded form of one stored value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CachedValue {
    /// The summary entries stored for the key
    Records(Vec<SummaryRecord>),
    /// The value failed to decompress or deserialize
    Unparseable(String),
}

impl CachedValue {
    /// The entries, or `None` for an unparseable value
    pub fn records(&self) -> Option<&[SummaryRecord]> {
        match self {
            CachedValue::Records(records) => Some(records),
            CachedValue::Unparseable(_) => None,
        }
    }
}

/// Result of [`SummaryCache::get_or_fetch`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Key already present; nothing was fetched or written
    Hit,
    /// Key was missing, the fetch found data and it was stored
    Stored(Vec<SummaryRecord>),
    /// Key was missing and the fetch found nothing; nothing was stored
    Absent(FetchOutcome),
    /// Key was missing and the fetched body held no entries; nothing was stored
    Empty,
}

/// One item of [`SummaryCache::scan`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanEntry {
    /// Record id
    pub key: String,
    /// Decoded value
    pub value: CachedValue,
}

/// Store file for an index source: `<data_dir>/level/<md5(index_path)>.db`
///
/// Distinct index paths never share a store inside one data directory.
pub fn store_path(data_dir: &Path, index_path: &str) -> PathBuf {
    let digest = md5::compute(index_path.as_bytes());
    data_dir
        .join(STORE_DIR)
        .join(format!("{:x}.db", digest))
}

/// Handle to the dedup cache
///
/// Cloning shares the underlying connection pool, so one handle can be used
/// from every in-flight fetch task.
#[derive(Clone, Debug)]
pub struct SummaryCache {
    pool: SqlitePool,
}
