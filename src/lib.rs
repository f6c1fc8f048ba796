//! # psummary-etl
//!
//! Fetches per-run alignment summaries listed in a remote index into a local
//! dedup cache, then exports the cached summaries as gzip-compressed CSV
//! tables (family, phylum and sequence coverage).
//!
//! ## Passes
//!
//! - **Cache fill** - stream the index, fetch every summary not cached yet
//!   through a bounded task queue and store it. Missing summaries are not
//!   recorded, so a later run retries them.
//! - **Export** - scan the cache in key order and write one row per matching
//!   summary entry into each table.
//!
//! ## Quick Start
//!
//! ```no_run
//! use psummary_etl::{Config, Pipeline, SourceConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("data", SourceConfig::rindex());
//!     let pipeline = Pipeline::new(config).await?;
//!
//!     let filled = pipeline.fill_cache().await?;
//!     println!("fetched {} summaries", filled.fetched);
//!
//!     let exported = pipeline.export().await?;
//!     println!("{} corrupt cache entries skipped", exported.corrupt);
//!
//!     pipeline.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Persistent dedup cache
pub mod cache;
/// Configuration types
pub mod config;
/// Gzip CSV output streams
pub mod csv_sink;
/// Error types
pub mod error;
/// Summary fetching from the object store
pub mod fetcher;
/// Index file scanning
pub mod index;
/// Fill and export passes
pub mod pipeline;
/// Summary entry to output row projection
pub mod projection;
/// Summary document parsing
pub mod summary;
/// Bounded task queue
pub mod task_queue;

// Re-export commonly used types
pub use cache::{CachedValue, Lookup, SummaryCache};
pub use config::{Config, PhylumNaming, SourceConfig, TableNames};
pub use csv_sink::CsvGzipSink;
pub use error::{DatabaseError, Error, Result};
pub use fetcher::{FetchOutcome, HttpSummarySource, SummarySource};
pub use index::{IndexEntry, IndexScan};
pub use pipeline::{ExportReport, FillReport, Pipeline};
pub use projection::{OutputRow, PhylumNames, RowKind};
pub use summary::{SummaryRecord, parse_summary};
pub use task_queue::{QueueStats, TaskQueue};
