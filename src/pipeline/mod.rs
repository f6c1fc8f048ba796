//! Index-scan-and-fan-out driver
//!
//! [`Pipeline`] ties one index source to its dedup cache and output tables.
//! Its passes are organized by concern:
//! - [`fill`] - stream the index through the task queue into the cache
//! - [`export`] - stream the cache into the gzip CSV tables, and list phyla
//! - [`progress`] - the per-pass progress counter
//!
//! Passes are independent: a fill pass can run without an export and vice
//! versa, and both can be repeated. A fill pass only fetches ids that are not
//! cached yet.

mod export;
mod fill;
mod progress;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use progress::{PROGRESS_INTERVAL, Progress};

use crate::Result;
use crate::cache::SummaryCache;
use crate::config::Config;
use crate::fetcher::{HttpSummarySource, SummarySource, download_index};
use crate::projection::{PhylumNames, RowKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a cache-fill pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Index lines read
    pub scanned_lines: u64,
    /// Entries handed to the task queue
    pub submitted: u64,
    /// Entries fetched and stored by this pass
    pub fetched: u64,
    /// Entries already in the cache
    pub cached: u64,
    /// Entries whose summary was missing, empty or could not be fetched
    pub absent: u64,
    /// Tasks that failed on a cache error
    pub failed: u64,
    /// Wall time of the pass
    pub elapsed: Duration,
}

/// Outcome of an export pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Cache entries read
    pub scanned: u64,
    /// Cache entries whose value could not be decoded
    pub corrupt: u64,
    /// Summary entries matched to a table but lacking fields for a row
    pub skipped_rows: u64,
    /// Rows written to the family table
    pub family_rows: u64,
    /// Rows written to the phylum table
    pub phylum_rows: u64,
    /// Rows written to the sequence table
    pub sequence_rows: u64,
    /// Wall time of the pass
    pub elapsed: Duration,
}

impl ExportReport {
    /// Rows written to the table of `kind`
    pub fn rows(&self, kind: RowKind) -> u64 {
        match kind {
            RowKind::Family => self.family_rows,
            RowKind::Phylum => self.phylum_rows,
            RowKind::Sequence => self.sequence_rows,
        }
    }

    fn rows_mut(&mut self, kind: RowKind) -> &mut u64 {
        match kind {
            RowKind::Family => &mut self.family_rows,
            RowKind::Phylum => &mut self.phylum_rows,
            RowKind::Sequence => &mut self.sequence_rows,
        }
    }
}

/// Driver for one index source (cloneable, all fields are shared)
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    cache: SummaryCache,
    source: Arc<dyn SummarySource>,
    /// Index download client (connect timeout only)
    client: reqwest::Client,
    phylum_names: Arc<PhylumNames>,
}

impl Pipeline {
    /// Validate `config`, open the cache and set up the HTTP summary source
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = HttpSummarySource::new(
            config.endpoint.clone(),
            config.source.summary_path.clone(),
            config.request_timeout,
        )?;
        Self::with_source(config, Arc::new(source)).await
    }

    /// Like [`Pipeline::new`] but fetching summaries from `source`
    pub async fn with_source(config: Config, source: Arc<dyn SummarySource>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        let phylum_names = config.load_phylum_names().await?;
        let cache = SummaryCache::open_for_index(&config.data_dir, &config.source.index_path).await?;

        let entries = cache.len().await?;
        tracing::info!(
            index = %config.source.index_path,
            entries,
            concurrency = config.concurrency,
            "Opened summary cache"
        );

        Ok(Self {
            config: Arc::new(config),
            cache,
            source,
            client,
            phylum_names: Arc::new(phylum_names),
        })
    }

    /// Configuration of this pipeline
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The dedup cache of this index source
    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Local path of the index, downloading it first when it is not there
    pub async fn ensure_index(&self) -> Result<PathBuf> {
        let path = self.config.index_file();
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(path = %path.display(), "Using local index");
            return Ok(path);
        }

        tracing::info!(
            index = %self.config.source.index_path,
            endpoint = %self.config.endpoint,
            "Downloading index"
        );
        let bytes = download_index(
            &self.client,
            &self.config.endpoint,
            &self.config.source.index_path,
            &path,
        )
        .await?;
        tracing::info!(path = %path.display(), bytes, "Index downloaded");

        Ok(path)
    }

    /// Close the cache; outstanding clones of this pipeline must not be used afterwards
    pub async fn close(self) {
        self.cache.close().await;
    }

    fn limit_reached(&self, count: u64) -> bool {
        self.config.limit.is_some_and(|limit| count >= limit)
    }
}
