//! Shared helpers for pipeline tests.

mod fill;

use crate::config::{Config, SourceConfig};
use crate::fetcher::{FetchOutcome, SummarySource};
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// In-memory summary source; ids without a body are reported missing
#[derive(Default)]
pub(crate) struct MapSource {
    bodies: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MapSource {
    pub(crate) fn with(mut self, id: &str, body: &str) -> Self {
        self.bodies.insert(id.to_string(), body.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummarySource for MapSource {
    async fn fetch(&self, id: &str) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent tasks actually interleave
        tokio::task::yield_now().await;
        match self.bodies.get(id) {
            Some(body) => FetchOutcome::Found(body.clone()),
            None => FetchOutcome::Missing { status: 404 },
        }
    }
}

/// Config rooted in a fresh temp dir with `index` already in place
pub(crate) fn test_config(index: &str) -> (Config, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::new(temp_dir.path(), SourceConfig::new("index.tsv", "s/$ID.psummary"));
    config.concurrency = 4;

    let index_file = config.index_file();
    std::fs::create_dir_all(index_file.parent().unwrap()).unwrap();
    std::fs::write(&index_file, index).unwrap();

    (config, temp_dir)
}

/// Pipeline over `source` with the given index contents
pub(crate) async fn create_test_pipeline(
    index: &str,
    source: Arc<MapSource>,
) -> (Pipeline, TempDir) {
    let (config, temp_dir) = test_config(index);
    let pipeline = Pipeline::with_source(config, source).await.unwrap();
    (pipeline, temp_dir)
}
