//! Cache-fill pass

use super::{FillReport, Pipeline, Progress};
use crate::Result;
use crate::cache::Lookup;
use crate::index::IndexScan;
use crate::task_queue::TaskQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pending batches allowed before the scan waits for the queue to drain
///
/// Keeps the pending list bounded when the index is far larger than what
/// the fetchers can keep up with.
const SUBMIT_WINDOW_BATCHES: usize = 8;

/// Lookup outcomes counted by the fetch tasks
#[derive(Default)]
struct Tally {
    fetched: AtomicU64,
    cached: AtomicU64,
    absent: AtomicU64,
}

impl Tally {
    fn record(&self, lookup: &Lookup) {
        let counter = match lookup {
            Lookup::Hit => &self.cached,
            Lookup::Stored(_) => &self.fetched,
            Lookup::Absent(_) | Lookup::Empty => &self.absent,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Pipeline {
    /// Fetch every admitted index entry that is not cached yet
    ///
    /// Stops submitting after `limit` entries when a limit is configured and
    /// returns once every submitted task has settled. Missing summaries are
    /// counted, not stored, so the next fill pass tries them again.
    pub async fn fill_cache(&self) -> Result<FillReport> {
        let index = self.ensure_index().await?;
        let mut scan = IndexScan::open(&index).await?;

        let queue = TaskQueue::new(self.config.concurrency);
        let window = queue.limit().saturating_mul(SUBMIT_WINDOW_BATCHES);
        let tally = Arc::new(Tally::default());
        let mut progress = Progress::new("cache");

        tracing::info!(index = %index.display(), limit = ?self.config.limit, "Filling cache");

        while !self.limit_reached(progress.count()) {
            let Some(entry) = scan.next_entry().await? else {
                break;
            };
            progress.tick();

            let cache = self.cache.clone();
            let source = Arc::clone(&self.source);
            let tally = Arc::clone(&tally);
            queue.push(async move {
                let lookup = cache
                    .get_or_fetch(&entry.id, || source.fetch(&entry.id))
                    .await?;
                match &lookup {
                    Lookup::Absent(outcome) => {
                        tracing::debug!(record_id = %entry.id, outcome = ?outcome, "Summary not available");
                    }
                    Lookup::Empty => {
                        tracing::debug!(record_id = %entry.id, "Summary has no entries");
                    }
                    Lookup::Hit | Lookup::Stored(_) => {}
                }
                tally.record(&lookup);
                Ok(())
            });

            if queue.stats().pending >= window {
                queue.flush(true).await;
            }
        }
        queue.flush(true).await;

        let stats = queue.stats();
        let report = FillReport {
            scanned_lines: scan.scanned_lines(),
            submitted: progress.count(),
            fetched: tally.fetched.load(Ordering::Relaxed),
            cached: tally.cached.load(Ordering::Relaxed),
            absent: tally.absent.load(Ordering::Relaxed),
            failed: stats.failed,
            elapsed: progress.finish(),
        };

        tracing::info!(
            scanned_lines = report.scanned_lines,
            submitted = report.submitted,
            fetched = report.fetched,
            cached = report.cached,
            absent = report.absent,
            failed = report.failed,
            "Cache fill complete"
        );
        Ok(report)
    }
}
