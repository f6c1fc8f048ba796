//! Streaming gzip CSV output
//!
//! Each [`CsvGzipSink`] owns one output file. Rows travel over a bounded
//! channel to a blocking writer task that serializes them with `csv`,
//! compresses with `flate2` and writes through a buffered file handle. When
//! the disk is slow the channel fills up and [`CsvGzipSink::write`] waits,
//! so memory use stays bounded by the channel capacity.

use crate::projection::OutputRow;
use crate::{Error, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Rows buffered between producers and the writer task
pub const ROW_CHANNEL_CAPACITY: usize = 1024;

/// Totals reported when a sink is closed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Data rows written (the header is not counted)
    pub rows: u64,
}

/// One gzip-compressed CSV output stream
pub struct CsvGzipSink {
    path: PathBuf,
    tx: mpsc::Sender<OutputRow>,
    worker: JoinHandle<Result<SinkStats>>,
}

impl CsvGzipSink {
    /// Create (or truncate) `path` and start its writer task
    ///
    /// Parent directories are created. Failing to open the file is an error
    /// here rather than on the first write.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(&path).await?.into_std().await;

        let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        let worker_path = path.clone();
        let worker = tokio::task::spawn_blocking(move || write_rows(file, &worker_path, rx));

        tracing::debug!(path = %path.display(), "Opened CSV output");
        Ok(Self { path, tx, worker })
    }

    /// Output file of this sink
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a row, waiting while the writer is behind
    ///
    /// The first row written decides the header. Every row must carry the
    /// same number of columns.
    pub async fn write(&self, row: OutputRow) -> Result<()> {
        self.tx.send(row).await.map_err(|_| Error::Sink {
            path: self.path.clone(),
            reason: "writer stopped; see the error returned by end()".into(),
        })
    }

    /// Signal end of input and wait until the file is fully written and synced
    pub async fn end(self) -> Result<SinkStats> {
        let Self { path, tx, worker } = self;
        drop(tx);

        let stats = worker.await??;
        tracing::debug!(path = %path.display(), rows = stats.rows, "Closed CSV output");
        Ok(stats)
    }
}

fn write_rows(file: File, path: &Path, mut rx: mpsc::Receiver<OutputRow>) -> Result<SinkStats> {
    let sink_error = |reason: String| Error::Sink {
        path: path.to_path_buf(),
        reason,
    };

    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(encoder);

    let mut stats = SinkStats::default();
    while let Some(row) = rx.blocking_recv() {
        if stats.rows == 0 {
            writer
                .write_record(row.columns())
                .map_err(|e| sink_error(e.to_string()))?;
        }
        writer
            .write_record(row.values())
            .map_err(|e| sink_error(e.to_string()))?;
        stats.rows += 1;
    }

    let encoder = writer
        .into_inner()
        .map_err(|e| sink_error(e.to_string()))?;
    let mut buffered = encoder.finish()?;
    buffered.flush()?;
    let file = buffered
        .into_inner()
        .map_err(|e| sink_error(e.to_string()))?;
    file.sync_all()?;

    Ok(stats)
}
