//! Export pass and the phylum listing

use super::{ExportReport, Pipeline, Progress};
use crate::Result;
use crate::csv_sink::CsvGzipSink;
use crate::projection::RowKind;
use futures::TryStreamExt;
use std::collections::BTreeSet;

impl Pipeline {
    /// Write every cached entry into the family, phylum and sequence tables
    ///
    /// Entries are read in key order. A summary entry goes to each table whose
    /// coverage field it carries. Corrupt cache values and entries lacking the
    /// fields a row needs are counted and skipped.
    pub async fn export(&self) -> Result<ExportReport> {
        let mut sinks = Vec::with_capacity(RowKind::ALL.len());
        for kind in RowKind::ALL {
            sinks.push((kind, CsvGzipSink::create(self.config.output_file(kind)).await?));
        }

        let mut report = ExportReport::default();
        let mut progress = Progress::new("csv");
        let mut entries = self.cache.scan();

        while !self.limit_reached(progress.count()) {
            let Some(entry) = entries.try_next().await? else {
                break;
            };
            progress.tick();

            let Some(records) = entry.value.records() else {
                report.corrupt += 1;
                continue;
            };
            for record in records {
                for (kind, sink) in &sinks {
                    if !kind.matches(record) {
                        continue;
                    }
                    match kind.project(record, &self.phylum_names) {
                        Some(row) => sink.write(row).await?,
                        None => {
                            tracing::trace!(record_id = %entry.key, table = ?kind, "Incomplete entry");
                            report.skipped_rows += 1;
                        }
                    }
                }
            }
        }
        drop(entries);

        for (kind, sink) in sinks {
            let path = sink.path().to_path_buf();
            let stats = sink.end().await?;
            *report.rows_mut(kind) = stats.rows;
            tracing::info!(path = %path.display(), rows = stats.rows, "Wrote table");
        }

        report.scanned = progress.count();
        report.elapsed = progress.finish();
        tracing::info!(
            scanned = report.scanned,
            corrupt = report.corrupt,
            skipped_rows = report.skipped_rows,
            "Export complete"
        );
        Ok(report)
    }

    /// Sorted distinct phylum codes of cached entries carrying phylum coverage
    pub async fn list_phyla(&self) -> Result<BTreeSet<String>> {
        let mut phyla = BTreeSet::new();
        let mut progress = Progress::new("phy");
        let mut entries = self.cache.scan();

        while !self.limit_reached(progress.count()) {
            let Some(entry) = entries.try_next().await? else {
                break;
            };
            progress.tick();

            for record in entry.value.records().unwrap_or_default() {
                if !RowKind::Phylum.matches(record) {
                    continue;
                }
                if let Some(code) = record.get("phy") {
                    phyla.insert(code.to_string());
                }
            }
        }

        progress.finish();
        Ok(phyla)
    }
}
