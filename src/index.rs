//! Index file scanning
//!
//! An index is a line-oriented listing of summary objects. Lines of interest
//! end in `<size> [<prefix>/]<record-id>.psummary`; everything else is
//! ignored, including lines that are not valid UTF-8. Summaries of 140
//! bytes or less are truncated uploads and are skipped as well.

use crate::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;

/// Summaries at or below this size are treated as invalid
pub const MIN_SUMMARY_BYTES: u64 = 140;

#[allow(clippy::expect_used)]
static INDEX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(?:\S*/)?([^/\s]+)\.psummary$").expect("index line pattern is valid")
});

/// One admitted index line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Size of the summary object in bytes
    pub size: u64,
    /// Record id, used as cache key and `$ID` substitution
    pub id: String,
}

/// Parse one index line, returning `None` for lines that are not admitted
pub fn parse_index_line(line: &str) -> Option<IndexEntry> {
    let captures = INDEX_LINE.captures(line.trim_end())?;
    let size: u64 = captures.get(1)?.as_str().parse().ok()?;
    if size <= MIN_SUMMARY_BYTES {
        return None;
    }
    Some(IndexEntry {
        size,
        id: captures.get(2)?.as_str().to_string(),
    })
}

/// Streaming reader over an index file
///
/// Reads one line at a time; the file is never loaded whole. Lines are
/// decoded lossily so a garbled line is skipped like any other non-matching
/// line.
pub struct IndexScan {
    lines: SplitStream<BufReader<File>>,
    scanned: u64,
    admitted: u64,
}

impl IndexScan {
    /// Open the index at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        Ok(Self {
            lines: SplitStream::new(BufReader::new(file).split(b'\n')),
            scanned: 0,
            admitted: 0,
        })
    }

    /// Next admitted entry, or `None` at end of file
    pub async fn next_entry(&mut self) -> Result<Option<IndexEntry>> {
        while let Some(line) = self.lines.next().await {
            let line = line?;
            self.scanned += 1;
            if let Some(entry) = parse_index_line(&String::from_utf8_lossy(&line)) {
                self.admitted += 1;
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Lines read so far
    pub fn scanned_lines(&self) -> u64 {
        self.scanned
    }

    /// Entries admitted so far
    pub fn admitted(&self) -> u64 {
        self.admitted
    }
}
