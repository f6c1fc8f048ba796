//! Configuration types for psummary-etl

use crate::projection::{PhylumNames, RowKind};
use crate::task_queue::DEFAULT_CONCURRENCY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public endpoint hosting the index and summary objects
pub const DEFAULT_ENDPOINT: &str = "https://lovelywater2.s3.amazonaws.com";

/// Subdirectory of the data directory holding downloaded index files
pub const INDEX_DIR: &str = "cache";

/// Subdirectory of the data directory holding the CSV outputs
pub const OUTPUT_DIR: &str = "out";

/// Output table file names (without the `.csv.gz` suffix)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    /// Family table (default: "family")
    #[serde(default = "default_family_table")]
    pub family: String,

    /// Phylum table (default: "phylum")
    #[serde(default = "default_phylum_table")]
    pub phylum: String,

    /// Sequence table (default: "sequence")
    #[serde(default = "default_sequence_table")]
    pub sequence: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            family: default_family_table(),
            phylum: default_phylum_table(),
            sequence: default_sequence_table(),
        }
    }
}

impl TableNames {
    /// Table names sharing a prefix, e.g. `d` gives `dfamily`, `dphylum`, `dsequence`
    pub fn prefixed(prefix: &str) -> Self {
        Self {
            family: format!("{}{}", prefix, default_family_table()),
            phylum: format!("{}{}", prefix, default_phylum_table()),
            sequence: format!("{}{}", prefix, default_sequence_table()),
        }
    }

    /// Table name for a row kind
    pub fn name(&self, kind: RowKind) -> &str {
        match kind {
            RowKind::Family => &self.family,
            RowKind::Phylum => &self.phylum,
            RowKind::Sequence => &self.sequence,
        }
    }
}

/// One index source: where its index and summaries live and where rows go
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Object store key of the index file
    pub index_path: String,

    /// Object store key template of a summary; `$ID` is replaced by the record id
    pub summary_path: String,

    /// Output table names
    #[serde(default)]
    pub tables: TableNames,
}

impl SourceConfig {
    /// Source with default table names
    pub fn new(index_path: impl Into<String>, summary_path: impl Into<String>) -> Self {
        Self {
            index_path: index_path.into(),
            summary_path: summary_path.into(),
            tables: TableNames::default(),
        }
    }

    /// Dark RdRp index: `dindex.tsv`, `dsummary/$ID.psummary`, `d*` tables
    pub fn dindex() -> Self {
        Self {
            index_path: "dindex.tsv".into(),
            summary_path: "dsummary/$ID.psummary".into(),
            tables: TableNames::prefixed("d"),
        }
    }

    /// RdRp index: `rindex.tsv`, `rsummary/$ID.psummary`, `r*` tables
    pub fn rindex() -> Self {
        Self {
            index_path: "rindex.tsv".into(),
            summary_path: "rsummary/$ID.psummary".into(),
            tables: TableNames::prefixed("r"),
        }
    }
}

/// How phylum codes are rendered in output rows
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhylumNaming {
    /// Keep the raw code
    #[default]
    Code,
    /// Use the built-in code to name table
    Builtin,
    /// Load a JSON `{code: name}` dictionary from this file
    Dictionary(PathBuf),
}

/// Main configuration for a pipeline run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the index copy, the dedup cache and the outputs
    pub data_dir: PathBuf,

    /// Object store endpoint (default: the public Serratus bucket)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Maximum concurrent summary fetches (default: 128)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Stop after this many records per pass (None = all)
    #[serde(default)]
    pub limit: Option<u64>,

    /// Phylum name rendering
    #[serde(default)]
    pub phylum_names: PhylumNaming,

    /// Timeout for a single HTTP request (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// The index source to process
    pub source: SourceConfig,
}

impl Config {
    /// Configuration with defaults for everything but the data directory and source
    pub fn new(data_dir: impl Into<PathBuf>, source: SourceConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            endpoint: default_endpoint(),
            concurrency: default_concurrency(),
            limit: None,
            phylum_names: PhylumNaming::default(),
            request_timeout: default_request_timeout(),
            source,
        }
    }

    /// Load a configuration from a JSON file
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::Config {
                message: format!("cannot read config file {}: {}", path.display(), e),
                key: None,
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Config {
            message: format!("invalid config file {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Check the configuration before any I/O happens
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::config("data_dir", "a data directory is required"));
        }
        if self.source.index_path.trim().is_empty() {
            return Err(Error::config("index_path", "an index path is required"));
        }
        if self.source.summary_path.trim().is_empty() {
            return Err(Error::config("summary_path", "a summary path is required"));
        }
        if !self
            .source
            .summary_path
            .contains(crate::fetcher::ID_PLACEHOLDER)
        {
            return Err(Error::config(
                "summary_path",
                format!(
                    "summary path '{}' must contain {}",
                    self.source.summary_path,
                    crate::fetcher::ID_PLACEHOLDER
                ),
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::config("concurrency", "concurrency must be at least 1"));
        }
        if let Err(e) = url::Url::parse(&self.endpoint) {
            return Err(Error::config(
                "endpoint",
                format!("invalid endpoint '{}': {}", self.endpoint, e),
            ));
        }
        if let PhylumNaming::Dictionary(path) = &self.phylum_names
            && !path.is_file()
        {
            return Err(Error::config(
                "phylum_names",
                format!("phylum name dictionary {} is not accessible", path.display()),
            ));
        }
        Ok(())
    }

    /// Local copy of the index
    pub fn index_file(&self) -> PathBuf {
        self.data_dir.join(INDEX_DIR).join(&self.source.index_path)
    }

    /// Output file for a row kind
    pub fn output_file(&self, kind: RowKind) -> PathBuf {
        self.data_dir
            .join(OUTPUT_DIR)
            .join(format!("{}.csv.gz", self.source.tables.name(kind)))
    }

    /// Resolve the phylum naming into a lookup
    pub async fn load_phylum_names(&self) -> Result<PhylumNames> {
        match &self.phylum_names {
            PhylumNaming::Code => Ok(PhylumNames::Code),
            PhylumNaming::Builtin => Ok(PhylumNames::builtin()),
            PhylumNaming::Dictionary(path) => PhylumNames::from_json_file(path).await,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_family_table() -> String {
    "family".into()
}

fn default_phylum_table() -> String {
    "phylum".into()
}

fn default_sequence_table() -> String {
    "sequence".into()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
