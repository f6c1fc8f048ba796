//! Common test utilities for psummary-etl integration tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use psummary_etl::{Config, PhylumNaming, SourceConfig};
use tempfile::TempDir;
use wiremock::MockServer;

/// rindex config with full phylum names pointing at `server`, rooted in a fresh temp dir (kept alive by the caller)
#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> (Config, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::new(temp_dir.path(), SourceConfig::rindex());
    config.endpoint = server.uri();
    config.concurrency = 8;
    config.phylum_names = PhylumNaming::Builtin;
    (config, temp_dir)
}

/// Decompress a gzip table and return its lines
#[allow(dead_code)]
pub fn read_table(path: &std::path::Path) -> Vec<String> {
    use std::io::Read;

    let mut body = String::new();
    flate2::read::GzDecoder::new(std::fs::File::open(path).unwrap())
        .read_to_string(&mut body)
        .unwrap();
    body.lines().map(str::to_string).collect()
}
