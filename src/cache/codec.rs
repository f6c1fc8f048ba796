//! Value compression.
//!
//! Values are the JSON array of a record's summary entries, gzip-compressed
//! at the best ratio: each value is written once and read on every export.

use crate::summary::SummaryRecord;
use crate::{Error, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

use super::CachedValue;

/// Payloads above this size are (de)compressed on the blocking pool
const INLINE_LIMIT: usize = 16 * 1024;

/// Serialize and compress summary entries
pub fn encode_value(records: &[SummaryRecord]) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(records)?;
    gzip(&json)
}

/// Decompress and deserialize a stored value
///
/// Never fails: anything that does not decode is reported as
/// [`CachedValue::Unparseable`].
pub fn decode_value(bytes: &[u8]) -> CachedValue {
    let mut json = Vec::new();
    if let Err(e) = GzDecoder::new(bytes).read_to_end(&mut json) {
        return CachedValue::Unparseable(format!("decompression failed: {}", e));
    }
    match serde_json::from_slice::<Vec<SummaryRecord>>(&json) {
        Ok(records) => CachedValue::Records(records),
        Err(e) => CachedValue::Unparseable(format!("invalid JSON: {}", e)),
    }
}

pub(super) async fn encode_value_async(records: &[SummaryRecord]) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(records)?;
    if json.len() <= INLINE_LIMIT {
        return gzip(&json);
    }
    tokio::task::spawn_blocking(move || gzip(&json)).await?
}

pub(super) async fn decode_value_async(bytes: Vec<u8>) -> CachedValue {
    if bytes.len() <= INLINE_LIMIT / 4 {
        return decode_value(&bytes);
    }
    match tokio::task::spawn_blocking(move || decode_value(&bytes)).await {
        Ok(value) => value,
        Err(e) => CachedValue::Unparseable(format!("decoder task failed: {}", e)),
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes).map_err(Error::Io)?;
    Ok(encoder.finish()?)
}
