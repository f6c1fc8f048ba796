//! Summary documents and their parsed entries
//!
//! A summary is plain text: one entry per line, each entry a `;`-separated
//! list of `key=value` fields. Only the first `=` of a field separates key
//! from value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parsed summary entry: field name to raw string value
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryRecord(BTreeMap<String, String>);

impl SummaryRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, if present
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether `field` is present (an empty value still counts)
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Set `field`, replacing any previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, value)` pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SummaryRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = SummaryRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Parse a raw summary body into its entries
///
/// Empty lines and empty fields are dropped. Duplicate keys inside one entry
/// keep the last value. A field without `=` is kept with an empty value.
pub fn parse_summary(body: &str) -> Vec<SummaryRecord> {
    body.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(parse_entry)
        .filter(|record| !record.is_empty())
        .collect()
}

fn parse_entry(line: &str) -> SummaryRecord {
    line.split(';')
        .filter(|field| !field.is_empty())
        .map(|field| field.split_once('=').unwrap_or((field, "")))
        .collect()
}
