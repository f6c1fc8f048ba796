//! Object store access: per-record summary fetches and the index download
//!
//! Per-record fetches never fail: every result is a [`FetchOutcome`], and only
//! [`FetchOutcome::Found`] carries data. Most candidate ids in an index do not
//! resolve, so a missing summary is logged at debug level only.

use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Placeholder substituted with the record id in summary path templates
pub const ID_PLACEHOLDER: &str = "$ID";

/// Result of fetching one summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTTP 200 with the decoded body
    Found(String),
    /// Any other HTTP status
    Missing {
        /// Status code returned by the object store
        status: u16,
    },
    /// Transport or body decoding failure
    Transient(String),
}

impl FetchOutcome {
    /// Body of a found summary
    pub fn into_body(self) -> Option<String> {
        match self {
            FetchOutcome::Found(body) => Some(body),
            _ => None,
        }
    }

    /// Whether the fetch produced data
    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }
}

/// Source of raw summaries keyed by record id
#[async_trait]
pub trait SummarySource: Send + Sync {
    /// Fetch the summary of `id`; exactly one request per call
    async fn fetch(&self, id: &str) -> FetchOutcome;
}

/// Substitute every `$ID` in `template` with `id`
pub fn summary_path(template: &str, id: &str) -> String {
    template.replace(ID_PLACEHOLDER, id)
}

/// Join an endpoint and an object key with a single `/`
pub fn object_url(endpoint: &str, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Summary source backed by plain HTTP GETs against an object store
#[derive(Clone, Debug)]
pub struct HttpSummarySource {
    client: reqwest::Client,
    endpoint: String,
    path_template: String,
}

impl HttpSummarySource {
    /// Create a source for `endpoint` using `path_template` (containing `$ID`)
    pub fn new(
        endpoint: impl Into<String>,
        path_template: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint, path_template))
    }

    /// Create a source sharing an existing HTTP client
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            path_template: path_template.into(),
        }
    }

    /// Full URL requested for `id`
    pub fn url_for(&self, id: &str) -> String {
        object_url(&self.endpoint, &summary_path(&self.path_template, id))
    }
}

#[async_trait]
impl SummarySource for HttpSummarySource {
    async fn fetch(&self, id: &str) -> FetchOutcome {
        let url = self.url_for(id);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(record_id = id, error = %e, "Summary request failed");
                return FetchOutcome::Transient(e.to_string());
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::trace!(record_id = id, status = status.as_u16(), "Summary not found");
            return FetchOutcome::Missing {
                status: status.as_u16(),
            };
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Found(body),
            Err(e) => {
                tracing::debug!(record_id = id, error = %e, "Failed to read summary body");
                FetchOutcome::Transient(e.to_string())
            }
        }
    }
}

/// Download `{endpoint}/{index_path}` to `dest`, streaming chunk by chunk
///
/// The body is written to a sibling `.part` file which is renamed over `dest`
/// only once complete, so an interrupted download is never mistaken for a
/// cached index. Returns the number of bytes written.
pub async fn download_index(
    client: &reqwest::Client,
    endpoint: &str,
    index_path: &str,
    dest: &Path,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let url = object_url(endpoint, index_path);
    let mut response = client.get(&url).send().await?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(Error::IndexUnavailable {
            path: index_path.to_string(),
            status: response.status().as_u16(),
        });
    }

    let mut partial = dest.as_os_str().to_owned();
    partial.push(".part");
    let partial = std::path::PathBuf::from(partial);

    let mut file = tokio::fs::File::create(&partial).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&partial, dest).await?;
    Ok(written)
}
