//! Source export download and payload validation

use crate::config::SourceLocation;
use crate::error::{Result, SyncError};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Marker that identifies an HTML page served instead of the export.
const HTML_MARKER: &str = "<html";

/// Fetches the CSV export
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    /// Create a fetcher whose requests give up after `timeout_secs`
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    /// Load the export from a URL or a local file
    pub async fn load(&self, location: &SourceLocation) -> Result<String> {
        match location {
            SourceLocation::Url(url) => self.fetch(url).await,
            SourceLocation::File(path) => {
                info!(path = %path.display(), "Reading local CSV export");
                Ok(tokio::fs::read_to_string(path).await?)
            },
        }
    }

    /// Download the export body as text
    pub async fn fetch(&self, url: &str) -> Result<String> {
        info!(url = %url, "Downloading CSV export");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::download(format!("{} returned {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::download(e.to_string()))?;

        debug!(bytes = body.len(), "Download complete");
        Ok(body)
    }
}

/// Reject payloads that are an HTML page rather than delimited text
///
/// Share links that have expired or lost their permissions answer with a
/// login or error page and a 200 status.
pub fn ensure_tabular(payload: &str) -> Result<()> {
    if payload.to_ascii_lowercase().contains(HTML_MARKER) {
        return Err(SyncError::invalid_payload(
            "the source returned an HTML page instead of CSV",
        ));
    }
    Ok(())
}
