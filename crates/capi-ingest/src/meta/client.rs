//! HTTP client for the Meta Conversions API

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::meta::types::{EventsRequest, EventsResponse, GraphErrorResponse, UploadReceipt};
use async_trait::async_trait;
use capi_common::types::ConversionEvent;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

/// Receives the finished event batch
#[async_trait]
pub trait EventUploader: Send + Sync {
    /// Send every event in one request. No retries, no chunking.
    async fn upload(&self, events: &[ConversionEvent]) -> Result<UploadReceipt>;
}

/// Graph API client bound to one pixel
pub struct MetaClient {
    client: Client,
    events_url: String,
    access_token: String,
}

impl MetaClient {
    /// Create a client for the pixel and credentials in `config`
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            events_url: config.events_url(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }
}

#[async_trait]
impl EventUploader for MetaClient {
    async fn upload(&self, events: &[ConversionEvent]) -> Result<UploadReceipt> {
        info!(events = events.len(), url = %self.events_url, "Sending events to Meta");

        let response = self
            .client
            .post(&self.events_url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&EventsRequest { data: events })
            .send()
            .await
            .map_err(|e| SyncError::upload(None, e.without_url().to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GraphErrorResponse>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("request failed with status {}", status));

            error!(status = status.as_u16(), message = %message, "Meta rejected the batch");
            return Err(SyncError::upload(Some(status.as_u16()), message));
        }

        let body: EventsResponse = response
            .json()
            .await
            .map_err(|e| SyncError::upload(Some(status.as_u16()), e.without_url().to_string()))?;

        info!(
            status = status.as_u16(),
            events_received = ?body.events_received,
            fbtrace_id = ?body.fbtrace_id,
            "Meta accepted the batch"
        );

        Ok(UploadReceipt {
            status: status.as_u16(),
            events_received: body.events_received,
            fbtrace_id: body.fbtrace_id,
        })
    }
}
