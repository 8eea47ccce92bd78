//! Graph API request and response types

use capi_common::types::ConversionEvent;
use serde::{Deserialize, Serialize};

/// Body of `POST /{version}/{pixel_id}/events`
#[derive(Debug, Serialize)]
pub struct EventsRequest<'a> {
    pub data: &'a [ConversionEvent],
}

/// Successful response from the events endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub events_received: Option<u64>,

    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// Error envelope returned by the Graph API
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphError {
    pub message: String,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub code: Option<i64>,

    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// What the platform reported after accepting a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub status: u16,
    pub events_received: Option<u64>,
    pub fbtrace_id: Option<String>,
}
