//! Error types for CAPI sync runs
//!
//! Only run-level failures live here. Problems with a single row are
//! [`RejectReason`](crate::transform::RejectReason) values and never become a
//! [`SyncError`].

use capi_common::CapiError;
use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Run-aborting error
#[derive(Error, Debug)]
pub enum SyncError {
    /// Required settings are missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(String),

    /// The source URL returned something other than tabular text
    #[error("Invalid source payload: {0}. Verify that CSV_URL points at a CSV export.")]
    InvalidPayload(String),

    /// Downloading the source file failed
    #[error("Source download failed: {0}")]
    Download(String),

    /// The Graph API rejected the batch or could not be reached
    #[error("Upload to Meta failed{}: {message}", status_suffix(.status))]
    Upload {
        status: Option<u16>,
        message: String,
    },

    /// Writing the audit artifact failed
    #[error("Audit trail error: {0}")]
    Audit(String),

    /// File system operation failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a request failed outright
    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] CapiError),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (HTTP {})", code))
        .unwrap_or_default()
}

impl SyncError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Create a download error
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    /// Create an upload error
    pub fn upload(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upload {
            status,
            message: message.into(),
        }
    }

    /// Create an audit error
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit(msg.into())
    }

    /// Whether this error came from missing or invalid configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
