//! Error types for CAPI sync

use thiserror::Error;

/// Result type alias for CAPI operations
pub type Result<T> = std::result::Result<T, CapiError>;

/// Main error type shared by the workspace crates
#[derive(Error, Debug)]
pub enum CapiError {
    #[error("Parse error: {0}")]
    Parse(String),
}

impl CapiError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
