//! Audit trail persistence
//!
//! The audit artifact is a pretty-printed JSON array of [`AuditEntry`],
//! written in one piece after the batch is complete and before anything is
//! uploaded.

use crate::error::{Result, SyncError};
use capi_common::types::AuditEntry;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for the finished audit trail
pub trait AuditSink: Send + Sync {
    /// Persist the full trail. Called exactly once per run, even when empty.
    fn write(&self, entries: &[AuditEntry]) -> Result<()>;

    /// Where the trail ends up, for log messages
    fn describe(&self) -> String;
}

/// Writes the trail to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileAuditSink {
    path: PathBuf,
}

impl JsonFileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonFileAuditSink {
    fn write(&self, entries: &[AuditEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::audit(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(|e| {
            SyncError::audit(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        info!(path = %self.path.display(), entries = entries.len(), "Audit log written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
