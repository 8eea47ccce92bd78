//! Configuration for a sync run
//!
//! Loaded once at startup from the environment (and `.env`), validated, and
//! passed explicitly into the runner. Nothing downstream reads the
//! environment.

use crate::error::{Result, SyncError};
use capi_common::types::EmailMatchMode;
use std::path::PathBuf;

// ============================================================================
// Configuration Keys
// ============================================================================

pub const PIXEL_ID_KEY: &str = "META_PIXEL_ID";
pub const ACCESS_TOKEN_KEY: &str = "META_ACCESS_TOKEN";
pub const CSV_URL_KEY: &str = "CSV_URL";
pub const INPUT_PATH_KEY: &str = "CAPI_INPUT_PATH";
pub const EMAIL_MODE_KEY: &str = "CAPI_EMAIL_MODE";
pub const AUDIT_PATH_KEY: &str = "CAPI_AUDIT_PATH";
pub const GRAPH_API_BASE_KEY: &str = "CAPI_GRAPH_API_BASE";
pub const GRAPH_API_VERSION_KEY: &str = "CAPI_GRAPH_API_VERSION";
pub const HTTP_TIMEOUT_KEY: &str = "CAPI_HTTP_TIMEOUT_SECS";

// ============================================================================
// Defaults
// ============================================================================

/// Default location of the audit artifact.
pub const DEFAULT_AUDIT_PATH: &str = "audit_log.json";

/// Default Graph API host.
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";

/// Default Graph API version.
pub const DEFAULT_GRAPH_API_VERSION: &str = "v19.0";

/// Default timeout for the download and upload requests in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Where the CSV export comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Downloaded over HTTP
    Url(String),
    /// Read from a local file
    File(PathBuf),
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocation::Url(url) => write!(f, "{}", url),
            SourceLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Sync run configuration
#[derive(Clone)]
pub struct SyncConfig {
    /// Meta pixel (dataset) id the events belong to
    pub pixel_id: String,

    /// Graph API access token
    pub access_token: String,

    /// CSV source
    pub source: SourceLocation,

    /// Email acceptance rule
    pub email_mode: EmailMatchMode,

    /// Where the audit JSON is written
    pub audit_path: PathBuf,

    pub graph_api_base: String,

    pub graph_api_version: String,

    pub http_timeout_secs: u64,

    /// Process and audit, but skip the upload
    pub dry_run: bool,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("pixel_id", &self.pixel_id)
            .field("access_token", &"<redacted>")
            .field("source", &self.source)
            .field("email_mode", &self.email_mode)
            .field("audit_path", &self.audit_path)
            .field("graph_api_base", &self.graph_api_base)
            .field("graph_api_version", &self.graph_api_version)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl SyncConfig {
    /// Load config from `.env` and environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through an arbitrary key lookup
    ///
    /// `META_PIXEL_ID`, `META_ACCESS_TOKEN` and `CSV_URL` are required;
    /// `CAPI_INPUT_PATH` stands in for `CSV_URL` when set. All missing keys
    /// are reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let pixel_id = get(PIXEL_ID_KEY);
        let access_token = get(ACCESS_TOKEN_KEY);
        let source = match get(INPUT_PATH_KEY) {
            Some(path) => Some(SourceLocation::File(PathBuf::from(path))),
            None => get(CSV_URL_KEY).map(SourceLocation::Url),
        };

        let mut missing = Vec::new();
        if pixel_id.is_none() {
            missing.push(PIXEL_ID_KEY);
        }
        if access_token.is_none() {
            missing.push(ACCESS_TOKEN_KEY);
        }
        if source.is_none() {
            missing.push(CSV_URL_KEY);
        }

        let (Some(pixel_id), Some(access_token), Some(source)) = (pixel_id, access_token, source)
        else {
            return Err(SyncError::config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        };

        let email_mode = match get(EMAIL_MODE_KEY) {
            Some(mode) => mode
                .parse::<EmailMatchMode>()
                .map_err(|e: capi_common::CapiError| SyncError::config(e.to_string()))?,
            None => EmailMatchMode::default(),
        };

        let http_timeout_secs = match get(HTTP_TIMEOUT_KEY) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                SyncError::config(format!("{} must be a whole number of seconds, got '{}'", HTTP_TIMEOUT_KEY, raw))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            pixel_id: pixel_id.trim().to_string(),
            access_token: access_token.trim().to_string(),
            source,
            email_mode,
            audit_path: get(AUDIT_PATH_KEY)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_PATH)),
            graph_api_base: get(GRAPH_API_BASE_KEY)
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            graph_api_version: get(GRAPH_API_VERSION_KEY)
                .unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.to_string()),
            http_timeout_secs,
            dry_run: false,
        })
    }

    /// Graph API endpoint that receives the event batch
    pub fn events_url(&self) -> String {
        format!(
            "{}/{}/{}/events",
            self.graph_api_base.trim_end_matches('/'),
            self.graph_api_version,
            self.pixel_id
        )
    }
}
