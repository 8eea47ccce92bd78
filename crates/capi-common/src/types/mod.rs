//! Common types used across CAPI sync
//!
//! Wire shapes for the conversion events sent to the Graph API and the
//! audit entries persisted alongside them.

use crate::error::CapiError;
use serde::{Deserialize, Serialize};

/// Event name attached to every conversion event.
pub const EVENT_NAME_PURCHASE: &str = "Purchase";

/// Action source attached to every conversion event.
pub const ACTION_SOURCE_PHYSICAL_STORE: &str = "physical_store";

// ============================================================================
// Matching Configuration
// ============================================================================

/// How email columns decide whether a row is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailMatchMode {
    /// Only `em0` is considered; a missing or malformed value rejects the row
    Single,
    /// Every `em0..em2` value containing `@` is hashed; at least one is required
    #[default]
    Multi,
}

impl std::str::FromStr for EmailMatchMode {
    type Err = CapiError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(EmailMatchMode::Single),
            "multi" => Ok(EmailMatchMode::Multi),
            other => Err(CapiError::parse(format!(
                "Invalid email match mode '{}', expected 'single' or 'multi'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EmailMatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailMatchMode::Single => write!(f, "single"),
            EmailMatchMode::Multi => write!(f, "multi"),
        }
    }
}

/// Currency inferred from the raw price column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    #[default]
    Usd,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Eur => write!(f, "EUR"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

// ============================================================================
// Conversion Event
// ============================================================================

/// Hashed customer identifiers (`user_data`)
///
/// Each list holds zero or one digest except `em`, which holds one digest per
/// valid email column. Empty lists are left out of the payload. `madid` is the
/// advertiser device id, sent unhashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub em: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ph: Vec<String>,

    #[serde(rename = "fn", default, skip_serializing_if = "Vec::is_empty")]
    pub first_name: Vec<String>,

    #[serde(rename = "ln", default, skip_serializing_if = "Vec::is_empty")]
    pub last_name: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ge: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zp: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub country: Vec<String>,

    #[serde(default)]
    pub madid: String,
}

/// Purchase value attached to the event (`custom_data`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub value: f64,
    pub currency: Currency,
}

/// A server-side conversion event as accepted by the Graph API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub event_name: String,

    /// Unix seconds
    pub event_time: i64,

    pub action_source: String,

    pub user_data: UserData,

    pub custom_data: CustomData,
}

impl ConversionEvent {
    /// Build a purchase event from a physical store
    pub fn purchase(event_time: i64, user_data: UserData, custom_data: CustomData) -> Self {
        Self {
            event_name: EVENT_NAME_PURCHASE.to_string(),
            event_time,
            action_source: ACTION_SOURCE_PHYSICAL_STORE.to_string(),
            user_data,
            custom_data,
        }
    }
}

// ============================================================================
// Audit Trail
// ============================================================================

/// Raw column values exactly as they arrived
///
/// `emails` only lists the email columns that passed the `@` check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawSnapshot {
    pub emails: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub madid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Values after cleaning, before hashing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedFields {
    pub emails: Vec<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub madid: String,
    pub zip: String,
    pub country: String,
    pub gender: String,
    pub value: f64,
    pub currency: Currency,
    pub event_time: i64,
}

/// One accepted record: what came in, what it became, and what was sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 1-based, contiguous across accepted records
    pub sequence: u64,
    pub raw: RawSnapshot,
    pub cleaned: CleanedFields,
    pub event: ConversionEvent,
}
