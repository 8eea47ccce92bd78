//! Identifier hashing for conversion events
//!
//! Every identifier sent upstream (except the advertiser device id) is
//! normalized and pseudonymized with SHA-256, rendered as lowercase hex.
//! The receiving platform matches on these digests, so the normalization
//! rules below must stay bit-for-bit stable.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of identifier being hashed
///
/// Only [`IdentifierKind::Phone`] changes normalization; the other kinds
/// share the trim + lowercase policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    #[serde(rename = "em")]
    Email,
    #[serde(rename = "ph")]
    Phone,
    #[serde(rename = "fn")]
    FirstName,
    #[serde(rename = "ln")]
    LastName,
    #[serde(rename = "ge")]
    Gender,
    #[serde(rename = "zp")]
    Zip,
    #[serde(rename = "country")]
    Country,
}

impl IdentifierKind {
    /// Key used for this identifier in the event's `user_data` object
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Email => "em",
            IdentifierKind::Phone => "ph",
            IdentifierKind::FirstName => "fn",
            IdentifierKind::LastName => "ln",
            IdentifierKind::Gender => "ge",
            IdentifierKind::Zip => "zp",
            IdentifierKind::Country => "country",
        }
    }
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compute the SHA-256 digest of bytes as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Normalize a value the way the platform expects before hashing
///
/// Trims and lowercases; phone numbers are further reduced to ASCII digits.
pub fn normalize(value: &str, kind: IdentifierKind) -> String {
    let normalized = value.trim().to_lowercase();
    match kind {
        IdentifierKind::Phone => normalized.chars().filter(char::is_ascii_digit).collect(),
        _ => normalized,
    }
}

/// Normalize and hash an identifier
///
/// Returns `None` when the value is absent or normalizes to an empty string,
/// so an empty field never turns into the digest of `""`.
pub fn hash_identifier(value: Option<&str>, kind: IdentifierKind) -> Option<String> {
    let normalized = normalize(value?, kind);
    if normalized.is_empty() {
        return None;
    }
    Some(sha256_hex(normalized.as_bytes()))
}
