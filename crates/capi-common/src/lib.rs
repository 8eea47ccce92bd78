//! CAPI Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, hashing, logging and error handling for the CAPI sync workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CapiError`] and the [`Result`] alias
//! - **Hashing**: identifier normalization and SHA-256 pseudonymization
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Types**: the conversion event and audit entry wire shapes
//!
//! # Example
//!
//! ```
//! use capi_common::hashing::{hash_identifier, IdentifierKind};
//!
//! let digest = hash_identifier(Some(" Jane@Test.com "), IdentifierKind::Email);
//! assert_eq!(digest, hash_identifier(Some("jane@test.com"), IdentifierKind::Email));
//! assert_eq!(hash_identifier(Some(""), IdentifierKind::Email), None);
//! ```

pub mod error;
pub mod hashing;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CapiError, Result};
