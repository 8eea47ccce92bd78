//! Meta Conversions API module
//!
//! Uploads the event batch to the Graph API events endpoint.

pub mod client;
pub mod types;

pub use client::{EventUploader, MetaClient};
pub use types::*;
