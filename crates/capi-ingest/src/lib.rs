//! CAPI Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Turns a CSV customer export into hashed Meta Conversions API purchase
//! events, with an audit entry for every event sent.
//!
//! # Flow
//!
//! - [`source`]: download the export and reject HTML error pages
//! - [`parser`]: stream rows into [`parser::RawRecord`]s
//! - [`transform`]: clean, hash and package each record, or reject it
//! - [`pipeline`]: accumulate accepted events and audit entries in row order
//! - [`audit`]: write the audit trail as JSON
//! - [`meta`]: upload the batch to the Graph API
//! - [`runner`]: tie the steps together for one run
//!
//! # Example
//!
//! ```
//! use capi_common::types::EmailMatchMode;
//! use capi_ingest::pipeline::BatchPipeline;
//! use capi_ingest::transform::RecordTransformer;
//!
//! let pipeline = BatchPipeline::new(RecordTransformer::new(EmailMatchMode::Single));
//! let outcome = pipeline.process_str("em0,phone\nJane@Test.com\nnot-an-email\n");
//!
//! assert_eq!(outcome.accepted(), 1);
//! assert_eq!(outcome.rejected(), 1);
//! assert_eq!(outcome.batch.audits()[0].sequence, 1);
//! ```

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod meta;
pub mod parser;
pub mod pipeline;
pub mod runner;
pub mod source;
pub mod transform;

pub use error::{Result, SyncError};
