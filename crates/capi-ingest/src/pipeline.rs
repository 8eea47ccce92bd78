//! Batch pipeline: rows in, index-aligned events and audit entries out
//!
//! Rows are streamed through the transformer one at a time in input order.
//! Rejected rows are counted and skipped; they never stop the batch and never
//! consume a sequence number.

use crate::clock::Clock;
use crate::parser::RowParser;
use crate::transform::{RecordTransformer, RejectReason, TransformOutcome};
use capi_common::types::{AuditEntry, ConversionEvent};
use std::io::Read;
use tracing::{debug, info, warn};

/// Accepted records, ready for the uploader and the audit sink
///
/// `events[i]` is always equal to `audits[i].event`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    events: Vec<ConversionEvent>,
    audits: Vec<AuditEntry>,
}

impl Batch {
    fn push(&mut self, event: ConversionEvent, audit: AuditEntry) {
        self.events.push(event);
        self.audits.push(audit);
    }

    pub fn events(&self) -> &[ConversionEvent] {
        &self.events
    }

    pub fn audits(&self) -> &[AuditEntry] {
        &self.audits
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_parts(self) -> (Vec<ConversionEvent>, Vec<AuditEntry>) {
        (self.events, self.audits)
    }
}

/// A row that did not make it into the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// 1-based position among the data rows (header excluded)
    pub row: usize,
    pub reason: RejectReason,
}

/// Everything produced by one pass over the input
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub batch: Batch,
    pub rows_read: usize,
    pub rejections: Vec<Rejection>,
}

impl BatchOutcome {
    pub fn accepted(&self) -> usize {
        self.batch.len()
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

/// Drives parsed rows through a [`RecordTransformer`]
pub struct BatchPipeline<C: Clock> {
    transformer: RecordTransformer<C>,
}

impl<C: Clock> BatchPipeline<C> {
    pub fn new(transformer: RecordTransformer<C>) -> Self {
        Self { transformer }
    }

    /// Process an in-memory CSV payload
    pub fn process_str(&self, payload: &str) -> BatchOutcome {
        self.process_rows(RowParser::from_payload(payload))
    }

    /// Process CSV from any reader
    pub fn process_reader<R: Read>(&self, reader: R) -> BatchOutcome {
        self.process_rows(RowParser::new(reader))
    }

    /// Process an already-parsed row stream
    pub fn process_rows<I, E>(&self, rows: I) -> BatchOutcome
    where
        I: IntoIterator<Item = Result<crate::parser::RawRecord, E>>,
        E: std::fmt::Display,
    {
        let mut outcome = BatchOutcome::default();
        let mut next_sequence: u64 = 1;

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            outcome.rows_read += 1;

            let result = match row {
                Ok(record) => self.transformer.transform(&record, next_sequence),
                Err(e) => TransformOutcome::Rejected(RejectReason::MalformedRow(e.to_string())),
            };

            match result {
                TransformOutcome::Accepted { event, audit } => {
                    debug!(row = row_number, sequence = next_sequence, "Record accepted");
                    outcome.batch.push(event, *audit);
                    next_sequence += 1;
                },
                TransformOutcome::Rejected(reason) => {
                    warn!(row = row_number, reason = %reason, "Record rejected");
                    outcome.rejections.push(Rejection {
                        row: row_number,
                        reason,
                    });
                },
            }
        }

        info!(
            rows = outcome.rows_read,
            accepted = outcome.accepted(),
            rejected = outcome.rejected(),
            email_mode = %self.transformer.email_mode(),
            "Batch assembled"
        );

        outcome
    }
}
