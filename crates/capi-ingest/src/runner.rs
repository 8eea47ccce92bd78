//! End-to-end sync run
//!
//! payload check → transform → audit write → upload, in that order. The audit
//! artifact is on disk before the upload is attempted.

use crate::audit::AuditSink;
use crate::clock::Clock;
use crate::error::Result;
use crate::meta::{EventUploader, UploadReceipt};
use crate::pipeline::BatchPipeline;
use crate::source::ensure_tabular;
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// What happened to the upload step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadStatus {
    Sent(UploadReceipt),
    /// Nothing was accepted, so no request was made
    SkippedEmpty,
    SkippedDryRun,
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub rows_read: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub upload: UploadStatus,
}

/// Wires the pipeline to its two sinks
pub struct SyncRunner<C: Clock> {
    pipeline: BatchPipeline<C>,
    audit_sink: Box<dyn AuditSink>,
    uploader: Box<dyn EventUploader>,
    dry_run: bool,
}

impl<C: Clock> SyncRunner<C> {
    pub fn new(
        pipeline: BatchPipeline<C>,
        audit_sink: Box<dyn AuditSink>,
        uploader: Box<dyn EventUploader>,
    ) -> Self {
        Self {
            pipeline,
            audit_sink,
            uploader,
            dry_run: false,
        }
    }

    /// Skip the upload; the audit artifact is still written
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process a downloaded payload and hand the batch to both sinks
    pub async fn run(&self, payload: &str) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        self.execute(run_id, payload)
            .instrument(info_span!("sync_run", %run_id))
            .await
    }

    async fn execute(&self, run_id: Uuid, payload: &str) -> Result<RunSummary> {
        ensure_tabular(payload)?;

        let outcome = self.pipeline.process_str(payload);
        let (events, audits) = outcome.batch.into_parts();

        self.audit_sink.write(&audits)?;

        let upload = if events.is_empty() {
            info!("No events accepted, skipping upload");
            UploadStatus::SkippedEmpty
        } else if self.dry_run {
            info!(events = events.len(), "Dry run, skipping upload");
            UploadStatus::SkippedDryRun
        } else {
            UploadStatus::Sent(self.uploader.upload(&events).await?)
        };

        Ok(RunSummary {
            run_id,
            rows_read: outcome.rows_read,
            accepted: audits.len(),
            rejected: outcome.rejections.len(),
            upload,
        })
    }

    pub fn audit_destination(&self) -> String {
        self.audit_sink.describe()
    }
}
