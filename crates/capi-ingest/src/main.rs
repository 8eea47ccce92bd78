//! capi-sync - push a CSV export to the Meta Conversions API

use anyhow::{Context, Result};
use capi_common::logging::{init_logging, LogConfig, LogLevel};
use capi_common::types::EmailMatchMode;
use capi_ingest::audit::JsonFileAuditSink;
use capi_ingest::config::{
    SyncConfig, AUDIT_PATH_KEY, CSV_URL_KEY, EMAIL_MODE_KEY, INPUT_PATH_KEY,
};
use capi_ingest::meta::MetaClient;
use capi_ingest::pipeline::BatchPipeline;
use capi_ingest::runner::{SyncRunner, UploadStatus};
use capi_ingest::source::SourceFetcher;
use capi_ingest::transform::RecordTransformer;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "capi-sync")]
#[command(author, version, about = "Hash a CSV export and send it to the Meta Conversions API")]
struct Cli {
    /// URL of the CSV export (overrides CSV_URL)
    #[arg(long)]
    csv_url: Option<String>,

    /// Read the export from a local file instead of downloading it
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Email matching rule: single (em0 only) or multi (em0..em2)
    #[arg(long)]
    email_mode: Option<EmailMatchMode>,

    /// Where to write the audit log (overrides CAPI_AUDIT_PATH)
    #[arg(long)]
    audit_path: Option<PathBuf>,

    /// Build and audit the batch without uploading it
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("capi-sync")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            process::exit(1);
        },
    };

    if let Err(e) = run(cli).await {
        error!(error = %format!("{:#}", e), "Sync failed");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();

    // Flags win over the environment; --input wins over --csv-url
    let email_mode = cli.email_mode.map(|mode| mode.to_string());
    let input = cli.input.as_ref().map(|path| path.display().to_string());
    let audit_path = cli.audit_path.as_ref().map(|path| path.display().to_string());

    let mut config = SyncConfig::from_lookup(|key| {
        let flag = match key {
            CSV_URL_KEY => cli.csv_url.clone(),
            INPUT_PATH_KEY => input.clone(),
            EMAIL_MODE_KEY => email_mode.clone(),
            AUDIT_PATH_KEY => audit_path.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })?;
    config.dry_run = cli.dry_run;

    info!(
        source = %config.source,
        email_mode = %config.email_mode,
        audit_path = %config.audit_path.display(),
        dry_run = config.dry_run,
        "Starting conversion sync"
    );

    let fetcher = SourceFetcher::new(config.http_timeout_secs)?;
    let payload = fetcher
        .load(&config.source)
        .await
        .with_context(|| format!("Failed to load {}", config.source))?;

    let runner = SyncRunner::new(
        BatchPipeline::new(RecordTransformer::new(config.email_mode)),
        Box::new(JsonFileAuditSink::new(config.audit_path.clone())),
        Box::new(MetaClient::new(&config)?),
    )
    .dry_run(config.dry_run);

    let summary = runner.run(&payload).await?;

    match &summary.upload {
        UploadStatus::Sent(receipt) => info!(
            run_id = %summary.run_id,
            accepted = summary.accepted,
            rejected = summary.rejected,
            events_received = ?receipt.events_received,
            fbtrace_id = ?receipt.fbtrace_id,
            "Sync complete"
        ),
        UploadStatus::SkippedEmpty | UploadStatus::SkippedDryRun => info!(
            run_id = %summary.run_id,
            accepted = summary.accepted,
            rejected = summary.rejected,
            audit = %runner.audit_destination(),
            "Sync complete without upload"
        ),
    }

    Ok(())
}
