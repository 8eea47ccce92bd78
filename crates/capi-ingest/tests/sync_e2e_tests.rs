//! End-to-end tests for a sync run
//!
//! These tests drive the full download → transform → audit → upload flow
//! against a mock server standing in for both the CSV host and the Graph
//! API:
//! - Successful upload and receipt
//! - Graph API error message surfacing
//! - HTML payload rejection
//! - Audit written before a failed upload
//! - No upload for an empty batch

#![allow(clippy::unwrap_used, clippy::expect_used)]

use capi_common::hashing::sha256_hex;
use capi_common::types::{AuditEntry, EmailMatchMode};
use capi_ingest::audit::JsonFileAuditSink;
use capi_ingest::clock::FixedClock;
use capi_ingest::config::{SourceLocation, SyncConfig};
use capi_ingest::meta::{EventUploader, MetaClient};
use capi_ingest::pipeline::BatchPipeline;
use capi_ingest::runner::{SyncRunner, UploadStatus};
use capi_ingest::source::SourceFetcher;
use capi_ingest::transform::RecordTransformer;
use capi_ingest::SyncError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param},
    Match, Mock, MockServer, Request, ResponseTemplate,
};

const PIXEL_ID: &str = "1234567890";
const ACCESS_TOKEN: &str = "test-token";
const EVENTS_PATH: &str = "/v19.0/1234567890/events";

const EXPORT: &str = "\
em0,em1,em2,phone,madid,name,zip,country,gender,action,time,price
Jane@Test.com,,,(555) 123-4567,,Jane Doe,,,,purchase,2024-01-15T10:00:00Z,\"19,99€\"
,,,5550000000,,No Email,,,,purchase,2024-01-15T10:00:00Z,$5.00
john@test.com,,,555 987 6543,device-1,John Smith,10001,US,male,purchase,2024-01-16,$42.50
";

/// Matches a Graph API request whose body carries `n` events
struct EventCount(usize);

impl Match for EventCount {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| body["data"].as_array().map(Vec::len))
            == Some(self.0)
    }
}

fn config(server: &MockServer, audit_path: &Path) -> SyncConfig {
    let env: HashMap<&str, String> = HashMap::from([
        ("META_PIXEL_ID", PIXEL_ID.to_string()),
        ("META_ACCESS_TOKEN", ACCESS_TOKEN.to_string()),
        ("CSV_URL", format!("{}/export.csv", server.uri())),
        ("CAPI_GRAPH_API_BASE", server.uri()),
        ("CAPI_AUDIT_PATH", audit_path.display().to_string()),
        ("CAPI_HTTP_TIMEOUT_SECS", "5".to_string()),
    ]);
    SyncConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

fn runner(config: &SyncConfig) -> SyncRunner<FixedClock> {
    let transformer = RecordTransformer::with_clock(
        config.email_mode,
        FixedClock::at_timestamp(1_700_000_000).unwrap(),
    );
    SyncRunner::new(
        BatchPipeline::new(transformer),
        Box::new(JsonFileAuditSink::new(config.audit_path.clone())),
        Box::new(MetaClient::new(config).unwrap()),
    )
}

async fn mount_export(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/export.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn download(config: &SyncConfig) -> Result<String, SyncError> {
    SourceFetcher::new(config.http_timeout_secs)
        .unwrap()
        .load(&config.source)
        .await
}

fn read_audit(path: &Path) -> Vec<AuditEntry> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Successful Runs
// ============================================================================

#[tokio::test]
async fn test_sync_uploads_accepted_rows() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("audit_log.json");
    let config = config(&server, &audit_path);

    mount_export(&server, EXPORT).await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(query_param("access_token", ACCESS_TOKEN))
        .and(EventCount(2))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events_received": 2,
            "messages": [],
            "fbtrace_id": "AbCdEf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = download(&config).await.unwrap();
    let summary = runner(&config).run(&payload).await.unwrap();

    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.rejected, 1);
    match summary.upload {
        UploadStatus::Sent(receipt) => {
            assert_eq!(receipt.status, 200);
            assert_eq!(receipt.events_received, Some(2));
            assert_eq!(receipt.fbtrace_id.as_deref(), Some("AbCdEf"));
        },
        other => panic!("expected upload, got {:?}", other),
    }

    let audit = read_audit(&audit_path);
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].sequence, 1);
    assert_eq!(audit[1].sequence, 2);
    assert_eq!(audit[0].event.event_time, 1705312800);
    assert_eq!(audit[0].event.user_data.em, vec![sha256_hex(b"jane@test.com")]);
    assert_eq!(audit[1].event.user_data.madid, "device-1");
    assert_eq!(audit[1].cleaned.country, "us");
}

#[tokio::test]
async fn test_uploaded_body_matches_wire_format() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir.path().join("audit.json"));

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events_received": 1})))
        .mount(&server)
        .await;

    let first_row = EXPORT.lines().take(2).collect::<Vec<_>>().join("\n");
    runner(&config).run(&first_row).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let event = &body["data"][0];
    assert_eq!(event["event_name"], "Purchase");
    assert_eq!(event["action_source"], "physical_store");
    assert_eq!(event["event_time"], 1705312800);
    assert_eq!(event["custom_data"], json!({"value": 19.99, "currency": "EUR"}));
    assert_eq!(event["user_data"]["em"], json!([sha256_hex(b"jane@test.com")]));
    assert_eq!(event["user_data"]["ph"], json!([sha256_hex(b"5551234567")]));
    assert_eq!(event["user_data"]["fn"], json!([sha256_hex(b"jane")]));
    assert_eq!(event["user_data"]["ln"], json!([sha256_hex(b"doe")]));
    assert_eq!(event["user_data"]["madid"], "");
    assert!(event["user_data"].get("zp").is_none());
}

// ============================================================================
// Failure Handling
// ============================================================================

#[tokio::test]
async fn test_graph_api_error_message_is_surfaced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("audit_log.json");
    let config = config(&server, &audit_path);

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Invalid OAuth access token.",
                "type": "OAuthException",
                "code": 190,
                "fbtrace_id": "XyZ"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = runner(&config).run(EXPORT).await.unwrap_err();

    match &err {
        SyncError::Upload { status, message } => {
            assert_eq!(*status, Some(400));
            assert_eq!(message, "Invalid OAuth access token.");
        },
        other => panic!("expected upload error, got {:?}", other),
    }
    assert!(!err.to_string().contains(ACCESS_TOKEN));

    // The trail is on disk even though the upload failed
    assert_eq!(read_audit(&audit_path).len(), 2);
}

#[tokio::test]
async fn test_non_json_error_falls_back_to_status() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir.path().join("audit.json"));

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = runner(&config).run(EXPORT).await.unwrap_err();
    assert!(matches!(err, SyncError::Upload { status: Some(502), .. }));
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn test_html_download_is_rejected_before_processing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("audit_log.json");
    let config = config(&server, &audit_path);

    mount_export(&server, "<!DOCTYPE html>\n<HTML><body>Sign in</body></HTML>").await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let payload = download(&config).await.unwrap();
    let err = runner(&config).run(&payload).await.unwrap_err();

    assert!(matches!(err, SyncError::InvalidPayload(_)));
    assert!(!audit_path.exists());
}

#[tokio::test]
async fn test_failed_download_is_reported() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir.path().join("audit.json"));

    Mock::given(method("GET"))
        .and(path("/export.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = download(&config).await.unwrap_err();
    assert!(matches!(err, SyncError::Download(_)));
    assert!(err.to_string().contains("404"));
}

// ============================================================================
// Empty Batches
// ============================================================================

#[tokio::test]
async fn test_no_accepted_rows_means_no_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("audit_log.json");
    let config = config(&server, &audit_path);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = runner(&config)
        .run("em0,em1,em2,phone\n,,,5550000000\nnot-an-email,,,5551111111\n")
        .await
        .unwrap();

    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.upload, UploadStatus::SkippedEmpty);
    assert_eq!(std::fs::read_to_string(&audit_path).unwrap(), "[]");
}

#[tokio::test]
async fn test_dry_run_writes_audit_without_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("nested").join("audit_log.json");
    let config = config(&server, &audit_path);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = runner(&config).dry_run(true).run(EXPORT).await.unwrap();

    assert_eq!(summary.upload, UploadStatus::SkippedDryRun);
    assert_eq!(read_audit(&audit_path).len(), 2);
}

// ============================================================================
// Client
// ============================================================================

#[tokio::test]
async fn test_client_targets_pixel_endpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir.path().join("audit.json"));

    let client = MetaClient::new(&config).unwrap();
    assert_eq!(client.events_url(), format!("{}{}", server.uri(), EVENTS_PATH));
    assert_eq!(config.email_mode, EmailMatchMode::Multi);
    assert!(matches!(config.source, SourceLocation::Url(ref url) if url.ends_with("/export.csv")));
}

#[tokio::test]
async fn test_client_sends_events_through_trait_object() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir.path().join("audit.json"));

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(EventCount(0))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let uploader: Box<dyn EventUploader> = Box::new(MetaClient::new(&config).unwrap());
    let receipt = uploader.upload(&[]).await.unwrap();

    assert_eq!(receipt.status, 200);
    assert_eq!(receipt.events_received, None);
}
