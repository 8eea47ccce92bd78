//! End-to-end tests for the capi-sync binary

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const EXPORT: &str = "\
em0,em1,em2,phone,madid,name,zip,country,gender,action,time,price
jane@test.com,,,5551234567,,Jane Doe,,,f,purchase,2024-01-15T10:00:00Z,$19.99
,,,5550000000,,Nobody,,,,purchase,2024-01-15T10:00:00Z,$1.00
";

const ENV_KEYS: [&str; 9] = [
    "META_PIXEL_ID",
    "META_ACCESS_TOKEN",
    "CSV_URL",
    "CAPI_INPUT_PATH",
    "CAPI_EMAIL_MODE",
    "CAPI_AUDIT_PATH",
    "CAPI_GRAPH_API_BASE",
    "CAPI_GRAPH_API_VERSION",
    "CAPI_HTTP_TIMEOUT_SECS",
];

/// Binary with a clean environment, running inside `dir`
fn capi_sync(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("capi-sync").unwrap();
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd.current_dir(dir)
        .env("LOG_OUTPUT", "console")
        .env("LOG_FORMAT", "text");
    cmd
}

fn read_audit(path: &Path) -> Vec<Value> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_missing_settings_fail_with_names() {
    let dir = TempDir::new().unwrap();

    capi_sync(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("META_PIXEL_ID"))
        .stdout(predicate::str::contains("META_ACCESS_TOKEN"))
        .stdout(predicate::str::contains("CSV_URL"));
}

#[test]
fn test_invalid_email_mode_flag_is_rejected() {
    let dir = TempDir::new().unwrap();

    capi_sync(dir.path())
        .args(["--email-mode", "both"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("both"));
}

#[test]
fn test_dry_run_from_local_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("export.csv");
    std::fs::write(&input, EXPORT).unwrap();
    let audit_path = dir.path().join("out").join("audit.json");

    capi_sync(dir.path())
        .env("META_PIXEL_ID", "42")
        .env("META_ACCESS_TOKEN", "token")
        .arg("--input")
        .arg(&input)
        .arg("--audit-path")
        .arg(&audit_path)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync complete without upload"));

    let audit = read_audit(&audit_path);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0]["sequence"], 1);
    assert_eq!(audit[0]["cleaned"]["gender"], "f");
}

#[tokio::test]
async fn test_full_run_against_mock_graph_api() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/export.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EXPORT))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v19.0/42/events"))
        .and(query_param("access_token", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events_received": 1,
            "fbtrace_id": "trace-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    capi_sync(dir.path())
        .env("META_PIXEL_ID", "42")
        .env("META_ACCESS_TOKEN", "token")
        .env("CAPI_GRAPH_API_BASE", server.uri())
        .arg("--csv-url")
        .arg(format!("{}/export.csv", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync complete"))
        .stdout(predicate::str::contains("trace-1"));

    // Default audit location is relative to the working directory
    assert_eq!(read_audit(&dir.path().join("audit_log.json")).len(), 1);
}

#[tokio::test]
async fn test_upload_error_exits_non_zero() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("export.csv");
    std::fs::write(&input, EXPORT).unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid parameter", "code": 100 }
        })))
        .mount(&server)
        .await;

    capi_sync(dir.path())
        .env("META_PIXEL_ID", "42")
        .env("META_ACCESS_TOKEN", "secret-token")
        .env("CAPI_GRAPH_API_BASE", server.uri())
        .env("CAPI_INPUT_PATH", &input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid parameter"))
        .stdout(predicate::str::contains("secret-token").not());

    assert!(dir.path().join("audit_log.json").exists());
}
