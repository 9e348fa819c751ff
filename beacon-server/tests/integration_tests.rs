//! Integration tests for the `beacon-server` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn server_cmd() -> Command {
    Command::cargo_bin("beacon-server").expect("binary is built")
}

#[test]
fn help_lists_subcommands() {
    server_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Real-time notification delivery server"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("spec"));
}

#[test]
fn serve_help_mentions_in_memory_store() {
    server_cmd()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--in-memory"));
}

#[test]
fn unknown_subcommand_fails() {
    server_cmd().arg("invalid-command").assert().failure();
}

#[test]
fn spec_streams_json_document() {
    server_cmd()
        .args(["spec", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"/api/notifications/stream\""))
        .stdout(predicate::str::contains("Beacon API"));
}

#[test]
fn spec_writes_requested_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("beacon.yaml");

    server_cmd()
        .args(["spec", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote OpenAPI document to"));

    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("/api/notifications/mark-read"));
}

#[test]
fn serve_rejects_invalid_configuration() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "stream:\n  poll_interval_ms: 0\n").unwrap();

    server_cmd()
        .args(["serve", "--in-memory", "--config", path.to_str().unwrap()])
        .env_remove("BEACON_POLL_INTERVAL_MS")
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn serve_rejects_unsupported_config_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.ini");
    fs::write(&path, "[server]\nport=1\n").unwrap();

    server_cmd()
        .args(["serve", "--in-memory", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported configuration format"));
}
