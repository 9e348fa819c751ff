//! Integration tests for the `beacon` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

const UNREACHABLE: &str = "http://127.0.0.1:1";
const PRINCIPAL: &str = "00000000-0000-0000-0000-000000000001";

fn beacon() -> Command {
    let mut cmd = Command::cargo_bin("beacon").expect("binary is built");
    cmd.env_remove("BEACON_PRINCIPAL_ID")
        .env_remove("BEACON_SERVER_URL")
        .timeout(Duration::from_secs(20));
    cmd
}

#[test]
fn help_lists_subcommands() {
    beacon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("mark-read"))
        .stdout(predicate::str::contains("completion"));
}

#[test]
fn mark_read_requires_ids_or_all() {
    beacon()
        .arg("mark-read")
        .assert()
        .failure()
        .stderr(predicate::str::contains("the following required arguments were not provided"));
}

#[test]
fn mark_read_rejects_invalid_uuid() {
    beacon()
        .args(["mark-read", "--id", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn completion_script_names_the_binary() {
    beacon()
        .args(["completion", "--shell", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("beacon"));
}

#[test]
fn list_without_principal_explains_how_to_set_one() {
    beacon()
        .args(["list", "--server", UNREACHABLE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no principal configured"));
}

#[test]
fn list_reports_unreachable_server() {
    beacon()
        .args(["list", "--server", UNREACHABLE, "--principal", PRINCIPAL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("snapshot request failed"));
}

#[test]
fn mark_read_reports_write_back_failure() {
    beacon()
        .args(["mark-read", "--all", "--server", UNREACHABLE, "--principal", PRINCIPAL])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mark-read failed"));
}

#[test]
fn watch_gives_up_when_budget_is_spent() {
    beacon()
        .args([
            "watch",
            "--max-attempts",
            "0",
            "--server",
            UNREACHABLE,
            "--principal",
            PRINCIPAL,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("real-time updates unavailable"))
        .stderr(predicate::str::contains("refresh to retry"));
}
