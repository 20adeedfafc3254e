//! CLI argument parsing tests for Sleuth

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn sleuth() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sleuth"))
}

#[test]
fn test_help_flag() {
    let mut cmd = sleuth();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Fetch and triage the logs behind an incident"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_version_flag() {
    let mut cmd = sleuth();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_help() {
    let mut cmd = sleuth();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_subcommand() {
    let mut cmd = sleuth();
    cmd.arg("engage");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ============================================================================
// Fetch command
// ============================================================================

#[test]
fn test_fetch_command_help() {
    let mut cmd = sleuth();
    cmd.args(["fetch", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Fetch one source"))
        .stdout(predicate::str::contains("-q, --query"))
        .stdout(predicate::str::contains("-H, --header"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_fetch_requires_source() {
    let mut cmd = sleuth();
    cmd.arg("fetch");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("<SOURCE>"));
}

#[test]
fn test_fetch_rejects_malformed_header() {
    let mut cmd = sleuth();
    cmd.args(["fetch", "https://example.com/app.log", "-H", "no-separator"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=VALUE"));
}

// ============================================================================
// Other commands
// ============================================================================

#[test]
fn test_scan_command_help() {
    let mut cmd = sleuth();
    cmd.args(["scan", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("summarize the evidence"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_links_command_help() {
    let mut cmd = sleuth();
    cmd.args(["links", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("without fetching"));
}

#[test]
fn test_init_and_status_help() {
    sleuth()
        .args(["init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize config"));
    sleuth()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Show configuration status"));
}

#[test]
fn test_global_config_after_subcommand() {
    let mut cmd = sleuth();
    cmd.args(["links", "--config", "/nonexistent/config.json", "nothing here"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No sources found"));
}
