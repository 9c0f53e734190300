//! Integration tests for the `acectl` CLI binary.
//!
//! Argument parsing, config handling and error exit codes run without a
//! host; end-to-end commands run against a wiremock Moonraker.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `acectl` binary with env isolation.
///
/// Clears all `ACECTL_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn acectl_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("acectl");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("ACECTL_PROFILE")
        .env_remove("ACECTL_HOST")
        .env_remove("ACECTL_API_KEY")
        .env_remove("ACECTL_OUTPUT")
        .env_remove("ACECTL_INSECURE")
        .env_remove("ACECTL_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(home: &Path, args: Vec<String>) -> std::process::Output {
    let home = home.to_path_buf();
    tokio::task::spawn_blocking(move || acectl_cmd(&home).args(args).output().unwrap())
        .await
        .unwrap()
}

fn args(server: &MockServer, rest: &[&str]) -> Vec<String> {
    let mut v = vec!["--host".to_owned(), server.uri()];
    v.extend(rest.iter().map(|s| (*s).to_owned()));
    v
}

async fn mock_host() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/server/ace/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "status": "ready",
                "dryer": {"status": "stop", "target_temp": 0, "duration": 0, "remain_time": 0},
                "slots": [
                    {"index": 0, "status": "ready", "type": "PLA", "color": [255, 255, 255], "temp": 220},
                    {"index": 1, "status": "ready", "type": "PETG", "color": [0, 0, 0], "temp": 250},
                    {"index": 2, "status": "empty"},
                    {"index": 3, "status": "empty"}
                ]
            }
        })))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = acectl_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    acectl_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("status")
            .and(predicate::str::contains("dryer"))
            .and(predicate::str::contains("assist"))
            .and(predicate::str::contains("slot")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    acectl_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("acectl"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    acectl_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = acectl_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_assist_subcommands_exist() {
    let home = tempfile::tempdir().unwrap();
    acectl_cmd(home.path())
        .args(["assist", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("toggle")
                .and(predicate::str::contains("on"))
                .and(predicate::str::contains("off"))
                .and(predicate::str::contains("all-off")),
        );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_without_file() {
    let home = tempfile::tempdir().unwrap();
    acectl_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_set_then_show_redacts_key() {
    let home = tempfile::tempdir().unwrap();
    acectl_cmd(home.path())
        .args(["config", "set", "host", "printer.local:7125"])
        .assert()
        .success();
    acectl_cmd(home.path())
        .args(["config", "set", "api_key", "s3cret"])
        .assert()
        .success();

    acectl_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("host = \"printer.local:7125\"")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("s3cret").not()),
        );
}

#[test]
fn test_config_set_rejects_bad_value() {
    let home = tempfile::tempdir().unwrap();
    let output = acectl_cmd(home.path())
        .args(["config", "set", "timeout", "soon"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unknown_profile_is_not_found() {
    let home = tempfile::tempdir().unwrap();
    let output = acectl_cmd(home.path())
        .args(["--profile", "garage", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("garage"));
}

// ── Host interaction ────────────────────────────────────────────────

#[test]
fn test_unreachable_host_is_connection_error() {
    let home = tempfile::tempdir().unwrap();
    let output = acectl_cmd(home.path())
        .args(["--host", "http://127.0.0.1:9", "--timeout", "2", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json() {
    let server = mock_host().await;
    let home = tempfile::tempdir().unwrap();

    let output = run(home.path(), args(&server, &["-o", "json", "status"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let state: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(state["device"]["status"], "ready");
    assert_eq!(state["slots"][1]["material"], "PETG");
    assert_eq!(state["slots"][0]["color"], json!([255, 255, 255]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_dryer_temperature_never_sent() {
    let server = mock_host().await;
    Mock::given(method("POST"))
        .and(path("/server/ace/command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let output = run(
        home.path(),
        args(&server, &["dryer", "start", "--temp", "70"]),
    )
    .await;

    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("ACE_START_DRYING"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_command_exit_code() {
    let server = mock_host().await;
    Mock::given(method("POST"))
        .and(path("/server/ace/command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "ACE busy"})))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let output = run(home.path(), args(&server, &["park", "1"])).await;

    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("ACE busy"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dryer_start_uses_config_defaults() {
    let server = mock_host().await;
    Mock::given(method("POST"))
        .and(path("/server/ace/command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let output = run(home.path(), args(&server, &["dryer", "start"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let sent: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/server/ace/command")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(
        sent,
        vec![json!({"command": "ACE_START_DRYING", "params": {"TEMP": 55, "DURATION": 240}})]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spool_endless_on_sends_command() {
    let server = mock_host().await;
    Mock::given(method("POST"))
        .and(path("/server/ace/command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let output = run(home.path(), args(&server, &["spool", "endless", "on"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let sent: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/server/ace/command")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(
        sent,
        vec![json!({"command": "ACE_ENABLE_ENDLESS_SPOOL", "params": {}})]
    );
}

#[test]
fn test_spool_endless_rejects_unknown_action() {
    let home = tempfile::tempdir().unwrap();
    let output = acectl_cmd(home.path())
        .args(["spool", "endless", "maybe"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
