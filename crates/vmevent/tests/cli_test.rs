//! Integration tests for the `vmevent` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! configuration layering and error exit codes, all without a live
//! vSphere endpoint or Loki instance.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Nothing listens here; connections are refused immediately.
const CLOSED_URL: &str = "http://127.0.0.1:1/sdk";

/// Build a [`Command`] for the `vmevent` binary with env isolation.
///
/// Clears all `VMEVENT_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn vmevent_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vmevent");
    cmd.env("HOME", "/tmp/vmevent-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/vmevent-cli-test-nonexistent")
        .env_remove("RUST_LOG");
    for var in [
        "URL",
        "USER",
        "PASSWORD",
        "NO_VERIFY_SSL",
        "CA_CERT",
        "TIMEOUT",
        "LOCALE",
        "LOG_LEVEL",
        "OUTPUT",
        "CONFIG",
        "LOKI_URL",
        "TENANT",
        "LOKI_NO_VERIFY_SSL",
        "LOKI_SERVICE_NAME",
    ] {
        cmd.env_remove(format!("VMEVENT_{var}"));
    }
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = vmevent_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    vmevent_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("vSphere")
            .and(predicate::str::contains("category"))
            .and(predicate::str::contains("enumerated"))
            .and(predicate::str::contains("info"))
            .and(predicate::str::contains("event"))
            .and(predicate::str::contains("wait"))
            .and(predicate::str::contains("loki")),
    );
}

#[test]
fn test_version_flag() {
    vmevent_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vmevent"));
}

#[test]
fn test_loki_help_shows_flags() {
    vmevent_cmd()
        .args(["loki", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--loki-url")
                .and(predicate::str::contains("--tenant"))
                .and(predicate::str::contains("collect")),
        );
}

#[test]
fn test_wait_timeout_rejects_zero() {
    vmevent_cmd()
        .args(["wait", "--wait-timeout", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_output_format() {
    vmevent_cmd()
        .args(["--output", "xml", "category"])
        .assert()
        .code(2);
}

// ── Completions ─────────────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    vmevent_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vmevent"));
}

#[test]
fn test_completions_need_no_config() {
    vmevent_cmd()
        .args(["--config", "/nonexistent/vmevent.toml", "completions", "zsh"])
        .assert()
        .success();
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_missing_user_is_auth_error() {
    let output = vmevent_cmd().arg("category").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("No username"), "Unexpected output:\n{text}");
}

#[test]
fn test_explicit_config_must_exist() {
    let output = vmevent_cmd()
        .args(["--config", "/nonexistent/vmevent.toml", "category"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Configuration file not found"));
}

#[test]
fn test_invalid_url_is_usage_error() {
    let output = vmevent_cmd()
        .args(["--user", "admin", "--url", "not a url", "event"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Invalid value for url"));
}

// ── Connection errors ───────────────────────────────────────────────

#[test]
fn test_unreachable_endpoint_exit_code() {
    let output = vmevent_cmd()
        .args(["--user", "admin", "--url", CLOSED_URL, "--timeout", "2", "category"])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(7),
        "Unexpected output:\n{}",
        combined_output(&output)
    );
}

#[test]
fn test_missing_ca_cert_is_connection_error() {
    let output = vmevent_cmd()
        .args([
            "--user",
            "admin",
            "--url",
            CLOSED_URL,
            "--ca-cert",
            "/nonexistent/vcenter-ca.pem",
            "category",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    let text = combined_output(&output);
    assert!(text.contains("failed to read CA cert"), "Unexpected output:\n{text}");
}

#[test]
fn test_config_file_supplies_credentials() {
    let file = config_file(&format!(
        "url = \"{CLOSED_URL}\"\nuser = \"admin\"\ntimeout = 2\n"
    ));
    let output = vmevent_cmd()
        .arg("--config")
        .arg(file.path())
        .arg("enumerated")
        .output()
        .unwrap();
    // Got past credential checks to the connection attempt.
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn test_env_supplies_credentials() {
    let output = vmevent_cmd()
        .env("VMEVENT_USER", "admin")
        .env("VMEVENT_URL", CLOSED_URL)
        .env("VMEVENT_TIMEOUT", "2")
        .arg("info")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn test_loki_test_unreachable() {
    let output = vmevent_cmd()
        .args([
            "loki",
            "test",
            "--loki-url",
            "http://127.0.0.1:1/loki/api/v1/push",
            "--timeout",
            "2",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("Could not reach Loki"));
}
