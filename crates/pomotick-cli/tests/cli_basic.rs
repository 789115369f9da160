//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against the dev data directory
//! and verify outputs.

use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "pomotick-cli", "--"])
        .args(args)
        .env("POMOTICK_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_show() {
    let (stdout, _, code) = run_cli(&["config", "show"]);
    assert_eq!(code, 0, "config show failed");
    assert!(stdout.contains("work_duration"));
}

#[test]
fn test_config_get() {
    let (stdout, _, code) = run_cli(&["config", "get", "timer.sessions_before_long_break"]);
    assert_eq!(code, 0, "config get failed");
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_set_rejects_zero_duration() {
    let (_, stderr, code) = run_cli(&["config", "set", "timer.work_duration", "0"]);
    assert_ne!(code, 0, "zero duration must be rejected");
    assert!(stderr.contains("error"));
}

#[test]
fn test_timer_status() {
    let (stdout, _, code) = run_cli(&["timer", "status"]);
    assert_eq!(code, 0, "timer status failed");
    // First object printed is the state snapshot.
    assert!(stdout.contains("\"type\": \"StateSnapshot\""));
}

#[test]
fn test_stats_today() {
    let (_, _, code) = run_cli(&["stats", "today"]);
    assert_eq!(code, 0, "stats today failed");
}
