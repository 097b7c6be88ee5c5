//! Smoke tests for the todoprobe CLI
//!
//! Every run here uses the in-memory backend, so no browser is needed.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the todoprobe binary, isolated from the caller's environment
fn todoprobe(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("todoprobe").expect("todoprobe binary should exist");
    cmd.current_dir(dir.path())
        .env_remove("TODOPROBE_BASE_URL")
        .env_remove("TODOPROBE_SEED")
        .env_remove("RUST_LOG");
    cmd
}

fn fast_config(dir: &TempDir) {
    fs::write(
        dir.path().join("todoprobe.yaml"),
        "base_url: https://todo.test/#/\ntimeouts:\n  element: 200\n  expect: 50\n  navigation: 1000\n  poll_interval: 10\n",
    )
    .unwrap();
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    todoprobe(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.2.0"));
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    todoprobe(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("TodoMVC"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    todoprobe(&dir).assert().failure();
}

#[test]
fn test_run_subcommand_help() {
    let dir = TempDir::new().unwrap();
    todoprobe(&dir)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--seed"))
        .stdout(predicate::str::contains("--quirk"));
}

// ============================================================================
// list / config
// ============================================================================

#[test]
fn test_list_shows_groups_and_scenarios() {
    let dir = TempDir::new().unwrap();
    todoprobe(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Adding items to the list"))
        .stdout(predicate::str::contains("  Persisting items in the list on page reload"))
        .stderr(predicate::str::contains("12 scenarios"));
}

#[test]
fn test_list_filter() {
    let dir = TempDir::new().unwrap();
    todoprobe(&dir)
        .args(["list", "--filter", "filtering"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Filtering by active items"))
        .stdout(predicate::str::contains("Clearing completed items").not());
}

#[test]
fn test_config_layers_file_and_env() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("todoprobe.yaml"), "workers: 3\n").unwrap();
    todoprobe(&dir)
        .arg("config")
        .env("TODOPROBE_SEED", "1234")
        .assert()
        .success()
        .stdout(predicate::str::contains("workers: 3"))
        .stdout(predicate::str::contains("seed: 1234"));
}

#[test]
fn test_config_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("todoprobe.yaml"), "workers: 3\n").unwrap();
    todoprobe(&dir)
        .args(["config", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("workers: 1"))
        .stdout(predicate::str::contains("https://demo.playwright.dev/todomvc/#/"));
}

#[test]
fn test_bad_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("todoprobe.yaml"), "wrokers: 3\n").unwrap();
    todoprobe(&dir).arg("config").assert().code(2);
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_clean_suite_passes_and_writes_reports() {
    let dir = TempDir::new().unwrap();
    fast_config(&dir);
    todoprobe(&dir)
        .args(["run", "--seed", "7", "--output", "out", "--color", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("PASSED 12 scenarios"));

    let json = fs::read_to_string(dir.path().join("out/report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["seed"], 7);
    assert!(dir.path().join("out/junit.xml").is_file());
    assert!(dir.path().join("out/report.html").is_file());
}

#[test]
fn test_run_with_quirk_fails_with_exit_code_one() {
    let dir = TempDir::new().unwrap();
    fast_config(&dir);
    todoprobe(&dir)
        .args([
            "run",
            "--quirk",
            "accept-empty",
            "--filter",
            "empty item",
            "--no-screenshots",
            "--color",
            "never",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FAIL Adding items to the list > Avoids adding an empty item"))
        .stderr(predicate::str::contains("replay with: todoprobe run --seed"));
}

#[test]
fn test_run_filter_runs_only_matching_scenarios() {
    let dir = TempDir::new().unwrap();
    fast_config(&dir);
    todoprobe(&dir)
        .args(["run", "--filter", "removing", "--output", "out", "--color", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("PASSED 2 scenarios"))
        .stderr(predicate::str::contains("PASS Removing items from the list > ").count(2));
}

#[test]
fn test_run_filter_matching_nothing_is_an_error() {
    let dir = TempDir::new().unwrap();
    fast_config(&dir);
    todoprobe(&dir)
        .args(["run", "--filter", "no such scenario"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no scenario matches"));
}

#[test]
fn test_run_zero_workers_is_rejected() {
    let dir = TempDir::new().unwrap();
    fast_config(&dir);
    todoprobe(&dir)
        .args(["run", "--workers", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("workers"));
}

#[test]
fn test_run_too_many_workers_is_rejected() {
    let dir = TempDir::new().unwrap();
    fast_config(&dir);
    todoprobe(&dir)
        .args(["run", "--workers", "100000"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("at most 64"));
}
