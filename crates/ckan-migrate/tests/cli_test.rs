//! Process-level checks of the `ckan-migrate` binary.

#![allow(clippy::pedantic)]

use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::json;
use tempfile::TempDir;

fn run_binary(work: &Path, config: &serde_json::Value, extra_args: &[&str]) -> Output {
    let config_path = work.join("config.json");
    std::fs::write(&config_path, serde_json::to_vec_pretty(config).unwrap()).unwrap();

    Command::new(env!("CARGO_BIN_EXE_ckan-migrate"))
        .arg(&config_path)
        .arg("--log-file")
        .arg(work.join("migration.log"))
        .args(extra_args)
        .current_dir(work)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

fn log_of(work: &Path) -> String {
    std::fs::read_to_string(work.join("migration.log")).unwrap()
}

#[test]
fn test_missing_target_api_key_exits_with_status_1() {
    let work = TempDir::new().unwrap();
    let config = json!({
        "source_url": "http://127.0.0.1:9",
        "source_api_key": "src-key",
        "target_url": "http://127.0.0.1:9"
    });

    let output = run_binary(work.path(), &config, &["--yes"]);

    assert_eq!(output.status.code(), Some(1));
    let log = log_of(work.path());
    assert!(log.contains("target_api_key"));
    assert!(log.contains("your-target-api-key"), "example config is shown");
}

#[test]
fn test_unanswered_confirmation_aborts_with_status_0() {
    let work = TempDir::new().unwrap();
    let config = json!({
        "source_url": "http://127.0.0.1:9",
        "source_api_key": "src-key",
        "target_url": "http://127.0.0.1:9",
        "target_api_key": "tgt-key",
        "work_dir": work.path().join("staging")
    });

    // No terminal to prompt on, so the confirmation counts as a refusal.
    let output = run_binary(work.path(), &config, &[]);

    assert_eq!(output.status.code(), Some(0));
    assert!(log_of(work.path()).contains("Migration aborted"));
    assert!(!work.path().join("staging").exists(), "no phase ran");
}
