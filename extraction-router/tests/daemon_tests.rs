//! End-to-end tests for the extraction-router binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_extraction-router"))
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/page.json")
}

/// Fast session settings plus a database inside `dir`.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    let contents = format!(
        r#"
[general]
log_level = "warn"

[scroll]
distance_px = 300.0
max_scrolls = 5
idle_rounds = 1
poll_interval_ms = 50

[drift]
database_path = '{}'
"#,
        dir.join("fingerprints.db").display()
    );
    std::fs::write(&path, contents).unwrap();
    path
}

fn run(args: &[&std::ffi::OsStr]) -> Output {
    binary().args(args).output().expect("failed to run extraction-router")
}

#[test]
fn test_session_report_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = run(&[
        fixture().as_os_str(),
        "--config".as_ref(),
        config.as_os_str(),
        "--memory-store".as_ref(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stop_reason"], "history-exhausted");
    assert_eq!(report["rounds"], 2);
    assert_eq!(report["scrolls"], 1);
    assert_eq!(report["skipped"], 2);

    let messages = report["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["id"], "false_4915550001@c.us_A1");
    assert_eq!(messages[0]["sender"]["name"], "Ada");
    assert_eq!(messages[1]["outbound"], true);
    assert_eq!(messages[1]["status"], "read");
    assert_eq!(report["version"]["is_compatible"], true);
}

#[test]
fn test_changed_layout_fails_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let first = run(&[fixture().as_os_str(), "--config".as_ref(), config.as_os_str()]);
    assert!(first.status.success());
    assert!(dir.path().join("fingerprints.db").exists());

    let mut page: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture()).unwrap()).unwrap();
    page["document"]["#main"]["classList"] = serde_json::json!(["_2xAQV", "redesign"]);
    let changed = dir.path().join("changed.json");
    std::fs::write(&changed, serde_json::to_string(&page).unwrap()).unwrap();

    let second = run(&[changed.as_os_str(), "--config".as_ref(), config.as_os_str()]);
    assert!(!second.status.success());
    assert!(second.stdout.is_empty());

    let accepted = run(&[
        changed.as_os_str(),
        "--config".as_ref(),
        config.as_os_str(),
        "--reset-fingerprint".as_ref(),
    ]);
    assert!(accepted.status.success());
}

#[test]
fn test_missing_snapshot_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let output = run(&[
        "/nonexistent/page.json".as_ref(),
        "--config".as_ref(),
        config.as_os_str(),
        "--memory-store".as_ref(),
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_help() {
    let output = binary().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE"));
}
