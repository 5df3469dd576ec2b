//! CLI contract tests
//!
//! Run the `sentinel` binary against temp workspaces and check exit codes,
//! output formats and in-place fixing.

use std::path::Path;
use std::process::{Command, Output};

fn sentinel_bin() -> &'static str {
    env!("CARGO_BIN_EXE_sentinel")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(sentinel_bin())
        .current_dir(dir)
        .args(args)
        .env("RUST_LOG", "error")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run sentinel")
}

fn setup_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("app")).unwrap();
    std::fs::write(dir.path().join("app/settings.py"), "JWT_SECRET_KEY = \"x\"\n").unwrap();
    std::fs::write(
        dir.path().join("app/users.py"),
        "def create_user(data):\n    return data\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("app/clean.py"), "VALUE = 1\n").unwrap();
    dir
}

#[test]
fn test_validate_exit_codes() {
    let dir = setup_repo();

    let fixable = run(dir.path(), &["validate", "app/settings.py"]);
    assert!(fixable.status.success(), "stderr: {}", String::from_utf8_lossy(&fixable.stderr));

    let blocked = run(dir.path(), &["validate", "app/users.py"]);
    assert_eq!(blocked.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&blocked.stdout).contains("ERROR_HANDLING_MISSING"));
}

#[test]
fn test_validate_json_output() {
    let dir = setup_repo();
    let output = run(dir.path(), &["--format", "json", "validate", "app/settings.py"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(parsed["total_issues"], 1);
    assert_eq!(parsed["fixed_issues"], 1);
    assert_eq!(parsed["can_deliver"], true);
}

#[test]
fn test_fix_prints_and_writes() {
    let dir = setup_repo();

    let printed = run(dir.path(), &["fix", "app/settings.py"]);
    assert!(printed.status.success());
    assert_eq!(String::from_utf8_lossy(&printed.stdout), "JWT_SECRET = \"x\"\n");
    let untouched = std::fs::read_to_string(dir.path().join("app/settings.py")).unwrap();
    assert_eq!(untouched, "JWT_SECRET_KEY = \"x\"\n");

    let written = run(dir.path(), &["fix", "app/settings.py", "--write"]);
    assert!(written.status.success());
    let fixed = std::fs::read_to_string(dir.path().join("app/settings.py")).unwrap();
    assert_eq!(fixed, "JWT_SECRET = \"x\"\n");
}

#[test]
fn test_context_suppresses_fixture_file() {
    let dir = setup_repo();
    std::fs::create_dir_all(dir.path().join("tests")).unwrap();
    std::fs::write(dir.path().join("tests/conftest.py"), "JWT_SECRET_KEY = \"x\"\n").unwrap();

    let output = run(dir.path(), &["--format", "json", "context", "tests/conftest.py"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(parsed["is_real"], true);
    assert_eq!(parsed["suppressed_count"], 1);
}

#[test]
fn test_rules_lists_catalog() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("sentinel.toml"),
        "[naming]\nrenames = [{ deprecated = \"AUTH_TOKEN_KEY\", canonical = \"AUTH_TOKEN\" }]\n",
    )
    .unwrap();

    let output = run(dir.path(), &["--format", "json", "rules"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert!(parsed["version"].as_str().unwrap().ends_with("+custom"));
    let names: Vec<&str> = parsed["rules"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert!(names.contains(&"rename-AUTH_TOKEN_KEY"));
    assert!(names.contains(&"rename-JWT_SECRET_KEY"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sentinel.toml"), "[thresholds]\napi = 150\n").unwrap();
    let output = run(dir.path(), &["rules"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid"));
}

#[test]
fn test_monitor_once_prints_dashboard() {
    let dir = setup_repo();
    let output = run(dir.path(), &["--format", "json", "monitor", ".", "--once"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let scores = parsed["per_category_scores"].as_object().expect("scores");
    assert_eq!(scores.len(), 7);
    // settings.py carries the only naming issue among three files
    let naming = scores["naming"].as_f64().unwrap();
    assert!((naming - 200.0 / 3.0).abs() < 1e-6, "{}", naming);
    let alerts = parsed["recent_alerts"].as_array().unwrap();
    assert!(alerts.iter().any(|a| a["severity"] == "critical"));
}

#[test]
fn test_missing_file_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["validate", "nope.py"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}
