//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a private data directory and verify
//! outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command with `data_dir` as the data directory and return
/// (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_optport"))
        .args(args)
        .current_dir(data_dir)
        .env("OPTPORT_DATA_DIR", data_dir)
        .env_remove("OPTPORT_LOG")
        .env_remove("OPTPORT_IMPORT_DENYLIST_REGEX")
        .env_remove("OPTPORT_IMPORT_BLACKLIST_REGEX")
        .env_remove("OPTPORT_EXPORT_DENYLIST_REGEX")
        .env_remove("OPTPORT_EXPORT_BLACKLIST_REGEX")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn write_export(dir: &Path, contents: &str) -> String {
    let path = dir.join("incoming.json");
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_version() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_ok(dir.path(), &["version"]);
    assert!(stdout.contains("Export format version: 7"));
    assert!(stdout.contains("Oldest importable version: 2"));
}

#[test]
fn test_option_set_get_delete() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    run_ok(d, &["option", "set", "blogname", "Acme"]);
    run_ok(d, &["option", "set", "sidebars", r#"{"main": ["search"]}"#, "--json"]);

    assert_eq!(run_ok(d, &["option", "get", "blogname"]).trim(), "Acme");
    let json: serde_json::Value =
        serde_json::from_str(&run_ok(d, &["option", "get", "sidebars", "--json"])).unwrap();
    assert_eq!(json, serde_json::json!({"main": ["search"]}));

    run_ok(d, &["option", "delete", "blogname"]);
    let (_, stderr, code) = run_cli(d, &["option", "get", "blogname"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("option not found"));
}

#[test]
fn test_export_to_stdout_skips_transients() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    run_ok(d, &["option", "set", "blogname", "Acme"]);
    run_ok(d, &["option", "set", "_transient_feed", "x"]);
    run_ok(d, &["option", "set", "cron", "[]", "--json", "--no-autoload"]);

    let doc: serde_json::Value =
        serde_json::from_str(&run_ok(d, &["export", "--stdout"])).unwrap();
    assert_eq!(doc["version"], 7);
    assert_eq!(doc["options"]["blogname"], "Acme");
    assert!(doc["options"].get("_transient_feed").is_none());
    assert_eq!(doc["no_autoload"], serde_json::json!(["cron"]));
}

#[test]
fn test_export_writes_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    run_ok(d, &["config", "set", "site.name", "Acme Co"]);
    run_ok(d, &["option", "set", "blogname", "Acme"]);
    let stdout = run_ok(d, &["export"]);
    assert!(stdout.contains("acmeco.wp_options."));

    let written: Vec<_> = std::fs::read_dir(d)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with("acmeco.wp_options.") && n.ends_with(".json"))
        .collect();
    assert_eq!(written.len(), 1);
}

#[test]
fn test_import_run_all_with_override() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    run_ok(d, &["option", "set", "blogname", "Local"]);
    let file = write_export(
        d,
        r#"{"version": 7, "options": {"blogname": "Acme", "my_plugin": "on"}, "no_autoload": []}"#,
    );

    let report: serde_json::Value = serde_json::from_str(&run_ok(
        d,
        &["import", "run", &file, "--mode", "all", "--override", "--json"],
    ))
    .unwrap();
    assert_eq!(report["applied"], 2);
    assert_eq!(report["outcomes"][0]["name"], "blogname");
    assert_eq!(report["outcomes"][0]["status"], "applied");
    assert_eq!(run_ok(d, &["option", "get", "blogname"]).trim(), "Acme");
    assert_eq!(run_ok(d, &["option", "get", "my_plugin"]).trim(), "on");
}

#[test]
fn test_import_upload_then_apply_specific() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let file = write_export(
        d,
        r#"{"version": 5, "options": {"blogname": "Acme", "home": "http://acme.test"}}"#,
    );

    let uploaded: serde_json::Value =
        serde_json::from_str(&run_ok(d, &["import", "upload", &file, "--json"])).unwrap();
    let id = uploaded["id"].as_str().unwrap().to_string();
    assert_eq!(uploaded["options"].as_array().unwrap().len(), 2);

    let report: serde_json::Value = serde_json::from_str(&run_ok(
        d,
        &["import", "apply", &id, "--key", "home", "--key", "missing", "--json"],
    ))
    .unwrap();
    assert_eq!(report["mode"], "specific");
    assert_eq!(report["outcomes"][0]["status"], "applied");
    assert_eq!(report["outcomes"][1]["status"], "not_in_file");

    // the pending import is released after apply
    let (_, stderr, code) = run_cli(d, &["import", "apply", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_import_rejects_too_old_file() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let file = write_export(d, r#"{"version": 1, "options": {"blogname": "Old"}}"#);

    let (_, stderr, code) = run_cli(d, &["import", "run", &file, "--mode", "all"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("version 1"), "{stderr}");
    let names = run_ok(d, &["option", "list"]);
    assert!(names.trim().is_empty());
}

#[test]
fn test_import_deny_pattern_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    run_ok(d, &["config", "set", "import.denylist_regex", "/^mailserver_/"]);
    let file = write_export(
        d,
        r#"{"version": 7, "options": {"blogname": "Acme", "mailserver_pass": "secret"}}"#,
    );

    let report: serde_json::Value = serde_json::from_str(&run_ok(
        d,
        &[
            "import", "run", &file, "--key", "blogname", "--key", "mailserver_pass",
            "--override", "--json",
        ],
    ))
    .unwrap();
    assert_eq!(report["outcomes"][0]["status"], "applied");
    assert_eq!(report["outcomes"][1]["status"], "skipped_denied");
    let (_, _, code) = run_cli(d, &["option", "get", "mailserver_pass"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_rejects_bad_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let (_, stderr, code) = run_cli(d, &["config", "set", "import.denylist_regex", "/(/"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
    assert_eq!(run_ok(d, &["config", "get", "import.denylist_regex"]).trim(), "null");
}

#[test]
fn test_import_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let file = write_export(d, r#"{"version": 7, "options": {"blogname": "Acme"}}"#);
    let uploaded: serde_json::Value =
        serde_json::from_str(&run_ok(d, &["import", "upload", &file, "--json"])).unwrap();
    let id = uploaded["id"].as_str().unwrap();

    run_ok(d, &["import", "cancel", id]);
    let (_, _, code) = run_cli(d, &["import", "preview", id]);
    assert_eq!(code, 1);
}
