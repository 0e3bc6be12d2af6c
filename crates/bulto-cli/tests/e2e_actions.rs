//! E2E CLI tests covering:
//! - `bulto action` dry runs: accepted requests and policy denials
//! - `bulto search` bulk lookups against a snapshot directory
//! - `bulto completions`
//!
//! Each test runs the `bulto` binary as a subprocess in an isolated temp
//! directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn bulto_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bulto"));
    cmd.current_dir(dir);
    cmd.env("BULTO_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd.args(["--tz-offset", "utc"]);
    cmd
}

fn snapshot(code: &str, status: &str) -> Value {
    json!({
        "shipmentCode": code,
        "statusCode": status,
        "shipmentEvents": [
            {"code": status, "type": "STATUS", "date": "2024-03-01T10:00:00Z"}
        ],
        "packages": [
            {"itemCode": "IT-1", "events": [
                {"code": "1500", "type": "STATUS", "date": "2024-03-01T08:00:00Z"},
                {"code": status, "type": "STATUS", "date": "2024-03-01T10:00:00Z"}
            ]}
        ]
    })
}

fn write_snapshot(dir: &Path, name: &str, status: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, snapshot("SH-1", status).to_string()).expect("write snapshot");
    path
}

fn json_stdout(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn json_stderr(output: &std::process::Output) -> Value {
    assert!(!output.status.success(), "command unexpectedly succeeded");
    serde_json::from_slice(&output.stderr).expect("valid JSON error on stderr")
}

// ---------------------------------------------------------------------------
// action
// ---------------------------------------------------------------------------

#[test]
fn cancel_latest_status_prints_request() {
    let dir = TempDir::new().expect("tempdir");
    let snap = write_snapshot(dir.path(), "snap.json", "2100");
    let output = bulto_cmd(dir.path())
        .args(["action", "cancel", "--snapshot"])
        .arg(&snap)
        .args(["--item", "IT-1", "--reason", "wrong scan", "--format", "json"])
        .output()
        .expect("bulto should not crash");
    let out = json_stdout(&output);
    assert_eq!(out["dry_run"], true);
    assert_eq!(out["receipt"]["action"], "cancel_status");
    assert_eq!(out["receipt"]["requires_refetch"], true);
    assert_eq!(out["request"]["itemCode"], "IT-1");
    assert_eq!(out["request"]["reason"], "wrong scan");
    assert_eq!(out["request"]["statusTimestamp"], "2024-03-01T10:00:00Z");
}

#[test]
fn cancel_outside_cancellable_set_is_denied() {
    let dir = TempDir::new().expect("tempdir");
    let snap = write_snapshot(dir.path(), "snap.json", "2500");
    let output = bulto_cmd(dir.path())
        .args(["action", "cancel", "--snapshot"])
        .arg(&snap)
        .args(["--item", "IT-1", "--reason", "x", "--format", "json"])
        .output()
        .expect("bulto should not crash");
    let err = json_stderr(&output);
    assert_eq!(err["error"]["error_code"], "E3001");
    assert!(output.stdout.is_empty());
}

#[test]
fn cancel_older_status_is_refused() {
    let dir = TempDir::new().expect("tempdir");
    let snap = write_snapshot(dir.path(), "snap.json", "2100");
    bulto_cmd(dir.path())
        .args(["action", "cancel", "--snapshot"])
        .arg(&snap)
        .args(["--item", "IT-1", "--reason", "x", "--at", "2024-03-01T08:00:00Z"])
        .args(["--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E3002]"));
}

#[test]
fn blank_reason_is_invalid_request() {
    let dir = TempDir::new().expect("tempdir");
    let snap = write_snapshot(dir.path(), "snap.json", "2100");
    bulto_cmd(dir.path())
        .args(["action", "cancel", "--snapshot"])
        .arg(&snap)
        .args(["--item", "IT-1", "--reason", "  ", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E3003]"));
}

#[test]
fn deliver_denied_for_warehouse_status() {
    let dir = TempDir::new().expect("tempdir");
    let snap = write_snapshot(dir.path(), "snap.json", "1500");
    bulto_cmd(dir.path())
        .args(["action", "deliver", "--pudo", "--snapshot"])
        .arg(&snap)
        .args(["--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E3001]"))
        .stderr(predicate::str::contains("deliver not allowed for status 1500"));
}

#[test]
fn deliver_without_signee_needs_pudo() {
    let dir = TempDir::new().expect("tempdir");
    let snap = write_snapshot(dir.path(), "snap.json", "2100");
    bulto_cmd(dir.path())
        .args(["action", "deliver", "--snapshot"])
        .arg(&snap)
        .args(["--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("signee"));

    bulto_cmd(dir.path())
        .args(["action", "deliver", "--snapshot"])
        .arg(&snap)
        .args(["--signee", "Ana", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("deliver\tok\tdry_run\n"));
}

#[test]
fn assign_uses_custom_policy() {
    let dir = TempDir::new().expect("tempdir");
    let snap = write_snapshot(dir.path(), "snap.json", "2500");
    let policy = dir.path().join("ops.toml");
    std::fs::write(&policy, "assignable = [\"2500\"]\n").expect("write policy");
    let output = bulto_cmd(dir.path())
        .arg("--policy")
        .arg(&policy)
        .args(["action", "assign", "--route", "R-7", "--snapshot"])
        .arg(&snap)
        .args(["--format", "json"])
        .output()
        .expect("bulto should not crash");
    let out = json_stdout(&output);
    assert_eq!(out["request"]["routeCode"], "R-7");
    assert_eq!(out["request"]["shipmentCode"], "SH-1");
}

#[test]
fn manual_event_passes_payload_through() {
    let dir = TempDir::new().expect("tempdir");
    let payload = dir.path().join("event.json");
    std::fs::write(&payload, json!({"code": "X1", "note": "manual"}).to_string()).expect("write");
    let output = bulto_cmd(dir.path())
        .args(["action", "event"])
        .arg(&payload)
        .args(["--format", "json"])
        .output()
        .expect("bulto should not crash");
    let out = json_stdout(&output);
    assert_eq!(out["request"], json!({"code": "X1", "note": "manual"}));
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

fn source_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    for (id, status) in [("T1", "2100"), ("T3", "1500")] {
        std::fs::write(
            dir.path().join(format!("{id}.json")),
            snapshot(&format!("SH-{id}"), status).to_string(),
        )
        .expect("write snapshot");
    }
    dir
}

#[test]
fn search_keeps_input_order_and_reports_misses() {
    let dir = source_dir();
    let output = bulto_cmd(dir.path())
        .args(["search", "--source", "."])
        .args(["T3", "T2", "T1", "T3", "--format", "json"])
        .output()
        .expect("bulto should not crash");
    let out = json_stdout(&output);
    let rows = out.as_array().expect("array");
    assert_eq!(rows.len(), 3, "duplicates collapse");
    assert_eq!(rows[0]["id"], "T3");
    assert_eq!(rows[0]["shipment_code"], "SH-T3");
    assert_eq!(rows[1]["found"], false);
    assert_eq!(rows[1]["error_code"], "E2001");
    assert_eq!(rows[2]["status_code"], "2100");
    assert_eq!(rows[2]["actions"], "CD-");
}

#[test]
fn search_reads_identifiers_from_stdin() {
    let dir = source_dir();
    bulto_cmd(dir.path())
        .args(["search", "--source", ".", "--format", "text"])
        .write_stdin("T1, T3;\nT9\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#\tID\tSHIPMENT"))
        .stdout(predicate::str::contains("1\tT1\tSH-T1\t2100"))
        .stdout(predicate::str::contains("3\tT9\t-\t-\t-\t0\tE2001"));
}

#[test]
fn search_without_identifiers_fails() {
    let dir = source_dir();
    bulto_cmd(dir.path())
        .args(["search", "--source", ".", "--format", "text"])
        .write_stdin(" ,; \n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No tracking identifiers"));
}

#[test]
fn search_respects_project_cap() {
    let dir = source_dir();
    std::fs::create_dir(dir.path().join(".bulto")).expect("mkdir");
    std::fs::write(dir.path().join(".bulto/config.toml"), "[search]\nmax_ids = 2\n")
        .expect("write config");
    let output = bulto_cmd(dir.path())
        .args(["search", "--source", ".", "T1", "T2", "T3", "--format", "json"])
        .output()
        .expect("bulto should not crash");
    let out = json_stdout(&output);
    assert_eq!(out.as_array().map(Vec::len), Some(2));
}

// ---------------------------------------------------------------------------
// completions / timing
// ---------------------------------------------------------------------------

#[test]
fn completions_generate_for_bash() {
    let dir = TempDir::new().expect("tempdir");
    bulto_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bulto"));
}

#[test]
fn timing_report_goes_to_stderr() {
    let dir = TempDir::new().expect("tempdir");
    bulto_cmd(dir.path())
        .args(["--timing", "eligibility", "2100", "--format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("cmd.eligibility"));
}
