//! CLI tests for the `lp` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lakeplan.yml"), "llm:\n  provider: none\n").unwrap();
    fs::write(
        dir.path().join("request.json"),
        r#"{
  "url": "jdbc://example.com:8080/sales/public?user=alice",
  "ddl": [{"statement": "CREATE TABLE sales.public.orders (id BIGINT, total DOUBLE)"}],
  "queries": [{"queryid": "q1", "query": "SELECT id FROM sales.public.orders", "runquantity": 4}]
}"#,
    )
    .unwrap();
    dir
}

fn lp(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lp").unwrap();
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(dir.path().join("lakeplan.yml"));
    cmd
}

#[test]
fn test_plan_prints_deterministic_plan() {
    let dir = workspace();
    lp(&dir)
        .args(["plan", "--request", "request.json", "--no-advisor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE SCHEMA sales.opt_"))
        .stdout(predicate::str::contains("\"queryid\":\"q1\""))
        .stderr(predicate::str::contains("deterministic"));
}

#[test]
fn test_plan_reads_stdin() {
    let dir = workspace();
    let request = fs::read_to_string(dir.path().join("request.json")).unwrap();
    lp(&dir)
        .args(["plan", "--request", "-", "--pretty"])
        .write_stdin(request)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"migrations\": ["));
}

#[test]
fn test_plan_rejects_bad_request() {
    let dir = workspace();
    fs::write(dir.path().join("bad.json"), "{\"ddl\": []}").unwrap();
    lp(&dir)
        .args(["plan", "--request", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid planning request JSON"));
}

#[test]
fn test_check_url_json() {
    let dir = workspace();
    lp(&dir)
        .args([
            "check-url",
            "jdbc:trino://example.com:8443/sales/public?user=alice&password=pw&ssl=true",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"port\": 8443"))
        .stdout(predicate::str::contains("\"tls\": true"))
        .stdout(predicate::str::contains("pw").not());
}

#[test]
fn test_check_url_without_user_fails() {
    let dir = workspace();
    lp(&dir)
        .args(["check-url", "jdbc://example.com:8080/sales"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Connection URL rejected"));
}
