//! CLI integration tests for repost-cli.
//!
//! These tests run the actual binary with mock fingerprints and check
//! outputs, exit codes, and the persisted database.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for the repost binary.
fn repost() -> Command {
    let mut cmd = Command::cargo_bin("repost").unwrap();
    cmd.env_remove("DATABASE_URL")
        .env_remove("REPOST_THRESHOLD")
        .env_remove("REPOST_COOLDOWN_MS")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write_batch(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

/// Two posts of the same image followed by an unrelated one.
const BATCH: &str = r#"[
    {"identity": "p1", "content_locator": "https://i.redd.it/logo.png", "origin": "r/rust", "title": "Our logo"},
    {"identity": "p2", "content_locator": "https://i.redd.it/logo.png", "origin": "r/programming"},
    {"identity": "p3", "content_locator": "https://i.redd.it/sunset.jpg", "origin": "r/pics"}
]"#;

fn check(db: &str, batch: &str) -> assert_cmd::assert::Assert {
    repost()
        .args(["check", batch, "--db", db, "--mock", "--cooldown-ms", "0", "--json"])
        .assert()
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    repost()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Near-duplicate image detection"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("records"));
}

#[test]
fn test_version_displays_version() {
    repost()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("repost"));
}

#[test]
fn test_help_shows_exit_codes() {
    repost()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("66"))
        .stdout(predicate::str::contains("69"));
}

#[test]
fn test_check_help_shows_options() {
    repost()
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--db"))
        .stdout(predicate::str::contains("--memory"))
        .stdout(predicate::str::contains("--mock"))
        .stdout(predicate::str::contains("--threshold"))
        .stdout(predicate::str::contains("--cooldown-ms"))
        .stdout(predicate::str::contains("--proxy"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_unknown_flag_is_usage_error() {
    // Exit code 64 = EX_USAGE
    repost().args(["check", "--frobnicate"]).assert().code(64);
}

#[test]
fn test_malformed_proxy_is_usage_error() {
    repost()
        .args(["check", "posts.json", "--proxy", "not a url"])
        .assert()
        .code(64);
}

#[test]
fn test_missing_file_returns_input_error() {
    // Exit code 66 = EX_NOINPUT
    repost()
        .args(["check", "nonexistent_posts.json", "--memory", "--mock"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read input file"));
}

#[test]
fn test_invalid_json_returns_data_error() {
    let temp = TempDir::new().unwrap();
    let batch = write_batch(temp.path(), "posts.json", "{ not json");

    // Exit code 65 = EX_DATAERR
    repost()
        .args(["check", &batch, "--memory", "--mock"])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn test_blank_identity_returns_data_error() {
    let temp = TempDir::new().unwrap();
    let batch = write_batch(
        temp.path(),
        "posts.json",
        r#"[{"identity": "", "content_locator": "https://i.redd.it/a.jpg"}]"#,
    );

    repost()
        .args(["check", &batch, "--memory", "--mock"])
        .assert()
        .code(65);
}

#[test]
fn test_lookup_without_database_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("absent.db");

    repost()
        .args(["lookup", "p1", "--db", db.to_str().unwrap()])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read database"));
}

// ============================================================================
// Detection Tests
// ============================================================================

#[test]
fn test_check_reports_repost_in_memory() {
    let temp = TempDir::new().unwrap();
    let batch = write_batch(temp.path(), "posts.json", BATCH);

    repost()
        .args(["check", &batch, "--memory", "--mock", "--cooldown-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ORIGINAL"))
        .stdout(predicate::str::contains("REPOST"))
        .stdout(predicate::str::contains("100% similar"))
        .stdout(predicate::str::contains("r/rust"));
}

#[test]
fn test_check_json_output() {
    let temp = TempDir::new().unwrap();
    let batch = write_batch(temp.path(), "posts.json", BATCH);
    let db = temp.path().join("repost.db");

    let assert = check(db.to_str().unwrap(), &batch).success();
    let reports = stdout_json(&assert);
    let reports = reports.as_array().unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0]["status"], "recorded");
    assert_eq!(reports[0]["result"]["is_duplicate"], false);

    assert_eq!(reports[1]["identity"], "p2");
    assert_eq!(reports[1]["result"]["is_duplicate"], true);
    assert_eq!(reports[1]["result"]["matches"][0]["identity"], "p1");
    assert_eq!(reports[1]["result"]["similarity_score"], 100);

    assert_eq!(reports[2]["result"]["is_duplicate"], false);
}

#[test]
fn test_records_persist_across_runs() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("repost.db");
    let db = db.to_str().unwrap();

    let first = write_batch(
        temp.path(),
        "first.json",
        r#"[{"identity": "p1", "content_locator": "https://i.redd.it/logo.png"}]"#,
    );
    check(db, &first).success();

    let second = write_batch(
        temp.path(),
        "second.json",
        r#"[
            {"identity": "p1", "content_locator": "https://i.redd.it/logo.png"},
            {"identity": "p2", "content_locator": "https://i.redd.it/logo.png"}
        ]"#,
    );
    let assert = check(db, &second).success();
    let reports = stdout_json(&assert);

    assert_eq!(reports[0]["status"], "already_recorded");
    assert_eq!(reports[1]["status"], "recorded");
    assert_eq!(reports[1]["result"]["matches"][0]["identity"], "p1");

    // Recomputed, so p1 now sees the later p2
    let assert = repost()
        .args(["lookup", "p1", "--db", db, "--json"])
        .assert()
        .success();
    let lookup = stdout_json(&assert);
    assert_eq!(lookup["record"]["identity"], "p1");
    assert_eq!(lookup["result"]["is_duplicate"], true);
    assert_eq!(lookup["result"]["matches"][0]["identity"], "p2");

    let assert = repost()
        .args(["records", "--db", db, "--json"])
        .assert()
        .success();
    let records = stdout_json(&assert);
    assert_eq!(records["count"], 2);
}

#[test]
fn test_lookup_unknown_identity_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("repost.db");
    let db = db.to_str().unwrap();
    let batch = write_batch(temp.path(), "posts.json", BATCH);
    check(db, &batch).success();

    repost()
        .args(["lookup", "t3_missing", "--db", db])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("No record for identity"));
}

#[test]
fn test_feed_listing_input() {
    let temp = TempDir::new().unwrap();
    let batch = write_batch(
        temp.path(),
        "listing.json",
        r#"{"data": {"children": [
            {"data": {"id": "a1", "url": "https://i.redd.it/cat.jpg", "subreddit": "cats",
                      "permalink": "/r/cats/comments/a1/cat/", "title": "Cat"}},
            {"data": {"id": "a2", "url": "https://i.redd.it/cat.jpg", "subreddit": "aww",
                      "permalink": "/r/aww/comments/a2/cat/", "title": "Cat again"}},
            {"data": {"id": "a3", "is_self": true, "subreddit": "cats", "title": "Question"}}
        ]}}"#,
    );

    let assert = repost()
        .args(["check", &batch, "--memory", "--mock", "--cooldown-ms", "0", "--json"])
        .assert()
        .success();
    let reports = stdout_json(&assert);
    let reports = reports.as_array().unwrap();

    assert_eq!(reports.len(), 2);
    let matched = &reports[1]["result"]["matches"][0];
    assert_eq!(matched["origin"], "r/cats");
    assert_eq!(
        matched["external_link"],
        "https://reddit.com/r/cats/comments/a1/cat/"
    );
}

#[test]
fn test_repeated_identity_in_batch_is_reported_once() {
    let temp = TempDir::new().unwrap();
    let batch = write_batch(
        temp.path(),
        "posts.json",
        r#"[
            {"identity": "p1", "content_locator": "https://i.redd.it/a.jpg"},
            {"identity": "p1", "content_locator": "https://i.redd.it/a.jpg"}
        ]"#,
    );

    let assert = repost()
        .args(["check", &batch, "--memory", "--mock", "--cooldown-ms", "0", "--json"])
        .assert()
        .success();
    let reports = stdout_json(&assert);

    assert_eq!(reports[0]["status"], "recorded");
    assert_eq!(reports[1]["status"], "duplicate_in_batch");
}

#[test]
fn test_empty_records_listing() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("repost.db");
    let db = db.to_str().unwrap();
    let batch = write_batch(temp.path(), "posts.json", "[]");
    check(db, &batch).success().stdout(predicate::str::contains("[]"));

    // An empty batch never opens the store
    repost().args(["records", "--db", db]).assert().code(66);
}
