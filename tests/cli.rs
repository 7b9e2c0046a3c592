//! Command-line behavior of the `reddittweeter` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reddittweeter(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("reddittweeter").unwrap();
    // Keep a developer's real config out of the tests
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_no_arguments_prints_usage() {
    let home = tempfile::tempdir().unwrap();
    reddittweeter(home.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Usage: reddittweeter SOURCEURL CONSUMER_KEY CONSUMER_SECRET ACCESS_KEY ACCESS_SECRET",
        ));
}

#[test]
fn test_wrong_credential_count_prints_usage() {
    let home = tempfile::tempdir().unwrap();
    for credentials in [vec![], vec!["one"], vec!["a", "b", "c"], vec!["a", "b", "c", "d", "e"]] {
        reddittweeter(home.path())
            .arg("https://www.reddit.com/r/rust/new.json")
            .args(&credentials)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Usage:"));
    }
    // Nothing was created before the usage check
    assert!(!home.path().join("reddittweeter.db").exists());
}

#[test]
fn test_non_http_source_rejected() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("dedup.db");
    reddittweeter(home.path())
        .arg("--database")
        .arg(&db)
        .args(["ftp://example.com/feed.json", "user", "pass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid source URL"));
    assert!(!db.exists());
}

#[test]
fn test_invalid_config_reported() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(&config, "max_posts = [not valid").unwrap();

    reddittweeter(home.path())
        .arg("--config")
        .arg(&config)
        .args(["https://www.reddit.com/r/rust/new.json", "user", "pass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

// ============================================================================
// Full runs against a mock feed and status endpoint
// ============================================================================

/// Serves a one-item listing and a status endpoint that accepts exactly one
/// post, and writes a config pointing at them into a fresh home directory.
async fn mock_service(extra_config: &str) -> (MockServer, tempfile::TempDir) {
    let server = MockServer::start().await;
    let listing = r#"{"kind": "Listing", "data": {"children": [
        {"kind": "t3", "data": {"id": "abc", "name": "t3_abc", "title": "From the CLI", "author": "alice"}}
    ]}}"#;
    Mock::given(method("GET"))
        .and(path("/r/rust/new.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        format!(
            "api_base_url = \"{}\"\npost_delay_ms = 0\n{}",
            server.uri(),
            extra_config
        ),
    )
    .unwrap();
    (server, home)
}

async fn run_binary(
    server: &MockServer,
    home: &std::path::Path,
    extra_args: &[&str],
) -> std::process::Output {
    let home = home.to_path_buf();
    let source = format!("{}/r/rust/new.json", server.uri());
    let extra_args: Vec<String> = extra_args.iter().map(|a| a.to_string()).collect();

    tokio::task::spawn_blocking(move || {
        reddittweeter(&home)
            .arg("--config")
            .arg(home.join("config.toml"))
            .arg("--database")
            .arg(home.join("dedup.db"))
            .args(&extra_args)
            .args([source.as_str(), "ck", "cs", "at", "as"])
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_full_run_posts_once() {
    let (server, home) = mock_service("").await;

    for _ in 0..2 {
        let output = run_binary(&server, home.path(), &[]).await;
        assert!(output.status.success(), "{:?}", output);
    }

    assert!(home.path().join("dedup.db").exists());
}

#[tokio::test]
async fn test_default_run_is_silent() {
    let (server, home) = mock_service("").await;

    for _ in 0..2 {
        let output = run_binary(&server, home.path(), &[]).await;
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stderr), "");
        assert!(output.stdout.is_empty());
    }
}

#[tokio::test]
async fn test_verbose_flag_logs_decisions() {
    let (server, home) = mock_service("").await;

    let first = run_binary(&server, home.path(), &["-v"]).await;
    assert!(first.status.success());
    let stderr = String::from_utf8_lossy(&first.stderr);
    assert!(stderr.contains("Published"), "stderr: {}", stderr);

    let second = run_binary(&server, home.path(), &["--verbose"]).await;
    assert!(second.status.success());
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("Already posted, skipping"), "stderr: {}", stderr);
    assert!(!stderr.contains("Published"));
}

#[tokio::test]
async fn test_verbose_config_key_logs_decisions() {
    let (server, home) = mock_service("verbose = true\n").await;

    let first = run_binary(&server, home.path(), &[]).await;
    assert!(first.status.success());
    let stderr = String::from_utf8_lossy(&first.stderr);
    assert!(stderr.contains("Published"), "stderr: {}", stderr);

    let second = run_binary(&server, home.path(), &[]).await;
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("Already posted, skipping"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_failed_publish_reported_once() {
    let server = MockServer::start().await;
    let listing = r#"{"kind": "Listing", "data": {"children": [
        {"kind": "t3", "data": {"id": "abc", "title": "Rejected", "author": "alice"}}
    ]}}"#;
    Mock::given(method("GET"))
        .and(path("/r/rust/new.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"title":"Unauthorized"}"#))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        format!("api_base_url = \"{}\"\n", server.uri()),
    )
    .unwrap();

    let output = run_binary(&server, home.path(), &[]).await;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Unauthorized").count(), 1, "stderr: {}", stderr);
}

#[test]
fn test_missing_database_directory_is_not_reported_as_lock() {
    let home = tempfile::tempdir().unwrap();
    reddittweeter(home.path())
        .arg("--database")
        .arg(home.path().join("missing").join("dedup.db"))
        .args(["http://127.0.0.1:9/feed.json", "user", "pass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open database"))
        .stderr(predicate::str::contains("Another instance").not());
}
