use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use tempfile::tempdir;

/// Minimal stand-in for the REST endpoint: every `getInfo` call gets the
/// same detail payload. Returns the base url.
fn serve_photo_details() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let detail = json!({
        "stat": "ok",
        "photo": {
            "dates": {"taken": "2010-06-01 10:00:00"},
            "tags": {"tag": [{"raw": "Lake"}, {"raw": " Dock "}]}
        }
    })
    .to_string();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                detail.len(),
                detail
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://127.0.0.1:{port}/services/rest/")
}

fn seed_listing(cache_dir: &Path, owner: &str) {
    fs::create_dir_all(cache_dir).expect("mkdir cache");
    let listing = json!({
        "stat": "ok",
        "photos": {
            "page": 1,
            "pages": 1,
            "photo": [{"id": "11", "title": "Dock"}, {"id": "12", "title": "Pier"}]
        }
    });
    fs::write(
        cache_dir.join(format!("{owner}-photostream-page001.json")),
        serde_json::to_string_pretty(&listing).expect("json"),
    )
    .expect("write listing");
}

#[test]
fn harvest_listing_without_credentials_touches_nothing() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("home");
    let cache_dir = tmp.path().join("cache");

    assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", &home)
        .env("PHOTOTAGS_CACHE_DIR", &cache_dir)
        .env_remove("PHOTOTAGS_API_KEY")
        .args(["harvest-listing", "--owner", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001_CONFIGURATION"));

    assert!(!cache_dir.exists());
}

#[test]
fn harvest_details_requires_cached_listing() {
    let tmp = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", tmp.path().join("home"))
        .env("PHOTOTAGS_CACHE_DIR", tmp.path().join("cache"))
        .env("PHOTOTAGS_API_KEY", "test-key")
        .env("PHOTOTAGS_API_BASE_URL", "http://127.0.0.1:9/services/rest")
        .args(["harvest-details", "--owner", "alice", "--start-page", "2", "--end-page", "2"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("resume with --start-page 2"))
        .stderr(predicate::str::contains("E002_MISSING_DEPENDENCY"));
}

#[test]
fn status_reports_paths_as_json() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("home");
    let cache_dir = tmp.path().join("cache");
    std::fs::create_dir_all(&cache_dir).expect("mkdir cache");

    assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", &home)
        .env("PHOTOTAGS_CACHE_DIR", &cache_dir)
        .env("PHOTOTAGS_API_KEY", "test-key")
        .env("PHOTOTAGS_OWNERS", "alice,bob")
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"command\": \"status\""))
        .stdout(predicate::str::contains("owner=alice photostream_pages=0 tags_pages=0"));
}

#[test]
fn harvest_details_json_output_is_a_single_document() {
    let tmp = tempdir().expect("tempdir");
    let cache_dir = tmp.path().join("cache");
    seed_listing(&cache_dir, "alice");

    let assert = assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", tmp.path().join("home"))
        .env("PHOTOTAGS_CACHE_DIR", &cache_dir)
        .env("PHOTOTAGS_API_KEY", "test-key")
        .env("PHOTOTAGS_API_BASE_URL", serve_photo_details())
        .args(["--json", "harvest-details", "--owner", "alice"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "https://flickr.com/photos/alice/11 - 2010-06-01 10:00:00 - dock - dock,lake,source-alice",
        ));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let report: Value = serde_json::from_str(&stdout).expect("stdout is one json document");
    assert_eq!(report["command"], "harvest-details");
    assert_eq!(report["ok"], true);
    let details = report["details"].as_array().expect("details");
    assert!(details.iter().any(|d| d == "records_written=2"));
    assert!(cache_dir.join("alice-tags-page001.json").is_file());
}

#[test]
fn harvest_details_plain_output_lists_display_lines() {
    let tmp = tempdir().expect("tempdir");
    let cache_dir = tmp.path().join("cache");
    seed_listing(&cache_dir, "alice");

    assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", tmp.path().join("home"))
        .env("PHOTOTAGS_CACHE_DIR", &cache_dir)
        .env("PHOTOTAGS_API_KEY", "test-key")
        .env("PHOTOTAGS_API_BASE_URL", serve_photo_details())
        .args(["harvest-details", "--owner", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://flickr.com/photos/alice/12 - 2010-06-01 10:00:00 - pier"))
        .stdout(predicate::str::contains("records_written=2"));
}
