use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_tags_page(cache_dir: &Path, owner: &str, page: u32, records: serde_json::Value) {
    fs::create_dir_all(cache_dir).expect("mkdir cache");
    let path = cache_dir.join(format!("{owner}-tags-page{page:03}.json"));
    fs::write(path, serde_json::to_string_pretty(&records).expect("json")).expect("write page");
}

fn record(owner: &str, id: &str, taken: &str, keywords: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "owner": owner,
        "title": format!("photo {id}"),
        "taken_at": taken,
        "keywords": keywords,
        "url": format!("https://flickr.com/photos/{owner}/{id}"),
    })
}

#[test]
fn stats_prints_dense_monthly_grid_without_marker_keywords() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("home");
    let cache_dir = tmp.path().join("cache");

    write_tags_page(
        &cache_dir,
        "alice",
        1,
        json!([
            record("alice", "1", "2010-01-05 10:00:00", &["cat", "snow", "source-alice"]),
            record("alice", "2", "2010-03-09 08:30:00", &["cat", "source-alice"]),
        ]),
    );
    write_tags_page(
        &cache_dir,
        "bob",
        1,
        json!([record("bob", "9", "2010-01-20 18:00:00", &["dog", "source-bob"])]),
    );

    assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", &home)
        .env("PHOTOTAGS_CACHE_DIR", &cache_dir)
        .args(["stats", "--owner", "alice", "--owner", "bob"])
        .args(["--start", "2010-01", "--end", "2010-04"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice = 2 records, 3 keywords total"))
        .stdout(predicate::str::contains("bob = 1 records, 1 keywords total"))
        .stdout(predicate::str::contains("Total unique keywords across alice/bob: 3"))
        .stdout(predicate::str::contains("cat 2"))
        .stdout(predicate::str::contains(
            "yearmonth,alice-records,alice-keywords,bob-records,bob-keywords",
        ))
        .stdout(predicate::str::contains("2010-01,1,2,1,1"))
        .stdout(predicate::str::contains("2010-02,0,0,0,0"))
        .stdout(predicate::str::contains("2010-03,1,1,0,0"))
        .stdout(predicate::str::contains("2010-04,0,0,0,0"))
        .stdout(predicate::str::contains("source-alice").not());
}

#[test]
fn stats_writes_csv_file_when_requested() {
    let tmp = tempdir().expect("tempdir");
    let cache_dir = tmp.path().join("cache");
    let csv = tmp.path().join("out.csv");
    write_tags_page(
        &cache_dir,
        "alice",
        1,
        json!([record("alice", "1", "2012-06-01 00:00:00", &["sea", "source-alice"])]),
    );

    assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", tmp.path().join("home"))
        .env("PHOTOTAGS_CACHE_DIR", &cache_dir)
        .args(["stats", "--owner", "alice", "--start", "2012-05", "--end", "2012-06"])
        .arg("--csv-out")
        .arg(&csv)
        .assert()
        .success();

    let body = fs::read_to_string(&csv).expect("read csv");
    assert_eq!(
        body,
        "yearmonth,alice-records,alice-keywords\n2012-05,0,0\n2012-06,1,1\n"
    );
}

#[test]
fn stats_fails_on_malformed_cache_page() {
    let tmp = tempdir().expect("tempdir");
    let cache_dir = tmp.path().join("cache");
    fs::create_dir_all(&cache_dir).expect("mkdir");
    fs::write(cache_dir.join("alice-tags-page001.json"), "[{\"owner\": ").expect("write");

    assert_cmd::cargo::cargo_bin_cmd!("phototags")
        .current_dir(tmp.path())
        .env("PHOTOTAGS_HOME", tmp.path().join("home"))
        .env("PHOTOTAGS_CACHE_DIR", &cache_dir)
        .args(["stats", "--owner", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("alice-tags-page001.json"));
}
