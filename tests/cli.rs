use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::{contains, is_empty};
use tempfile::TempDir;

fn kvstores() -> Command {
    Command::cargo_bin("kvstores").unwrap()
}

// `kvstores -V` should print the version
#[test]
fn cli_version() {
    kvstores()
        .args(&["-V"])
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_exec_capacity_scenario() {
    kvstores()
        .args(&[
            "--array-capacity",
            "2",
            "exec",
            "SET a 1",
            "SET b 2",
            "SET c 3",
            "DEL a",
            "SET c 3",
            "GET b",
            "GET a",
            "STATS",
        ])
        .assert()
        .success()
        .stdout(contains("FULL Array storage full"))
        .stdout(contains("OK Deleted successfully"))
        .stdout(contains("OK 2"))
        .stdout(contains("NO_EXIST Key not found"))
        .stdout(contains("array count=2 remaining=0 max=2"));
}

#[test]
fn cli_exec_value_with_spaces_and_scan() {
    kvstores()
        .args(&[
            "exec",
            "RSET b second value",
            "RSET a first",
            "RGET b",
            "SCAN rbtree",
        ])
        .assert()
        .success()
        .stdout(contains("OK second value"))
        .stdout(contains("a first\nb second value"));
}

#[test]
fn cli_malformed_command_is_not_a_failure() {
    kvstores()
        .args(&["exec", "PUT a 1", "SET a"])
        .assert()
        .success()
        .stdout(contains("ERROR Unknown command"))
        .stdout(contains("ERROR Value required"));
}

#[test]
fn cli_bad_scan_target_does_not_stop_the_run() {
    kvstores()
        .args(&["exec", "SCAN btree", "SCAN", "SET a 1", "GET a"])
        .assert()
        .success()
        .stdout(contains("ERROR Unknown target: btree"))
        .stdout(contains("ERROR Target required"))
        .stdout(contains("OK Set successfully"))
        .stdout(contains("OK 1"));
}

#[test]
fn cli_invalid_capacity() {
    kvstores()
        .args(&["--rbtree-capacity", "0", "stats"])
        .assert()
        .failure();
    kvstores()
        .args(&["--hash-capacity", "lots", "stats"])
        .assert()
        .failure();
    kvstores()
        .args(&["--array-capacity", "100000000000", "stats"])
        .assert()
        .failure()
        .stderr(contains("array_capacity must be at most"));
}

#[test]
fn cli_invalid_threads() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let script = temp_dir.path().join("script.txt");
    fs::write(&script, "SET a 1\nGET a\n").unwrap();

    for pool in &["shared", "rayon"] {
        kvstores()
            .args(&["replay"])
            .arg(&script)
            .args(&["--threads", "0", "--pool", *pool])
            .assert()
            .failure()
            .stdout(is_empty())
            .stderr(contains("threads must be positive"));
    }
}

#[test]
fn cli_config_file() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let config = temp_dir.path().join("stores.json");
    fs::write(&config, r#"{"array_capacity": 3, "hash_capacity": 5}"#).unwrap();

    kvstores()
        .args(&["--config", config.to_str().unwrap(), "--hash-capacity", "6", "stats"])
        .assert()
        .success()
        .stdout(contains("array count=0 remaining=3 max=3"))
        .stdout(contains("hash count=0 remaining=6 max=6"))
        .stdout(contains("rbtree count=0 remaining=1024 max=1024"));
}

#[test]
fn cli_replay_script() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let script = temp_dir.path().join("script.txt");
    let mut lines = vec!["# fill the hash table".to_owned(), String::new()];
    lines.extend((0..12).map(|i| format!("HSET k{} v{}", i, i)));
    fs::write(&script, lines.join("\n")).unwrap();

    for pool in &["shared", "rayon"] {
        kvstores()
            .args(&["--hash-capacity", "8", "replay"])
            .arg(&script)
            .args(&["--threads", "3", "--pool", *pool])
            .assert()
            .success()
            .stdout(contains("hash count=8 remaining=0 max=8"))
            .stdout(contains("FULL Hash storage full"));
    }
}

#[test]
fn cli_replay_missing_file() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    kvstores()
        .args(&["replay"])
        .arg(temp_dir.path().join("nope.txt"))
        .assert()
        .failure();
}
