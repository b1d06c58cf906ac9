use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("top_k = 5"));
    assert!(contents.contains("# api_url ="));
    assert!(contents.contains("[transport]"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_set_top_k_keeps_other_keys() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "knowledgebases = [4]\ntop_k = 2\n").unwrap();

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", dir.path())
        .args(["config", "set-top-k", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("top_k = 9"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("top_k = 9"));
    assert!(contents.contains("knowledgebases = [4]"));
    assert!(contents.contains("# Context passages retrieved per turn"));
}

#[test]
fn test_set_top_k_rejects_zero() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", dir.path())
        .args(["config", "set-top-k", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}
