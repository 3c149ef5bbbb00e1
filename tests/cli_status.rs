mod common;

use assert_cmd::Command;
use common::{init_project, items_checksum, TestProject};
use predicates::prelude::*;

fn status_json(project: &TestProject) -> serde_json::Value {
    let output = Command::new(TestProject::navdir_bin())
        .args(["--json", "status"])
        .arg(project.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn status_not_initialized() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .arg("status")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("not initialized"));
}

#[test]
fn status_not_initialized_json() {
    let project = TestProject::new();
    let json = status_json(&project);
    assert_eq!(json["status"], "not_initialized");
}

#[test]
fn status_after_init_shows_ready() {
    let project = init_project();

    Command::new(TestProject::navdir_bin())
        .args(["status", "--detailed"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("navdir status for"))
        .stdout(predicate::str::contains("Ready"))
        .stdout(predicate::str::contains("verified"));
}

#[test]
fn status_json_counts() {
    let project = init_project();
    let json = status_json(&project);

    assert_eq!(json["status"], "ready");
    assert_eq!(json["data"]["category_count"], 3);
    assert_eq!(json["data"]["navigation_count"], 4);
    assert_eq!(json["data"]["featured_count"], 2);
    assert_eq!(json["data"]["files"][0]["checksum"], "verified");
    assert!(json.get("remote").is_none());
}

#[test]
fn status_degraded_on_checksum_mismatch() {
    let project = init_project();
    let wrong = "0".repeat(64);
    assert_ne!(wrong, items_checksum());
    project.write_navigation_file("navigation_001.json", &wrong);

    let json = status_json(&project);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["data"]["navigation_count"], 0);
}

#[test]
fn status_keeps_good_files_when_one_is_broken() {
    let project = init_project();
    project.write_file("data/navigation_002.json", "{ broken");

    let json = status_json(&project);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["data"]["navigation_count"], 4);
}

#[test]
fn status_checksum_skipped_when_disabled() {
    let project = init_project();
    let config = project
        .read_file(".navdir/config.toml")
        .replace("verify_checksum = true", "verify_checksum = false");
    project.write_file(".navdir/config.toml", &config);
    project.write_navigation_file("navigation_001.json", "deadbeef");

    let json = status_json(&project);
    assert_eq!(json["status"], "ready");
    assert_eq!(json["data"]["files"][0]["checksum"], "skipped");
}
