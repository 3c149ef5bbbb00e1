mod common;

use assert_cmd::Command;
use common::{init_project, TestProject};
use predicates::prelude::*;

#[test]
fn validate_passes_on_clean_data() {
    let project = init_project();

    Command::new(TestProject::navdir_bin())
        .args(["validate", "--strict", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"));
}

#[test]
fn validate_reports_missing_category_reference() {
    let project = init_project();
    let categories = project
        .read_file("data/categories.json")
        .replace("\"id\": \"cat_1\"", "\"id\": \"cat_9\"");
    project.write_file("data/categories.json", &categories);

    let output = Command::new(TestProject::navdir_bin())
        .args(["--json", "validate", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["valid"], false);
    let messages: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert!(messages
        .iter()
        .any(|m| m.contains("category \"cat_1\" does not exist")));
}

#[test]
fn validate_strict_fails_on_warnings() {
    let project = init_project();
    project.write_navigation_file("navigation_001.json", "");

    Command::new(TestProject::navdir_bin())
        .args(["validate", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("meta.checksum is empty"));

    Command::new(TestProject::navdir_bin())
        .args(["validate", "--strict", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn validate_reports_unparsable_file() {
    let project = init_project();
    project.write_file("data/navigation_002.json", "{ not json");

    Command::new(TestProject::navdir_bin())
        .args(["validate", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("navigation_002.json"));
}

#[test]
fn validate_without_data_files_fails() {
    let project = TestProject::new();
    project.navdir_init();

    Command::new(TestProject::navdir_bin())
        .args(["validate", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Validation failed"));
}

#[test]
fn validate_fix_checksums_repairs_stale_file() {
    let project = init_project();
    project.write_navigation_file("navigation_001.json", &"0".repeat(64));

    Command::new(TestProject::navdir_bin())
        .args(["validate", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Checksum mismatch"));

    let output = Command::new(TestProject::navdir_bin())
        .args(["--json", "validate", "--fix-checksums", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["fixed"], serde_json::json!(["navigation_001.json"]));

    let file: serde_json::Value =
        serde_json::from_str(&project.read_file("data/navigation_001.json")).unwrap();
    assert_eq!(file["meta"]["checksum"], common::items_checksum());
    assert_eq!(file["items"][3]["rating"], 4);
}
