mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

#[test]
fn init_creates_navdir_directory() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .arg("init")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("navdir initialized"));

    assert!(project.path().join(".navdir").exists());
    assert!(project.path().join(".navdir/config.toml").exists());
    assert!(project.path().join(".navdir/store.db").exists());
}

#[test]
fn init_json_output() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .args(["--json", "init"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"initialized\""));
}

#[test]
fn init_twice_fails_without_force() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .arg("init")
        .arg(project.path())
        .assert()
        .success();

    Command::new(TestProject::navdir_bin())
        .arg("init")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_force_reinitializes() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .arg("init")
        .arg(project.path())
        .assert()
        .success();

    Command::new(TestProject::navdir_bin())
        .args(["init", "--force"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("navdir initialized"));
}

#[test]
fn init_default_config_is_valid_toml() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .arg("init")
        .arg(project.path())
        .assert()
        .success();

    let config_content = project.read_file(".navdir/config.toml");
    let parsed: toml::Value = toml::from_str(&config_content).unwrap();

    assert!(parsed.get("data").is_some());
    assert!(parsed.get("search").is_some());
    assert!(parsed.get("remote").is_some());
    assert_eq!(parsed["data"]["verify_checksum"].as_bool(), Some(true));
}

#[test]
fn init_updates_gitignore() {
    let project = TestProject::new();
    project.write_file(".gitignore", "target/\n");

    Command::new(TestProject::navdir_bin())
        .arg("init")
        .arg(project.path())
        .assert()
        .success();

    let gitignore = project.read_file(".gitignore");
    assert!(gitignore.contains(".navdir/"));
}

#[test]
fn init_warns_about_missing_data_dir() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .arg("init")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Data directory does not exist"));
}

#[test]
fn init_quiet_suppresses_output() {
    let project = TestProject::new();

    Command::new(TestProject::navdir_bin())
        .args(["--quiet", "init"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn commands_require_init() {
    let project = TestProject::new();
    project.write_data_fixtures();

    Command::new(TestProject::navdir_bin())
        .args(["search", "chat", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("navdir init"));
}
