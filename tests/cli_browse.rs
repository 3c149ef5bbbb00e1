mod common;

use assert_cmd::Command;
use common::{init_project, TestProject};
use predicates::prelude::*;

fn run_json(project: &TestProject, args: &[&str]) -> serde_json::Value {
    let output = Command::new(TestProject::navdir_bin())
        .arg("--json")
        .args(args)
        .arg("--path")
        .arg(project.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

fn ids(items: &serde_json::Value) -> Vec<&str> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect()
}

#[test]
fn list_shows_all_items_in_file_order() {
    let project = init_project();
    let json = run_json(&project, &["list"]);

    assert_eq!(json["total"], 4);
    assert_eq!(json["page"], 1);
    assert_eq!(json["page_size"], 20);
    assert_eq!(ids(&json["items"]), vec!["nav_1", "nav_2", "nav_3", "nav_4"]);
}

#[test]
fn list_filters_by_category_and_featured() {
    let project = init_project();

    let chat = run_json(&project, &["list", "--category", "cat_1"]);
    assert_eq!(ids(&chat["items"]), vec!["nav_1", "nav_2"]);

    let featured = run_json(&project, &["list", "--featured"]);
    assert_eq!(ids(&featured["items"]), vec!["nav_1", "nav_3"]);
}

#[test]
fn list_paginates() {
    let project = init_project();
    let json = run_json(&project, &["list", "--page-size", "3", "--page", "2"]);

    assert_eq!(json["total_pages"], 2);
    assert_eq!(ids(&json["items"]), vec!["nav_4"]);
}

#[test]
fn list_popular_orders_by_visits() {
    let project = init_project();
    let json = run_json(&project, &["list", "--popular"]);

    assert_eq!(ids(&json["items"]), vec!["nav_1", "nav_3", "nav_2", "nav_4"]);
}

#[test]
fn list_follows_sort_and_default_category_preferences() {
    let project = init_project();
    run_json(&project, &["prefs", "set", "sortBy", "title"]);
    run_json(&project, &["prefs", "set", "defaultCategory", "cat_1"]);

    let json = run_json(&project, &["list"]);
    assert_eq!(ids(&json["items"]), vec!["nav_1", "nav_2"]);

    let all = run_json(&project, &["list", "--all"]);
    assert_eq!(
        ids(&all["items"]),
        vec!["nav_1", "nav_2", "nav_3", "nav_4"]
    );

    run_json(&project, &["prefs", "set", "sortBy", "rating"]);
    let by_rating = run_json(&project, &["list", "--all"]);
    assert_eq!(
        ids(&by_rating["items"]),
        vec!["nav_1", "nav_2", "nav_3", "nav_4"]
    );
}

#[test]
fn categories_flat_list_counts_items() {
    let project = init_project();
    let json = run_json(&project, &["categories"]);

    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    let upscaling = rows.iter().find(|r| r["id"] == "cat_3").unwrap();
    assert_eq!(upscaling["navigation_count"], 1);
    assert_eq!(upscaling["parentId"], "cat_2");

    let art = rows.iter().find(|r| r["id"] == "cat_2").unwrap();
    assert_eq!(art["child_count"], 1);
}

#[test]
fn categories_tree_nests_children() {
    let project = init_project();
    let json = run_json(&project, &["categories", "--tree"]);

    let roots = json.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], "cat_1");
    assert_eq!(roots[1]["children"][0]["id"], "cat_3");
}

#[test]
fn categories_path_of_child() {
    let project = init_project();

    Command::new(TestProject::navdir_bin())
        .args(["categories", "--path-of", "cat_3", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("AI Art > Upscaling"));
}

#[test]
fn categories_tree_marks_selection() {
    let project = init_project();
    let json = run_json(&project, &["categories", "--tree", "--select", "cat_3"]);

    let roots = json.as_array().unwrap();
    assert_eq!(roots[0]["selected"], false);
    assert_eq!(roots[1]["children"][0]["selected"], true);
}
