mod common;

use assert_cmd::Command;
use common::{init_project, TestProject};
use predicates::prelude::*;

fn search_json(project: &TestProject, args: &[&str]) -> serde_json::Value {
    let output = Command::new(TestProject::navdir_bin())
        .args(["--json", "search"])
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

#[test]
fn search_finds_item_by_title() {
    let project = init_project();

    Command::new(TestProject::navdir_bin())
        .args(["search", "Midjourney", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Midjourney"))
        .stdout(predicate::str::contains("https://www.midjourney.com"));
}

#[test]
fn search_json_output_structure() {
    let project = init_project();
    let json = search_json(&project, &["ChatGPT"]);

    assert_eq!(json["query"], "ChatGPT");
    assert_eq!(json["sort"], "relevance");
    assert!(json["results"].is_array());
    assert!(json["count"].as_u64().unwrap() > 0);

    let first = &json["results"][0];
    assert_eq!(first["item"]["id"], "nav_1");
    assert_eq!(first["category"]["name"], "AI Chat");
    assert!(first["score"].as_f64().unwrap() > 0.0);
    assert!(first["highlight_title"]
        .as_str()
        .unwrap()
        .contains("search-highlight"));
    assert!(first["matched_fields"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("title")));
}

#[test]
fn search_category_filter_applies_before_scoring() {
    let project = init_project();
    let json = search_json(&project, &["image", "--category", "cat_2"]);

    let results = json["results"].as_array().unwrap();
    assert!(!results.is_empty());
    for result in results {
        assert_eq!(result["item"]["categoryId"], "cat_2");
    }
}

#[test]
fn search_featured_filter() {
    let project = init_project();
    let json = search_json(&project, &["image", "--featured"]);

    for result in json["results"].as_array().unwrap() {
        assert_eq!(result["item"]["featured"], true);
    }
}

#[test]
fn search_date_range_is_inclusive() {
    let project = init_project();
    let json = search_json(
        &project,
        &["chatbot", "--from", "2024-02-15", "--to", "2024-02-15"],
    );

    let ids: Vec<&str> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["item"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["nav_2"]);
}

#[test]
fn search_sort_by_popularity() {
    let project = init_project();
    let json = search_json(&project, &["chatbot", "--sort", "popularity", "--tag", "chatbot"]);

    let visits: Vec<u64> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["item"]["visitCount"].as_u64().unwrap())
        .collect();
    assert_eq!(visits, vec![120, 80]);
}

#[test]
fn search_limit_and_offset() {
    let project = init_project();
    let json = search_json(
        &project,
        &["chatbot", "--tag", "chatbot", "--limit", "1", "--offset", "1"],
    );

    assert_eq!(json["total"], 2);
    assert_eq!(json["count"], 1);
    assert_eq!(json["offset"], 1);
}

#[test]
fn search_stats_included_on_request() {
    let project = init_project();
    let json = search_json(&project, &["chatbot", "--tag", "chatbot", "--stats"]);

    assert_eq!(json["stats"]["total_results"], 2);
    assert_eq!(json["stats"]["category_distribution"]["AI Chat"], 2);

    let without = search_json(&project, &["chatbot"]);
    assert!(without.get("stats").is_none());
}

#[test]
fn search_no_results_message() {
    let project = init_project();

    Command::new(TestProject::navdir_bin())
        .args(["search", "zzzzqqqq", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No results found"));
}

#[test]
fn search_records_history() {
    let project = init_project();
    search_json(&project, &["Claude"]);
    search_json(&project, &["Midjourney"]);

    let output = Command::new(TestProject::navdir_bin())
        .args(["--json", "history", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["entries"][0]["keyword"], "Midjourney");
    assert_eq!(json["entries"][1]["keyword"], "Claude");
}

#[test]
fn search_invalid_date_fails() {
    let project = init_project();

    Command::new(TestProject::navdir_bin())
        .args(["search", "chat", "--from", "yesterday", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn suggest_returns_completions() {
    let project = init_project();

    let output = Command::new(TestProject::navdir_bin())
        .args(["--json", "suggest", "chat", "--quick", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let texts: Vec<&str> = json["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["text"].as_str().unwrap())
        .collect();
    assert!(texts.contains(&"ChatGPT"));
    assert!(texts.contains(&"chatbot"));
}

#[test]
fn suggest_without_query_shows_recent_and_hot() {
    let project = init_project();
    search_json(&project, &["Claude"]);

    let output = Command::new(TestProject::navdir_bin())
        .args(["--json", "suggest", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["recent"], serde_json::json!(["Claude"]));
    assert_eq!(json["hot"][0], "ChatGPT");
}

fn result_ids(json: &serde_json::Value) -> Vec<String> {
    json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["item"]["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn search_refine_reuses_last_keyword_and_filters() {
    let project = init_project();
    let first = search_json(&project, &["image", "--featured"]);
    assert_eq!(result_ids(&first), vec!["nav_3"]);

    let refined = search_json(&project, &["--refine"]);
    assert_eq!(refined["query"], "image");
    assert_eq!(result_ids(&refined), vec!["nav_3"]);

    let widened = search_json(&project, &["--refine", "--reset-filters"]);
    assert!(result_ids(&widened).contains(&"nav_4".to_string()));

    let narrowed = search_json(&project, &["--refine", "--category", "cat_3"]);
    assert_eq!(result_ids(&narrowed), vec!["nav_4"]);
}

#[test]
fn search_refine_without_history_fails() {
    let project = init_project();

    Command::new(TestProject::navdir_bin())
        .args(["search", "--refine", "--path"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No previous search to refine"));
}
