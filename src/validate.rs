//! Structural and referential checks over the data files.
//!
//! Nothing here is fatal: every problem becomes an [`Issue`] in a
//! [`ValidationReport`], split into errors (the data is wrong) and
//! warnings (the data is suspicious).

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use crate::data::DataSource;
use crate::types::{parse_timestamp, Category, CategoryDataFile, Navigation, NavigationDataFile};

const ID_MAX: usize = 50;
const CATEGORY_NAME_MAX: usize = 50;
const CATEGORY_DESCRIPTION_MAX: usize = 200;
const CATEGORY_ICON_MAX: usize = 50;
const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;
const URL_MAX: usize = 2000;
const TAG_MAX: usize = 20;
const VERSION_MAX: usize = 20;
const MAX_TAGS: usize = 10;
const MIN_DESCRIPTION: usize = 10;
const MAX_ORDER: i64 = 999;
const MAX_LEVEL: i64 = 10;

fn category_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^cat_\d+$").unwrap())
}

fn navigation_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^nav_\d+$").unwrap())
}

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Issue {
            field: field.into(),
            message: message.into(),
            value: None,
        });
    }

    fn error_with(&mut self, field: impl Into<String>, message: impl Into<String>, value: &str) {
        self.errors.push(Issue {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        });
    }

    fn warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Issue {
            field: field.into(),
            message: message.into(),
            value: None,
        });
    }

    fn warning_with(&mut self, field: impl Into<String>, message: impl Into<String>, value: &str) {
        self.warnings.push(Issue {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        });
    }

    /// Append `other`, qualifying each field as `{prefix}.{field}`
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationReport) {
        let qualify = |mut issue: Issue| {
            issue.field = format!("{prefix}.{}", issue.field);
            issue
        };
        self.errors.extend(other.errors.into_iter().map(qualify));
        self.warnings.extend(other.warnings.into_iter().map(qualify));
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    fn check_string(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.error(field, format!("{field} must be at most {max} characters"));
        } else if value.trim().is_empty() {
            self.error(field, format!("{field} must not be blank"));
        }
    }

    fn check_optional_string(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.check_string(field, value, max);
        }
    }

    fn check_required(&mut self, field: &str, value: &str) -> bool {
        if value.is_empty() {
            self.error(field, format!("{field} is required"));
            return false;
        }
        true
    }

    fn check_date(&mut self, field: &str, value: &str) {
        if !value.is_empty() && parse_timestamp(value).is_none() {
            self.error_with(field, format!("{field} must be a valid date"), value);
        }
    }

    fn check_url(&mut self, field: &str, value: &str) {
        if !value.is_empty() && reqwest::Url::parse(value).is_err() {
            self.error_with(field, format!("{field} must be a valid URL"), value);
        }
    }

    fn check_range(&mut self, field: &str, value: f64, min: f64, max: Option<f64>) {
        if !value.is_finite() {
            self.error(field, format!("{field} must be a valid number"));
        } else if value < min {
            self.error(field, format!("{field} must not be less than {min}"));
        } else if let Some(max) = max.filter(|max| value > *max) {
            self.error(field, format!("{field} must not be greater than {max}"));
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Validation passed")?;
        } else {
            write!(f, "Validation failed")?;
        }
        if !self.errors.is_empty() {
            write!(f, "\n\nErrors:")?;
            for issue in &self.errors {
                write!(f, "\n  • {issue}")?;
            }
        }
        if !self.warnings.is_empty() {
            write!(f, "\n\nWarnings:")?;
            for issue in &self.warnings {
                write!(f, "\n  • {issue}")?;
            }
        }
        Ok(())
    }
}

/// Check one category and, recursively, its children
pub fn validate_category(category: &Category) -> ValidationReport {
    let mut report = ValidationReport::default();

    if report.check_required("id", &category.id) {
        report.check_string("id", &category.id, ID_MAX);
    }
    if report.check_required("name", &category.name) {
        report.check_string("name", &category.name, CATEGORY_NAME_MAX);
    }
    report.check_optional_string(
        "description",
        category.description.as_deref(),
        CATEGORY_DESCRIPTION_MAX,
    );
    report.check_optional_string("icon", category.icon.as_deref(), CATEGORY_ICON_MAX);
    report.check_optional_string("parentId", category.parent_id.as_deref(), ID_MAX);
    if let Some(color) = category.color.as_deref().filter(|c| !c.is_empty()) {
        if !color_regex().is_match(color) {
            report.error_with("color", "color must be #rgb or #rrggbb", color);
        }
    }
    report.check_range("order", category.order as f64, 0.0, Some(MAX_ORDER as f64));
    report.check_range("level", category.level as f64, 0.0, Some(MAX_LEVEL as f64));
    report.check_date("createTime", &category.create_time);
    report.check_date("updateTime", &category.update_time);

    for (index, child) in category.children.iter().enumerate() {
        report.merge_prefixed(&format!("children[{index}]"), validate_category(child));
    }

    if !category.id.is_empty() && !category_id_regex().is_match(&category.id) {
        report.warning_with("id", "id should look like cat_<number>", &category.id);
    }
    match (&category.parent_id, category.level) {
        (Some(_), 0) => report.error("level", "a category with a parentId must not be level 0"),
        (None, level) if level > 0 => {
            report.error("parentId", "a category below level 0 needs a parentId")
        }
        _ => {}
    }
    if category.color.as_deref() == Some("#000000") {
        report.warning("color", "pure black is hard to read as a category color");
    }
    if category.order == 0 {
        report.warning("order", "order 0 leaves the display order ambiguous");
    }

    report
}

pub fn validate_category_file(file: &CategoryDataFile) -> ValidationReport {
    let mut report = ValidationReport::default();

    if report.check_required("version", &file.version) {
        report.check_string("version", &file.version, VERSION_MAX);
    }
    if report.check_required("lastUpdate", &file.last_update) {
        report.check_date("lastUpdate", &file.last_update);
    }
    for (index, category) in file.categories.iter().enumerate() {
        report.merge_prefixed(&format!("categories[{index}]"), validate_category(category));
    }

    report
}

pub fn validate_navigation(navigation: &Navigation) -> ValidationReport {
    let mut report = ValidationReport::default();

    if report.check_required("id", &navigation.id) {
        report.check_string("id", &navigation.id, ID_MAX);
    }
    if report.check_required("title", &navigation.title) {
        report.check_string("title", &navigation.title, TITLE_MAX);
    }
    if !navigation.description.is_empty() {
        report.check_string("description", &navigation.description, DESCRIPTION_MAX);
    }
    if report.check_required("url", &navigation.url) {
        if navigation.url.chars().count() > URL_MAX {
            report.error("url", format!("url must be at most {URL_MAX} characters"));
        }
        report.check_url("url", &navigation.url);
    }
    if let Some(icon) = &navigation.icon {
        report.check_url("icon", icon);
    }
    if report.check_required("categoryId", &navigation.category_id) {
        report.check_string("categoryId", &navigation.category_id, ID_MAX);
    }
    report.check_range("rating", navigation.rating, 0.0, Some(5.0));
    report.check_date("createTime", &navigation.create_time);
    report.check_date("updateTime", &navigation.update_time);

    for (index, tag) in navigation.tags.iter().enumerate() {
        if tag.chars().count() > TAG_MAX {
            report.error_with(
                format!("tags[{index}]"),
                format!("tags must be at most {TAG_MAX} characters"),
                tag,
            );
        }
    }

    if !navigation.id.is_empty() && !navigation_id_regex().is_match(&navigation.id) {
        report.warning_with("id", "id should look like nav_<number>", &navigation.id);
    }
    if !navigation.url.is_empty()
        && !navigation.url.starts_with("http://")
        && !navigation.url.starts_with("https://")
    {
        report.warning_with("url", "url should use https://", &navigation.url);
    }
    if navigation.tags.len() > MAX_TAGS {
        report.warning("tags", format!("more than {MAX_TAGS} tags"));
    }
    let description_len = navigation.description.chars().count();
    if description_len > 0 && description_len < MIN_DESCRIPTION {
        report.warning(
            "description",
            format!("description shorter than {MIN_DESCRIPTION} characters"),
        );
    }

    report
}

pub fn validate_navigation_file(file: &NavigationDataFile) -> ValidationReport {
    let mut report = ValidationReport::default();

    if report.check_required("version", &file.version) {
        report.check_string("version", &file.version, VERSION_MAX);
    }
    if file.file_index < 1 {
        report.error("fileIndex", "fileIndex must not be less than 1");
    }
    if file.total_files < 1 {
        report.error("totalFiles", "totalFiles must not be less than 1");
    } else if file.file_index > file.total_files {
        report.warning("fileIndex", "fileIndex is greater than totalFiles");
    }
    if report.check_required("lastUpdate", &file.last_update) {
        report.check_date("lastUpdate", &file.last_update);
    }
    for (index, navigation) in file.items.iter().enumerate() {
        report.merge_prefixed(&format!("items[{index}]"), validate_navigation(navigation));
    }

    if file.meta.total_items as usize != file.items.len() {
        report.warning(
            "meta.totalItems",
            format!(
                "meta.totalItems is {} but the file holds {} items",
                file.meta.total_items,
                file.items.len()
            ),
        );
    }
    if file.meta.active_items > file.meta.total_items {
        report.error("meta.activeItems", "meta.activeItems exceeds meta.totalItems");
    }
    if file.meta.checksum.trim().is_empty() {
        report.warning("meta.checksum", "meta.checksum is empty");
    }

    report
}

fn flatten<'a>(categories: &'a [Category], out: &mut Vec<&'a Category>) {
    for category in categories {
        out.push(category);
        flatten(&category.children, out);
    }
}

/// Cross-record checks: references, duplicate ids, parent cycles and
/// categories no item uses
pub fn validate_integrity(categories: &[Category], navigations: &[Navigation]) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut all = Vec::new();
    flatten(categories, &mut all);
    let ids: HashSet<&str> = all.iter().map(|c| c.id.as_str()).collect();

    for (index, navigation) in navigations.iter().enumerate() {
        if !ids.contains(navigation.category_id.as_str()) {
            report.error_with(
                format!("navigations[{index}].categoryId"),
                format!("category \"{}\" does not exist", navigation.category_id),
                &navigation.category_id,
            );
        }
    }

    for (index, category) in all.iter().enumerate() {
        if let Some(parent) = &category.parent_id {
            if !ids.contains(parent.as_str()) {
                report.error_with(
                    format!("categories[{index}].parentId"),
                    format!("parent category \"{parent}\" does not exist"),
                    parent,
                );
            }
        }
    }

    check_duplicates(&mut report, "categories", all.iter().map(|c| c.id.as_str()));
    check_duplicates(&mut report, "navigations", navigations.iter().map(|n| n.id.as_str()));
    check_cycles(&mut report, &all);

    let used: HashSet<&str> = navigations.iter().map(|n| n.category_id.as_str()).collect();
    for category in &all {
        if category.children.is_empty() && !used.contains(category.id.as_str()) {
            report.warning_with(
                "categories",
                format!(
                    "category \"{}\" ({}) has no navigation items",
                    category.name, category.id
                ),
                &category.id,
            );
        }
    }

    report
}

fn check_duplicates<'a>(
    report: &mut ValidationReport,
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in ids {
        *counts.entry(id).or_default() += 1;
    }
    for (id, count) in counts {
        if count > 1 {
            report.error_with(
                format!("{kind}.id"),
                format!("duplicate id \"{id}\" appears {count} times"),
                id,
            );
        }
    }
}

/// Follow parent links from every category; each loop is reported once
fn check_cycles(report: &mut ValidationReport, categories: &[&Category]) {
    let parents: HashMap<&str, &str> = categories
        .iter()
        .filter_map(|c| c.parent_id.as_deref().map(|p| (c.id.as_str(), p)))
        .collect();
    let mut done: HashSet<&str> = HashSet::new();

    for category in categories {
        let mut path: Vec<&str> = Vec::new();
        let mut current = category.id.as_str();
        loop {
            if done.contains(current) {
                break;
            }
            if let Some(start) = path.iter().position(|id| *id == current) {
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(current);
                report.error_with(
                    "categories.parentId",
                    format!("circular parent reference: {}", cycle.join(" -> ")),
                    current,
                );
                break;
            }
            path.push(current);
            match parents.get(current) {
                Some(&parent) => current = parent,
                None => break,
            }
        }
        done.extend(path);
    }
}

/// Validate every data file under `source` plus their cross-references.
///
/// Unreadable or unparsable files are reported as errors against the file
/// name rather than aborting the run.
pub fn validate_data_dir(source: &DataSource) -> ValidationReport {
    let mut report = ValidationReport::default();
    let categories_name = source.categories_file.clone();

    let categories = match source.load_categories() {
        Ok(file) => {
            report.merge_prefixed(&categories_name, validate_category_file(&file));
            file.categories
        }
        Err(e) => {
            report.error(categories_name, e.to_string());
            Vec::new()
        }
    };

    let mut navigations = Vec::new();
    match source.navigation_paths() {
        Ok(paths) if paths.is_empty() => {
            report.error(
                source.navigation_pattern.clone(),
                "no navigation files found",
            );
        }
        Ok(paths) => {
            for path in paths {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match source.load_navigation_file(&path) {
                    Ok((file, _)) => {
                        report.merge_prefixed(&name, validate_navigation_file(&file));
                        navigations.extend(file.items);
                    }
                    Err(e) => report.error(name, e.to_string()),
                }
            }
        }
        Err(e) => report.error(source.navigation_pattern.clone(), e.to_string()),
    }

    report.merge(validate_integrity(&categories, &navigations));
    tracing::debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "Validated data directory"
    );
    report
}
