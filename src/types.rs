use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// A single link entry shown in the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub visit_count: u64,
    /// 0-5, zero means "not rated"
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub update_time: String,
}

/// A (possibly nested) grouping label for navigation items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub level: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
}

/// `categories.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDataFile {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// One page of navigation items (`navigation_001.json`, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDataFile {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub file_index: u32,
    #[serde(default)]
    pub total_files: u32,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub items: Vec<Navigation>,
    #[serde(default)]
    pub meta: NavigationMeta,
}

/// Envelope metadata of a navigation data file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationMeta {
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub active_items: u64,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Hex SHA-256 of the compact JSON of `items`; empty when unknown
    #[serde(default)]
    pub checksum: String,
}

/// Fields for a new navigation item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNavigation {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

/// Partial update of a navigation item; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNavigation {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub category_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Fields for a new category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
    pub order: Option<i64>,
}

/// Partial update of a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// `Some(None)` moves the category to the root
    pub parent_id: Option<Option<String>>,
    pub order: Option<i64>,
    pub is_active: Option<bool>,
}

/// Parse a data-file timestamp.
///
/// Accepts RFC 3339 (`2024-03-01T12:00:00Z`) and plain dates
/// (`2024-03-01`, interpreted as midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Current time as an RFC 3339 string, the format written to data files
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_defaults_when_fields_missing() {
        let json = r#"{"id":"nav_1","title":"ChatGPT","url":"https://chat.openai.com","categoryId":"cat_1"}"#;
        let nav: Navigation = serde_json::from_str(json).unwrap();
        assert!(nav.is_active);
        assert!(nav.tags.is_empty());
        assert_eq!(nav.visit_count, 0);
        assert_eq!(nav.rating, 0.0);
        assert!(nav.icon.is_none());
    }

    #[test]
    fn test_navigation_camel_case_fields() {
        let json = r#"{
            "id": "nav_1",
            "title": "ChatGPT",
            "description": "Conversational assistant",
            "url": "https://chat.openai.com",
            "categoryId": "cat_1",
            "tags": ["ai", "chat"],
            "featured": true,
            "isActive": false,
            "visitCount": 1200,
            "rating": 4.8,
            "createTime": "2024-01-01T00:00:00Z",
            "updateTime": "2024-02-01T00:00:00Z"
        }"#;
        let nav: Navigation = serde_json::from_str(json).unwrap();
        assert_eq!(nav.category_id, "cat_1");
        assert!(!nav.is_active);
        assert_eq!(nav.visit_count, 1200);

        let back = serde_json::to_value(&nav).unwrap();
        assert_eq!(back["categoryId"], "cat_1");
        assert_eq!(back["visitCount"], 1200);
    }

    #[test]
    fn test_category_nested_children() {
        let json = r#"{
            "id": "cat_1",
            "name": "Writing",
            "order": 1,
            "parentId": null,
            "level": 0,
            "children": [{"id": "cat_2", "name": "Copywriting", "parentId": "cat_1", "level": 1}]
        }"#;
        let cat: Category = serde_json::from_str(json).unwrap();
        assert!(cat.parent_id.is_none());
        assert_eq!(cat.children.len(), 1);
        assert_eq!(cat.children[0].parent_id.as_deref(), Some("cat_1"));
    }

    #[test]
    fn test_navigation_file_meta_defaults() {
        let json = r#"{"version":"1.0","fileIndex":1,"totalFiles":1,"lastUpdate":"2024-01-01","items":[]}"#;
        let file: NavigationDataFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.meta.total_items, 0);
        assert!(file.meta.checksum.is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T12:00:00Z").is_some());
        assert!(parse_timestamp("2024-03-01T12:00:00.000+08:00").is_some());
        let day = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
