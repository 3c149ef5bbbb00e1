//! Loading of the static JSON data files.
//!
//! `categories.json` holds the category list; navigation items are split
//! across `navigation_001.json`, `navigation_002.json`, ... and concatenated
//! in file-index order. Each navigation file carries a SHA-256 checksum of
//! its `items` array which is verified on load.
//!
//! The checksum covers `items` exactly as the file spells it: the array is
//! parsed as a `serde_json::Value` (object key order preserved, integers
//! kept as integers) and re-emitted as compact JSON. Whitespace in the file
//! does not matter; field order and number formatting do.
//!
//! Edits made through the stores are written back with
//! [`DataSource::save_navigations`] and [`DataSource::save_categories`],
//! which re-paginate the items and stamp fresh checksums.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::store::{CategoryCommand, CategoryStore, NavigationCommand, NavigationStore};
use crate::types::{
    now_rfc3339, Category, CategoryDataFile, Navigation, NavigationDataFile, NavigationMeta,
};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Data file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Checksum mismatch in {path}: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Invalid file pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("No navigation files matching {pattern} in {dir}")]
    NoNavigationFiles { dir: PathBuf, pattern: String },

    #[error("Navigation pattern {0} has no `*` to number files with")]
    UnnumberedPattern(String),
}

/// Result of comparing a file's declared checksum with its contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumStatus {
    Verified,
    /// `meta.checksum` was empty
    Missing,
    /// Verification disabled in config
    Skipped,
    Mismatch { expected: String, actual: String },
}

/// Lower-case hex SHA-256 of the compact JSON of a file's raw `items`
pub fn compute_checksum(items: &Value) -> String {
    let json = serde_json::to_vec(items).unwrap_or_default();
    hex::encode(Sha256::digest(&json))
}

/// Compare a declared checksum (case-insensitive) with the raw `items`
pub fn checksum_status(declared: &str, items: &Value) -> ChecksumStatus {
    let expected = declared.trim();
    if expected.is_empty() {
        return ChecksumStatus::Missing;
    }
    let actual = compute_checksum(items);
    if expected.eq_ignore_ascii_case(&actual) {
        ChecksumStatus::Verified
    } else {
        ChecksumStatus::Mismatch {
            expected: expected.to_string(),
            actual,
        }
    }
}

/// The `items` array of a navigation file, untyped
#[derive(Deserialize)]
struct RawItems {
    #[serde(default)]
    items: Value,
}

/// Recompute `meta.checksum` of a navigation file and write it back.
///
/// Returns the new checksum, or `None` when the stored one already matched
/// and the file was left untouched.
pub fn update_checksum(path: &Path) -> Result<Option<String>, DataError> {
    let content = read_text(path)?;
    let mut doc: Map<String, Value> = parse_json(path, &content)?;
    let items = doc
        .get("items")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let checksum = compute_checksum(&items);

    let meta = doc
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(Map::new());
    }
    if meta.get("checksum").and_then(Value::as_str) == Some(checksum.as_str()) {
        return Ok(None);
    }
    meta["checksum"] = Value::String(checksum.clone());
    write_json(path, &doc)?;
    tracing::info!(path = %path.display(), checksum = %checksum, "Updated navigation file checksum");
    Ok(Some(checksum))
}

fn read_text(path: &Path) -> Result<String, DataError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DataError::NotFound(path.to_path_buf())
        } else {
            DataError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Result<T, DataError> {
    serde_json::from_str(content).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    parse_json(path, &read_text(path)?)
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<(), DataError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json + "\n").map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `navigation_*.json` and 2 -> `navigation_002.json`
fn numbered_file_name(pattern: &str, index: usize) -> Result<String, DataError> {
    match pattern.split_once('*') {
        Some((head, tail)) => Ok(format!("{head}{index:03}{tail}")),
        None => Err(DataError::UnnumberedPattern(pattern.to_string())),
    }
}

const DEFAULT_VERSION: &str = "1.0.0";

/// Location and checking policy for the data files
#[derive(Debug, Clone)]
pub struct DataSource {
    pub dir: PathBuf,
    pub categories_file: String,
    pub navigation_pattern: String,
    pub verify_checksum: bool,
}

impl DataSource {
    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self {
            dir: config.content_dir(root),
            categories_file: config.data.categories_file.clone(),
            navigation_pattern: config.data.navigation_pattern.clone(),
            verify_checksum: config.data.verify_checksum,
        }
    }

    pub fn categories_path(&self) -> PathBuf {
        self.dir.join(&self.categories_file)
    }

    pub fn load_categories(&self) -> Result<CategoryDataFile, DataError> {
        read_json(&self.categories_path())
    }

    /// Paths matching the navigation pattern, in lexical order
    pub fn navigation_paths(&self) -> Result<Vec<PathBuf>, DataError> {
        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            self.navigation_pattern
        );
        let entries = glob::glob(&pattern).map_err(|source| DataError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        paths.sort();
        Ok(paths)
    }

    /// Load one navigation file, verifying its checksum when enabled
    pub fn load_navigation_file(
        &self,
        path: &Path,
    ) -> Result<(NavigationDataFile, ChecksumStatus), DataError> {
        let content = read_text(path)?;
        let file: NavigationDataFile = parse_json(path, &content)?;
        if !self.verify_checksum {
            return Ok((file, ChecksumStatus::Skipped));
        }
        let raw: RawItems = parse_json(path, &content)?;
        match checksum_status(&file.meta.checksum, &raw.items) {
            ChecksumStatus::Mismatch { expected, actual } => Err(DataError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            }),
            ChecksumStatus::Missing => {
                tracing::warn!(path = %path.display(), "Navigation file has no checksum");
                Ok((file, ChecksumStatus::Missing))
            }
            status => Ok((file, status)),
        }
    }

    /// Rewrite the navigation files from `items`, `per_file` to a file.
    ///
    /// Each file gets fresh `meta` counts and checksum; files left over from
    /// a longer previous split are removed. An empty list still writes one
    /// empty file so the directory keeps loading.
    pub fn save_navigations(
        &self,
        items: &[Navigation],
        per_file: usize,
    ) -> Result<Vec<PathBuf>, DataError> {
        let existing = self.navigation_paths()?;
        let version = existing
            .first()
            .and_then(|path| read_json::<NavigationDataFile>(path).ok())
            .map(|file| file.version)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let chunks: Vec<&[Navigation]> = if items.is_empty() {
            vec![items]
        } else {
            items.chunks(per_file.max(1)).collect()
        };
        let total_files = chunks.len() as u32;
        let last_update = now_rfc3339();

        let mut written = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.into_iter().enumerate() {
            let path = self
                .dir
                .join(numbered_file_name(&self.navigation_pattern, i + 1)?);
            let raw = serde_json::to_value(chunk).map_err(|source| DataError::Parse {
                path: path.clone(),
                source,
            })?;
            let categories: BTreeSet<&str> =
                chunk.iter().map(|n| n.category_id.as_str()).collect();
            let file = NavigationDataFile {
                version: version.clone(),
                file_index: i as u32 + 1,
                total_files,
                last_update: last_update.clone(),
                meta: NavigationMeta {
                    total_items: chunk.len() as u64,
                    active_items: chunk.iter().filter(|n| n.is_active).count() as u64,
                    categories: categories.into_iter().map(str::to_string).collect(),
                    checksum: compute_checksum(&raw),
                },
                items: chunk.to_vec(),
            };
            write_json(&path, &file)?;
            written.push(path);
        }

        let stale = existing
            .iter()
            .filter(|p| !written.iter().any(|w| w.file_name() == p.file_name()));
        for stale in stale {
            std::fs::remove_file(stale).map_err(|source| DataError::Io {
                path: stale.clone(),
                source,
            })?;
        }
        tracing::info!(
            files = written.len(),
            items = items.len(),
            "Wrote navigation files"
        );
        Ok(written)
    }

    /// Rewrite the category file, keeping its version
    pub fn save_categories(&self, categories: &[Category]) -> Result<PathBuf, DataError> {
        let path = self.categories_path();
        let version = read_json::<CategoryDataFile>(&path)
            .ok()
            .map(|file| file.version)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());
        let file = CategoryDataFile {
            version,
            last_update: now_rfc3339(),
            categories: categories.to_vec(),
        };
        write_json(&path, &file)?;
        tracing::info!(path = %path.display(), count = categories.len(), "Wrote category file");
        Ok(path)
    }
}

/// Per-file load summary for `status`
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub file_index: u32,
    pub items: usize,
    pub active_items: usize,
    pub last_update: String,
    pub checksum: ChecksumStatus,
}

/// Both stores filled from the data directory.
///
/// Failures never abort loading: a category-file error leaves the category
/// store `Failed`; a bad navigation file is skipped, its error recorded,
/// and the navigation store ends `Failed` while keeping the items of the
/// files that did load.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub categories: CategoryStore,
    pub navigations: NavigationStore,
    pub files: Vec<FileSummary>,
    pub errors: Vec<String>,
}

impl Dataset {
    pub fn load(source: &DataSource) -> Self {
        let mut dataset = Self::default();

        match source.load_categories() {
            Ok(file) => {
                dataset
                    .categories
                    .apply(CategoryCommand::Loaded(file.categories));
            }
            Err(e) => {
                dataset.errors.push(e.to_string());
                dataset
                    .categories
                    .apply(CategoryCommand::LoadFailed(e.to_string()));
            }
        }

        let paths = match source.navigation_paths() {
            Ok(paths) if paths.is_empty() => {
                let e = DataError::NoNavigationFiles {
                    dir: source.dir.clone(),
                    pattern: source.navigation_pattern.clone(),
                };
                dataset.fail_navigations(e.to_string());
                return dataset;
            }
            Ok(paths) => paths,
            Err(e) => {
                dataset.fail_navigations(e.to_string());
                return dataset;
            }
        };

        let mut loaded: Vec<NavigationDataFile> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for path in &paths {
            match source.load_navigation_file(path) {
                Ok((file, checksum)) => {
                    dataset.files.push(FileSummary {
                        path: path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        file_index: file.file_index,
                        items: file.items.len(),
                        active_items: file.items.iter().filter(|n| n.is_active).count(),
                        last_update: file.last_update.clone(),
                        checksum,
                    });
                    loaded.push(file);
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        loaded.sort_by_key(|f| f.file_index);
        dataset.files.sort_by_key(|f| f.file_index);
        let items: Vec<Navigation> = loaded.into_iter().flat_map(|f| f.items).collect();
        tracing::debug!(
            files = paths.len(),
            items = items.len(),
            "Loaded navigation files"
        );
        dataset.navigations.apply(NavigationCommand::Loaded(items));

        if !failures.is_empty() {
            let message = failures.join("; ");
            dataset.fail_navigations(message);
        }
        dataset
    }

    fn fail_navigations(&mut self, message: String) {
        self.errors.push(message.clone());
        self.navigations.apply(NavigationCommand::LoadFailed(message));
    }

    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn nav(id: &str) -> Navigation {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Tool {id}"),
            "url": "https://example.com",
            "categoryId": "cat_1"
        }))
        .unwrap()
    }

    fn nav_file(index: u32, ids: &[&str], checksum: Option<&str>) -> NavigationDataFile {
        let items: Vec<Navigation> = ids.iter().map(|id| nav(id)).collect();
        let checksum = checksum
            .map(str::to_string)
            .unwrap_or_else(|| compute_checksum(&serde_json::to_value(&items).unwrap()));
        NavigationDataFile {
            version: "1.0".into(),
            file_index: index,
            total_files: 2,
            last_update: "2024-01-01".into(),
            meta: NavigationMeta {
                total_items: items.len() as u64,
                active_items: items.len() as u64,
                categories: vec!["cat_1".into()],
                checksum,
            },
            items,
        }
    }

    fn write(dir: &Path, name: &str, value: &impl Serialize) {
        std::fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn source(dir: &TempDir) -> DataSource {
        DataSource {
            dir: dir.path().to_path_buf(),
            categories_file: "categories.json".into(),
            navigation_pattern: "navigation_*.json".into(),
            verify_checksum: true,
        }
    }

    fn write_categories(dir: &Path) {
        write(
            dir,
            "categories.json",
            &serde_json::json!({
                "version": "1.0",
                "lastUpdate": "2024-01-01",
                "categories": [{"id": "cat_1", "name": "Writing", "order": 1, "level": 0}]
            }),
        );
    }

    #[test]
    fn test_checksum_is_stable_hex() {
        let items = serde_json::json!([{"id": "nav_1"}]);
        let a = compute_checksum(&items);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(a, compute_checksum(&items));
        assert_ne!(a, compute_checksum(&serde_json::json!([{"id": "nav_2"}])));
    }

    #[test]
    fn test_checksum_status() {
        let items = serde_json::json!([{"id": "nav_1", "rating": 5}]);
        let sum = compute_checksum(&items);
        assert_eq!(checksum_status(&sum, &items), ChecksumStatus::Verified);
        assert_eq!(
            checksum_status(&sum.to_uppercase(), &items),
            ChecksumStatus::Verified
        );
        assert_eq!(checksum_status("  ", &items), ChecksumStatus::Missing);
        assert!(matches!(
            checksum_status("deadbeef", &items),
            ChecksumStatus::Mismatch { .. }
        ));
    }

    const HAND_WRITTEN_ITEMS: &str = r#"[{"title":"Claude","id":"nav_7","url":"https://claude.ai","categoryId":"cat_1","rating":5,"visitCount":3}]"#;

    fn write_hand_written(dir: &Path, checksum: &str) {
        let content = format!(
            r#"{{
  "version": "1.0",
  "fileIndex": 1,
  "totalFiles": 1,
  "lastUpdate": "2024-01-01",
  "items": {HAND_WRITTEN_ITEMS},
  "meta": {{"totalItems": 1, "activeItems": 1, "categories": ["cat_1"], "checksum": "{checksum}"}}
}}"#
        );
        std::fs::write(dir.join("navigation_001.json"), content).unwrap();
    }

    #[test]
    fn test_checksum_covers_items_as_written() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        // integer rating, fields out of struct order, optional fields omitted
        let expected = hex::encode(Sha256::digest(HAND_WRITTEN_ITEMS.as_bytes()));
        write_hand_written(dir.path(), &expected);

        let (file, status) = source(&dir)
            .load_navigation_file(&dir.path().join("navigation_001.json"))
            .unwrap();
        assert_eq!(status, ChecksumStatus::Verified);
        assert_eq!(file.items[0].rating, 5.0);
        assert!(file.items[0].is_active);
    }

    #[test]
    fn test_update_checksum_writes_meta() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        write_hand_written(dir.path(), "");
        let path = dir.path().join("navigation_001.json");

        let written = update_checksum(&path).unwrap().unwrap();
        assert_eq!(
            written,
            hex::encode(Sha256::digest(HAND_WRITTEN_ITEMS.as_bytes()))
        );
        assert_eq!(update_checksum(&path).unwrap(), None);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"rating\": 5"));
        let (_, status) = source(&dir).load_navigation_file(&path).unwrap();
        assert_eq!(status, ChecksumStatus::Verified);
    }

    #[test]
    fn test_update_checksum_adds_missing_meta() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("navigation_001.json");
        std::fs::write(&path, r#"{"items": []}"#).unwrap();

        let written = update_checksum(&path).unwrap().unwrap();
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["meta"]["checksum"], written);
    }

    #[test]
    fn test_load_concatenates_in_file_index_order() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        // lexical order disagrees with fileIndex on purpose
        write(dir.path(), "navigation_a.json", &nav_file(2, &["nav_3"], None));
        write(dir.path(), "navigation_b.json", &nav_file(1, &["nav_1", "nav_2"], None));

        let dataset = Dataset::load(&source(&dir));
        assert!(dataset.is_healthy());
        assert!(dataset.navigations.load_state().is_loaded());
        let ids: Vec<&str> = dataset
            .navigations
            .items()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["nav_1", "nav_2", "nav_3"]);
        assert_eq!(dataset.files[0].file_index, 1);
        assert_eq!(dataset.files[0].checksum, ChecksumStatus::Verified);
        assert_eq!(dataset.categories.flattened().len(), 1);
    }

    #[test]
    fn test_checksum_mismatch_fails_that_file_only() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        write(dir.path(), "navigation_001.json", &nav_file(1, &["nav_1"], None));
        write(
            dir.path(),
            "navigation_002.json",
            &nav_file(2, &["nav_2"], Some("0000")),
        );

        let dataset = Dataset::load(&source(&dir));
        assert!(!dataset.is_healthy());
        let error = dataset.navigations.load_state().error().unwrap();
        assert!(error.contains("Checksum mismatch"));
        assert!(error.contains("navigation_002.json"));
        assert_eq!(dataset.navigations.items().len(), 1);
    }

    #[test]
    fn test_verification_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        write(
            dir.path(),
            "navigation_001.json",
            &nav_file(1, &["nav_1"], Some("0000")),
        );
        let mut src = source(&dir);
        src.verify_checksum = false;
        let dataset = Dataset::load(&src);
        assert!(dataset.is_healthy());
        assert_eq!(dataset.files[0].checksum, ChecksumStatus::Skipped);
    }

    #[test]
    fn test_missing_and_malformed_files_become_error_state() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("navigation_001.json"), "{ not json").unwrap();

        let dataset = Dataset::load(&source(&dir));
        assert!(dataset
            .categories
            .load_state()
            .error()
            .unwrap()
            .contains("not found"));
        assert!(dataset
            .navigations
            .load_state()
            .error()
            .unwrap()
            .contains("Malformed JSON"));
    }

    #[test]
    fn test_no_navigation_files() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        let dataset = Dataset::load(&source(&dir));
        assert!(dataset.categories.load_state().is_loaded());
        assert!(dataset
            .navigations
            .load_state()
            .error()
            .unwrap()
            .contains("No navigation files"));
    }

    #[test]
    fn test_save_navigations_repaginates_and_verifies() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        write(dir.path(), "navigation_001.json", &nav_file(1, &["nav_1"], None));
        write(dir.path(), "navigation_002.json", &nav_file(2, &["nav_2"], None));
        write(dir.path(), "navigation_003.json", &nav_file(3, &["nav_3"], None));
        let src = source(&dir);

        let items: Vec<Navigation> = ["nav_1", "nav_2", "nav_3"].iter().map(|id| nav(id)).collect();
        let written = src.save_navigations(&items, 2).unwrap();
        assert_eq!(written.len(), 2);
        assert!(!dir.path().join("navigation_003.json").exists());

        let dataset = Dataset::load(&src);
        assert!(dataset.is_healthy());
        assert_eq!(dataset.navigations.items().len(), 3);
        assert!(dataset
            .files
            .iter()
            .all(|f| f.checksum == ChecksumStatus::Verified));
        let (second, _) = src.load_navigation_file(&written[1]).unwrap();
        assert_eq!(second.version, "1.0");
        assert_eq!(second.total_files, 2);
        assert_eq!(second.meta.total_items, 1);
    }

    #[test]
    fn test_save_navigations_keeps_one_file_when_empty() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir);
        let written = src.save_navigations(&[], 100).unwrap();
        assert_eq!(written, vec![dir.path().join("navigation_001.json")]);
        let (file, status) = src.load_navigation_file(&written[0]).unwrap();
        assert!(file.items.is_empty());
        assert_eq!(status, ChecksumStatus::Verified);
    }

    #[test]
    fn test_save_navigations_needs_numbered_pattern() {
        let dir = TempDir::new().unwrap();
        let mut src = source(&dir);
        src.navigation_pattern = "navigation.json".into();
        assert!(matches!(
            src.save_navigations(&[nav("nav_1")], 10),
            Err(DataError::UnnumberedPattern(_))
        ));
    }

    #[test]
    fn test_save_categories_keeps_version() {
        let dir = TempDir::new().unwrap();
        write_categories(dir.path());
        let src = source(&dir);
        let mut file = src.load_categories().unwrap();
        file.categories[0].name = "Renamed".into();
        src.save_categories(&file.categories).unwrap();

        let reloaded = src.load_categories().unwrap();
        assert_eq!(reloaded.version, "1.0");
        assert_eq!(reloaded.categories[0].name, "Renamed");
        assert_ne!(reloaded.last_update, "2024-01-01");
    }
}
