use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration for navdir
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub search: SearchConfig,
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub user: UserConfig,
}

/// Where the static data files live and how they are checked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Data directory, relative to the project root unless absolute
    pub dir: String,
    /// Category file name inside `dir`
    pub categories_file: String,
    /// Glob (file name only) matching the paginated navigation files
    pub navigation_pattern: String,
    /// Recompute each navigation file's checksum and compare it to `meta.checksum`
    pub verify_checksum: bool,
    /// Items per navigation file when edits are written back
    pub items_per_file: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: "data".into(),
            categories_file: "categories.json".into(),
            navigation_pattern: "navigation_*.json".into(),
            verify_checksum: true,
            items_per_file: 100,
        }
    }
}

/// Configuration for search behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default number of results to return
    pub default_limit: usize,
    /// Minimum edit-distance similarity for the fuzzy fallback to score a field
    pub fuzzy_threshold: f64,
    /// Number of suggestions returned by `suggest`
    pub suggestion_limit: usize,
    /// Maximum number of search history entries kept
    pub history_limit: usize,
    /// Days before the persisted search history expires
    pub history_ttl_days: u32,
    /// Replaces the built-in stop-word list when non-empty
    pub stop_words: Vec<String>,
    /// Extra synonym groups, merged over the built-in table (same key replaces)
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            fuzzy_threshold: 0.7,
            suggestion_limit: 10,
            history_limit: 100,
            history_ttl_days: 7,
            stop_words: vec![],
            synonyms: BTreeMap::new(),
        }
    }
}

/// Remote file-store (Gitee v5 contents API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API root, e.g. "https://gitee.com/api/v5"
    pub base_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Access token: literal value or "env:VAR_NAME" to read from environment
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Pause between calls of a batch operation
    pub batch_delay_ms: u64,
    /// Directory in the remote repository holding the data files
    pub data_path: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gitee.com/api/v5".into(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".into(),
            token: Some("env:NAVDIR_REMOTE_TOKEN".into()),
            timeout_secs: 30,
            batch_delay_ms: 200,
            data_path: "data".into(),
        }
    }
}

impl RemoteConfig {
    /// Resolve the token, supporting "env:VAR_NAME" syntax
    pub fn resolve_token(&self) -> Option<String> {
        self.token.as_ref().and_then(|token| {
            if let Some(var_name) = token.strip_prefix("env:") {
                std::env::var(var_name).ok().filter(|v| !v.is_empty())
            } else if token.is_empty() {
                None
            } else {
                Some(token.clone())
            }
        })
    }

    /// Owner and repo are both required before any remote call
    pub fn is_configured(&self) -> bool {
        !self.owner.is_empty() && !self.repo.is_empty()
    }
}

/// Local key-value store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prefix prepended to every namespace
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: "navdir_".into(),
        }
    }
}

/// Caps on the user activity records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub recent_visits_limit: usize,
    pub activities_limit: usize,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            recent_visits_limit: 50,
            activities_limit: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Get the path to the navdir state directory for a project
    pub fn data_dir(root: &Path) -> PathBuf {
        root.join(".navdir")
    }

    /// Get the config file path for a project
    pub fn config_path(root: &Path) -> PathBuf {
        Self::data_dir(root).join("config.toml")
    }

    /// Get the SQLite key-value store path
    pub fn store_path(root: &Path) -> PathBuf {
        Self::data_dir(root).join("store.db")
    }

    /// Resolve the directory holding the JSON data files
    pub fn content_dir(&self, root: &Path) -> PathBuf {
        let dir = Path::new(&self.data.dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            root.join(dir)
        }
    }
}
