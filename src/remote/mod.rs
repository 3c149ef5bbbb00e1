//! Client for the remote file store (Gitee v5 contents API).
//!
//! Used only to push and pull the data files; nothing in the local stores
//! writes through it. The client is built from `[remote]` config and
//! passed to whoever needs it.

pub mod client;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{decode_content, encode_content, FileStoreClient};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote is not configured: set [remote] owner and repo in .navdir/config.toml")]
    NotConfigured,

    #[error("Access token is invalid or expired")]
    Unauthorized,

    #[error("Access denied, check the token's permissions")]
    Forbidden,

    #[error("File or repository not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("API rate limit exceeded, try again later")]
    RateLimited,

    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Updating {0} requires the file's current sha")]
    MissingSha(String),
}

impl RemoteError {
    /// Map a non-success status to its error, keeping the server's message
    /// where the status alone says too little
    pub fn from_status(status: u16, path: &str, message: Option<String>) -> Self {
        match status {
            401 => RemoteError::Unauthorized,
            403 => RemoteError::Forbidden,
            404 => RemoteError::NotFound(path.to_string()),
            422 => RemoteError::InvalidRequest(
                message.unwrap_or_else(|| "invalid request parameters".into()),
            ),
            429 => RemoteError::RateLimited,
            _ => RemoteError::Status {
                status,
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Network(e)
        }
    }
}

/// A file or directory entry as returned by the contents API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    /// Base64, absent for directory listings
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl FileContent {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// A write to one path; `sha` is required when replacing an existing file
#[derive(Debug, Clone, Default)]
pub struct FileOperation {
    pub path: String,
    pub content: String,
    pub message: String,
    pub sha: Option<String>,
    pub branch: Option<String>,
}

impl FileOperation {
    pub fn new(path: impl Into<String>, content: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: CommitPerson,
    #[serde(default)]
    pub committer: CommitPerson,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub commit: CommitDetail,
    #[serde(default)]
    pub author: Option<Account>,
    #[serde(default)]
    pub committer: Option<Account>,
}

/// Rate-limit counters read from `x-ratelimit-*` response headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApiUsage {
    pub remaining: u64,
    pub limit: u64,
    pub reset: u64,
}
