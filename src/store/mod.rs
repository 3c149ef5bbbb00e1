//! In-memory state containers for the directory data.
//!
//! Each store owns its data and changes only through `apply(command)`,
//! which returns an event describing what happened. Mutations stay in
//! memory until a caller writes the store back through `DataSource`.

pub mod category;
pub mod navigation;

use serde::Serialize;

pub use category::{
    CategoryCommand, CategoryEvent, CategoryStats, CategoryStore, CategoryTreeNode,
};
pub use navigation::{ListFilters, NavigationCommand, NavigationEvent, NavigationStore};

/// Outcome of the last load attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Loaded,
    Failed(String),
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Loaded => write!(f, "loaded"),
            LoadState::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

/// `{prefix}_{millis}`, bumped until it does not collide with `taken`
pub(crate) fn generate_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut millis = chrono::Utc::now().timestamp_millis();
    loop {
        let id = format!("{prefix}_{millis}");
        if !taken(&id) {
            return id;
        }
        millis += 1;
    }
}
