use anyhow::Result;
use chrono::Duration;
use std::collections::BTreeMap;

use super::sqlite::{KvStore, Namespace, StorageUsage};
use crate::search::{HistoryEntry, SearchFilters};
use crate::user::{Language, Theme, UserActivity, UserPreferences, UserStats, ViewMode};
use crate::types::Navigation;

const THEME: &str = "theme";
const LANGUAGE: &str = "language";
const VIEW_MODE: &str = "viewMode";
const PREFERENCES: &str = "preferences";
const SEARCH_HISTORY: &str = "searchHistory";
const SEARCH_FILTERS: &str = "searchFilters";
const FAVORITES: &str = "favorites";
const RECENT_VISITS: &str = "recentVisits";
const ACTIVITIES: &str = "activities";
const USER_STATS: &str = "userStats";
const HAS_VISITED: &str = "hasVisited";

/// Typed accessors over the `{prefix}prefs_` namespace
pub struct PrefsStorage<'a> {
    ns: Namespace<'a>,
    history_ttl: Duration,
}

impl<'a> PrefsStorage<'a> {
    pub fn new(store: &'a KvStore, prefix: &str) -> Self {
        Self {
            ns: store.namespace(format!("{prefix}prefs_")),
            history_ttl: Duration::days(7),
        }
    }

    pub fn with_history_ttl_days(mut self, days: u32) -> Self {
        self.history_ttl = Duration::days(i64::from(days));
        self
    }

    pub fn namespace(&self) -> &Namespace<'a> {
        &self.ns
    }

    pub fn theme(&self) -> Result<Theme> {
        self.ns.get_or(THEME, Theme::default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.ns.set(THEME, &theme)
    }

    pub fn language(&self) -> Result<Language> {
        self.ns.get_or(LANGUAGE, Language::default())
    }

    pub fn set_language(&self, language: Language) -> Result<()> {
        self.ns.set(LANGUAGE, &language)
    }

    pub fn view_mode(&self) -> Result<ViewMode> {
        self.ns.get_or(VIEW_MODE, ViewMode::default())
    }

    pub fn set_view_mode(&self, mode: ViewMode) -> Result<()> {
        self.ns.set(VIEW_MODE, &mode)
    }

    pub fn preferences(&self) -> Result<Option<UserPreferences>> {
        self.ns.get(PREFERENCES)
    }

    /// Store the preference document and mirror the individual keys
    pub fn set_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        self.ns.set(PREFERENCES, prefs)?;
        self.set_theme(prefs.theme)?;
        self.set_language(prefs.language)?;
        self.set_view_mode(prefs.view_mode)
    }

    /// Newest first; empty once the TTL has passed
    pub fn search_history(&self) -> Result<Vec<HistoryEntry>> {
        self.ns.get_or(SEARCH_HISTORY, Vec::new())
    }

    pub fn set_search_history(&self, history: &[HistoryEntry]) -> Result<()> {
        self.ns.set_with_ttl(SEARCH_HISTORY, history, self.history_ttl)
    }

    /// Filters of the last search, kept as long as the history
    pub fn search_filters(&self) -> Result<Option<SearchFilters>> {
        self.ns.get(SEARCH_FILTERS)
    }

    pub fn set_search_filters(&self, filters: &SearchFilters) -> Result<()> {
        self.ns.set_with_ttl(SEARCH_FILTERS, filters, self.history_ttl)
    }

    pub fn favorites(&self) -> Result<Vec<String>> {
        self.ns.get_or(FAVORITES, Vec::new())
    }

    pub fn set_favorites(&self, favorites: &[String]) -> Result<()> {
        self.ns.set(FAVORITES, favorites)
    }

    pub fn recent_visits(&self) -> Result<Vec<Navigation>> {
        self.ns.get_or(RECENT_VISITS, Vec::new())
    }

    pub fn set_recent_visits(&self, visits: &[Navigation]) -> Result<()> {
        self.ns.set(RECENT_VISITS, visits)
    }

    pub fn activities(&self) -> Result<Vec<UserActivity>> {
        self.ns.get_or(ACTIVITIES, Vec::new())
    }

    pub fn set_activities(&self, activities: &[UserActivity]) -> Result<()> {
        self.ns.set(ACTIVITIES, activities)
    }

    pub fn stats(&self) -> Result<Option<UserStats>> {
        self.ns.get(USER_STATS)
    }

    pub fn set_stats(&self, stats: &UserStats) -> Result<()> {
        self.ns.set(USER_STATS, stats)
    }

    pub fn has_visited(&self) -> Result<bool> {
        self.ns.get_or(HAS_VISITED, false)
    }

    pub fn mark_visited(&self) -> Result<()> {
        self.ns.set(HAS_VISITED, &true)
    }

    pub fn usage(&self) -> Result<StorageUsage> {
        self.ns.usage()
    }

    pub fn cleanup(&self) -> Result<usize> {
        self.ns.cleanup()
    }

    pub fn export(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        self.ns.export()
    }

    pub fn clear(&self) -> Result<usize> {
        self.ns.clear()
    }
}
