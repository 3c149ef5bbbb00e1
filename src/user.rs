use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::UserConfig;
use crate::storage::PrefsStorage;
use crate::types::{now_rfc3339, Navigation};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Preferred ordering for plain listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSort {
    #[default]
    Default,
    Title,
    Time,
    Popularity,
    Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub theme: Theme,
    pub language: Language,
    pub view_mode: ViewMode,
    pub items_per_page: usize,
    pub default_category: String,
    pub sort_by: ListSort,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: Language::default(),
            view_mode: ViewMode::default(),
            items_per_page: 20,
            default_category: String::new(),
            sort_by: ListSort::default(),
        }
    }
}

/// Keys accepted by [`UserPreferences::set_field`]
pub const PREFERENCE_KEYS: &[&str] = &[
    "theme",
    "language",
    "viewMode",
    "itemsPerPage",
    "defaultCategory",
    "sortBy",
];

fn parse_enum<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .with_context(|| format!("Invalid value for {key}: {value}"))
}

fn enum_str<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

impl UserPreferences {
    /// Update one preference from its string form, e.g. `("theme", "dark")`
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "theme" => self.theme = parse_enum(key, value)?,
            "language" => self.language = parse_enum(key, value)?,
            "viewMode" => self.view_mode = parse_enum(key, value)?,
            "itemsPerPage" => {
                let n: usize = value
                    .parse()
                    .with_context(|| format!("Invalid value for {key}: {value}"))?;
                if n == 0 {
                    bail!("itemsPerPage must be at least 1");
                }
                self.items_per_page = n;
            }
            "defaultCategory" => self.default_category = value.to_string(),
            "sortBy" => self.sort_by = parse_enum(key, value)?,
            _ => bail!(
                "Unknown preference: {key} (expected one of: {})",
                PREFERENCE_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn get_field(&self, key: &str) -> Option<String> {
        match key {
            "theme" => Some(enum_str(&self.theme)),
            "language" => Some(enum_str(&self.language)),
            "viewMode" => Some(enum_str(&self.view_mode)),
            "itemsPerPage" => Some(self.items_per_page.to_string()),
            "defaultCategory" => Some(self.default_category.clone()),
            "sortBy" => Some(enum_str(&self.sort_by)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub total_visits: u64,
    pub total_searches: u64,
    pub favorite_count: u64,
    pub last_visit: String,
    pub join_date: String,
    /// Minutes
    pub active_time: u64,
}

impl Default for UserStats {
    fn default() -> Self {
        let now = now_rfc3339();
        Self {
            total_visits: 0,
            total_searches: 0,
            favorite_count: 0,
            last_visit: now.clone(),
            join_date: now,
            active_time: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Visit,
    Search,
    Favorite,
    Share,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_title: Option<String>,
    /// Unix epoch milliseconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TodayStats {
    pub visits: usize,
    pub searches: usize,
    pub favorites: usize,
    pub shares: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyActivity {
    pub date: String,
    pub visits: usize,
    pub searches: usize,
}

/// Portable snapshot written by `prefs export`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataExport {
    pub preferences: UserPreferences,
    pub stats: UserStats,
    pub favorites: Vec<String>,
    pub recent_visits: Vec<Navigation>,
    pub activities: Vec<UserActivity>,
    pub export_time: String,
}

/// Import document; absent sections are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataImport {
    pub preferences: Option<UserPreferences>,
    pub stats: Option<UserStats>,
    pub favorites: Option<Vec<String>>,
    pub recent_visits: Option<Vec<Navigation>>,
    pub activities: Option<Vec<UserActivity>>,
}

/// Single-user preferences, favorites and activity
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub preferences: UserPreferences,
    pub stats: UserStats,
    pub favorites: Vec<String>,
    pub recent_visits: Vec<Navigation>,
    pub activities: Vec<UserActivity>,
    pub is_first_visit: bool,
    recent_visits_limit: usize,
    activities_limit: usize,
}

impl UserProfile {
    pub fn new(config: &UserConfig) -> Self {
        Self {
            preferences: UserPreferences::default(),
            stats: UserStats::default(),
            favorites: Vec::new(),
            recent_visits: Vec::new(),
            activities: Vec::new(),
            is_first_visit: true,
            recent_visits_limit: config.recent_visits_limit,
            activities_limit: config.activities_limit,
        }
    }

    /// Load everything from storage and stamp the visit.
    ///
    /// The first load ever marks the store as visited and resets the join
    /// date; every load updates `last_visit`.
    pub fn load(storage: &PrefsStorage<'_>, config: &UserConfig) -> Result<Self> {
        let mut profile = Self::new(config);
        match storage.preferences()? {
            Some(preferences) => profile.preferences = preferences,
            // only the individual keys survive, e.g. after a partial raw import
            None => {
                profile.preferences.theme = storage.theme()?;
                profile.preferences.language = storage.language()?;
                profile.preferences.view_mode = storage.view_mode()?;
            }
        }
        if let Some(stats) = storage.stats()? {
            profile.stats = stats;
        }
        profile.favorites = storage.favorites()?;
        profile.recent_visits = storage.recent_visits()?;
        profile.activities = storage.activities()?;

        let now = now_rfc3339();
        if storage.has_visited()? {
            profile.is_first_visit = false;
        } else {
            profile.is_first_visit = true;
            storage.mark_visited()?;
            profile.stats.join_date = now.clone();
        }
        profile.stats.last_visit = now;
        storage.set_stats(&profile.stats)?;
        Ok(profile)
    }

    pub fn save(&self, storage: &PrefsStorage<'_>) -> Result<()> {
        storage.set_preferences(&self.preferences)?;
        storage.set_stats(&self.stats)?;
        storage.set_favorites(&self.favorites)?;
        storage.set_recent_visits(&self.recent_visits)?;
        storage.set_activities(&self.activities)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|f| f == id)
    }

    /// Returns false when already a favorite
    pub fn add_favorite(&mut self, id: &str) -> bool {
        if self.is_favorite(id) {
            return false;
        }
        self.favorites.push(id.to_string());
        self.stats.favorite_count += 1;
        self.add_activity(ActivityType::Favorite, id, None, None);
        true
    }

    /// Returns false when not a favorite
    pub fn remove_favorite(&mut self, id: &str) -> bool {
        let Some(index) = self.favorites.iter().position(|f| f == id) else {
            return false;
        };
        self.favorites.remove(index);
        self.stats.favorite_count = self.stats.favorite_count.saturating_sub(1);
        true
    }

    /// Returns the new favorite state
    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        if self.is_favorite(id) {
            self.remove_favorite(id);
            false
        } else {
            self.add_favorite(id);
            true
        }
    }

    pub fn add_recent_visit(&mut self, navigation: &Navigation) {
        self.recent_visits.retain(|n| n.id != navigation.id);
        self.recent_visits.insert(0, navigation.clone());
        self.recent_visits.truncate(self.recent_visits_limit);
        self.stats.total_visits += 1;
        self.add_activity(
            ActivityType::Visit,
            &navigation.id,
            Some(navigation.title.clone()),
            None,
        );
    }

    pub fn record_search(&mut self, keyword: &str, result_count: usize) {
        self.stats.total_searches += 1;
        self.add_activity(
            ActivityType::Search,
            keyword,
            None,
            Some(serde_json::json!({ "resultCount": result_count })),
        );
    }

    pub fn record_share(&mut self, id: &str, platform: Option<&str>) {
        self.add_activity(
            ActivityType::Share,
            id,
            None,
            Some(serde_json::json!({ "platform": platform })),
        );
    }

    fn add_activity(
        &mut self,
        kind: ActivityType,
        target: &str,
        target_title: Option<String>,
        metadata: Option<serde_json::Value>,
    ) {
        let timestamp = Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.activities.insert(
            0,
            UserActivity {
                id: format!("activity_{}_{}", timestamp, &suffix[..9]),
                kind,
                target: target.to_string(),
                target_title,
                timestamp,
                metadata,
            },
        );
        self.activities.truncate(self.activities_limit);
    }

    pub fn clear_recent_visits(&mut self) {
        self.recent_visits.clear();
    }

    pub fn clear_activities(&mut self) {
        self.activities.clear();
    }

    /// Zero the counters, keeping the join date and favorite count
    pub fn reset_stats(&mut self) {
        self.stats = UserStats {
            favorite_count: self.favorites.len() as u64,
            join_date: std::mem::take(&mut self.stats.join_date),
            ..UserStats::default()
        };
    }

    /// The 20 newest activities
    pub fn recent_activities(&self) -> Vec<&UserActivity> {
        let mut sorted: Vec<&UserActivity> = self.activities.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted.truncate(20);
        sorted
    }

    /// Activity counts for the UTC day containing `now`
    pub fn today_stats(&self, now: DateTime<Utc>) -> TodayStats {
        let today = now.date_naive();
        let mut stats = TodayStats::default();
        for activity in &self.activities {
            let same_day = DateTime::<Utc>::from_timestamp_millis(activity.timestamp)
                .is_some_and(|at| at.date_naive() == today);
            if !same_day {
                continue;
            }
            match activity.kind {
                ActivityType::Visit => stats.visits += 1,
                ActivityType::Search => stats.searches += 1,
                ActivityType::Favorite => stats.favorites += 1,
                ActivityType::Share => stats.shares += 1,
            }
        }
        stats
    }

    /// Visits and searches per UTC day over the last 7 days, oldest first
    pub fn weekly_stats(&self, now: DateTime<Utc>) -> Vec<DailyActivity> {
        let mut days: Vec<DailyActivity> = (0..7)
            .rev()
            .map(|i| DailyActivity {
                date: (now - Duration::days(i)).format("%Y-%m-%d").to_string(),
                visits: 0,
                searches: 0,
            })
            .collect();

        let cutoff = (now - Duration::days(7)).timestamp_millis();
        for activity in self.activities.iter().filter(|a| a.timestamp > cutoff) {
            let Some(at) = DateTime::<Utc>::from_timestamp_millis(activity.timestamp) else {
                continue;
            };
            let date = at.format("%Y-%m-%d").to_string();
            if let Some(day) = days.iter_mut().find(|d| d.date == date) {
                match activity.kind {
                    ActivityType::Visit => day.visits += 1,
                    ActivityType::Search => day.searches += 1,
                    _ => {}
                }
            }
        }
        days
    }

    pub fn export(&self) -> UserDataExport {
        UserDataExport {
            preferences: self.preferences.clone(),
            stats: self.stats.clone(),
            favorites: self.favorites.clone(),
            recent_visits: self.recent_visits.clone(),
            activities: self.activities.clone(),
            export_time: now_rfc3339(),
        }
    }

    pub fn import(&mut self, data: UserDataImport) {
        if let Some(preferences) = data.preferences {
            self.preferences = preferences;
        }
        if let Some(stats) = data.stats {
            self.stats = stats;
        }
        if let Some(favorites) = data.favorites {
            self.favorites = favorites;
        }
        if let Some(recent_visits) = data.recent_visits {
            self.recent_visits = recent_visits;
        }
        if let Some(activities) = data.activities {
            self.activities = activities;
        }
    }

    /// Reset preferences, stats, favorites, visits and activities
    pub fn clear_all(&mut self) {
        self.preferences = UserPreferences::default();
        self.stats = UserStats::default();
        self.favorites.clear();
        self.recent_visits.clear();
        self.activities.clear();
    }
}
