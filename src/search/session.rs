use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::analytics::{hot_keywords, HistoryEntry, PerformanceReport, SearchAnalytics};
use super::engine::{SearchEngine, SearchFilters, SearchOptions, SearchResult, SearchStats, SortBy};
use super::suggest::{generate_suggestions, Suggestion, SuggestionKind};
use crate::config::SearchConfig;
use crate::types::{Category, Navigation};

/// Searches offered before the user has typed anything
pub const HOT_SEARCHES: &[&str] = &[
    "ChatGPT",
    "AI绘画",
    "代码生成",
    "文本转语音",
    "图像识别",
    "机器学习",
    "自然语言处理",
    "计算机视觉",
];

/// Current keyword, filters, last results and the search history.
///
/// The session does not persist anything itself; callers load the history
/// with [`SearchSession::with_history`] and save [`SearchSession::history`].
#[derive(Debug, Clone)]
pub struct SearchSession {
    engine: SearchEngine,
    keyword: String,
    filters: SearchFilters,
    sort_by: SortBy,
    limit: Option<usize>,
    offset: usize,
    results: Vec<SearchResult>,
    stats: SearchStats,
    suggestions: Vec<Suggestion>,
    history: Vec<HistoryEntry>,
    history_limit: usize,
    suggestion_limit: usize,
    hot_searches: Vec<String>,
}

impl SearchSession {
    pub fn new(engine: SearchEngine) -> Self {
        Self {
            engine,
            keyword: String::new(),
            filters: SearchFilters::default(),
            sort_by: SortBy::default(),
            limit: None,
            offset: 0,
            results: Vec::new(),
            stats: SearchStats::default(),
            suggestions: Vec::new(),
            history: Vec::new(),
            history_limit: 100,
            suggestion_limit: 10,
            hot_searches: HOT_SEARCHES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        let mut session = Self::new(SearchEngine::from_config(config));
        session.history_limit = config.history_limit;
        session.suggestion_limit = config.suggestion_limit;
        session
    }

    /// Seed with a previously persisted history (newest first)
    pub fn with_history(mut self, mut history: Vec<HistoryEntry>) -> Self {
        history.truncate(self.history_limit);
        self.history = history;
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn hot_searches(&self) -> &[String] {
        &self.hot_searches
    }

    /// The ten most recent distinct keywords
    pub fn recent_searches(&self) -> Vec<&str> {
        self.history.iter().take(10).map(|h| h.keyword.as_str()).collect()
    }

    /// Run a search and record it.
    ///
    /// `options.filters` replaces the session filters. A blank keyword clears
    /// the current results and records nothing.
    pub fn search(
        &mut self,
        items: &[Navigation],
        categories: &[Category],
        options: SearchOptions,
    ) -> &[SearchResult] {
        let keyword = options.keyword.trim().to_string();
        if keyword.is_empty() {
            self.clear_results();
            return &self.results;
        }

        self.keyword = keyword.clone();
        self.filters = options.filters.clone();
        self.sort_by = options.sort_by;
        self.limit = options.limit;
        self.offset = options.offset;

        let outcome = self.engine.search(items, categories, &options);
        self.record(&keyword, outcome.stats.total_results, outcome.stats.search_time_ms);
        self.suggestions =
            generate_suggestions(items, categories, &keyword, self.suggestion_limit);
        self.results = outcome.results;
        self.stats = outcome.stats;
        &self.results
    }

    fn record(&mut self, keyword: &str, result_count: usize, search_time_ms: u64) {
        self.history.retain(|h| h.keyword != keyword);
        self.history.insert(
            0,
            HistoryEntry {
                keyword: keyword.to_string(),
                timestamp: Utc::now().timestamp_millis(),
                result_count,
                search_time_ms,
            },
        );
        self.history.truncate(self.history_limit);
    }

    pub fn clear_results(&mut self) {
        self.keyword.clear();
        self.results.clear();
        self.stats = SearchStats::default();
        self.suggestions.clear();
    }

    /// Make `options` current without running it, so a later
    /// [`SearchSession::update_filters`] refines it
    pub fn resume(&mut self, options: SearchOptions) {
        self.keyword = options.keyword.trim().to_string();
        self.filters = options.filters;
        self.sort_by = options.sort_by;
        self.limit = options.limit;
        self.offset = options.offset;
    }

    /// Replace the filters and re-run the current keyword, if any.
    /// Sort order and page window stay as they were.
    pub fn update_filters(
        &mut self,
        filters: SearchFilters,
        items: &[Navigation],
        categories: &[Category],
    ) {
        self.filters = filters;
        if !self.keyword.is_empty() {
            let options = SearchOptions {
                keyword: self.keyword.clone(),
                filters: self.filters.clone(),
                sort_by: self.sort_by,
                limit: self.limit,
                offset: self.offset,
            };
            self.search(items, categories, options);
        }
    }

    pub fn reset_filters(&mut self) {
        self.filters = SearchFilters::default();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Returns whether an entry was removed
    pub fn remove_from_history(&mut self, keyword: &str) -> bool {
        let before = self.history.len();
        self.history.retain(|h| h.keyword != keyword);
        self.history.len() != before
    }

    /// Completions for a partially typed input from history, hot searches,
    /// category names and popular tags, in that order. At most 10.
    pub fn quick_suggestions(
        &self,
        input: &str,
        items: &[Navigation],
        categories: &[Category],
    ) -> Vec<Suggestion> {
        let input = input.trim();
        if input.is_empty() {
            return Vec::new();
        }
        let lower = input.to_lowercase();

        let candidates = self
            .history
            .iter()
            .map(|h| (h.keyword.clone(), SuggestionKind::Keyword))
            .chain(
                self.hot_searches
                    .iter()
                    .map(|k| (k.clone(), SuggestionKind::Keyword)),
            )
            .chain(
                categories
                    .iter()
                    .map(|c| (c.name.clone(), SuggestionKind::Category)),
            )
            .chain(
                popular_tags(items)
                    .into_iter()
                    .map(|t| (t, SuggestionKind::Tag)),
            );

        let mut out: Vec<Suggestion> = Vec::new();
        for (text, kind) in candidates {
            if out.len() == 10 {
                break;
            }
            if text.to_lowercase().contains(&lower) && !out.iter().any(|s| s.text == text) {
                out.push(Suggestion {
                    text,
                    kind,
                    score: 0.0,
                    count: 1,
                });
            }
        }
        out
    }

    pub fn analytics(&self) -> SearchAnalytics {
        SearchAnalytics::from_history(&self.history)
    }

    pub fn hot_keywords(&self, now: DateTime<Utc>) -> Vec<String> {
        hot_keywords(&self.history, now)
    }

    pub fn performance(&self) -> PerformanceReport {
        PerformanceReport::analyze(&self.history)
    }
}

/// The 20 most used tags, most frequent first.
pub fn popular_tags(items: &[Navigation]) -> Vec<String> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for tag in items.iter().flat_map(|n| n.tags.iter()) {
        match index.get(tag.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(tag.as_str(), counts.len());
                counts.push((tag.as_str(), 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(20)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(id: &str, title: &str, tags: &[&str]) -> Navigation {
        Navigation {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            url: String::new(),
            icon: None,
            category_id: "cat_1".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            featured: false,
            is_active: true,
            visit_count: 0,
            rating: 0.0,
            create_time: "2024-01-01T00:00:00Z".to_string(),
            update_time: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn items() -> Vec<Navigation> {
        vec![
            nav("nav_1", "ChatGPT", &["chat", "ai"]),
            nav("nav_2", "Claude", &["chat", "writing"]),
            nav("nav_3", "Midjourney", &["image", "ai"]),
        ]
    }

    #[test]
    fn test_search_records_history_and_suggestions() {
        let mut session = SearchSession::new(SearchEngine::default());
        let results = session.search(&items(), &[], SearchOptions::new("chat")).len();
        assert!(results >= 2);
        assert_eq!(session.keyword(), "chat");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].result_count, results);
        assert!(session.suggestions().iter().any(|s| s.text == "ChatGPT"));
    }

    #[test]
    fn test_empty_keyword_clears_state() {
        let mut session = SearchSession::new(SearchEngine::default());
        session.search(&items(), &[], SearchOptions::new("chat"));
        assert!(!session.results().is_empty());

        let results = session.search(&items(), &[], SearchOptions::new("  "));
        assert!(results.is_empty());
        assert_eq!(session.keyword(), "");
        assert_eq!(session.stats().total_results, 0);
        assert!(session.suggestions().is_empty());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_history_dedup_newest_first_and_capped() {
        let mut session = SearchSession::new(SearchEngine::default());
        session.history_limit = 3;
        for keyword in ["chat", "image", "chat", "writing", "ai"] {
            session.search(&items(), &[], SearchOptions::new(keyword));
        }
        let keywords = session.recent_searches();
        assert_eq!(keywords, vec!["ai", "writing", "chat"]);
    }

    #[test]
    fn test_update_filters_reruns_current_keyword() {
        let mut session = SearchSession::new(SearchEngine::default());
        let data = items();
        session.search(&data, &[], SearchOptions::new("chat"));
        let before = session.results().len();

        let filters = SearchFilters {
            tags: vec!["writing".into()],
            ..Default::default()
        };
        session.update_filters(filters, &data, &[]);
        assert!(session.results().len() < before);
        assert!(session.results().iter().all(|r| r.item.id == "nav_2"));

        session.reset_filters();
        assert!(session.filters().is_empty());
    }

    #[test]
    fn test_resume_then_refine_keeps_page_window() {
        let mut session = SearchSession::new(SearchEngine::default());
        let data = items();
        session.resume(SearchOptions {
            keyword: " chat ".into(),
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(session.keyword(), "chat");
        assert!(session.results().is_empty());
        assert!(session.history().is_empty());

        session.update_filters(SearchFilters::default(), &data, &[]);
        assert_eq!(session.results().len(), 1);
        assert!(session.stats().total_results >= 2);
        assert_eq!(session.history()[0].keyword, "chat");
    }

    #[test]
    fn test_remove_and_clear_history() {
        let mut session = SearchSession::new(SearchEngine::default());
        session.search(&items(), &[], SearchOptions::new("chat"));
        session.search(&items(), &[], SearchOptions::new("image"));
        assert!(session.remove_from_history("chat"));
        assert!(!session.remove_from_history("chat"));
        assert_eq!(session.history().len(), 1);
        session.clear_history();
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_quick_suggestions_sources_and_dedupe() {
        let mut session = SearchSession::new(SearchEngine::default());
        session.search(&items(), &[], SearchOptions::new("chatgpt"));
        let suggestions = session.quick_suggestions("chat", &items(), &[]);
        let texts: Vec<&str> = suggestions.iter().map(|s| s.text.as_str()).collect();
        // history "chatgpt", hot "ChatGPT", tag "chat"
        assert_eq!(texts, vec!["chatgpt", "ChatGPT", "chat"]);
        assert_eq!(suggestions[2].kind, SuggestionKind::Tag);
        assert!(session.quick_suggestions("", &items(), &[]).is_empty());
    }

    #[test]
    fn test_popular_tags_order() {
        assert_eq!(popular_tags(&items())[..2], ["chat".to_string(), "ai".to_string()]);
    }

    #[test]
    fn test_with_history_truncates() {
        let history: Vec<HistoryEntry> = (0..150)
            .map(|i| HistoryEntry {
                keyword: format!("k{i}"),
                timestamp: i,
                result_count: 1,
                search_time_ms: 0,
            })
            .collect();
        let session = SearchSession::new(SearchEngine::default()).with_history(history);
        assert_eq!(session.history().len(), 100);
        assert_eq!(session.analytics().total_searches, 100);
    }
}
