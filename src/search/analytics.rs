use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One recorded search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub keyword: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
    pub result_count: usize,
    #[serde(default)]
    pub search_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: usize,
}

/// Summary of the search history
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchAnalytics {
    pub total_searches: usize,
    pub unique_keywords: usize,
    pub average_results: f64,
    pub top_keywords: Vec<KeywordCount>,
    pub no_result_keywords: Vec<String>,
    /// Per-day counts, oldest first, at most the last 30 days with activity
    pub trends: Vec<DailyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowQuery {
    pub keyword: String,
    pub search_time_ms: u64,
}

/// Timing and hit-rate report over recorded searches
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceReport {
    pub average_search_time_ms: f64,
    pub average_result_count: f64,
    pub slow_queries: Vec<SlowQuery>,
    pub no_result_queries: Vec<String>,
    pub popular_keywords: Vec<KeywordCount>,
    /// Share of searches that returned at least one result
    pub efficiency: f64,
}

/// Count keywords, keeping first-seen order for equal counts.
fn keyword_counts<'a>(keywords: impl Iterator<Item = &'a str>) -> Vec<KeywordCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<KeywordCount> = Vec::new();
    for keyword in keywords {
        match index.get(keyword) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(keyword, counts.len());
                counts.push(KeywordCount {
                    keyword: keyword.to_string(),
                    count: 1,
                });
            }
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Most searched keywords of the past week, top 10.
pub fn hot_keywords(history: &[HistoryEntry], now: DateTime<Utc>) -> Vec<String> {
    let cutoff = (now - Duration::days(7)).timestamp_millis();
    keyword_counts(
        history
            .iter()
            .filter(|h| h.timestamp > cutoff)
            .map(|h| h.keyword.as_str()),
    )
    .into_iter()
    .take(10)
    .map(|k| k.keyword)
    .collect()
}

impl SearchAnalytics {
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        if history.is_empty() {
            return Self::default();
        }

        let total = history.len();
        let unique_keywords = history
            .iter()
            .map(|h| h.keyword.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len();
        let average_results =
            history.iter().map(|h| h.result_count).sum::<usize>() as f64 / total as f64;

        let mut top_keywords = keyword_counts(history.iter().map(|h| h.keyword.as_str()));
        top_keywords.truncate(10);

        let no_result_keywords = history
            .iter()
            .filter(|h| h.result_count == 0)
            .map(|h| h.keyword.clone())
            .take(10)
            .collect();

        let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
        for entry in history {
            if let Some(at) = DateTime::<Utc>::from_timestamp_millis(entry.timestamp) {
                *per_day
                    .entry(at.format("%Y-%m-%d").to_string())
                    .or_default() += 1;
            }
        }
        let skip = per_day.len().saturating_sub(30);
        let trends = per_day
            .into_iter()
            .skip(skip)
            .map(|(date, count)| DailyCount { date, count })
            .collect();

        Self {
            total_searches: total,
            unique_keywords,
            average_results,
            top_keywords,
            no_result_keywords,
            trends,
        }
    }
}

impl PerformanceReport {
    pub fn analyze(history: &[HistoryEntry]) -> Self {
        if history.is_empty() {
            return Self::default();
        }
        let total = history.len() as f64;
        let average_search_time_ms =
            history.iter().map(|h| h.search_time_ms).sum::<u64>() as f64 / total;
        let average_result_count =
            history.iter().map(|h| h.result_count).sum::<usize>() as f64 / total;

        let threshold = average_search_time_ms * 2.0;
        let mut slow_queries: Vec<SlowQuery> = history
            .iter()
            .filter(|h| h.search_time_ms as f64 > threshold)
            .map(|h| SlowQuery {
                keyword: h.keyword.clone(),
                search_time_ms: h.search_time_ms,
            })
            .collect();
        slow_queries.sort_by(|a, b| b.search_time_ms.cmp(&a.search_time_ms));
        slow_queries.truncate(10);

        let no_result_queries = history
            .iter()
            .filter(|h| h.result_count == 0)
            .map(|h| h.keyword.clone())
            .take(20)
            .collect();

        let mut popular_keywords = keyword_counts(history.iter().map(|h| h.keyword.as_str()));
        popular_keywords.truncate(20);

        let successful = history.iter().filter(|h| h.result_count > 0).count();

        Self {
            average_search_time_ms,
            average_result_count,
            slow_queries,
            no_result_queries,
            popular_keywords,
            efficiency: successful as f64 / total,
        }
    }
}
