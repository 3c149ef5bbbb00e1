use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use super::fuzzy::similarity;
use super::preprocess::Lexicon;
use crate::config::SearchConfig;
use crate::types::{parse_timestamp, Category, Navigation};

/// CSS class wrapped around keyword occurrences in highlighted text
pub const HIGHLIGHT_CLASS: &str = "search-highlight";

/// Score awarded per match kind for one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeights {
    pub exact: f64,
    pub starts_with: f64,
    pub contains: f64,
    pub fuzzy: f64,
}

pub const TITLE_WEIGHTS: FieldWeights = FieldWeights {
    exact: 20.0,
    starts_with: 15.0,
    contains: 10.0,
    fuzzy: 5.0,
};

pub const TAG_WEIGHTS: FieldWeights = FieldWeights {
    exact: 10.0,
    starts_with: 8.0,
    contains: 6.0,
    fuzzy: 3.0,
};

pub const DESCRIPTION_WEIGHTS: FieldWeights = FieldWeights {
    exact: 8.0,
    starts_with: 6.0,
    contains: 5.0,
    fuzzy: 2.0,
};

pub const CATEGORY_WEIGHTS: FieldWeights = FieldWeights {
    exact: 5.0,
    starts_with: 4.0,
    contains: 2.0,
    fuzzy: 1.0,
};

pub const URL_WEIGHTS: FieldWeights = FieldWeights {
    exact: 2.0,
    starts_with: 1.0,
    contains: 1.0,
    fuzzy: 0.5,
};

/// Which part of an item produced a non-zero score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    Title,
    Description,
    Tags,
    Category,
    Url,
}

impl std::fmt::Display for MatchedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedField::Title => write!(f, "title"),
            MatchedField::Description => write!(f, "description"),
            MatchedField::Tags => write!(f, "tags"),
            MatchedField::Category => write!(f, "category"),
            MatchedField::Url => write!(f, "url"),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Relevance score, highest first
    #[default]
    Relevance,
    /// Last update time, newest first
    Time,
    /// Visit count, highest first
    Popularity,
    /// Rating, highest first
    Rating,
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortBy::Relevance => write!(f, "relevance"),
            SortBy::Time => write!(f, "time"),
            SortBy::Popularity => write!(f, "popularity"),
            SortBy::Rating => write!(f, "rating"),
        }
    }
}

/// Pre-scoring filters; an item failing any active filter is never scored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Keep items whose category id is listed (inactive when empty)
    pub categories: Vec<String>,
    /// Keep items sharing at least one tag (inactive when empty)
    pub tags: Vec<String>,
    /// Minimum rating (inactive when <= 0)
    pub rating: f64,
    /// Keep only items whose featured flag equals this
    pub featured: Option<bool>,
    /// Inclusive bounds on the creation time
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl SearchFilters {
    /// Whether `item` passes every active filter.
    pub fn matches(&self, item: &Navigation) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&item.category_id) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| item.tags.contains(t)) {
            return false;
        }
        if self.rating > 0.0 && item.rating < self.rating {
            return false;
        }
        if let Some(featured) = self.featured {
            if item.featured != featured {
                return false;
            }
        }
        if let Some((start, end)) = self.date_range {
            match parse_timestamp(&item.create_time) {
                Some(created) if created >= start && created <= end => {}
                _ => return false,
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A search request
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub keyword: String,
    pub filters: SearchFilters,
    pub sort_by: SortBy,
    /// No limit returns everything from `offset`
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SearchOptions {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Default::default()
        }
    }
}

/// A scored navigation item
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub item: Navigation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub score: f64,
    pub highlight_title: String,
    pub highlight_description: String,
    pub matched_fields: Vec<MatchedField>,
}

/// Tallies over the full (unpaginated) result set
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    pub total_results: usize,
    pub search_time_ms: u64,
    pub category_distribution: BTreeMap<String, usize>,
    pub tag_distribution: BTreeMap<String, usize>,
    pub rating_distribution: BTreeMap<String, usize>,
}

/// Output of one search pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub stats: SearchStats,
}

/// Keyword search and relevance ranking over an in-memory snapshot
#[derive(Debug, Clone)]
pub struct SearchEngine {
    lexicon: Lexicon,
    fuzzy_threshold: f64,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(Lexicon::default())
    }
}

impl SearchEngine {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            lexicon,
            fuzzy_threshold: 0.7,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(Lexicon::from_config(config)).with_fuzzy_threshold(config.fuzzy_threshold)
    }

    /// Configure the minimum similarity for the fuzzy fallback
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Filter, score, sort and paginate `items` for `options.keyword`.
    ///
    /// An empty keyword yields an empty outcome. Statistics describe the
    /// whole ranked set, not just the returned page.
    pub fn search(
        &self,
        items: &[Navigation],
        categories: &[Category],
        options: &SearchOptions,
    ) -> SearchOutcome {
        let started = Instant::now();
        let raw = options.keyword.trim();
        if raw.is_empty() {
            return SearchOutcome::default();
        }

        let terms = self.lexicon.search_terms(raw);
        let by_id: HashMap<&str, &Category> =
            categories.iter().map(|c| (c.id.as_str(), c)).collect();

        let mut results: Vec<SearchResult> = items
            .iter()
            .filter(|item| options.filters.matches(item))
            .filter_map(|item| {
                let category = by_id.get(item.category_id.as_str()).copied();
                self.score_item(item, category, &terms, raw)
            })
            .collect();

        sort_results(&mut results, options.sort_by);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let stats = generate_stats(&results, elapsed_ms);
        let results = paginate(results, options.limit, options.offset);

        tracing::debug!(
            keyword = raw,
            terms = terms.len(),
            total = stats.total_results,
            "search complete"
        );

        SearchOutcome { results, stats }
    }

    /// Score one item against the expanded `terms` and the raw keyword.
    ///
    /// Returns `None` when the final score is not positive.
    pub fn score_item(
        &self,
        item: &Navigation,
        category: Option<&Category>,
        terms: &[String],
        raw_keyword: &str,
    ) -> Option<SearchResult> {
        let raw_keyword = raw_keyword.trim();
        let mut total = 0.0;
        let mut matched_fields = Vec::new();
        let mut highlight_title = item.title.clone();
        let mut highlight_description = item.description.clone();

        let title_score = self.field_score(&item.title, terms, raw_keyword, TITLE_WEIGHTS);
        if title_score > 0.0 {
            total += title_score;
            matched_fields.push(MatchedField::Title);
            highlight_title = highlight(&item.title, raw_keyword);
        }

        if !item.description.is_empty() {
            let score =
                self.field_score(&item.description, terms, raw_keyword, DESCRIPTION_WEIGHTS);
            if score > 0.0 {
                total += score;
                matched_fields.push(MatchedField::Description);
                highlight_description = highlight(&item.description, raw_keyword);
            }
        }

        if !item.tags.is_empty() {
            let score = self.tags_score(&item.tags, terms, raw_keyword);
            if score > 0.0 {
                total += score;
                matched_fields.push(MatchedField::Tags);
            }
        }

        if let Some(category) = category {
            let score = self.field_score(&category.name, terms, raw_keyword, CATEGORY_WEIGHTS);
            if score > 0.0 {
                total += score;
                matched_fields.push(MatchedField::Category);
            }
        }

        let url_score = self.field_score(&item.url, terms, raw_keyword, URL_WEIGHTS);
        if url_score > 0.0 {
            total += url_score;
            matched_fields.push(MatchedField::Url);
        }

        let score = total * quality_multiplier(item);
        if score <= 0.0 {
            return None;
        }

        Some(SearchResult {
            item: item.clone(),
            category: category.cloned(),
            score,
            highlight_title,
            highlight_description,
            matched_fields,
        })
    }

    /// Score a single text field.
    ///
    /// The first branch that fires wins: exact, prefix, substring of the raw
    /// keyword, then expanded terms, then the fuzzy fallback.
    pub fn field_score(
        &self,
        field: &str,
        terms: &[String],
        raw_keyword: &str,
        weights: FieldWeights,
    ) -> f64 {
        let field = field.to_lowercase();
        let keyword = raw_keyword.to_lowercase();

        if field == keyword {
            return weights.exact;
        }
        if field.starts_with(&keyword) {
            return weights.starts_with;
        }
        if field.contains(&keyword) {
            return weights.contains;
        }

        let term_score: f64 = terms
            .iter()
            .filter(|term| field.contains(term.as_str()))
            .map(|_| weights.contains * 0.8)
            .sum();
        if term_score > 0.0 {
            return term_score;
        }

        let sim = similarity(&field, &keyword);
        if sim > self.fuzzy_threshold {
            return weights.fuzzy * sim;
        }
        0.0
    }

    /// Sum of per-tag scores
    pub fn tags_score(&self, tags: &[String], terms: &[String], raw_keyword: &str) -> f64 {
        tags.iter()
            .map(|tag| self.field_score(tag, terms, raw_keyword, TAG_WEIGHTS))
            .sum()
    }
}

/// Multiplier from item quality signals.
///
/// Featured adds 0.2, a non-zero rating adds `(rating - 3) * 0.1`, and more
/// than 100 visits add a log-scaled bonus capped at 0.3.
pub fn quality_multiplier(item: &Navigation) -> f64 {
    let mut weight = 1.0;
    if item.featured {
        weight += 0.2;
    }
    if item.rating != 0.0 {
        weight += (item.rating - 3.0) * 0.1;
    }
    if item.visit_count > 100 {
        weight += ((item.visit_count as f64 / 100.0).log10() * 0.1).min(0.3);
    }
    weight
}

/// Wrap case-insensitive occurrences of `keyword` in a highlight span.
///
/// The keyword is matched literally; original casing is preserved.
pub fn highlight(text: &str, keyword: &str) -> String {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return text.to_string();
    }
    match regex::RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re
            .replace_all(text, format!(r#"<span class="{HIGHLIGHT_CLASS}">$0</span>"#).as_str())
            .into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Stable sort by the selected key, descending.
pub fn sort_results(results: &mut [SearchResult], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => results.sort_by(|a, b| b.score.total_cmp(&a.score)),
        SortBy::Time => results.sort_by_key(|r| {
            std::cmp::Reverse(
                parse_timestamp(&r.item.update_time)
                    .map(|t| t.timestamp_millis())
                    .unwrap_or(0),
            )
        }),
        SortBy::Popularity => results.sort_by_key(|r| std::cmp::Reverse(r.item.visit_count)),
        SortBy::Rating => results.sort_by(|a, b| b.item.rating.total_cmp(&a.item.rating)),
    }
}

/// Slice `results` to `[offset, offset + limit)`.
pub fn paginate<T>(results: Vec<T>, limit: Option<usize>, offset: usize) -> Vec<T> {
    let iter = results.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

/// Tally category, tag and rating-bucket distributions.
pub fn generate_stats(results: &[SearchResult], search_time_ms: u64) -> SearchStats {
    let mut stats = SearchStats {
        total_results: results.len(),
        search_time_ms,
        ..Default::default()
    };

    for result in results {
        if let Some(category) = &result.category {
            *stats
                .category_distribution
                .entry(category.name.clone())
                .or_default() += 1;
        }
        for tag in &result.item.tags {
            *stats.tag_distribution.entry(tag.clone()).or_default() += 1;
        }
        let bucket = result.item.rating.floor() as i64;
        *stats
            .rating_distribution
            .entry(format!("{}-{}", bucket, bucket + 1))
            .or_default() += 1;
    }

    stats
}
