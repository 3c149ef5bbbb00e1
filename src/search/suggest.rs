use serde::Serialize;
use std::collections::HashMap;

use super::fuzzy::similarity;
use crate::types::{Category, Navigation};

/// Where a suggestion was harvested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Title,
    Tag,
    Category,
    Keyword,
}

impl std::fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestionKind::Title => write!(f, "title"),
            SuggestionKind::Tag => write!(f, "tag"),
            SuggestionKind::Category => write!(f, "category"),
            SuggestionKind::Keyword => write!(f, "keyword"),
        }
    }
}

/// A completion candidate for a partially typed keyword
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub text: String,
    pub kind: SuggestionKind,
    pub score: f64,
    pub count: usize,
}

/// Score a candidate against the keyword: prefix 10, substring 5,
/// otherwise three times the edit-distance similarity. Identical text scores 0.
pub fn suggestion_score(candidate: &str, keyword: &str) -> f64 {
    let candidate = candidate.to_lowercase();
    let keyword = keyword.to_lowercase();
    if candidate == keyword {
        0.0
    } else if candidate.starts_with(&keyword) {
        10.0
    } else if candidate.contains(&keyword) {
        5.0
    } else {
        similarity(&candidate, &keyword) * 3.0
    }
}

/// Harvest suggestions from title words, tags and category names.
///
/// Candidates are deduplicated by lower-cased text (the first spelling
/// seen wins) and counted; category names are never counted twice.
/// Ordered by score, then count, both descending.
pub fn generate_suggestions(
    items: &[Navigation],
    categories: &[Category],
    keyword: &str,
    limit: usize,
) -> Vec<Suggestion> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Vec::new();
    }
    let lower = keyword.to_lowercase();

    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Suggestion> = HashMap::new();
    let mut record = |text: &str, kind: SuggestionKind, counted: bool| {
        let key = text.to_lowercase();
        match by_key.get_mut(&key) {
            Some(existing) => {
                if counted {
                    existing.count += 1;
                }
            }
            None => {
                order.push(key.clone());
                by_key.insert(
                    key,
                    Suggestion {
                        text: text.to_string(),
                        kind,
                        score: suggestion_score(text, keyword),
                        count: 1,
                    },
                );
            }
        }
    };

    for item in items {
        if !item.title.to_lowercase().contains(&lower) {
            continue;
        }
        for word in item.title.split_whitespace() {
            if word.chars().count() > 2 && word.to_lowercase().contains(&lower) {
                record(word, SuggestionKind::Title, true);
            }
        }
    }

    for item in items {
        for tag in &item.tags {
            if tag.to_lowercase().contains(&lower) {
                record(tag, SuggestionKind::Tag, true);
            }
        }
    }

    for category in categories {
        if category.name.to_lowercase().contains(&lower) {
            record(&category.name, SuggestionKind::Category, false);
        }
    }

    let mut suggestions: Vec<Suggestion> = order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .filter(|s| s.score > 0.0)
        .collect();
    suggestions.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.count.cmp(&a.count))
    });
    suggestions.truncate(limit);
    suggestions
}
