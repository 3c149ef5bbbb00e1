//! Keyword preprocessing for directory search.
//!
//! A raw query is normalized, split into tokens, stripped of stop words and
//! expanded through a synonym table so that "AI" also finds items that only
//! mention "人工智能" or "machine learning".

use std::collections::HashSet;

use crate::config::SearchConfig;

/// Stop words removed from keyword queries (mixed Chinese/English).
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个",
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Domain synonym groups: key followed by its equivalents.
pub const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("AI", &["人工智能", "artificial intelligence", "machine learning", "ML"]),
    ("人工智能", &["AI", "artificial intelligence", "machine learning"]),
    ("机器学习", &["ML", "machine learning", "AI", "人工智能"]),
    ("深度学习", &["deep learning", "DL", "neural network"]),
    ("神经网络", &["neural network", "NN", "deep learning"]),
    ("自然语言处理", &["NLP", "natural language processing", "文本处理"]),
    ("计算机视觉", &["computer vision", "CV", "图像识别", "image recognition"]),
    ("图像识别", &["image recognition", "computer vision", "计算机视觉"]),
    ("语音识别", &["speech recognition", "voice recognition", "ASR"]),
    ("文本生成", &["text generation", "text synthesis", "内容生成"]),
    ("代码生成", &["code generation", "code synthesis", "编程助手"]),
    ("聊天机器人", &["chatbot", "chat bot", "对话系统", "conversational AI"]),
    ("翻译", &["translation", "translate", "机器翻译", "machine translation"]),
];

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Normalize a raw keyword: lower-case, punctuation to spaces, collapsed whitespace.
///
/// ASCII letters, digits, `_` and CJK ideographs survive; everything else
/// becomes a separator.
pub fn normalize(keyword: &str) -> String {
    let replaced: String = keyword
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || is_cjk(c) {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stop words and synonym groups used to turn a query into search terms.
///
/// All entries are stored lower-cased.
#[derive(Debug, Clone)]
pub struct Lexicon {
    stop_words: HashSet<String>,
    synonyms: Vec<(String, Vec<String>)>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(
            DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()),
            DEFAULT_SYNONYMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect())),
        )
    }
}

impl Lexicon {
    pub fn new(
        stop_words: impl IntoIterator<Item = String>,
        synonyms: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> Self {
        Self {
            stop_words: stop_words.into_iter().map(|w| w.to_lowercase()).collect(),
            synonyms: synonyms
                .into_iter()
                .map(|(k, v)| {
                    (
                        k.to_lowercase(),
                        v.into_iter().map(|s| s.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Build from config: custom stop words replace the defaults, custom
    /// synonym groups replace same-key defaults and append new keys.
    pub fn from_config(config: &SearchConfig) -> Self {
        let stop_words: Vec<String> = if config.stop_words.is_empty() {
            DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
        } else {
            config.stop_words.clone()
        };

        let mut synonyms: Vec<(String, Vec<String>)> = DEFAULT_SYNONYMS
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect();
        for (key, values) in &config.synonyms {
            match synonyms.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
                Some(existing) => existing.1 = values.clone(),
                None => synonyms.push((key.clone(), values.clone())),
            }
        }

        Self::new(stop_words, synonyms)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Split a normalized keyword into unique, meaningful tokens.
    ///
    /// Tokens of a single character and stop words are dropped.
    pub fn extract_keywords(&self, normalized: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        normalized
            .split(' ')
            .filter(|w| w.chars().count() > 1 && !self.is_stop_word(w))
            .filter(|w| seen.insert(w.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// Expand tokens with one level of synonyms.
    ///
    /// A token pulls in a whole group when it equals the group key or when
    /// it is a substring of any of the group's values.
    pub fn expand(&self, keywords: &[String]) -> Vec<String> {
        fn push_unique(expanded: &mut Vec<String>, term: &str) {
            if !expanded.iter().any(|t| t == term) {
                expanded.push(term.to_string());
            }
        }

        let mut expanded: Vec<String> = Vec::new();
        for keyword in keywords {
            push_unique(&mut expanded, keyword);
        }
        for keyword in keywords {
            for (key, values) in &self.synonyms {
                let hit = key == keyword || values.iter().any(|v| v.contains(keyword.as_str()));
                if hit {
                    push_unique(&mut expanded, key);
                    for value in values {
                        push_unique(&mut expanded, value);
                    }
                }
            }
        }
        expanded
    }

    /// Full pipeline: normalize, tokenize, expand.
    pub fn search_terms(&self, keyword: &str) -> Vec<String> {
        let normalized = normalize(keyword);
        let keywords = self.extract_keywords(&normalized);
        self.expand(&keywords)
    }
}
