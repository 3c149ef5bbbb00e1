/// Normalized similarity `1 - distance / max(len)` in [0, 1], where
/// distance is the Levenshtein distance counted in chars.
///
/// Returns 0.0 when either side is empty, so an empty field never fuzzy-matches.
pub fn similarity(text: &str, pattern: &str) -> f64 {
    let text_len = text.chars().count();
    let pattern_len = pattern.chars().count();
    if text_len == 0 || pattern_len == 0 {
        return 0.0;
    }
    let distance = strsim::levenshtein(text, pattern);
    1.0 - distance as f64 / text_len.max(pattern_len) as f64
}
