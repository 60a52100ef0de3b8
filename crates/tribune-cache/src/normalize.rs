//! Cache key normalization.

use std::collections::HashSet;

/// Lowercase, turn punctuation into spaces and collapse whitespace.
///
/// Two questions that differ only in case, punctuation or spacing map to the
/// same key. Accented letters are kept.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Distinct words of an already-normalized string with at least `min_len`
/// characters, in first-seen order.
pub fn significant_words(normalized: &str, min_len: usize) -> Vec<&str> {
    let mut seen = HashSet::new();
    normalized
        .split_whitespace()
        .filter(|w| w.chars().count() >= min_len)
        .filter(|w| seen.insert(*w))
        .collect()
}
