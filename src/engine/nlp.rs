// ── TimeFlow Engine: Text Normalization & Similarity ───────────────────────
//
// Pure text helpers backing the response cache lookup:
//   - `normalize` strips accents, punctuation and Portuguese stopwords
//   - `extract_keywords` keeps the first few 4+-letter tokens
//   - `similarity` is the Jaccard index over keyword sets
//   - `find_best_match` scans cache entries for the closest pattern
//
// Everything here is deterministic and side-effect free; cache patterns are
// always stored in normalized form, so both sides of a comparison go through
// the same pipeline.

use crate::atoms::constants::{MAX_KEYWORDS, MIN_KEYWORD_LEN, STOPWORDS};
use crate::atoms::types::ResponseCacheEntry;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize free text for pattern comparison: lowercase, strip accents
/// (NFD decomposition, combining marks dropped), drop everything that is not
/// a word or space character, remove stopwords, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    stripped
        .split_whitespace()
        .filter(|word| !STOPWORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract up to `MAX_KEYWORDS` keywords (4+ letters, original order) from
/// the normalized form of `text`.
pub fn extract_keywords(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .filter(|word| word.chars().count() >= MIN_KEYWORD_LEN)
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity between the keyword sets of two texts, in [0, 1].
/// Either side yielding zero keywords defines the similarity as 0 — this
/// guards both the division by zero and spurious full-matches on empty input.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ka: HashSet<String> = extract_keywords(a).into_iter().collect();
    let kb: HashSet<String> = extract_keywords(b).into_iter().collect();

    if ka.is_empty() || kb.is_empty() {
        return 0.0;
    }

    let intersection = ka.intersection(&kb).count();
    let union = ka.union(&kb).count();
    intersection as f64 / union as f64
}

/// Find the cache entry whose pattern is most similar to `title`, if any
/// entry reaches `threshold`. Ties keep the first entry encountered — the
/// scan is stable so repeated lookups return the same entry.
pub fn find_best_match<'a>(
    entries: &'a [ResponseCacheEntry],
    title: &str,
    threshold: f64,
) -> Option<&'a ResponseCacheEntry> {
    let mut best: Option<&ResponseCacheEntry> = None;
    let mut best_score = 0.0_f64;

    for entry in entries {
        let score = similarity(title, &entry.activity_pattern);
        if score >= threshold && score > best_score {
            best_score = score;
            best = Some(entry);
        }
    }

    best
}

// ── Tests ──────────────────────────────────────────────────────────────────
