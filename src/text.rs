//! Keyword normalization and similarity scoring for place matching.
//!
//! Every stored keyword is a normalized fingerprint of a query that once
//! reached a place. Matching compares a new query against those fingerprints
//! with two signals:
//! - Jaccard overlap of stop-word-filtered token sets
//! - Sequence-alignment ratio (Ratcliff/Obershelp) of the filtered token strings
//!
//! The combined score is `0.6 * jaccard + 0.4 * edit`.

use std::collections::{HashMap, HashSet};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const JACCARD_WEIGHT: f64 = 0.6;
const EDIT_WEIGHT: f64 = 0.4;

/// CJK Unified Ideographs survive normalization alongside ASCII letters and digits.
const LOCAL_SCRIPT: std::ops::RangeInclusive<char> = '\u{4e00}'..='\u{9fff}';

/// Similarity of one query against one keyword (or the best keyword of a record).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchScore {
    pub score: f64,
    pub jaccard: f64,
    pub edit: f64,
}

impl MatchScore {
    pub fn new(jaccard: f64, edit: f64) -> Self {
        Self {
            score: JACCARD_WEIGHT * jaccard + EDIT_WEIGHT * edit,
            jaccard,
            edit,
        }
    }
}

/// Normalize text into a keyword fingerprint.
///
/// Lowercases, strips diacritics, replaces every run of characters other than
/// ASCII letters, digits and CJK ideographs with a single space, and trims.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for c in folded.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || LOCAL_SCRIPT.contains(&c) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// `|A ∩ B| / |A ∪ B|`, or 0.0 when either side is empty.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let sa: HashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = b.iter().map(String::as_str).collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    intersection as f64 / union as f64
}

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`.
///
/// Matches Python's `difflib.SequenceMatcher(None, a, b).ratio()` for inputs
/// shorter than 200 characters (no junk heuristic). Two empty strings are
/// identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Sum of the sizes of all matching blocks, found by recursively taking the
/// longest common substring and recursing on both sides of it.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`; earliest in `a` wins ties.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        j2len = next;
    }
    (best_i, best_j, best_k)
}

/// Tokenizer and scorer bound to a stop-word set.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    stopwords: HashSet<String>,
}

impl TextMatcher {
    /// Build a matcher from configured stop-words plus the primary city name.
    pub fn new(stopwords: &[String], city: &str) -> Self {
        let mut set: HashSet<String> = stopwords
            .iter()
            .map(|w| normalize(w))
            .filter(|w| !w.is_empty())
            .collect();
        let city = normalize(city);
        if !city.is_empty() {
            set.insert(city);
        }
        Self { stopwords: set }
    }

    /// Normalized tokens without stop-words, deduplicated in first-seen order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        normalize(text)
            .split_whitespace()
            .filter(|t| !self.stopwords.contains(*t))
            .filter(|t| seen.insert(t.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// Sequence ratio between the space-joined token forms of `a` and `b`.
    pub fn edit_similarity(&self, a: &str, b: &str) -> f64 {
        sequence_ratio(&self.tokenize(a).join(" "), &self.tokenize(b).join(" "))
    }

    /// Combined score of `query` against a single keyword.
    pub fn score(&self, query: &str, keyword: &str) -> MatchScore {
        let j = jaccard(&self.tokenize(query), &self.tokenize(keyword));
        let e = self.edit_similarity(query, keyword);
        MatchScore::new(j, e)
    }

    /// Highest-scoring keyword of a record. A record without keywords scores zero.
    pub fn best_keyword_score(&self, query: &str, keywords: &[String]) -> MatchScore {
        let query_tokens = self.tokenize(query);
        let query_form = query_tokens.join(" ");
        let mut best = MatchScore::default();
        for keyword in keywords.iter().filter(|k| !k.trim().is_empty()) {
            let keyword_tokens = self.tokenize(keyword);
            let candidate = MatchScore::new(
                jaccard(&query_tokens, &keyword_tokens),
                sequence_ratio(&query_form, &keyword_tokens.join(" ")),
            );
            if candidate.score > best.score {
                best = candidate;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> TextMatcher {
        let stopwords: Vec<String> = ["hotel", "the", "by", "centre"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        TextMatcher::new(&stopwords, "Amsterdam")
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_collapses_punctuation_and_case() {
        assert_eq!(normalize("  The Hoxton,  Amsterdam!! "), "the hoxton amsterdam");
        assert_eq!(normalize("Hotel-V/Nesplein"), "hotel v nesplein");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Café Élysée"), "cafe elysee");
        assert_eq!(normalize("Zürich Straße"), "zurich stra e");
    }

    #[test]
    fn test_normalize_keeps_local_script() {
        assert_eq!(normalize("阿姆斯特丹 Central"), "阿姆斯特丹 central");
        assert_eq!(normalize("Кремль 12"), "12");
    }

    #[test]
    fn test_tokenize_drops_stopwords_and_city() {
        let m = matcher();
        assert_eq!(m.tokenize("The Hoxton Amsterdam"), strings(&["hoxton"]));
        assert_eq!(
            m.tokenize("Park Plaza Park Hotel"),
            strings(&["park", "plaza"])
        );
        assert!(m.tokenize("Hotel Amsterdam").is_empty());
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&strings(&["a", "b"]), &strings(&["a", "b"])), 1.0);
        assert_eq!(jaccard(&strings(&["a", "b"]), &strings(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard(&[], &strings(&["a"])), 0.0);
        assert_eq!(jaccard(&[], &[]), 0.0);
        let four_of_five = jaccard(
            &strings(&["a", "b", "c", "d", "e"]),
            &strings(&["a", "b", "c", "d"]),
        );
        assert_eq!(four_of_five, 0.8);
    }

    #[test]
    fn test_sequence_ratio_matches_difflib() {
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("abc", ""), 0.0);
        assert_eq!(sequence_ratio("abcd", "bcde"), 0.75);
        assert_eq!(sequence_ratio("central station", "central station"), 1.0);
        // "central station" is a 15-char prefix of the 20-char keyword
        let r = sequence_ratio("central station", "central station east");
        assert!((r - 30.0 / 35.0).abs() < 1e-12, "ratio {}", r);
        // Order-sensitive, like difflib: "tide"/"diet" is 0.25, "diet"/"tide" is 0.5
        assert_eq!(sequence_ratio("tide", "diet"), 0.25);
        assert_eq!(sequence_ratio("diet", "tide"), 0.5);
    }

    #[test]
    fn test_edit_similarity_ignores_punctuation_and_stopwords() {
        let m = matcher();
        assert_eq!(m.edit_similarity("The Hoxton, Amsterdam", "hoxton"), 1.0);
        assert!(m.edit_similarity("Hoxton", "Pulitzer") < 0.5);
    }

    #[test]
    fn test_combined_score_weights() {
        let s = MatchScore::new(0.5, 1.0);
        assert!((s.score - 0.7).abs() < 1e-12);
        let m = matcher();
        let exact = m.score("The Hoxton", "hoxton amsterdam");
        assert_eq!(exact.jaccard, 1.0);
        assert_eq!(exact.edit, 1.0);
        assert!((exact.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_best_keyword_score_takes_highest() {
        let m = matcher();
        let keywords = strings(&["pulitzer", "hoxton amsterdam", ""]);
        let best = m.best_keyword_score("Hoxton", &keywords);
        assert_eq!(best.jaccard, 1.0);
        assert!(m.best_keyword_score("Hoxton", &[]).score == 0.0);
    }
}
