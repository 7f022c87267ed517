//! Text utilities shared by scoring, deduplication and keyword extraction.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Default n-gram size for duplicate detection.
pub const DEFAULT_SHINGLE_SIZE: usize = 5;

/// Common English function words ignored by keyword extraction.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "aren't", "as", "at",
    "be", "been", "before", "being", "but", "by", "can", "can't", "cannot", "could", "did",
    "didn't", "do", "does", "doesn't", "doing", "don't", "for", "from", "had", "has", "have",
    "how", "i", "if", "in", "into", "is", "isn't", "it", "it's", "its", "just", "may", "me",
    "might", "must", "my", "no", "not", "of", "on", "or", "our", "should", "so", "some", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "to",
    "too", "under", "up", "very", "was", "wasn't", "we", "were", "what", "when", "where",
    "which", "while", "who", "why", "will", "with", "won't", "would", "you", "your",
];

/// Check whether a lower-cased word is a stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Split text into lower-cased word tokens.
///
/// Apostrophes inside words are kept so contractions stay intact.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Numeric value followed by a unit of measure.
///
/// Longer units come first so `mAh` is not read as `m`.
static MEASUREMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+(?:\.\d+)?)\s?(mAh|mA|mV|mm|ml|cm|km|kg|kHz|kW|MHz|GHz|Hz|psi|bar|rpm|lb|oz|ft|in|°C|°F|m|g|V|A|W|L)\b",
    )
    .ok()
});

/// Measurements in `text`, normalized without inner whitespace and
/// lower-cased (`12 V` becomes `12v`). Returned in order of appearance.
pub fn measurements(text: &str) -> Vec<String> {
    let Some(re) = MEASUREMENT.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .map(|caps| format!("{}{}", &caps[1], &caps[2]).to_lowercase())
        .collect()
}

/// Word n-grams of `text`.
///
/// Texts shorter than `n` words yield a single shingle holding every word.
pub fn shingles(text: &str, n: usize) -> HashSet<String> {
    let tokens = words(text);
    let n = n.max(1);

    if tokens.is_empty() {
        return HashSet::new();
    }
    if tokens.len() < n {
        return HashSet::from([tokens.join(" ")]);
    }

    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// Shared-shingle ratio between two texts.
///
/// Measured against the smaller shingle set, so a passage fully contained
/// in a longer one scores 1.0. Returns 0.0 when either text has no words.
pub fn shingle_overlap(a: &str, b: &str, n: usize) -> f32 {
    shingle_set_overlap(&shingles(a, n), &shingles(b, n))
}

/// Shared ratio between precomputed shingle sets.
pub fn shingle_set_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f32 / smaller as f32
}

/// Content fingerprint over the normalized word sequence.
///
/// Texts differing only in case, punctuation or spacing share a fingerprint.
pub fn fingerprint(text: &str) -> blake3::Hash {
    blake3::hash(words(text).join(" ").as_bytes())
}
