//! Concept extraction: technical terms, measurements and action verbs.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use rag_core::text::{is_stopword, measurements, words};

/// Closed list of action verbs, in base form.
const ACTION_VERBS: &[&str] = &[
    "calibrate", "charge", "check", "clean", "configure", "connect", "disconnect", "fix",
    "install", "mount", "power", "remove", "repair", "replace", "reset", "resolve", "restart",
    "setup", "start", "stop", "test", "troubleshoot", "uninstall", "update", "verify", "work",
];

/// Inflection suffixes stripped when matching action verbs.
const SUFFIXES: &[&str] = &["ing", "ed", "es", "s"];

/// Two or more capitalized words in a row.
static CAPITALIZED_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9]*(?:[ \t]+[A-Z][A-Za-z0-9]*)+\b").ok()
});

/// Model and part codes such as `X200` or `WX-5`.
static CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]+-?\d+[A-Z0-9-]*\b").ok());

/// All-caps acronyms.
static ACRONYM: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b[A-Z]{2,6}\b").ok());

fn find_all<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Vec<&'t str> {
    re.as_ref()
        .map(|re| re.find_iter(text).map(|m| m.as_str()).collect())
        .unwrap_or_default()
}

/// Base form of an inflected action verb, if it is one.
pub fn action_verb(word: &str) -> Option<&'static str> {
    let lookup = |w: &str| ACTION_VERBS.iter().copied().find(|v| *v == w);

    if let Some(verb) = lookup(word) {
        return Some(verb);
    }

    for suffix in SUFFIXES {
        let Some(stem) = word.strip_suffix(suffix) else {
            continue;
        };
        if stem.len() < 2 {
            continue;
        }
        if let Some(verb) = lookup(stem).or_else(|| lookup(&format!("{}e", stem))) {
            return Some(verb);
        }
        // stopped -> stopp -> stop
        let mut chars = stem.chars().rev();
        if let (Some(a), Some(b)) = (chars.next(), chars.next()) {
            if a == b {
                if let Some(verb) = lookup(&stem[..stem.len() - a.len_utf8()]) {
                    return Some(verb);
                }
            }
        }
    }
    None
}

const ARTICLES: &[&str] = &["The", "A", "An"];

fn push_term(terms: &mut Vec<String>, parts: &[&str], after_article: bool) {
    if parts.len() >= 2 || (after_article && parts.len() == 1) {
        let term = parts.join(" ").to_lowercase();
        if !is_stopword(&term) {
            terms.push(term);
        }
    }
}

/// Split a capitalized run on articles: `Check The Charging Dock` yields
/// `charging dock`, `The Widget` yields `widget`.
fn split_run(run: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut parts = Vec::new();
    let mut after_article = false;

    for word in run.split_whitespace() {
        if ARTICLES.contains(&word) {
            push_term(&mut terms, &parts, after_article);
            parts.clear();
            after_article = true;
        } else {
            parts.push(word);
        }
    }
    push_term(&mut terms, &parts, after_article);

    terms
}

/// Extract the normalized concept set of a text span.
///
/// Deterministic and pure; empty input yields an empty set.
pub fn extract_concepts(text: &str) -> BTreeSet<String> {
    let mut concepts = BTreeSet::new();

    if text.trim().is_empty() {
        return concepts;
    }

    concepts.extend(
        find_all(&CAPITALIZED_RUN, text)
            .into_iter()
            .flat_map(split_run),
    );
    concepts.extend(find_all(&CODE, text).into_iter().map(str::to_lowercase));
    concepts.extend(find_all(&ACRONYM, text).into_iter().map(str::to_lowercase));
    concepts.extend(measurements(text));
    concepts.extend(
        words(text)
            .iter()
            .filter_map(|w| action_verb(w))
            .map(str::to_string),
    );

    concepts
}

/// Share of the query's concepts present in `other`.
///
/// The denominator is at least one, so an empty query set scores 0.
pub fn concept_overlap(query: &BTreeSet<String>, other: &BTreeSet<String>) -> f32 {
    let shared = query.intersection(other).count();
    shared as f32 / query.len().max(1) as f32
}
