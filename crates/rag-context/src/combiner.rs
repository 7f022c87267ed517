//! Context combination: deduplicate, classify and assemble sections.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use serde::Serialize;
use tracing::debug;

use rag_core::text::{
    fingerprint, measurements, shingle_set_overlap, shingles, words, DEFAULT_SHINGLE_SIZE,
};
use rag_core::{
    Chunk, ContextExcerpt, ContextSection, Language, ScoredCandidate, SectionCategory,
    StrategyConfig,
};

use crate::prompt::not_found_notice;

/// Rendered when no excerpt survives, for English output.
pub const NO_CONTEXT: &str = "No relevant information was found in the provided documents.";

/// Verbs that open an instruction sentence.
const IMPERATIVE_VERBS: &[&str] = &[
    "adjust", "align", "apply", "attach", "calibrate", "charge", "check", "clean", "click",
    "close", "configure", "connect", "disconnect", "enable", "disable", "ensure", "enter",
    "follow", "hold", "insert", "install", "lift", "locate", "make", "mount", "open", "place",
    "plug", "power", "press", "pull", "push", "release", "remove", "replace", "reset",
    "restart", "rotate", "secure", "select", "set", "slide", "switch", "tap", "tighten", "loosen",
    "turn", "unplug", "use", "verify", "wait",
];

/// Caution vocabulary.
static WARNING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(warning|caution|danger|dangerous|safety|hazard|hazardous|do not|never)\b")
        .ok()
});

/// Vocabulary of specification tables.
static SPEC_VOCAB: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(specifications?|rated|dimensions|capacity|tolerance|voltage|wattage|weight)\b")
        .ok()
});

/// Leading list or step marker: `1.`, `2)`, `-`, `*`, `•`, `Step 3:`.
static STEP_MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:\d+[.)]|[-*•]|step\s+\d+[:.)]?)\s*").ok()
});

/// Sentence or line boundary.
static SENTENCE_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").ok());

/// Share of digit-bearing tokens above which text reads as a spec sheet.
const NUMERIC_DENSITY: f32 = 0.2;

fn matches(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Split text into trimmed, non-empty sentences.
pub fn sentences(text: &str) -> Vec<&str> {
    match SENTENCE_BREAK.as_ref() {
        Some(re) => re.split(text).map(str::trim).filter(|s| !s.is_empty()).collect(),
        None => vec![text.trim()],
    }
}

/// Number of list or step markers opening a line.
pub fn step_marker_count(text: &str) -> usize {
    STEP_MARKER
        .as_ref()
        .map_or(0, |re| re.find_iter(text).count())
}

fn strip_marker(sentence: &str) -> &str {
    match STEP_MARKER.as_ref().and_then(|re| re.find(sentence)) {
        Some(m) if m.start() == 0 => &sentence[m.end()..],
        _ => sentence,
    }
}

fn is_imperative(sentence: &str) -> bool {
    strip_marker(sentence)
        .split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .is_some_and(|w| IMPERATIVE_VERBS.contains(&w.as_str()))
}

fn is_procedure(text: &str) -> bool {
    if step_marker_count(text) >= 2 {
        return true;
    }
    let sentences = sentences(text);
    if sentences.is_empty() {
        return false;
    }
    let imperative = sentences.iter().filter(|s| is_imperative(s)).count();
    imperative > 0 && imperative * 2 >= sentences.len()
}

fn is_specification(text: &str) -> bool {
    if measurements(text).len() >= 2 || matches(&SPEC_VOCAB, text) {
        return true;
    }
    let tokens = words(text);
    if tokens.is_empty() {
        return false;
    }
    let numeric = tokens
        .iter()
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .count();
    numeric as f32 / tokens.len() as f32 >= NUMERIC_DENSITY
}

/// Assign a chunk to exactly one section category.
///
/// A source hint wins; otherwise warning, procedure and specification
/// rules are tried in that order.
pub fn classify(chunk: &Chunk) -> SectionCategory {
    if let Some(hint) = chunk.category_hint {
        return hint;
    }
    let text = chunk.text.as_str();
    if matches(&WARNING, text) {
        SectionCategory::Warning
    } else if is_procedure(text) {
        SectionCategory::Procedure
    } else if is_specification(text) {
        SectionCategory::Specification
    } else {
        SectionCategory::General
    }
}

/// Output of [`ContextCombiner::combine`].
#[derive(Debug, Clone, Serialize)]
pub struct CombinedContext {
    /// Non-empty sections in emission order.
    pub sections: Vec<ContextSection>,

    /// Candidates that survived deduplication, in rank order.
    pub candidates: Vec<ScoredCandidate>,

    /// Number of candidates dropped as duplicates.
    pub duplicates_removed: usize,

    /// Rendered context block.
    pub text: String,
}

impl CombinedContext {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Reduces a ranked candidate list to an annotated, sectioned context.
#[derive(Debug, Clone)]
pub struct ContextCombiner {
    duplicate_threshold: f32,
    shingle_size: usize,
    annotate: bool,
    language: Language,
}

impl Default for ContextCombiner {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.8,
            shingle_size: DEFAULT_SHINGLE_SIZE,
            annotate: true,
            language: Language::English,
        }
    }
}

impl ContextCombiner {
    pub fn new(duplicate_threshold: f32, shingle_size: usize) -> Self {
        Self {
            duplicate_threshold,
            shingle_size,
            ..Self::default()
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            duplicate_threshold: config.duplicate_threshold,
            shingle_size: config.shingle_size,
            annotate: config.annotate,
            language: config.language,
        }
    }

    /// Language of the notice rendered for an empty context.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Toggle section and excerpt headers.
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Drop exact and near duplicates, keeping the higher-ranked copy.
    ///
    /// Returns the survivors in rank order and the number removed.
    pub fn deduplicate(&self, candidates: &[ScoredCandidate]) -> (Vec<ScoredCandidate>, usize) {
        let mut ordered: Vec<&ScoredCandidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| a.rank_cmp(b));

        let mut fingerprints = HashSet::new();
        let mut kept_shingles: Vec<HashSet<String>> = Vec::new();
        let mut kept = Vec::with_capacity(ordered.len());

        for candidate in ordered {
            if !fingerprints.insert(fingerprint(&candidate.chunk.text)) {
                debug!(chunk_id = %candidate.id(), "Dropping exact duplicate");
                continue;
            }

            let grams = shingles(&candidate.chunk.text, self.shingle_size);
            if kept_shingles
                .iter()
                .any(|other| shingle_set_overlap(&grams, other) >= self.duplicate_threshold)
            {
                debug!(chunk_id = %candidate.id(), "Dropping near duplicate");
                continue;
            }

            kept_shingles.push(grams);
            kept.push(candidate.clone());
        }

        let removed = candidates.len() - kept.len();
        (kept, removed)
    }

    /// Deduplicate, classify and render the candidate list.
    pub fn combine(&self, candidates: &[ScoredCandidate]) -> CombinedContext {
        let (kept, duplicates_removed) = self.deduplicate(candidates);

        let mut grouped: HashMap<SectionCategory, Vec<ContextExcerpt>> = HashMap::new();
        for candidate in &kept {
            grouped
                .entry(classify(&candidate.chunk))
                .or_default()
                .push(ContextExcerpt {
                    chunk_id: candidate.id(),
                    text: candidate.chunk.text.clone(),
                    relevance: candidate.scores.relevance,
                    keyword_matches: candidate.keyword_matches,
                });
        }

        let sections: Vec<ContextSection> = SectionCategory::ALL
            .into_iter()
            .filter_map(|category| {
                grouped
                    .remove(&category)
                    .map(|excerpts| ContextSection { category, excerpts })
            })
            .collect();

        let text = self.render(&sections);

        debug!(
            "Combined {} candidates into {} sections ({} duplicates removed)",
            candidates.len(),
            sections.len(),
            duplicates_removed
        );

        CombinedContext {
            sections,
            candidates: kept,
            duplicates_removed,
            text,
        }
    }

    /// Render sections as a single text block.
    pub fn render(&self, sections: &[ContextSection]) -> String {
        if sections.is_empty() {
            return not_found_notice(self.language).to_string();
        }

        if !self.annotate {
            return sections
                .iter()
                .flat_map(|s| s.excerpts.iter().map(|e| e.text.trim()))
                .collect::<Vec<_>>()
                .join("\n\n");
        }

        let mut blocks = Vec::with_capacity(sections.len());
        let mut index = 0;
        for section in sections {
            let mut block = section.header();
            for excerpt in &section.excerpts {
                index += 1;
                block.push_str(&format!(
                    "\n[Excerpt {} - chunk {} - Relevance: {:.2}, Keywords: {}]\n{}",
                    index,
                    excerpt.chunk_id,
                    excerpt.relevance,
                    excerpt.keyword_matches,
                    excerpt.text.trim()
                ));
            }
            blocks.push(block);
        }
        blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::ScoreBreakdown;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn candidate(id: u64, text: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            chunk: Arc::new(Chunk::new(id, text, vec![], BTreeSet::new())),
            scores: ScoreBreakdown {
                relevance: score,
                final_score: score,
                ..Default::default()
            },
            keyword_matches: 1,
            matched_query: None,
        }
    }

    const PROCEDURE: &str = "1. Remove the back cover.\n2. Insert the battery pack.\n3. Press the power button for three seconds.";
    const SPEC: &str = "Input rating 12 V DC, 2 A. Operating range 0 to 40 °C.";
    const WARNING_TEXT: &str = "Warning: do not open the housing while the unit is charging.";
    const GENERAL: &str = "The widget ships with a carrying case and a quick reference card.";

    #[test]
    fn test_classify_rules() {
        let chunk = |text: &str| Chunk::new(1, text, vec![], BTreeSet::new());
        assert_eq!(classify(&chunk(PROCEDURE)), SectionCategory::Procedure);
        assert_eq!(classify(&chunk(SPEC)), SectionCategory::Specification);
        assert_eq!(classify(&chunk(WARNING_TEXT)), SectionCategory::Warning);
        assert_eq!(classify(&chunk(GENERAL)), SectionCategory::General);
        assert_eq!(
            classify(&chunk("Connect the charger. Wait until the light turns green.")),
            SectionCategory::Procedure
        );
    }

    #[test]
    fn test_category_hint_overrides() {
        let chunk = Chunk::new(1, GENERAL, vec![], BTreeSet::new())
            .with_category(SectionCategory::Warning);
        assert_eq!(classify(&chunk), SectionCategory::Warning);
    }

    #[test]
    fn test_sections_in_fixed_order_without_empties() {
        let combined = ContextCombiner::default().combine(&[
            candidate(1, WARNING_TEXT, 0.9),
            candidate(2, GENERAL, 0.8),
            candidate(3, PROCEDURE, 0.7),
        ]);

        let categories: Vec<SectionCategory> =
            combined.sections.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![
                SectionCategory::General,
                SectionCategory::Procedure,
                SectionCategory::Warning
            ]
        );
        assert!(combined.text.starts_with("## General Information"));
        assert!(!combined.text.contains("Specifications"));
        assert!(combined.text.contains("[Excerpt 3 - chunk 1 - Relevance: 0.90, Keywords: 1]"));
    }

    #[test]
    fn test_near_duplicate_keeps_higher_score() {
        let base = "Hold the reset button for ten seconds until the status light blinks blue twice";
        let near = "Hold the reset button for ten seconds until the status light blinks blue twice quickly";

        let combined = ContextCombiner::default().combine(&[
            candidate(4, near, 0.6),
            candidate(7, base, 0.9),
        ]);

        assert_eq!(combined.duplicates_removed, 1);
        assert_eq!(combined.candidates.len(), 1);
        assert_eq!(combined.candidates[0].id().0, 7);
    }

    #[test]
    fn test_exact_duplicate_removed() {
        let combined = ContextCombiner::default().combine(&[
            candidate(1, "Press reset.", 0.5),
            candidate(2, "press   RESET", 0.5),
        ]);
        assert_eq!(combined.duplicates_removed, 1);
        assert_eq!(combined.candidates[0].id().0, 1);
    }

    #[test]
    fn test_empty_input_renders_notice() {
        let combined = ContextCombiner::default().combine(&[]);
        assert!(combined.is_empty());
        assert_eq!(combined.text, NO_CONTEXT);
    }

    #[test]
    fn test_empty_input_notice_follows_language() {
        let combined = ContextCombiner::default()
            .with_language(Language::Gujarati)
            .combine(&[]);
        assert_eq!(combined.text, not_found_notice(Language::Gujarati));
        assert_ne!(combined.text, NO_CONTEXT);
    }

    #[test]
    fn test_plain_rendering() {
        let combined = ContextCombiner::default()
            .with_annotations(false)
            .combine(&[candidate(1, GENERAL, 0.5), candidate(2, SPEC, 0.4)]);
        assert_eq!(combined.text, format!("{}\n\n{}", GENERAL, SPEC));
    }

    #[test]
    fn test_combine_is_idempotent() {
        let combiner = ContextCombiner::default();
        let first = combiner.combine(&[
            candidate(1, PROCEDURE, 0.9),
            candidate(2, PROCEDURE, 0.8),
            candidate(3, SPEC, 0.7),
        ]);
        let second = combiner.combine(&first.candidates);

        assert_eq!(second.duplicates_removed, 0);
        assert_eq!(first.sections, second.sections);
        assert_eq!(first.text, second.text);
    }
}
