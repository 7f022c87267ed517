//! Relevance and quality scoring for (query, chunk) pairs.
//!
//! Every function here is pure. Strategies differ only in which phrasings
//! they score and what they do with the results, never in how a single
//! pair is scored.

use std::collections::BTreeSet;
use std::sync::Arc;

use rag_context::{sentences, step_marker_count};
use rag_core::{
    Chunk, LengthWindow, RagError, Result, ScoreBreakdown, ScoreWeights, ScoredCandidate,
    StrategyConfig,
};

/// One phrasing of a query, with its capability results.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryProbe {
    pub text: String,

    /// `None` when embedding failed; semantic scores are then 0.
    pub embedding: Option<Vec<f32>>,

    pub keywords: BTreeSet<String>,
}

impl QueryProbe {
    /// Whether the phrasing can discriminate between chunks at all.
    ///
    /// Without keywords and without a non-zero embedding only the length
    /// component contributes to relevance.
    pub fn has_signal(&self) -> bool {
        !self.keywords.is_empty()
            || self
                .embedding
                .as_ref()
                .is_some_and(|e| e.iter().any(|x| *x != 0.0))
    }
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        sim.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Keyword overlap ratio and match count.
pub fn keyword_overlap(query: &BTreeSet<String>, chunk: &BTreeSet<String>) -> (f32, usize) {
    if query.is_empty() {
        return (0.0, 0);
    }
    let matches = query.intersection(chunk).count();
    (matches as f32 / query.len() as f32, matches)
}

/// Triangular length preference: 1.0 inside the window, linear to 0 at
/// zero characters and at twice the upper bound.
pub fn length_score(len: usize, window: &LengthWindow) -> f32 {
    if window.contains(len) {
        1.0
    } else if len < window.min {
        len as f32 / window.min.max(1) as f32
    } else {
        let max = window.max.max(1) as f32;
        ((2.0 * max - len as f32) / max).clamp(0.0, 1.0)
    }
}

/// Structural quality heuristic in `[0, 1]`.
///
/// Blends length preference, list or step markers and clean sentence
/// boundaries.
pub fn quality_score(chunk: &Chunk, window: &LengthWindow) -> f32 {
    let text = chunk.text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let structure = match step_marker_count(text) {
        0 => 0.0,
        1 => 0.5,
        _ => 1.0,
    };

    let sentence = if sentences(text).is_empty() {
        0.0
    } else if text.ends_with(['.', '!', '?', ':']) {
        1.0
    } else {
        0.5
    };

    0.4 * length_score(chunk.char_len, window) + 0.3 * structure + 0.3 * sentence
}

/// Scores chunks against query phrasings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoreWeights,
    window: LengthWindow,
}

impl Scorer {
    pub fn new(weights: ScoreWeights, window: LengthWindow) -> Self {
        Self { weights, window }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.weights, config.length_window)
    }

    /// Weighted relevance blend.
    pub fn relevance(&self, semantic: f32, keyword: f32, length: f32) -> f32 {
        self.weights.semantic * semantic + self.weights.keyword * keyword + self.weights.length * length
    }

    /// Score one chunk against one phrasing.
    ///
    /// Fails with `DimensionMismatch` when the chunk's embedding cannot be
    /// compared with the query's; the caller skips that chunk.
    pub fn score(&self, probe: &QueryProbe, chunk: &Arc<Chunk>) -> Result<ScoredCandidate> {
        let semantic = match &probe.embedding {
            Some(query) if query.len() != chunk.embedding.len() => {
                return Err(RagError::DimensionMismatch {
                    expected: query.len(),
                    actual: chunk.embedding.len(),
                });
            }
            Some(query) => cosine_similarity(query, &chunk.embedding),
            None => 0.0,
        };

        let (keyword, keyword_matches) = keyword_overlap(&probe.keywords, &chunk.keywords);
        let length = length_score(chunk.char_len, &self.window);
        let relevance = self.relevance(semantic, keyword, length);

        Ok(ScoredCandidate {
            chunk: Arc::clone(chunk),
            scores: ScoreBreakdown {
                semantic,
                keyword,
                length,
                relevance,
                quality: quality_score(chunk, &self.window),
                diversity_penalty: 0.0,
                final_score: relevance,
            },
            keyword_matches,
            matched_query: None,
        })
    }
}
