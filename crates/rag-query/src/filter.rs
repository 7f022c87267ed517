//! Concept-overlap filtering of candidates.

use rayon::prelude::*;
use std::collections::BTreeSet;

use tracing::debug;

use rag_core::ScoredCandidate;

use crate::concepts::{concept_overlap, extract_concepts};

/// Drops candidates sharing too few concepts with the query.
#[derive(Debug, Clone, Copy)]
pub struct SemanticFilter {
    threshold: f32,
}

impl Default for SemanticFilter {
    fn default() -> Self {
        Self { threshold: 0.2 }
    }
}

impl SemanticFilter {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Keep candidates whose concept overlap reaches the threshold.
    ///
    /// An empty query concept set passes everything through unchanged.
    pub fn apply(
        &self,
        query_concepts: &BTreeSet<String>,
        candidates: Vec<ScoredCandidate>,
    ) -> Vec<ScoredCandidate> {
        if query_concepts.is_empty() {
            debug!("Query has no concepts; semantic filter is a no-op");
            return candidates;
        }

        let before = candidates.len();
        let kept: Vec<ScoredCandidate> = candidates
            .into_par_iter()
            .filter(|c| {
                let concepts = extract_concepts(&c.chunk.text);
                concept_overlap(query_concepts, &concepts) >= self.threshold
            })
            .collect();

        debug!(
            "Semantic filter kept {} of {} candidates (threshold {})",
            kept.len(),
            before,
            self.threshold
        );

        kept
    }
}
