//! Greedy maximal-marginal-relevance re-ranking.

use std::collections::HashSet;

use tracing::debug;

use rag_core::text::{shingle_set_overlap, shingles, DEFAULT_SHINGLE_SIZE};
use rag_core::{RerankWeights, ScoredCandidate, StrategyConfig};

use crate::scorer::cosine_similarity;

/// Re-orders candidates by `alpha*relevance + beta*quality - gamma*similarity`.
///
/// `similarity` is the highest cosine similarity between a candidate and
/// any chunk selected so far. With a positive gamma, candidates whose
/// shingle overlap with a selected chunk reaches the duplicate threshold
/// are never selected.
#[derive(Debug, Clone, Copy)]
pub struct Reranker {
    weights: RerankWeights,
    duplicate_threshold: f32,
    shingle_size: usize,
}

impl Default for Reranker {
    fn default() -> Self {
        Self {
            weights: RerankWeights::default(),
            duplicate_threshold: 0.8,
            shingle_size: DEFAULT_SHINGLE_SIZE,
        }
    }
}

struct Entry {
    candidate: ScoredCandidate,
    shingles: Option<HashSet<String>>,
}

impl Reranker {
    pub fn new(weights: RerankWeights, duplicate_threshold: f32, shingle_size: usize) -> Self {
        Self {
            weights,
            duplicate_threshold,
            shingle_size,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.rerank, config.duplicate_threshold, config.shingle_size)
    }

    fn diversity_enabled(&self) -> bool {
        self.weights.diversity > 0.0
    }

    /// Select up to `k` candidates. Never pads.
    pub fn rerank(&self, candidates: Vec<ScoredCandidate>, k: usize) -> Vec<ScoredCandidate> {
        let input = candidates.len();
        let diversity = self.diversity_enabled();

        let mut remaining: Vec<Entry> = candidates
            .into_iter()
            .map(|candidate| Entry {
                shingles: diversity.then(|| shingles(&candidate.chunk.text, self.shingle_size)),
                candidate,
            })
            .collect();
        let mut selected: Vec<Entry> = Vec::with_capacity(k.min(remaining.len()));
        let mut suppressed = 0;

        while selected.len() < k && !remaining.is_empty() {
            let mut best: Option<(usize, f32, f32)> = None;

            for (idx, entry) in remaining.iter().enumerate() {
                let penalty = if diversity {
                    selected
                        .iter()
                        .map(|s| {
                            cosine_similarity(
                                &entry.candidate.chunk.embedding,
                                &s.candidate.chunk.embedding,
                            )
                        })
                        .fold(0.0f32, f32::max)
                } else {
                    0.0
                };

                let scores = &entry.candidate.scores;
                let score = self.weights.relevance * scores.relevance
                    + self.weights.quality * scores.quality
                    - self.weights.diversity * penalty;

                let better = match best {
                    None => true,
                    Some((best_idx, best_score, _)) => {
                        score > best_score
                            || (score == best_score
                                && entry.candidate.id() < remaining[best_idx].candidate.id())
                    }
                };
                if better {
                    best = Some((idx, score, penalty));
                }
            }

            let Some((idx, score, penalty)) = best else {
                break;
            };

            let mut entry = remaining.swap_remove(idx);
            entry.candidate.scores.final_score = score;
            entry.candidate.scores.diversity_penalty = penalty;

            if let Some(picked) = &entry.shingles {
                let before = remaining.len();
                remaining.retain(|other| {
                    other
                        .shingles
                        .as_ref()
                        .map_or(true, |s| shingle_set_overlap(picked, s) < self.duplicate_threshold)
                });
                suppressed += before - remaining.len();
            }

            selected.push(entry);
        }

        let mut ranked: Vec<ScoredCandidate> = selected.into_iter().map(|e| e.candidate).collect();
        ranked.sort_by(|a, b| a.rank_cmp(b));

        debug!(
            "Re-ranked {} candidates into {} (suppressed {} near duplicates)",
            input,
            ranked.len(),
            suppressed
        );

        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::{Chunk, ScoreBreakdown};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn candidate(id: u64, text: &str, embedding: Vec<f32>, relevance: f32, quality: f32) -> ScoredCandidate {
        ScoredCandidate {
            chunk: Arc::new(Chunk::new(id, text, embedding, BTreeSet::new())),
            scores: ScoreBreakdown {
                relevance,
                quality,
                final_score: relevance,
                ..Default::default()
            },
            keyword_matches: 0,
            matched_query: None,
        }
    }

    fn ids(candidates: &[ScoredCandidate]) -> Vec<u64> {
        candidates.iter().map(|c| c.id().0).collect()
    }

    #[test]
    fn test_zero_gamma_is_relevance_then_quality() {
        let weights = RerankWeights {
            relevance: 0.5,
            quality: 0.3,
            diversity: 0.0,
        };
        let input = vec![
            candidate(1, "alpha one", vec![1.0, 0.0], 0.6, 0.2),
            candidate(2, "alpha one", vec![1.0, 0.0], 0.6, 0.9),
            candidate(3, "gamma three", vec![0.0, 1.0], 0.9, 0.0),
            candidate(4, "delta four", vec![1.0, 1.0], 0.3, 1.0),
            candidate(5, "epsilon five", vec![1.0, 0.0], 0.6, 0.2),
        ];

        let mut expected = input.clone();
        expected.sort_by(|a, b| {
            let fa = 0.5 * a.scores.relevance + 0.3 * a.scores.quality;
            let fb = 0.5 * b.scores.relevance + 0.3 * b.scores.quality;
            fb.total_cmp(&fa).then_with(|| a.id().cmp(&b.id()))
        });

        let ranked = Reranker::new(weights, 0.8, 5).rerank(input, 10);
        assert_eq!(ids(&ranked), ids(&expected));
        assert!(ranked.iter().all(|c| c.scores.diversity_penalty == 0.0));
    }

    #[test]
    fn test_positive_gamma_demotes_similar() {
        let input = vec![
            candidate(1, "first passage about pairing", vec![1.0, 0.0], 0.9, 0.5),
            candidate(2, "second passage about pairing", vec![1.0, 0.0], 0.85, 0.5),
            candidate(3, "unrelated passage on storage", vec![0.0, 1.0], 0.8, 0.5),
        ];
        let weights = RerankWeights {
            relevance: 0.5,
            quality: 0.3,
            diversity: 0.5,
        };
        let ranked = Reranker::new(weights, 0.8, 5).rerank(input, 2);
        assert_eq!(ids(&ranked), vec![1, 3]);
        assert!((ranked[0].scores.final_score - (0.45 + 0.15)).abs() < 1e-6);
    }

    #[test]
    fn test_near_duplicates_suppressed() {
        let text = "hold the reset button for ten seconds until the status light blinks blue";
        let near = "hold the reset button for ten seconds until the status light blinks blue twice";
        let input = vec![
            candidate(1, text, vec![1.0, 0.0], 0.9, 0.5),
            candidate(2, near, vec![0.0, 1.0], 0.85, 0.5),
        ];
        let ranked = Reranker::default().rerank(input, 2);
        assert_eq!(ids(&ranked), vec![1]);
    }

    #[test]
    fn test_fewer_candidates_than_k() {
        let input = vec![candidate(1, "only one", vec![1.0], 0.5, 0.5)];
        assert_eq!(Reranker::default().rerank(input, 5).len(), 1);
        assert!(Reranker::default().rerank(Vec::new(), 5).is_empty());
        let input = vec![candidate(1, "one", vec![1.0], 0.5, 0.5)];
        assert!(Reranker::default().rerank(input, 0).is_empty());
    }
}
