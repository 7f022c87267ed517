//! Merging and ordering of candidate lists.

use std::collections::HashMap;

use rag_core::{ChunkId, ScoredCandidate};

/// Fuse per-phrasing candidate lists by max-pooling relevance.
///
/// Each chunk keeps the single best score it reached under any phrasing,
/// so a chunk matched by several phrasings is not counted twice. Earlier
/// lists win ties, so the original query should come first.
///
/// # Arguments
/// * `lists` - Vector of (phrasing, candidates) pairs
///
/// # Returns
/// Fused candidates with `matched_query` set, in rank order
pub fn max_pool(lists: Vec<(String, Vec<ScoredCandidate>)>) -> Vec<ScoredCandidate> {
    let mut best: HashMap<ChunkId, ScoredCandidate> = HashMap::new();

    for (phrasing, candidates) in lists {
        for mut candidate in candidates {
            match best.get(&candidate.id()) {
                Some(existing) if existing.scores.relevance >= candidate.scores.relevance => {}
                _ => {
                    candidate.matched_query = Some(phrasing.clone());
                    best.insert(candidate.id(), candidate);
                }
            }
        }
    }

    let mut fused: Vec<ScoredCandidate> = best.into_values().collect();
    sort_ranked(&mut fused);
    fused
}

/// Sort by `final` descending, lower chunk id first on ties.
pub fn sort_ranked(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| a.rank_cmp(b));
}

/// Rank by raw relevance and keep the top `k`.
pub fn top_by_relevance(mut candidates: Vec<ScoredCandidate>, k: usize) -> Vec<ScoredCandidate> {
    for candidate in &mut candidates {
        candidate.scores.final_score = candidate.scores.relevance;
    }
    sort_ranked(&mut candidates);
    candidates.truncate(k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::{Chunk, ScoreBreakdown};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn candidate(id: u64, relevance: f32) -> ScoredCandidate {
        ScoredCandidate {
            chunk: Arc::new(Chunk::new(id, "text", vec![], BTreeSet::new())),
            scores: ScoreBreakdown {
                relevance,
                final_score: relevance,
                ..Default::default()
            },
            keyword_matches: 0,
            matched_query: None,
        }
    }

    #[test]
    fn test_max_pool_keeps_best_phrasing() {
        let fused = max_pool(vec![
            ("original".to_string(), vec![candidate(1, 0.5), candidate(2, 0.4)]),
            ("variant".to_string(), vec![candidate(1, 0.3), candidate(2, 0.7)]),
        ]);

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].id().0, 2);
        assert_eq!(fused[0].scores.relevance, 0.7);
        assert_eq!(fused[0].matched_query.as_deref(), Some("variant"));
        assert_eq!(fused[1].id().0, 1);
        assert_eq!(fused[1].matched_query.as_deref(), Some("original"));
    }

    #[test]
    fn test_max_pool_tie_keeps_original() {
        let fused = max_pool(vec![
            ("original".to_string(), vec![candidate(1, 0.5)]),
            ("variant".to_string(), vec![candidate(1, 0.5)]),
        ]);
        assert_eq!(fused[0].matched_query.as_deref(), Some("original"));
    }

    #[test]
    fn test_top_by_relevance() {
        let ranked = top_by_relevance(
            vec![candidate(3, 0.2), candidate(1, 0.9), candidate(2, 0.9), candidate(4, 0.5)],
            3,
        );
        let ids: Vec<u64> = ranked.iter().map(|c| c.id().0).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }
}
