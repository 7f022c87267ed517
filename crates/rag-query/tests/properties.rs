use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use rag_context::ContextCombiner;
use rag_core::text::shingle_overlap;
use rag_core::{Chunk, RerankWeights, ScoreBreakdown, ScoredCandidate};
use rag_query::{
    analyze, classify_intent, cosine_similarity, expand, Reranker, SemanticFilter, MAX_VARIANTS,
};

const WORDS: &[&str] = &[
    "reset", "button", "remote", "battery", "light", "hold", "press", "seconds",
];

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(0..WORDS.len(), 1..30)
        .prop_map(|idx| idx.into_iter().map(|i| WORDS[i]).collect::<Vec<_>>().join(" "))
}

fn arb_candidates() -> impl Strategy<Value = Vec<ScoredCandidate>> {
    prop::collection::vec(
        (
            arb_text(),
            prop::collection::vec(-1.0f32..1.0, 4),
            0.0f32..1.0,
            0.0f32..1.0,
        ),
        0..12,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(id, (text, embedding, relevance, quality))| ScoredCandidate {
                chunk: Arc::new(Chunk::new(id as u64, text, embedding, BTreeSet::new())),
                scores: ScoreBreakdown {
                    relevance,
                    quality,
                    final_score: relevance,
                    ..Default::default()
                },
                keyword_matches: 0,
                matched_query: None,
            })
            .collect()
    })
}

fn arb_weights() -> impl Strategy<Value = RerankWeights> {
    (0.0f32..1.0, 0.0f32..1.0, 0.0f32..1.0).prop_map(|(relevance, quality, diversity)| {
        RerankWeights {
            relevance,
            quality,
            diversity,
        }
    })
}

proptest! {
    #[test]
    fn rerank_never_exceeds_k(
        candidates in arb_candidates(),
        weights in arb_weights(),
        k in 0usize..8,
    ) {
        let input = candidates.len();
        let ranked = Reranker::new(weights, 0.8, 5).rerank(candidates, k);

        prop_assert!(ranked.len() <= k);
        prop_assert!(ranked.len() <= input);

        let ids: BTreeSet<_> = ranked.iter().map(|c| c.id()).collect();
        prop_assert_eq!(ids.len(), ranked.len());
    }

    #[test]
    fn rerank_with_diversity_selects_no_near_duplicates(
        candidates in arb_candidates(),
        diversity in 0.01f32..1.0,
        threshold in 0.5f32..1.0,
    ) {
        let weights = RerankWeights { relevance: 0.5, quality: 0.3, diversity };
        let ranked = Reranker::new(weights, threshold, 5).rerank(candidates, 12);

        for (i, a) in ranked.iter().enumerate() {
            for b in &ranked[i + 1..] {
                prop_assert!(shingle_overlap(&a.chunk.text, &b.chunk.text, 5) < threshold);
            }
        }
    }

    #[test]
    fn rerank_output_is_sorted(candidates in arb_candidates(), weights in arb_weights()) {
        let ranked = Reranker::new(weights, 0.8, 5).rerank(candidates, 12);
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].rank_cmp(&pair[1]).is_le());
        }
    }

    #[test]
    fn combining_twice_changes_nothing(candidates in arb_candidates()) {
        let combiner = ContextCombiner::default();
        let once = combiner.combine(&candidates);
        let twice = combiner.combine(&once.candidates);

        prop_assert_eq!(&once.text, &twice.text);
        prop_assert_eq!(&once.sections, &twice.sections);
        prop_assert_eq!(twice.duplicates_removed, 0);
    }

    #[test]
    fn filter_without_concepts_is_identity(candidates in arb_candidates(), threshold in 0.0f32..1.0) {
        let ids: Vec<_> = candidates.iter().map(|c| c.id()).collect();
        let kept = SemanticFilter::new(threshold).apply(&BTreeSet::new(), candidates);
        let kept_ids: Vec<_> = kept.iter().map(|c| c.id()).collect();
        prop_assert_eq!(ids, kept_ids);
    }

    #[test]
    fn analysis_is_total(text in "\\PC{0,80}") {
        let intent = classify_intent(&text);
        let query = analyze(&text);
        prop_assert_eq!(query.intent, intent);

        let variants = expand(&query);
        prop_assert!(variants.len() <= MAX_VARIANTS);
        for variant in &variants {
            prop_assert_ne!(&variant.text, &query.text);
        }
    }

    #[test]
    fn cosine_stays_in_unit_range(
        a in prop::collection::vec(-10.0f32..10.0, 0..16),
        b in prop::collection::vec(-10.0f32..10.0, 0..16),
    ) {
        let sim = cosine_similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&sim));
    }
}
