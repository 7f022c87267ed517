//! Retrieval strategies and the router that dispatches between them.

use rayon::prelude::*;

use serde::Serialize;
use tracing::{debug, warn};

use rag_core::{Corpus, Query, QueryVariant, ScoredCandidate, Strategy, StrategyConfig};

use crate::filter::SemanticFilter;
use crate::fusion::{max_pool, top_by_relevance};
use crate::rerank::Reranker;
use crate::scorer::{QueryProbe, Scorer};

/// A query after analysis, expansion and capability calls.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub query: Query,

    /// The original phrasing.
    pub original: QueryProbe,

    /// Every expansion, whether or not it could be embedded.
    pub variants: Vec<QueryVariant>,

    /// Embedded variants usable for scoring.
    pub variant_probes: Vec<QueryProbe>,
}

/// Counters gathered while ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RankingStats {
    /// Chunks visited, bounded by `max_scan`.
    pub scanned: usize,

    /// Chunks excluded because they could not be scored.
    pub skipped: usize,

    /// Candidates left after the relevance floor and any filter.
    pub after_filter: usize,

    /// Variant phrasings scored in addition to the original.
    pub variants_used: usize,
}

/// Output of a strategy.
#[derive(Debug, Clone)]
pub struct Ranking {
    /// At most `top_k` candidates in rank order.
    pub candidates: Vec<ScoredCandidate>,
    pub stats: RankingStats,
}

/// A retrieval strategy.
pub trait RetrievalStrategy: Send + Sync {
    /// The tag this strategy is dispatched under.
    fn strategy(&self) -> Strategy;

    /// Produce ranked candidates for a prepared query.
    fn rank(&self, query: &PreparedQuery, corpus: &Corpus, config: &StrategyConfig) -> Ranking;
}

/// Score the scanned corpus prefix against one phrasing.
///
/// Chunks that cannot be scored are skipped and counted; candidates below
/// the relevance floor are dropped. A phrasing with no usable signal has
/// no floor, leaving ranking to length and quality.
fn generate(
    probe: &QueryProbe,
    corpus: &Corpus,
    config: &StrategyConfig,
) -> (Vec<ScoredCandidate>, RankingStats) {
    let scorer = Scorer::from_config(config);
    let chunks = corpus.scan(config.max_scan);

    let floor = if probe.has_signal() {
        config.min_relevance
    } else {
        debug!("Query {:?} has no keywords or embedding; relevance floor disabled", probe.text);
        0.0
    };

    let results: Vec<_> = chunks
        .par_iter()
        .map(|chunk| (chunk.id, scorer.score(probe, chunk)))
        .collect();

    let mut stats = RankingStats {
        scanned: chunks.len(),
        ..Default::default()
    };
    let mut candidates = Vec::with_capacity(results.len());

    for (id, result) in results {
        match result {
            Ok(candidate) if candidate.scores.relevance >= floor => {
                candidates.push(candidate)
            }
            Ok(_) => {}
            Err(e) => {
                warn!(chunk_id = %id, error = %e, "Skipping chunk");
                stats.skipped += 1;
            }
        }
    }

    stats.after_filter = candidates.len();
    (candidates, stats)
}

/// Score against the original query; rank by relevance.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridStrategy;

impl RetrievalStrategy for HybridStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Hybrid
    }

    fn rank(&self, query: &PreparedQuery, corpus: &Corpus, config: &StrategyConfig) -> Ranking {
        let (candidates, stats) = generate(&query.original, corpus, config);
        Ranking {
            candidates: top_by_relevance(candidates, config.top_k),
            stats,
        }
    }
}

/// Score against the original and every variant, max-pooling per chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiQueryStrategy;

impl RetrievalStrategy for MultiQueryStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::MultiQuery
    }

    fn rank(&self, query: &PreparedQuery, corpus: &Corpus, config: &StrategyConfig) -> Ranking {
        let probes: Vec<&QueryProbe> = std::iter::once(&query.original)
            .chain(query.variant_probes.iter())
            .collect();

        let mut stats = RankingStats {
            variants_used: query.variant_probes.len(),
            ..Default::default()
        };
        let mut lists = Vec::with_capacity(probes.len());

        for probe in probes {
            let (candidates, probe_stats) = generate(probe, corpus, config);
            stats.scanned = stats.scanned.max(probe_stats.scanned);
            stats.skipped = stats.skipped.max(probe_stats.skipped);
            lists.push((probe.text.clone(), candidates));
        }

        let fused = max_pool(lists);
        stats.after_filter = fused.len();

        debug!(
            "Multi-query fused {} phrasings into {} candidates",
            stats.variants_used + 1,
            fused.len()
        );

        Ranking {
            candidates: top_by_relevance(fused, config.top_k),
            stats,
        }
    }
}

/// Hybrid candidates re-ordered by the re-ranker.
#[derive(Debug, Clone, Copy, Default)]
pub struct RerankStrategy;

impl RetrievalStrategy for RerankStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Rerank
    }

    fn rank(&self, query: &PreparedQuery, corpus: &Corpus, config: &StrategyConfig) -> Ranking {
        let (candidates, stats) = generate(&query.original, corpus, config);
        Ranking {
            candidates: Reranker::from_config(config).rerank(candidates, config.top_k),
            stats,
        }
    }
}

/// Hybrid candidates narrowed by concept overlap before ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticFilterStrategy;

impl RetrievalStrategy for SemanticFilterStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::SemanticFilter
    }

    fn rank(&self, query: &PreparedQuery, corpus: &Corpus, config: &StrategyConfig) -> Ranking {
        let (candidates, mut stats) = generate(&query.original, corpus, config);
        let kept = SemanticFilter::new(config.concept_overlap_threshold)
            .apply(&query.query.concepts, candidates);
        stats.after_filter = kept.len();

        Ranking {
            candidates: top_by_relevance(kept, config.top_k),
            stats,
        }
    }
}

static HYBRID: HybridStrategy = HybridStrategy;
static MULTI_QUERY: MultiQueryStrategy = MultiQueryStrategy;
static RERANK: RerankStrategy = RerankStrategy;
static SEMANTIC_FILTER: SemanticFilterStrategy = SemanticFilterStrategy;

/// Implementation registered for a strategy tag.
pub fn strategy_for(strategy: Strategy) -> &'static dyn RetrievalStrategy {
    match strategy {
        Strategy::Hybrid => &HYBRID,
        Strategy::MultiQuery => &MULTI_QUERY,
        Strategy::Rerank => &RERANK,
        Strategy::SemanticFilter => &SEMANTIC_FILTER,
    }
}

/// Dispatch to the strategy named in `config`.
pub fn route(query: &PreparedQuery, corpus: &Corpus, config: &StrategyConfig) -> Ranking {
    let strategy = strategy_for(config.strategy);
    debug!(strategy = %strategy.strategy(), "Routing query");
    strategy.rank(query, corpus, config)
}
