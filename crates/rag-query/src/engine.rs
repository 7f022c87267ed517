//! Query engine driving the full retrieval pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use ulid::Ulid;

use rag_context::{ContextCombiner, PromptAssembler};
use rag_core::{
    ContextSection, Corpus, Embedder, KeywordExtractor, PromptPlan, Query, QueryVariant, RagError,
    Result, ScoredCandidate, Strategy, StrategyConfig,
};

use crate::analyzer::analyze;
use crate::expander::expand;
use crate::metrics::{MetricsRecorder, MetricsSnapshot, RequestMetrics, StageTimings};
use crate::scorer::QueryProbe;
use crate::strategy::{route, PreparedQuery};

/// Everything produced for one query.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub query: Query,
    pub variants: Vec<QueryVariant>,

    /// Selected candidates after deduplication, in rank order.
    pub candidates: Vec<ScoredCandidate>,

    pub sections: Vec<ContextSection>,

    /// Rendered context block.
    pub context: String,

    pub plan: PromptPlan,
    pub metrics: RequestMetrics,
}

/// Outcome of one strategy in a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub strategy: Strategy,

    /// Candidates surviving the relevance floor and any filter.
    pub candidates: usize,

    /// Chunks in the final context.
    pub selected: usize,

    pub context_chars: usize,
    pub avg_final_score: f32,
    pub keyword_coverage: f32,
    pub elapsed_ms: f64,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Share of query keywords found in at least one candidate.
pub fn keyword_coverage(query: &BTreeSet<String>, candidates: &[ScoredCandidate]) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let covered = query
        .iter()
        .filter(|k| candidates.iter().any(|c| c.chunk.keywords.contains(*k)))
        .count();
    covered as f32 / query.len() as f32
}

/// Adaptive retrieval engine.
///
/// Analyzes and expands the query, ranks the corpus with the configured
/// strategy, combines the winners into a sectioned context and assembles
/// the prompt.
pub struct QueryEngine<E, K> {
    /// Embedding capability.
    embedder: Arc<E>,

    /// Keyword capability.
    extractor: Arc<K>,

    metrics: Arc<MetricsRecorder>,
}

impl<E, K> QueryEngine<E, K>
where
    E: Embedder,
    K: KeywordExtractor,
{
    /// Create a new query engine.
    pub fn new(embedder: Arc<E>, extractor: Arc<K>) -> Self {
        Self {
            embedder,
            extractor,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    /// Share a metrics recorder with other engines.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Aggregated metrics of every request answered so far.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Analyze, expand and run the capabilities once per distinct text.
    ///
    /// Variants are only embedded when `with_variants` is set. Capability
    /// failures degrade the probe instead of failing the request.
    pub async fn prepare(&self, text: &str, with_variants: bool) -> PreparedQuery {
        let query = analyze(text);
        let variants = expand(&query);

        let mut texts: Vec<&str> = vec![text];
        if with_variants {
            for variant in &variants {
                if !texts.contains(&variant.text.as_str()) {
                    texts.push(&variant.text);
                }
            }
        }

        let mut embeddings = self.embedder.embed_batch(&texts).await.into_iter();
        let mut probes = Vec::with_capacity(texts.len());

        for (idx, text) in texts.iter().enumerate() {
            let embedding = match embeddings.next() {
                Some(Ok(embedding)) => Some(embedding),
                Some(Err(e)) => {
                    warn!(error = %e, "Embedding failed for {:?}", text);
                    None
                }
                None => {
                    warn!("Embedder returned no result for {:?}", text);
                    None
                }
            };

            // A variant that cannot be embedded is dropped; the original
            // query still scores on keywords and length.
            if idx > 0 && embedding.is_none() {
                continue;
            }

            let keywords = match self.extractor.keywords(text).await {
                Ok(keywords) => keywords,
                Err(e) => {
                    warn!(error = %e, "Keyword extraction failed for {:?}", text);
                    BTreeSet::new()
                }
            };

            probes.push(QueryProbe {
                text: text.to_string(),
                embedding,
                keywords,
            });
        }

        let mut probes = probes.into_iter();
        let original = probes.next().unwrap_or_else(|| QueryProbe {
            text: text.to_string(),
            embedding: None,
            keywords: BTreeSet::new(),
        });

        debug!(
            intent = %query.intent,
            concepts = query.concepts.len(),
            variants = variants.len(),
            "Prepared query"
        );

        PreparedQuery {
            query,
            original,
            variants,
            variant_probes: probes.collect(),
        }
    }

    /// Run the full pipeline for one query.
    pub async fn answer(
        &self,
        text: &str,
        corpus: &Corpus,
        config: &StrategyConfig,
    ) -> Result<PipelineResponse> {
        config.validate()?;

        let start = Instant::now();
        let request_id = Ulid::new();

        info!(%request_id, strategy = %config.strategy, "Answering: {:?}", text);

        let prepared = Arc::new(self.prepare(text, config.strategy.uses_variants()).await);
        let analyze_ms = millis(start.elapsed());

        // Retrieval
        let retrieve_start = Instant::now();
        let ranking = {
            let prepared = Arc::clone(&prepared);
            let corpus = corpus.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || route(&prepared, &corpus, &config))
                .await
                .map_err(|e| RagError::internal(format!("Retrieval task failed: {}", e)))?
        };
        let retrieve_ms = millis(retrieve_start.elapsed());

        debug!(
            "Strategy {} returned {} candidates ({} scanned, {} skipped)",
            config.strategy,
            ranking.candidates.len(),
            ranking.stats.scanned,
            ranking.stats.skipped
        );

        // Context
        let combine_start = Instant::now();
        let combined = ContextCombiner::from_config(config).combine(&ranking.candidates);
        let combine_ms = millis(combine_start.elapsed());

        // Prompt
        let assemble_start = Instant::now();
        let style = config
            .prompt_style
            .unwrap_or_else(|| prepared.query.intent.prompt_style());
        let plan = PromptAssembler::new(config.chain_of_thought)
            .with_language(config.language)
            .assemble(style, &combined.text, text);
        let assemble_ms = millis(assemble_start.elapsed());

        let elapsed_ms = millis(start.elapsed());
        let metrics = RequestMetrics {
            request_id,
            strategy: config.strategy,
            chunks_scanned: ranking.stats.scanned,
            chunks_skipped: ranking.stats.skipped,
            chunks_after_filter: ranking.stats.after_filter,
            chunks_selected: combined.candidates.len(),
            duplicates_removed: combined.duplicates_removed,
            variants_used: ranking.stats.variants_used,
            keyword_coverage: keyword_coverage(&prepared.original.keywords, &combined.candidates),
            timings: StageTimings {
                analyze_ms,
                retrieve_ms,
                combine_ms,
                assemble_ms,
            },
            elapsed_ms,
        };
        self.metrics.record(metrics.clone());

        info!(
            %request_id,
            "Answered in {:.1}ms with {} chunks in {} sections (style {})",
            elapsed_ms,
            combined.candidates.len(),
            combined.sections.len(),
            style
        );

        Ok(PipelineResponse {
            query: prepared.query.clone(),
            variants: prepared.variants.clone(),
            candidates: combined.candidates,
            sections: combined.sections,
            context: combined.text,
            plan,
            metrics,
        })
    }

    /// Run every strategy on the same prepared query and summarize each.
    ///
    /// Strategies run independently; results are gathered only after all
    /// of them finish.
    pub async fn compare_strategies(
        &self,
        text: &str,
        corpus: &Corpus,
        config: &StrategyConfig,
    ) -> Result<Vec<StrategySummary>> {
        config.validate()?;

        info!("Comparing strategies for: {:?}", text);

        let prepared = Arc::new(self.prepare(text, true).await);
        let corpus = corpus.clone();
        let config = config.clone();

        tokio::task::spawn_blocking(move || {
            Strategy::ALL[..]
                .par_iter()
                .map(|&strategy| summarize(strategy, &prepared, &corpus, &config))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| RagError::internal(format!("Comparison task failed: {}", e)))
    }
}

fn summarize(
    strategy: Strategy,
    prepared: &PreparedQuery,
    corpus: &Corpus,
    config: &StrategyConfig,
) -> StrategySummary {
    let start = Instant::now();
    let config = config.with_strategy(strategy);

    let ranking = route(prepared, corpus, &config);
    let combined = ContextCombiner::from_config(&config).combine(&ranking.candidates);

    let avg_final_score = if combined.candidates.is_empty() {
        0.0
    } else {
        combined
            .candidates
            .iter()
            .map(|c| c.scores.final_score)
            .sum::<f32>()
            / combined.candidates.len() as f32
    };

    StrategySummary {
        strategy,
        candidates: ranking.stats.after_filter,
        selected: combined.candidates.len(),
        context_chars: combined.text.chars().count(),
        avg_final_score,
        keyword_coverage: keyword_coverage(&prepared.original.keywords, &combined.candidates),
        elapsed_ms: millis(start.elapsed()),
    }
}
