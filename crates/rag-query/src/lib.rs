//! rag-query - Query analysis, retrieval strategies and ranking
//!
//! This crate turns a question into ranked candidates and, through
//! `rag-context`, into a finished prompt.
//!
//! # Features
//!
//! - Intent classification and concept extraction
//! - Pattern-based query expansion
//! - Hybrid semantic, keyword and length scoring
//! - Four strategies: hybrid, rerank, multi-query and semantic-filter
//! - Greedy MMR re-ranking with near-duplicate suppression
//! - Per-request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use rag_query::QueryEngine;
//! use rag_core::StrategyConfig;
//! use std::sync::Arc;
//!
//! let engine = QueryEngine::new(Arc::new(embedder), Arc::new(extractor));
//! let response = engine.answer("How do I pair the remote?", &corpus, &StrategyConfig::default()).await?;
//! println!("{}", response.plan.text);
//! ```

mod analyzer;
mod concepts;
mod engine;
mod expander;
mod filter;
mod fusion;
mod metrics;
mod rerank;
mod scorer;
mod strategy;

pub use analyzer::{analyze, classify_intent};
pub use concepts::{action_verb, concept_overlap, extract_concepts};
pub use engine::{keyword_coverage, PipelineResponse, QueryEngine, StrategySummary};
pub use expander::{expand, rules_for, RewriteRule, MAX_VARIANTS};
pub use filter::SemanticFilter;
pub use fusion::{max_pool, sort_ranked, top_by_relevance};
pub use metrics::{MetricsRecorder, MetricsSnapshot, RequestMetrics, StageTimings};
pub use rerank::Reranker;
pub use scorer::{cosine_similarity, keyword_overlap, length_score, quality_score, QueryProbe, Scorer};
pub use strategy::{
    route, strategy_for, HybridStrategy, MultiQueryStrategy, PreparedQuery, Ranking,
    RankingStats, RerankStrategy, RetrievalStrategy, SemanticFilterStrategy,
};
