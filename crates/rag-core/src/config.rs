//! Configuration types for the retrieval pipeline.
//!
//! [`RagConfig`] is the file-level shape (TOML, every field defaulted).
//! [`StrategyConfig`] is the validated, typed form handed to each request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::text::DEFAULT_SHINGLE_SIZE;
use crate::types::{Language, PromptStyle, Strategy};

/// Main configuration for the retrieval pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Strategy selection and candidate limits.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Relevance sub-score weights and length window.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Re-ranker weights.
    #[serde(default)]
    pub rerank: RerankConfig,

    /// Context combination.
    #[serde(default)]
    pub context: ContextConfig,

    /// Prompt assembly.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Built-in embedding capability.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Strategy name: hybrid, rerank, multi-query or semantic-filter.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Maximum number of chunks passed to context combination.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Hard ceiling on chunks scanned per request.
    #[serde(default = "default_max_scan")]
    pub max_scan: usize,

    /// Candidates below this relevance are dropped.
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f32,

    /// Minimum concept overlap kept by the semantic filter.
    #[serde(default = "default_concept_overlap")]
    pub concept_overlap_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            top_k: default_top_k(),
            max_scan: default_max_scan(),
            min_relevance: default_min_relevance(),
            concept_overlap_threshold: default_concept_overlap(),
        }
    }
}

/// Scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight of cosine similarity.
    #[serde(default = "default_third")]
    pub semantic_weight: f32,

    /// Weight of keyword overlap.
    #[serde(default = "default_third")]
    pub keyword_weight: f32,

    /// Weight of length preference.
    #[serde(default = "default_third")]
    pub length_weight: f32,

    /// Lower bound of the preferred length window, in characters.
    #[serde(default = "default_length_min")]
    pub length_min: usize,

    /// Upper bound of the preferred length window, in characters.
    #[serde(default = "default_length_max")]
    pub length_max: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_third(),
            keyword_weight: default_third(),
            length_weight: default_third(),
            length_min: default_length_min(),
            length_max: default_length_max(),
        }
    }
}

/// Re-ranker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Alpha: weight of relevance.
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f32,

    /// Beta: weight of structural quality.
    #[serde(default = "default_quality_weight")]
    pub quality_weight: f32,

    /// Gamma: penalty on similarity to already selected chunks.
    #[serde(default = "default_diversity_weight")]
    pub diversity_weight: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            relevance_weight: default_relevance_weight(),
            quality_weight: default_quality_weight(),
            diversity_weight: default_diversity_weight(),
        }
    }
}

/// Context combination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Shared n-gram ratio at which two excerpts count as duplicates.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f32,

    /// Word n-gram size for duplicate detection.
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,

    /// Emit section and excerpt headers.
    #[serde(default = "default_true")]
    pub annotate: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
            shingle_size: default_shingle_size(),
            annotate: true,
        }
    }
}

/// Prompt configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Style override, or `auto` to follow query analysis.
    #[serde(default = "default_style")]
    pub style: String,

    /// Append a chain-of-thought scaffold.
    #[serde(default)]
    pub chain_of_thought: bool,

    /// Output language of the prompt instructions.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            chain_of_thought: false,
            language: default_language(),
        }
    }
}

/// Configuration of the built-in hashing embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Output vector dimension.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_strategy() -> String {
    "hybrid".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_max_scan() -> usize {
    10_000
}

fn default_min_relevance() -> f32 {
    0.2
}

fn default_concept_overlap() -> f32 {
    0.2
}

fn default_third() -> f32 {
    1.0 / 3.0
}

fn default_length_min() -> usize {
    100
}

fn default_length_max() -> usize {
    500
}

fn default_relevance_weight() -> f32 {
    0.5
}

fn default_quality_weight() -> f32 {
    0.3
}

fn default_diversity_weight() -> f32 {
    0.2
}

fn default_duplicate_threshold() -> f32 {
    0.8
}

fn default_shingle_size() -> usize {
    DEFAULT_SHINGLE_SIZE
}

fn default_style() -> String {
    "auto".to_string()
}

fn default_language() -> String {
    "english".to_string()
}

fn default_dimension() -> usize {
    384
}

impl RagConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RagError::config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rag-pipeline").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("rag-pipeline.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RagError::config(format!("Failed to render config: {}", e)))
    }

    /// Resolve names and validate ranges into a [`StrategyConfig`].
    pub fn strategy_config(&self) -> Result<StrategyConfig> {
        let config = StrategyConfig {
            strategy: self.retrieval.strategy.parse()?,
            prompt_style: PromptStyle::parse_override(&self.prompt.style)?,
            chain_of_thought: self.prompt.chain_of_thought,
            language: self.prompt.language.parse()?,
            top_k: self.retrieval.top_k,
            max_scan: self.retrieval.max_scan,
            min_relevance: self.retrieval.min_relevance,
            concept_overlap_threshold: self.retrieval.concept_overlap_threshold,
            weights: ScoreWeights {
                semantic: self.scoring.semantic_weight,
                keyword: self.scoring.keyword_weight,
                length: self.scoring.length_weight,
            },
            length_window: LengthWindow {
                min: self.scoring.length_min,
                max: self.scoring.length_max,
            },
            rerank: RerankWeights {
                relevance: self.rerank.relevance_weight,
                quality: self.rerank.quality_weight,
                diversity: self.rerank.diversity_weight,
            },
            duplicate_threshold: self.context.duplicate_threshold,
            shingle_size: self.context.shingle_size,
            annotate: self.context.annotate,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Weights of the relevance blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub semantic: f32,
    pub keyword: f32,
    pub length: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            semantic: default_third(),
            keyword: default_third(),
            length: default_third(),
        }
    }
}

/// Preferred chunk length window in characters, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthWindow {
    pub min: usize,
    pub max: usize,
}

impl Default for LengthWindow {
    fn default() -> Self {
        Self {
            min: default_length_min(),
            max: default_length_max(),
        }
    }
}

impl LengthWindow {
    pub fn contains(&self, len: usize) -> bool {
        (self.min..=self.max).contains(&len)
    }
}

/// Re-ranker blend: `alpha*relevance + beta*quality - gamma*similarity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankWeights {
    pub relevance: f32,
    pub quality: f32,
    pub diversity: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            relevance: default_relevance_weight(),
            quality: default_quality_weight(),
            diversity: default_diversity_weight(),
        }
    }
}

/// Validated per-request configuration. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub strategy: Strategy,

    /// Fixed prompt style; `None` defers to query analysis.
    pub prompt_style: Option<PromptStyle>,

    pub chain_of_thought: bool,
    pub language: Language,
    pub top_k: usize,
    pub max_scan: usize,
    pub min_relevance: f32,
    pub concept_overlap_threshold: f32,
    pub weights: ScoreWeights,
    pub length_window: LengthWindow,
    pub rerank: RerankWeights,
    pub duplicate_threshold: f32,
    pub shingle_size: usize,
    pub annotate: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Hybrid,
            prompt_style: None,
            chain_of_thought: false,
            language: Language::English,
            top_k: default_top_k(),
            max_scan: default_max_scan(),
            min_relevance: default_min_relevance(),
            concept_overlap_threshold: default_concept_overlap(),
            weights: ScoreWeights::default(),
            length_window: LengthWindow::default(),
            rerank: RerankWeights::default(),
            duplicate_threshold: default_duplicate_threshold(),
            shingle_size: default_shingle_size(),
            annotate: true,
        }
    }
}

impl StrategyConfig {
    /// Same configuration with another strategy.
    pub fn with_strategy(&self, strategy: Strategy) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    /// Check numeric ranges.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagError::config("top_k must be a positive integer"));
        }
        if self.max_scan == 0 {
            return Err(RagError::config("max_scan must be a positive integer"));
        }
        if self.length_window.min >= self.length_window.max {
            return Err(RagError::config(format!(
                "length window min ({}) must be below max ({})",
                self.length_window.min, self.length_window.max
            )));
        }
        for (name, value) in [
            ("concept_overlap_threshold", self.concept_overlap_threshold),
            ("min_relevance", self.min_relevance),
            ("duplicate_threshold", self.duplicate_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RagError::config(format!(
                    "{} must be within 0..=1, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("semantic_weight", self.weights.semantic),
            ("keyword_weight", self.weights.keyword),
            ("length_weight", self.weights.length),
            ("relevance_weight", self.rerank.relevance),
            ("quality_weight", self.rerank.quality),
            ("diversity_weight", self.rerank.diversity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RagError::config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.shingle_size == 0 {
            return Err(RagError::config("shingle_size must be a positive integer"));
        }
        Ok(())
    }
}
