//! Core domain types for the retrieval pipeline.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{RagError, Result};

/// Identifier of a chunk, unique within a corpus.
///
/// Ordering matters: when two candidates score the same, the lower id wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub u64);

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChunkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Category a context excerpt is grouped under.
///
/// Declaration order is the order sections are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionCategory {
    General,
    Procedure,
    Specification,
    Warning,
}

impl SectionCategory {
    /// All categories in emission order.
    pub const ALL: [SectionCategory; 4] = [
        Self::General,
        Self::Procedure,
        Self::Specification,
        Self::Warning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Procedure => "procedure",
            Self::Specification => "specification",
            Self::Warning => "warning",
        }
    }

    /// Human-readable section title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::General => "General Information",
            Self::Procedure => "Procedures",
            Self::Specification => "Specifications",
            Self::Warning => "Warnings",
        }
    }
}

impl std::fmt::Display for SectionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionCategory {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "procedure" => Ok(Self::Procedure),
            "specification" => Ok(Self::Specification),
            "warning" => Ok(Self::Warning),
            other => Err(RagError::invalid_argument(format!(
                "unknown section category '{}'",
                other
            ))),
        }
    }
}

/// A retrievable unit of document text.
///
/// Chunks are created by the ingestion collaborator and never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier within the corpus.
    pub id: ChunkId,

    /// Raw chunk text.
    pub text: String,

    /// Precomputed embedding vector.
    pub embedding: Vec<f32>,

    /// Precomputed, normalized keyword set.
    pub keywords: BTreeSet<String>,

    /// Length of `text` in characters.
    pub char_len: usize,

    /// Category hint from the source document, if any.
    #[serde(default)]
    pub category_hint: Option<SectionCategory>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        id: u64,
        text: impl Into<String>,
        embedding: Vec<f32>,
        keywords: BTreeSet<String>,
    ) -> Self {
        let text = text.into();
        let char_len = text.chars().count();

        Self {
            id: ChunkId(id),
            text,
            embedding,
            keywords,
            char_len,
            category_hint: None,
        }
    }

    /// Attach a source category hint.
    pub fn with_category(mut self, category: SectionCategory) -> Self {
        self.category_hint = Some(category);
        self
    }
}

/// Intent category derived from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    HowTo,
    Troubleshooting,
    Definition,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HowTo => "howto",
            Self::Troubleshooting => "troubleshooting",
            Self::Definition => "definition",
            Self::General => "general",
        }
    }

    /// The prompt style this intent maps to.
    pub fn prompt_style(&self) -> PromptStyle {
        match self {
            Self::HowTo => PromptStyle::StepByStep,
            Self::Troubleshooting => PromptStyle::Troubleshooting,
            Self::Definition => PromptStyle::Basic,
            Self::General => PromptStyle::Detailed,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt template style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptStyle {
    Basic,
    Detailed,
    StepByStep,
    Troubleshooting,
}

impl PromptStyle {
    pub const ALL: [PromptStyle; 4] = [
        Self::Basic,
        Self::Detailed,
        Self::StepByStep,
        Self::Troubleshooting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Detailed => "detailed",
            Self::StepByStep => "step-by-step",
            Self::Troubleshooting => "troubleshooting",
        }
    }

    /// Parse a style override. `auto` yields `None`, deferring to query analysis.
    pub fn parse_override(name: &str) -> Result<Option<Self>> {
        match normalize_name(name).as_str() {
            "auto" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl std::fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStyle {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_name(s).as_str() {
            "basic" => Ok(Self::Basic),
            "detailed" => Ok(Self::Detailed),
            "step-by-step" => Ok(Self::StepByStep),
            "troubleshooting" => Ok(Self::Troubleshooting),
            "" => Err(RagError::config("prompt style is not set")),
            other => Err(RagError::config(format!(
                "unknown prompt style '{}' (expected basic, detailed, step-by-step, troubleshooting or auto)",
                other
            ))),
        }
    }
}

/// Output language of the assembled prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Marathi,
    Gujarati,
    Bengali,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Self::English,
        Self::Hindi,
        Self::Marathi,
        Self::Gujarati,
        Self::Bengali,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Hindi => "hindi",
            Self::Marathi => "marathi",
            Self::Gujarati => "gujarati",
            Self::Bengali => "bengali",
        }
    }

    /// Name of the language in its own script.
    pub fn native_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "हिंदी",
            Self::Marathi => "मराठी",
            Self::Gujarati => "ગુજરાતી",
            Self::Bengali => "বাংলা",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_name(s).as_str() {
            "english" | "en" => Ok(Self::English),
            "hindi" | "hi" => Ok(Self::Hindi),
            "marathi" | "mr" => Ok(Self::Marathi),
            "gujarati" | "gu" => Ok(Self::Gujarati),
            "bengali" | "bn" => Ok(Self::Bengali),
            "" => Err(RagError::config("prompt language is not set")),
            other => Err(RagError::config(format!(
                "unknown prompt language '{}' (expected english, hindi, marathi, gujarati or bengali)",
                other
            ))),
        }
    }
}

/// Retrieval strategy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Hybrid,
    Rerank,
    MultiQuery,
    SemanticFilter,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Self::Hybrid,
        Self::Rerank,
        Self::MultiQuery,
        Self::SemanticFilter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::Rerank => "rerank",
            Self::MultiQuery => "multi-query",
            Self::SemanticFilter => "semantic-filter",
        }
    }

    /// Whether candidate generation scores expanded query variants.
    pub fn uses_variants(&self) -> bool {
        matches!(self, Self::MultiQuery)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_name(s).as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "rerank" => Ok(Self::Rerank),
            "multi-query" => Ok(Self::MultiQuery),
            "semantic-filter" => Ok(Self::SemanticFilter),
            "" => Err(RagError::config("retrieval strategy is not set")),
            other => Err(RagError::config(format!(
                "unknown retrieval strategy '{}' (expected hybrid, rerank, multi-query or semantic-filter)",
                other
            ))),
        }
    }
}

/// Lower-case, trim, and accept `_` in place of `-`.
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// A user query with its derived intent and concepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub text: String,
    pub intent: Intent,
    pub concepts: BTreeSet<String>,
}

/// A paraphrase of a query produced by expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryVariant {
    /// Rewritten query text.
    pub text: String,

    /// Trigger phrase that was substituted.
    pub trigger: String,

    /// Text of the originating query.
    pub origin: Arc<str>,
}

/// Per-candidate score components. All sub-scores are in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub semantic: f32,
    pub keyword: f32,
    pub length: f32,
    pub relevance: f32,
    pub quality: f32,
    pub diversity_penalty: f32,
    #[serde(rename = "final")]
    pub final_score: f32,
}

/// A chunk paired with its scores for the current request.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    #[serde(rename = "chunk_id", serialize_with = "serialize_chunk_ref")]
    pub chunk: Arc<Chunk>,

    pub scores: ScoreBreakdown,

    /// Number of query keywords found in the chunk's keyword set.
    pub keyword_matches: usize,

    /// Query phrasing that produced the best relevance (multi-query only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_query: Option<String>,
}

impl ScoredCandidate {
    pub fn id(&self) -> ChunkId {
        self.chunk.id
    }

    /// Ranking order: `final` descending, lower chunk id first on ties.
    pub fn rank_cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .scores
            .final_score
            .total_cmp(&self.scores.final_score)
            .then_with(|| self.chunk.id.cmp(&other.chunk.id))
    }
}

fn serialize_chunk_ref<S>(chunk: &Arc<Chunk>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    chunk.id.serialize(serializer)
}

/// One excerpt inside a context section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextExcerpt {
    pub chunk_id: ChunkId,
    pub text: String,
    pub relevance: f32,
    pub keyword_matches: usize,
}

/// A group of excerpts sharing a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSection {
    pub category: SectionCategory,
    pub excerpts: Vec<ContextExcerpt>,
}

impl ContextSection {
    /// Mean relevance across excerpts.
    pub fn mean_relevance(&self) -> f32 {
        if self.excerpts.is_empty() {
            return 0.0;
        }
        self.excerpts.iter().map(|e| e.relevance).sum::<f32>() / self.excerpts.len() as f32
    }

    /// Total keyword matches across excerpts.
    pub fn keyword_matches(&self) -> usize {
        self.excerpts.iter().map(|e| e.keyword_matches).sum()
    }

    /// Header annotation line for this section.
    pub fn header(&self) -> String {
        format!(
            "## {} ({} excerpt{}, avg relevance {:.2}, keyword matches {})",
            self.category.title(),
            self.excerpts.len(),
            if self.excerpts.len() == 1 { "" } else { "s" },
            self.mean_relevance(),
            self.keyword_matches()
        )
    }
}

/// Terminal output of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptPlan {
    /// Style used for the instruction template.
    pub style: PromptStyle,

    /// Language the instructions are written in.
    pub language: Language,

    /// Whether a chain-of-thought scaffold was appended.
    pub chain_of_thought: bool,

    /// System instruction part.
    pub system: String,

    /// User message part (context, question, scaffold).
    pub user: String,

    /// Full assembled prompt text.
    pub text: String,
}
