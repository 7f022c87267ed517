//! Error types for the retrieval pipeline.

use thiserror::Error;

/// Result type alias using RagError.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur in the retrieval pipeline.
#[derive(Error, Debug)]
pub enum RagError {
    /// Invalid or unrecognized configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Two chunks in one corpus share an id.
    #[error("Duplicate chunk id: {id}")]
    DuplicateChunk { id: u64 },

    /// Vector lengths disagree.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding capability error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Keyword extraction capability error.
    #[error("Keyword extraction error: {message}")]
    Keywords { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RagError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a keyword extraction error.
    pub fn keywords(message: impl Into<String>) -> Self {
        Self::Keywords {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::DuplicateChunk { .. } => "DUPLICATE_CHUNK",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Keywords { .. } => "KEYWORD_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether this error only affects a single chunk and can be skipped.
    pub fn is_per_chunk(&self) -> bool {
        matches!(
            self,
            Self::Embedding { .. } | Self::Keywords { .. } | Self::DimensionMismatch { .. }
        )
    }
}
