//! rag-embed - built-in capability implementations
//!
//! The pipeline treats embedding and keyword extraction as external,
//! pluggable capabilities. This crate provides lightweight deterministic
//! implementations used by the CLI and in tests.
//!
//! # Features
//!
//! - Feature-hashing bag-of-words embeddings (blake3)
//! - L2 normalization
//! - Stopword-filtered keyword extraction

mod hashing;
mod keywords;

pub use hashing::{l2_normalize, HashingEmbedder, DEFAULT_DIMENSION};
pub use keywords::StopwordKeywordExtractor;

// Re-export the capability traits for convenience
pub use rag_core::{Embedder, KeywordExtractor};
