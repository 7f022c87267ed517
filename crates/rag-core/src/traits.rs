//! Capability traits consumed by the pipeline.
//!
//! Both capabilities are treated as potentially slow and external: the
//! pipeline calls each at most once per distinct text per request.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::Result;

/// Embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    ///
    /// Must be deterministic for identical input within a session.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, one result per input.
    ///
    /// Failures are reported per text so a single bad input does not
    /// discard the rest of the batch.
    async fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        results
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;
}

/// Keyword extraction capability.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Extract a normalized keyword set from text.
    async fn keywords(&self, text: &str) -> Result<BTreeSet<String>>;
}
