//! Feature-hashing embedder.
//!
//! Maps each content word to a signed bucket of a fixed-size vector, then
//! L2-normalizes. Texts sharing vocabulary land close in cosine space, which
//! is enough to drive the pipeline without hosting a model.

use async_trait::async_trait;
use tracing::trace;

use rag_core::text::{is_stopword, words};
use rag_core::{Embedder, RagError, Result};

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 384;

/// Deterministic bag-of-words embedder using blake3 feature hashing.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder with the default dimension.
    pub fn new() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Create an embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::config("embedding dimension must be positive"));
        }
        Ok(Self { dimension })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for word in words(text).iter().filter(|w| !is_stopword(w)) {
            let hash = blake3::hash(word.as_bytes());
            let bytes = hash.as_bytes();

            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

            embedding[idx] += sign;
        }

        l2_normalize(embedding)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        trace!(chars = text.len(), "Hashing embedding");
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Vec<f32>>> {
        texts.iter().map(|text| Ok(self.embed_sync(text))).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// L2 normalize a vector. Zero vectors are returned unchanged.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
