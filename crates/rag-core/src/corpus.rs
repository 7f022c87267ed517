//! Immutable corpus snapshot shared across requests.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{RagError, Result};
use crate::traits::{Embedder, KeywordExtractor};
use crate::types::{Chunk, ChunkId, SectionCategory};

/// Read-only snapshot of chunks, ordered by id.
///
/// Cloning is cheap; every clone observes the same chunks.
#[derive(Debug, Clone)]
pub struct Corpus {
    chunks: Arc<[Arc<Chunk>]>,
}

impl Corpus {
    /// Build a snapshot from chunks, rejecting duplicate ids.
    pub fn new(chunks: Vec<Chunk>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(chunks.len());
        for chunk in &chunks {
            if !seen.insert(chunk.id) {
                return Err(RagError::DuplicateChunk { id: chunk.id.0 });
            }
        }

        let mut chunks: Vec<Arc<Chunk>> = chunks.into_iter().map(Arc::new).collect();
        chunks.sort_by_key(|c| c.id);

        Ok(Self {
            chunks: chunks.into(),
        })
    }

    /// Build a snapshot from raw records, filling in missing embeddings and
    /// keywords through the given capabilities.
    ///
    /// A record whose capability call fails, or whose embedding does not
    /// have the embedder's dimension, is skipped and logged; the rest of the
    /// corpus is still built.
    pub async fn from_records<E, K>(
        records: Vec<ChunkRecord>,
        embedder: &E,
        extractor: &K,
    ) -> Result<Self>
    where
        E: Embedder + ?Sized,
        K: KeywordExtractor + ?Sized,
    {
        let total = records.len();
        let dimension = embedder.dimension();
        let mut chunks = Vec::with_capacity(total);

        for record in records {
            let embedding = match record.embedding {
                Some(embedding) => embedding,
                None => match embedder.embed(&record.text).await {
                    Ok(embedding) => embedding,
                    Err(e) if e.is_per_chunk() => {
                        warn!(chunk_id = record.id, error = %e, "Skipping chunk: embedding failed");
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };

            if embedding.len() != dimension {
                let e = RagError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                };
                warn!(chunk_id = record.id, error = %e, "Skipping chunk");
                continue;
            }

            let keywords = match record.keywords {
                Some(keywords) => keywords.into_iter().map(|k| k.to_lowercase()).collect(),
                None => match extractor.keywords(&record.text).await {
                    Ok(keywords) => keywords,
                    Err(e) if e.is_per_chunk() => {
                        warn!(chunk_id = record.id, error = %e, "Skipping chunk: keyword extraction failed");
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };

            let mut chunk = Chunk::new(record.id, record.text, embedding, keywords);
            chunk.category_hint = record.category;
            chunks.push(chunk);
        }

        info!("Built corpus with {} of {} chunks", chunks.len(), total);

        Self::new(chunks)
    }

    /// Load raw records from a JSON array.
    pub fn records_from_json(json: &str) -> Result<Vec<ChunkRecord>> {
        Ok(serde_json::from_str(json)?)
    }

    /// All chunks in id order.
    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// The first `limit` chunks in id order.
    pub fn scan(&self, limit: usize) -> &[Arc<Chunk>] {
        &self.chunks[..limit.min(self.chunks.len())]
    }

    /// Look up a chunk by id.
    pub fn get(&self, id: ChunkId) -> Option<&Arc<Chunk>> {
        self.chunks
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|idx| &self.chunks[idx])
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// A chunk as supplied by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: u64,
    pub text: String,

    #[serde(default)]
    pub category: Option<SectionCategory>,

    /// Precomputed embedding, if available.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,

    /// Precomputed keywords, if available.
    #[serde(default)]
    pub keywords: Option<BTreeSet<String>>,
}

impl ChunkRecord {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            category: None,
            embedding: None,
            keywords: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("corrupt") {
                return Err(RagError::embedding("model rejected input"));
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct SplitExtractor;

    #[async_trait]
    impl KeywordExtractor for SplitExtractor {
        async fn keywords(&self, text: &str) -> Result<BTreeSet<String>> {
            Ok(text.split_whitespace().map(str::to_lowercase).collect())
        }
    }

    #[test]
    fn test_new_sorts_and_rejects_duplicates() {
        let chunks = vec![
            Chunk::new(5, "five", vec![], BTreeSet::new()),
            Chunk::new(2, "two", vec![], BTreeSet::new()),
        ];
        let corpus = Corpus::new(chunks).unwrap();
        let ids: Vec<u64> = corpus.chunks().iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![2, 5]);
        assert_eq!(corpus.get(ChunkId(5)).unwrap().text, "five");
        assert!(corpus.get(ChunkId(3)).is_none());

        let dup = vec![
            Chunk::new(1, "a", vec![], BTreeSet::new()),
            Chunk::new(1, "b", vec![], BTreeSet::new()),
        ];
        let err = Corpus::new(dup).unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_CHUNK");
    }

    #[test]
    fn test_scan_is_bounded() {
        let chunks = (0..10)
            .map(|i| Chunk::new(i, "x", vec![], BTreeSet::new()))
            .collect();
        let corpus = Corpus::new(chunks).unwrap();
        assert_eq!(corpus.scan(3).len(), 3);
        assert_eq!(corpus.scan(50).len(), 10);
    }

    #[tokio::test]
    async fn test_from_records_skips_failed_chunks() {
        let records = vec![
            ChunkRecord::new(1, "Install the Widget"),
            ChunkRecord::new(2, "corrupt scan"),
            ChunkRecord {
                keywords: Some(BTreeSet::from(["Voltage".to_string()])),
                category: Some(SectionCategory::Specification),
                ..ChunkRecord::new(3, "Rated at 12 V")
            },
        ];

        let corpus = Corpus::from_records(records, &LengthEmbedder, &SplitExtractor)
            .await
            .unwrap();

        assert_eq!(corpus.len(), 2);
        let first = corpus.get(ChunkId(1)).unwrap();
        assert!(first.keywords.contains("widget"));
        let third = corpus.get(ChunkId(3)).unwrap();
        assert!(third.keywords.contains("voltage"));
        assert_eq!(third.category_hint, Some(SectionCategory::Specification));
    }

    #[tokio::test]
    async fn test_from_records_skips_wrong_dimension() {
        let records = vec![
            ChunkRecord {
                embedding: Some(vec![0.5, 0.5]),
                ..ChunkRecord::new(1, "Matches the embedder")
            },
            ChunkRecord {
                embedding: Some(vec![0.1, 0.2, 0.3]),
                ..ChunkRecord::new(2, "Embedded by another model")
            },
            ChunkRecord::new(3, "Embedded on load"),
        ];

        let corpus = Corpus::from_records(records, &LengthEmbedder, &SplitExtractor)
            .await
            .unwrap();

        let ids: Vec<u64> = corpus.chunks().iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(corpus.get(ChunkId(3)).unwrap().embedding.len(), 2);
    }

    #[test]
    fn test_records_from_json() {
        let json = r#"[{"id": 1, "text": "Press reset.", "category": "procedure"}]"#;
        let records = Corpus::records_from_json(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Some(SectionCategory::Procedure));
        assert!(records[0].embedding.is_none());
    }
}
