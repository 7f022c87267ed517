//! Stopword-based keyword extraction.

use async_trait::async_trait;
use std::collections::BTreeSet;

use rag_core::text::{is_stopword, words};
use rag_core::{KeywordExtractor, Result};

/// Minimum keyword length in characters.
const MIN_KEYWORD_LEN: usize = 3;

/// Extracts lower-cased content words, dropping stopwords and short tokens.
#[derive(Debug, Clone, Default)]
pub struct StopwordKeywordExtractor;

impl StopwordKeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous extraction.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        words(text)
            .into_iter()
            .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN && !is_stopword(w))
            .collect()
    }
}

#[async_trait]
impl KeywordExtractor for StopwordKeywordExtractor {
    async fn keywords(&self, text: &str) -> Result<BTreeSet<String>> {
        Ok(self.extract(text))
    }
}
