//! Configuration for building and searching an index.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{Tokenizer, UnicodeWordTokenizer};

/// Default number of documents per in-memory batch.
pub const DEFAULT_BATCH_SIZE: usize = 300_000;

/// How the set of common tokens is chosen.
///
/// Everything except `List` is computed from the vocabulary of the first
/// batch, which only approximates the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CommonTokensConfig {
    /// No merged tokens are generated.
    #[default]
    None,
    /// Exactly these tokens.
    List(Vec<String>),
    /// The `n` most frequent tokens.
    FixedNum(usize),
    /// The most frequent fraction of the vocabulary, in `0.0..=1.0`.
    Percentage(f64),
}

/// Indexer settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Documents buffered in memory before a batch is flushed to disk.
    pub batch_size: usize,

    pub common_tokens: CommonTokensConfig,

    /// Tokenizer for document content. Searchers must use the same one.
    #[serde(skip)]
    #[serde(default = "default_tokenizer")]
    pub tokenizer: Arc<dyn Tokenizer>,
}

pub(crate) fn default_tokenizer() -> Arc<dyn Tokenizer> {
    Arc::new(UnicodeWordTokenizer::new())
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            common_tokens: CommonTokensConfig::None,
            tokenizer: default_tokenizer(),
        }
    }
}

impl IndexerConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_common_tokens(mut self, common_tokens: CommonTokensConfig) -> Self {
        self.common_tokens = common_tokens;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

impl fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("batch_size", &self.batch_size)
            .field("common_tokens", &self.common_tokens)
            .field("tokenizer", &self.tokenizer.name())
            .finish()
    }
}

/// Searcher settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearcherConfig {
    /// Use the scalar intersection even when AVX-512 is available.
    pub force_naive_intersect: bool,

    #[serde(skip)]
    #[serde(default = "default_tokenizer")]
    pub tokenizer: Arc<dyn Tokenizer>,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        SearcherConfig {
            force_naive_intersect: false,
            tokenizer: default_tokenizer(),
        }
    }
}

impl SearcherConfig {
    pub fn with_force_naive_intersect(mut self, force_naive_intersect: bool) -> Self {
        self.force_naive_intersect = force_naive_intersect;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

impl fmt::Debug for SearcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearcherConfig")
            .field("force_naive_intersect", &self.force_naive_intersect)
            .field("tokenizer", &self.tokenizer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexerConfig::default();
        assert_eq!(config.batch_size, 300_000);
        assert_eq!(config.common_tokens, CommonTokensConfig::None);
        assert_eq!(config.tokenizer.name(), "unicode_word");
        assert!(!SearcherConfig::default().force_naive_intersect);
    }

    #[test]
    fn test_builders() {
        let config = IndexerConfig::default()
            .with_batch_size(0)
            .with_common_tokens(CommonTokensConfig::FixedNum(10));
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.common_tokens, CommonTokensConfig::FixedNum(10));
    }

    #[test]
    fn test_serde_round_trip() {
        let config = IndexerConfig::default()
            .with_common_tokens(CommonTokensConfig::List(vec!["the".into(), "a".into()]));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("tokenizer"));

        let back: IndexerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.common_tokens, config.common_tokens);
        assert_eq!(back.tokenizer.name(), "unicode_word");
    }
}
