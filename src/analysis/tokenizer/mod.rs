//! Tokenizers turning raw text into the token sequence that gets indexed.
//!
//! Token `i` of the returned sequence is indexed at position `i`, so a
//! tokenizer must be deterministic: the same text always yields the same
//! tokens, for documents and queries alike.

use crate::error::Result;

/// Trait for tokenizers that convert text into normalized tokens.
pub trait Tokenizer: Send + Sync {
    /// Normalize raw text before segmentation.
    fn normalize(&self, text: &str) -> String {
        text.trim().to_lowercase()
    }

    /// Split already normalized text into tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;

    /// Normalize and tokenize `text`.
    fn tokens(&self, text: &str) -> Result<Vec<String>> {
        self.tokenize(&self.normalize(text))
    }
}

pub mod breaking_ngram;
pub mod ngram;
pub mod regex;
pub mod unicode_word;

pub use self::breaking_ngram::BreakingNGramTokenizer;
pub use self::ngram::NGramTokenizer;
pub use self::regex::RegexTokenizer;
pub use self::unicode_word::UnicodeWordTokenizer;
