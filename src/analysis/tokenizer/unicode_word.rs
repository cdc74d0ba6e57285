//! Unicode word boundary tokenizer.
//!
//! Splits text on UAX #29 word boundaries and drops whitespace segments.
//! Punctuation segments are kept as tokens of their own, so `"hello, world"`
//! yields `["hello", ",", "world"]`.
//!
//! # Examples
//!
//! ```
//! use roaringish::analysis::tokenizer::{Tokenizer, UnicodeWordTokenizer};
//!
//! let tokenizer = UnicodeWordTokenizer::new();
//! let tokens = tokenizer.tokens("  Look at my Cat ").unwrap();
//! assert_eq!(tokens, vec!["look", "at", "my", "cat"]);
//! ```

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// The default tokenizer.
#[derive(Clone, Debug, Default)]
pub struct UnicodeWordTokenizer;

impl UnicodeWordTokenizer {
    pub fn new() -> Self {
        UnicodeWordTokenizer
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(text
            .split_word_bounds()
            .filter(|segment| !segment.chars().all(char::is_whitespace))
            .map(str::to_owned)
            .collect())
    }

    fn name(&self) -> &'static str {
        "unicode_word"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_word_tokenizer() {
        let tokenizer = UnicodeWordTokenizer::new();
        let tokens = tokenizer.tokens("Hello, World!").unwrap();
        assert_eq!(tokens, vec!["hello", ",", "world", "!"]);
    }

    #[test]
    fn test_international_text() {
        let tokenizer = UnicodeWordTokenizer::new();
        let tokens = tokenizer.tokens("Café  résumé").unwrap();
        assert_eq!(tokens, vec!["café", "résumé"]);
    }

    #[test]
    fn test_empty_text() {
        let tokenizer = UnicodeWordTokenizer::new();
        assert!(tokenizer.tokens("   ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenizer_name() {
        assert_eq!(UnicodeWordTokenizer::new().name(), "unicode_word");
    }
}
