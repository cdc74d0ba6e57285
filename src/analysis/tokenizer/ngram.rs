//! Character n-gram tokenizer.
//!
//! Every window of `n` consecutive characters is one token, so token `i`
//! starts at character `i`. A phrase query over n-grams therefore matches
//! arbitrary substrings of at least `n` characters.
//!
//! # Examples
//!
//! ```
//! use roaringish::analysis::tokenizer::{NGramTokenizer, Tokenizer};
//!
//! let tokenizer = NGramTokenizer::new(3).unwrap();
//! assert_eq!(tokenizer.tokens("ABCDE").unwrap(), vec!["abc", "bcd", "cde"]);
//! ```

use super::Tokenizer;
use crate::error::{Result, RoaringishError};

#[derive(Clone, Debug)]
pub struct NGramTokenizer {
    n: usize,
    lowercase: bool,
}

impl NGramTokenizer {
    /// Lowercasing n-grams of `n` characters. `n` must be at least 1.
    pub fn new(n: usize) -> Result<Self> {
        Self::with_lowercase(n, true)
    }

    pub fn with_lowercase(n: usize, lowercase: bool) -> Result<Self> {
        Ok(NGramTokenizer {
            n: check_gram_size(n)?,
            lowercase,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }
}

pub(super) fn check_gram_size(n: usize) -> Result<usize> {
    if n == 0 {
        return Err(RoaringishError::invalid_argument(
            "n-gram size must be greater than 0",
        ));
    }
    Ok(n)
}

/// The window as a token, lowercased char by char when asked.
pub(super) fn gram(window: &[char], lowercase: bool) -> String {
    if lowercase {
        window.iter().flat_map(|c| c.to_lowercase()).collect()
    } else {
        window.iter().collect()
    }
}

impl Tokenizer for NGramTokenizer {
    /// Whitespace is part of the grams, so nothing is trimmed.
    fn normalize(&self, text: &str) -> String {
        text.to_owned()
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let chars: Vec<char> = text.chars().collect();
        Ok(chars
            .windows(self.n)
            .map(|window| gram(window, self.lowercase))
            .collect())
    }

    fn name(&self) -> &'static str {
        "ngram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(tokenizer: &NGramTokenizer, text: &str) -> Vec<String> {
        tokenizer.tokens(text).unwrap()
    }

    #[test]
    fn test_trigrams() {
        let tokenizer = NGramTokenizer::new(3).unwrap();
        assert_eq!(tokens(&tokenizer, "ABCDE"), vec!["abc", "bcd", "cde"]);
        assert_eq!(tokens(&tokenizer, "ABC"), vec!["abc"]);
        assert!(tokens(&tokenizer, "AB").is_empty());
    }

    #[test]
    fn test_keeps_case_when_asked() {
        let tokenizer = NGramTokenizer::with_lowercase(3, false).unwrap();
        assert_eq!(tokens(&tokenizer, "ABC"), vec!["ABC"]);
    }

    #[test]
    fn test_whitespace_and_punctuation_are_characters() {
        let tokenizer = NGramTokenizer::new(3).unwrap();
        assert_eq!(tokens(&tokenizer, "A B"), vec!["a b"]);
        assert_eq!(tokens(&tokenizer, "A_B"), vec!["a_b"]);
    }

    #[test]
    fn test_bigram_window_slides_by_one() {
        let tokenizer = NGramTokenizer::new(2).unwrap();
        assert_eq!(tokens(&tokenizer, "ABCD"), vec!["ab", "bc", "cd"]);
        assert_eq!(tokens(&tokenizer, "Çé"), vec!["çé"]);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            NGramTokenizer::new(0),
            Err(RoaringishError::InvalidArgument(_))
        ));
        assert_eq!(NGramTokenizer::new(4).unwrap().name(), "ngram");
    }
}
