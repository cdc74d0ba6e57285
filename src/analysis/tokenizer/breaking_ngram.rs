//! Character n-grams that never cross a breaking character.

use ahash::AHashSet;

use super::Tokenizer;
use super::ngram::{check_gram_size, gram};
use crate::error::Result;

/// Like [`NGramTokenizer`](super::NGramTokenizer), but windows containing a
/// breaking character are skipped. Whitespace breaks unless an explicit set
/// of breaking characters is given.
#[derive(Clone, Debug)]
pub struct BreakingNGramTokenizer {
    n: usize,
    lowercase: bool,
    /// `None` breaks on whitespace.
    breaking: Option<AHashSet<char>>,
}

impl BreakingNGramTokenizer {
    pub fn new(n: usize) -> Result<Self> {
        Ok(BreakingNGramTokenizer {
            n: check_gram_size(n)?,
            lowercase: true,
            breaking: None,
        })
    }

    /// Break on `chars` only; whitespace then becomes an ordinary character.
    pub fn with_breaking_chars<I: IntoIterator<Item = char>>(mut self, chars: I) -> Self {
        self.breaking = Some(chars.into_iter().collect());
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    fn is_break(&self, c: char) -> bool {
        match &self.breaking {
            Some(set) => set.contains(&c),
            None => c.is_whitespace(),
        }
    }
}

impl Tokenizer for BreakingNGramTokenizer {
    fn normalize(&self, text: &str) -> String {
        text.to_owned()
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut pos = 0;
        while pos + self.n <= chars.len() {
            let window = &chars[pos..pos + self.n];
            match window.iter().position(|&c| self.is_break(c)) {
                // Every window starting up to the break contains it.
                Some(at) => pos += at + 1,
                None => {
                    tokens.push(gram(window, self.lowercase));
                    pos += 1;
                }
            }
        }
        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "breaking_ngram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(tokenizer: &BreakingNGramTokenizer, text: &str) -> Vec<String> {
        tokenizer.tokens(text).unwrap()
    }

    #[test]
    fn test_whitespace_breaks() {
        let bigrams = BreakingNGramTokenizer::new(2).unwrap();
        assert_eq!(tokens(&bigrams, "AB CD"), vec!["ab", "cd"]);
        assert_eq!(tokens(&bigrams, "ABC DEF"), vec!["ab", "bc", "de", "ef"]);

        let trigrams = BreakingNGramTokenizer::new(3).unwrap();
        assert_eq!(tokens(&trigrams, "ABC   DEF"), vec!["abc", "def"]);
        assert!(tokens(&trigrams, "AB").is_empty());
    }

    #[test]
    fn test_custom_breaking_chars() {
        let tokenizer = BreakingNGramTokenizer::new(2)
            .unwrap()
            .with_breaking_chars(['_']);
        assert_eq!(tokens(&tokenizer, "AB_CD"), vec!["ab", "cd"]);
        assert_eq!(tokens(&tokenizer, "A B"), vec!["a ", " b"]);
    }

    #[test]
    fn test_keeps_case_when_asked() {
        let tokenizer = BreakingNGramTokenizer::new(2)
            .unwrap()
            .with_lowercase(false);
        assert_eq!(tokens(&tokenizer, "AB CD"), vec!["AB", "CD"]);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(BreakingNGramTokenizer::new(0).is_err());
    }
}
