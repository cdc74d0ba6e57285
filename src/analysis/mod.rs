//! Text analysis: tokenization and vocabulary prefix expansion.

pub mod prefix;
pub mod tokenizer;

pub use self::prefix::{FstPrefixMatcher, PrefixMatcher};
pub use self::tokenizer::{
    BreakingNGramTokenizer, NGramTokenizer, RegexTokenizer, Tokenizer, UnicodeWordTokenizer,
};
