//! Parser for boolean query strings.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and ("OR" and)*
//! and     := not (["AND"] not)*
//! not     := "NOT" not | primary
//! primary := "(" or ")" | word
//! ```
//!
//! Operators are case-insensitive. Two operands side by side are joined with
//! an implicit `AND`. A word is run through the tokenizer when parsed, so one
//! word can become a phrase or nothing at all. A word ending in `*` expands
//! to every indexed token starting with it.

use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;
use std::vec::IntoIter;

use log::debug;

use crate::analysis::{PrefixMatcher, Tokenizer};
use crate::error::{Result, RoaringishError};
use crate::query::{BooleanQuery, PhraseQuery, Query, TermQuery};

/// Parsed boolean expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoolNode {
    /// Tokens of one word: none matches nothing, several form a phrase.
    Term(Vec<String>),
    And(Box<BoolNode>, Box<BoolNode>),
    Or(Box<BoolNode>, Box<BoolNode>),
    Not(Box<BoolNode>),
}

impl BoolNode {
    pub fn term<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BoolNode::Term(tokens.into_iter().map(Into::into).collect())
    }

    pub fn and(lhs: BoolNode, rhs: BoolNode) -> Self {
        BoolNode::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: BoolNode, rhs: BoolNode) -> Self {
        BoolNode::Or(Box::new(lhs), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(node: BoolNode) -> Self {
        BoolNode::Not(Box::new(node))
    }

    /// The equivalent scored query.
    ///
    /// `NOT x` becomes "everything except x" so it can stand alone.
    pub fn to_query(&self) -> Query {
        match self {
            BoolNode::Term(tokens) => match tokens.as_slice() {
                [] => Query::Boolean(BooleanQuery::new()),
                [token] => Query::Term(TermQuery::new(token.clone())),
                tokens => Query::Phrase(PhraseQuery::new(tokens.iter().cloned())),
            },
            BoolNode::And(lhs, rhs) => BooleanQuery::new()
                .must(lhs.to_query())
                .must(rhs.to_query())
                .into(),
            BoolNode::Or(lhs, rhs) => BooleanQuery::new()
                .should(lhs.to_query())
                .should(rhs.to_query())
                .into(),
            BoolNode::Not(node) => BooleanQuery::new()
                .must(Query::MatchAll)
                .must_not(node.to_query())
                .into(),
        }
    }
}

impl fmt::Display for BoolNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolNode::Term(tokens) => write!(f, "{}", tokens.join(" ")),
            BoolNode::And(lhs, rhs) => write!(f, "({lhs} AND {rhs})"),
            BoolNode::Or(lhs, rhs) => write!(f, "({lhs} OR {rhs})"),
            BoolNode::Not(node) => write!(f, "(NOT {node})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Word(String),
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::LParen => f.write_str("("),
            Lexeme::RParen => f.write_str(")"),
            Lexeme::And => f.write_str("AND"),
            Lexeme::Or => f.write_str("OR"),
            Lexeme::Not => f.write_str("NOT"),
            Lexeme::Word(word) => f.write_str(word),
        }
    }
}

fn lex(text: &str) -> Vec<Lexeme> {
    fn flush(word: &mut String, out: &mut Vec<Lexeme>) {
        if word.is_empty() {
            return;
        }
        let lexeme = if word.eq_ignore_ascii_case("and") {
            Lexeme::And
        } else if word.eq_ignore_ascii_case("or") {
            Lexeme::Or
        } else if word.eq_ignore_ascii_case("not") {
            Lexeme::Not
        } else {
            Lexeme::Word(word.clone())
        };
        out.push(lexeme);
        word.clear();
    }

    let mut out = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        match c {
            '(' | ')' => {
                flush(&mut word, &mut out);
                out.push(if c == '(' {
                    Lexeme::LParen
                } else {
                    Lexeme::RParen
                });
            }
            c if c.is_whitespace() => flush(&mut word, &mut out),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut out);
    out
}

/// Parses query strings with the same tokenizer the index was built with.
#[derive(Clone)]
pub struct BooleanQueryParser {
    tokenizer: Arc<dyn Tokenizer>,
    prefix_matcher: Option<Arc<dyn PrefixMatcher>>,
}

impl BooleanQueryParser {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        BooleanQueryParser {
            tokenizer,
            prefix_matcher: None,
        }
    }

    /// Enable `word*` expansion.
    pub fn with_prefix_matcher(mut self, matcher: Arc<dyn PrefixMatcher>) -> Self {
        self.prefix_matcher = Some(matcher);
        self
    }

    /// `Ok(None)` for a blank query.
    pub fn parse(&self, text: &str) -> Result<Option<BoolNode>> {
        let lexemes = lex(text);
        if lexemes.is_empty() {
            return Ok(None);
        }

        let mut state = ParseState {
            parser: self,
            lexemes: lexemes.into_iter().peekable(),
        };
        let node = state.parse_or()?;
        if let Some(lexeme) = state.lexemes.next() {
            return Err(RoaringishError::parse(format!(
                "Unexpected '{lexeme}' after end of query"
            )));
        }
        debug!("Parsed {text:?} as {node}");
        Ok(Some(node))
    }

    fn word(&self, word: &str) -> Result<BoolNode> {
        if let Some(stem) = word.strip_suffix('*')
            && let Some(matcher) = &self.prefix_matcher
        {
            let tokens = self.tokenizer.tokens(stem)?;
            if let [prefix] = tokens.as_slice() {
                let node = matcher
                    .matches(prefix)
                    .into_iter()
                    .map(|token| BoolNode::Term(vec![token]))
                    .reduce(BoolNode::or)
                    .unwrap_or(BoolNode::Term(Vec::new()));
                return Ok(node);
            }
            return Ok(BoolNode::Term(tokens));
        }
        Ok(BoolNode::Term(self.tokenizer.tokens(word)?))
    }
}

impl fmt::Debug for BooleanQueryParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BooleanQueryParser")
            .field("tokenizer", &self.tokenizer.name())
            .field("prefix_matcher", &self.prefix_matcher.is_some())
            .finish()
    }
}

struct ParseState<'p> {
    parser: &'p BooleanQueryParser,
    lexemes: Peekable<IntoIter<Lexeme>>,
}

impl ParseState<'_> {
    fn parse_or(&mut self) -> Result<BoolNode> {
        let mut node = self.parse_and()?;
        while self.lexemes.next_if_eq(&Lexeme::Or).is_some() {
            let rhs = self.parse_and()?;
            node = BoolNode::or(node, rhs);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<BoolNode> {
        let mut node = self.parse_not()?;
        loop {
            match self.lexemes.peek() {
                None | Some(Lexeme::RParen) | Some(Lexeme::Or) => return Ok(node),
                Some(Lexeme::And) => {
                    self.lexemes.next();
                }
                Some(_) => {}
            }
            let rhs = self.parse_not()?;
            node = BoolNode::and(node, rhs);
        }
    }

    fn parse_not(&mut self) -> Result<BoolNode> {
        if self.lexemes.next_if_eq(&Lexeme::Not).is_some() {
            return Ok(BoolNode::not(self.parse_not()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<BoolNode> {
        match self.lexemes.next() {
            None => Err(RoaringishError::parse("Unexpected end of query")),
            Some(Lexeme::LParen) => {
                let node = self.parse_or()?;
                match self.lexemes.next() {
                    Some(Lexeme::RParen) => Ok(node),
                    _ => Err(RoaringishError::parse("Missing closing parenthesis")),
                }
            }
            Some(Lexeme::Word(word)) => self.parser.word(&word),
            Some(lexeme) => Err(RoaringishError::parse(format!(
                "Unexpected '{lexeme}', expected a term"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FstPrefixMatcher, UnicodeWordTokenizer};

    fn parser() -> BooleanQueryParser {
        BooleanQueryParser::new(Arc::new(UnicodeWordTokenizer::new()))
    }

    fn parse(text: &str) -> BoolNode {
        parser().parse(text).unwrap().unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("a OR b AND c"),
            BoolNode::or(
                BoolNode::term(["a"]),
                BoolNode::and(BoolNode::term(["b"]), BoolNode::term(["c"]))
            )
        );
        assert_eq!(
            parse("NOT a b"),
            BoolNode::and(BoolNode::not(BoolNode::term(["a"])), BoolNode::term(["b"]))
        );
        assert_eq!(
            parse("(a or b) and not c"),
            BoolNode::and(
                BoolNode::or(BoolNode::term(["a"]), BoolNode::term(["b"])),
                BoolNode::not(BoolNode::term(["c"]))
            )
        );
    }

    #[test]
    fn test_implicit_and_stops_at_parenthesis() {
        assert_eq!(
            parse("(A B) OR C"),
            BoolNode::or(
                BoolNode::and(BoolNode::term(["a"]), BoolNode::term(["b"])),
                BoolNode::term(["c"])
            )
        );
    }

    #[test]
    fn test_word_tokenized_into_phrase() {
        assert_eq!(parse("Well-known"), BoolNode::term(["well", "-", "known"]));
    }

    #[test]
    fn test_blank_query() {
        assert_eq!(parser().parse("   ").unwrap(), None);
    }

    #[test]
    fn test_errors() {
        for text in ["a AND", "(a OR b", "a)", "AND a", "NOT", "()", "a OR OR b"] {
            assert!(parser().parse(text).is_err(), "{text}");
        }
    }

    #[test]
    fn test_prefix_expansion() {
        let matcher = FstPrefixMatcher::new(["app", "apple", "banana"]).unwrap();
        let parser = parser().with_prefix_matcher(Arc::new(matcher));

        assert_eq!(
            parser.parse("App*").unwrap().unwrap(),
            BoolNode::or(BoolNode::term(["app"]), BoolNode::term(["apple"]))
        );
        assert_eq!(parser.parse("zz*").unwrap().unwrap(), BoolNode::Term(vec![]));
    }

    #[test]
    fn test_to_query() {
        let query = parse("a NOT b-c").to_query();
        assert_eq!(query.to_string(), "(+a +(+*:* -\"b - c\"))");
        assert_eq!(BoolNode::Term(vec![]).to_query().to_string(), "()");
    }
}
