//! Scored queries over an opened index.
//!
//! A [`Query`] compiles against a [`Searcher`] into a [`Scorer`], which the
//! searcher drains into a [`TopDocsCollector`](collector::TopDocsCollector).

pub mod bm25;
pub mod boolean;
pub mod collector;
pub mod parser;
pub mod phrase;
pub mod scorer;
pub mod term;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::scorer::{MatchAllScorer, Scorer};
use crate::searcher::Searcher;

pub use self::boolean::{BooleanClause, BooleanQuery, Occur};
pub use self::parser::{BoolNode, BooleanQueryParser};
pub use self::phrase::PhraseQuery;
pub use self::term::TermQuery;

/// A ranked document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term(TermQuery),
    Phrase(PhraseQuery),
    Boolean(BooleanQuery),
    /// Every document, scoring 1.
    MatchAll,
}

impl Query {
    /// `None` when the query cannot match anything.
    pub fn scorer<'a>(&self, searcher: &'a Searcher) -> Result<Option<Scorer<'a>>> {
        match self {
            Query::Term(query) => query.scorer(searcher),
            Query::Phrase(query) => query.scorer(searcher),
            Query::Boolean(query) => query.scorer(searcher),
            Query::MatchAll => Ok(Some(Scorer::MatchAll(MatchAllScorer::new(
                searcher.total_docs(),
            )))),
        }
    }
}

impl From<TermQuery> for Query {
    fn from(query: TermQuery) -> Self {
        Query::Term(query)
    }
}

impl From<PhraseQuery> for Query {
    fn from(query: PhraseQuery) -> Self {
        Query::Phrase(query)
    }
}

impl From<BooleanQuery> for Query {
    fn from(query: BooleanQuery) -> Self {
        Query::Boolean(query)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(query) => query.fmt(f),
            Query::Phrase(query) => query.fmt(f),
            Query::Boolean(query) => query.fmt(f),
            Query::MatchAll => f.write_str("*:*"),
        }
    }
}
