//! Single token query.

use std::fmt;

use crate::error::Result;
use crate::packed::count_doc_ids;
use crate::query::bm25::Bm25;
use crate::query::scorer::{Scorer, TermScorer};
use crate::searcher::Searcher;

/// Matches documents containing one normalized token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermQuery {
    term: String,
}

impl TermQuery {
    pub fn new(term: impl Into<String>) -> Self {
        TermQuery { term: term.into() }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// `None` when the token is not indexed.
    pub fn scorer<'a>(&self, searcher: &'a Searcher) -> Result<Option<Scorer<'a>>> {
        let Some(postings) = searcher.postings(&self.term)? else {
            return Ok(None);
        };
        let doc_freq = count_doc_ids(&postings) as u32;
        if doc_freq == 0 {
            return Ok(None);
        }
        let bm25 = Bm25::new(searcher.total_docs(), doc_freq, searcher.avg_doc_length());
        Ok(Some(Scorer::Term(TermScorer::new(
            postings,
            bm25,
            searcher.doc_lengths(),
        ))))
    }
}

impl fmt::Display for TermQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.term)
    }
}
