//! Consecutive token query.

use std::fmt;

use crate::error::Result;
use crate::packed::count_doc_ids;
use crate::query::bm25::Bm25;
use crate::query::scorer::{Scorer, TermScorer};
use crate::searcher::Searcher;

/// Matches documents containing the tokens at consecutive positions.
///
/// Positions are resolved with the packed intersection, so the scorer walks
/// the positions of the last token of each occurrence. The phrase counts
/// as one term for BM25 with its own document frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseQuery {
    terms: Vec<String>,
}

impl PhraseQuery {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PhraseQuery {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn scorer<'a>(&self, searcher: &'a Searcher) -> Result<Option<Scorer<'a>>> {
        let Some(postings) = searcher.phrase_postings(&self.terms)? else {
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

impl fmt::Display for PhraseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.terms.join(" "))
    }
}
