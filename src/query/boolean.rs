//! Boolean combination of queries.

use std::fmt;

use crate::error::Result;
use crate::query::Query;
use crate::query::scorer::{
    ConjunctionScorer, DisjunctionScorer, ReqExclScorer, ReqOptScorer, Scorer,
};
use crate::searcher::Searcher;

/// How a clause takes part in a boolean query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// Required; scores are summed.
    Must,
    /// Optional unless no clause is required; scores are summed.
    Should,
    /// Excluded; never scored.
    MustNot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanClause {
    pub query: Query,
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: Query, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }
}

/// An ordered list of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, query: Query, occur: Occur) {
        self.clauses.push(BooleanClause::new(query, occur));
    }

    pub fn must(mut self, query: Query) -> Self {
        self.add(query, Occur::Must);
        self
    }

    pub fn should(mut self, query: Query) -> Self {
        self.add(query, Occur::Should);
        self
    }

    pub fn must_not(mut self, query: Query) -> Self {
        self.add(query, Occur::MustNot);
        self
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Compose the clause scorers.
    ///
    /// A required clause without matches empties the whole query. Optional
    /// clauses only add to the score once something is required, and a
    /// query with nothing but exclusions matches nothing.
    pub fn scorer<'a>(&self, searcher: &'a Searcher) -> Result<Option<Scorer<'a>>> {
        let mut must = Vec::new();
        let mut should = Vec::new();
        let mut must_not = Vec::new();

        for clause in &self.clauses {
            let scorer = clause.query.scorer(searcher)?;
            match (clause.occur, scorer) {
                (Occur::Must, Some(scorer)) => must.push(scorer),
                (Occur::Must, None) => return Ok(None),
                (Occur::Should, Some(scorer)) => should.push(scorer),
                (Occur::MustNot, Some(scorer)) => must_not.push(scorer),
                (_, None) => {}
            }
        }

        let required = combine(must, |s| Scorer::Conjunction(ConjunctionScorer::new(s)));
        let optional = combine(should, |s| Scorer::Disjunction(DisjunctionScorer::new(s)));
        let excluded = combine(must_not, |s| Scorer::Disjunction(DisjunctionScorer::new(s)));

        let scorer = match (required, optional) {
            (Some(required), Some(optional)) => {
                Scorer::ReqOpt(ReqOptScorer::new(required, optional))
            }
            (Some(required), None) => required,
            (None, Some(optional)) => optional,
            (None, None) => return Ok(None),
        };

        Ok(Some(match excluded {
            Some(excluded) => Scorer::ReqExcl(ReqExclScorer::new(scorer, excluded)),
            None => scorer,
        }))
    }
}

fn combine<'a>(
    mut scorers: Vec<Scorer<'a>>,
    many: impl FnOnce(Vec<Scorer<'a>>) -> Scorer<'a>,
) -> Option<Scorer<'a>> {
    match scorers.len() {
        0 => None,
        1 => scorers.pop(),
        _ => Some(many(scorers)),
    }
}

impl fmt::Display for BooleanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match clause.occur {
                Occur::Must => write!(f, "+{}", clause.query)?,
                Occur::Should => write!(f, "{}", clause.query)?,
                Occur::MustNot => write!(f, "-{}", clause.query)?,
            }
        }
        f.write_str(")")
    }
}
