//! Pull-based scorers iterating matching documents in increasing id order.
//!
//! A scorer starts unpositioned. [`Scorer::next_doc`] moves to the next
//! match and [`Scorer::advance`] to the first match at or after a target;
//! both return [`NO_MORE_DOCS`] once exhausted. Advancing to a target the
//! scorer already reached leaves it where it is.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::packed::{RoaringishPacked, unpack_doc_id, unpack_values};
use crate::query::bm25::Bm25;
use crate::storage::DocLengths;

/// Returned once a scorer is exhausted.
pub const NO_MORE_DOCS: u32 = u32::MAX;

#[inline]
fn before(doc: Option<u32>, target: u32) -> bool {
    doc.is_none_or(|d| d < target)
}

/// The closed set of scorers a query compiles to.
#[derive(Debug)]
pub enum Scorer<'a> {
    Term(TermScorer<'a>),
    MatchAll(MatchAllScorer),
    Conjunction(ConjunctionScorer<'a>),
    Disjunction(DisjunctionScorer<'a>),
    ReqExcl(ReqExclScorer<'a>),
    ReqOpt(ReqOptScorer<'a>),
}

impl Scorer<'_> {
    /// Current document, `None` before the first move.
    pub fn doc_id(&self) -> Option<u32> {
        match self {
            Scorer::Term(s) => s.current,
            Scorer::MatchAll(s) => s.current,
            Scorer::Conjunction(s) => s.current,
            Scorer::Disjunction(s) => s.current,
            Scorer::ReqExcl(s) => s.current,
            Scorer::ReqOpt(s) => s.required.doc_id(),
        }
    }

    pub fn next_doc(&mut self) -> u32 {
        match self {
            Scorer::Term(s) => s.next_doc(),
            Scorer::MatchAll(s) => s.next_doc(),
            Scorer::Conjunction(s) => s.next_doc(),
            Scorer::Disjunction(s) => s.next_doc(),
            Scorer::ReqExcl(s) => s.next_doc(),
            Scorer::ReqOpt(s) => s.required.next_doc(),
        }
    }

    pub fn advance(&mut self, target: u32) -> u32 {
        if let Some(doc) = self.doc_id()
            && doc >= target
        {
            return doc;
        }
        match self {
            Scorer::Term(s) => s.advance(target),
            Scorer::MatchAll(s) => s.advance(target),
            Scorer::Conjunction(s) => s.advance(target),
            Scorer::Disjunction(s) => s.advance(target),
            Scorer::ReqExcl(s) => s.advance(target),
            Scorer::ReqOpt(s) => s.required.advance(target),
        }
    }

    /// Score of the current document.
    pub fn score(&mut self) -> f32 {
        match self {
            Scorer::Term(s) => s.score(),
            Scorer::MatchAll(_) => 1.0,
            Scorer::Conjunction(s) => s.scorers.iter_mut().map(Scorer::score).sum(),
            Scorer::Disjunction(s) => s.score(),
            Scorer::ReqExcl(s) => s.required.score(),
            Scorer::ReqOpt(s) => s.score(),
        }
    }
}

/// Walks a posting list document by document.
///
/// The frequency of a document is the number of its set position bits.
pub struct TermScorer<'a> {
    postings: RoaringishPacked,
    next: usize,
    current: Option<u32>,
    freq: u32,
    bm25: Bm25,
    doc_lengths: &'a DocLengths,
}

impl<'a> TermScorer<'a> {
    pub fn new(postings: RoaringishPacked, bm25: Bm25, doc_lengths: &'a DocLengths) -> Self {
        TermScorer {
            postings,
            next: 0,
            current: None,
            freq: 0,
            bm25,
            doc_lengths,
        }
    }

    /// Occurrences in the current document.
    pub fn freq(&self) -> u32 {
        self.freq
    }

    fn next_doc(&mut self) -> u32 {
        let words = self.postings.as_slice();
        loop {
            let Some(&word) = words.get(self.next) else {
                self.current = Some(NO_MORE_DOCS);
                self.freq = 0;
                return NO_MORE_DOCS;
            };
            let doc_id = unpack_doc_id(word);
            let mut freq = 0;
            while let Some(&word) = words.get(self.next) {
                if unpack_doc_id(word) != doc_id {
                    break;
                }
                freq += unpack_values(word).count_ones();
                self.next += 1;
            }
            if freq > 0 {
                self.current = Some(doc_id);
                self.freq = freq;
                return doc_id;
            }
        }
    }

    fn advance(&mut self, target: u32) -> u32 {
        let rest = &self.postings.as_slice()[self.next..];
        self.next += rest.partition_point(|&w| unpack_doc_id(w) < target);
        self.next_doc()
    }

    fn score(&self) -> f32 {
        match self.current {
            Some(doc) if doc != NO_MORE_DOCS => {
                self.bm25.score(self.freq, self.doc_lengths.get(doc))
            }
            _ => 0.0,
        }
    }
}

impl std::fmt::Debug for TermScorer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermScorer")
            .field("words", &self.postings.len())
            .field("current", &self.current)
            .field("freq", &self.freq)
            .field("bm25", &self.bm25)
            .finish()
    }
}

/// Every document id below `max_doc`, each scoring 1.
#[derive(Debug)]
pub struct MatchAllScorer {
    current: Option<u32>,
    max_doc: u32,
}

impl MatchAllScorer {
    pub fn new(max_doc: u32) -> Self {
        MatchAllScorer {
            current: None,
            max_doc,
        }
    }

    fn next_doc(&mut self) -> u32 {
        let next = match self.current {
            None => 0,
            Some(NO_MORE_DOCS) => NO_MORE_DOCS,
            Some(doc) => doc + 1,
        };
        self.advance(next)
    }

    fn advance(&mut self, target: u32) -> u32 {
        let doc = if target >= self.max_doc {
            NO_MORE_DOCS
        } else {
            target
        };
        self.current = Some(doc);
        doc
    }
}

/// Documents matched by all sub-scorers, found by leapfrogging.
#[derive(Debug)]
pub struct ConjunctionScorer<'a> {
    scorers: Vec<Scorer<'a>>,
    current: Option<u32>,
}

impl<'a> ConjunctionScorer<'a> {
    pub fn new(scorers: Vec<Scorer<'a>>) -> Self {
        ConjunctionScorer {
            scorers,
            current: None,
        }
    }

    fn exhaust(&mut self) -> u32 {
        self.current = Some(NO_MORE_DOCS);
        NO_MORE_DOCS
    }

    fn next_doc(&mut self) -> u32 {
        match self.current {
            Some(NO_MORE_DOCS) => NO_MORE_DOCS,
            None => {
                let mut target = 0;
                for scorer in &mut self.scorers {
                    let doc = scorer.next_doc();
                    if doc == NO_MORE_DOCS {
                        return self.exhaust();
                    }
                    target = target.max(doc);
                }
                self.align(target)
            }
            Some(_) => match self.scorers.first_mut() {
                Some(first) => {
                    let doc = first.next_doc();
                    if doc == NO_MORE_DOCS {
                        return self.exhaust();
                    }
                    self.align(doc)
                }
                None => self.exhaust(),
            },
        }
    }

    fn advance(&mut self, target: u32) -> u32 {
        if self.current == Some(NO_MORE_DOCS) {
            return NO_MORE_DOCS;
        }
        let mut max = target;
        for scorer in &mut self.scorers {
            let doc = scorer.advance(target);
            if doc == NO_MORE_DOCS {
                return self.exhaust();
            }
            max = max.max(doc);
        }
        self.align(max)
    }

    /// Move every scorer to a common document at or after `target`.
    fn align(&mut self, mut target: u32) -> u32 {
        let n = self.scorers.len();
        if n == 0 {
            return self.exhaust();
        }
        let mut first = 0;
        let mut idx = 0;
        loop {
            let scorer = &mut self.scorers[idx];
            let mut doc = scorer.doc_id().unwrap_or(0);
            if before(scorer.doc_id(), target) {
                doc = scorer.advance(target);
                if doc == NO_MORE_DOCS {
                    return self.exhaust();
                }
            }
            if doc > target {
                target = doc;
                first = idx;
            }
            idx = (idx + 1) % n;
            if idx == first {
                self.current = Some(target);
                return target;
            }
        }
    }
}

/// Documents matched by any sub-scorer, merged through a min-heap.
#[derive(Debug)]
pub struct DisjunctionScorer<'a> {
    scorers: Vec<Scorer<'a>>,
    heap: BinaryHeap<Reverse<(u32, usize)>>,
    current: Option<u32>,
}

impl<'a> DisjunctionScorer<'a> {
    pub fn new(mut scorers: Vec<Scorer<'a>>) -> Self {
        let mut heap = BinaryHeap::with_capacity(scorers.len());
        for (idx, scorer) in scorers.iter_mut().enumerate() {
            let doc = scorer.next_doc();
            if doc != NO_MORE_DOCS {
                heap.push(Reverse((doc, idx)));
            }
        }
        DisjunctionScorer {
            scorers,
            heap,
            current: None,
        }
    }

    fn next_doc(&mut self) -> u32 {
        match self.current {
            Some(NO_MORE_DOCS) => return NO_MORE_DOCS,
            Some(current) => {
                while let Some(&Reverse((doc, idx))) = self.heap.peek() {
                    if doc != current {
                        break;
                    }
                    self.heap.pop();
                    let next = self.scorers[idx].next_doc();
                    if next != NO_MORE_DOCS {
                        self.heap.push(Reverse((next, idx)));
                    }
                }
            }
            None => {}
        }
        self.settle()
    }

    fn advance(&mut self, target: u32) -> u32 {
        while let Some(&Reverse((doc, idx))) = self.heap.peek() {
            if doc >= target {
                break;
            }
            self.heap.pop();
            let next = self.scorers[idx].advance(target);
            if next != NO_MORE_DOCS {
                self.heap.push(Reverse((next, idx)));
            }
        }
        self.settle()
    }

    fn settle(&mut self) -> u32 {
        let doc = self
            .heap
            .peek()
            .map_or(NO_MORE_DOCS, |&Reverse((doc, _))| doc);
        self.current = Some(doc);
        doc
    }

    /// Sum over the sub-scorers positioned on the current document.
    fn score(&mut self) -> f32 {
        let Some(current) = self.current else {
            return 0.0;
        };
        let mut score = 0.0;
        for &Reverse((doc, idx)) in self.heap.iter() {
            if doc == current {
                score += self.scorers[idx].score();
            }
        }
        score
    }
}

/// Documents of `required` that `excluded` does not match.
#[derive(Debug)]
pub struct ReqExclScorer<'a> {
    required: Box<Scorer<'a>>,
    excluded: Box<Scorer<'a>>,
    current: Option<u32>,
}

impl<'a> ReqExclScorer<'a> {
    pub fn new(required: Scorer<'a>, excluded: Scorer<'a>) -> Self {
        ReqExclScorer {
            required: Box::new(required),
            excluded: Box::new(excluded),
            current: None,
        }
    }

    fn next_doc(&mut self) -> u32 {
        let doc = self.required.next_doc();
        self.skip_excluded(doc)
    }

    fn advance(&mut self, target: u32) -> u32 {
        let doc = self.required.advance(target);
        self.skip_excluded(doc)
    }

    fn skip_excluded(&mut self, mut doc: u32) -> u32 {
        while doc != NO_MORE_DOCS {
            let excluded = self.excluded.advance(doc);
            if excluded != doc {
                break;
            }
            doc = self.required.next_doc();
        }
        self.current = Some(doc);
        doc
    }
}

/// Documents of `required`, with `optional` adding to the score where it
/// also matches.
#[derive(Debug)]
pub struct ReqOptScorer<'a> {
    required: Box<Scorer<'a>>,
    optional: Box<Scorer<'a>>,
}

impl<'a> ReqOptScorer<'a> {
    pub fn new(required: Scorer<'a>, optional: Scorer<'a>) -> Self {
        ReqOptScorer {
            required: Box::new(required),
            optional: Box::new(optional),
        }
    }

    fn score(&mut self) -> f32 {
        let mut score = self.required.score();
        if let Some(doc) = self.required.doc_id()
            && doc != NO_MORE_DOCS
            && self.optional.advance(doc) == doc
        {
            score += self.optional.score();
        }
        score
    }
}
