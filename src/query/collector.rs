//! Collectors gathering scored documents from a scorer.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use crate::query::SearchHit;
use crate::query::scorer::{NO_MORE_DOCS, Scorer};

/// Receives every matching document with its score.
pub trait Collector: Debug {
    fn collect(&mut self, doc_id: u32, score: f32);

    /// Total number of documents collected so far.
    fn total_hits(&self) -> u64;
}

/// Drain `scorer` into `collector`.
pub fn collect_all<C: Collector + ?Sized>(scorer: &mut Scorer<'_>, collector: &mut C) {
    loop {
        let doc = scorer.next_doc();
        if doc == NO_MORE_DOCS {
            break;
        }
        let score = scorer.score();
        collector.collect(doc, score);
    }
}

/// Keeps the `k` best documents.
///
/// Higher scores win and equal scores prefer the smaller doc id.
#[derive(Debug)]
pub struct TopDocsCollector {
    max_docs: usize,
    /// The worst kept hit sits on top.
    hits: BinaryHeap<ScoredDoc>,
    total_hits: u64,
}

#[derive(Debug, Clone, Copy)]
struct ScoredDoc {
    doc_id: u32,
    score: f32,
}

impl PartialEq for ScoredDoc {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    // Greater means worse.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

impl TopDocsCollector {
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            hits: BinaryHeap::with_capacity(max_docs.min(1024) + 1),
            total_hits: 0,
        }
    }

    pub fn max_docs(&self) -> usize {
        self.max_docs
    }

    /// Kept hits, best first.
    pub fn into_hits(self) -> Vec<SearchHit> {
        self.hits
            .into_sorted_vec()
            .into_iter()
            .map(|doc| SearchHit {
                doc_id: doc.doc_id,
                score: doc.score,
            })
            .collect()
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, doc_id: u32, score: f32) {
        self.total_hits += 1;
        if self.max_docs == 0 {
            return;
        }

        let scored = ScoredDoc { doc_id, score };
        if self.hits.len() < self.max_docs {
            self.hits.push(scored);
        } else if let Some(mut worst) = self.hits.peek_mut()
            && scored < *worst
        {
            *worst = scored;
        }
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }
}

/// Only counts matches.
#[derive(Debug, Default)]
pub struct CountCollector {
    count: u64,
}

impl CountCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Collector for CountCollector {
    fn collect(&mut self, _doc_id: u32, _score: f32) {
        self.count += 1;
    }

    fn total_hits(&self) -> u64 {
        self.count
    }
}
