//! Read side of an index directory.
//!
//! A [`Searcher`] maps the index files read-only and answers phrase, boolean
//! and ranked queries. It holds no mutable state apart from atomic timing
//! counters, so one instance can be shared between threads behind an `Arc`.
//!
//! # Example
//!
//! ```no_run
//! use roaringish::indexer::Indexer;
//! use roaringish::searcher::Searcher;
//!
//! let mut indexer = Indexer::with_defaults("/tmp/index")?;
//! indexer.add_document("look at my beautiful cat", 0)?;
//! indexer.commit()?;
//!
//! let searcher = Searcher::with_defaults("/tmp/index")?;
//! assert_eq!(searcher.search("beautiful cat")?, vec![0]);
//! # Ok::<(), roaringish::error::RoaringishError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, trace};
use roaring::RoaringBitmap;

use crate::analysis::{FstPrefixMatcher, Tokenizer};
use crate::common_tokens::{CommonTokens, TokenUnit};
use crate::config::SearcherConfig;
use crate::error::{Result, RoaringishError};
use crate::intersect::Intersector;
use crate::packed::{RoaringishPacked, count_doc_ids};
use crate::query::collector::{Collector, CountCollector, TopDocsCollector, collect_all};
use crate::query::{BoolNode, BooleanQuery, BooleanQueryParser, Query, SearchHit, TermQuery};
use crate::stats::Stats;
use crate::storage::{
    COMMON_TOKENS_FILE, DOC_LENGTHS_FILE, DOC_OFFSETS_FILE, DOCUMENTS_FILE, DocLengths,
    DocumentStore, INDEX_STATS_FILE, IndexStats, POSTINGS_FILE, PostingsFile, TOKEN_MAP_FILE,
    TokenDirectory,
};

pub struct Searcher {
    path: PathBuf,
    config: SearcherConfig,
    tokenizer: Arc<dyn Tokenizer>,
    directory: TokenDirectory,
    postings: PostingsFile,
    doc_lengths: DocLengths,
    documents: DocumentStore,
    index_stats: IndexStats,
    common_tokens: CommonTokens,
    /// Vocabulary of single tokens for `word*` expansion.
    prefix_matcher: Arc<FstPrefixMatcher>,
    intersector: Intersector,
    stats: Stats,
}

impl Searcher {
    pub fn open<P: AsRef<Path>>(path: P, config: SearcherConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(RoaringishError::index(format!(
                "Index directory {} does not exist",
                path.display()
            )));
        }

        let directory = TokenDirectory::read_from(&path.join(TOKEN_MAP_FILE))?;
        let postings = PostingsFile::open(&path.join(POSTINGS_FILE))?;
        let doc_lengths = DocLengths::open(&path.join(DOC_LENGTHS_FILE))?;
        let documents =
            DocumentStore::open(&path.join(DOCUMENTS_FILE), &path.join(DOC_OFFSETS_FILE))?;
        let index_stats = IndexStats::read_from(&path.join(INDEX_STATS_FILE))?;
        let common_tokens = CommonTokens::read_from(&path.join(COMMON_TOKENS_FILE))?;
        let prefix_matcher = Arc::new(FstPrefixMatcher::new(
            directory.tokens().filter(|token| !token.contains(' ')),
        )?);
        let intersector = Intersector::new(config.force_naive_intersect);

        info!(
            "Opened index at {}: {} docs, {} tokens, {} common tokens, {} intersection",
            path.display(),
            index_stats.total_docs,
            directory.len(),
            common_tokens.len(),
            intersector.default_strategy().intersector().name()
        );

        Ok(Searcher {
            path,
            tokenizer: Arc::clone(&config.tokenizer),
            config,
            directory,
            postings,
            doc_lengths,
            documents,
            index_stats,
            common_tokens,
            prefix_matcher,
            intersector,
            stats: Stats::new(),
        })
    }

    pub fn with_defaults<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, SearcherConfig::default())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SearcherConfig {
        &self.config
    }

    /// Documents containing `text` as a phrase, in increasing id order.
    pub fn search(&self, text: &str) -> Result<Vec<u32>> {
        let tokens = self
            .stats
            .normalize_tokenize
            .time(|| self.tokenizer.tokens(text))?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let Some(postings) = self.phrase_postings(&tokens)? else {
            return Ok(Vec::new());
        };
        Ok(self.stats.get_doc_ids.time(|| postings.get_doc_ids()))
    }

    /// Positions where `tokens` occur consecutively, keyed on the start of
    /// the last unit. `None` when some unit is not indexed.
    pub(crate) fn phrase_postings(&self, tokens: &[String]) -> Result<Option<RoaringishPacked>> {
        if tokens.is_empty() {
            return Ok(None);
        }

        let units = self.stats.merge_minimize.time(|| {
            self.common_tokens.minimize(tokens, |unit| {
                Ok(self.directory.get(unit).map(|entry| entry.word_count()))
            })
        })?;
        trace!("Phrase {tokens:?} minimized to {units:?}");

        let mut lists = Vec::with_capacity(units.len());
        for unit in &units {
            match self.postings(&unit.token)? {
                Some(postings) if !postings.is_empty() => lists.push(postings),
                _ => {
                    debug!("Unit {:?} is not indexed", unit.token);
                    return Ok(None);
                }
            }
        }

        if lists.len() == 1 {
            return Ok(lists.pop());
        }
        Ok(Some(self.chain(&units, &lists)))
    }

    /// Intersect adjacent units, starting from the cheapest pair and growing
    /// toward the shorter neighbour.
    fn chain(&self, units: &[TokenUnit], lists: &[RoaringishPacked]) -> RoaringishPacked {
        let mut pivot = 0;
        let mut min = usize::MAX;
        for i in 0..lists.len() - 1 {
            let cost = lists[i].len() + lists[i + 1].len();
            if cost <= min {
                min = cost;
                pivot = i;
            }
        }
        trace!("Pivot at units {} and {}", pivot, pivot + 1);

        let mut lhs_len = units[pivot].len;
        let mut rhs_len = units[pivot + 1].len;
        let mut result = self.intersect(&lists[pivot], &lists[pivot + 1], lhs_len);

        // Next unit to the left and to the right of the chained range.
        let mut left = pivot.checked_sub(1);
        let mut right = (pivot + 2 < lists.len()).then_some(pivot + 2);

        while !result.is_empty() {
            let go_left = match (left, right) {
                (Some(l), Some(r)) => lists[l].len() <= lists[r].len(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if go_left {
                let Some(l) = left else { break };
                lhs_len += units[l].len;
                result = self.intersect(&lists[l], &result, lhs_len);
                left = l.checked_sub(1);
            } else {
                let Some(r) = right else { break };
                result = self.intersect(&result, &lists[r], rhs_len);
                lhs_len += rhs_len;
                rhs_len = units[r].len;
                right = (r + 1 < lists.len()).then_some(r + 1);
            }
        }
        result
    }

    /// Posting list of an indexed unit.
    pub fn postings(&self, token: &str) -> Result<Option<RoaringishPacked>> {
        Ok(self
            .directory
            .get(token)
            .map(|entry| self.postings.read(entry)))
    }

    /// Positions of `rhs` preceded by `lhs` exactly `lhs_len` positions
    /// earlier.
    pub fn intersect(
        &self,
        lhs: &RoaringishPacked,
        rhs: &RoaringishPacked,
        lhs_len: u32,
    ) -> RoaringishPacked {
        self.intersector
            .intersect(lhs.as_borrow(), rhs.as_borrow(), lhs_len, &self.stats)
    }

    /// A boolean query parser configured for this index.
    pub fn parser(&self) -> BooleanQueryParser {
        BooleanQueryParser::new(Arc::clone(&self.tokenizer))
            .with_prefix_matcher(self.prefix_matcher.clone())
    }

    /// Unranked boolean search, documents in increasing id order.
    ///
    /// `NOT x` is taken against every id below the document count.
    pub fn search_boolean(&self, text: &str) -> Result<Vec<u32>> {
        let Some(node) = self.parser().parse(text)? else {
            return Ok(Vec::new());
        };
        Ok(self.evaluate(&node)?.iter().collect())
    }

    fn evaluate(&self, node: &BoolNode) -> Result<RoaringBitmap> {
        Ok(match node {
            BoolNode::Term(tokens) => match self.phrase_postings(tokens)? {
                Some(postings) => postings.get_doc_ids().into_iter().collect(),
                None => RoaringBitmap::new(),
            },
            BoolNode::And(lhs, rhs) => {
                let lhs = self.evaluate(lhs)?;
                if lhs.is_empty() {
                    return Ok(lhs);
                }
                lhs & self.evaluate(rhs)?
            }
            BoolNode::Or(lhs, rhs) => self.evaluate(lhs)? | self.evaluate(rhs)?,
            BoolNode::Not(child) => {
                let mut all = RoaringBitmap::new();
                all.insert_range(0..self.total_docs());
                all - self.evaluate(child)?
            }
        })
    }

    /// Rank documents containing any of the query tokens with BM25.
    pub fn search_bm25(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let mut tokens = self.tokenizer.tokens(text)?;
        tokens.sort_unstable();
        tokens.dedup();

        let query = tokens
            .into_iter()
            .fold(BooleanQuery::new(), |query, token| {
                query.should(TermQuery::new(token).into())
            });
        self.search_query(&query.into(), k)
    }

    /// Parse a boolean query string and rank its matches.
    pub fn search_ranked(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        match self.parser().parse(text)? {
            Some(node) => self.search_query(&node.to_query(), k),
            None => Ok(Vec::new()),
        }
    }

    /// Top `k` documents of `query`, best first.
    pub fn search_query(&self, query: &Query, k: usize) -> Result<Vec<SearchHit>> {
        let Some(mut scorer) = query.scorer(self)? else {
            debug!("Query {query} matches nothing");
            return Ok(Vec::new());
        };
        let mut collector = TopDocsCollector::new(k);
        collect_all(&mut scorer, &mut collector);
        trace!("Query {query} scored {} documents", collector.total_hits());
        Ok(collector.into_hits())
    }

    /// Number of documents matching `query`, without scoring order.
    pub fn count(&self, query: &Query) -> Result<u64> {
        let Some(mut scorer) = query.scorer(self)? else {
            return Ok(0);
        };
        let mut collector = CountCollector::new();
        collect_all(&mut scorer, &mut collector);
        Ok(collector.count())
    }

    /// Stored content of a document.
    pub fn get_document(&self, doc_id: u32) -> Result<Option<String>> {
        self.documents.get(doc_id)
    }

    /// Number of documents containing the unit.
    pub fn doc_freq(&self, token: &str) -> Result<u32> {
        Ok(self
            .postings(token)?
            .map_or(0, |postings| count_doc_ids(&postings) as u32))
    }

    pub fn total_docs(&self) -> u32 {
        self.index_stats.total_docs
    }

    pub fn avg_doc_length(&self) -> f32 {
        self.index_stats.avg_doc_length()
    }

    /// Token count of a document, 0 when unknown.
    pub fn doc_length(&self, doc_id: u32) -> u32 {
        self.doc_lengths.get(doc_id)
    }

    pub(crate) fn doc_lengths(&self) -> &DocLengths {
        &self.doc_lengths
    }

    pub fn index_stats(&self) -> IndexStats {
        self.index_stats
    }

    pub fn common_tokens(&self) -> &CommonTokens {
        &self.common_tokens
    }

    /// Timing counters of the searches run so far.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("tokens", &self.directory.len())
            .field("index_stats", &self.index_stats)
            .field("common_tokens", &self.common_tokens.len())
            .field("intersector", &self.intersector)
            .finish()
    }
}
