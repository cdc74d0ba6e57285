//! Building an index directory from a stream of documents.
//!
//! Documents are tokenized and accumulated per token in an in-memory
//! [`Batch`](batch::Batch). Every `batch_size` documents the batch is flushed
//! to a temporary file sorted by token. [`Indexer::commit`] flushes what is
//! left, merges all batch files into `roaringish_packed.bin` and writes the
//! token directory, document lengths, document store and statistics.
//!
//! Common tokens, unless given as an explicit list, are chosen from the
//! token frequencies of the first batch. Until then the tokens of its
//! documents are kept aside so merged units can be generated for them too.

mod batch;
mod merge;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use log::{debug, info};

use crate::analysis::Tokenizer;
use crate::common_tokens::CommonTokens;
use crate::config::{CommonTokensConfig, IndexerConfig};
use crate::error::{Result, RoaringishError};
use crate::packed::MAX_VALUE;
use crate::storage::{
    COMMON_TOKENS_FILE, DOC_LENGTHS_FILE, DOC_OFFSETS_FILE, DOCUMENTS_FILE, DocLengthsWriter,
    DocumentStoreWriter, INDEX_STATS_FILE, IndexStats, POSTINGS_FILE, TOKEN_MAP_FILE,
};

use self::batch::{Batch, batch_file_name};
use self::merge::merge_batches;

const INDEX_FILES: [&str; 7] = [
    DOCUMENTS_FILE,
    DOC_OFFSETS_FILE,
    TOKEN_MAP_FILE,
    POSTINGS_FILE,
    DOC_LENGTHS_FILE,
    INDEX_STATS_FILE,
    COMMON_TOKENS_FILE,
];

/// Lifecycle of an indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    /// Accepting documents; batches are flushed as they fill up.
    Accepting,
    /// Committing. An indexer whose commit failed stays here.
    Merging,
    /// Committed.
    Closed,
}

/// Single-writer index builder.
pub struct Indexer {
    path: PathBuf,
    config: IndexerConfig,
    tokenizer: Arc<dyn Tokenizer>,
    state: IndexerState,

    batch: Batch,
    batch_files: Vec<PathBuf>,

    /// `None` until chosen from the first batch.
    common_tokens: Option<CommonTokens>,
    sample: Vec<(u32, Vec<String>)>,
    sample_frequencies: AHashMap<String, u64>,

    documents: Option<DocumentStoreWriter>,
    doc_lengths: DocLengthsWriter,
    doc_ids: AHashSet<u32>,
    stats: IndexStats,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("pending_docs", &self.pending_docs())
            .field("batch_files", &self.batch_files.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Indexer {
    /// Create an indexer writing to `path`, replacing any index files that
    /// are already there.
    pub fn new<P: AsRef<Path>>(path: P, config: IndexerConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path).map_err(|e| {
            RoaringishError::index(format!(
                "Failed to create index directory {}: {e}",
                path.display()
            ))
        })?;
        remove_index_files(&path)?;

        let common_tokens = match &config.common_tokens {
            CommonTokensConfig::None | CommonTokensConfig::List(_) => Some(CommonTokens::select(
                &config.common_tokens,
                &AHashMap::new(),
            )),
            CommonTokensConfig::FixedNum(_) | CommonTokensConfig::Percentage(_) => None,
        };

        let documents = DocumentStoreWriter::create(&path.join(DOCUMENTS_FILE))?;
        info!("Creating index at {} with {:?}", path.display(), config);

        Ok(Indexer {
            tokenizer: config.tokenizer.clone(),
            path,
            config,
            state: IndexerState::Accepting,
            batch: Batch::new(),
            batch_files: Vec::new(),
            common_tokens,
            sample: Vec::new(),
            sample_frequencies: AHashMap::new(),
            documents: Some(documents),
            doc_lengths: DocLengthsWriter::new(),
            doc_ids: AHashSet::new(),
            stats: IndexStats::default(),
        })
    }

    /// Create an indexer with the default configuration.
    pub fn with_defaults<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(path, IndexerConfig::default())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    /// Documents added since the last flush.
    pub fn pending_docs(&self) -> usize {
        self.batch.doc_count() + self.sample.len()
    }

    /// Statistics of the documents added so far.
    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Add one document under `doc_id`.
    ///
    /// Tokens past position `MAX_VALUE` are not indexed.
    pub fn add_document(&mut self, content: &str, doc_id: u32) -> Result<()> {
        self.check_accepting()?;

        let mut tokens = self.tokenizer.tokens(content)?;
        tokens.truncate(MAX_VALUE as usize);

        if let Some(documents) = self.documents.as_mut() {
            documents.add(doc_id, content)?;
        }
        // A repeated doc_id keeps its last length and is counted once.
        if self.doc_ids.insert(doc_id) {
            self.stats.total_docs += 1;
        } else {
            self.stats.total_tokens -= u64::from(self.doc_lengths.get(doc_id));
        }
        self.doc_lengths.set(doc_id, tokens.len() as u32);
        self.stats.total_tokens += tokens.len() as u64;

        match &self.common_tokens {
            Some(common) => self.batch.add_document(doc_id, &tokens, common),
            None => {
                for token in &tokens {
                    match self.sample_frequencies.get_mut(token.as_str()) {
                        Some(count) => *count += 1,
                        None => {
                            self.sample_frequencies.insert(token.clone(), 1);
                        }
                    }
                }
                self.sample.push((doc_id, tokens));
            }
        }

        if self.pending_docs() >= self.config.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    /// Add every `(content, doc_id)` pair, then commit. Returns the number of
    /// documents indexed.
    pub fn index<I, S>(&mut self, docs: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut count = 0;
        for (content, doc_id) in docs {
            self.add_document(content.as_ref(), doc_id)?;
            count += 1;
        }
        self.commit()?;
        Ok(count)
    }

    /// Flush the pending batch, merge all batches and write the remaining
    /// index files. The indexer is closed afterwards.
    ///
    /// On failure the indexer stays [`IndexerState::Merging`] and rejects
    /// further documents and commits.
    pub fn commit(&mut self) -> Result<()> {
        self.check_accepting()?;

        self.state = IndexerState::Merging;
        self.finish()?;
        self.state = IndexerState::Closed;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush_batch()?;
        let common = self.common_tokens.take().unwrap_or_default();

        let (directory, summary) =
            merge_batches(&self.batch_files, &self.path.join(POSTINGS_FILE))?;
        directory.write_to(&self.path.join(TOKEN_MAP_FILE))?;
        for file in self.batch_files.drain(..) {
            fs::remove_file(&file)?;
        }

        self.doc_lengths.write_to(&self.path.join(DOC_LENGTHS_FILE))?;
        if let Some(documents) = self.documents.take() {
            documents.finish(&self.path.join(DOC_OFFSETS_FILE))?;
        }
        self.stats.write_to(&self.path.join(INDEX_STATS_FILE))?;
        common.write_to(&self.path.join(COMMON_TOKENS_FILE))?;

        info!(
            "Committed index at {}: {} documents, {} tokens, {} distinct terms in {} postings bytes",
            self.path.display(),
            self.stats.total_docs,
            self.stats.total_tokens,
            summary.tokens,
            summary.bytes
        );
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.common_tokens.is_none() {
            let common = CommonTokens::select(&self.config.common_tokens, &self.sample_frequencies);
            info!(
                "Chose {} common tokens from the first {} documents",
                common.len(),
                self.sample.len()
            );
            for (doc_id, tokens) in self.sample.drain(..) {
                self.batch.add_document(doc_id, &tokens, &common);
            }
            self.sample_frequencies = AHashMap::new();
            self.common_tokens = Some(common);
        }

        if self.batch.is_empty() {
            return Ok(());
        }

        let index = self.batch_files.len();
        let path = self.path.join(batch_file_name(index));
        debug!(
            "Flushing batch {index} with {} documents and {} tokens",
            self.batch.doc_count(),
            self.batch.token_count()
        );
        self.batch.flush_to(&path)?;
        self.batch_files.push(path);
        Ok(())
    }

    fn check_accepting(&self) -> Result<()> {
        match self.state {
            IndexerState::Accepting => Ok(()),
            state => Err(RoaringishError::invalid_operation(format!(
                "Indexer is {state:?}, no more documents can be added"
            ))),
        }
    }
}

fn remove_index_files(path: &Path) -> Result<()> {
    for name in INDEX_FILES {
        let file = path.join(name);
        if file.exists() {
            fs::remove_file(&file)?;
        }
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("batch_") && name.ends_with(".bin") {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_tokens::CommonTokens;
    use crate::storage::{DocLengths, DocumentStore, TokenDirectory};
    use tempfile::TempDir;

    #[test]
    fn test_commit_writes_all_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut indexer = Indexer::new(
            temp_dir.path(),
            IndexerConfig::default().with_batch_size(2),
        )
        .unwrap();

        let count = indexer
            .index([("Hello world", 0), ("hello there", 1), ("world", 2)])
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(indexer.state(), IndexerState::Closed);

        for name in INDEX_FILES {
            assert!(temp_dir.path().join(name).exists(), "{name} missing");
        }
        assert!(!temp_dir.path().join(batch_file_name(0)).exists());

        let directory = TokenDirectory::read_from(&temp_dir.path().join(TOKEN_MAP_FILE)).unwrap();
        assert_eq!(directory.get("hello").unwrap().doc_count, 2);
        assert_eq!(directory.get("world").unwrap().doc_count, 2);

        let lengths = DocLengths::open(&temp_dir.path().join(DOC_LENGTHS_FILE)).unwrap();
        assert_eq!(lengths.get(0), 2);
        assert_eq!(lengths.get(2), 1);

        let stats = IndexStats::read_from(&temp_dir.path().join(INDEX_STATS_FILE)).unwrap();
        assert_eq!(stats.total_docs, 3);
        assert_eq!(stats.total_tokens, 5);

        let store = DocumentStore::open(
            &temp_dir.path().join(DOCUMENTS_FILE),
            &temp_dir.path().join(DOC_OFFSETS_FILE),
        )
        .unwrap();
        assert_eq!(store.get(1).unwrap().as_deref(), Some("hello there"));
    }

    #[test]
    fn test_closed_after_commit() {
        let temp_dir = TempDir::new().unwrap();
        let mut indexer = Indexer::with_defaults(temp_dir.path()).unwrap();
        indexer.add_document("one", 0).unwrap();
        indexer.commit().unwrap();

        let err = indexer.add_document("two", 1).unwrap_err();
        assert!(matches!(err, RoaringishError::InvalidOperation(_)));
        assert!(indexer.commit().is_err());
    }

    #[test]
    fn test_common_tokens_from_first_batch() {
        let temp_dir = TempDir::new().unwrap();
        let config = IndexerConfig::default()
            .with_batch_size(3)
            .with_common_tokens(CommonTokensConfig::FixedNum(1));
        let mut indexer = Indexer::new(temp_dir.path(), config).unwrap();
        indexer
            .index([
                ("the cat", 0),
                ("the dog", 1),
                ("the bird", 2),
                ("the cat again", 3),
            ])
            .unwrap();

        let common = CommonTokens::read_from(&temp_dir.path().join(COMMON_TOKENS_FILE)).unwrap();
        assert_eq!(common.len(), 1);
        assert!(common.contains("the"));

        let directory = TokenDirectory::read_from(&temp_dir.path().join(TOKEN_MAP_FILE)).unwrap();
        assert_eq!(directory.get("the cat").unwrap().doc_count, 2);
        assert_eq!(directory.get("the dog").unwrap().doc_count, 1);
    }

    #[test]
    fn test_new_replaces_previous_index() {
        let temp_dir = TempDir::new().unwrap();
        Indexer::with_defaults(temp_dir.path())
            .unwrap()
            .index([("old content", 0)])
            .unwrap();
        Indexer::with_defaults(temp_dir.path())
            .unwrap()
            .index([("new", 0)])
            .unwrap();

        let directory = TokenDirectory::read_from(&temp_dir.path().join(TOKEN_MAP_FILE)).unwrap();
        assert!(directory.get("old").is_none());
        assert!(directory.get("new").is_some());
    }

    #[test]
    fn test_repeated_doc_id_counted_once() {
        let temp_dir = TempDir::new().unwrap();
        let mut indexer = Indexer::with_defaults(temp_dir.path()).unwrap();
        indexer.add_document("one two three", 4).unwrap();
        indexer.add_document("alpha", 7).unwrap();
        indexer.add_document("four five", 4).unwrap();
        assert_eq!(indexer.stats().total_docs, 2);
        assert_eq!(indexer.stats().total_tokens, 3);
        indexer.commit().unwrap();

        let lengths = DocLengths::open(&temp_dir.path().join(DOC_LENGTHS_FILE)).unwrap();
        assert_eq!(lengths.get(4), 2);
        let stats = IndexStats::read_from(&temp_dir.path().join(INDEX_STATS_FILE)).unwrap();
        assert_eq!(stats.total_docs, 2);
        assert_eq!(stats.total_tokens, 3);
    }

    #[test]
    fn test_failed_commit_stays_merging() {
        let temp_dir = TempDir::new().unwrap();
        let index_dir = temp_dir.path().join("index");
        let mut indexer = Indexer::with_defaults(&index_dir).unwrap();
        indexer.add_document("lost", 0).unwrap();
        fs::remove_dir_all(&index_dir).unwrap();

        assert!(indexer.commit().is_err());
        assert_eq!(indexer.state(), IndexerState::Merging);
        let err = indexer.add_document("again", 1).unwrap_err();
        assert!(matches!(err, RoaringishError::InvalidOperation(_)));
        assert!(matches!(
            indexer.commit(),
            Err(RoaringishError::InvalidOperation(_))
        ));
    }
}
