//! # Roaringish
//!
//! A phrase-first full-text search library built on packed positional
//! posting lists.
//!
//! Each posting word packs a document id, a group of 16 positions and a
//! bitmap of the positions present in that group. Phrase queries intersect
//! these words directly, with a scalar, a galloping or an AVX-512 strategy.
//!
//! ## Features
//!
//! - Batched indexing with an external k-way merge
//! - Memory mapped, read-only index files
//! - Merged units for frequent tokens, chosen per query with a cost model
//! - Boolean queries with `AND`, `OR`, `NOT`, parentheses and `word*`
//! - BM25 ranking with top-k collection

pub mod analysis;
pub mod common_tokens;
pub mod config;
pub mod error;
pub mod indexer;
pub mod intersect;
pub mod packed;
pub mod query;
pub mod searcher;
pub mod stats;
pub mod storage;
pub mod util;

pub mod prelude {
    pub use crate::config::{CommonTokensConfig, IndexerConfig, SearcherConfig};
    pub use crate::error::{Result, RoaringishError};
    pub use crate::indexer::Indexer;
    pub use crate::query::{BooleanQuery, PhraseQuery, Query, SearchHit, TermQuery};
    pub use crate::searcher::Searcher;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
