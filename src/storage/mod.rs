//! On-disk layout of an index directory.
//!
//! Every index lives in its own directory with a fixed set of files. They are
//! written once by the [`Indexer`](crate::indexer::Indexer) and only read
//! afterwards, through read-only memory maps addressed by offset.

pub mod doc_lengths;
pub mod document_store;
pub mod index_stats;
pub mod postings;
pub mod structured;
pub mod token_store;

use std::fs::File;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::error::{Result, RoaringishError};

pub use self::doc_lengths::{DocLengths, DocLengthsWriter};
pub use self::document_store::{DocumentStore, DocumentStoreWriter};
pub use self::index_stats::IndexStats;
pub use self::postings::PostingsFile;
pub use self::structured::{StructReader, StructWriter};
pub use self::token_store::{TokenDirectory, TokenEntry};

pub const DOCUMENTS_FILE: &str = "documents.bin";
pub const DOC_OFFSETS_FILE: &str = "doc_offsets.bin";
pub const TOKEN_MAP_FILE: &str = "token_map.bin";
pub const POSTINGS_FILE: &str = "roaringish_packed.bin";
pub const DOC_LENGTHS_FILE: &str = "doc_lengths.bin";
pub const INDEX_STATS_FILE: &str = "index_stats.json";
pub const COMMON_TOKENS_FILE: &str = "common_tokens.bin";

/// Map a file read-only. Missing and empty files map to `None`.
pub(crate) fn map_file(path: &Path) -> Result<Option<Mmap>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| {
        RoaringishError::storage(format!("Failed to open file {}: {e}", path.display()))
    })?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }

    // SAFETY: index files are immutable once written.
    let mmap = unsafe {
        MmapOptions::new().map(&file).map_err(|e| {
            RoaringishError::storage(format!("Failed to mmap file {}: {e}", path.display()))
        })?
    };
    Ok(Some(mmap))
}
