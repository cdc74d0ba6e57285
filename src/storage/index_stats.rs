//! Index-wide statistics persisted as `index_stats.json`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Totals used for BM25 length normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(rename = "TotalDocs")]
    pub total_docs: u32,
    #[serde(rename = "TotalTokens")]
    pub total_tokens: u64,
}

impl IndexStats {
    /// Mean document length in tokens, 0 for an empty index.
    pub fn avg_doc_length(&self) -> f32 {
        if self.total_docs == 0 {
            0.0
        } else {
            self.total_tokens as f32 / self.total_docs as f32
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read the statistics; a missing or unreadable file yields zeros.
    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(IndexStats::default());
        }
        match serde_json::from_reader(BufReader::new(File::open(path)?)) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                warn!("Ignoring damaged index stats {}: {e}", path.display());
                Ok(IndexStats::default())
            }
        }
    }
}
