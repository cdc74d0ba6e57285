//! Token directory: where each token's posting list lives in the postings file.
//!
//! Layout of `token_map.bin`: an `i32` entry count, then per entry a
//! length-prefixed token, `i64` byte offset, `i64` byte length and `i32`
//! number of distinct documents.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ahash::AHashMap;
use log::warn;

use crate::error::{Result, RoaringishError};
use crate::storage::structured::{StructReader, StructWriter, is_truncated};

/// Location of one posting list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenEntry {
    /// Byte offset into the postings file.
    pub begin: u64,
    /// Length in bytes.
    pub length: u64,
    /// Number of distinct documents containing the token.
    pub doc_count: u32,
}

impl TokenEntry {
    /// Number of packed words in the list.
    pub fn word_count(&self) -> usize {
        (self.length / size_of::<u64>() as u64) as usize
    }
}

/// Token to posting list directory.
#[derive(Debug, Default, Clone)]
pub struct TokenDirectory {
    entries: AHashMap<String, TokenEntry>,
}

impl TokenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: String, entry: TokenEntry) {
        self.entries.insert(token, entry);
    }

    pub fn get(&self, token: &str) -> Option<&TokenEntry> {
        self.entries.get(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All tokens, in no particular order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Write the directory sorted by token.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let count = i32::try_from(self.entries.len())
            .map_err(|_| RoaringishError::storage("Too many tokens for the directory"))?;
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut writer = StructWriter::new(BufWriter::new(File::create(path)?));
        writer.write_i32(count)?;
        for (token, entry) in entries {
            writer.write_string(token)?;
            writer.write_i64(entry.begin as i64)?;
            writer.write_i64(entry.length as i64)?;
            writer.write_i32(entry.doc_count as i32)?;
        }
        writer.finish()?;
        Ok(())
    }

    /// Read a directory. A missing file is an empty directory; a truncated
    /// file yields the entries read before the damage.
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut directory = TokenDirectory::new();
        if !path.exists() {
            return Ok(directory);
        }

        let mut reader = StructReader::new(BufReader::new(File::open(path)?));
        let count = match reader.read_i32() {
            Ok(count) => count.max(0) as usize,
            Err(e) if is_truncated(&e) => return Ok(directory),
            Err(e) => return Err(e),
        };

        for read in 0..count {
            match Self::read_entry(&mut reader) {
                Ok((token, entry)) => directory.insert(token, entry),
                Err(e) if is_truncated(&e) => {
                    warn!(
                        "Token directory {} truncated after {read} of {count} entries",
                        path.display()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(directory)
    }

    fn read_entry(reader: &mut StructReader<BufReader<File>>) -> Result<(String, TokenEntry)> {
        let token = reader.read_string()?;
        let begin = reader.read_i64()?;
        let length = reader.read_i64()?;
        let doc_count = reader.read_i32()?;
        Ok((
            token,
            TokenEntry {
                begin: begin.max(0) as u64,
                length: length.max(0) as u64,
                doc_count: doc_count.max(0) as u32,
            },
        ))
    }
}
