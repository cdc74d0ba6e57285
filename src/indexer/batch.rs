//! In-memory batches and the temporary files they are flushed to.
//!
//! A batch file holds a `u32` token count, then per token in byte order a
//! length-prefixed token, a `u32` word count and the packed words, and ends
//! with a CRC32 of everything before it.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use rayon::prelude::*;

use crate::common_tokens::CommonTokens;
use crate::error::{Result, RoaringishError};
use crate::packed::{self, RoaringishPacked};
use crate::storage::structured::{StructReader, StructWriter};

/// Name of the temporary file of batch `index`.
pub(crate) fn batch_file_name(index: usize) -> String {
    format!("batch_{index}.bin")
}

/// Posting lists of the documents added since the last flush.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    postings: AHashMap<String, RoaringishPacked>,
    docs: usize,
    last_doc: Option<u32>,
    in_order: bool,
}

impl Batch {
    pub(crate) fn new() -> Self {
        Batch {
            in_order: true,
            ..Default::default()
        }
    }

    pub(crate) fn doc_count(&self) -> usize {
        self.docs
    }

    pub(crate) fn token_count(&self) -> usize {
        self.postings.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Add the tokens of one document, plus the merged units `common` derives
    /// from them.
    pub(crate) fn add_document(&mut self, doc_id: u32, tokens: &[String], common: &CommonTokens) {
        if self.last_doc.is_some_and(|last| doc_id <= last) {
            self.in_order = false;
        }
        self.last_doc = Some(doc_id);
        self.docs += 1;

        let mut positions: AHashMap<&str, Vec<u32>> = AHashMap::new();
        for (position, token) in tokens.iter().enumerate() {
            positions
                .entry(token.as_str())
                .or_default()
                .push(position as u32);
        }
        for (token, list) in positions {
            self.push(token, doc_id, &list);
        }

        let mut merged: AHashMap<String, Vec<u32>> = AHashMap::new();
        for (position, unit) in common.merged_units(tokens) {
            merged.entry(unit).or_default().push(position);
        }
        for (unit, list) in merged {
            self.push(&unit, doc_id, &list);
        }
    }

    fn push(&mut self, token: &str, doc_id: u32, positions: &[u32]) {
        match self.postings.get_mut(token) {
            Some(packed) => packed.push(doc_id, positions),
            None => {
                let mut packed = RoaringishPacked::new();
                packed.push(doc_id, positions);
                self.postings.insert(token.to_owned(), packed);
            }
        }
    }

    /// Write the batch to `path` and leave it empty.
    pub(crate) fn flush_to(&mut self, path: &Path) -> Result<()> {
        let mut entries: Vec<(String, RoaringishPacked)> = self.postings.drain().collect();
        entries.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
        if !self.in_order {
            entries.par_iter_mut().for_each(|(_, packed)| {
                let mut words = packed.as_slice().to_vec();
                packed::normalize(&mut words);
                *packed = RoaringishPacked::from_words(&words);
            });
        }

        let mut writer = StructWriter::new(BufWriter::new(File::create(path)?));
        writer.write_u32(entries.len() as u32)?;
        for (token, packed) in &entries {
            writer.write_string(token)?;
            writer.write_u32(packed.len() as u32)?;
            writer.write_words(packed)?;
        }
        writer.finish_with_checksum()?;

        *self = Batch::new();
        Ok(())
    }
}

/// Sequential reader over one batch file.
pub(crate) struct BatchReader {
    reader: StructReader<BufReader<File>>,
    path: PathBuf,
    index: usize,
    remaining: u32,
}

impl BatchReader {
    pub(crate) fn open(path: &Path, index: usize) -> Result<Self> {
        let mut reader = StructReader::new(BufReader::new(File::open(path)?));
        let remaining = reader.read_u32()?;
        Ok(BatchReader {
            reader,
            path: path.to_path_buf(),
            index,
            remaining,
        })
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Next `(token, words)` entry, `None` once the file is exhausted and
    /// its checksum verified.
    pub(crate) fn next_entry(&mut self) -> Result<Option<(String, Vec<u64>)>> {
        if self.remaining == 0 {
            if !self.reader.verify_checksum()? {
                return Err(RoaringishError::storage(format!(
                    "Checksum mismatch in batch file {}",
                    self.path.display()
                )));
            }
            return Ok(None);
        }
        self.remaining -= 1;

        let token = self.reader.read_string()?;
        let count = self.reader.read_u32()? as usize;
        let words = self.reader.read_words(count)?;
        Ok(Some((token, words)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packed::pack;
    use tempfile::TempDir;

    fn tokens(text: &str) -> Vec<String> {
        text.split(' ').map(str::to_owned).collect()
    }

    fn read_all(path: &Path) -> Vec<(String, Vec<u64>)> {
        let mut reader = BatchReader::open(path, 0).unwrap();
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().unwrap() {
            entries.push(entry);
        }
        entries
    }

    #[test]
    fn test_flush_writes_sorted_tokens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(batch_file_name(0));

        let mut batch = Batch::new();
        batch.add_document(0, &tokens("b a b"), &CommonTokens::new());
        batch.add_document(1, &tokens("a"), &CommonTokens::new());
        assert_eq!(batch.doc_count(), 2);
        assert_eq!(batch.token_count(), 2);

        batch.flush_to(&path).unwrap();
        assert!(batch.is_empty());

        let entries = read_all(&path);
        assert_eq!(
            entries,
            vec![
                ("a".to_owned(), vec![pack(0, 0, 0b010), pack(1, 0, 0b1)]),
                ("b".to_owned(), vec![pack(0, 0, 0b101)]),
            ]
        );
    }

    #[test]
    fn test_out_of_order_documents_are_normalized() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(batch_file_name(1));

        let mut batch = Batch::new();
        batch.add_document(5, &tokens("x"), &CommonTokens::new());
        batch.add_document(2, &tokens("x y"), &CommonTokens::new());
        batch.flush_to(&path).unwrap();

        let entries = read_all(&path);
        assert_eq!(entries[0], ("x".to_owned(), vec![pack(2, 0, 1), pack(5, 0, 1)]));
    }

    #[test]
    fn test_merged_units_are_indexed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(batch_file_name(2));
        let common: CommonTokens = ["the"].into_iter().collect();

        let mut batch = Batch::new();
        batch.add_document(0, &tokens("the cat"), &common);
        batch.flush_to(&path).unwrap();

        let names: Vec<String> = read_all(&path).into_iter().map(|(t, _)| t).collect();
        assert_eq!(names, vec!["cat", "the", "the cat"]);
    }

    #[test]
    fn test_corrupted_batch_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(batch_file_name(3));

        let mut batch = Batch::new();
        batch.add_document(0, &tokens("hello"), &CommonTokens::new());
        batch.flush_to(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last_word_byte = bytes.len() - 5;
        bytes[last_word_byte] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let mut reader = BatchReader::open(&path, 0).unwrap();
        assert!(reader.next_entry().unwrap().is_some());
        assert!(reader.next_entry().is_err());
    }
}
