//! Raw document content.
//!
//! `documents.bin` holds the UTF-8 bytes of every document back to back and
//! `doc_offsets.bin` holds a 16-byte `(i64 offset, i64 length)` record per
//! docId.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use crate::error::{Result, RoaringishError};
use crate::storage::map_file;
use crate::storage::structured::StructWriter;

const RECORD_SIZE: usize = 16;

/// Appends documents while an index is being built.
pub struct DocumentStoreWriter {
    data: StructWriter<BufWriter<File>>,
    offsets: Vec<(u64, u64)>,
}

impl DocumentStoreWriter {
    pub fn create(data_path: &Path) -> Result<Self> {
        Ok(DocumentStoreWriter {
            data: StructWriter::new(BufWriter::new(File::create(data_path)?)),
            offsets: Vec::new(),
        })
    }

    pub fn add(&mut self, doc_id: u32, content: &str) -> Result<()> {
        let offset = self.data.position();
        self.data.write_raw(content.as_bytes())?;

        let index = doc_id as usize;
        if index >= self.offsets.len() {
            self.offsets.resize(index + 1, (0, 0));
        }
        self.offsets[index] = (offset, content.len() as u64);
        Ok(())
    }

    /// Flush the content file and write the offset table.
    pub fn finish(self, offsets_path: &Path) -> Result<()> {
        self.data.finish()?;

        let mut writer = StructWriter::new(BufWriter::new(File::create(offsets_path)?));
        for (offset, length) in self.offsets {
            writer.write_i64(offset as i64)?;
            writer.write_i64(length as i64)?;
        }
        writer.finish()?;
        Ok(())
    }
}

/// Read-only document lookup.
#[derive(Debug)]
pub struct DocumentStore {
    data: Option<Mmap>,
    offsets: Option<Mmap>,
}

impl DocumentStore {
    pub fn open(data_path: &Path, offsets_path: &Path) -> Result<Self> {
        Ok(DocumentStore {
            data: map_file(data_path)?,
            offsets: map_file(offsets_path)?,
        })
    }

    /// Content of `doc_id`, `None` when it has no stored content.
    pub fn get(&self, doc_id: u32) -> Result<Option<String>> {
        let (Some(data), Some(offsets)) = (self.data.as_ref(), self.offsets.as_ref()) else {
            return Ok(None);
        };
        let start = doc_id as usize * RECORD_SIZE;
        let Some(record) = offsets.get(start..start + RECORD_SIZE) else {
            return Ok(None);
        };

        let offset = LittleEndian::read_i64(&record[..8]);
        let length = LittleEndian::read_i64(&record[8..]);
        if length <= 0 || offset < 0 {
            return Ok(None);
        }
        let (offset, length) = (offset as usize, length as usize);
        let bytes = data.get(offset..offset + length).ok_or_else(|| {
            RoaringishError::storage(format!("Document {doc_id} points past the end of the store"))
        })?;

        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|e| RoaringishError::storage(format!("Invalid UTF-8 in document {doc_id}: {e}")))
    }
}
