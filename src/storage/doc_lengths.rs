//! Document length table: one little-endian `u32` token count per docId.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use crate::error::Result;
use crate::storage::map_file;
use crate::storage::structured::StructWriter;

/// Collects lengths in memory and writes the table at once.
#[derive(Debug, Default)]
pub struct DocLengthsWriter {
    lengths: Vec<u32>,
}

impl DocLengthsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, doc_id: u32, length: u32) {
        let index = doc_id as usize;
        if index >= self.lengths.len() {
            self.lengths.resize(index + 1, 0);
        }
        self.lengths[index] = length;
    }

    /// Length recorded for `doc_id`, 0 if none was set.
    pub fn get(&self, doc_id: u32) -> u32 {
        self.lengths.get(doc_id as usize).copied().unwrap_or(0)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut writer = StructWriter::new(BufWriter::new(File::create(path)?));
        for &length in &self.lengths {
            writer.write_u32(length)?;
        }
        writer.finish()?;
        Ok(())
    }
}

/// Read-only view of `doc_lengths.bin`.
#[derive(Debug)]
pub struct DocLengths {
    map: Option<Mmap>,
}

impl DocLengths {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(DocLengths {
            map: map_file(path)?,
        })
    }

    /// Number of documents covered by the table.
    pub fn len(&self) -> usize {
        self.map.as_ref().map_or(0, |m| m.len() / size_of::<u32>())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Token count of `doc_id`, 0 when outside the table.
    pub fn get(&self, doc_id: u32) -> u32 {
        let Some(map) = self.map.as_ref() else {
            return 0;
        };
        let offset = doc_id as usize * size_of::<u32>();
        match map.get(offset..offset + size_of::<u32>()) {
            Some(bytes) => LittleEndian::read_u32(bytes),
            None => 0,
        }
    }
}
