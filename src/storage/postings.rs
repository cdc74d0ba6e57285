//! Read access to `roaringish_packed.bin`.

use std::path::Path;

use memmap2::Mmap;

use crate::error::Result;
use crate::packed::RoaringishPacked;
use crate::storage::map_file;
use crate::storage::token_store::TokenEntry;

/// The concatenated posting lists of an index.
#[derive(Debug)]
pub struct PostingsFile {
    map: Option<Mmap>,
}

impl PostingsFile {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(PostingsFile {
            map: map_file(path)?,
        })
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> usize {
        self.map.as_ref().map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the posting list described by `entry` into a fresh aligned list.
    ///
    /// A range reaching past the end of the file is cut at the last whole
    /// word.
    pub fn read(&self, entry: &TokenEntry) -> RoaringishPacked {
        let Some(map) = self.map.as_ref() else {
            return RoaringishPacked::new();
        };
        let begin = (entry.begin as usize).min(map.len());
        let end = begin.saturating_add(entry.length as usize).min(map.len());
        RoaringishPacked::from_le_bytes(&map[begin..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packed::pack;
    use tempfile::TempDir;

    #[test]
    fn test_read_ranges() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roaringish_packed.bin");
        let words = [pack(1, 0, 1), pack(2, 0, 2), pack(3, 0, 4)];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(&path, bytes).unwrap();

        let postings = PostingsFile::open(&path).unwrap();
        assert_eq!(postings.len(), 24);

        let entry = TokenEntry {
            begin: 8,
            length: 16,
            doc_count: 2,
        };
        assert_eq!(postings.read(&entry).as_slice(), &words[1..]);

        let past_end = TokenEntry {
            begin: 16,
            length: 64,
            doc_count: 1,
        };
        assert_eq!(postings.read(&past_end).as_slice(), &words[2..]);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let postings = PostingsFile::open(&temp_dir.path().join("missing.bin")).unwrap();
        assert!(postings.is_empty());
        let entry = TokenEntry {
            begin: 0,
            length: 8,
            doc_count: 1,
        };
        assert!(postings.read(&entry).is_empty());
    }
}
