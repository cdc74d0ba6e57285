//! Record-level I/O shared by every index file.
//!
//! Counts, offsets and lengths are fixed-width little-endian integers.
//! Tokens are a varint byte length followed by UTF-8 bytes. Posting runs are
//! raw packed words. Both sides keep a running CRC32 of everything they have
//! seen so batch files can carry a checksum trailer.

use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;

use crate::error::{Result, RoaringishError};
use crate::util::varint;

/// Writes index records, tracking position and checksum.
pub struct StructWriter<W: Write> {
    writer: W,
    hasher: Hasher,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: Hasher::new(),
            position: 0,
        }
    }

    /// Record counts and per-token document counts.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(value)?;
        self.track(&value.to_le_bytes());
        Ok(())
    }

    /// Batch headers and document lengths.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.track(&value.to_le_bytes());
        Ok(())
    }

    /// Byte offsets and lengths into the postings and document files.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.writer.write_i64::<LittleEndian>(value)?;
        self.track(&value.to_le_bytes());
        Ok(())
    }

    /// Write packed words back to back.
    pub fn write_words(&mut self, words: &[u64]) -> Result<()> {
        let mut bytes = vec![0u8; words.len() * size_of::<u64>()];
        LittleEndian::write_u64_into(words, &mut bytes);
        self.write_raw(&bytes)
    }

    /// A token or merged unit.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let length = u32::try_from(bytes.len())
            .map_err(|_| RoaringishError::storage("String too long to encode"))?;
        let prefix = varint::encode_u32(length);
        self.write_raw(&prefix)?;
        self.write_raw(bytes)
    }

    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.track(value);
        Ok(())
    }

    /// Zero-fill up to the next multiple of `alignment`, so posting runs
    /// start aligned in the mapped file.
    pub fn pad_to(&mut self, alignment: u64) -> Result<()> {
        let rem = self.position % alignment;
        if rem != 0 {
            let padding = vec![0u8; (alignment - rem) as usize];
            self.write_raw(&padding)?;
        }
        Ok(())
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// CRC32 of everything written so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    fn track(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.position += data.len() as u64;
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    /// Append the checksum trailer, flush and return the inner writer.
    pub fn finish_with_checksum(mut self) -> Result<W> {
        let checksum = self.checksum();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        self.finish()
    }
}

/// Reads records written by [`StructWriter`].
pub struct StructReader<R: Read> {
    reader: R,
    hasher: Hasher,
    position: u64,
}

impl<R: Read> StructReader<R> {
    pub fn new(reader: R) -> Self {
        StructReader {
            reader,
            hasher: Hasher::new(),
            position: 0,
        }
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self.reader.read_i32::<LittleEndian>()?;
        self.track(&value.to_le_bytes());
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read_u32::<LittleEndian>()?;
        self.track(&value.to_le_bytes());
        Ok(value)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let value = self.reader.read_i64::<LittleEndian>()?;
        self.track(&value.to_le_bytes());
        Ok(value)
    }

    /// Read `count` packed words.
    pub fn read_words(&mut self, count: usize) -> Result<Vec<u64>> {
        let bytes = self.read_raw(count * size_of::<u64>())?;
        let mut words = vec![0u64; count];
        LittleEndian::read_u64_into(&bytes, &mut words);
        Ok(words)
    }

    /// A token or merged unit. Fails on invalid UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        let (length, prefix) = varint::read_u32(&mut self.reader)?;
        self.track(&prefix);
        let bytes = self.read_raw(length as usize)?;

        String::from_utf8(bytes)
            .map_err(|e| RoaringishError::storage(format!("Invalid UTF-8: {e}")))
    }

    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; length];
        self.reader.read_exact(&mut bytes)?;
        self.track(&bytes);
        Ok(bytes)
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// CRC32 of everything read so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Read the checksum trailer and compare it with the data read so far.
    pub fn verify_checksum(&mut self) -> Result<bool> {
        let expected = self.checksum();
        let stored = self.reader.read_u32::<LittleEndian>()?;
        Ok(stored == expected)
    }

    fn track(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.position += data.len() as u64;
    }
}

/// Whether an error means the input ended in the middle of a record.
pub fn is_truncated(error: &RoaringishError) -> bool {
    matches!(error, RoaringishError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_struct_writer_reader() {
        let mut writer = StructWriter::new(Vec::new());
        writer.write_i32(-7).unwrap();
        writer.write_i64(1 << 40).unwrap();
        writer.write_string("hello world").unwrap();
        writer.write_words(&[1, u64::MAX]).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = StructReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.read_i64().unwrap(), 1 << 40);
        assert_eq!(reader.read_string().unwrap(), "hello world");
        assert_eq!(reader.read_words(2).unwrap(), vec![1, u64::MAX]);
        assert!(is_truncated(&reader.read_i32().unwrap_err()));
    }

    #[test]
    fn test_string_layout() {
        let mut writer = StructWriter::new(Vec::new());
        writer.write_string("ab").unwrap();
        assert_eq!(writer.finish().unwrap(), vec![2, b'a', b'b']);
    }

    #[test]
    fn test_padding() {
        let mut writer = StructWriter::new(Vec::new());
        writer.write_u32(1).unwrap();
        writer.pad_to(64).unwrap();
        assert_eq!(writer.position(), 64);
        writer.pad_to(64).unwrap();
        assert_eq!(writer.position(), 64);
    }

    #[test]
    fn test_checksum_trailer() {
        let mut writer = StructWriter::new(Vec::new());
        writer.write_string("token").unwrap();
        writer.write_i64(42).unwrap();
        let mut bytes = writer.finish_with_checksum().unwrap();

        let mut reader = StructReader::new(Cursor::new(bytes.clone()));
        reader.read_string().unwrap();
        reader.read_i64().unwrap();
        assert!(reader.verify_checksum().unwrap());

        bytes[6] ^= 0xFF;
        let mut reader = StructReader::new(Cursor::new(bytes));
        reader.read_string().unwrap();
        reader.read_i64().unwrap();
        assert!(!reader.verify_checksum().unwrap());
    }
}
