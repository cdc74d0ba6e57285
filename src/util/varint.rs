//! LEB128 byte-length prefixes for the strings in the index files.
//!
//! Seven payload bits per byte, least significant group first, high bit set
//! on every byte except the last. Token and unit strings are short, so their
//! prefix is almost always a single byte.

use std::io::Read;

use byteorder::ReadBytesExt;

use crate::error::{Result, RoaringishError};

/// Prefix bytes for a string of `value` bytes.
pub fn encode_u32(value: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(5);
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80;
        }

        bytes.push(byte);

        if val == 0 {
            break;
        }
    }

    bytes
}

/// Length at the start of `bytes` and the size of its prefix. Fails when the
/// prefix is cut off or does not fit a `u32`.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut result = 0u32;
    let mut shift = 0;

    for (read, &byte) in bytes.iter().enumerate() {
        if shift >= 32 {
            return Err(RoaringishError::storage("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, read + 1));
        }

        shift += 7;
    }

    Err(RoaringishError::storage("Incomplete VarInt"))
}

/// Pull one length prefix off `reader`.
///
/// The raw prefix bytes come back too, so the caller can fold them into its
/// checksum.
pub fn read_u32<R: Read>(reader: &mut R) -> Result<(u32, Vec<u8>)> {
    let mut bytes = Vec::with_capacity(5);
    loop {
        let byte = reader.read_u8()?;
        bytes.push(byte);
        if byte & 0x80 == 0 {
            break;
        }
        if bytes.len() >= 5 {
            return Err(RoaringishError::storage("VarInt overflow"));
        }
    }
    let (value, _) = decode_u32(&bytes)?;
    Ok((value, bytes))
}
