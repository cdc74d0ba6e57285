//! Bit-packed positional postings.
//!
//! Every posting is a 64-bit word laid out as `[docId:32][group:16][bitmap:16]`.
//! A group covers 16 consecutive token positions and bit `b` of the bitmap is
//! set when position `group * 16 + b` occurs in the document. Words of one
//! posting list are sorted by `(docId, group)` with at most one word per key.

pub mod aligned;

use std::fmt;
use std::ops::Deref;

use byteorder::{ByteOrder, LittleEndian};

pub use self::aligned::{ALIGNMENT, AlignedBuffer};

/// Largest position that still fits the 16-bit group field.
pub const MAX_VALUE: u32 = 16 * u16::MAX as u32;

/// Amount added to a packed word to move it to the next group.
pub const ADD_ONE_GROUP: u64 = u16::MAX as u64 + 1;

/// Group index of a token position.
#[inline(always)]
pub const fn group(position: u32) -> u16 {
    (position / 16) as u16
}

/// Bit index of a token position inside its group.
#[inline(always)]
pub const fn value(position: u32) -> u16 {
    (position % 16) as u16
}

#[inline(always)]
pub const fn pack_doc_id(doc_id: u32) -> u64 {
    (doc_id as u64) << 32
}

#[inline(always)]
pub const fn pack_group(group: u16) -> u64 {
    (group as u64) << 16
}

#[inline(always)]
pub const fn pack_value(value: u16) -> u64 {
    1 << value
}

/// Pack a document id, a group and a full bitmap into one word.
#[inline(always)]
pub const fn pack(doc_id: u32, group: u16, values: u16) -> u64 {
    pack_doc_id(doc_id) | pack_group(group) | values as u64
}

/// Drop the bitmap, keeping the `(docId, group)` key.
#[inline(always)]
pub const fn clear_values(packed: u64) -> u64 {
    packed & !0xFFFF
}

/// Drop group and bitmap, keeping only the document id.
#[inline(always)]
pub const fn clear_group_values(packed: u64) -> u64 {
    packed & !0xFFFF_FFFF
}

#[inline(always)]
pub const fn unpack_doc_id(packed: u64) -> u32 {
    (packed >> 32) as u32
}

#[inline(always)]
pub const fn unpack_group(packed: u64) -> u16 {
    (packed >> 16) as u16
}

#[inline(always)]
pub const fn unpack_values(packed: u64) -> u16 {
    packed as u16
}

/// An owned posting list backed by an aligned buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RoaringishPacked {
    words: AlignedBuffer,
}

/// A non-owning view over packed words.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BorrowRoaringishPacked<'a> {
    words: &'a [u64],
}

impl RoaringishPacked {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RoaringishPacked {
            words: AlignedBuffer::with_capacity(capacity),
        }
    }

    /// Copy already packed words into a new aligned list.
    pub fn from_words(words: &[u64]) -> Self {
        RoaringishPacked {
            words: AlignedBuffer::from_slice(words),
        }
    }

    /// Decode little-endian packed words. Trailing bytes that do not form a
    /// whole word are ignored.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let count = bytes.len() / size_of::<u64>();
        let mut words = AlignedBuffer::with_capacity(count);
        for chunk in bytes[..count * size_of::<u64>()].chunks_exact(size_of::<u64>()) {
            words.push(LittleEndian::read_u64(chunk));
        }
        RoaringishPacked { words }
    }

    pub(crate) fn from_buffer(words: AlignedBuffer) -> Self {
        RoaringishPacked { words }
    }

    /// Append the positions of one document.
    ///
    /// The first position always opens a new word; later positions are OR-ed
    /// into the trailing word when they share its group. Positions must be
    /// non-decreasing and pushed one document at a time.
    pub fn push(&mut self, doc_id: u32, positions: &[u32]) {
        let Some((&first, rest)) = positions.split_first() else {
            return;
        };
        debug_assert!(first < MAX_VALUE, "position {first} exceeds MAX_VALUE");

        let doc_id = pack_doc_id(doc_id);
        self.words
            .push(doc_id | pack_group(group(first)) | pack_value(value(first)));

        for &position in rest {
            debug_assert!(position < MAX_VALUE, "position {position} exceeds MAX_VALUE");
            let key = doc_id | pack_group(group(position));
            let bit = pack_value(value(position));
            let last = self.words.len() - 1;
            if clear_values(self.words[last]) == key {
                self.words[last] |= bit;
            } else {
                self.words.push(key | bit);
            }
        }
    }

    #[inline]
    pub(crate) fn push_word(&mut self, word: u64) {
        self.words.push(word);
    }

    pub(crate) fn extend_from_slice(&mut self, words: &[u64]) {
        self.words.extend_from_slice(words);
    }

    /// Remove words whose bitmap is empty.
    pub(crate) fn retain_non_empty(&mut self) {
        self.words.retain(|w| unpack_values(w) != 0);
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.words
    }

    pub fn as_borrow(&self) -> BorrowRoaringishPacked<'_> {
        BorrowRoaringishPacked { words: &self.words }
    }

    pub fn get_doc_ids(&self) -> Vec<u32> {
        get_doc_ids(&self.words)
    }

    pub fn get_doc_ids_and_freqs(&self) -> Vec<(u32, u32)> {
        get_doc_ids_and_freqs(&self.words)
    }

    /// Size of the list in bytes as stored on disk.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * size_of::<u64>()
    }
}

impl Deref for RoaringishPacked {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.words
    }
}

impl<'a> BorrowRoaringishPacked<'a> {
    pub fn new(words: &'a [u64]) -> Self {
        BorrowRoaringishPacked { words }
    }

    pub fn get_doc_ids(&self) -> Vec<u32> {
        get_doc_ids(self.words)
    }

    pub fn get_doc_ids_and_freqs(&self) -> Vec<(u32, u32)> {
        get_doc_ids_and_freqs(self.words)
    }

    pub fn to_packed(&self) -> RoaringishPacked {
        RoaringishPacked::from_words(self.words)
    }
}

impl Deref for BorrowRoaringishPacked<'_> {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        self.words
    }
}

impl<'a> From<&'a RoaringishPacked> for BorrowRoaringishPacked<'a> {
    fn from(packed: &'a RoaringishPacked) -> Self {
        packed.as_borrow()
    }
}

/// Distinct document ids in ascending order.
pub fn get_doc_ids(words: &[u64]) -> Vec<u32> {
    let mut doc_ids: Vec<u32> = Vec::new();
    for &word in words {
        let doc_id = unpack_doc_id(word);
        if doc_ids.last() != Some(&doc_id) {
            doc_ids.push(doc_id);
        }
    }
    doc_ids
}

/// Distinct document ids paired with the number of set position bits.
pub fn get_doc_ids_and_freqs(words: &[u64]) -> Vec<(u32, u32)> {
    let mut result: Vec<(u32, u32)> = Vec::new();
    for &word in words {
        let doc_id = unpack_doc_id(word);
        let freq = unpack_values(word).count_ones();
        match result.last_mut() {
            Some((last, total)) if *last == doc_id => *total += freq,
            _ => result.push((doc_id, freq)),
        }
    }
    result
}

/// Number of distinct document ids in a sorted word list.
pub fn count_doc_ids(words: &[u64]) -> usize {
    let mut count = 0;
    let mut last = None;
    for &word in words {
        let doc_id = unpack_doc_id(word);
        if last != Some(doc_id) {
            count += 1;
            last = Some(doc_id);
        }
    }
    count
}

/// Whether keys are strictly ascending, i.e. the list is a valid posting list.
pub fn is_normalized(words: &[u64]) -> bool {
    words
        .windows(2)
        .all(|pair| clear_values(pair[0]) < clear_values(pair[1]))
}

/// Sort words by key and OR together words sharing a key.
pub fn normalize(words: &mut Vec<u64>) {
    if is_normalized(words) {
        return;
    }
    words.sort_unstable_by_key(|&w| clear_values(w));
    let mut write = 0;
    for read in 0..words.len() {
        let word = words[read];
        if write > 0 && clear_values(words[write - 1]) == clear_values(word) {
            words[write - 1] |= word;
        } else {
            words[write] = word;
            write += 1;
        }
    }
    words.truncate(write);
}

struct PackedWords<'a>(&'a [u64]);

impl fmt::Debug for PackedWords<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|&w| {
                format!(
                    "({}, {}, {:016b})",
                    unpack_doc_id(w),
                    unpack_group(w),
                    unpack_values(w)
                )
            }))
            .finish()
    }
}

impl fmt::Debug for RoaringishPacked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        PackedWords(&self.words).fmt(f)
    }
}

impl fmt::Debug for BorrowRoaringishPacked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        PackedWords(self.words).fmt(f)
    }
}
