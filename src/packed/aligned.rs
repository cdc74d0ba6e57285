//! A 64-byte aligned, growable buffer of packed words.
//!
//! Posting lists are read with 512-bit loads, so the backing allocation is
//! always placed on a cache-line boundary. The buffer is the single owner of
//! its allocation; borrowed views are plain slices tied to its lifetime.

use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Alignment of every non-empty allocation, in bytes.
pub const ALIGNMENT: usize = 64;

/// Owning handle to a 64-byte aligned `u64` allocation.
pub struct AlignedBuffer {
    ptr: NonNull<u64>,
    len: usize,
    cap: usize,
}

// SAFETY: the buffer uniquely owns its allocation, like `Vec<u64>`.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Create an empty buffer without allocating.
    pub const fn new() -> Self {
        AlignedBuffer {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
        }
    }

    /// Create an empty buffer able to hold `capacity` words without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self::new();
        if capacity > 0 {
            buffer.reallocate(capacity);
        }
        buffer
    }

    /// Create a buffer holding a copy of `words`.
    pub fn from_slice(words: &[u64]) -> Self {
        let mut buffer = Self::with_capacity(words.len());
        buffer.extend_from_slice(words);
        buffer
    }

    /// Number of words stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of words the buffer can hold before reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Append one word, growing geometrically when full.
    #[inline]
    pub fn push(&mut self, word: u64) {
        if self.len == self.cap {
            self.grow(self.len + 1);
        }
        // SAFETY: len < cap after growing.
        unsafe { self.ptr.as_ptr().add(self.len).write(word) };
        self.len += 1;
    }

    /// Append a slice of words.
    pub fn extend_from_slice(&mut self, words: &[u64]) {
        if words.is_empty() {
            return;
        }
        let required = self
            .len
            .checked_add(words.len())
            .unwrap_or_else(|| panic!("aligned buffer capacity overflow"));
        if required > self.cap {
            self.grow(required);
        }
        // SAFETY: the destination range is inside the allocation and cannot
        // overlap a borrowed input slice, since `self` is mutably borrowed.
        unsafe {
            std::ptr::copy_nonoverlapping(
                words.as_ptr(),
                self.ptr.as_ptr().add(self.len),
                words.len(),
            )
        };
        self.len = required;
    }

    /// Shorten the buffer, keeping the first `len` words.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Keep only the words for which `keep` returns true, preserving order.
    pub fn retain<F: FnMut(u64) -> bool>(&mut self, mut keep: F) {
        let mut write = 0;
        for read in 0..self.len {
            let word = self[read];
            if keep(word) {
                self[write] = word;
                write += 1;
            }
        }
        self.len = write;
    }

    fn grow(&mut self, required: usize) {
        let doubled = self.cap.saturating_mul(2);
        let new_cap = required.max(doubled).max(ALIGNMENT / size_of::<u64>());
        self.reallocate(new_cap);
    }

    fn layout(capacity: usize) -> Layout {
        let size = capacity
            .checked_mul(size_of::<u64>())
            .unwrap_or_else(|| panic!("aligned buffer capacity overflow: {capacity} words"));
        match Layout::from_size_align(size, ALIGNMENT) {
            Ok(layout) => layout,
            Err(_) => panic!("invalid aligned buffer layout for {capacity} words"),
        }
    }

    fn reallocate(&mut self, new_cap: usize) {
        debug_assert!(new_cap >= self.len);
        let new_layout = Self::layout(new_cap);
        // SAFETY: layouts are non-zero sized and the old pointer came from
        // this allocator with `Self::layout(self.cap)`.
        let raw = unsafe {
            if self.cap == 0 {
                alloc::alloc(new_layout)
            } else {
                alloc::realloc(
                    self.ptr.as_ptr() as *mut u8,
                    Self::layout(self.cap),
                    new_layout.size(),
                )
            }
        };
        match NonNull::new(raw as *mut u64) {
            Some(ptr) => self.ptr = ptr,
            None => alloc::handle_alloc_error(new_layout),
        }
        self.cap = new_cap;
    }
}

impl Default for AlignedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        if self.cap > 0 {
            // SAFETY: allocated with exactly this layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, Self::layout(self.cap)) };
        }
    }
}

impl Deref for AlignedBuffer {
    type Target = [u64];

    #[inline]
    fn deref(&self) -> &[u64] {
        // SAFETY: the first `len` words are initialized; the dangling pointer
        // is valid for empty slices.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u64] {
        // SAFETY: see `deref`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Clone for AlignedBuffer {
    fn clone(&self) -> Self {
        Self::from_slice(self)
    }
}

impl PartialEq for AlignedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self[..] == other[..]
    }
}

impl Eq for AlignedBuffer {}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_aligned() {
        let mut buffer = AlignedBuffer::with_capacity(3);
        for i in 0..100 {
            buffer.push(i);
            assert_eq!(buffer.as_ptr() as usize % ALIGNMENT, 0);
        }
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer[99], 99);
    }

    #[test]
    fn test_extend_and_retain() {
        let mut buffer = AlignedBuffer::new();
        buffer.extend_from_slice(&[1, 0, 2, 0, 3]);
        buffer.retain(|w| w != 0);
        assert_eq!(&buffer[..], &[1, 2, 3]);

        buffer.truncate(1);
        assert_eq!(&buffer[..], &[1]);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let original = AlignedBuffer::from_slice(&[7, 8, 9]);
        let mut copy = original.clone();
        copy.push(10);
        assert_eq!(original.len(), 3);
        assert_eq!(copy.len(), 4);
        assert_eq!(copy.as_ptr() as usize % ALIGNMENT, 0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_index_panics() {
        let buffer = AlignedBuffer::from_slice(&[1]);
        let _ = buffer[1];
    }
}
