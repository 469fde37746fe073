// Chunk: docs/chunks/text_containers - Contiguous buffer and piece table backing stores

//! Contiguous append/prepend buffer.
//!
//! One allocation of `capacity + 1` bytes holds the content followed by a
//! terminating zero. Appends are O(1) amortized with 1.5x geometric growth;
//! prepends shift the existing content right and are O(n).

use crate::text_container::TextContainer;

const MIN_CAPACITY: usize = 8;

/// What `data_with_nul` yields before the first allocation.
const EMPTY_WITH_NUL: &[u8] = &[0];

/// A byte-sequence builder backed by a single contiguous block.
///
/// `Clone` duplicates the block. Moving out with `std::mem::take` leaves an
/// empty, unallocated buffer behind.
#[derive(Debug, Clone, Default)]
pub struct ContiguousBuffer {
    /// `capacity + 1` bytes once allocated, empty before that. Index `size`
    /// always holds the terminator.
    block: Box<[u8]>,
    size: usize,
}

impl ContiguousBuffer {
    /// Creates a new empty buffer without allocating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self::new();
        if capacity > 0 {
            buffer.reserve(capacity);
        }
        buffer
    }

    /// Number of content bytes the current block can hold.
    pub fn capacity(&self) -> usize {
        self.block.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Grows the block to hold exactly `new_capacity` bytes if it is smaller.
    pub fn reserve(&mut self, new_capacity: usize) {
        if new_capacity <= self.capacity() {
            return;
        }
        let mut block = vec![0u8; new_capacity + 1].into_boxed_slice();
        block[..self.size].copy_from_slice(&self.block[..self.size]);
        self.block = block;
        self.set_terminator();
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.ensure_capacity_for(1);
        self.block[self.size] = byte;
        self.size += 1;
        self.set_terminator();
    }

    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.ensure_capacity_for(bytes.len());
        self.block[self.size..self.size + bytes.len()].copy_from_slice(bytes);
        self.size += bytes.len();
        self.set_terminator();
    }

    pub fn prepend_byte(&mut self, byte: u8) {
        self.ensure_capacity_for(1);
        self.block.copy_within(0..self.size, 1);
        self.block[0] = byte;
        self.size += 1;
        self.set_terminator();
    }

    pub fn prepend(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.ensure_capacity_for(bytes.len());
        self.block.copy_within(0..self.size, bytes.len());
        self.block[..bytes.len()].copy_from_slice(bytes);
        self.size += bytes.len();
        self.set_terminator();
    }

    /// Drops the content but keeps the allocation.
    pub fn clear(&mut self) {
        self.size = 0;
        self.set_terminator();
    }

    pub fn data(&self) -> &[u8] {
        &self.block[..self.size]
    }

    pub fn data_with_nul(&self) -> &[u8] {
        if self.block.is_empty() {
            EMPTY_WITH_NUL
        } else {
            &self.block[..=self.size]
        }
    }

    fn ensure_capacity_for(&mut self, delta: usize) {
        if self.capacity() - self.size >= delta {
            return;
        }
        let required = self.size + delta;
        self.reserve(grow_capacity(self.capacity(), required));
    }

    fn set_terminator(&mut self) {
        if let Some(slot) = self.block.get_mut(self.size) {
            *slot = 0;
        }
    }
}

/// Geometric 1.5x growth from at least [`MIN_CAPACITY`] until `required` fits.
fn grow_capacity(current: usize, required: usize) -> usize {
    let mut capacity = current.max(MIN_CAPACITY);
    while capacity < required {
        capacity += capacity >> 1;
    }
    capacity
}

impl TextContainer for ContiguousBuffer {
    type Bytes<'a> = &'a [u8];

    fn reserve(&mut self, capacity: usize) {
        ContiguousBuffer::reserve(self, capacity)
    }

    fn append_byte(&mut self, byte: u8) {
        ContiguousBuffer::append_byte(self, byte)
    }

    fn append(&mut self, bytes: &[u8]) {
        ContiguousBuffer::append(self, bytes)
    }

    fn prepend_byte(&mut self, byte: u8) {
        ContiguousBuffer::prepend_byte(self, byte)
    }

    fn prepend(&mut self, bytes: &[u8]) {
        ContiguousBuffer::prepend(self, bytes)
    }

    fn clear(&mut self) {
        ContiguousBuffer::clear(self)
    }

    fn data(&self) -> &[u8] {
        ContiguousBuffer::data(self)
    }

    fn data_with_nul(&self) -> &[u8] {
        ContiguousBuffer::data_with_nul(self)
    }

    fn len(&self) -> usize {
        self.size
    }

    fn capacity(&self) -> usize {
        ContiguousBuffer::capacity(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_empty() {
        let buf = ContiguousBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 0);
        assert_eq!(buf.data(), b"");
        assert_eq!(buf.data_with_nul(), b"\0");
    }

    #[test]
    fn test_first_growth_uses_minimum_capacity() {
        let mut buf = ContiguousBuffer::new();
        buf.append_byte(b'a');
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn test_growth_is_geometric() {
        let mut buf = ContiguousBuffer::new();
        buf.append(&[b'x'; 8]);
        assert_eq!(buf.capacity(), 8);
        buf.append_byte(b'y');
        assert_eq!(buf.capacity(), 12);
        buf.append(&[b'z'; 10]);
        // 12 -> 18 -> 27
        assert_eq!(buf.capacity(), 27);
        assert_eq!(buf.len(), 19);
    }

    #[test]
    fn test_grow_capacity_from_tiny_reservation() {
        assert_eq!(grow_capacity(1, 2), 8);
        assert_eq!(grow_capacity(0, 9), 12);
        assert_eq!(grow_capacity(100, 101), 150);
    }

    #[test]
    fn test_reserve_never_shrinks() {
        let mut buf = ContiguousBuffer::with_capacity(100);
        buf.append(b"hello");
        buf.reserve(10);
        assert_eq!(buf.capacity(), 100);
        assert_eq!(buf.data(), b"hello");
    }

    #[test]
    fn test_append_and_prepend() {
        let mut buf = ContiguousBuffer::new();
        buf.append(b"world");
        buf.prepend(b"hello ");
        buf.append_byte(b'!');
        buf.prepend_byte(b'>');
        assert_eq!(buf.data(), b">hello world!");
        assert_eq!(buf.data_with_nul(), b">hello world!\0");
    }

    #[test]
    fn test_empty_inputs_are_noops() {
        let mut buf = ContiguousBuffer::new();
        buf.append(b"");
        buf.prepend(b"");
        assert_eq!(buf.capacity(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buf = ContiguousBuffer::new();
        buf.append(b"some content here");
        let capacity = buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), capacity);
        assert_eq!(buf.data_with_nul(), b"\0");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a = ContiguousBuffer::new();
        a.append(b"abc");
        let mut b = a.clone();
        b.append(b"def");
        assert_eq!(a.data(), b"abc");
        assert_eq!(b.data(), b"abcdef");
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut a = ContiguousBuffer::new();
        a.append(b"abc");
        let b = std::mem::take(&mut a);
        assert_eq!(b.data(), b"abc");
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 0);
    }

    #[test]
    fn test_append_container() {
        let mut a = ContiguousBuffer::new();
        a.append(b"foo");
        let mut b = ContiguousBuffer::new();
        b.append(b"bar");
        a.append_container(&b);
        a.prepend_container(&b);
        assert_eq!(a.data(), b"barfoobar");
    }

    #[test]
    fn test_thousand_appends_and_prepends() {
        let mut buf = ContiguousBuffer::new();
        for _ in 0..1000 {
            buf.append_byte(b'x');
        }
        for _ in 0..1000 {
            buf.prepend_byte(b'y');
        }
        assert_eq!(buf.len(), 2000);
        assert!(buf.data()[..1000].iter().all(|&b| b == b'y'));
        assert!(buf.data()[1000..].iter().all(|&b| b == b'x'));
        assert_eq!(buf.data_with_nul()[2000], 0);
    }
}
