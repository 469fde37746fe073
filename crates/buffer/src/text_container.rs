// Chunk: docs/chunks/text_containers - Contiguous buffer and piece table backing stores

//! The operation surface shared by every text container.
//!
//! Both [`ContiguousBuffer`](crate::ContiguousBuffer) and
//! [`PieceTable`](crate::PieceTable) implement [`TextContainer`], so code
//! that only appends, prepends and reads can be written once and compiled
//! against either backing store.

use std::ops::Deref;

/// An ordered, mutable byte sequence with append/prepend and materialized
/// read access.
///
/// Bytes are opaque octets. The observable sequence is always the
/// concatenation of all prior mutations, and `data_with_nul()` always ends
/// with a single `0` byte at index `len()`.
pub trait TextContainer: Default {
    /// Borrowed view of the container's bytes.
    ///
    /// A plain slice for containers that are always contiguous; a cell guard
    /// for containers that materialize lazily.
    type Bytes<'a>: Deref<Target = [u8]>
    where
        Self: 'a;

    /// Ensures room for at least `capacity` bytes. Never shrinks, never
    /// changes content.
    fn reserve(&mut self, capacity: usize);

    fn append_byte(&mut self, byte: u8);

    /// Appends `bytes`. An empty slice is a no-op.
    fn append(&mut self, bytes: &[u8]);

    fn prepend_byte(&mut self, byte: u8);

    /// Prepends `bytes`. An empty slice is a no-op.
    fn prepend(&mut self, bytes: &[u8]);

    /// Removes all content.
    fn clear(&mut self);

    /// The current content, exactly `len()` bytes.
    fn data(&self) -> Self::Bytes<'_>;

    /// The current content followed by a terminating `0`, `len() + 1` bytes.
    fn data_with_nul(&self) -> Self::Bytes<'_>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the content of another container of the same kind.
    fn append_container(&mut self, other: &Self) {
        let bytes = other.data();
        self.append(&bytes);
    }

    /// Prepends the content of another container of the same kind.
    fn prepend_container(&mut self, other: &Self) {
        let bytes = other.data();
        self.prepend(&bytes);
    }
}
