// Chunk: docs/chunks/text_containers - Contiguous buffer and piece table backing stores
// Chunk: docs/chunks/optimized_search - Boyer-Moore bad-character substring search

//! kte-buffer: byte-oriented text containers for the kte editor.
//!
//! This crate holds the in-memory representations used for buffer content
//! and the read-side services built on them. Bytes are opaque octets; all
//! offsets, lengths and columns are byte counts.
//!
//! # Overview
//!
//! - [`ContiguousBuffer`]: one growable block, O(1) amortized append, O(n)
//!   prepend.
//! - [`PieceTable`]: an append-only add store plus a piece list, with
//!   arbitrary-offset [`insert`](PieceTable::insert) and
//!   [`delete`](PieceTable::delete), a lazily rebuilt line index, and
//!   memoized range and find results.
//! - [`TextContainer`]: the surface both share, so the outer editor can pick
//!   either at build time.
//! - [`OptimizedSearch`]: Boyer–Moore bad-character substring search.
//!
//! # Example
//!
//! ```
//! use kte_buffer::{PieceTable, Position, TextContainer};
//!
//! let mut table = PieceTable::new();
//! table.append(b"ab\nef");
//! table.insert(3, b"cd\n");
//!
//! assert_eq!(&*table.data(), b"ab\ncd\nef");
//! assert_eq!(table.line_count(), 3);
//! assert_eq!(table.get_line(1), b"cd");
//! assert_eq!(table.byte_offset_to_line_col(4), Position::new(1, 1));
//! assert_eq!(table.line_col_to_byte_offset(2, 0), 6);
//! ```

mod contiguous_buffer;
mod line_index;
mod piece_table;
mod search;
mod text_container;
mod types;

pub use contiguous_buffer::ContiguousBuffer;
pub use line_index::LineIndex;
pub use piece_table::{ConsolidationParams, PieceTable};
pub use search::OptimizedSearch;
pub use text_container::TextContainer;
pub use types::Position;
