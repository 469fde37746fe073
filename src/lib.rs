// Chunk: docs/chunks/editable_core - Editable-text core workspace

//! kte: the editable-text core of the kte terminal editor.
//!
//! This crate gathers the two halves of the core behind one import:
//!
//! - [`kte_buffer`]: byte-oriented text containers ([`ContiguousBuffer`],
//!   [`PieceTable`]) with a shared [`TextContainer`] surface, plus
//!   [`OptimizedSearch`] for literal substring search.
//! - [`kte_swap`]: the per-buffer swap journal ([`SwapManager`]) and the
//!   recovery reader that replays it.
//!
//! [`AppendBuffer`] is the container the editor builds lines and output
//! with. It is [`ContiguousBuffer`] unless the `piece-table` feature is on.

pub use kte_buffer::{
    ConsolidationParams, ContiguousBuffer, LineIndex, OptimizedSearch, PieceTable, Position,
    TextContainer,
};
pub use kte_swap::{
    BufferId, Journal, Journaled, Record, RecordType, SuspendGuard, SwapConfig, SwapError,
    SwapManager, SwapRecorder,
};

/// Re-exported so callers can name the journal's wire format and recovery
/// helpers without depending on `kte-swap` directly.
pub use kte_swap::{record, recovery};

#[cfg(not(feature = "piece-table"))]
pub type AppendBuffer = ContiguousBuffer;

#[cfg(feature = "piece-table")]
pub type AppendBuffer = PieceTable;
