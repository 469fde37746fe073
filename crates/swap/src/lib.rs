// Chunk: docs/chunks/swap_journal - Crash-recovery journal for buffer edits
// Chunk: docs/chunks/swap_recovery - Reading and replaying swap journals

//! kte-swap: crash-recovery journaling for kte buffers.
//!
//! Every edit to a buffer is queued as a small record and appended by a
//! background thread to a sidecar file next to the buffer's file
//! (`/dir/.name.kte.swp`, or `$TMPDIR/kte/` for unnamed buffers). After a
//! crash, [`recovery::read_journal`] returns the records up to the first
//! torn or corrupt frame and [`recovery::replay`] applies them to a
//! [`kte_buffer::PieceTable`].
//!
//! Journaling is best effort: a sidecar that cannot be opened or written is
//! logged and skipped, and editing continues.
//!
//! # Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use std::time::Duration;
//! use kte_swap::{BufferId, Journaled, SuspendGuard, SwapManager, SwapRecorder};
//!
//! struct Doc {
//!     id: BufferId,
//!     path: PathBuf,
//! }
//!
//! impl Journaled for Doc {
//!     fn buffer_id(&self) -> BufferId {
//!         self.id
//!     }
//!     fn filename(&self) -> Option<&Path> {
//!         Some(&self.path)
//!     }
//! }
//!
//! let swap = SwapManager::new()?;
//! let doc = Doc { id: BufferId::next(), path: PathBuf::from("notes.txt") };
//!
//! swap.record_insert(&doc, 0, 0, b"hello");
//! {
//!     let _quiet = SuspendGuard::new(&swap, doc.id);
//!     swap.record_insert(&doc, 0, 5, b" (not journaled)");
//! }
//! swap.flush(Duration::from_secs(1));
//! # Ok::<(), kte_swap::SwapError>(())
//! ```

mod config;
mod error;
mod manager;
pub mod record;
mod recorder;
pub mod recovery;
mod sidecar;

pub use config::SwapConfig;
pub use error::{Result, SwapError};
pub use manager::SwapManager;
pub use record::{Record, RecordType};
pub use recorder::{SuspendGuard, SwapRecorder};
pub use recovery::{parse_journal, read_journal, replay, truncate_torn_tail, Journal};
pub use sidecar::{sidecar_path, BufferId, Journaled};
