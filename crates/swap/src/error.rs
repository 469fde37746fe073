// Chunk: docs/chunks/swap_journal - Crash-recovery journal for buffer edits

use thiserror::Error;

use crate::record::RecordType;

/// Errors from opening, decoding or recovering a swap file.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("swap file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a kte swap file")]
    BadMagic,

    #[error("unsupported swap file version {0}")]
    UnsupportedVersion(u32),

    #[error("swap file header truncated ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("unknown record type 0x{0:02x}")]
    UnknownRecordType(u8),

    #[error("malformed {kind:?} payload: {reason}")]
    MalformedPayload {
        kind: RecordType,
        reason: &'static str,
    },

    #[error("record payload of {0} bytes exceeds the 24-bit frame limit")]
    PayloadTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, SwapError>;
