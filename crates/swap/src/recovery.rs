// Chunk: docs/chunks/swap_recovery - Reading and replaying swap journals

//! Reading sidecars back after a crash.
//!
//! Frames are trusted up to the first one that is incomplete, fails its
//! checksum, or does not decode. Everything from that point on is the torn
//! tail.

use std::fs::{self, OpenOptions};
use std::path::Path;

use kte_buffer::PieceTable;

use crate::error::Result;
use crate::record::{decode_header, read_frame, FrameRead, Record, RecordType, HEADER_LEN};

/// The trusted contents of a swap file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journal {
    /// Seconds since the Unix epoch, from the header.
    pub created_at: u64,
    pub records: Vec<Record>,
    /// Length of the header plus every trusted frame.
    pub valid_len: u64,
    /// True when bytes follow the last trusted frame.
    pub torn_tail: bool,
}

/// Parses a whole swap file image.
///
/// Fails only when the header is missing or invalid.
pub fn parse_journal(bytes: &[u8]) -> Result<Journal> {
    let created_at = decode_header(bytes)?;
    let mut records = Vec::new();
    let mut pos = HEADER_LEN;

    while pos < bytes.len() {
        let (type_byte, payload, len) = match read_frame(&bytes[pos..]) {
            FrameRead::Complete {
                type_byte,
                payload,
                len,
            } => (type_byte, payload, len),
            FrameRead::Incomplete | FrameRead::BadChecksum => break,
        };
        let record = match RecordType::try_from(type_byte)
            .and_then(|kind| Record::decode(kind, payload))
        {
            Ok(record) => record,
            Err(err) => {
                log::warn!("stopping at undecodable frame at offset {}: {}", pos, err);
                break;
            }
        };
        records.push(record);
        pos += len;
    }

    Ok(Journal {
        created_at,
        records,
        valid_len: pos as u64,
        torn_tail: pos < bytes.len(),
    })
}

pub fn read_journal(path: &Path) -> Result<Journal> {
    let bytes = fs::read(path)?;
    parse_journal(&bytes)
}

/// Cuts a torn tail off the swap file at `path`. Returns whether anything
/// was removed.
pub fn truncate_torn_tail(path: &Path) -> Result<bool> {
    let journal = read_journal(path)?;
    if !journal.torn_tail {
        return Ok(false);
    }
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(journal.valid_len)?;
    file.sync_all()?;
    log::debug!(
        "truncated torn tail of {} to {} bytes",
        path.display(),
        journal.valid_len
    );
    Ok(true)
}

/// Applies `records` to `table` in order and returns how many edits were
/// applied. Metadata and checkpoint records are skipped.
///
/// Positions are resolved against the table's current line index, so
/// out-of-range rows and columns clamp the same way interactive edits do.
/// Callers journaling the same buffer should hold a `SuspendGuard` while
/// replaying.
pub fn replay(records: &[Record], table: &mut PieceTable) -> usize {
    let mut applied = 0;
    for record in records {
        match record {
            Record::Insert { row, col, bytes } => {
                let offset = table.line_col_to_byte_offset(*row, *col);
                table.insert(offset, bytes);
            }
            Record::Delete { row, col, len } => {
                let offset = table.line_col_to_byte_offset(*row, *col);
                table.delete(offset, *len);
            }
            Record::Split { row, col } => {
                let offset = table.line_col_to_byte_offset(*row, *col);
                table.insert(offset, b"\n");
            }
            Record::Join { row } => {
                if row + 1 < table.line_count() {
                    let (_, end) = table.get_line_range(*row);
                    table.delete(end - 1, 1);
                }
            }
            Record::Meta(_) | Record::Checkpoint(_) => continue,
        }
        applied += 1;
    }
    applied
}
