// Chunk: docs/chunks/swap_journal - Crash-recovery journal for buffer edits

//! Swap file wire format.
//!
//! A sidecar starts with a 64-byte header:
//!
//! ```text
//! [magic "KTE_SWP\0": 8][version u32 LE: 4][created_at u64 LE: 8][zero: 44]
//! ```
//!
//! followed by frames:
//!
//! ```text
//! [type: u8][payload_len: u24 BE][payload][crc32 LE over type+len+payload]
//! ```
//!
//! Integers inside payloads are LEB128 varints.

use crate::error::{Result, SwapError};

pub const MAGIC: [u8; 8] = *b"KTE_SWP\0";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: usize = 64;
/// Type byte plus the 24-bit payload length.
pub const FRAME_HEAD_LEN: usize = 4;
pub const CRC_LEN: usize = 4;
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

const MAX_VARINT_LEN: usize = 10;

/// The one-byte tag at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    Insert = 1,
    Delete = 2,
    Split = 3,
    Join = 4,
    Meta = 0xF0,
    Checkpoint = 0xFE,
}

impl RecordType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RecordType {
    type Error = SwapError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(RecordType::Insert),
            2 => Ok(RecordType::Delete),
            3 => Ok(RecordType::Split),
            4 => Ok(RecordType::Join),
            0xF0 => Ok(RecordType::Meta),
            0xFE => Ok(RecordType::Checkpoint),
            other => Err(SwapError::UnknownRecordType(other)),
        }
    }
}

/// One journaled edit, addressed by (row, col) in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Insert { row: usize, col: usize, bytes: Vec<u8> },
    Delete { row: usize, col: usize, len: usize },
    /// A newline inserted at (row, col).
    Split { row: usize, col: usize },
    /// The newline ending `row` removed.
    Join { row: usize },
    Meta(Vec<u8>),
    Checkpoint(Vec<u8>),
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Insert { .. } => RecordType::Insert,
            Record::Delete { .. } => RecordType::Delete,
            Record::Split { .. } => RecordType::Split,
            Record::Join { .. } => RecordType::Join,
            Record::Meta(_) => RecordType::Meta,
            Record::Checkpoint(_) => RecordType::Checkpoint,
        }
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Record::Insert { row, col, bytes } => {
                put_varint(&mut out, *row as u64);
                put_varint(&mut out, *col as u64);
                put_varint(&mut out, bytes.len() as u64);
                out.extend_from_slice(bytes);
            }
            Record::Delete { row, col, len } => {
                put_varint(&mut out, *row as u64);
                put_varint(&mut out, *col as u64);
                put_varint(&mut out, *len as u64);
            }
            Record::Split { row, col } => {
                put_varint(&mut out, *row as u64);
                put_varint(&mut out, *col as u64);
            }
            Record::Join { row } => put_varint(&mut out, *row as u64),
            Record::Meta(bytes) | Record::Checkpoint(bytes) => out.extend_from_slice(bytes),
        }
        out
    }

    /// Parses a payload of the given type. The payload must be consumed
    /// exactly.
    pub fn decode(kind: RecordType, payload: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader {
            kind,
            rest: payload,
        };
        let record = match kind {
            RecordType::Insert => {
                let row = reader.usize()?;
                let col = reader.usize()?;
                let len = reader.usize()?;
                let bytes = reader.bytes(len)?.to_vec();
                Record::Insert { row, col, bytes }
            }
            RecordType::Delete => Record::Delete {
                row: reader.usize()?,
                col: reader.usize()?,
                len: reader.usize()?,
            },
            RecordType::Split => Record::Split {
                row: reader.usize()?,
                col: reader.usize()?,
            },
            RecordType::Join => Record::Join {
                row: reader.usize()?,
            },
            RecordType::Meta => Record::Meta(reader.rest_bytes().to_vec()),
            RecordType::Checkpoint => Record::Checkpoint(reader.rest_bytes().to_vec()),
        };
        reader.finish()?;
        Ok(record)
    }

    /// Encodes the complete frame: head, payload and CRC.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        encode_frame(self.record_type(), &self.encode_payload())
    }
}

struct PayloadReader<'a> {
    kind: RecordType,
    rest: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    fn malformed(&self, reason: &'static str) -> SwapError {
        SwapError::MalformedPayload {
            kind: self.kind,
            reason,
        }
    }

    fn usize(&mut self) -> Result<usize> {
        let value = get_varint(&mut self.rest).ok_or_else(|| self.malformed("bad varint"))?;
        usize::try_from(value).map_err(|_| self.malformed("value out of range"))
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.rest.len() {
            return Err(self.malformed("text shorter than its length"));
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Ok(head)
    }

    fn rest_bytes(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.rest)
    }

    fn finish(self) -> Result<()> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(self.malformed("trailing bytes"))
        }
    }
}

// ==================== Integers ====================

/// Appends `value` as a little-endian base-128 varint.
pub fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Reads a varint from the front of `input`, advancing it.
///
/// Returns `None` when the input ends mid-varint or the encoding does not
/// fit in 64 bits; `input` is left unchanged in that case.
pub fn get_varint(input: &mut &[u8]) -> Option<u64> {
    let mut value = 0u64;
    for (i, &byte) in input.iter().enumerate().take(MAX_VARINT_LEN) {
        let bits = u64::from(byte & 0x7F);
        let shift = 7 * i as u32;
        if shift == 63 && bits > 1 {
            return None;
        }
        value |= bits << shift;
        if byte & 0x80 == 0 {
            *input = &input[i + 1..];
            return Some(value);
        }
    }
    None
}

/// Appends the low 24 bits of `value`, most significant byte first.
pub fn put_u24(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes()[1..]);
}

pub fn get_u24(bytes: [u8; 3]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}

// ==================== Header ====================

pub fn encode_header(created_at: u64) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..8].copy_from_slice(&MAGIC);
    header[8..12].copy_from_slice(&VERSION.to_le_bytes());
    header[12..20].copy_from_slice(&created_at.to_le_bytes());
    header
}

/// Validates a header and returns its creation timestamp.
pub fn decode_header(bytes: &[u8]) -> Result<u64> {
    if bytes.len() < HEADER_LEN {
        return Err(SwapError::TruncatedHeader(bytes.len()));
    }
    if bytes[..8] != MAGIC {
        return Err(SwapError::BadMagic);
    }
    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != VERSION {
        return Err(SwapError::UnsupportedVersion(version));
    }
    let mut created_at = [0u8; 8];
    created_at.copy_from_slice(&bytes[12..20]);
    Ok(u64::from_le_bytes(created_at))
}

// ==================== Frames ====================

/// IEEE CRC32 over the frame head followed by the payload.
pub fn frame_crc(head: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(head);
    hasher.update(payload);
    hasher.finalize()
}

pub fn encode_frame(kind: RecordType, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(SwapError::PayloadTooLarge(payload.len()));
    }
    let mut frame = Vec::with_capacity(FRAME_HEAD_LEN + payload.len() + CRC_LEN);
    frame.push(kind.as_u8());
    put_u24(&mut frame, payload.len() as u32);
    frame.extend_from_slice(payload);
    let crc = frame_crc(&frame[..FRAME_HEAD_LEN], payload);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// Outcome of reading one frame from the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRead<'a> {
    /// A frame whose checksum matches. `len` counts head, payload and CRC.
    Complete {
        type_byte: u8,
        payload: &'a [u8],
        len: usize,
    },
    /// The slice ends before the frame does.
    Incomplete,
    /// The frame is whole but its checksum does not match.
    BadChecksum,
}

pub fn read_frame(input: &[u8]) -> FrameRead<'_> {
    if input.len() < FRAME_HEAD_LEN {
        return FrameRead::Incomplete;
    }
    let payload_len = get_u24([input[1], input[2], input[3]]) as usize;
    let len = FRAME_HEAD_LEN + payload_len + CRC_LEN;
    if input.len() < len {
        return FrameRead::Incomplete;
    }
    let payload = &input[FRAME_HEAD_LEN..FRAME_HEAD_LEN + payload_len];
    let stored = u32::from_le_bytes([
        input[len - 4],
        input[len - 3],
        input[len - 2],
        input[len - 1],
    ]);
    if frame_crc(&input[..FRAME_HEAD_LEN], payload) != stored {
        return FrameRead::BadChecksum;
    }
    FrameRead::Complete {
        type_byte: input[0],
        payload,
        len,
    }
}
