// Chunk: docs/chunks/editable_core - Editable-text core workspace
//!
//! Smoke tests for the editable-text core.
//!
//! These run the headline scenarios through the `kte` facade so that a
//! broken re-export or a feature-selection mistake shows up here first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kte::record::{read_frame, FrameRead, HEADER_LEN};
use kte::{
    AppendBuffer, BufferId, ContiguousBuffer, Journaled, OptimizedSearch, PieceTable, Position,
    Record, RecordType, SuspendGuard, SwapConfig, SwapManager, SwapRecorder, TextContainer,
};
use tempfile::TempDir;

#[test]
fn test_piece_table_edit_sequence() {
    let mut table = PieceTable::new();
    table.append(b"hello");
    table.prepend(b"<< ");
    table.insert(3, b"--");
    table.delete(3, 2);
    assert_eq!(table.len(), 8);
    assert_eq!(&*table.data(), b"<< hello");
}

#[test]
fn test_piece_table_lines() {
    let table = PieceTable::from_bytes(b"ab\ncd\nef");
    assert_eq!(table.line_count(), 3);
    assert_eq!(table.get_line(1), b"cd");
    assert_eq!(table.byte_offset_to_line_col(4), Position::new(1, 1));
    assert_eq!(table.line_col_to_byte_offset(2, 0), 6);
}

#[test]
fn test_substring_search() {
    let mut search = OptimizedSearch::new();
    assert_eq!(search.find_first(b"abcabcabc", b"bca", 0), Some(1));
    assert_eq!(search.find_all(b"aaaaa", b"aa", 0), vec![0, 2]);
    assert_eq!(search.find_first(b"abcdef", b"", 3), Some(3));
}

#[test]
fn test_contiguous_buffer_both_ends() {
    let mut buf = ContiguousBuffer::new();
    for _ in 0..1000 {
        buf.append_byte(b'x');
    }
    for _ in 0..1000 {
        buf.prepend_byte(b'y');
    }
    assert_eq!(buf.len(), 2000);
    assert!(buf.data()[..1000].iter().all(|&b| b == b'y'));
    assert!(buf.data()[1000..2000].iter().all(|&b| b == b'x'));
    assert_eq!(buf.data_with_nul()[2000], 0);
}

#[test]
fn test_append_buffer_alias_is_a_container() {
    fn build<C: TextContainer>() -> Vec<u8> {
        let mut out = C::default();
        out.append(b"status: ");
        out.append_byte(b'o');
        out.append(b"k");
        out.prepend(b"[");
        let data = out.data();
        data.to_vec()
    }

    assert_eq!(build::<AppendBuffer>(), b"[status: ok");
}

struct Doc {
    id: BufferId,
    path: PathBuf,
}

impl Journaled for Doc {
    fn buffer_id(&self) -> BufferId {
        self.id
    }

    fn filename(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[test]
fn test_swap_journal_frames() {
    let dir = TempDir::new().unwrap();
    let doc = Doc {
        id: BufferId::next(),
        path: dir.path().join("smoke.txt"),
    };
    let manager = SwapManager::with_config(SwapConfig::default()).unwrap();
    for i in 0..5 {
        manager.record_insert(&doc, 0, i, b"x");
    }
    assert!(manager.flush(Duration::from_secs(5)));

    let bytes = fs::read(dir.path().join(".smoke.txt.kte.swp")).unwrap();
    assert_eq!(&bytes[..8], b"KTE_SWP\0");
    let mut pos = HEADER_LEN;
    let mut cols = Vec::new();
    while let FrameRead::Complete {
        type_byte,
        payload,
        len,
    } = read_frame(&bytes[pos..])
    {
        assert_eq!(type_byte, RecordType::Insert.as_u8());
        match Record::decode(RecordType::Insert, payload).unwrap() {
            Record::Insert { col, .. } => cols.push(col),
            other => panic!("unexpected record {:?}", other),
        }
        pos += len;
    }
    assert_eq!(pos, bytes.len());
    assert_eq!(cols, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_suspend_guard_scope() {
    let dir = TempDir::new().unwrap();
    let doc = Doc {
        id: BufferId::next(),
        path: dir.path().join("quiet.txt"),
    };
    let manager = SwapManager::new().unwrap();
    {
        let _guard = SuspendGuard::new(&manager, doc.id);
        manager.record_insert(&doc, 0, 0, b"inside");
    }
    manager.record_insert(&doc, 0, 0, b"outside");
    drop(manager);

    let journal = kte::recovery::read_journal(&dir.path().join(".quiet.txt.kte.swp")).unwrap();
    assert_eq!(
        journal.records,
        vec![Record::Insert {
            row: 0,
            col: 0,
            bytes: b"outside".to_vec()
        }]
    );
}
