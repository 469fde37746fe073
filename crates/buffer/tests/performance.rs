// Chunk: docs/chunks/text_containers - Contiguous buffer and piece table backing stores

//! Performance sanity checks for the containers.
//!
//! These tests verify that basic operations complete within generous time bounds.
//! They are not formal benchmarks but guard against accidental quadratic behavior.

use kte_buffer::{ContiguousBuffer, OptimizedSearch, PieceTable};
use std::time::{Duration, Instant};

#[test]
fn append_100k_bytes_contiguous() {
    let mut buf = ContiguousBuffer::new();
    let start = Instant::now();

    for _ in 0..100_000 {
        buf.append_byte(b'x');
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(200),
        "Appending 100K bytes took {:?}, expected < 200ms",
        elapsed
    );
    assert_eq!(buf.len(), 100_000);
}

#[test]
fn append_100k_bytes_piece_table() {
    let mut table = PieceTable::new();
    let start = Instant::now();

    for _ in 0..100_000 {
        table.append_byte(b'x');
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(500),
        "Appending 100K bytes took {:?}, expected < 500ms",
        elapsed
    );
    assert_eq!(table.len(), 100_000);
    // Consecutive appends extend one piece.
    assert_eq!(table.piece_count(), 1);
}

#[test]
fn typing_in_the_middle_stays_compact() {
    let mut table = PieceTable::from_bytes(&vec![b'a'; 64 * 1024]);
    let mut cursor = 32 * 1024;
    let start = Instant::now();

    for i in 0..10_000 {
        table.insert(cursor, &[b'0' + (i % 10) as u8]);
        cursor += 1;
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(500),
        "Typing 10K bytes mid-document took {:?}, expected < 500ms",
        elapsed
    );
    assert_eq!(table.len(), 64 * 1024 + 10_000);
    // original-left, typed run, original-right
    assert_eq!(table.piece_count(), 3);
}

#[test]
fn line_access_after_edits() {
    let content: String = (0..1000)
        .map(|i| format!("Line number {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    let mut table = PieceTable::from_bytes(content.as_bytes());
    table.insert(0, b"header\n");

    let start = Instant::now();
    for _ in 0..100 {
        for line in 0..table.line_count() {
            let _ = table.get_line_range(line);
        }
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(200),
        "Accessing {} lines 100 times took {:?}, expected < 200ms",
        table.line_count(),
        elapsed
    );
    assert_eq!(table.line_count(), 1001);
}

#[test]
fn delete_everything_byte_by_byte() {
    let mut table = PieceTable::new();
    for _ in 0..10_000 {
        table.append_byte(b'x');
    }

    let start = Instant::now();
    while !table.is_empty() {
        table.delete(table.len() - 1, 1);
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(200),
        "Deleting 10K bytes took {:?}, expected < 200ms",
        elapsed
    );
    assert_eq!(table.piece_count(), 0);
}

#[test]
fn search_large_text() {
    let mut text = vec![b'.'; 1 << 20];
    text.extend_from_slice(b"needle");
    let mut search = OptimizedSearch::new();

    let start = Instant::now();
    for _ in 0..10 {
        assert_eq!(search.find_first(&text, b"needle", 0), Some(1 << 20));
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(500),
        "Searching 1MiB ten times took {:?}, expected < 500ms",
        elapsed
    );
}
