// Chunk: docs/chunks/text_containers - Contiguous buffer and piece table backing stores
// Chunk: docs/chunks/piece_table_lines - Lazily rebuilt line index for the piece table

//! Piece table text container.
//!
//! The logical text is an ordered list of pieces, each naming a byte range in
//! one of two stores: the original store (immutable) or the add store
//! (append-only). Edits never move existing bytes; they append to the add
//! store and rewrite the piece list.
//!
//! # Derived state
//!
//! Reads go through caches that are rebuilt from `&self`:
//! - a materialized flat image of the text (rebuilt when `dirty`)
//! - a line index of line start offsets (rebuilt when stale)
//! - the last `get_range` result and the last `find` result, keyed by a
//!   version counter that every mutation bumps
//!
//! The caches use `Cell`/`RefCell`, so a `PieceTable` is `Send` but not
//! `Sync`: readers and writers must be serialized by the owner.
//!
//! # Fragmentation
//!
//! Adjacent pieces that name contiguous bytes in the same store are always
//! coalesced. When the piece count exceeds `piece_limit`, one run of small
//! pieces per mutation is copied into a fresh add-store range and replaced
//! by a single piece.

use std::cell::{Cell, Ref, RefCell};

use crate::line_index::LineIndex;
use crate::text_container::TextContainer;
use crate::types::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Original,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    source: Source,
    start: usize,
    len: usize,
}

impl Piece {
    fn add(start: usize, len: usize) -> Self {
        Self {
            source: Source::Add,
            start,
            len,
        }
    }

    fn end(&self) -> usize {
        self.start + self.len
    }

    /// True when `next` names the bytes immediately following `self` in the
    /// same store.
    fn continues_into(&self, next: &Piece) -> bool {
        self.source == next.source && self.end() == next.start
    }
}

/// Knobs for the anti-fragmentation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidationParams {
    /// Consolidate only while the piece count exceeds this.
    pub piece_limit: usize,
    /// Pieces up to this many bytes are candidates.
    pub small_piece_threshold: usize,
    /// Upper bound on the bytes copied by one consolidation run.
    pub max_consolidation_bytes: usize,
}

impl Default for ConsolidationParams {
    fn default() -> Self {
        Self {
            piece_limit: 256,
            small_piece_threshold: 32,
            max_consolidation_bytes: 4096,
        }
    }
}

#[derive(Debug)]
struct RangeCache {
    version: u64,
    offset: usize,
    len: usize,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct FindCache {
    version: u64,
    needle: Vec<u8>,
    start: usize,
    result: Option<usize>,
}

/// A piece table over an append-only add store.
#[derive(Debug)]
pub struct PieceTable {
    /// Immutable original content. Empty when the table is used as a builder.
    original: Vec<u8>,
    add: Vec<u8>,
    pieces: Vec<Piece>,
    total_size: usize,
    /// Bumped by every mutation; keys the range and find caches.
    version: u64,
    params: ConsolidationParams,

    /// Flat image of the text followed by one `0` byte, valid when `!dirty`.
    materialized: RefCell<Vec<u8>>,
    dirty: Cell<bool>,
    line_index: RefCell<LineIndex>,
    line_index_stale: Cell<bool>,
    range_cache: RefCell<Option<RangeCache>>,
    find_cache: RefCell<Option<FindCache>>,

    /// Mutation counter for sampling debug assertions (debug builds only).
    #[cfg(debug_assertions)]
    debug_mutation_count: u64,
}

impl PieceTable {
    /// Creates a new empty piece table with default consolidation params.
    pub fn new() -> Self {
        Self::with_params(0, ConsolidationParams::default())
    }

    /// Creates an empty piece table with `capacity` bytes reserved in the
    /// add store and the materialized image.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_params(capacity, ConsolidationParams::default())
    }

    pub fn with_params(capacity: usize, params: ConsolidationParams) -> Self {
        Self {
            original: Vec::new(),
            add: Vec::with_capacity(capacity),
            pieces: Vec::new(),
            total_size: 0,
            version: 0,
            params,
            materialized: RefCell::new(Vec::with_capacity(capacity + 1)),
            dirty: Cell::new(true),
            line_index: RefCell::new(LineIndex::new()),
            line_index_stale: Cell::new(true),
            range_cache: RefCell::new(None),
            find_cache: RefCell::new(None),
            #[cfg(debug_assertions)]
            debug_mutation_count: 0,
        }
    }

    /// Creates a piece table whose original store holds `content`.
    pub fn from_bytes(content: &[u8]) -> Self {
        let mut table = Self::new();
        table.original = content.to_vec();
        if !content.is_empty() {
            table.pieces.push(Piece {
                source: Source::Original,
                start: 0,
                len: content.len(),
            });
            table.total_size = content.len();
        }
        table
    }

    // ==================== Accessors ====================

    pub fn len(&self) -> usize {
        self.total_size
    }

    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    /// Capacity of the materialized image, in content bytes.
    pub fn capacity(&self) -> usize {
        self.materialized.borrow().capacity().saturating_sub(1)
    }

    /// Monotonic content version; changes whenever the content may have.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of pieces currently describing the text.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn consolidation_params(&self) -> ConsolidationParams {
        self.params
    }

    pub fn set_consolidation_params(
        &mut self,
        piece_limit: usize,
        small_piece_threshold: usize,
        max_consolidation_bytes: usize,
    ) {
        self.params = ConsolidationParams {
            piece_limit,
            small_piece_threshold,
            max_consolidation_bytes,
        };
    }

    /// Returns the text as one contiguous slice, materializing it first if
    /// needed.
    pub fn data(&self) -> Ref<'_, [u8]> {
        self.materialize();
        Ref::map(self.materialized.borrow(), |image| &image[..image.len() - 1])
    }

    /// Like [`data`](Self::data) but includes the terminating `0` byte.
    pub fn data_with_nul(&self) -> Ref<'_, [u8]> {
        self.materialize();
        Ref::map(self.materialized.borrow(), |image| &image[..])
    }

    /// Returns a copy of up to `len` bytes starting at `offset`, clamped to
    /// the end of the text.
    pub fn get_range(&self, offset: usize, len: usize) -> Vec<u8> {
        let offset = offset.min(self.total_size);
        let len = len.min(self.total_size - offset);

        if let Some(cache) = self.range_cache.borrow().as_ref() {
            if cache.version == self.version && cache.offset == offset && cache.len == len {
                return cache.bytes.clone();
            }
        }

        let bytes = if !self.dirty.get() {
            self.materialized.borrow()[offset..offset + len].to_vec()
        } else {
            self.collect_range(offset, len)
        };

        *self.range_cache.borrow_mut() = Some(RangeCache {
            version: self.version,
            offset,
            len,
            bytes: bytes.clone(),
        });
        bytes
    }

    /// Returns the offset of the first occurrence of `needle` at or after
    /// `start`.
    ///
    /// An empty needle matches at `start` when `start <= len()`.
    pub fn find(&self, needle: &[u8], start: usize) -> Option<usize> {
        if needle.is_empty() {
            return (start <= self.total_size).then_some(start);
        }

        if let Some(cache) = self.find_cache.borrow().as_ref() {
            if cache.version == self.version && cache.start == start && cache.needle == needle {
                return cache.result;
            }
        }

        let result = {
            let text = self.data();
            text.get(start..).and_then(|tail| {
                tail.windows(needle.len())
                    .position(|window| window == needle)
                    .map(|pos| pos + start)
            })
        };

        *self.find_cache.borrow_mut() = Some(FindCache {
            version: self.version,
            needle: needle.to_vec(),
            start,
            result,
        });
        result
    }

    // ==================== Lines ====================

    /// Number of lines; a trailing `\n` opens a final empty line.
    pub fn line_count(&self) -> usize {
        self.line_index().line_count()
    }

    /// Byte range `[start, end)` of `row` including its newline, if any.
    ///
    /// Rows past the end yield the empty range at `len()`.
    pub fn get_line_range(&self, row: usize) -> (usize, usize) {
        self.line_index()
            .line_range(row, self.total_size)
            .unwrap_or((self.total_size, self.total_size))
    }

    /// Returns the bytes of `row` without its trailing newline.
    pub fn get_line(&self, row: usize) -> Vec<u8> {
        let (start, end) = self.get_line_range(row);
        let mut line = self.get_range(start, end - start);
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        line
    }

    /// Maps a byte offset (clamped to `len()`) to its line and column.
    pub fn byte_offset_to_line_col(&self, offset: usize) -> Position {
        let offset = offset.min(self.total_size);
        let index = self.line_index();
        let line = index.line_at_offset(offset);
        let start = index.line_start(line).unwrap_or(0);
        Position::new(line, offset - start)
    }

    /// Maps a line and column to a byte offset. Columns past the end of the
    /// line clamp to the line end (before its newline); rows past the end
    /// clamp to `len()`.
    pub fn line_col_to_byte_offset(&self, row: usize, col: usize) -> usize {
        let index = self.line_index();
        match (index.line_start(row), index.line_len(row, self.total_size)) {
            (Some(start), Some(len)) => start + col.min(len),
            _ => self.total_size,
        }
    }

    fn line_index(&self) -> Ref<'_, LineIndex> {
        if self.line_index_stale.get() {
            self.line_index
                .borrow_mut()
                .rebuild(self.pieces.iter().map(|piece| self.piece_bytes(piece)));
            self.line_index_stale.set(false);
        }
        self.line_index.borrow()
    }

    // ==================== Mutations ====================

    pub fn reserve(&mut self, capacity: usize) {
        self.add.reserve(capacity.saturating_sub(self.add.len()));
        let image = self.materialized.get_mut();
        image.reserve((capacity + 1).saturating_sub(image.len()));
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.append(&[byte]);
    }

    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let start = self.push_add(bytes);
        match self.pieces.last_mut() {
            Some(last) if last.source == Source::Add && last.end() == start => {
                last.len += bytes.len();
            }
            _ => self.pieces.push(Piece::add(start, bytes.len())),
        }
        self.total_size += bytes.len();
        self.after_mutation();
    }

    pub fn prepend_byte(&mut self, byte: u8) {
        self.prepend(&[byte]);
    }

    pub fn prepend(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let start = self.push_add(bytes);
        let piece = Piece::add(start, bytes.len());
        match self.pieces.first_mut() {
            Some(first) if piece.continues_into(first) => {
                first.start = start;
                first.len += bytes.len();
            }
            _ => self.pieces.insert(0, piece),
        }
        self.total_size += bytes.len();
        self.after_mutation();
    }

    /// Inserts `bytes` at `offset`, clamped to `len()`.
    pub fn insert(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let offset = offset.min(self.total_size);
        let add_start = self.push_add(bytes);
        let piece = Piece::add(add_start, bytes.len());
        self.total_size += bytes.len();

        let (idx, inner) = self.locate(offset);
        let focus = if idx == self.pieces.len() {
            self.pieces.push(piece);
            idx
        } else {
            let target = self.pieces[idx];
            let mut replacement = Vec::with_capacity(3);
            if inner > 0 {
                replacement.push(Piece { len: inner, ..target });
            }
            replacement.push(piece);
            if inner < target.len {
                replacement.push(Piece {
                    start: target.start + inner,
                    len: target.len - inner,
                    ..target
                });
            }
            self.pieces.splice(idx..=idx, replacement);
            idx + usize::from(inner > 0)
        };

        self.coalesce_neighbors(focus);
        self.after_mutation();
    }

    /// Deletes up to `len` bytes starting at `offset`; the range is clamped
    /// to the text.
    pub fn delete(&mut self, offset: usize, len: usize) {
        if offset >= self.total_size {
            return;
        }
        let len = len.min(self.total_size - offset);
        if len == 0 {
            return;
        }

        let (site, mut inner) = self.locate(offset);
        let mut idx = site;
        let mut remaining = len;
        while remaining > 0 && idx < self.pieces.len() {
            let piece = self.pieces[idx];
            let take = (piece.len - inner).min(remaining);
            let left = (inner > 0).then_some(Piece { len: inner, ..piece });
            let right = (inner + take < piece.len).then_some(Piece {
                start: piece.start + inner + take,
                len: piece.len - inner - take,
                ..piece
            });
            match (left, right) {
                (Some(left), Some(right)) => {
                    self.pieces[idx] = left;
                    self.pieces.insert(idx + 1, right);
                    idx += 2;
                }
                (Some(left), None) => {
                    self.pieces[idx] = left;
                    idx += 1;
                }
                (None, Some(right)) => {
                    self.pieces[idx] = right;
                    idx += 1;
                }
                (None, None) => {
                    self.pieces.remove(idx);
                }
            }
            remaining -= take;
            inner = 0;
        }

        self.total_size -= len;
        self.coalesce_neighbors(site);
        self.after_mutation();
    }

    /// Drops all content. The add store is discarded; capacity of the
    /// materialized image is kept.
    pub fn clear(&mut self) {
        self.pieces.clear();
        self.add.clear();
        self.original.clear();
        self.total_size = 0;
        self.touch();
    }

    // ==================== Internals ====================

    /// Appends to the add store and returns where the bytes start.
    fn push_add(&mut self, bytes: &[u8]) -> usize {
        let start = self.add.len();
        self.add.extend_from_slice(bytes);
        start
    }

    fn piece_bytes(&self, piece: &Piece) -> &[u8] {
        let store = match piece.source {
            Source::Original => &self.original,
            Source::Add => &self.add,
        };
        &store[piece.start..piece.end()]
    }

    /// Finds the piece containing `offset` and the offset within it.
    /// `offset == len()` maps to `(pieces.len(), 0)`.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut remaining = offset;
        for (idx, piece) in self.pieces.iter().enumerate() {
            if remaining < piece.len {
                return (idx, remaining);
            }
            remaining -= piece.len;
        }
        (self.pieces.len(), 0)
    }

    /// Walks pieces from `offset`, copying `len` bytes.
    fn collect_range(&self, offset: usize, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        let (idx, mut inner) = self.locate(offset);
        for piece in &self.pieces[idx..] {
            if out.len() == len {
                break;
            }
            let bytes = &self.piece_bytes(piece)[inner..];
            let take = bytes.len().min(len - out.len());
            out.extend_from_slice(&bytes[..take]);
            inner = 0;
        }
        out
    }

    /// Merges pieces around `index` while they name contiguous bytes.
    fn coalesce_neighbors(&mut self, index: usize) {
        if self.pieces.is_empty() {
            return;
        }
        let mut index = index.min(self.pieces.len() - 1);

        while index > 0 && self.pieces[index - 1].continues_into(&self.pieces[index]) {
            self.pieces[index - 1].len += self.pieces[index].len;
            self.pieces.remove(index);
            index -= 1;
        }
        while index + 1 < self.pieces.len()
            && self.pieces[index].continues_into(&self.pieces[index + 1])
        {
            self.pieces[index].len += self.pieces[index + 1].len;
            self.pieces.remove(index + 1);
        }
    }

    /// Consolidates the first qualifying run of small pieces when the piece
    /// count is over the limit. At most one run per call.
    fn maybe_consolidate(&mut self) {
        if self.pieces.len() <= self.params.piece_limit {
            return;
        }
        let threshold = self.params.small_piece_threshold;
        let budget = self.params.max_consolidation_bytes;

        let mut i = 0;
        while i < self.pieces.len() {
            if self.pieces[i].len > threshold {
                i += 1;
                continue;
            }
            let mut j = i;
            let mut bytes = 0;
            while j < self.pieces.len()
                && self.pieces[j].len <= threshold
                && bytes + self.pieces[j].len <= budget
            {
                bytes += self.pieces[j].len;
                j += 1;
            }
            if j - i >= 2 {
                self.consolidate_range(i, j);
                return;
            }
            i = j.max(i + 1);
        }
    }

    /// Copies the bytes of `pieces[start..end]` to the end of the add store
    /// and replaces them with one piece.
    fn consolidate_range(&mut self, start: usize, end: usize) {
        let add_start = self.add.len();
        for k in start..end {
            let piece = self.pieces[k];
            match piece.source {
                Source::Add => self.add.extend_from_within(piece.start..piece.end()),
                Source::Original => self
                    .add
                    .extend_from_slice(&self.original[piece.start..piece.end()]),
            }
        }
        let merged = Piece::add(add_start, self.add.len() - add_start);
        self.pieces.splice(start..end, std::iter::once(merged));
        self.coalesce_neighbors(start);
    }

    fn after_mutation(&mut self) {
        self.maybe_consolidate();
        self.touch();
        self.assert_pieces_consistent();
    }

    /// Invalidates every derived cache and bumps the version.
    fn touch(&mut self) {
        self.version += 1;
        self.dirty.set(true);
        self.line_index_stale.set(true);
        *self.range_cache.get_mut() = None;
        *self.find_cache.get_mut() = None;
    }

    fn materialize(&self) {
        if !self.dirty.get() {
            return;
        }
        let mut image = self.materialized.borrow_mut();
        image.clear();
        image.reserve(self.total_size + 1);
        for piece in &self.pieces {
            image.extend_from_slice(self.piece_bytes(piece));
        }
        image.push(0);
        self.dirty.set(false);
    }

    /// Debug assertion: the piece list covers exactly `total_size` bytes,
    /// holds no empty pieces, and has no coalescable neighbors.
    ///
    /// Checks every 64th mutation so tight edit loops stay fast.
    #[cfg(debug_assertions)]
    fn assert_pieces_consistent(&mut self) {
        self.debug_mutation_count += 1;
        if self.debug_mutation_count % 64 != 0 {
            return;
        }
        let sum: usize = self.pieces.iter().map(|piece| piece.len).sum();
        assert_eq!(sum, self.total_size, "piece lengths drifted from total_size");
        assert!(
            self.pieces.iter().all(|piece| piece.len > 0),
            "empty piece in sequence: {:?}",
            self.pieces
        );
        assert!(
            !self
                .pieces
                .windows(2)
                .any(|pair| pair[0].continues_into(&pair[1])),
            "uncoalesced neighbors after {} mutations: {:?}",
            self.debug_mutation_count,
            self.pieces
        );
    }

    #[cfg(not(debug_assertions))]
    fn assert_pieces_consistent(&mut self) {}
}

impl Default for PieceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PieceTable {
    /// Copies stores and pieces; the clone starts with cold caches.
    fn clone(&self) -> Self {
        Self {
            original: self.original.clone(),
            add: self.add.clone(),
            pieces: self.pieces.clone(),
            total_size: self.total_size,
            version: self.version,
            params: self.params,
            materialized: RefCell::new(Vec::new()),
            dirty: Cell::new(true),
            line_index: RefCell::new(LineIndex::new()),
            line_index_stale: Cell::new(true),
            range_cache: RefCell::new(None),
            find_cache: RefCell::new(None),
            #[cfg(debug_assertions)]
            debug_mutation_count: 0,
        }
    }
}

impl TextContainer for PieceTable {
    type Bytes<'a> = Ref<'a, [u8]>;

    fn reserve(&mut self, capacity: usize) {
        PieceTable::reserve(self, capacity)
    }

    fn append_byte(&mut self, byte: u8) {
        PieceTable::append_byte(self, byte)
    }

    fn append(&mut self, bytes: &[u8]) {
        PieceTable::append(self, bytes)
    }

    fn prepend_byte(&mut self, byte: u8) {
        PieceTable::prepend_byte(self, byte)
    }

    fn prepend(&mut self, bytes: &[u8]) {
        PieceTable::prepend(self, bytes)
    }

    fn clear(&mut self) {
        PieceTable::clear(self)
    }

    fn data(&self) -> Ref<'_, [u8]> {
        PieceTable::data(self)
    }

    fn data_with_nul(&self) -> Ref<'_, [u8]> {
        PieceTable::data_with_nul(self)
    }

    fn len(&self) -> usize {
        self.total_size
    }

    fn capacity(&self) -> usize {
        PieceTable::capacity(self)
    }
}
