// Chunk: docs/chunks/piece_table_lines - Lazily rebuilt line index for the piece table

//! Line index for tracking line boundaries in a byte sequence.
//!
//! Maintains an array of line start offsets for O(1) line count and O(log n)
//! offset-to-line lookup. The piece table owns one of these and rebuilds it
//! lazily after mutations rather than patching it incrementally.

/// Tracks line boundaries in a byte sequence.
///
/// The line index maintains a list of byte offsets where each line starts.
/// `line_starts[0] == 0` always; every other entry is the offset immediately
/// after a `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new line index with a single empty line.
    pub fn new() -> Self {
        Self {
            line_starts: vec![0],
        }
    }

    /// Rebuilds the line index from the given content, supplied as a sequence
    /// of byte chunks whose concatenation is the logical text.
    ///
    /// This is O(n) in the content length.
    pub fn rebuild<'a, I>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        self.line_starts.clear();
        self.line_starts.push(0);

        let mut base = 0;
        for chunk in chunks {
            for (i, &byte) in chunk.iter().enumerate() {
                if byte == b'\n' {
                    self.line_starts.push(base + i + 1);
                }
            }
            base += chunk.len();
        }
    }

    /// Returns the number of lines.
    ///
    /// Always at least 1 (even for empty content). Content ending in `\n`
    /// has a trailing empty line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the byte offset where the given line starts.
    ///
    /// Returns None if the line index is out of bounds.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Returns the half-open byte range `[start, end)` of a line, including
    /// its trailing newline if it has one. The last line ends at `total_len`.
    pub fn line_range(&self, line: usize, total_len: usize) -> Option<(usize, usize)> {
        let start = self.line_start(line)?;
        let end = self.line_starts.get(line + 1).copied().unwrap_or(total_len);
        Some((start, end))
    }

    /// Returns the byte offset of the end of the given line, excluding the
    /// newline.
    ///
    /// For all lines except the last, this points to the newline byte.
    /// For the last line, this equals `total_len`.
    pub fn line_end(&self, line: usize, total_len: usize) -> Option<usize> {
        if line >= self.line_count() {
            return None;
        }

        if line + 1 < self.line_count() {
            Some(self.line_starts[line + 1] - 1)
        } else {
            Some(total_len)
        }
    }

    /// Returns the length of the given line (excluding the newline).
    pub fn line_len(&self, line: usize, total_len: usize) -> Option<usize> {
        let start = self.line_start(line)?;
        let end = self.line_end(line, total_len)?;
        Some(end - start)
    }

    /// Returns the line number containing the given byte offset: the largest
    /// line whose start is `<= offset`.
    ///
    /// Uses binary search for O(log n) lookup.
    pub fn line_at_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        }
    }

    #[cfg(test)]
    fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}
