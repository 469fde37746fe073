// Chunk: docs/chunks/optimized_search - Boyer-Moore bad-character substring search

//! Literal substring search using the Boyer–Moore bad-character heuristic.
//!
//! Expected sublinear on natural text; worst case O(n·m).

/// Substring matcher holding a bad-character table for the most recent
/// pattern.
///
/// The table is rebuilt only when the pattern differs from the previous
/// call, so repeated searches for the same needle (find-next, highlight all)
/// skip the setup cost. One instance must not be shared between threads
/// without external locking; distinct instances are independent.
#[derive(Debug, Clone)]
pub struct OptimizedSearch {
    /// Rightmost index of each byte value in `last_pattern`, or -1.
    bad_char: [isize; 256],
    last_pattern: Option<Vec<u8>>,
}

impl OptimizedSearch {
    pub fn new() -> Self {
        Self {
            bad_char: [-1; 256],
            last_pattern: None,
        }
    }

    /// Returns the first match of `pattern` in `text` starting at or after
    /// `start`.
    ///
    /// An empty pattern matches at `start` when `start <= text.len()`.
    pub fn find_first(&mut self, text: &[u8], pattern: &[u8], start: usize) -> Option<usize> {
        let n = text.len();
        let m = pattern.len();
        if m == 0 {
            return (start <= n).then_some(start);
        }
        if m > n || start >= n {
            return None;
        }
        self.build_bad_char(pattern);

        let mut s = start;
        while s <= n - m {
            match self.mismatch_at(text, pattern, s) {
                None => return Some(s),
                Some(j) => s += self.shift(text[s + j], j),
            }
        }
        None
    }

    /// Returns the start offsets of all non-overlapping matches of `pattern`
    /// in `text` at or after `start`, in ascending order.
    ///
    /// An empty pattern yields no matches.
    pub fn find_all(&mut self, text: &[u8], pattern: &[u8], start: usize) -> Vec<usize> {
        let mut matches = Vec::new();
        let n = text.len();
        let m = pattern.len();
        if m == 0 || m > n || start >= n {
            return matches;
        }
        self.build_bad_char(pattern);

        let mut s = start;
        while s <= n - m {
            match self.mismatch_at(text, pattern, s) {
                None => {
                    matches.push(s);
                    s += m;
                }
                Some(j) => s += self.shift(text[s + j], j),
            }
        }
        matches
    }

    fn build_bad_char(&mut self, pattern: &[u8]) {
        if self.last_pattern.as_deref() == Some(pattern) {
            return;
        }
        self.bad_char = [-1; 256];
        for (i, &byte) in pattern.iter().enumerate() {
            self.bad_char[byte as usize] = i as isize;
        }
        self.last_pattern = Some(pattern.to_vec());
    }

    /// Compares right to left at shift `s`. Returns the pattern index of the
    /// rightmost mismatch, or `None` on a full match.
    fn mismatch_at(&self, text: &[u8], pattern: &[u8], s: usize) -> Option<usize> {
        let mut j = pattern.len();
        while j > 0 && pattern[j - 1] == text[s + j - 1] {
            j -= 1;
        }
        j.checked_sub(1)
    }

    fn shift(&self, bad_byte: u8, mismatch: usize) -> usize {
        let shift = mismatch as isize - self.bad_char[bad_byte as usize];
        shift.max(1) as usize
    }
}

impl Default for OptimizedSearch {
    fn default() -> Self {
        Self::new()
    }
}
