/*!
Shared plumbing that turns raw occurrence offsets into display ready match
records. All of the fixed and regex matchers find occurrences as absolute
`(start, end)` offsets into the scanned buffer; the `SnippetBuilder` here
converts them into `MatchSet` records, taking care of:

* locating the enclosing line of each occurrence without rescanning text
  that earlier occurrences already covered (line numbers are accumulated by
  counting terminators over the gap between successive occurrences, so the
  whole conversion is O(buffer));
* merging occurrences that land on the same snippet into a single record
  whose position range grows;
* bounding the line scan to a window of `max_cols` bytes around the
  occurrence so a multi-megabyte line never has to be walked end to end.
*/

use std::cmp;

use crate::bytestr;
use crate::matchset::MatchSet;

/// Incrementally converts ascending occurrence offsets into match records.
///
/// Occurrences must be pushed in ascending start order.
pub struct SnippetBuilder<'b> {
    buf: &'b [u8],
    max_cols: usize,
    line_numbers: bool,
    set: MatchSet,
    /// Line number of the line containing `scanned_to`.
    line_num: u64,
    /// Position up to which line terminators have been counted.
    scanned_to: usize,
    /// Start offset of the most recently pushed occurrence.
    prev_start: usize,
    /// Absolute end of the most recent record's snippet.
    snippet_end: usize,
}

impl<'b> SnippetBuilder<'b> {
    pub fn new(buf: &'b [u8], max_cols: usize, line_numbers: bool) -> SnippetBuilder<'b> {
        SnippetBuilder {
            buf,
            max_cols,
            line_numbers,
            set: MatchSet::new(),
            line_num: 1,
            scanned_to: 0,
            prev_start: 0,
            snippet_end: 0,
        }
    }

    /// Records the occurrence `buf[start..end]`.
    pub fn push(&mut self, start: usize, end: usize) {
        debug_assert!(start >= self.prev_start && start <= self.buf.len());
        if self.line_numbers {
            self.line_num +=
                bytestr::count_byte(&self.buf[self.scanned_to..start], b'\n')
                    as u64;
            self.scanned_to = start;
        }
        // No terminator between the previous occurrence and this one means
        // the two share a line.
        let same_line = !self.set.matches.is_empty()
            && bytestr::index_byte(&self.buf[self.prev_start..start], b'\n')
                .is_none();
        self.prev_start = start;
        if same_line && (self.max_cols == 0 || start < self.snippet_end) {
            self.merge(start, end);
            return;
        }
        // A fresh snippet: bound the backwards terminator search by the
        // column budget (and by the previous occurrence, which is known to
        // be at or before the enclosing line's start when !same_line).
        let lo = if self.max_cols == 0 {
            self.scan_floor()
        } else {
            cmp::max(start.saturating_sub(self.max_cols), self.scan_floor())
        };
        let line_start = match bytestr::last_index_byte(&self.buf[lo..start], b'\n')
        {
            Some(i) => lo + i + 1,
            None => lo,
        };
        let hi = if self.max_cols == 0 {
            self.buf.len()
        } else {
            cmp::min(start.saturating_add(self.max_cols), self.buf.len())
        };
        let line_end = match bytestr::index_byte(&self.buf[start..hi], b'\n') {
            Some(i) => start + i,
            None => hi,
        };
        self.snippet_end = line_end;
        let line_len = line_end - line_start;
        let pos = (
            start - line_start,
            cmp::min(end - line_start, line_len),
        );
        let line_num = if self.line_numbers { self.line_num } else { 0 };
        self.set.push_match(line_num, line_start, line_len, start as u64, &[pos]);
    }

    /// Grows the last record with one more position.
    fn merge(&mut self, start: usize, end: usize) {
        let rec = self.set.matches.last_mut().expect("merge with no record");
        debug_assert!(rec.pos_idx + rec.pos_count == self.set.positions.len());
        let line_len = rec.line_len;
        let s = cmp::min(start - rec.line_start, line_len);
        let e = cmp::min(end - rec.line_start, line_len);
        self.set.positions.push((s, e));
        rec.pos_count += 1;
    }

    /// The lowest offset the backwards line scan ever has to visit. When
    /// the new occurrence sits on a later line, its line start is strictly
    /// after the previous snippet's terminator, so the previous snippet end
    /// is a sound floor.
    fn scan_floor(&self) -> usize {
        if self.set.matches.is_empty() {
            0
        } else {
            self.snippet_end
        }
    }

    pub fn finish(self) -> MatchSet {
        self.set
    }
}

/// Iterates over the `(start, end)` offsets of each line in a buffer. The
/// end offset excludes the terminator; the final line may be unterminated.
pub struct Lines<'b> {
    buf: &'b [u8],
    pos: usize,
}

impl<'b> Lines<'b> {
    pub fn new(buf: &'b [u8]) -> Lines<'b> {
        Lines { buf, pos: 0 }
    }
}

impl<'b> Iterator for Lines<'b> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let start = self.pos;
        match bytestr::index_byte(&self.buf[start..], b'\n') {
            Some(i) => {
                self.pos = start + i + 1;
                Some((start, start + i))
            }
            None => {
                self.pos = self.buf.len();
                Some((start, self.buf.len()))
            }
        }
    }
}
