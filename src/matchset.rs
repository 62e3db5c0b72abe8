/*!
The matchset module defines the result of scanning one buffer. Match records
are pointer free: instead of carrying slices of the matched lines they store
`(line_start, line_len)` offsets into the scanned buffer plus an index range
into a shared positions array. The buffer itself is owned by the result that
carries the `MatchSet` (see the reader module for the release handle), so a
`MatchSet` stays cheap to move between the worker and the writer no matter
how many matches it holds.
*/

/// The `line_start` value of a group separator record.
pub const SEPARATOR: usize = usize::MAX;

/// A single matched (or context) line.
///
/// `line_start..line_start + line_len` is the snippet to display, relative
/// to the buffer the `MatchSet` was produced from. `byte_offset` is the
/// absolute offset of the start of the full line, independent of any
/// max-columns windowing. `pos_idx..pos_idx + pos_count` indexes the
/// `MatchSet` positions array; positions are relative to `line_start`.
///
/// A record with `line_num == 0` and `line_start == SEPARATOR` is a group
/// separator: it delimits non-contiguous context groups and carries no text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MatchRecord {
    pub line_num: u64,
    pub line_start: usize,
    pub line_len: usize,
    pub byte_offset: u64,
    pub pos_idx: usize,
    pub pos_count: usize,
    pub is_context: bool,
}

impl MatchRecord {
    /// Returns true if this record is a group separator sentinel.
    #[inline]
    pub fn is_separator(&self) -> bool {
        self.line_num == 0 && self.line_start == SEPARATOR
    }
}

/// All matches found in a single buffer.
#[derive(Clone, Debug, Default)]
pub struct MatchSet {
    pub matches: Vec<MatchRecord>,
    pub positions: Vec<(usize, usize)>,
}

impl MatchSet {
    pub fn new() -> MatchSet {
        MatchSet::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// The highlight ranges of the given record.
    #[inline]
    pub fn positions_of(&self, rec: &MatchRecord) -> &[(usize, usize)] {
        &self.positions[rec.pos_idx..rec.pos_idx + rec.pos_count]
    }

    /// Appends a match record for a line, with `positions` relative to
    /// `line_start`.
    pub fn push_match(
        &mut self,
        line_num: u64,
        line_start: usize,
        line_len: usize,
        byte_offset: u64,
        positions: &[(usize, usize)],
    ) {
        let pos_idx = self.positions.len();
        self.positions.extend_from_slice(positions);
        self.matches.push(MatchRecord {
            line_num,
            line_start,
            line_len,
            byte_offset,
            pos_idx,
            pos_count: positions.len(),
            is_context: false,
        });
    }

    /// Appends a context record. Context lines never carry positions.
    pub fn push_context(
        &mut self,
        line_num: u64,
        line_start: usize,
        line_len: usize,
        byte_offset: u64,
    ) {
        self.matches.push(MatchRecord {
            line_num,
            line_start,
            line_len,
            byte_offset,
            pos_idx: self.positions.len(),
            pos_count: 0,
            is_context: true,
        });
    }

    /// Appends a group separator sentinel.
    pub fn push_separator(&mut self) {
        self.matches.push(MatchRecord {
            line_num: 0,
            line_start: SEPARATOR,
            line_len: 0,
            byte_offset: 0,
            pos_idx: self.positions.len(),
            pos_count: 0,
            is_context: false,
        });
    }

    /// The number of non-context, non-separator records.
    pub fn matched_line_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| !m.is_context && !m.is_separator())
            .count()
    }

    /// Checks the structural invariants of this set against the buffer it
    /// was produced from. Used by the test harnesses of the matchers.
    #[cfg(test)]
    pub fn assert_valid(&self, data: &[u8]) {
        let mut last_line_num = 0u64;
        for rec in &self.matches {
            if rec.is_separator() {
                // Separators reset the monotonicity requirement.
                last_line_num = 0;
                continue;
            }
            assert!(
                rec.line_start + rec.line_len <= data.len(),
                "line slice {}..{} escapes buffer of {} bytes",
                rec.line_start,
                rec.line_start + rec.line_len,
                data.len(),
            );
            if rec.line_num > 0 {
                assert!(
                    rec.line_num >= last_line_num,
                    "line numbers regressed: {} after {}",
                    rec.line_num,
                    last_line_num,
                );
                last_line_num = rec.line_num;
            }
            if rec.is_context {
                assert_eq!(rec.pos_count, 0, "context lines carry positions");
            }
            let mut last_start = 0;
            for &(s, e) in self.positions_of(rec) {
                assert!(s <= e && e <= rec.line_len, "position escapes line");
                assert!(s >= last_start, "positions not ascending");
                last_start = s;
            }
        }
    }
}
