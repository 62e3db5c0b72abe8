/*!
A matcher for a single fixed string. The whole buffer is scanned with the
SIMD substring primitives and the resulting offsets are converted into line
records by the shared snippet machinery. Because the needle may not contain
the line terminator, an occurrence can never straddle two lines and the
whole-buffer scan is equivalent to a line by line search.
*/

use crate::bytestr;
use crate::matchset::MatchSet;

use super::snippet::SnippetBuilder;
use super::{Error, Matcher, MatcherOptions};

pub struct FixedOne {
    needle: Vec<u8>,
    opts: MatcherOptions,
}

impl FixedOne {
    pub fn new(pattern: &str, opts: MatcherOptions) -> Result<FixedOne, Error> {
        if pattern.as_bytes().contains(&b'\n') {
            return Err(Error::LiteralTerminator);
        }
        let mut needle = pattern.as_bytes().to_vec();
        if opts.case_insensitive {
            needle.make_ascii_lowercase();
        }
        Ok(FixedOne { needle, opts })
    }

    fn occurrences(&self, buf: &[u8]) -> Vec<usize> {
        if self.opts.case_insensitive {
            bytestr::index_all_ci(buf, &self.needle)
        } else {
            bytestr::index_all(buf, &self.needle)
        }
    }

    fn contains(&self, hay: &[u8]) -> bool {
        if self.opts.case_insensitive {
            bytestr::index_ci(hay, &self.needle).is_some()
        } else {
            bytestr::index(hay, &self.needle).is_some()
        }
    }
}

impl Matcher for FixedOne {
    fn find_all(&self, buf: &[u8]) -> MatchSet {
        if self.opts.invert {
            return super::invert_find_all(buf, &self.opts, |l| self.contains(l));
        }
        let mut builder =
            SnippetBuilder::new(buf, self.opts.max_cols, self.opts.line_numbers);
        for off in self.occurrences(buf) {
            builder.push(off, off + self.needle.len());
        }
        builder.finish()
    }

    fn match_exists(&self, buf: &[u8]) -> bool {
        if self.opts.invert {
            super::exists_line_where(buf, true, |l| self.contains(l))
        } else {
            self.contains(buf)
        }
    }

    fn count_all(&self, buf: &[u8]) -> usize {
        if self.opts.invert {
            return super::count_lines_where(buf, true, |l| self.contains(l));
        }
        // Count distinct lines, not occurrences: skip every occurrence that
        // falls before the end of the last counted line.
        let mut count = 0;
        let mut line_end = 0;
        for off in self.occurrences(buf) {
            if off < line_end {
                continue;
            }
            count += 1;
            line_end = match bytestr::index_byte(&buf[off..], b'\n') {
                Some(i) => off + i + 1,
                None => buf.len(),
            };
        }
        count
    }

    fn find_line(
        &self,
        line: &[u8],
        line_num: u64,
        byte_offset: u64,
    ) -> Option<MatchSet> {
        let occs: Vec<(usize, usize)> = self
            .occurrences(line)
            .into_iter()
            .map(|s| (s, s + self.needle.len()))
            .collect();
        if self.opts.invert {
            if occs.is_empty() {
                Some(super::inverted_line_set(
                    line,
                    line_num,
                    byte_offset,
                    self.opts.max_cols,
                ))
            } else {
                None
            }
        } else if occs.is_empty() {
            None
        } else {
            Some(super::line_match_set(
                line,
                line_num,
                byte_offset,
                self.opts.max_cols,
                &occs,
            ))
        }
    }

    fn options(&self) -> &MatcherOptions {
        &self.opts
    }
}
