/*!
The regex matcher. Patterns compile to a `regex::bytes::Regex` with
multi-line mode enabled so `^`/`$` anchor at line boundaries. At
construction the pattern's syntax tree is analysed for a required literal
(see the literals module); when one exists, `find_all` and friends run the
SIMD literal scan first and only invoke the regex on lines containing a
candidate. The regex is always the authority: every candidate line is
verified, and in the unfiltered path every whole-buffer match is re-run
against its enclosing line so a match that would span the line terminator
is never reported.
*/

use regex::bytes::{Regex, RegexBuilder};

use crate::bytestr;
use crate::matchset::MatchSet;

use super::literals::{self, LiteralFilter};
use super::snippet::SnippetBuilder;
use super::{Error, Matcher, MatcherOptions};

pub struct RegexMatcher {
    re: Regex,
    prefilter: Option<LiteralFilter>,
    opts: MatcherOptions,
}

impl RegexMatcher {
    pub fn new(pattern: &str, opts: MatcherOptions) -> Result<RegexMatcher, Error> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(opts.case_insensitive)
            .multi_line(true)
            .build()?;
        // Inverted mode visits every line anyway, so a filter buys nothing.
        let prefilter = if opts.invert {
            None
        } else {
            literals::required_literal(pattern, opts.case_insensitive)
        };
        Ok(RegexMatcher { re, prefilter, opts })
    }

    #[cfg(test)]
    pub fn without_prefilter(mut self) -> RegexMatcher {
        self.prefilter = None;
        self
    }

    #[cfg(test)]
    pub fn has_prefilter(&self) -> bool {
        self.prefilter.is_some()
    }

    /// Calls `on_line` for the enclosing line of every regex match in the
    /// buffer, in ascending order and once per line. Returns early when the
    /// callback asks to stop.
    fn each_matching_line(
        &self,
        buf: &[u8],
        mut on_line: impl FnMut(usize, usize) -> bool,
    ) {
        if let Some(ref pre) = self.prefilter {
            let candidates = if pre.case_insensitive {
                bytestr::index_all_ci(buf, &pre.needle)
            } else {
                bytestr::index_all(buf, &pre.needle)
            };
            let mut line_end = 0;
            for off in candidates {
                // Skip candidates on a line that has been handled already.
                if off < line_end {
                    continue;
                }
                let (ls, le) = enclosing_line(buf, off, line_end);
                line_end = le + 1;
                if self.re.is_match(&buf[ls..le]) && !on_line(ls, le) {
                    return;
                }
            }
        } else {
            let mut pos = 0;
            let mut floor = 0;
            while pos <= buf.len() {
                let m = match self.re.find_at(buf, pos) {
                    None => return,
                    Some(m) => m,
                };
                // An empty match just past a trailing terminator belongs
                // to no line.
                if m.start() >= buf.len() {
                    return;
                }
                let (ls, le) = enclosing_line(buf, m.start(), floor);
                pos = le + 1;
                floor = le + 1;
                // The verification also rejects matches that crossed the
                // line terminator.
                if self.re.is_match(&buf[ls..le]) && !on_line(ls, le) {
                    return;
                }
            }
        }
    }
}

impl Matcher for RegexMatcher {
    fn find_all(&self, buf: &[u8]) -> MatchSet {
        if self.opts.invert {
            return super::invert_find_all(buf, &self.opts, |l| {
                self.re.is_match(l)
            });
        }
        let mut builder =
            SnippetBuilder::new(buf, self.opts.max_cols, self.opts.line_numbers);
        self.each_matching_line(buf, |ls, le| {
            for m in self.re.find_iter(&buf[ls..le]) {
                builder.push(ls + m.start(), ls + m.end());
            }
            true
        });
        builder.finish()
    }

    fn match_exists(&self, buf: &[u8]) -> bool {
        if self.opts.invert {
            return super::exists_line_where(buf, true, |l| self.re.is_match(l));
        }
        let mut found = false;
        self.each_matching_line(buf, |_, _| {
            found = true;
            false
        });
        found
    }

    fn count_all(&self, buf: &[u8]) -> usize {
        if self.opts.invert {
            return super::count_lines_where(buf, true, |l| self.re.is_match(l));
        }
        let mut count = 0;
        self.each_matching_line(buf, |_, _| {
            count += 1;
            true
        });
        count
    }

    fn find_line(
        &self,
        line: &[u8],
        line_num: u64,
        byte_offset: u64,
    ) -> Option<MatchSet> {
        let occs: Vec<(usize, usize)> = self
            .re
            .find_iter(line)
            .map(|m| (m.start(), m.end()))
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

/// The line bounds of the line containing `pos`, never searching backwards
/// past `floor` (which callers maintain as the end of the previous line
/// visited, keeping the whole scan linear).
fn enclosing_line(buf: &[u8], pos: usize, floor: usize) -> (usize, usize) {
    let ls = match bytestr::last_index_byte(&buf[floor..pos], b'\n') {
        Some(i) => floor + i + 1,
        None => floor,
    };
    let le = match bytestr::index_byte(&buf[pos..], b'\n') {
        Some(i) => pos + i,
        None => buf.len(),
    };
    (ls, le)
}
