/*!
The PCRE matcher, a thin façade over the `pcre2` crate for patterns that
need lookaround or backreferences. It obeys the same line based contract as
the regex matcher but never builds a prefilter: a lookaround assertion can
constrain text outside any extracted literal, which would make literal
filtering unsound.

PCRE match calls are fallible (the engine can hit resource limits at match
time); such errors are logged and treated as "no match" so a single
pathological line cannot abort a whole search.
*/

use log::debug;
use pcre2::bytes::{Regex, RegexBuilder};

use crate::bytestr;
use crate::matchset::MatchSet;

use super::snippet::SnippetBuilder;
use super::{Error, Matcher, MatcherOptions};

pub struct PcreMatcher {
    re: Regex,
    opts: MatcherOptions,
}

impl PcreMatcher {
    pub fn new(pattern: &str, opts: MatcherOptions) -> Result<PcreMatcher, Error> {
        let re = RegexBuilder::new()
            .caseless(opts.case_insensitive)
            .multi_line(true)
            .jit_if_available(true)
            .build(pattern)?;
        Ok(PcreMatcher { re, opts })
    }

    fn line_matches(&self, line: &[u8]) -> bool {
        match self.re.is_match(line) {
            Ok(yes) => yes,
            Err(err) => {
                debug!("pcre match error: {}", err);
                false
            }
        }
    }

    fn line_occurrences(&self, line: &[u8]) -> Vec<(usize, usize)> {
        let mut occs = Vec::new();
        for m in self.re.find_iter(line) {
            match m {
                Ok(m) => occs.push((m.start(), m.end())),
                Err(err) => {
                    debug!("pcre match error: {}", err);
                    break;
                }
            }
        }
        occs
    }

    /// Visits the enclosing line of every match, ascending, once per line.
    fn each_matching_line(
        &self,
        buf: &[u8],
        mut on_line: impl FnMut(usize, usize) -> bool,
    ) {
        let mut pos = 0;
        let mut floor = 0;
        while pos <= buf.len() {
            let m = match self.re.find_at(buf, pos) {
                Ok(Some(m)) => m,
                Ok(None) => return,
                Err(err) => {
                    debug!("pcre match error: {}", err);
                    return;
                }
            };
            // An empty match just past a trailing terminator belongs to
            // no line.
            if m.start() >= buf.len() {
                return;
            }
            let ls = match bytestr::last_index_byte(&buf[floor..m.start()], b'\n')
            {
                Some(i) => floor + i + 1,
                None => floor,
            };
            let le = match bytestr::index_byte(&buf[m.start()..], b'\n') {
                Some(i) => m.start() + i,
                None => buf.len(),
            };
            pos = le + 1;
            floor = le + 1;
            if self.line_matches(&buf[ls..le]) && !on_line(ls, le) {
                return;
            }
        }
    }
}

impl Matcher for PcreMatcher {
    fn find_all(&self, buf: &[u8]) -> MatchSet {
        if self.opts.invert {
            return super::invert_find_all(buf, &self.opts, |l| {
                self.line_matches(l)
            });
        }
        let mut builder =
            SnippetBuilder::new(buf, self.opts.max_cols, self.opts.line_numbers);
        self.each_matching_line(buf, |ls, le| {
            for (s, e) in self.line_occurrences(&buf[ls..le]) {
                builder.push(ls + s, ls + e);
            }
            true
        });
        builder.finish()
    }

    fn match_exists(&self, buf: &[u8]) -> bool {
        if self.opts.invert {
            return super::exists_line_where(buf, true, |l| self.line_matches(l));
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
            return super::count_lines_where(buf, true, |l| self.line_matches(l));
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
        let occs = self.line_occurrences(line);
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
