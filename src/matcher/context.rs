/*!
A wrapper that adds before/after context lines around the matches of any
inner matcher. The buffer is split into lines, the inner matcher's single
line entry point decides which lines match, and the union of the
`[i - before, i + after]` intervals is emitted in ascending order. Gaps
between groups are encoded as separator sentinel records; the text printer
turns them into `--` lines and the JSON printer drops them.
*/

use std::cmp;

use crate::matchset::MatchSet;

use super::snippet::Lines;
use super::{Matcher, MatcherOptions};

pub struct ContextMatcher {
    inner: Box<dyn Matcher>,
    before: usize,
    after: usize,
    opts: MatcherOptions,
}

impl ContextMatcher {
    pub fn new(
        inner: Box<dyn Matcher>,
        before: usize,
        after: usize,
    ) -> ContextMatcher {
        let opts = inner.options().clone();
        ContextMatcher { inner, before, after, opts }
    }
}

impl Matcher for ContextMatcher {
    fn find_all(&self, buf: &[u8]) -> MatchSet {
        let lines: Vec<(usize, usize)> = Lines::new(buf).collect();
        let mut hits: Vec<(usize, MatchSet)> = Vec::new();
        for (i, &(s, e)) in lines.iter().enumerate() {
            let line_num = (i + 1) as u64;
            if let Some(set) =
                self.inner.find_line(&buf[s..e], line_num, s as u64)
            {
                hits.push((i, set));
            }
        }
        if hits.is_empty() {
            return MatchSet::new();
        }

        let mut include = vec![false; lines.len()];
        for &(i, _) in &hits {
            let lo = i.saturating_sub(self.before);
            let hi = cmp::min(i + self.after, lines.len() - 1);
            for slot in &mut include[lo..=hi] {
                *slot = true;
            }
        }

        let mut out = MatchSet::new();
        let mut hits = hits.into_iter().peekable();
        let mut prev: Option<usize> = None;
        for (i, &(s, e)) in lines.iter().enumerate() {
            if !include[i] {
                continue;
            }
            if let Some(p) = prev {
                if i > p + 1 {
                    out.push_separator();
                }
            }
            prev = Some(i);
            let line_num = if self.opts.line_numbers { (i + 1) as u64 } else { 0 };
            match hits.peek() {
                Some(&(hit, _)) if hit == i => {
                    let (_, set) = hits.next().unwrap();
                    // Rebase the single line records into this buffer: line
                    // starts become absolute and positions move over into
                    // the outer positions array.
                    for rec in &set.matches {
                        out.push_match(
                            line_num,
                            s + rec.line_start,
                            rec.line_len,
                            rec.byte_offset,
                            set.positions_of(rec),
                        );
                    }
                }
                _ => {
                    let shown = if self.opts.max_cols > 0 {
                        (e - s).min(self.opts.max_cols)
                    } else {
                        e - s
                    };
                    out.push_context(line_num, s, shown, s as u64);
                }
            }
        }
        out
    }

    fn match_exists(&self, buf: &[u8]) -> bool {
        self.inner.match_exists(buf)
    }

    fn count_all(&self, buf: &[u8]) -> usize {
        self.inner.count_all(buf)
    }

    fn find_line(
        &self,
        line: &[u8],
        line_num: u64,
        byte_offset: u64,
    ) -> Option<MatchSet> {
        self.inner.find_line(line, line_num, byte_offset)
    }

    fn options(&self) -> &MatcherOptions {
        &self.opts
    }
}
