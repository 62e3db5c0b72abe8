/*!
A matcher for several fixed strings at once, backed by a hand built
Aho–Corasick automaton. The trie uses sparse 256-wide child tables; failure
links are produced by a breadth first pass that also merges each node's
output set with the outputs of its failure chain, so a single walk over the
buffer reports every pattern ending at every position.

In case-insensitive mode the stored patterns are lowercased and each input
byte is lowercased on entry to the automaton.
*/

use std::collections::VecDeque;

use crate::bytestr;
use crate::matchset::MatchSet;

use super::snippet::SnippetBuilder;
use super::{Error, Matcher, MatcherOptions};

const NONE: u32 = u32::MAX;

pub struct FixedMulti {
    /// Sparse goto table: `trans[state][byte]` is the next state or `NONE`.
    trans: Vec<[u32; 256]>,
    fail: Vec<u32>,
    /// Pattern indexes terminating at each state, failure chain included.
    out: Vec<Vec<u32>>,
    pattern_lens: Vec<usize>,
    opts: MatcherOptions,
}

impl FixedMulti {
    pub fn new(patterns: &[String], opts: MatcherOptions) -> Result<FixedMulti, Error> {
        let mut pats: Vec<Vec<u8>> = Vec::with_capacity(patterns.len());
        for p in patterns {
            if p.as_bytes().contains(&b'\n') {
                return Err(Error::LiteralTerminator);
            }
            if p.is_empty() {
                continue;
            }
            let mut bytes = p.as_bytes().to_vec();
            if opts.case_insensitive {
                bytes.make_ascii_lowercase();
            }
            pats.push(bytes);
        }
        if pats.is_empty() {
            return Err(Error::Empty);
        }

        let mut m = FixedMulti {
            trans: vec![[NONE; 256]],
            fail: vec![0],
            out: vec![vec![]],
            pattern_lens: pats.iter().map(|p| p.len()).collect(),
            opts,
        };
        for (i, pat) in pats.iter().enumerate() {
            let mut cur = 0usize;
            for &b in pat {
                let next = m.trans[cur][b as usize];
                cur = if next == NONE {
                    m.trans.push([NONE; 256]);
                    m.fail.push(0);
                    m.out.push(vec![]);
                    let id = (m.trans.len() - 1) as u32;
                    m.trans[cur][b as usize] = id;
                    id as usize
                } else {
                    next as usize
                };
            }
            m.out[cur].push(i as u32);
        }
        m.build_failure_links();
        Ok(m)
    }

    /// BFS over the trie: children of the root fail to the root, deeper
    /// nodes fail to the longest proper suffix present in the trie. Output
    /// sets are merged along the way.
    fn build_failure_links(&mut self) {
        let mut queue = VecDeque::new();
        for b in 0..256 {
            let child = self.trans[0][b];
            if child != NONE {
                self.fail[child as usize] = 0;
                queue.push_back(child);
            }
        }
        while let Some(state) = queue.pop_front() {
            for b in 0..256 {
                let child = self.trans[state as usize][b];
                if child == NONE {
                    continue;
                }
                let mut f = self.fail[state as usize];
                while f != 0 && self.trans[f as usize][b] == NONE {
                    f = self.fail[f as usize];
                }
                let mut link = self.trans[f as usize][b];
                if link == NONE || link == child {
                    link = 0;
                }
                self.fail[child as usize] = link;
                let merged = self.out[link as usize].clone();
                self.out[child as usize].extend(merged);
                queue.push_back(child);
            }
        }
    }

    #[inline]
    fn step(&self, mut state: u32, raw: u8) -> u32 {
        let b = if self.opts.case_insensitive {
            raw.to_ascii_lowercase() as usize
        } else {
            raw as usize
        };
        while state != 0 && self.trans[state as usize][b] == NONE {
            state = self.fail[state as usize];
        }
        let next = self.trans[state as usize][b];
        if next == NONE {
            0
        } else {
            next
        }
    }

    /// Every occurrence of every pattern, sorted by start offset.
    fn occurrences(&self, buf: &[u8]) -> Vec<(usize, usize)> {
        let mut occs = Vec::new();
        let mut state = 0u32;
        for (i, &raw) in buf.iter().enumerate() {
            state = self.step(state, raw);
            for &pi in &self.out[state as usize] {
                let len = self.pattern_lens[pi as usize];
                occs.push((i + 1 - len, i + 1));
            }
        }
        occs.sort_unstable();
        occs
    }

    fn contains(&self, hay: &[u8]) -> bool {
        let mut state = 0u32;
        for &raw in hay {
            state = self.step(state, raw);
            if !self.out[state as usize].is_empty() {
                return true;
            }
        }
        false
    }
}

impl Matcher for FixedMulti {
    fn find_all(&self, buf: &[u8]) -> MatchSet {
        if self.opts.invert {
            return super::invert_find_all(buf, &self.opts, |l| self.contains(l));
        }
        let mut builder =
            SnippetBuilder::new(buf, self.opts.max_cols, self.opts.line_numbers);
        for (s, e) in self.occurrences(buf) {
            builder.push(s, e);
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
        let mut count = 0;
        let mut line_end = 0;
        for (s, _) in self.occurrences(buf) {
            if s < line_end {
                continue;
            }
            count += 1;
            line_end = match bytestr::index_byte(&buf[s..], b'\n') {
                Some(i) => s + i + 1,
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
        let occs = self.occurrences(line);
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
