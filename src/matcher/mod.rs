/*!
The matcher module defines the polymorphic line matcher used by the search
workers, along with its concrete variants:

* `FixedOne` for a single literal,
* `FixedMulti` for several literals (an Aho–Corasick automaton),
* `RegexMatcher` for regex patterns, with a literal prefilter,
* `PcreMatcher` for patterns needing lookaround or backreferences,
* `ContextMatcher`, which wraps any of the above to add before/after lines.

A matcher is built once, is immutable afterwards, and is shared read-only
across every search worker. The unit of matching is always a line: multiple
occurrences on one line collapse into a single record carrying multiple
highlight positions, and in inverted mode the records are the lines with no
occurrences at all.
*/

use std::error::Error as StdError;
use std::fmt;

use crate::matchset::MatchSet;

mod context;
mod fixed;
mod literals;
mod multi;
mod pcre;
mod regex;
pub mod snippet;

pub use self::context::ContextMatcher;
pub use self::fixed::FixedOne;
pub use self::multi::FixedMulti;
pub use self::pcre::PcreMatcher;
pub use self::regex::RegexMatcher;

use self::snippet::{Lines, SnippetBuilder};

/// Which engine a set of patterns compiles to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PatternKind {
    Literal,
    Regex,
    Pcre,
}

/// Display and matching options shared by every matcher variant.
#[derive(Clone, Debug)]
pub struct MatcherOptions {
    /// ASCII case folded matching.
    pub case_insensitive: bool,
    /// Report lines with no occurrences instead of lines with occurrences.
    pub invert: bool,
    /// Column budget for snippet extraction. 0 means unlimited.
    pub max_cols: usize,
    /// When false, line numbers in emitted records are left as zero.
    pub line_numbers: bool,
}

impl Default for MatcherOptions {
    fn default() -> MatcherOptions {
        MatcherOptions {
            case_insensitive: false,
            invert: false,
            max_cols: 0,
            line_numbers: true,
        }
    }
}

/// An error that can occur while compiling a matcher.
#[derive(Debug)]
pub enum Error {
    /// The underlying regex engine rejected the pattern.
    Regex(::regex::Error),
    /// The PCRE engine rejected the pattern.
    Pcre(pcre2::Error),
    /// A literal pattern contains the line terminator and could therefore
    /// never match within a single line.
    LiteralTerminator,
    /// No pattern was given.
    Empty,
}

impl StdError for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Regex(ref err) => err.fmt(f),
            Error::Pcre(ref err) => err.fmt(f),
            Error::LiteralTerminator => {
                write!(f, "literal pattern may not contain a line terminator")
            }
            Error::Empty => write!(f, "no pattern given"),
        }
    }
}

impl From<::regex::Error> for Error {
    fn from(err: ::regex::Error) -> Error {
        Error::Regex(err)
    }
}

impl From<pcre2::Error> for Error {
    fn from(err: pcre2::Error) -> Error {
        Error::Pcre(err)
    }
}

/// A line oriented searcher over in-memory buffers.
///
/// Implementations must be safely callable from multiple threads at once;
/// all state is fixed at construction time.
pub trait Matcher: Send + Sync {
    /// Scans the whole buffer and returns every matching line. Highlight
    /// positions are filled unless the matcher is inverted.
    fn find_all(&self, buf: &[u8]) -> MatchSet;

    /// Returns true if at least one line matches. May stop at the first
    /// occurrence.
    fn match_exists(&self, buf: &[u8]) -> bool;

    /// Counts distinct matching lines. Several occurrences on one line
    /// count once.
    fn count_all(&self, buf: &[u8]) -> usize;

    /// Single line form used by the context wrapper and streaming input.
    /// `line` must not contain the line terminator. Offsets in the returned
    /// set are relative to `line`; `byte_offset` is the absolute offset of
    /// the line start.
    fn find_line(
        &self,
        line: &[u8],
        line_num: u64,
        byte_offset: u64,
    ) -> Option<MatchSet>;

    fn options(&self) -> &MatcherOptions;
}

/// MatcherBuilder constructs a matcher from a pattern configuration.
#[derive(Clone, Debug)]
pub struct MatcherBuilder {
    patterns: Vec<String>,
    kind: PatternKind,
    opts: MatcherOptions,
    before_context: usize,
    after_context: usize,
}

impl MatcherBuilder {
    pub fn new() -> MatcherBuilder {
        MatcherBuilder {
            patterns: vec![],
            kind: PatternKind::Regex,
            opts: MatcherOptions::default(),
            before_context: 0,
            after_context: 0,
        }
    }

    /// Adds a pattern. Multiple patterns are ORed together.
    pub fn pattern(mut self, pat: &str) -> MatcherBuilder {
        self.patterns.push(pat.to_string());
        self
    }

    pub fn patterns(mut self, pats: Vec<String>) -> MatcherBuilder {
        self.patterns.extend(pats);
        self
    }

    /// Selects the engine. The default is `Regex`.
    pub fn kind(mut self, kind: PatternKind) -> MatcherBuilder {
        self.kind = kind;
        self
    }

    /// ASCII case folded matching. Disabled by default.
    pub fn case_insensitive(mut self, yes: bool) -> MatcherBuilder {
        self.opts.case_insensitive = yes;
        self
    }

    /// Report lines that do not match. Disabled by default.
    pub fn invert(mut self, yes: bool) -> MatcherBuilder {
        self.opts.invert = yes;
        self
    }

    /// Column budget for snippets. 0 (the default) means unlimited.
    pub fn max_cols(mut self, cols: usize) -> MatcherBuilder {
        self.opts.max_cols = cols;
        self
    }

    /// Whether emitted records carry line numbers. Enabled by default;
    /// callers that will discard them (files-only mode) turn this off.
    pub fn line_numbers(mut self, yes: bool) -> MatcherBuilder {
        self.opts.line_numbers = yes;
        self
    }

    /// Lines of context before each match.
    pub fn before_context(mut self, lines: usize) -> MatcherBuilder {
        self.before_context = lines;
        self
    }

    /// Lines of context after each match.
    pub fn after_context(mut self, lines: usize) -> MatcherBuilder {
        self.after_context = lines;
        self
    }

    /// Compiles the matcher.
    pub fn build(self) -> Result<Box<dyn Matcher>, Error> {
        if self.patterns.is_empty() {
            return Err(Error::Empty);
        }
        let inner: Box<dyn Matcher> = match self.kind {
            PatternKind::Literal => {
                if self.patterns.len() == 1 {
                    Box::new(FixedOne::new(&self.patterns[0], self.opts)?)
                } else {
                    Box::new(FixedMulti::new(&self.patterns, self.opts)?)
                }
            }
            PatternKind::Regex => {
                Box::new(RegexMatcher::new(&self.patterns.join("|"), self.opts)?)
            }
            PatternKind::Pcre => {
                Box::new(PcreMatcher::new(&self.patterns.join("|"), self.opts)?)
            }
        };
        // With no context requested the wrapper would only slow the scan
        // down, so hand back the inner matcher directly.
        if self.before_context == 0 && self.after_context == 0 {
            Ok(inner)
        } else {
            Ok(Box::new(ContextMatcher::new(
                inner,
                self.before_context,
                self.after_context,
            )))
        }
    }
}

/// Builds the match set for inverted mode: every line for which `is_match`
/// returns false becomes a record without positions.
fn invert_find_all(
    buf: &[u8],
    opts: &MatcherOptions,
    is_match: impl Fn(&[u8]) -> bool,
) -> MatchSet {
    let mut set = MatchSet::new();
    let mut line_num = 0u64;
    for (start, end) in Lines::new(buf) {
        line_num += 1;
        let line = &buf[start..end];
        if !is_match(line) {
            let shown = if opts.max_cols > 0 {
                line.len().min(opts.max_cols)
            } else {
                line.len()
            };
            set.push_match(
                if opts.line_numbers { line_num } else { 0 },
                start,
                shown,
                start as u64,
                &[],
            );
        }
    }
    set
}

/// Counts lines for which `is_match` disagrees with `invert`.
fn count_lines_where(
    buf: &[u8],
    invert: bool,
    is_match: impl Fn(&[u8]) -> bool,
) -> usize {
    Lines::new(buf)
        .filter(|&(s, e)| is_match(&buf[s..e]) != invert)
        .count()
}

/// Returns true if any line's match status disagrees with `invert`.
fn exists_line_where(
    buf: &[u8],
    invert: bool,
    is_match: impl Fn(&[u8]) -> bool,
) -> bool {
    Lines::new(buf).any(|(s, e)| is_match(&buf[s..e]) != invert)
}

/// Builds the single line match set for `find_line` from ascending
/// occurrence offsets relative to `line`.
fn line_match_set(
    line: &[u8],
    line_num: u64,
    byte_offset: u64,
    max_cols: usize,
    occurrences: &[(usize, usize)],
) -> MatchSet {
    let mut builder = SnippetBuilder::new(line, max_cols, false);
    for &(s, e) in occurrences {
        builder.push(s, e);
    }
    let mut set = builder.finish();
    for rec in &mut set.matches {
        rec.line_num = line_num;
        rec.byte_offset += byte_offset;
    }
    set
}

/// The single record set an inverted matcher produces for a non-matching
/// line.
fn inverted_line_set(
    line: &[u8],
    line_num: u64,
    byte_offset: u64,
    max_cols: usize,
) -> MatchSet {
    let shown = if max_cols > 0 { line.len().min(max_cols) } else { line.len() };
    let mut set = MatchSet::new();
    set.push_match(line_num, 0, shown, byte_offset, &[]);
    set
}
