/*!
The printer renders match sets as text. It owns a reusable `termcolor`
buffer: the ordered writer clears and refills it for every file, so steady
state formatting performs no allocation. Style: matched lines join their
decorations with `:`, context lines with `-`, group separators print as a
bare `--`. With color enabled the file name renders green, line numbers
blue and match spans bold red, through `termcolor`'s color specs.
*/

use std::io::Write;
use std::path::Path;

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use crate::matchset::{MatchRecord, MatchSet};

/// Printer encapsulates text output for search results.
///
/// Write errors against the internal buffer cannot occur and are ignored,
/// the same way a write to an in-memory vector is infallible.
pub struct Printer {
    buf: Buffer,
    with_filename: bool,
    line_numbers: bool,
    max_cols: usize,
    path_spec: ColorSpec,
    line_spec: ColorSpec,
    match_spec: ColorSpec,
}

impl Printer {
    /// Create a new printer. `color` selects between ANSI escapes and
    /// plain bytes.
    pub fn new(color: bool) -> Printer {
        let buf = if color { Buffer::ansi() } else { Buffer::no_color() };
        let mut path_spec = ColorSpec::new();
        path_spec.set_fg(Some(Color::Green)).set_bold(true);
        let mut line_spec = ColorSpec::new();
        line_spec.set_fg(Some(Color::Blue)).set_bold(true);
        let mut match_spec = ColorSpec::new();
        match_spec.set_fg(Some(Color::Red)).set_bold(true);
        Printer {
            buf,
            with_filename: false,
            line_numbers: false,
            max_cols: 0,
            path_spec,
            line_spec,
            match_spec,
        }
    }

    /// When set, each output line is prefixed with its file name.
    pub fn with_filename(mut self, yes: bool) -> Printer {
        self.with_filename = yes;
        self
    }

    /// When set, each output line is prefixed with its line number.
    pub fn line_numbers(mut self, yes: bool) -> Printer {
        self.line_numbers = yes;
        self
    }

    /// Column budget for displayed lines; 0 means unlimited. Lines over
    /// the budget show a window centered on the first match.
    pub fn max_cols(mut self, cols: usize) -> Printer {
        self.max_cols = cols;
        self
    }

    /// Renders a whole match set. The returned slice lives until the next
    /// formatting call.
    pub fn format(
        &mut self,
        path: Option<&Path>,
        data: &[u8],
        set: &MatchSet,
    ) -> &[u8] {
        self.buf.clear();
        for rec in &set.matches {
            if rec.is_separator() {
                let _ = self.buf.write_all(b"--\n");
                continue;
            }
            let sep: &[u8] = if rec.is_context { b"-" } else { b":" };
            if let Some(path) = path.filter(|_| self.with_filename) {
                let _ = self.buf.set_color(&self.path_spec);
                let _ = self
                    .buf
                    .write_all(path.to_string_lossy().as_bytes());
                let _ = self.buf.reset();
                let _ = self.buf.write_all(sep);
            }
            if self.line_numbers && rec.line_num > 0 {
                let _ = self.buf.set_color(&self.line_spec);
                let _ = self.buf.write_all(rec.line_num.to_string().as_bytes());
                let _ = self.buf.reset();
                let _ = self.buf.write_all(sep);
            }
            self.snippet(data, set, rec);
            let _ = self.buf.write_all(b"\n");
        }
        self.buf.as_slice()
    }

    /// Renders a bare path line (files-with-matches mode).
    pub fn format_path(&mut self, path: &Path) -> &[u8] {
        self.buf.clear();
        let _ = self.buf.write_all(path.to_string_lossy().as_bytes());
        let _ = self.buf.write_all(b"\n");
        self.buf.as_slice()
    }

    /// Renders a count line (count-only mode).
    pub fn format_count(&mut self, path: Option<&Path>, count: usize) -> &[u8] {
        self.buf.clear();
        if let Some(path) = path.filter(|_| self.with_filename) {
            let _ = self.buf.write_all(path.to_string_lossy().as_bytes());
            let _ = self.buf.write_all(b":");
        }
        let _ = self.buf.write_all(count.to_string().as_bytes());
        let _ = self.buf.write_all(b"\n");
        self.buf.as_slice()
    }

    /// Writes one record's snippet with highlighted positions, re-windowed
    /// to the column budget when the stored snippet still exceeds it.
    fn snippet(&mut self, data: &[u8], set: &MatchSet, rec: &MatchRecord) {
        let line = &data[rec.line_start..rec.line_start + rec.line_len];
        let positions = set.positions_of(rec);
        let (lo, hi) = self.display_window(line.len(), positions);
        let line = &line[lo..hi];
        if !self.buf.supports_color() || positions.is_empty() {
            let _ = self.buf.write_all(line);
            return;
        }
        let mut written = 0;
        for &(s, e) in positions {
            // Clip each span to the display window.
            let s = s.max(lo).min(hi) - lo;
            let e = e.max(lo).min(hi) - lo;
            if e <= s || s < written {
                continue;
            }
            let _ = self.buf.write_all(&line[written..s]);
            let _ = self.buf.set_color(&self.match_spec);
            let _ = self.buf.write_all(&line[s..e]);
            let _ = self.buf.reset();
            written = e;
        }
        let _ = self.buf.write_all(&line[written..]);
    }

    /// The sub-range of the snippet to display: everything when it fits
    /// the budget, otherwise a budget-sized window centered on the first
    /// match.
    fn display_window(
        &self,
        len: usize,
        positions: &[(usize, usize)],
    ) -> (usize, usize) {
        if self.max_cols == 0 || len <= self.max_cols {
            return (0, len);
        }
        let first = positions.first().map(|&(s, _)| s).unwrap_or(0);
        let lo = first
            .saturating_sub(self.max_cols / 2)
            .min(len - self.max_cols);
        (lo, lo + self.max_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatcherBuilder, PatternKind};

    fn render(pat: &str, data: &[u8], f: impl FnOnce(Printer) -> Printer) -> String {
        let m = MatcherBuilder::new()
            .pattern(pat)
            .kind(PatternKind::Literal)
            .build()
            .unwrap();
        let set = m.find_all(data);
        let mut p = f(Printer::new(false));
        String::from_utf8(p.format(None, data, &set).to_vec()).unwrap()
    }

    #[test]
    fn plain_lines() {
        let out = render("banana", b"apple\nbanana\ncherry\n", |p| p);
        assert_eq!(out, "banana\n");
    }

    #[test]
    fn line_numbers() {
        let out = render("banana", b"apple\nbanana\ncherry\n", |p| {
            p.line_numbers(true)
        });
        assert_eq!(out, "2:banana\n");
    }

    #[test]
    fn filenames_and_line_numbers() {
        let m = MatcherBuilder::new()
            .pattern("b")
            .kind(PatternKind::Literal)
            .build()
            .unwrap();
        let data = b"abc\nxyz\nbbb\n";
        let set = m.find_all(data);
        let mut p = Printer::new(false).with_filename(true).line_numbers(true);
        let out = p.format(Some(Path::new("f.txt")), data, &set);
        assert_eq!(out, b"f.txt:1:abc\nf.txt:3:bbb\n");
    }

    #[test]
    fn context_lines_use_dashes() {
        let m = MatcherBuilder::new()
            .pattern("middle")
            .kind(PatternKind::Literal)
            .before_context(1)
            .after_context(1)
            .build()
            .unwrap();
        let data = b"a\nb\nmiddle\nd\ne\n";
        let set = m.find_all(data);
        let mut p = Printer::new(false).line_numbers(true);
        let out = p.format(None, data, &set);
        assert_eq!(out, b"2-b\n3:middle\n4-d\n");
    }

    #[test]
    fn separators_between_groups() {
        let m = MatcherBuilder::new()
            .pattern("hit")
            .kind(PatternKind::Literal)
            .after_context(1)
            .build()
            .unwrap();
        let data = b"hit\nx\ny\nhit\nz\n";
        let set = m.find_all(data);
        let mut p = Printer::new(false);
        let out = p.format(None, data, &set);
        assert_eq!(out, b"hit\nx\n--\nhit\nz\n");
    }

    #[test]
    fn color_highlights_matches() {
        let m = MatcherBuilder::new()
            .pattern("mid")
            .kind(PatternKind::Literal)
            .build()
            .unwrap();
        let data = b"a mid b\n";
        let set = m.find_all(data);
        let mut p = Printer::new(true);
        let out = p.format(None, data, &set).to_vec();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("mid"));
        assert!(out.windows(2).any(|w| w == b"\x1b["));
    }

    #[test]
    fn count_and_path_lines() {
        let mut p = Printer::new(false).with_filename(true);
        assert_eq!(p.format_count(Some(Path::new("a")), 3), b"a:3\n");
        assert_eq!(p.format_path(Path::new("x.txt")), b"x.txt\n");
        let mut bare = Printer::new(false);
        assert_eq!(bare.format_count(Some(Path::new("a")), 3), b"3\n");
    }

    #[test]
    fn long_lines_window_on_first_match() {
        let mut data = vec![b'x'; 300];
        data.extend_from_slice(b"needle");
        data.extend(std::iter::repeat(b'y').take(300));
        data.push(b'\n');
        let m = MatcherBuilder::new()
            .pattern("needle")
            .kind(PatternKind::Literal)
            .build()
            .unwrap();
        let set = m.find_all(&data);
        let mut p = Printer::new(false).max_cols(40);
        let out = p.format(None, &data, &set).to_vec();
        assert!(out.len() <= 41, "window exceeded: {} bytes", out.len());
        assert!(String::from_utf8_lossy(&out).contains("needle"));
    }

    #[test]
    fn buffer_is_reused_across_calls() {
        let m = MatcherBuilder::new()
            .pattern("a")
            .kind(PatternKind::Literal)
            .build()
            .unwrap();
        let mut p = Printer::new(false);
        let first = p.format(None, b"a\n", &m.find_all(b"a\n")).to_vec();
        let second = p.format(None, b"b a\n", &m.find_all(b"b a\n")).to_vec();
        assert_eq!(first, b"a\n");
        assert_eq!(second, b"b a\n");
    }
}
