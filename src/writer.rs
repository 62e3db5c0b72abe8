/*!
The writer module re-serialises parallel search results. Workers finish in
whatever order the files happened to take to read and scan; the writer
holds a reorder buffer keyed by sequence number and only ever writes the
result whose sequence is next, so output order is walker discovery order no
matter how the scheduler raced.

Each result is formatted into the printer's reusable buffer, pushed to the
sink with a vectored write (retrying on short writes), and only then has
its buffer release handle dropped; that is the exactly-once release point
the match records' borrowed offsets rely on. Read errors ride on results
and are reported to stderr here, prefixed with the program name, so
warnings never interleave with match output.
*/

use std::collections::BTreeMap;
use std::io::{self, IoSlice, Write};
use std::mem;
use std::path::Path;

use crossbeam_channel::Receiver;

use crate::json::JsonPrinter;
use crate::printer::Printer;
use crate::worker::{ResultKind, SearchResult};

/// The output flavor the writer renders with.
pub enum Format {
    Text(Printer),
    Json(JsonPrinter),
}

/// Callback invoked once per result that matched.
pub type FoundFn = Box<dyn FnMut(&Path) + Send>;

pub struct OutputWriter<W: io::Write> {
    sink: W,
    format: Format,
    next_seq: u64,
    pending: BTreeMap<u64, SearchResult>,
    on_found: Option<FoundFn>,
    matched: u64,
}

impl<W: io::Write> OutputWriter<W> {
    pub fn new(sink: W, format: Format) -> OutputWriter<W> {
        OutputWriter {
            sink,
            format,
            next_seq: 1,
            pending: BTreeMap::new(),
            on_found: None,
            matched: 0,
        }
    }

    /// Installs the found callback. It fires once per matching result, in
    /// output order.
    pub fn on_found(mut self, f: FoundFn) -> OutputWriter<W> {
        self.on_found = Some(f);
        self
    }

    /// Consumes results until the channel closes. Returns the number of
    /// results that had a match.
    pub fn run(mut self, results: Receiver<SearchResult>) -> u64 {
        for result in results.iter() {
            if result.seq == self.next_seq {
                self.emit(result);
                self.next_seq += 1;
                while let Some(r) = self.pending.remove(&self.next_seq) {
                    self.emit(r);
                    self.next_seq += 1;
                }
            } else {
                self.pending.insert(result.seq, result);
            }
        }
        // A gap with a closed channel means a producer died; flush what is
        // left in order rather than dropping it silently.
        for (_, r) in mem::take(&mut self.pending) {
            self.emit(r);
        }
        let _ = self.sink.flush();
        self.matched
    }

    fn emit(&mut self, result: SearchResult) {
        if let Some(ref err) = result.err {
            eprintln!("gg: {}: {}", result.path.display(), err);
        }
        let OutputWriter { ref mut sink, ref mut format, .. } = *self;
        let empty: &[u8] = &[];
        let out: &[u8] = match result.kind {
            ResultKind::Nothing => empty,
            ResultKind::Matches(ref set) => {
                let data =
                    result.data.as_ref().map(|d| d.as_bytes()).unwrap_or(empty);
                match *format {
                    Format::Text(ref mut p) => {
                        p.format(Some(&result.path), data, set)
                    }
                    Format::Json(ref mut p) => {
                        p.format(Some(&result.path), data, set)
                    }
                }
            }
            ResultKind::Count(n) => {
                if n == 0 {
                    empty
                } else {
                    match *format {
                        Format::Text(ref mut p) => {
                            p.format_count(Some(&result.path), n)
                        }
                        // Count mode has no JSON shape; emit nothing.
                        Format::Json(_) => empty,
                    }
                }
            }
            ResultKind::PathOnly => match *format {
                Format::Text(ref mut p) => p.format_path(&result.path),
                Format::Json(_) => empty,
            },
        };
        if !out.is_empty() {
            let _ = write_all_vectored(sink, &[out]);
        }
        if result.has_match() {
            self.matched += 1;
            if let Some(ref mut f) = self.on_found {
                f(&result.path);
            }
        }
        // Dropping the result drops its FileData: the one release of the
        // buffer the records we just formatted were pointing into.
        drop(result);
    }
}

/// Writes all byte slices with `write_vectored`, retrying short and
/// interrupted writes until everything is on the wire.
pub fn write_all_vectored(
    wtr: &mut dyn io::Write,
    bufs: &[&[u8]],
) -> io::Result<()> {
    let mut remaining: Vec<&[u8]> =
        bufs.iter().copied().filter(|b| !b.is_empty()).collect();
    while !remaining.is_empty() {
        let slices: Vec<IoSlice> =
            remaining.iter().map(|b| IoSlice::new(b)).collect();
        let mut n = match wtr.write_vectored(&slices) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            Ok(n) => n,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                continue;
            }
            Err(err) => return Err(err),
        };
        while n > 0 {
            if n >= remaining[0].len() {
                n -= remaining[0].len();
                remaining.remove(0);
            } else {
                remaining[0] = &remaining[0][n..];
                n = 0;
            }
        }
    }
    Ok(())
}
