/*!
The worker module is the scheduler between the walker and the ordered
writer: a pool of threads consumes discovered files, reads each into a
buffer, runs the shared matcher and pushes a sequence tagged result
downstream.

Sequence numbers are handed out by an atomic counter at the moment a work
item is taken off the channel (receive and tag happen under one lock, so
tag order equals walker discovery order); the ordered writer replays
results strictly by that sequence. Every received work item produces
exactly one result, including binary rejections and read errors, so the
writer can never stall waiting for a gap in the sequence.

Buffer discipline: when the match set is non-empty the buffer travels with
the result, because match records hold offsets into it; the writer drops it
after formatting. Empty results drop the buffer right here in the worker.
*/

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::binary;
use crate::matcher::Matcher;
use crate::matchset::MatchSet;
use crate::reader::{self, BufferPool, FileData, FileReader};
use crate::walker::FileEntry;

/// A unit of search work.
pub enum Work {
    Stdin,
    File(FileEntry),
}

/// What a search produced for one input.
pub enum ResultKind {
    /// No output for this input (no match, binary, or errored).
    Nothing,
    /// Matched lines for the default mode.
    Matches(MatchSet),
    /// The distinct matching line count for count-only mode.
    Count(usize),
    /// The input matched in files-with-matches mode.
    PathOnly,
}

/// One input's outcome, tagged with its discovery sequence number.
pub struct SearchResult {
    pub seq: u64,
    pub path: PathBuf,
    pub kind: ResultKind,
    /// The buffer match records point into. `Some` only when the records
    /// need it alive through formatting; dropping it is the release.
    pub data: Option<FileData>,
    pub err: Option<io::Error>,
}

impl SearchResult {
    /// Whether this result represents at least one match (drives the found
    /// callback and the process exit code).
    pub fn has_match(&self) -> bool {
        match self.kind {
            ResultKind::Nothing => false,
            ResultKind::Matches(ref set) => set.matched_line_count() > 0,
            ResultKind::Count(n) => n > 0,
            ResultKind::PathOnly => true,
        }
    }
}

/// Output modes that change what workers compute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchMode {
    Standard,
    FilesOnly,
    CountOnly,
}

/// Scheduler runs the worker pool.
pub struct Scheduler {
    matcher: Arc<dyn Matcher>,
    reader: Arc<dyn FileReader>,
    pool: Arc<BufferPool>,
    mode: SearchMode,
    workers: usize,
}

impl Scheduler {
    pub fn new(
        matcher: Arc<dyn Matcher>,
        reader: Arc<dyn FileReader>,
        pool: Arc<BufferPool>,
        mode: SearchMode,
        workers: usize,
    ) -> Scheduler {
        Scheduler { matcher, reader, pool, mode, workers: workers.max(1) }
    }

    /// Consumes `work` until the channel closes, emitting one result per
    /// item on `results`. Blocks until all workers drain.
    pub fn run(&self, work: Receiver<Work>, results: Sender<SearchResult>) {
        let source = Arc::new(WorkSource {
            rx: Mutex::new(work),
            seq: AtomicU64::new(1),
        });
        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let source = source.clone();
            let results = results.clone();
            let matcher = self.matcher.clone();
            let reader = self.reader.clone();
            let pool = self.pool.clone();
            let mode = self.mode;
            handles.push(thread::spawn(move || {
                while let Some((seq, item)) = source.next() {
                    let result =
                        search_one(seq, item, &*matcher, &*reader, &pool, mode);
                    if results.send(result).is_err() {
                        return;
                    }
                }
            }));
        }
        drop(results);
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

struct WorkSource {
    rx: Mutex<Receiver<Work>>,
    seq: AtomicU64,
}

impl WorkSource {
    /// Receives the next work item and tags it. The lock spans receive and
    /// tag so sequence numbers follow channel order.
    fn next(&self) -> Option<(u64, Work)> {
        let rx = self.rx.lock().unwrap();
        match rx.recv() {
            Ok(item) => Some((self.seq.fetch_add(1, Ordering::SeqCst), item)),
            Err(_) => None,
        }
    }
}

fn search_one(
    seq: u64,
    item: Work,
    matcher: &dyn Matcher,
    reader: &dyn FileReader,
    pool: &Arc<BufferPool>,
    mode: SearchMode,
) -> SearchResult {
    let (path, read) = match item {
        Work::Stdin => (PathBuf::from("<stdin>"), reader::read_stdin(pool)),
        Work::File(entry) => {
            let read = reader.read(&entry.path);
            // Paths discovered under a "./" root display without the
            // prefix.
            let path = match crate::pathutil::strip_prefix("./", &entry.path) {
                Some(p) => p.to_path_buf(),
                None => entry.path,
            };
            (path, read)
        }
    };
    let data = match read {
        Ok(data) => data,
        Err(err) => {
            return SearchResult {
                seq,
                path,
                kind: ResultKind::Nothing,
                data: None,
                err: Some(err),
            };
        }
    };
    let buf = data.as_bytes();
    if binary::is_binary_content(buf) {
        return SearchResult {
            seq,
            path,
            kind: ResultKind::Nothing,
            data: None,
            err: None,
        };
    }
    match mode {
        SearchMode::FilesOnly => {
            let kind = if matcher.match_exists(buf) {
                ResultKind::PathOnly
            } else {
                ResultKind::Nothing
            };
            SearchResult { seq, path, kind, data: None, err: None }
        }
        SearchMode::CountOnly => SearchResult {
            seq,
            path,
            kind: ResultKind::Count(matcher.count_all(buf)),
            data: None,
            err: None,
        },
        SearchMode::Standard => {
            let set = matcher.find_all(buf);
            if set.is_empty() {
                // Nothing borrows the buffer; release it now rather than
                // shipping it through the writer.
                SearchResult {
                    seq,
                    path,
                    kind: ResultKind::Nothing,
                    data: None,
                    err: None,
                }
            } else {
                SearchResult {
                    seq,
                    path,
                    kind: ResultKind::Matches(set),
                    data: Some(data),
                    err: None,
                }
            }
        }
    }
}
