/*!
The walker module discovers the files to search. It runs a breadth first
traversal over a work queue of directories, with a configurable number of
threads feeding on the queue; directories are coarse grained units of work
and the traversal is usually bottlenecked on I/O fan-out, so a plain
mutex+condvar queue beats fancier scheduling here.

Each queued directory carries the stack of gitignore layers inherited from
its ancestors. Descending into a directory that has its own `.gitignore`
clones the parent's layer vector and appends one layer; compiled layers are
immutable and shared by `Arc` handle, so the clone costs one pointer per
layer.

Per entry, symlinks are resolved (or skipped) up front so the remaining
filters know whether they are looking at a directory; then, in order: VCS
and hidden names (unless `--hidden`), binary extensions, the gitignore
stack (innermost decision wins) and `-g` overrides. Directory read errors
are reported on a dedicated channel and never abort the traversal of
siblings.
*/

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crossbeam_channel::Sender;
use log::debug;

use crate::binary;
use crate::gitignore::{Gitignore, Match};
use crate::glob::Overrides;
use crate::pathutil;

const VCS_DIRS: &[&str] = &[".git", ".svn", ".hg"];

/// A file the scheduler should search.
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub path: PathBuf,
}

/// A per-directory traversal error.
#[derive(Debug)]
pub struct WalkError {
    pub path: PathBuf,
    pub err: io::Error,
}

impl StdError for WalkError {}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.err)
    }
}

/// WalkerBuilder configures a parallel directory walker.
pub struct WalkerBuilder {
    roots: Vec<PathBuf>,
    threads: usize,
    hidden: bool,
    follow: bool,
    no_ignore: bool,
    overrides: Overrides,
}

impl WalkerBuilder {
    pub fn new(roots: Vec<PathBuf>, overrides: Overrides) -> WalkerBuilder {
        WalkerBuilder {
            roots,
            threads: num_cpus::get(),
            hidden: false,
            follow: false,
            no_ignore: false,
            overrides,
        }
    }

    /// Number of traversal threads. Defaults to the host CPU count.
    pub fn threads(mut self, threads: usize) -> WalkerBuilder {
        self.threads = threads.max(1);
        self
    }

    /// Search hidden files and directories. Disabled by default.
    pub fn hidden(mut self, yes: bool) -> WalkerBuilder {
        self.hidden = yes;
        self
    }

    /// Follow symbolic links. Disabled by default.
    pub fn follow(mut self, yes: bool) -> WalkerBuilder {
        self.follow = yes;
        self
    }

    /// Skip reading `.gitignore` files. Disabled by default.
    pub fn no_ignore(mut self, yes: bool) -> WalkerBuilder {
        self.no_ignore = yes;
        self
    }

    pub fn build(self) -> Walker {
        Walker {
            roots: self.roots,
            threads: self.threads,
            opts: WalkOptions {
                hidden: self.hidden,
                follow: self.follow,
                no_ignore: self.no_ignore,
                overrides: self.overrides,
            },
        }
    }
}

pub struct Walker {
    roots: Vec<PathBuf>,
    threads: usize,
    opts: WalkOptions,
}

struct WalkOptions {
    hidden: bool,
    follow: bool,
    no_ignore: bool,
    overrides: Overrides,
}

/// One unit of traversal work: a directory plus its inherited layers.
struct DirWork {
    path: PathBuf,
    /// The root this directory descends from; override globs are matched
    /// relative to it.
    root: Arc<PathBuf>,
    layers: Vec<Arc<Gitignore>>,
}

struct WalkState {
    queue: Mutex<WalkQueue>,
    cond: Condvar,
    opts: WalkOptions,
}

struct WalkQueue {
    items: VecDeque<DirWork>,
    /// Directories enqueued or currently being processed. The walk is done
    /// when this reaches zero with an empty queue.
    pending: usize,
}

impl Walker {
    /// Runs the traversal to completion, emitting files on `files` and
    /// per-directory failures on `errs`. File roots are emitted directly,
    /// bypassing the filters; they were named explicitly.
    pub fn run(self, files: Sender<FileEntry>, errs: Sender<WalkError>) {
        let state = Arc::new(WalkState {
            queue: Mutex::new(WalkQueue { items: VecDeque::new(), pending: 0 }),
            cond: Condvar::new(),
            opts: self.opts,
        });
        for root in self.roots {
            match fs::metadata(&root) {
                Ok(ref md) if md.is_dir() => {
                    let root = Arc::new(root);
                    let mut layers = Vec::new();
                    push_layer(&state.opts, &mut layers, &root, &errs);
                    let mut queue = state.queue.lock().unwrap();
                    queue.pending += 1;
                    queue.items.push_back(DirWork {
                        path: (*root).clone(),
                        root,
                        layers,
                    });
                }
                Ok(_) => {
                    let _ = files.send(FileEntry { path: root });
                }
                Err(err) => {
                    let _ = errs.send(WalkError { path: root, err });
                }
            }
        }
        let mut handles = Vec::with_capacity(self.threads);
        for _ in 0..self.threads {
            let state = state.clone();
            let files = files.clone();
            let errs = errs.clone();
            handles.push(thread::spawn(move || walk_worker(state, files, errs)));
        }
        drop(files);
        drop(errs);
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

fn walk_worker(
    state: Arc<WalkState>,
    files: Sender<FileEntry>,
    errs: Sender<WalkError>,
) {
    while let Some(work) = next_work(&state) {
        process_dir(&state, &work, &files, &errs);
        let mut queue = state.queue.lock().unwrap();
        queue.pending -= 1;
        if queue.pending == 0 {
            state.cond.notify_all();
        }
    }
}

/// Blocks until a directory is available or the walk has drained.
fn next_work(state: &WalkState) -> Option<DirWork> {
    let mut queue = state.queue.lock().unwrap();
    loop {
        if let Some(work) = queue.items.pop_front() {
            return Some(work);
        }
        if queue.pending == 0 {
            return None;
        }
        queue = state.cond.wait(queue).unwrap();
    }
}

fn process_dir(
    state: &WalkState,
    work: &DirWork,
    files: &Sender<FileEntry>,
    errs: &Sender<WalkError>,
) {
    let opts = &state.opts;
    // Drain the directory before enqueueing children so the open
    // descriptor count stays bounded by the worker count.
    let entries = match read_dir_entries(&work.path) {
        Ok(entries) => entries,
        Err(err) => {
            let _ = errs.send(WalkError { path: work.path.clone(), err });
            return;
        }
    };
    for (name, file_type) in entries {
        let path = work.path.join(&name);
        let mut is_dir = file_type.is_dir();
        let mut is_file = file_type.is_file();
        if file_type.is_symlink() {
            if !opts.follow {
                debug!("skipping symlink {}", path.display());
                continue;
            }
            match fs::metadata(&path) {
                Ok(md) => {
                    is_dir = md.is_dir();
                    is_file = md.is_file();
                }
                Err(err) => {
                    let _ = errs.send(WalkError { path, err });
                    continue;
                }
            }
        }
        if !opts.hidden && is_skippable_name(&name, is_dir) {
            continue;
        }
        if !is_dir && binary::is_binary_name(&name) {
            debug!("skipping binary name {}", path.display());
            continue;
        }
        if !opts.no_ignore && ignored_by_layers(&work.layers, &path, is_dir) {
            debug!("gitignored {}", path.display());
            continue;
        }
        if !opts.overrides.is_empty() {
            let rel = relative_to(&work.root, &path);
            if !opts.overrides.matched(rel, is_dir) {
                continue;
            }
        }
        if is_dir {
            let mut layers = work.layers.clone();
            push_layer(opts, &mut layers, &path, errs);
            let mut queue = state.queue.lock().unwrap();
            queue.pending += 1;
            queue.items.push_back(DirWork {
                path,
                root: work.root.clone(),
                layers,
            });
            state.cond.notify_one();
        } else if is_file {
            let _ = files.send(FileEntry { path });
        }
    }
}

/// Reads all entries of one directory, dropping `.`/`..` (std already
/// omits them) and returning the names with their file types. The
/// directory descriptor is closed when this returns.
fn read_dir_entries(
    dir: &Path,
) -> io::Result<Vec<(OsString, fs::FileType)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        out.push((entry.file_name(), entry.file_type()?));
    }
    Ok(out)
}

/// VCS bookkeeping directories and hidden names are skipped unless hidden
/// search is on.
fn is_skippable_name(name: &std::ffi::OsStr, is_dir: bool) -> bool {
    if is_dir {
        if let Some(name) = name.to_str() {
            if VCS_DIRS.contains(&name) {
                return true;
            }
        }
    }
    pathutil::is_hidden_name(name)
}

/// Appends the directory's own gitignore layer, if it has one.
fn push_layer(
    opts: &WalkOptions,
    layers: &mut Vec<Arc<Gitignore>>,
    dir: &Path,
    errs: &Sender<WalkError>,
) {
    if opts.no_ignore {
        return;
    }
    let gi_path = dir.join(".gitignore");
    if !gi_path.is_file() {
        return;
    }
    match Gitignore::from_path(dir, &gi_path) {
        Ok(gi) => layers.push(Arc::new(gi)),
        Err(err) => {
            let _ = errs.send(WalkError {
                path: gi_path,
                err: io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
            });
        }
    }
}

/// Queries the layer stack. Layers are visited outermost first so the
/// innermost matching layer decides, which also lets a nested gitignore
/// whitelist something an ancestor ignored.
fn ignored_by_layers(
    layers: &[Arc<Gitignore>],
    path: &Path,
    is_dir: bool,
) -> bool {
    let mut verdict = Match::None;
    for layer in layers {
        match layer.matched(path, is_dir) {
            Match::None => {}
            m => verdict = m,
        }
    }
    verdict.is_ignored()
}

fn relative_to<'a>(root: &'a Path, path: &'a Path) -> &'a Path {
    match pathutil::strip_prefix(root, path) {
        Some(rel) => pathutil::strip_prefix("/", rel).unwrap_or(rel),
        None => path,
    }
}
