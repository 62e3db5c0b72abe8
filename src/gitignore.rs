/*!
The gitignore module reads a single gitignore file and decides whether a
given file name should be ignored. All globs of one file compile into a
single `globset::GlobSet`, so a lookup answers "which patterns match" in
one pass; a short post-processing step then applies the extra gitignore
rules, namely whitelisting (leading `!`) and directory-only globs
(trailing `/`).

One `Gitignore` corresponds to one directory layer. The walker stacks the
layers of nested directories and queries them innermost first; the compiled
matchers are immutable, so a layer is shared by handle between all
directories below it.
*/

use std::error::Error as StdError;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::pathutil::{is_file_name, strip_prefix};

/// Represents an error that can occur when parsing a gitignore file.
#[derive(Debug)]
pub enum Error {
    Glob(globset::Error),
    Io(io::Error),
}

impl StdError for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Glob(ref err) => err.fmt(f),
            Error::Io(ref err) => err.fmt(f),
        }
    }
}

impl From<globset::Error> for Error {
    fn from(err: globset::Error) -> Error {
        Error::Glob(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Gitignore is a matcher for the glob patterns in a single gitignore file.
#[derive(Clone, Debug)]
pub struct Gitignore {
    set: GlobSet,
    root: PathBuf,
    patterns: Vec<Pattern>,
}

impl Gitignore {
    /// Create a new gitignore matcher from the file at `path`, matched
    /// relative to `root`.
    pub fn from_path<P: AsRef<Path>>(
        root: P,
        path: P,
    ) -> Result<Gitignore, Error> {
        let mut builder = GitignoreBuilder::new(root);
        builder.add_path(path)?;
        builder.build()
    }

    /// Create a new gitignore matcher from the string given.
    pub fn from_str<P: AsRef<Path>>(
        root: P,
        gitignore: &str,
    ) -> Result<Gitignore, Error> {
        let mut builder = GitignoreBuilder::new(root);
        builder.add_str(gitignore)?;
        builder.build()
    }

    /// Returns how the given path fares against the globs in this
    /// gitignore. `is_dir` should be true if the path refers to a
    /// directory.
    ///
    /// The path is matched relative to the directory containing this
    /// gitignore: any common prefix with the root is stripped first. A bare
    /// file name is matched as is.
    pub fn matched<P: AsRef<Path>>(&self, path: P, is_dir: bool) -> Match {
        let mut path = path.as_ref();
        if let Some(p) = strip_prefix("./", path) {
            path = p;
        }
        if !is_file_name(path) {
            if let Some(p) = strip_prefix(&self.root, path) {
                path = p;
            }
        }
        if let Some(p) = strip_prefix("/", path) {
            path = p;
        }
        self.matched_stripped(path, is_dir)
    }

    /// Like matched, but takes a path that has already been stripped.
    pub fn matched_stripped(&self, path: &Path, is_dir: bool) -> Match {
        // The last matching pattern in file order wins.
        for &i in self.set.matches(path).iter().rev() {
            let pat = &self.patterns[i];
            if !pat.only_dir || is_dir {
                return if pat.whitelist {
                    Match::Whitelist
                } else {
                    Match::Ignored
                };
            }
        }
        Match::None
    }
}

/// The result of a gitignore lookup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Match {
    /// The path didn't match any glob.
    None,
    /// The last glob matched says the path should be ignored.
    Ignored,
    /// The last glob matched says the path is whitelisted.
    Whitelist,
}

impl Match {
    pub fn is_ignored(&self) -> bool {
        *self == Match::Ignored
    }
}

/// GitignoreBuilder constructs a matcher for a single set of globs from a
/// gitignore file.
pub struct GitignoreBuilder {
    builder: GlobSetBuilder,
    root: PathBuf,
    patterns: Vec<Pattern>,
}

/// Pattern stores the post-processing options of a single gitignore line.
#[derive(Clone, Debug)]
struct Pattern {
    /// The original glob pattern string.
    original: String,
    /// Whether this is a whitelisted pattern or not.
    whitelist: bool,
    /// Whether this pattern should only match directories or not.
    only_dir: bool,
}

impl GitignoreBuilder {
    /// Create a new builder whose globs are matched relative to `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> GitignoreBuilder {
        let root = strip_prefix("./", root.as_ref()).unwrap_or(root.as_ref());
        GitignoreBuilder {
            builder: GlobSetBuilder::new(),
            root: root.to_path_buf(),
            patterns: vec![],
        }
    }

    /// Builds a new matcher from the glob patterns added so far.
    pub fn build(self) -> Result<Gitignore, Error> {
        Ok(Gitignore {
            set: self.builder.build()?,
            root: self.root,
            patterns: self.patterns,
        })
    }

    /// Add each pattern line from the file path given.
    pub fn add_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let rdr = io::BufReader::new(File::open(&path)?);
        log::debug!("gitignore: {}", path.as_ref().display());
        for line in rdr.lines() {
            self.add(&line?)?;
        }
        Ok(())
    }

    /// Add each pattern line from the string given.
    pub fn add_str(&mut self, gitignore: &str) -> Result<(), Error> {
        for line in gitignore.lines() {
            self.add(line)?;
        }
        Ok(())
    }

    /// Add a line from a gitignore file to this builder.
    ///
    /// If the line could not be parsed as a glob, then an error is
    /// returned.
    pub fn add(&mut self, mut line: &str) -> Result<(), Error> {
        if line.starts_with('#') {
            return Ok(());
        }
        if !line.ends_with("\\ ") {
            line = line.trim_end();
        }
        if line.is_empty() {
            return Ok(());
        }
        let mut pat = Pattern {
            original: line.to_string(),
            whitelist: false,
            only_dir: false,
        };
        let mut literal_separator = false;
        let has_slash = line.chars().any(|c| c == '/');
        let is_absolute = line.starts_with('/');
        if line.starts_with("\\!") || line.starts_with("\\#") {
            line = &line[1..];
        } else {
            if line.starts_with('!') {
                pat.whitelist = true;
                line = &line[1..];
            }
            if line.starts_with('/') {
                // `man gitignore` says that a glob with a leading slash can
                // only match the beginning of a path relative to the
                // location of the gitignore. We get that by banning
                // wildcards from matching a separator.
                literal_separator = true;
                line = &line[1..];
            }
        }
        // A trailing slash restricts the pattern to directories but plays
        // no part in the glob itself.
        if let Some((i, c)) = line.char_indices().rev().next() {
            if c == '/' {
                pat.only_dir = true;
                line = &line[..i];
            }
        }
        let mut glob = line.to_string();
        if has_slash {
            literal_separator = true;
        }
        // Patterns without a leading slash match anywhere below the root,
        // so give them a **/ prefix unless they carry one already.
        if !is_absolute && !glob.starts_with("**/") {
            glob = format!("**/{}", glob);
        }
        // A pattern ending with /** should match everything inside a
        // directory, but not the directory itself; force the issue with a
        // trailing /*.
        if glob.ends_with("/**") {
            glob = format!("{}/*", glob);
        }
        let parsed = GlobBuilder::new(&glob)
            .literal_separator(literal_separator)
            .build()?;
        self.builder.add(parsed);
        self.patterns.push(pat);
        Ok(())
    }
}
