/*!
The args module turns raw clap matches into gogrep's normalised
configuration, and acts as the factory for every component the driver
wires together: the matcher, the reader, the walker, the output format.
All flag interplay lives here: conflicting flags, smart case promotion,
context arithmetic, color detection and the default search path.
*/

use std::ffi::OsStr;
use std::ops;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ErrorKind;
use log::debug;

use crate::app;
use crate::config;
use crate::glob::OverridesBuilder;
use crate::json::JsonPrinter;
use crate::matcher::{Matcher, MatcherBuilder, PatternKind};
use crate::printer::Printer;
use crate::reader::{AdaptiveReader, BufferPool, FileReader};
use crate::walker::{Walker, WalkerBuilder};
use crate::worker::SearchMode;
use crate::writer::Format;
use crate::Result;

const DEFAULT_MMAP_THRESHOLD: u64 = 1 << 20;

/// Args are transformed/normalized from ArgMatches.
#[derive(Debug)]
pub struct Args {
    paths: Vec<PathBuf>,
    patterns: Vec<String>,
    kind: PatternKind,
    case_insensitive: bool,
    invert: bool,
    recursive: bool,
    line_number: bool,
    count: bool,
    files_with_matches: bool,
    before_context: usize,
    after_context: usize,
    json: bool,
    color: bool,
    workers: usize,
    no_ignore: bool,
    hidden: bool,
    follow: bool,
    globs: Vec<String>,
    max_cols: usize,
    mmap_threshold: u64,
    with_filename: bool,
}

impl Args {
    /// Parse the command line arguments for this process.
    ///
    /// If a CLI usage error occurred, an error is returned (the driver
    /// exits 2). Help and version requests print and exit right here.
    ///
    /// Also initializes the global logger.
    pub fn parse() -> Result<Args> {
        let argv = config::args_with_config();
        let matches = match app::app().get_matches_from_safe(argv) {
            Ok(matches) => matches,
            Err(err) => match err.kind {
                ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                    err.exit();
                }
                _ => return Err(err.message.into()),
            },
        };

        let mut logb = env_logger::Builder::new();
        if matches.is_present("debug") {
            logb.filter_level(log::LevelFilter::Debug);
        } else {
            logb.filter_level(log::LevelFilter::Warn);
        }
        if let Err(err) = logb.try_init() {
            debug!("failed to initialize logger: {}", err);
        }

        if matches.is_present("watch") {
            return Err("--watch: watch mode is not available in this build \
                        (no watcher backend)"
                .into());
        }
        ArgMatches(matches).to_args()
    }

    /// Builds the shared matcher from the pattern configuration.
    pub fn matcher(&self) -> Result<Arc<dyn Matcher>> {
        let line_numbers = match self.mode() {
            SearchMode::Standard => self.line_number || self.json,
            // The caller discards line numbers in these modes.
            SearchMode::FilesOnly | SearchMode::CountOnly => false,
        };
        let matcher = MatcherBuilder::new()
            .patterns(self.patterns.clone())
            .kind(self.kind)
            .case_insensitive(self.case_insensitive)
            .invert(self.invert)
            .max_cols(self.max_cols)
            .line_numbers(line_numbers)
            .before_context(self.before_context)
            .after_context(self.after_context)
            .build()?;
        Ok(Arc::from(matcher))
    }

    /// Builds the adaptive file reader over the given buffer pool.
    pub fn reader(&self, pool: Arc<BufferPool>) -> Arc<dyn FileReader> {
        Arc::new(AdaptiveReader::new(pool, self.mmap_threshold))
    }

    /// Builds the parallel walker over the directory roots. Directory
    /// roots are dropped with a warning when `-r` was not given.
    pub fn walker(&self) -> Result<Walker> {
        let mut roots = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            if !self.recursive && path.is_dir() {
                eprintln!(
                    "gg: {}: is a directory (use -r to search it)",
                    path.display(),
                );
                continue;
            }
            roots.push(path.clone());
        }
        let mut overrides = OverridesBuilder::new();
        for glob in &self.globs {
            overrides.add(glob)?;
        }
        Ok(WalkerBuilder::new(roots, overrides.build()?)
            .threads(num_cpus::get())
            .hidden(self.hidden)
            .follow(self.follow)
            .no_ignore(self.no_ignore)
            .build())
    }

    /// The output format, text or JSON.
    pub fn format(&self) -> Format {
        if self.json {
            Format::Json(JsonPrinter::new())
        } else {
            Format::Text(
                Printer::new(self.color)
                    .with_filename(self.with_filename)
                    .line_numbers(self.line_number)
                    .max_cols(self.max_cols),
            )
        }
    }

    pub fn mode(&self) -> SearchMode {
        if self.files_with_matches {
            SearchMode::FilesOnly
        } else if self.count {
            SearchMode::CountOnly
        } else {
            SearchMode::Standard
        }
    }

    /// Number of search workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn mmap_threshold(&self) -> u64 {
        self.mmap_threshold
    }

    /// True when the single input is stdin.
    pub fn search_stdin(&self) -> bool {
        self.paths.len() == 1 && self.paths[0] == Path::new("-")
    }

    /// Builds the overrides-independent component set in one place for
    /// tests.
    #[cfg(test)]
    fn from_argv(argv: Vec<&str>) -> Result<Args> {
        ArgMatches(app::app().get_matches_from_safe(argv)?).to_args()
    }
}

/// ArgMatches wraps clap::ArgMatches and provides semantic meaning to
/// several options/flags.
struct ArgMatches<'a>(clap::ArgMatches<'a>);

impl<'a> ops::Deref for ArgMatches<'a> {
    type Target = clap::ArgMatches<'a>;
    fn deref(&self) -> &clap::ArgMatches<'a> {
        &self.0
    }
}

impl<'a> ArgMatches<'a> {
    /// Convert the result of parsing CLI arguments into gogrep's
    /// configuration.
    fn to_args(&self) -> Result<Args> {
        if self.is_present("fixed-strings") && self.is_present("pcre") {
            return Err("-F and -P are mutually exclusive".into());
        }
        if self.is_present("count") && self.is_present("files-with-matches") {
            return Err("-c and -l are mutually exclusive".into());
        }
        let patterns = self.patterns()?;
        let paths = self.paths();
        let with_filename = self.with_filename(&paths);
        let (before_context, after_context) = self.contexts()?;
        let args = Args {
            case_insensitive: self.case_insensitive(&patterns),
            kind: self.kind(),
            invert: self.is_present("invert-match"),
            recursive: self.is_present("recursive"),
            line_number: self.is_present("line-number"),
            count: self.is_present("count"),
            files_with_matches: self.is_present("files-with-matches"),
            before_context,
            after_context,
            json: self.is_present("json"),
            color: self.color(),
            workers: self.workers()?,
            no_ignore: self.is_present("no-ignore"),
            hidden: self.is_present("hidden"),
            follow: self.is_present("follow"),
            globs: self.values_of_lossy_vec("glob"),
            max_cols: self.max_cols()?,
            mmap_threshold: self.mmap_threshold()?,
            with_filename,
            patterns,
            paths,
        };
        debug!("{:?}", args);
        Ok(args)
    }

    /// Return all file paths that should be searched.
    fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = match self.values_of_os("path") {
            None => vec![],
            Some(vals) => vals.map(|p| Path::new(p).to_path_buf()).collect(),
        };
        // If -e is given, the positional "pattern" is really a path.
        if self.is_present("regexp") {
            if let Some(path) = self.value_of_os("pattern") {
                paths.insert(0, Path::new(path).to_path_buf());
            }
        }
        if paths.is_empty() {
            paths.push(self.default_path());
        }
        paths
    }

    /// The default path: the working directory when stdin is a tty,
    /// stdin otherwise.
    fn default_path(&self) -> PathBuf {
        if atty::is(atty::Stream::Stdin) {
            Path::new("./").to_path_buf()
        } else {
            Path::new("-").to_path_buf()
        }
    }

    /// All patterns from the positional argument and repeated -e flags.
    fn patterns(&self) -> Result<Vec<String>> {
        let mut pats = vec![];
        match self.values_of_os("regexp") {
            Some(os_pats) => {
                for os_pat in os_pats {
                    pats.push(pattern_to_str(os_pat)?.to_string());
                }
            }
            None => {
                if let Some(os_pat) = self.value_of_os("pattern") {
                    pats.push(pattern_to_str(os_pat)?.to_string());
                }
            }
        }
        if pats.is_empty() {
            return Err("no pattern given".into());
        }
        Ok(pats)
    }

    fn kind(&self) -> PatternKind {
        if self.is_present("fixed-strings") {
            PatternKind::Literal
        } else if self.is_present("pcre") {
            PatternKind::Pcre
        } else {
            PatternKind::Regex
        }
    }

    /// `-i`, or `-S` promoted to `-i` when every pattern is free of ASCII
    /// uppercase.
    fn case_insensitive(&self, patterns: &[String]) -> bool {
        if self.is_present("ignore-case") {
            return true;
        }
        self.is_present("smart-case")
            && patterns.iter().all(|p| {
                p.is_ascii() && !p.bytes().any(|b| b.is_ascii_uppercase())
            })
    }

    /// Returns true if and only if file names should prefix each match.
    fn with_filename(&self, paths: &[PathBuf]) -> bool {
        if paths.len() == 1 && paths[0] == Path::new("-") {
            return false;
        }
        paths.len() > 1 || paths.get(0).map_or(false, |p| p.is_dir())
    }

    /// Returns the before and after contexts from the command line.
    fn contexts(&self) -> Result<(usize, usize)> {
        let both = self.context_of("context")?;
        if both > 0 {
            return Ok((both, both));
        }
        Ok((
            self.context_of("before-context")?,
            self.context_of("after-context")?,
        ))
    }

    fn context_of(&self, name: &str) -> Result<usize> {
        match self.value_of_lossy(name) {
            None => Ok(0),
            Some(v) => {
                let n: i64 = v
                    .parse()
                    .map_err(|e| format!("--{}: {}", name, e))?;
                if n < 0 {
                    return Err(format!(
                        "--{}: context length may not be negative",
                        name,
                    )
                    .into());
                }
                Ok(n as usize)
            }
        }
    }

    /// Returns true if and only if the output should be colored.
    fn color(&self) -> bool {
        match self.value_of_lossy("color").as_deref() {
            Some("always") => true,
            Some("never") => false,
            _ => !self.is_present("json") && atty::is(atty::Stream::Stdout),
        }
    }

    /// Number of search workers: `-w`, or twice the CPUs for the mixed
    /// I/O and compute load.
    fn workers(&self) -> Result<usize> {
        match self.value_of_lossy("workers") {
            None => Ok(num_cpus::get() * 2),
            Some(v) => {
                let n: usize =
                    v.parse().map_err(|e| format!("--workers: {}", e))?;
                Ok(if n == 0 { num_cpus::get() * 2 } else { n })
            }
        }
    }

    /// `-M`: 0 and -1 both mean unlimited.
    fn max_cols(&self) -> Result<usize> {
        match self.value_of_lossy("max-columns") {
            None => Ok(0),
            Some(v) => {
                let n: i64 =
                    v.parse().map_err(|e| format!("--max-columns: {}", e))?;
                if n < -1 {
                    return Err("--max-columns may not be less than -1".into());
                }
                Ok(if n <= 0 { 0 } else { n as usize })
            }
        }
    }

    fn mmap_threshold(&self) -> Result<u64> {
        match self.value_of_lossy("mmap-threshold") {
            None => Ok(DEFAULT_MMAP_THRESHOLD),
            Some(v) => {
                v.parse().map_err(|e| format!("--mmap-threshold: {}", e).into())
            }
        }
    }

    /// Like values_of_lossy, but returns an empty vec if the flag is not
    /// present.
    fn values_of_lossy_vec(&self, name: &str) -> Vec<String> {
        self.values_of_lossy(name).unwrap_or_else(Vec::new)
    }
}

fn pattern_to_str(s: &OsStr) -> Result<&str> {
    s.to_str().ok_or_else(|| {
        format!(
            "Argument '{}' is not valid UTF-8. \
             Use hex escape sequences to match arbitrary bytes in a \
             pattern (e.g., \\xFF).",
            s.to_string_lossy(),
        )
        .into()
    })
}
