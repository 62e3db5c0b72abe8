/*!
The config module implements the configuration-file pre-pass over the
argument vector. Before clap ever runs, flags are loaded from the file
named by `GOGREP_CONFIG_PATH` (falling back to `~/.gogrep` when that file
exists) and spliced in between `argv[0]` and the real command line, so
anything typed explicitly overrides the file.

The format is one flag (or flag value) per line; `#` starts a comment line
and blank lines are skipped.
*/

use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::PathBuf;

use log::debug;

/// Returns the process argument list with config-file flags spliced in
/// after the program name.
pub fn args_with_config() -> Vec<OsString> {
    let mut argv: Vec<OsString> = env::args_os().collect();
    let extra = match config_path() {
        None => vec![],
        Some(path) => match File::open(&path) {
            Ok(file) => parse(io::BufReader::new(file)),
            Err(err) => {
                debug!("{}: {}", path.display(), err);
                vec![]
            }
        },
    };
    if extra.is_empty() {
        return argv;
    }
    debug!("prepending {} flag(s) from the config file", extra.len());
    let mut out = Vec::with_capacity(argv.len() + extra.len());
    out.push(argv.remove(0));
    out.extend(extra);
    out.extend(argv);
    out
}

/// The config file to read, if any: `GOGREP_CONFIG_PATH` wins, otherwise
/// `~/.gogrep` when it exists.
fn config_path() -> Option<PathBuf> {
    match env::var_os("GOGREP_CONFIG_PATH") {
        Some(ref path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => {
            let fallback =
                PathBuf::from(env::var_os("HOME")?).join(".gogrep");
            if fallback.is_file() {
                Some(fallback)
            } else {
                None
            }
        }
    }
}

fn parse<R: BufRead>(rdr: R) -> Vec<OsString> {
    let mut flags = vec![];
    for line in rdr.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                debug!("error reading config file: {}", err);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        flags.push(OsString::from(line));
    }
    flags
}
