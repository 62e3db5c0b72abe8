/*!
The app module declares the clap application: every flag gg recognises,
with its help text. Interpretation of the matches (defaults, conflicts,
smart case and friends) lives in the args module.
*/

use clap::{App, AppSettings, Arg};

const ABOUT: &str = "\
gg recursively searches directories for lines matching one or more
patterns, respecting gitignore rules.

Project home page: https://github.com/gogrep/gogrep";

const USAGE: &str = "\
    gg [OPTIONS] <PATTERN> [PATH ...]
    gg [OPTIONS] [-e PATTERN ...] [PATH ...]";

pub fn app() -> App<'static, 'static> {
    App::new("gg")
        .version(env!("CARGO_PKG_VERSION"))
        .about(ABOUT)
        .usage(USAGE)
        .max_term_width(100)
        .setting(AppSettings::UnifiedHelpMessage)
        .arg(
            Arg::with_name("pattern")
                .help("A pattern to search for.")
                .index(1),
        )
        .arg(
            Arg::with_name("path")
                .help("Files or directories to search.")
                .index(2)
                .multiple(true),
        )
        .arg(
            Arg::with_name("regexp")
                .short("e")
                .long("regexp")
                .value_name("PATTERN")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("A pattern to search for; may be repeated."),
        )
        .arg(
            Arg::with_name("fixed-strings")
                .short("F")
                .long("fixed-strings")
                .help("Treat all patterns as literals instead of regexes."),
        )
        .arg(
            Arg::with_name("pcre")
                .short("P")
                .long("pcre")
                .help(
                    "Use the PCRE engine, enabling lookaround and \
                     backreferences.",
                ),
        )
        .arg(
            Arg::with_name("ignore-case")
                .short("i")
                .long("ignore-case")
                .help("Case insensitive search (ASCII)."),
        )
        .arg(
            Arg::with_name("smart-case")
                .short("S")
                .long("smart-case")
                .help(
                    "Case insensitive search if all patterns are lowercase.",
                ),
        )
        .arg(
            Arg::with_name("recursive")
                .short("r")
                .long("recursive")
                .help("Recurse into directories."),
        )
        .arg(
            Arg::with_name("line-number")
                .short("n")
                .long("line-number")
                .help("Show line numbers (1-based)."),
        )
        .arg(
            Arg::with_name("count")
                .short("c")
                .long("count")
                .help("Only show the count of matching lines per file."),
        )
        .arg(
            Arg::with_name("invert-match")
                .short("v")
                .long("invert-match")
                .help("Show lines that do not match the given patterns."),
        )
        .arg(
            Arg::with_name("files-with-matches")
                .short("l")
                .long("files-with-matches")
                .help("Only show the path of each file with at least one match."),
        )
        .arg(
            Arg::with_name("after-context")
                .short("A")
                .long("after-context")
                .value_name("NUM")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Show NUM lines after each match."),
        )
        .arg(
            Arg::with_name("before-context")
                .short("B")
                .long("before-context")
                .value_name("NUM")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Show NUM lines before each match."),
        )
        .arg(
            Arg::with_name("context")
                .short("C")
                .long("context")
                .value_name("NUM")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Show NUM lines before and after each match."),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Emit matches as newline delimited JSON objects."),
        )
        .arg(
            Arg::with_name("color")
                .long("color")
                .value_name("WHEN")
                .takes_value(true)
                .possible_values(&["auto", "always", "never"])
                .default_value("auto")
                .help("When to use colors in the output."),
        )
        .arg(
            Arg::with_name("workers")
                .short("w")
                .long("workers")
                .value_name("NUM")
                .takes_value(true)
                .help("Number of search workers. Defaults to twice the CPUs."),
        )
        .arg(
            Arg::with_name("no-ignore")
                .long("no-ignore")
                .help("Do not respect .gitignore files."),
        )
        .arg(
            Arg::with_name("hidden")
                .long("hidden")
                .help("Search hidden files and directories."),
        )
        .arg(
            Arg::with_name("follow")
                .long("follow")
                .help("Follow symbolic links."),
        )
        .arg(
            Arg::with_name("glob")
                .short("g")
                .long("glob")
                .value_name("GLOB")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help(
                    "Only search files matching GLOB. Precede with ! to \
                     exclude instead. May be repeated.",
                ),
        )
        .arg(
            Arg::with_name("max-columns")
                .short("M")
                .long("max-columns")
                .value_name("NUM")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Limit displayed line width to NUM columns (-1 = unlimited)."),
        )
        .arg(
            Arg::with_name("mmap-threshold")
                .long("mmap-threshold")
                .value_name("BYTES")
                .takes_value(true)
                .help("File size at which memory maps replace read calls."),
        )
        .arg(
            Arg::with_name("watch")
                .long("watch")
                .help("Keep watching the inputs for appended matches."),
        )
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .help("Show debug messages."),
        )
}
