/*!
This module contains *integration* tests. Their purpose is to test the CLI
interface. Namely, that passing a flag does what it says on the tin.

Tests for more fine grained behavior (like the matchers or the globber)
should be unit tests in their respective modules.
*/

#![allow(dead_code, unused_imports)]

use std::process::Command;

use workdir::WorkDir;

mod workdir;

macro_rules! orchard {
    ($name:ident, $fun:expr) => {
        orchard!($name, "apple", $fun);
    };
    ($name:ident, $query:expr, $fun:expr) => {
        orchard!($name, $query, "orchard", $fun);
    };
    ($name:ident, $query:expr, $path:expr, $fun:expr) => {
        #[test]
        fn $name() {
            let wd = WorkDir::new(stringify!($name));
            wd.create("orchard", hay::ORCHARD);
            let mut cmd = wd.command();
            cmd.arg($query).arg($path);
            $fun(wd, cmd);
        }
    };
}

fn sort_lines(lines: &str) -> String {
    let mut lines: Vec<String> =
        lines.trim().lines().map(|s| s.to_owned()).collect();
    lines.sort();
    format!("{}\n", lines.join("\n"))
}

orchard!(single_file, |wd: WorkDir, mut cmd| {
    let lines: String = wd.stdout(&mut cmd);
    let expected = "\
apples drop when nobody watches
an apple a day is the local rule
wasps circle the windfall apples
";
    assert_eq!(lines, expected);
});

orchard!(line_numbers, |wd: WorkDir, mut cmd: Command| {
    cmd.arg("-n");
    let lines: String = wd.stdout(&mut cmd);
    let expected = "\
2:apples drop when nobody watches
4:an apple a day is the local rule
5:wasps circle the windfall apples
";
    assert_eq!(lines, expected);
});

orchard!(directory_search_prefixes_filenames, "apple", ".",
|wd: WorkDir, mut cmd: Command| {
    cmd.arg("-r").arg("-n");
    let lines: String = wd.stdout(&mut cmd);
    let expected = "\
orchard:2:apples drop when nobody watches
orchard:4:an apple a day is the local rule
orchard:5:wasps circle the windfall apples
";
    assert_eq!(lines, expected);
});

orchard!(count_only, |wd: WorkDir, mut cmd: Command| {
    cmd.arg("-c");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "3\n");
});

orchard!(count_with_filename, "apple", ".", |wd: WorkDir, mut cmd: Command| {
    cmd.arg("-r").arg("-c");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "orchard:3\n");
});

orchard!(ignore_case, "APPLE", |wd: WorkDir, mut cmd: Command| {
    cmd.arg("-i").arg("-F").arg("-c");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "3\n");
});

#[test]
fn multiple_patterns() {
    let wd = WorkDir::new("multiple_patterns");
    wd.create("orchard", hay::ORCHARD);
    let mut cmd = wd.command();
    cmd.arg("-n").arg("-e").arg("gate").arg("-e").arg("cider").arg("orchard");
    let lines: String = wd.stdout(&mut cmd);
    let expected = "\
1:the orchard gate swings open at dawn
3:the cider press waits in the barn
6:the gate closes itself by dusk
";
    assert_eq!(lines, expected);
}

orchard!(regex_inline_case_flag, "(?i)APPLE", |wd: WorkDir, mut cmd: Command| {
    cmd.arg("-c");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "3\n");
});

orchard!(no_match_exits_one, "pomegranate", |wd: WorkDir, mut cmd: Command| {
    wd.assert_exit_code(&mut cmd, 1);
});

// S1: fixed single literal with line numbers.
#[test]
fn scenario_fixed_single() {
    let wd = WorkDir::new("scenario_fixed_single");
    wd.create("a.txt", "apple\nbanana\ncherry\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("-n").arg("banana").arg("a.txt");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "2:banana\n");
}

// S2: several literals go through the multi matcher.
#[test]
fn scenario_multi_literal() {
    let wd = WorkDir::new("scenario_multi_literal");
    wd.create("a.txt", "apple\nbanana\ncherry\n");
    let mut cmd = wd.command();
    cmd.arg("-F")
        .arg("-n")
        .arg("-e")
        .arg("apple")
        .arg("-e")
        .arg("cherry")
        .arg("a.txt");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "1:apple\n3:cherry\n");
}

// S3: a regex whose required literal drives the prefilter.
#[test]
fn scenario_regex_prefilter() {
    let wd = WorkDir::new("scenario_regex_prefilter");
    wd.create("log", "connection timeout\nok\nread timeout here\n");
    let mut cmd = wd.command();
    cmd.arg("-n").arg(".*timeout").arg("log");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "1:connection timeout\n3:read timeout here\n");
}

// S4: before/after context with `-` separators.
#[test]
fn scenario_context() {
    let wd = WorkDir::new("scenario_context");
    wd.create("ctx", "a\nb\nmiddle\nd\ne\n");
    let mut cmd = wd.command();
    cmd.arg("-F")
        .arg("-n")
        .arg("-B")
        .arg("1")
        .arg("-A")
        .arg("1")
        .arg("middle")
        .arg("ctx");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "2-b\n3:middle\n4-d\n");
}

// S5: files-with-matches over a directory.
#[test]
fn scenario_files_only() {
    let wd = WorkDir::new("scenario_files_only");
    wd.create("x.txt", "hello\n");
    wd.create("y.txt", "world\n");
    let mut cmd = wd.command();
    cmd.arg("-r").arg("-l").arg("hello").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "x.txt\n");
}

// S6: inverted match.
#[test]
fn scenario_invert() {
    let wd = WorkDir::new("scenario_invert");
    wd.create("inv", "hello\nworld\nhello again\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("-v").arg("hello").arg("inv");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "world\n");
}

// S7: a NUL in the first bytes silences the file entirely.
#[test]
fn scenario_binary_skip() {
    let wd = WorkDir::new("scenario_binary_skip");
    wd.create_bytes("data", b"text\n\x00binary\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("text").arg("data");
    wd.assert_exit_code(&mut cmd, 1);
    let out = cmd.output().unwrap();
    assert!(out.stdout.is_empty());
}

// S8: PCRE lookahead.
#[test]
fn scenario_pcre_lookahead() {
    let wd = WorkDir::new("scenario_pcre_lookahead");
    wd.create("pc", "hello world\nfoo bar\n");
    let mut cmd = wd.command();
    cmd.arg("-P").arg(r"\w+(?=\s+world)").arg("pc");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "hello world\n");
}

#[test]
fn context_groups_are_separated() {
    let wd = WorkDir::new("context_groups_are_separated");
    wd.create("g", "hit\nx\nx\nx\nhit\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("-n").arg("-C").arg("1").arg("hit").arg("g");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "1:hit\n2-x\n--\n4-x\n5:hit\n");
}

#[test]
fn gitignore_is_respected() {
    let wd = WorkDir::new("gitignore_is_respected");
    wd.create(".gitignore", "*.log\n");
    wd.create("keep.txt", "needle\n");
    wd.create("drop.log", "needle\n");
    let mut cmd = wd.command();
    cmd.arg("-r").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "keep.txt:needle\n");
}

#[test]
fn no_ignore_searches_everything() {
    let wd = WorkDir::new("no_ignore_searches_everything");
    wd.create(".gitignore", "*.log\n");
    wd.create("keep.txt", "needle\n");
    wd.create("drop.log", "needle\n");
    let mut cmd = wd.command();
    cmd.arg("-r").arg("--no-ignore").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(
        sort_lines(&lines),
        "drop.log:needle\nkeep.txt:needle\n",
    );
}

#[test]
fn nested_gitignore_inherits() {
    let wd = WorkDir::new("nested_gitignore_inherits");
    wd.create(".gitignore", "*.log\n");
    wd.create("sub/note.log", "needle\n");
    wd.create("sub/note.txt", "needle\n");
    let mut cmd = wd.command();
    cmd.arg("-r").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "sub/note.txt:needle\n");
}

#[test]
fn hidden_files_need_the_flag() {
    let wd = WorkDir::new("hidden_files_need_the_flag");
    wd.create(".secret", "needle\n");
    let mut cmd = wd.command();
    cmd.arg("-r").arg("needle").arg(".");
    wd.assert_exit_code(&mut cmd, 1);
    let mut cmd = wd.command();
    cmd.arg("-r").arg("--hidden").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, ".secret:needle\n");
}

#[test]
fn glob_includes_and_excludes() {
    let wd = WorkDir::new("glob_includes_and_excludes");
    wd.create("a.rs", "needle\n");
    wd.create("b.txt", "needle\n");
    let mut cmd = wd.command();
    cmd.arg("-r").arg("-g").arg("*.rs").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "a.rs:needle\n");

    let mut cmd = wd.command();
    cmd.arg("-r").arg("-g").arg("!*.txt").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "a.rs:needle\n");
}

#[test]
fn smart_case() {
    let wd = WorkDir::new("smart_case");
    wd.create("sc", "Apple pie\n");
    let mut cmd = wd.command();
    cmd.arg("-S").arg("-F").arg("apple").arg("sc");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "Apple pie\n");

    // An uppercase pattern stays case sensitive.
    wd.create("sc2", "apple pie\n");
    let mut cmd = wd.command();
    cmd.arg("-S").arg("-F").arg("Apple").arg("sc2");
    wd.assert_exit_code(&mut cmd, 1);
}

#[test]
fn json_output() {
    let wd = WorkDir::new("json_output");
    wd.create("j.txt", "apple pie\n");
    let mut cmd = wd.command();
    cmd.arg("--json").arg("-F").arg("apple").arg("j.txt");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(
        lines,
        "{\"type\":\"match\",\"file\":\"j.txt\",\"line_number\":1,\
         \"byte_offset\":0,\"text\":\"apple pie\",\
         \"matches\":[{\"start\":0,\"end\":5}]}\n",
    );
}

#[test]
fn json_skips_context_lines() {
    let wd = WorkDir::new("json_skips_context_lines");
    wd.create("j.txt", "before\napple\nafter\n");
    let mut cmd = wd.command();
    cmd.arg("--json").arg("-C").arg("1").arg("-F").arg("apple").arg("j.txt");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines.lines().count(), 1);
    assert!(lines.contains("\"text\":\"apple\""));
}

#[test]
fn config_file_pre_pass() {
    let wd = WorkDir::new("config_file_pre_pass");
    wd.create("conf", "# numbered output, always\n-n\n");
    wd.create("c.txt", "one\napple\n");
    let mut cmd = wd.command();
    cmd.env("GOGREP_CONFIG_PATH", wd.path().join("conf"));
    cmd.arg("-F").arg("apple").arg("c.txt");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "2:apple\n");
}

#[test]
fn home_config_fallback() {
    let wd = WorkDir::new("home_config_fallback");
    // WorkDir::command points HOME at the scratch dir.
    wd.create(".gogrep", "-n\n");
    wd.create("c.txt", "one\napple\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("apple").arg("c.txt");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "2:apple\n");
}

#[test]
fn stdin_search() {
    let wd = WorkDir::new("stdin_search");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("hello");
    let out = wd.pipe(&mut cmd, "hello\nworld\nhello again\n");
    assert_eq!(out, "hello\nhello again\n");
}

#[test]
fn explicit_file_list_order() {
    let wd = WorkDir::new("explicit_file_list_order");
    wd.create("a.txt", "apple\n");
    wd.create("b.txt", "apple\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("-n").arg("apple").arg("a.txt").arg("b.txt");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "a.txt:1:apple\nb.txt:1:apple\n");
}

#[test]
fn symlinks_follow_flag() {
    let wd = WorkDir::new("symlinks_follow_flag");
    wd.create("real.txt", "needle\n");
    wd.link_file("real.txt", "alias.txt");
    let mut cmd = wd.command();
    cmd.arg("-r").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "real.txt:needle\n");

    let mut cmd = wd.command();
    cmd.arg("-r").arg("--follow").arg("needle").arg(".");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(
        sort_lines(&lines),
        "alias.txt:needle\nreal.txt:needle\n",
    );
}

#[test]
fn max_columns_windows_long_lines() {
    let wd = WorkDir::new("max_columns_windows_long_lines");
    let mut line = "x".repeat(500);
    line.push_str("needle");
    line.push_str(&"y".repeat(500));
    line.push('\n');
    wd.create("long", &line);
    let mut cmd = wd.command();
    cmd.arg("-F").arg("-M").arg("30").arg("needle").arg("long");
    let lines: String = wd.stdout(&mut cmd);
    assert!(lines.len() <= 31, "got {} bytes", lines.len());
    assert!(lines.contains("needle"));
}

#[test]
fn directory_without_recursive_warns() {
    let wd = WorkDir::new("directory_without_recursive_warns");
    wd.create("sub/f.txt", "needle\n");
    let mut cmd = wd.command();
    cmd.arg("needle").arg("sub");
    wd.assert_exit_code(&mut cmd, 1);
    let out = cmd.output().unwrap();
    assert!(String::from_utf8_lossy(&out.stderr).contains("is a directory"));
}

#[test]
fn conflicting_engines_exit_two() {
    let wd = WorkDir::new("conflicting_engines_exit_two");
    wd.create("f", "x\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("-P").arg("pat").arg("f");
    wd.assert_exit_code(&mut cmd, 2);
}

#[test]
fn conflicting_modes_exit_two() {
    let wd = WorkDir::new("conflicting_modes_exit_two");
    wd.create("f", "x\n");
    let mut cmd = wd.command();
    cmd.arg("-c").arg("-l").arg("pat").arg("f");
    wd.assert_exit_code(&mut cmd, 2);
}

#[test]
fn negative_context_exits_two() {
    let wd = WorkDir::new("negative_context_exits_two");
    wd.create("f", "x\n");
    let mut cmd = wd.command();
    cmd.arg("-A").arg("-2").arg("pat").arg("f");
    wd.assert_exit_code(&mut cmd, 2);
}

#[test]
fn invalid_regex_exits_two() {
    let wd = WorkDir::new("invalid_regex_exits_two");
    wd.create("f", "x\n");
    let mut cmd = wd.command();
    cmd.arg("a(").arg("f");
    wd.assert_exit_code(&mut cmd, 2);
}

#[test]
fn watch_mode_reports_unavailable() {
    let wd = WorkDir::new("watch_mode_reports_unavailable");
    wd.create("f", "x\n");
    let mut cmd = wd.command();
    cmd.arg("--watch").arg("pat").arg("f");
    wd.assert_exit_code(&mut cmd, 2);
}

#[test]
fn missing_file_warns_but_searches_the_rest() {
    let wd = WorkDir::new("missing_file_warns_but_searches_the_rest");
    wd.create("here.txt", "needle\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("needle").arg("gone.txt").arg("here.txt");
    let out = cmd.output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout, "here.txt:needle\n");
    assert!(String::from_utf8_lossy(&out.stderr).contains("gone.txt"));
}

#[test]
fn inverted_count() {
    let wd = WorkDir::new("inverted_count");
    wd.create("f", "keep\ndrop\nkeep\n");
    let mut cmd = wd.command();
    cmd.arg("-F").arg("-c").arg("-v").arg("keep").arg("f");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "1\n");
}

#[test]
fn large_file_goes_through_mmap() {
    let wd = WorkDir::new("large_file_goes_through_mmap");
    let mut contents = String::new();
    for i in 0..5000 {
        contents.push_str(&format!("filler line number {}\n", i));
    }
    contents.push_str("the needle sits near the end\n");
    wd.create("big", &contents);
    let mut cmd = wd.command();
    // Force the mapped path with a tiny threshold.
    cmd.arg("--mmap-threshold").arg("1024").arg("-F").arg("needle").arg("big");
    let lines: String = wd.stdout(&mut cmd);
    assert_eq!(lines, "the needle sits near the end\n");
}
