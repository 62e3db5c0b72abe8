use std::env;
use std::error;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

static TEST_DIR: &str = "gogrep-tests";
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// WorkDir represents a directory in which tests are run.
///
/// Directories are created from a global atomic counter to avoid
/// duplicates.
#[derive(Debug)]
pub struct WorkDir {
    /// The directory in which this test executable is running.
    root: PathBuf,
    /// The directory in which the test should run. If a test needs to
    /// create files, they should go in here.
    dir: PathBuf,
}

impl WorkDir {
    /// Create a new test working directory with the given name. The name
    /// does not need to be distinct for each invocation, but should
    /// correspond to a logical grouping of tests.
    pub fn new(name: &str) -> WorkDir {
        let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
        let mut root = env::current_exe()
            .unwrap()
            .parent()
            .expect("executable's directory")
            .to_path_buf();
        if root.ends_with("deps") {
            root.pop();
        }
        let dir = root.join(TEST_DIR).join(name).join(format!("{}", id));
        nice_err(&dir, repeat(|| fs::create_dir_all(&dir)));
        WorkDir { root, dir }
    }

    /// Create a new file with the given name and contents in this
    /// directory.
    pub fn create<P: AsRef<Path>>(&self, name: P, contents: &str) {
        self.create_bytes(name, contents.as_bytes());
    }

    /// Create a new file with the given name and contents in this
    /// directory.
    pub fn create_bytes<P: AsRef<Path>>(&self, name: P, contents: &[u8]) {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            nice_err(parent, repeat(|| fs::create_dir_all(parent)));
        }
        let mut file = nice_err(&path, File::create(&path));
        nice_err(&path, file.write_all(contents));
        nice_err(&path, file.flush());
    }

    /// Create a new directory with the given path (and any directories
    /// above it) inside this directory.
    pub fn create_dir<P: AsRef<Path>>(&self, path: P) {
        let path = self.dir.join(path);
        nice_err(&path, repeat(|| fs::create_dir_all(&path)));
    }

    /// Creates a new command that is set to use the gg executable in this
    /// working directory, with a hermetic environment for the config-file
    /// pre-pass.
    pub fn command(&self) -> process::Command {
        let mut cmd = process::Command::new(self.bin());
        cmd.current_dir(&self.dir);
        cmd.env_remove("GOGREP_CONFIG_PATH");
        cmd.env("HOME", &self.dir);
        cmd
    }

    /// Returns the path to the gg executable.
    pub fn bin(&self) -> PathBuf {
        self.root.join("gg")
    }

    /// Returns the path to this directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Creates a file symlink to the src with the given target name in
    /// this directory.
    #[cfg(not(windows))]
    pub fn link_file<S: AsRef<Path>, T: AsRef<Path>>(
        &self,
        src: S,
        target: T,
    ) {
        use std::os::unix::fs::symlink;
        let src = self.dir.join(src);
        let target = self.dir.join(target);
        let _ = fs::remove_file(&target);
        nice_err(&target, symlink(&src, &target));
    }

    /// Runs and captures the stdout of the given command.
    ///
    /// If the return type could not be created from a string, then this
    /// panics.
    pub fn stdout<E: fmt::Debug, T: FromStr<Err = E>>(
        &self,
        cmd: &mut process::Command,
    ) -> T {
        let o = self.output(cmd);
        let stdout = String::from_utf8_lossy(&o.stdout);
        match stdout.parse() {
            Ok(t) => t,
            Err(err) => {
                panic!("could not convert from string: {:?}\n\n{}", err, stdout)
            }
        }
    }

    /// Runs the command with the given bytes piped to stdin and captures
    /// stdout.
    pub fn pipe(&self, cmd: &mut process::Command, input: &str) -> String {
        cmd.stdin(process::Stdio::piped());
        cmd.stdout(process::Stdio::piped());
        cmd.stderr(process::Stdio::piped());
        let mut child = cmd.spawn().unwrap();
        child
            .stdin
            .as_mut()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        let o = child.wait_with_output().unwrap();
        String::from_utf8_lossy(&o.stdout).into_owned()
    }

    /// Gets the output of a command. If the command failed, then this
    /// panics.
    pub fn output(&self, cmd: &mut process::Command) -> process::Output {
        let o = cmd.output().unwrap();
        if !o.status.success() {
            let suggest = if o.stderr.is_empty() {
                "\n\nDid your search end up with no results?".to_string()
            } else {
                "".to_string()
            };
            panic!(
                "\n\n==========\n\
                 command failed but expected success!\
                 {}\
                 \n\ncommand: {:?}\
                 \ncwd: {}\
                 \n\nstatus: {}\
                 \n\nstdout: {}\
                 \n\nstderr: {}\
                 \n\n==========\n",
                suggest,
                cmd,
                self.dir.display(),
                o.status,
                String::from_utf8_lossy(&o.stdout),
                String::from_utf8_lossy(&o.stderr),
            );
        }
        o
    }

    /// Runs the given command and asserts that it exited with the given
    /// code.
    pub fn assert_exit_code(&self, cmd: &mut process::Command, code: i32) {
        let o = cmd.output().unwrap();
        assert_eq!(
            o.status.code(),
            Some(code),
            "\n\n===== {:?} =====\n\
             expected exit code {}\
             \n\ncwd: {}\
             \n\nstdout: {}\n\nstderr: {}\
             \n\n=====\n",
            cmd,
            code,
            self.dir.display(),
            String::from_utf8_lossy(&o.stdout),
            String::from_utf8_lossy(&o.stderr),
        );
    }

    /// Runs the given command and asserts that it resulted in an error
    /// exit code.
    pub fn assert_err(&self, cmd: &mut process::Command) {
        let o = cmd.output().unwrap();
        if o.status.success() {
            panic!(
                "\n\n===== {:?} =====\n\
                 command succeeded but expected failure!\
                 \n\ncwd: {}\
                 \n\nstatus: {}\
                 \n\nstdout: {}\n\nstderr: {}\
                 \n\n=====\n",
                cmd,
                self.dir.display(),
                o.status,
                String::from_utf8_lossy(&o.stdout),
                String::from_utf8_lossy(&o.stderr),
            );
        }
    }
}

fn nice_err<P: AsRef<Path>, T, E: error::Error>(
    path: P,
    res: Result<T, E>,
) -> T {
    match res {
        Ok(t) => t,
        Err(err) => panic!("{}: {:?}", path.as_ref().display(), err),
    }
}

fn repeat<F: FnMut() -> io::Result<()>>(mut f: F) -> io::Result<()> {
    let mut last_err = None;
    for _ in 0..10 {
        if let Err(err) = f() {
            last_err = Some(err);
            thread::sleep(Duration::from_millis(500));
        } else {
            return Ok(());
        }
    }
    Err(last_err.unwrap())
}
