/*!
The reader module produces the byte buffers that matchers scan. Two
implementations sit behind one trait: a buffered reader that fills pooled
`Vec<u8>` buffers, and a memory map reader for large files. The adaptive
reader in front of them performs a single open+fstat and dispatches on the
configured size threshold.

`FileData` is the release handle from the design: match records hold
offsets into the buffer, so the buffer must outlive all formatting. The
worker hands the `FileData` to the writer inside the search result and the
buffer returns to its pool (or is unmapped) exactly once, when the handle
is dropped after formatting. Empty sets let the worker drop the handle
immediately.

Opens use `O_NOATIME` where the platform has it; the first `EPERM` flips a
process-wide atomic and later opens skip the failed flag entirely. The mmap
path hints sequential access but deliberately avoids populating pages up
front, keeping early-exit modes (files-only, count-only on sparse matches)
cheap.
*/

use std::fs::File;
use std::io::{self, Read};
use std::mem;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use memmap::Mmap;

/// A concurrent pool of reusable byte buffers.
pub struct BufferPool {
    bufs: Mutex<Vec<Vec<u8>>>,
    /// Total number of buffers ever returned; the release discipline tests
    /// key off this.
    returns: AtomicUsize,
}

impl BufferPool {
    pub fn new() -> BufferPool {
        BufferPool { bufs: Mutex::new(vec![]), returns: AtomicUsize::new(0) }
    }

    /// Pops a pooled buffer (or creates one) with room for `len` bytes.
    fn get(&self, len: usize) -> Vec<u8> {
        let mut buf =
            self.bufs.lock().unwrap().pop().unwrap_or_else(Vec::new);
        buf.clear();
        buf.reserve(len);
        buf
    }

    fn put(&self, buf: Vec<u8>) {
        self.returns.fetch_add(1, Ordering::Relaxed);
        self.bufs.lock().unwrap().push(buf);
    }

    /// How many buffers have been released back so far.
    pub fn returned(&self) -> usize {
        self.returns.load(Ordering::Relaxed)
    }
}

/// The backing storage of one scanned file, and its release handle: on
/// drop a pooled buffer returns to its pool and a map is unmapped. Dropping
/// is the one and only release.
pub enum FileData {
    Pooled { buf: Vec<u8>, pool: Arc<BufferPool> },
    Mapped(Mmap),
    Empty,
}

impl FileData {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            FileData::Pooled { ref buf, .. } => buf,
            FileData::Mapped(ref map) => map,
            FileData::Empty => &[],
        }
    }
}

impl Drop for FileData {
    fn drop(&mut self) {
        if let FileData::Pooled { ref mut buf, ref pool } = *self {
            pool.put(mem::take(buf));
        }
    }
}

/// Produces file buffers. Implementations are shared across workers.
pub trait FileReader: Send + Sync {
    /// Opens and reads the file at `path`.
    fn read(&self, path: &Path) -> io::Result<FileData>;

    /// Reads from an already opened descriptor of known size, skipping the
    /// redundant open+fstat.
    fn read_opened(&self, file: File, len: u64) -> io::Result<FileData>;
}

/// Reads whole files into pooled buffers.
pub struct BufferedReader {
    pool: Arc<BufferPool>,
}

impl BufferedReader {
    pub fn new(pool: Arc<BufferPool>) -> BufferedReader {
        BufferedReader { pool }
    }
}

impl FileReader for BufferedReader {
    fn read(&self, path: &Path) -> io::Result<FileData> {
        let file = open_noatime(path)?;
        let len = file.metadata()?.len();
        self.read_opened(file, len)
    }

    fn read_opened(&self, mut file: File, len: u64) -> io::Result<FileData> {
        if len == 0 {
            return Ok(FileData::Empty);
        }
        let mut buf = self.pool.get(len as usize);
        if let Err(err) = file.read_to_end(&mut buf) {
            self.pool.put(buf);
            return Err(err);
        }
        // The descriptor closes here, before the buffer starts its journey
        // through the pipeline.
        drop(file);
        if buf.is_empty() {
            self.pool.put(buf);
            return Ok(FileData::Empty);
        }
        Ok(FileData::Pooled { buf, pool: self.pool.clone() })
    }
}

/// Maps whole files read-only.
pub struct MmapReader;

impl FileReader for MmapReader {
    fn read(&self, path: &Path) -> io::Result<FileData> {
        let file = open_noatime(path)?;
        let len = file.metadata()?.len();
        self.read_opened(file, len)
    }

    fn read_opened(&self, file: File, len: u64) -> io::Result<FileData> {
        if len == 0 {
            // Mapping zero bytes fails; nothing to scan anyway.
            return Ok(FileData::Empty);
        }
        advise_sequential_file(&file);
        let map = unsafe { Mmap::map(&file)? };
        advise_sequential_map(&map);
        Ok(FileData::Mapped(map))
    }
}

/// One open+fstat, then buffered or mapped depending on the file size.
pub struct AdaptiveReader {
    buffered: BufferedReader,
    mmap: MmapReader,
    threshold: u64,
}

impl AdaptiveReader {
    pub fn new(pool: Arc<BufferPool>, mmap_threshold: u64) -> AdaptiveReader {
        AdaptiveReader {
            buffered: BufferedReader::new(pool),
            mmap: MmapReader,
            threshold: mmap_threshold,
        }
    }
}

impl FileReader for AdaptiveReader {
    fn read(&self, path: &Path) -> io::Result<FileData> {
        let file = open_noatime(path)?;
        let len = file.metadata()?.len();
        self.read_opened(file, len)
    }

    fn read_opened(&self, file: File, len: u64) -> io::Result<FileData> {
        if len >= self.threshold {
            self.mmap.read_opened(file, len)
        } else {
            self.buffered.read_opened(file, len)
        }
    }
}

/// Reads all of stdin into a pooled buffer.
pub fn read_stdin(pool: &Arc<BufferPool>) -> io::Result<FileData> {
    let mut buf = pool.get(64 * 1024);
    let stdin = io::stdin();
    stdin.lock().read_to_end(&mut buf)?;
    if buf.is_empty() {
        pool.put(buf);
        return Ok(FileData::Empty);
    }
    Ok(FileData::Pooled { buf, pool: pool.clone() })
}

#[cfg(target_os = "linux")]
fn open_noatime(path: &Path) -> io::Result<File> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;
    use std::sync::atomic::AtomicBool;

    static NOATIME_FAILED: AtomicBool = AtomicBool::new(false);

    if !NOATIME_FAILED.load(Ordering::Relaxed) {
        let res = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOATIME)
            .open(path);
        match res {
            Ok(file) => return Ok(file),
            // Only the owner (or root) may set O_NOATIME; remember the
            // refusal so later opens skip the doomed syscall.
            Err(ref err) if err.raw_os_error() == Some(libc::EPERM) => {
                NOATIME_FAILED.store(true, Ordering::Relaxed);
            }
            Err(err) => return Err(err),
        }
    }
    File::open(path)
}

#[cfg(not(target_os = "linux"))]
fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(target_os = "linux")]
fn advise_sequential_file(file: &File) {
    use std::os::unix::io::AsRawFd;
    unsafe {
        libc::posix_fadvise(
            file.as_raw_fd(),
            0,
            0,
            libc::POSIX_FADV_SEQUENTIAL,
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn advise_sequential_file(_file: &File) {}

#[cfg(unix)]
fn advise_sequential_map(map: &Mmap) {
    unsafe {
        libc::madvise(
            map.as_ptr() as *mut libc::c_void,
            map.len(),
            libc::MADV_SEQUENTIAL,
        );
    }
}

#[cfg(not(unix))]
fn advise_sequential_map(_map: &Mmap) {}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

    fn scratch_file(contents: &[u8]) -> PathBuf {
        let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
        let path = env::temp_dir().join(format!(
            "gogrep-reader-test-{}-{}",
            std::process::id(),
            id,
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn buffered_roundtrip() {
        let path = scratch_file(b"hello buffered world\n");
        let pool = Arc::new(BufferPool::new());
        let reader = BufferedReader::new(pool.clone());
        let data = reader.read(&path).unwrap();
        assert_eq!(data.as_bytes(), b"hello buffered world\n");
        drop(data);
        assert_eq!(pool.returned(), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn pooled_buffer_is_reused() {
        let path = scratch_file(b"some bytes here\n");
        let pool = Arc::new(BufferPool::new());
        let reader = BufferedReader::new(pool.clone());
        for round in 1..=3 {
            let data = reader.read(&path).unwrap();
            assert_eq!(data.as_bytes(), b"some bytes here\n");
            drop(data);
            assert_eq!(pool.returned(), round);
        }
        // All rounds shared one allocation.
        assert_eq!(pool.bufs.lock().unwrap().len(), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn empty_file_has_no_data_and_no_release() {
        let path = scratch_file(b"");
        let pool = Arc::new(BufferPool::new());
        let reader = AdaptiveReader::new(pool.clone(), 1024);
        let data = reader.read(&path).unwrap();
        assert!(data.as_bytes().is_empty());
        drop(data);
        assert_eq!(pool.returned(), 0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn adaptive_dispatches_on_threshold() {
        let small = scratch_file(b"tiny\n");
        let big = scratch_file(&b"0123456789".repeat(100));
        let pool = Arc::new(BufferPool::new());
        let reader = AdaptiveReader::new(pool.clone(), 100);
        match reader.read(&small).unwrap() {
            FileData::Pooled { .. } => {}
            _ => panic!("small file should use the buffered reader"),
        }
        match reader.read(&big).unwrap() {
            FileData::Mapped(ref map) => assert_eq!(map.len(), 1000),
            _ => panic!("large file should be mapped"),
        }
        fs::remove_file(&small).unwrap();
        fs::remove_file(&big).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let pool = Arc::new(BufferPool::new());
        let reader = AdaptiveReader::new(pool, 1024);
        assert!(reader.read(Path::new("/does/not/exist")).is_err());
    }
}
