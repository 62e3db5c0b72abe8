/*!
Binary file detection. Two independent gates keep binary content out of the
output: a file name filter the walker applies before a file is ever opened,
and a NUL probe over the first 8 KiB of content that the worker applies
after reading. Neither gate produces output; a skipped file simply yields
an empty result.
*/

use std::cmp;
use std::ffi::OsStr;

use crate::bytestr;

/// Extensions that are binary beyond doubt. Checked case-insensitively
/// against the file name's final extension.
const BINARY_EXTENSIONS: &[&str] = &[
    "7z", "a", "apk", "ar", "avi", "bin", "bmp", "bz2", "cab", "class",
    "dat", "deb", "dll", "dmg", "dylib", "ear", "elc", "exe", "flac", "flv",
    "gif", "gz", "ico", "iso", "jar", "jpeg", "jpg", "ko", "lz", "lz4",
    "lzma", "lzo", "m4a", "m4v", "mkv", "mov", "mp3", "mp4", "mpeg", "mpg",
    "msi", "o", "obj", "ogg", "otf", "pdf", "png", "pyc", "pyo", "rar",
    "rlib", "rpm", "so", "swf", "tar", "tbz2", "tgz", "ttf", "war", "wav",
    "webm", "webp", "woff", "woff2", "xz", "zip", "zst",
];

/// How much of a file the content probe inspects.
const NUL_PROBE_LEN: usize = 8 * 1024;

/// Returns true if the file name alone marks the file as binary.
///
/// Versioned shared objects (`libfoo.so.1.2.3`) hide their real extension
/// behind version components, so `.so.` anywhere in the name also counts.
pub fn is_binary_name(name: &OsStr) -> bool {
    let name = match name.to_str() {
        Some(name) => name,
        None => return false,
    };
    if name.contains(".so.") {
        return true;
    }
    match name.rsplit('.').next() {
        Some(ext) if ext.len() < name.len() => BINARY_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        _ => false,
    }
}

/// Returns true if the buffer's leading bytes contain a NUL, the telltale
/// of binary content.
pub fn is_binary_content(buf: &[u8]) -> bool {
    let probe = &buf[..cmp::min(NUL_PROBE_LEN, buf.len())];
    bytestr::index_byte(probe, b'\x00').is_some()
}
