/*!
The bytestr module provides the byte level search primitives that every
fixed string matcher (and the regex prefilter) is built on. Single byte
operations delegate to memchr/bytecount. Multi byte substring scans use a
first+last byte filter over 32 byte AVX2 windows: candidate positions are
only verified with a scalar compare when both the first and the last byte
of the needle line up. On realistic text this rejects nearly every window
without touching the needle interior.

All offsets are absolute into the haystack. Reported occurrences are sorted
and non-overlapping. The no-match path never allocates.
*/

use memchr::{memchr, memchr2, memchr_iter, memrchr};

#[cfg(target_arch = "x86_64")]
use lazy_static::lazy_static;

#[cfg(target_arch = "x86_64")]
lazy_static! {
    static ref HAS_AVX2: bool = is_x86_feature_detected!("avx2");
}

/// Returns the offset of the first occurrence of `needle` in `hay`.
///
/// An empty needle matches at offset 0. A needle longer than the haystack
/// never matches.
pub fn index(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > hay.len() {
        return None;
    }
    if needle.len() == 1 {
        return memchr(needle[0], hay);
    }
    let mut out = Vec::new();
    scan(hay, needle, false, 1, &mut out);
    out.pop()
}

/// Like `index`, but ASCII case folded. `needle_lc` must already be
/// lowercased by the caller.
pub fn index_ci(hay: &[u8], needle_lc: &[u8]) -> Option<usize> {
    if needle_lc.is_empty() {
        return Some(0);
    }
    if needle_lc.len() > hay.len() {
        return None;
    }
    if needle_lc.len() == 1 {
        let b = needle_lc[0];
        return memchr2(b, b.to_ascii_uppercase(), hay);
    }
    let mut out = Vec::new();
    scan(hay, needle_lc, true, 1, &mut out);
    out.pop()
}

/// Returns the sorted offsets of every non-overlapping occurrence of
/// `needle` in `hay`. An empty needle yields no occurrences.
pub fn index_all(hay: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    if needle.is_empty() || needle.len() > hay.len() {
        return out;
    }
    if needle.len() == 1 {
        out.extend(memchr_iter(needle[0], hay));
        return out;
    }
    scan(hay, needle, false, usize::MAX, &mut out);
    out
}

/// Like `index_all`, but ASCII case folded. `needle_lc` must already be
/// lowercased by the caller.
pub fn index_all_ci(hay: &[u8], needle_lc: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    if needle_lc.is_empty() || needle_lc.len() > hay.len() {
        return out;
    }
    if needle_lc.len() == 1 {
        let b = needle_lc[0];
        if b.is_ascii_lowercase() {
            out.extend(memchr_iter(b, hay));
            out.extend(memchr_iter(b.to_ascii_uppercase(), hay));
            out.sort_unstable();
        } else {
            out.extend(memchr_iter(b, hay));
        }
        return out;
    }
    scan(hay, needle_lc, true, usize::MAX, &mut out);
    out
}

/// Returns the offset of the first occurrence of `b` in `hay`.
#[inline]
pub fn index_byte(hay: &[u8], b: u8) -> Option<usize> {
    memchr(b, hay)
}

/// Returns the offset of the last occurrence of `b` in `hay`.
#[inline]
pub fn last_index_byte(hay: &[u8], b: u8) -> Option<usize> {
    memrchr(b, hay)
}

/// Returns the number of occurrences of `b` in `hay`.
#[inline]
pub fn count_byte(hay: &[u8], b: u8) -> usize {
    bytecount::count(hay, b)
}

/// Dispatches to the vector scan when the host supports it, appending up to
/// `limit` non-overlapping occurrence offsets to `out`.
///
/// Callers guarantee `2 <= needle.len() <= hay.len()`.
fn scan(hay: &[u8], needle: &[u8], ci: bool, limit: usize, out: &mut Vec<usize>) {
    debug_assert!(needle.len() >= 2 && needle.len() <= hay.len());
    #[cfg(target_arch = "x86_64")]
    {
        if *HAS_AVX2 {
            unsafe { scan_avx2(hay, needle, ci, limit, out) };
            return;
        }
    }
    scan_scalar(hay, 0, needle, ci, limit, out, 0);
}

/// Verifies a candidate occurrence at `off` with a scalar compare.
#[inline]
fn verify(hay: &[u8], off: usize, needle: &[u8], ci: bool) -> bool {
    let cand = &hay[off..off + needle.len()];
    if ci {
        cand.iter().zip(needle).all(|(&h, &n)| h.to_ascii_lowercase() == n)
    } else {
        cand == needle
    }
}

/// Scalar fallback used for short haystacks, vector tails and hosts without
/// AVX2. `start` is where scanning begins and `next` the first offset at
/// which an occurrence may start (preserving non-overlap across the vector
/// to scalar hand-off).
fn scan_scalar(
    hay: &[u8],
    start: usize,
    needle: &[u8],
    ci: bool,
    limit: usize,
    out: &mut Vec<usize>,
    mut next: usize,
) {
    let n = needle.len();
    if hay.len() < n {
        return;
    }
    let first = needle[0];
    let last = needle[n - 1];
    for off in start..=hay.len() - n {
        if off < next {
            continue;
        }
        let (h0, h1) = (hay[off], hay[off + n - 1]);
        let head_ok = if ci {
            h0.to_ascii_lowercase() == first
        } else {
            h0 == first
        };
        let tail_ok = if ci {
            h1.to_ascii_lowercase() == last
        } else {
            h1 == last
        };
        if head_ok && tail_ok && verify(hay, off, needle, ci) {
            out.push(off);
            if out.len() >= limit {
                return;
            }
            next = off + n;
        }
    }
}

/// AVX2 scan: broadcast the first and last needle bytes, stream 32 byte
/// windows, AND the two equality masks and verify each surviving bit. In
/// case folded mode each positional mask is the OR of the equality masks of
/// both case variants.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn scan_avx2(
    hay: &[u8],
    needle: &[u8],
    ci: bool,
    limit: usize,
    out: &mut Vec<usize>,
) {
    use std::arch::x86_64::*;

    let n = needle.len();
    let first = needle[0];
    let last = needle[n - 1];
    let vfirst = _mm256_set1_epi8(first as i8);
    let vlast = _mm256_set1_epi8(last as i8);
    // Only meaningful in ci mode; needle bytes are pre-lowered there.
    let vfirst_up = _mm256_set1_epi8(first.to_ascii_uppercase() as i8);
    let vlast_up = _mm256_set1_epi8(last.to_ascii_uppercase() as i8);

    let ptr = hay.as_ptr();
    let mut i = 0usize;
    // The first occurrence may not start before `next`; bits below it are
    // cleared so occurrences never overlap, including across windows.
    let mut next = 0usize;
    while i + 32 + n - 1 <= hay.len() {
        let heads = _mm256_loadu_si256(ptr.add(i) as *const __m256i);
        let tails = _mm256_loadu_si256(ptr.add(i + n - 1) as *const __m256i);
        let eq_head = if ci {
            _mm256_or_si256(
                _mm256_cmpeq_epi8(heads, vfirst),
                _mm256_cmpeq_epi8(heads, vfirst_up),
            )
        } else {
            _mm256_cmpeq_epi8(heads, vfirst)
        };
        let eq_tail = if ci {
            _mm256_or_si256(
                _mm256_cmpeq_epi8(tails, vlast),
                _mm256_cmpeq_epi8(tails, vlast_up),
            )
        } else {
            _mm256_cmpeq_epi8(tails, vlast)
        };
        let mut mask =
            _mm256_movemask_epi8(_mm256_and_si256(eq_head, eq_tail)) as u32;
        while mask != 0 {
            let bit = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            let off = i + bit;
            if off < next {
                continue;
            }
            if verify(hay, off, needle, ci) {
                out.push(off);
                if out.len() >= limit {
                    return;
                }
                next = off + n;
            }
        }
        i += 32;
    }
    scan_scalar(hay, i, needle, ci, limit, out, next);
}
