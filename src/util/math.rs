//! Numeric helpers for transform sizing and buffer allocation.

use crate::util::{CorrelationError, CorrelationResult};

/// Returns the smallest `n' >= n` whose only prime factors are 2, 3, 5 and 7.
///
/// Mixed-radix FFTs run fastest on these lengths. Returns `None` on overflow.
pub fn next_fast_len(n: usize) -> Option<usize> {
    if n <= 1 {
        return Some(1);
    }
    let mut candidate = n;
    loop {
        if is_7_smooth(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_add(1)?;
    }
}

fn is_7_smooth(mut n: usize) -> bool {
    for p in [2, 3, 5, 7] {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

/// Returns a fast transform length for a full linear correlation.
///
/// The result is at least `template_len + image_len - 1`, so the whole
/// correlation fits without circular wraparound.
pub fn fft_len_for(template_len: usize, image_len: usize) -> CorrelationResult<usize> {
    if template_len == 0 || image_len == 0 {
        return Err(CorrelationError::InvalidInput("lengths must be non-zero"));
    }
    let full = template_len
        .checked_add(image_len - 1)
        .ok_or(CorrelationError::InvalidInput("transform length overflows usize"))?;
    next_fast_len(full).ok_or(CorrelationError::InvalidInput(
        "transform length overflows usize",
    ))
}

/// Allocates a buffer of `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> CorrelationResult<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CorrelationError::Allocation {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    buf.resize(len, value);
    Ok(buf)
}
