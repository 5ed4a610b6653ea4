//! Size units and power-of-two alignment arithmetic.

/// Platform page size assumed by commit granularity and threshold checks.
pub const PAGE_SIZE: usize = 4096;

/// `x` kibibytes in bytes.
pub const fn kib(x: usize) -> usize {
    x * 1024
}

/// `x` mebibytes in bytes.
pub const fn mib(x: usize) -> usize {
    kib(x) * 1024
}

/// `x` gibibytes in bytes.
pub const fn gib(x: usize) -> usize {
    mib(x) * 1024
}

/// Whether `x` is a non-zero power of two.
pub const fn is_power_of_two(x: usize) -> bool {
    x != 0 && (x & (x - 1)) == 0
}

/// Bytes to add to `x` to reach the next multiple of `pow2`.
///
/// Returns 0 when `x` is already aligned.
///
/// # Panics
///
/// Panics if `pow2` is not a power of two.
pub fn align_offset(x: usize, pow2: usize) -> usize {
    assert!(is_power_of_two(pow2), "alignment {pow2} is not a power of two");
    let rem = x & (pow2 - 1);
    if rem == 0 {
        0
    } else {
        pow2 - rem
    }
}

/// Round `x` up to the next multiple of `pow2`.
///
/// Returns `None` if the rounded value does not fit in `usize`.
///
/// # Panics
///
/// Panics if `pow2` is not a power of two.
pub fn align_up(x: usize, pow2: usize) -> Option<usize> {
    x.checked_add(align_offset(x, pow2))
}
