//! Amortised-doubling growth policy.

use vmarena_core::{AllocError, Resource};

/// Capacity of the first allocation when fewer than 8 slots are requested.
pub const MIN_CAPACITY: usize = 16;

/// Capacity needed to hold `additional` more slots, or `None` if `capacity`
/// already suffices.
///
/// - Empty storage: `max(2 * additional, MIN_CAPACITY)`.
/// - Otherwise, when `len + additional > capacity`: `2 * (len + additional)`.
pub fn next_capacity(
    capacity: usize,
    len: usize,
    additional: usize,
) -> Result<Option<usize>, AllocError> {
    let overflow = || AllocError::ResourceExhausted {
        resource: Resource::Capacity,
        requested: additional,
        available: usize::MAX - len,
    };
    if capacity == 0 {
        let doubled = additional.checked_mul(2).ok_or_else(overflow)?;
        return Ok(Some(doubled.max(MIN_CAPACITY)));
    }
    let needed = len.checked_add(additional).ok_or_else(overflow)?;
    if needed <= capacity {
        return Ok(None);
    }
    needed.checked_mul(2).ok_or_else(overflow).map(Some)
}
