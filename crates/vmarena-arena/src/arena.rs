//! Bump allocator over a lazily reserved [`Region`].
//!
//! An [`Arena`] serves memory by advancing a single offset through the
//! committed prefix of its region. It carries no per-allocation metadata,
//! so the only allocation whose size it knows is the most recent one; that
//! is the only allocation it can resize, and it does so in place. Nothing is
//! freed individually: memory comes back through [`Arena::clear_to`].
//!
//! ```text
//! base                 start      offset     committed          reserved
//!  |-------- used -------|-- last --|--- free ---|--- uncommitted ---|
//! ```

use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;

use vmarena_core::{align_offset, AllocError, AllocOp, Allocator, InvalidReason, Resource};

use crate::config::ArenaConfig;
use crate::os::Region;

/// Mutable arena state, borrowed for the duration of a single operation.
#[derive(Debug, Default)]
struct ArenaState {
    region: Region,
    /// Bytes in use from the start of the region.
    offset: usize,
    /// Offset at which the most recent allocation starts. Cleared by every
    /// clear, so a stale pointer can never match it.
    last: Option<usize>,
}

impl ArenaState {
    fn base(&self) -> Result<NonNull<u8>, AllocError> {
        self.region.base().ok_or(AllocError::ResourceExhausted {
            resource: Resource::Reservation,
            requested: 0,
            available: 0,
        })
    }

    /// Make sure `size` more bytes (plus alignment slack) fit in committed
    /// memory, reserving on first use.
    fn grow(&mut self, config: &ArenaConfig, size: usize) -> Result<(), AllocError> {
        let needed = size
            .checked_add(config.alignment)
            .ok_or(AllocError::ResourceExhausted {
                resource: Resource::Reservation,
                requested: size,
                available: self.available(),
            })?;
        if self.offset.saturating_add(needed) <= self.region.committed() {
            return Ok(());
        }
        if !self.region.is_reserved() {
            self.region = Region::reserve(config.reserve_size)?;
        }
        self.region
            .commit(needed.saturating_add(config.commit_increment))
    }

    /// Move the offset to `end`, failing if that passes committed memory.
    fn bump_to(&mut self, end: Option<usize>, requested: usize) -> Result<(), AllocError> {
        match end {
            Some(end) if end <= self.region.committed() => {
                self.offset = end;
                Ok(())
            }
            _ => Err(AllocError::ResourceExhausted {
                resource: Resource::Reservation,
                requested,
                available: self.available(),
            }),
        }
    }

    fn available(&self) -> usize {
        self.region.reserved().saturating_sub(self.offset)
    }
}

/// Pointer-bump allocator backed by reserve-then-commit virtual memory.
///
/// Created unreserved: no address space is claimed until the first
/// allocation. Grows by committing pages, never relocates, and shrinks its
/// physical footprint on [`clear_to`](Arena::clear_to) according to the
/// configured decommit threshold. The region is released on drop.
///
/// An arena is a single-thread object (`!Send`, `!Sync`).
pub struct Arena {
    config: ArenaConfig,
    state: RefCell<ArenaState>,
}

impl Arena {
    /// Create an unreserved arena.
    pub fn new(config: ArenaConfig) -> Result<Self, AllocError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    pub(crate) fn from_validated(config: ArenaConfig) -> Self {
        Self {
            config,
            state: RefCell::new(ArenaState::default()),
        }
    }

    /// Create an arena and reserve its whole address range immediately.
    pub fn with_reserved(config: ArenaConfig) -> Result<Self, AllocError> {
        config.validate()?;
        let region = Region::reserve(config.reserve_size)?;
        Ok(Self {
            config,
            state: RefCell::new(ArenaState {
                region,
                ..ArenaState::default()
            }),
        })
    }

    /// Bump-allocate `size` bytes at the configured alignment.
    ///
    /// Zero-byte requests occupy one byte, so every live allocation starts at
    /// a distinct address and only the newest one matches the resize check.
    pub fn push(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let size = size.max(1);
        let mut st = self.state.borrow_mut();
        st.grow(&self.config, size)?;
        let base = st.base()?;
        let cursor = base.as_ptr().addr() + st.offset;
        let start = st.offset + align_offset(cursor, self.config.alignment);
        st.bump_to(start.checked_add(size), size)?;
        st.last = Some(start);
        Ok(base.map_addr(|addr| addr.saturating_add(start)))
    }

    /// Typed wrapper over [`push`](Arena::push) for `count` values of `T`.
    pub fn alloc_array<T>(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        vmarena_core::alloc_array(self, count)
    }

    /// Resize the most recent allocation in place.
    ///
    /// `ptr` must be the pointer returned by the latest [`push`](Arena::push)
    /// since the last clear. Growing commits more memory if needed; shrinking
    /// moves the offset back, never below one byte. The returned pointer is
    /// always `ptr`.
    pub fn resize_last(
        &self,
        ptr: NonNull<u8>,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let mut st = self.state.borrow_mut();
        let not_last = AllocError::InvalidOperation {
            op: AllocOp::Resize,
            reason: InvalidReason::NotLastAllocation,
        };
        let Some(start) = st.last else {
            return Err(not_last);
        };
        let base = st.base()?;
        if base.as_ptr().addr() + start != ptr.as_ptr().addr() {
            return Err(not_last);
        }

        let new_size = new_size.max(1);
        let current = st.offset - start;
        if new_size <= current {
            st.offset = start + new_size;
            return Ok(ptr);
        }
        let additional = new_size - current;
        st.grow(&self.config, additional)?;
        let end = st.offset.checked_add(additional);
        st.bump_to(end, additional)?;
        Ok(ptr)
    }

    /// Pop the arena back to `target` bytes in use.
    ///
    /// If the arena was using more than the decommit threshold and `target`
    /// falls below it, committed pages past the threshold are returned to the
    /// operating system. The address range stays reserved. The last
    /// allocation is forgotten either way.
    pub fn clear_to(&self, target: usize) -> Result<(), AllocError> {
        let mut st = self.state.borrow_mut();
        if target > st.offset {
            return Err(AllocError::InvalidOperation {
                op: AllocOp::Clear,
                reason: InvalidReason::ClearBeyondOffset,
            });
        }
        let threshold = self.config.decommit_threshold;
        if st.offset > threshold && target < threshold {
            let excess = st.region.committed().saturating_sub(threshold);
            st.region.decommit(excess)?;
        }
        st.offset = target;
        st.last = None;
        Ok(())
    }

    /// Reset to empty. Same as `clear_to(0)`.
    pub fn reset(&self) -> Result<(), AllocError> {
        self.clear_to(0)
    }

    /// Bytes in use.
    pub fn offset(&self) -> usize {
        self.state.borrow().offset
    }

    /// Bytes of committed memory.
    pub fn committed(&self) -> usize {
        self.state.borrow().region.committed()
    }

    /// Bytes of reserved address space (0 until first use).
    pub fn reserved(&self) -> usize {
        self.state.borrow().region.reserved()
    }

    /// Whether the arena has claimed its address range yet.
    pub fn is_reserved(&self) -> bool {
        self.state.borrow().region.is_reserved()
    }

    /// Whether an allocation is currently eligible for in-place resize.
    pub fn has_last_allocation(&self) -> bool {
        self.state.borrow().last.is_some()
    }

    /// The configuration this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::from_validated(ArenaConfig::default())
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Err(err) = self.state.get_mut().region.release() {
            tracing::error!(error = %err, "failed to release arena region");
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("Arena")
            .field("offset", &st.offset)
            .field("committed", &st.region.committed())
            .field("reserved", &st.region.reserved())
            .field("has_last", &st.last.is_some())
            .finish()
    }
}

impl Allocator for Arena {
    fn name(&self) -> &'static str {
        "arena"
    }

    fn alignment(&self) -> usize {
        self.config.alignment
    }

    fn try_allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.push(size)
    }

    /// Arenas infer the size of their last allocation; `old_size` is unused.
    fn try_resize(
        &self,
        ptr: NonNull<u8>,
        _old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        self.resize_last(ptr, new_size)
    }

    fn try_free(&self, _ptr: NonNull<u8>, _size: usize) -> Result<(), AllocError> {
        Err(AllocError::unsupported(AllocOp::Free))
    }

    fn try_clear(&self) -> Result<(), AllocError> {
        self.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmarena_core::{kib, mib, ErrorKind, PAGE_SIZE};

    fn small_config() -> ArenaConfig {
        ArenaConfig {
            reserve_size: mib(4),
            commit_increment: PAGE_SIZE,
            alignment: 8,
            decommit_threshold: kib(16),
        }
    }

    fn assert_invariant(arena: &Arena) {
        assert!(arena.offset() <= arena.committed());
        assert!(arena.committed() <= arena.reserved());
    }

    #[test]
    fn new_arena_is_unreserved() {
        let arena = Arena::default();
        assert!(!arena.is_reserved());
        assert_eq!(arena.reserved(), 0);
        assert_eq!(arena.committed(), 0);
    }

    #[test]
    fn first_push_reserves_lazily() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(100).unwrap();
        assert!(arena.is_reserved());
        assert_eq!(arena.reserved(), mib(4));
        assert_eq!(arena.offset(), 100);
        assert_invariant(&arena);
    }

    #[test]
    fn default_growth_commits_request_plus_increment() {
        let arena = Arena::default();
        arena.push(10).unwrap();
        assert_eq!(arena.reserved(), ArenaConfig::DEFAULT_RESERVE_SIZE);
        assert_eq!(arena.committed(), mib(1) + PAGE_SIZE);
    }

    #[test]
    fn pushes_are_aligned_and_disjoint() {
        let arena = Arena::new(small_config()).unwrap();
        let a = arena.push(3).unwrap();
        let b = arena.push(5).unwrap();
        assert_eq!(a.as_ptr().addr() % 8, 0);
        assert_eq!(b.as_ptr().addr() % 8, 0);
        assert!(b.as_ptr().addr() >= a.as_ptr().addr() + 3);
        assert_eq!(arena.offset(), 8 + 5);
    }

    #[test]
    fn zero_sized_push_occupies_a_byte() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(0).unwrap();
        assert_eq!(arena.offset(), 1);
        assert!(arena.has_last_allocation());
    }

    #[test]
    fn zero_sized_allocation_is_not_mistaken_for_its_successor() {
        let arena = Arena::new(small_config()).unwrap();
        let empty = arena.push(0).unwrap();
        let next = arena.push(16).unwrap();
        assert_ne!(empty, next);
        assert_eq!(
            arena.resize_last(empty, 32).unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(arena.resize_last(next, 32).unwrap(), next);
    }

    #[test]
    fn shrink_to_zero_keeps_the_start_reserved() {
        let arena = Arena::new(small_config()).unwrap();
        let p = arena.push(64).unwrap();
        arena.resize_last(p, 0).unwrap();
        assert_eq!(arena.offset(), 1);
        let q = arena.push(8).unwrap();
        assert_ne!(p, q);
        assert!(arena.resize_last(p, 8).is_err());
    }

    #[test]
    fn resize_last_grows_in_place() {
        let arena = Arena::new(small_config()).unwrap();
        let p = arena.push(64).unwrap();
        let q = arena.resize_last(p, kib(64)).unwrap();
        assert_eq!(p, q);
        assert_eq!(arena.offset(), kib(64));
        assert_invariant(&arena);
    }

    #[test]
    fn resize_last_shrinks_in_place() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(16).unwrap();
        let p = arena.push(100).unwrap();
        assert_eq!(arena.resize_last(p, 40).unwrap(), p);
        assert_eq!(arena.offset(), 16 + 40);
    }

    #[test]
    #[allow(unsafe_code)]
    fn resize_preserves_contents() {
        let arena = Arena::new(small_config()).unwrap();
        let p = arena.push(4).unwrap();
        // SAFETY: p points to 4 committed bytes owned by this test.
        unsafe { p.as_ptr().copy_from_nonoverlapping([1u8, 2, 3, 4].as_ptr(), 4) };
        let q = arena.resize_last(p, kib(128)).unwrap();
        // SAFETY: q == p and the allocation now spans 128 KiB.
        let head = unsafe { std::slice::from_raw_parts(q.as_ptr(), 4) };
        assert_eq!(head, &[1, 2, 3, 4]);
    }

    #[test]
    fn resize_of_older_allocation_is_rejected() {
        let arena = Arena::new(small_config()).unwrap();
        let first = arena.push(32).unwrap();
        arena.push(32).unwrap();
        let err = arena.resize_last(first, 64).unwrap_err();
        assert_eq!(
            err,
            AllocError::InvalidOperation {
                op: AllocOp::Resize,
                reason: InvalidReason::NotLastAllocation,
            }
        );
    }

    #[test]
    fn resize_after_clear_is_rejected() {
        let arena = Arena::new(small_config()).unwrap();
        let p = arena.push(32).unwrap();
        arena.reset().unwrap();
        assert!(!arena.has_last_allocation());
        assert_eq!(
            arena.resize_last(p, 64).unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
    }

    #[test]
    #[should_panic(expected = "not the arena's most recent allocation")]
    fn fatal_resize_of_older_allocation() {
        let arena = Arena::new(small_config()).unwrap();
        let first = arena.push(32).unwrap();
        arena.push(32).unwrap();
        arena.resize(first, 32, 64);
    }

    #[test]
    #[should_panic(expected = "invalid free")]
    fn free_is_fatal() {
        let arena = Arena::new(small_config()).unwrap();
        let p = arena.allocate(8);
        arena.free(p, 8);
    }

    #[test]
    fn clear_resets_offset_and_forgets_last() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(kib(3)).unwrap();
        Allocator::clear(&arena);
        assert_eq!(arena.offset(), 0);
        assert!(!arena.has_last_allocation());
    }

    #[test]
    fn clear_to_pops_to_earlier_offset() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(100).unwrap();
        let mark = arena.offset();
        arena.push(200).unwrap();
        arena.clear_to(mark).unwrap();
        assert_eq!(arena.offset(), mark);
    }

    #[test]
    fn clear_beyond_offset_is_rejected() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(100).unwrap();
        let err = arena.clear_to(200).unwrap_err();
        assert!(matches!(
            err,
            AllocError::InvalidOperation {
                reason: InvalidReason::ClearBeyondOffset,
                ..
            }
        ));
        assert_eq!(arena.offset(), 100);
    }

    #[test]
    fn eight_kib_round_trip_reuses_commit() {
        let config = ArenaConfig {
            reserve_size: kib(8),
            ..ArenaConfig::default()
        };
        let arena = Arena::with_reserved(config).unwrap();
        assert_eq!(arena.reserved(), kib(8));
        assert_eq!(arena.committed(), 0);

        let a = arena.push(kib(3)).unwrap();
        arena.push(kib(3)).unwrap();
        assert_eq!(arena.committed(), kib(8));

        arena.reset().unwrap();
        assert_eq!(arena.offset(), 0);
        assert!(!arena.has_last_allocation());

        let again = arena.push(kib(3)).unwrap();
        assert_eq!(again, a);
        assert_eq!(arena.reserved(), kib(8));
        assert_eq!(arena.committed(), kib(8));
    }

    #[test]
    fn exhausting_the_reservation_fails() {
        let config = ArenaConfig {
            reserve_size: kib(8),
            ..ArenaConfig::default()
        };
        let arena = Arena::new(config).unwrap();
        let err = arena.push(kib(9)).unwrap_err();
        assert!(matches!(
            err,
            AllocError::ResourceExhausted {
                resource: Resource::Reservation,
                ..
            }
        ));
        arena.push(kib(8) - 8).unwrap();
        assert_eq!(arena.push(16).unwrap_err().kind(), ErrorKind::ResourceExhausted);
        assert_invariant(&arena);
    }

    #[test]
    fn clear_above_threshold_decommits_to_threshold() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(kib(100)).unwrap();
        assert!(arena.committed() > kib(16));
        arena.reset().unwrap();
        assert_eq!(arena.committed(), kib(16));
        assert_eq!(arena.reserved(), mib(4));
    }

    #[test]
    fn clear_below_threshold_keeps_commit() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(kib(4)).unwrap();
        let committed = arena.committed();
        arena.reset().unwrap();
        assert_eq!(arena.committed(), committed);
    }

    #[test]
    fn partial_clear_above_threshold_keeps_commit() {
        let arena = Arena::new(small_config()).unwrap();
        arena.push(kib(20)).unwrap();
        arena.push(kib(80)).unwrap();
        let committed = arena.committed();
        arena.clear_to(kib(20)).unwrap();
        assert_eq!(arena.committed(), committed);
    }

    #[test]
    fn zero_threshold_never_decommits() {
        let config = ArenaConfig {
            decommit_threshold: 0,
            ..small_config()
        };
        let arena = Arena::new(config).unwrap();
        arena.push(kib(100)).unwrap();
        let committed = arena.committed();
        arena.reset().unwrap();
        assert_eq!(arena.committed(), committed);
    }

    #[test]
    fn alloc_array_is_typed_push() {
        let arena = Arena::new(small_config()).unwrap();
        let p: NonNull<u64> = arena.alloc_array(10).unwrap();
        assert_eq!(p.as_ptr().addr() % 8, 0);
        assert_eq!(arena.offset(), 80);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ArenaConfig {
            alignment: 6,
            ..ArenaConfig::default()
        };
        assert_eq!(Arena::new(config).unwrap_err().kind(), ErrorKind::InvalidConfig);
    }
}
