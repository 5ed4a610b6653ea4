//! Fixed-capacity arena pools, one per thread.
//!
//! [`ArenaPool`] holds a fixed number of unreserved arenas on a LIFO free
//! list. Acquiring pops the most recently released arena, which is the one
//! most likely to still have resident pages. Releasing clears the arena
//! (applying its decommit threshold) and pushes it back. The pool never
//! grows: running out of slots means arenas are leaking, and is reported as
//! [`Resource::PoolSlots`] exhaustion.
//!
//! Every thread lazily gets its own pool, reachable through
//! [`thread_pool::acquire`] (or [`thread_pool::try_acquire`]). The returned [`PooledArena`] goes back to the
//! calling thread's pool when dropped, and is `!Send` so it cannot leave
//! that thread.

use std::ops::Deref;
use std::ptr::NonNull;

use vmarena_core::{AllocError, AllocOp, Allocator, InvalidReason, Resource};

use crate::arena::Arena;
use crate::config::PoolConfig;

/// A fixed set of arenas with a LIFO free list.
///
/// Arenas start unreserved and claim address space only on their first
/// allocation, so idle slots cost nothing but their descriptors.
#[derive(Debug)]
pub struct ArenaPool {
    /// Free list; the head is the last element.
    free: Vec<Arena>,
    capacity: usize,
}

impl ArenaPool {
    /// Build a pool with `config.slots` unreserved arenas.
    pub fn new(config: PoolConfig) -> Result<Self, AllocError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: PoolConfig) -> Self {
        let free = (0..config.slots)
            .map(|_| Arena::from_validated(config.arena.clone()))
            .collect();
        Self {
            free,
            capacity: config.slots,
        }
    }

    /// Pop the free-list head.
    pub fn acquire(&mut self) -> Result<Arena, AllocError> {
        let arena = self.free.pop().ok_or(AllocError::ResourceExhausted {
            resource: Resource::PoolSlots,
            requested: 1,
            available: 0,
        })?;
        tracing::trace!(in_use = self.in_use(), "acquired pooled arena");
        Ok(arena)
    }

    /// Clear `arena` and push it onto the free-list head.
    ///
    /// Refused with [`InvalidReason::PoolFull`] when no arena is on loan, so
    /// the free list never grows past the pool's capacity. On error the arena
    /// is dropped, which releases its region.
    pub fn release(&mut self, arena: Arena) -> Result<(), AllocError> {
        if self.free.len() >= self.capacity {
            return Err(AllocError::InvalidOperation {
                op: AllocOp::Release,
                reason: InvalidReason::PoolFull,
            });
        }
        arena.reset()?;
        self.free.push(arena);
        tracing::trace!(in_use = self.in_use(), "released pooled arena");
        Ok(())
    }

    /// Arenas ready to be acquired.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Arenas currently handed out.
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.free.len())
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ArenaPool {
    fn default() -> Self {
        Self::from_validated(PoolConfig::default())
    }
}

/// An arena on loan from the current thread's pool.
///
/// Dereferences to [`Arena`] and implements [`Allocator`]. Dropping it clears
/// the arena and returns it to the pool it came from.
#[derive(Debug)]
pub struct PooledArena {
    arena: Option<Arena>,
}

impl PooledArena {
    fn arena(&self) -> &Arena {
        // Only `Drop` takes the arena out.
        match &self.arena {
            Some(arena) => arena,
            None => unreachable!("pooled arena used after release"),
        }
    }
}

impl Deref for PooledArena {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        self.arena()
    }
}

impl Drop for PooledArena {
    fn drop(&mut self) {
        if let Some(arena) = self.arena.take() {
            thread_pool::give_back(arena);
        }
    }
}

impl Allocator for PooledArena {
    fn name(&self) -> &'static str {
        "pooled-arena"
    }

    fn alignment(&self) -> usize {
        self.arena().alignment()
    }

    fn try_allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.arena().try_allocate(size)
    }

    fn try_resize(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        self.arena().try_resize(ptr, old_size, new_size)
    }

    fn try_free(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        self.arena().try_free(ptr, size)
    }

    fn try_clear(&self) -> Result<(), AllocError> {
        self.arena().try_clear()
    }
}

/// The calling thread's arena pool.
pub mod thread_pool {
    use std::cell::RefCell;

    use vmarena_core::{fatal, AllocError};

    use super::{ArenaPool, PooledArena};
    use crate::arena::Arena;

    thread_local! {
        static POOL: RefCell<ArenaPool> = RefCell::new(ArenaPool::default());
    }

    /// Take an arena from this thread's pool.
    ///
    /// Fails with pool-slot exhaustion once every slot is on loan.
    pub fn try_acquire() -> Result<PooledArena, AllocError> {
        let arena = POOL.with(|pool| pool.borrow_mut().acquire())?;
        Ok(PooledArena { arena: Some(arena) })
    }

    /// Like [`try_acquire`], fatal once every slot is on loan.
    #[track_caller]
    pub fn acquire() -> PooledArena {
        try_acquire().unwrap_or_else(|err| fatal(err))
    }

    /// Return `arena` to this thread's pool. Same as dropping it.
    pub fn release(arena: PooledArena) {
        drop(arena);
    }

    /// Arenas this thread can still acquire.
    pub fn available() -> usize {
        POOL.with(|pool| pool.borrow().available())
    }

    /// Arenas this thread currently has on loan.
    pub fn in_use() -> usize {
        POOL.with(|pool| pool.borrow().in_use())
    }

    pub(super) fn give_back(arena: Arena) {
        // During thread teardown the pool may already be gone; the arena
        // then releases its own region on drop.
        let result = POOL.try_with(|pool| pool.borrow_mut().release(arena));
        if let Ok(Err(err)) = result {
            if std::thread::panicking() {
                tracing::error!(error = %err, "failed to return arena to pool");
            } else {
                fatal(err);
            }
        }
    }
}
