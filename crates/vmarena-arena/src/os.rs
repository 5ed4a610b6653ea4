//! Page-granular virtual memory: reserve, commit, decommit, release.
//!
//! A [`Region`] is a contiguous range of address space claimed from the
//! operating system without backing storage. Pages are committed from the
//! front of the range as they are needed and decommitted from the back when
//! they are no longer wanted, so the base address never moves.
//!
//! Unix uses `mmap(PROT_NONE)` to reserve and `mprotect` to commit; pages are
//! given back with `madvise(MADV_DONTNEED)`. Windows uses `VirtualAlloc` and
//! `VirtualFree` with the matching reserve/commit/decommit flags.

use std::fmt;
use std::ptr::{self, NonNull};

use vmarena_core::{align_up, AllocError, Resource, PAGE_SIZE};

/// A reserved address range with a committed prefix.
///
/// Invariant: `0 <= committed <= reserved`, both multiples of [`PAGE_SIZE`].
/// The default value is an unreserved region with a null base.
pub struct Region {
    base: *mut u8,
    committed: usize,
    reserved: usize,
}

impl Region {
    /// A region that owns no address space.
    pub const fn unreserved() -> Self {
        Self {
            base: ptr::null_mut(),
            committed: 0,
            reserved: 0,
        }
    }

    /// Reserve `size` bytes of address space, rounded up to whole pages.
    ///
    /// Nothing is committed; touching the range before [`commit`](Self::commit)
    /// faults.
    pub fn reserve(size: usize) -> Result<Self, AllocError> {
        let reserved = page_round(size, Resource::Reservation)?;
        if reserved == 0 {
            return Err(AllocError::InvalidConfig {
                reason: "cannot reserve an empty region".into(),
            });
        }
        let base = sys::reserve(reserved)?;
        tracing::debug!(reserved, "reserved region");
        Ok(Self {
            base,
            committed: 0,
            reserved,
        })
    }

    /// Commit `size` more bytes (rounded up to pages) after the committed prefix.
    ///
    /// The new committed length is clamped to the reservation. Fails with
    /// [`Resource::Reservation`] exhaustion when no headroom is left at all.
    pub fn commit(&mut self, size: usize) -> Result<(), AllocError> {
        let size = page_round(size, Resource::Commit)?;
        let new_committed = self.committed.saturating_add(size).min(self.reserved);
        let delta = new_committed - self.committed;
        if delta == 0 {
            return Err(AllocError::ResourceExhausted {
                resource: Resource::Reservation,
                requested: size,
                available: 0,
            });
        }
        sys::commit(self.base.wrapping_add(self.committed), delta)?;
        self.committed = new_committed;
        tracing::debug!(delta, committed = self.committed, "committed pages");
        Ok(())
    }

    /// Return the trailing `size` bytes (rounded up, clamped to the committed
    /// length) to the operating system. The address range stays reserved.
    pub fn decommit(&mut self, size: usize) -> Result<(), AllocError> {
        let size = page_round(size, Resource::Commit)?.min(self.committed);
        if size == 0 {
            return Ok(());
        }
        let new_committed = self.committed - size;
        sys::decommit(self.base.wrapping_add(new_committed), size)?;
        self.committed = new_committed;
        tracing::debug!(size, committed = self.committed, "decommitted pages");
        Ok(())
    }

    /// Give the whole range back and reset this descriptor to unreserved.
    ///
    /// Releasing an unreserved region does nothing.
    pub fn release(&mut self) -> Result<(), AllocError> {
        if !self.is_reserved() {
            return Ok(());
        }
        sys::release(self.base, self.reserved)?;
        tracing::debug!(reserved = self.reserved, "released region");
        *self = Self::unreserved();
        Ok(())
    }

    /// Whether this region currently owns address space.
    pub fn is_reserved(&self) -> bool {
        !self.base.is_null()
    }

    /// Start of the range, if reserved.
    pub fn base(&self) -> Option<NonNull<u8>> {
        NonNull::new(self.base)
    }

    /// Bytes of the range backed by memory.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Bytes of address space claimed.
    pub fn reserved(&self) -> usize {
        self.reserved
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::unreserved()
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base)
            .field("committed", &self.committed)
            .field("reserved", &self.reserved)
            .finish()
    }
}

fn page_round(size: usize, resource: Resource) -> Result<usize, AllocError> {
    align_up(size, PAGE_SIZE).ok_or(AllocError::ResourceExhausted {
        resource,
        requested: size,
        available: 0,
    })
}

#[cfg(unix)]
#[allow(unsafe_code)]
mod sys {
    use std::ptr;

    use vmarena_core::AllocError;

    pub(super) fn reserve(size: usize) -> Result<*mut u8, AllocError> {
        // SAFETY: anonymous private mapping at a kernel-chosen address; no
        // existing memory is affected.
        let p = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if p == libc::MAP_FAILED {
            return Err(AllocError::last_os_error("mmap"));
        }
        Ok(p.cast())
    }

    pub(super) fn commit(p: *mut u8, size: usize) -> Result<(), AllocError> {
        // SAFETY: [p, p + size) lies inside a mapping created by `reserve`
        // and is page aligned.
        if unsafe { libc::mprotect(p.cast(), size, libc::PROT_READ | libc::PROT_WRITE) } != 0 {
            return Err(AllocError::last_os_error("mprotect"));
        }
        Ok(())
    }

    pub(super) fn decommit(p: *mut u8, size: usize) -> Result<(), AllocError> {
        // SAFETY: [p, p + size) is a committed, page-aligned tail of a mapping
        // created by `reserve`. No live allocation points past the new
        // committed length.
        if unsafe { libc::madvise(p.cast(), size, libc::MADV_DONTNEED) } != 0 {
            return Err(AllocError::last_os_error("madvise"));
        }
        // SAFETY: same range as above.
        if unsafe { libc::mprotect(p.cast(), size, libc::PROT_NONE) } != 0 {
            return Err(AllocError::last_os_error("mprotect"));
        }
        Ok(())
    }

    pub(super) fn release(p: *mut u8, size: usize) -> Result<(), AllocError> {
        // SAFETY: p and size describe exactly one mapping from `reserve`.
        if unsafe { libc::munmap(p.cast(), size) } != 0 {
            return Err(AllocError::last_os_error("munmap"));
        }
        Ok(())
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
mod sys {
    use std::ptr;

    use vmarena_core::AllocError;
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE,
        PAGE_READWRITE,
    };

    pub(super) fn reserve(size: usize) -> Result<*mut u8, AllocError> {
        // SAFETY: reserving at a system-chosen address touches no existing memory.
        let p = unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_READWRITE) };
        if p.is_null() {
            return Err(AllocError::last_os_error("VirtualAlloc(MEM_RESERVE)"));
        }
        Ok(p.cast())
    }

    pub(super) fn commit(p: *mut u8, size: usize) -> Result<(), AllocError> {
        // SAFETY: [p, p + size) lies inside a reservation from `reserve`.
        let r = unsafe { VirtualAlloc(p.cast_const().cast(), size, MEM_COMMIT, PAGE_READWRITE) };
        if r.is_null() {
            return Err(AllocError::last_os_error("VirtualAlloc(MEM_COMMIT)"));
        }
        Ok(())
    }

    pub(super) fn decommit(p: *mut u8, size: usize) -> Result<(), AllocError> {
        // SAFETY: [p, p + size) is a committed tail of a reservation from `reserve`.
        if unsafe { VirtualFree(p.cast(), size, MEM_DECOMMIT) } == 0 {
            return Err(AllocError::last_os_error("VirtualFree(MEM_DECOMMIT)"));
        }
        Ok(())
    }

    pub(super) fn release(p: *mut u8, _size: usize) -> Result<(), AllocError> {
        // SAFETY: p is the base of a reservation from `reserve`; MEM_RELEASE
        // requires a zero size.
        if unsafe { VirtualFree(p.cast(), 0, MEM_RELEASE) } == 0 {
            return Err(AllocError::last_os_error("VirtualFree(MEM_RELEASE)"));
        }
        Ok(())
    }
}
