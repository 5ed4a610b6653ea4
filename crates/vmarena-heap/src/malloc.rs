//! Allocator backed by the C runtime's `malloc` family.

use std::mem::size_of;
use std::ptr::NonNull;

use vmarena_core::{AllocError, AllocOp, Allocator, Resource};

/// General-purpose backend over `malloc`, `realloc` and `free`.
///
/// Sizes passed to Resize and Free are ignored; the C runtime tracks them.
/// Zero-byte requests are rounded up to one byte.
#[derive(Clone, Copy, Debug, Default)]
pub struct MallocAllocator;

impl MallocAllocator {
    /// Alignment `malloc` guarantees on every supported platform.
    pub const ALIGNMENT: usize = 2 * size_of::<usize>();

    fn exhausted(size: usize) -> AllocError {
        AllocError::ResourceExhausted {
            resource: Resource::Commit,
            requested: size,
            available: 0,
        }
    }
}

#[allow(unsafe_code)]
impl Allocator for MallocAllocator {
    fn name(&self) -> &'static str {
        "malloc"
    }

    fn alignment(&self) -> usize {
        Self::ALIGNMENT
    }

    fn try_allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: malloc has no preconditions.
        let p = unsafe { libc::malloc(size.max(1)) };
        let p = NonNull::new(p.cast()).ok_or_else(|| Self::exhausted(size))?;
        tracing::trace!(size, "malloc block allocated");
        Ok(p)
    }

    fn try_resize(
        &self,
        ptr: NonNull<u8>,
        _old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: ptr came from malloc/realloc and has not been freed. On
        // failure realloc leaves the old block untouched.
        let p = unsafe { libc::realloc(ptr.as_ptr().cast(), new_size.max(1)) };
        let p = NonNull::new(p.cast()).ok_or_else(|| Self::exhausted(new_size))?;
        if p != ptr {
            tracing::trace!(new_size, "malloc block moved on resize");
        }
        Ok(p)
    }

    fn try_free(&self, ptr: NonNull<u8>, _size: usize) -> Result<(), AllocError> {
        // SAFETY: ptr came from malloc/realloc and is not used again.
        unsafe { libc::free(ptr.as_ptr().cast()) };
        Ok(())
    }

    fn try_clear(&self) -> Result<(), AllocError> {
        Err(AllocError::unsupported(AllocOp::Clear))
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn allocate_write_free() {
        let p = MallocAllocator.allocate(64);
        assert_eq!(p.as_ptr().addr() % MallocAllocator::ALIGNMENT, 0);
        // SAFETY: p points to 64 writable bytes.
        unsafe { p.as_ptr().write_bytes(0xAB, 64) };
        MallocAllocator.free(p, 64);
    }

    #[test]
    fn resize_preserves_prefix() {
        let p = MallocAllocator.allocate(3);
        // SAFETY: p points to 3 writable bytes.
        unsafe { p.as_ptr().copy_from_nonoverlapping([1u8, 2, 3].as_ptr(), 3) };
        let q = MallocAllocator.resize(p, 3, 1 << 16);
        // SAFETY: q points to at least 3 initialised bytes.
        let head = unsafe { std::slice::from_raw_parts(q.as_ptr(), 3) };
        assert_eq!(head, &[1, 2, 3]);
        MallocAllocator.free(q, 1 << 16);
    }

    #[test]
    #[should_panic(expected = "invalid clear")]
    fn plain_clear_is_fatal() {
        MallocAllocator.clear();
    }
}
