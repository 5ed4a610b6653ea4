//! Allocator backed by the Rust global heap.

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use vmarena_core::{AllocError, AllocOp, Allocator, Resource};

/// Process-heap backend over `std::alloc`.
///
/// Every block is allocated with [`HeapAllocator::ALIGNMENT`]. Zero-byte
/// requests are rounded up to one byte so that every call yields a real,
/// freeable block. Tracks how many blocks are outstanding.
#[derive(Debug, Default)]
pub struct HeapAllocator {
    outstanding: Cell<usize>,
}

impl HeapAllocator {
    /// Alignment of every block handed out.
    pub const ALIGNMENT: usize = 16;

    /// Create a heap allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks allocated and not yet freed.
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    fn layout(size: usize) -> Result<Layout, AllocError> {
        Layout::from_size_align(size.max(1), Self::ALIGNMENT).map_err(|_| {
            AllocError::ResourceExhausted {
                resource: Resource::Commit,
                requested: size,
                available: isize::MAX as usize,
            }
        })
    }
}

#[allow(unsafe_code)]
impl Allocator for HeapAllocator {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn alignment(&self) -> usize {
        Self::ALIGNMENT
    }

    fn try_allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = Self::layout(size)?;
        // SAFETY: layout has non-zero size.
        let p = unsafe { alloc::alloc(layout) };
        let p = NonNull::new(p).ok_or(AllocError::ResourceExhausted {
            resource: Resource::Commit,
            requested: size,
            available: 0,
        })?;
        self.outstanding.set(self.outstanding.get() + 1);
        tracing::trace!(size, outstanding = self.outstanding(), "heap block allocated");
        Ok(p)
    }

    fn try_resize(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let old = Self::layout(old_size)?;
        // Validates that the new size is representable.
        Self::layout(new_size)?;
        // SAFETY: ptr was returned by this allocator with layout `old`, and the
        // new size is non-zero and fits the same alignment.
        let p = unsafe { alloc::realloc(ptr.as_ptr(), old, new_size.max(1)) };
        NonNull::new(p).ok_or(AllocError::ResourceExhausted {
            resource: Resource::Commit,
            requested: new_size,
            available: 0,
        })
    }

    fn try_free(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        let layout = Self::layout(size)?;
        // SAFETY: ptr was returned by this allocator with this layout and is
        // not used again by the caller.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        self.outstanding.set(self.outstanding.get().saturating_sub(1));
        tracing::trace!(size, outstanding = self.outstanding(), "heap block freed");
        Ok(())
    }

    fn try_clear(&self) -> Result<(), AllocError> {
        Err(AllocError::unsupported(AllocOp::Clear))
    }
}
