//! The allocator capability contract.
//!
//! Consumers program against [`Allocator`] only, usually through a
//! non-owning `&dyn Allocator` handle. Backends differ in which of the four
//! operations they honour: arenas reclaim only through Clear and refuse
//! Free, heap backends free individually and refuse Clear. Callers are
//! expected to know which kind they hold before calling Free or Clear, or
//! to restrict themselves to Allocate/Resize.

use std::mem::{align_of, size_of};
use std::ptr::NonNull;
use std::rc::Rc;

use crate::error::{fatal, AllocError, AllocOp, InvalidReason, Resource};

/// Four-operation allocator contract: Allocate, Resize, Free, Clear.
///
/// Methods take `&self` so that one allocator can serve several consumers
/// on the same thread. Implementations use interior mutability and are not
/// expected to be `Sync`.
///
/// Required methods return explicit errors. The provided methods without the
/// `try_` prefix escalate errors through [`fatal`].
pub trait Allocator {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Minimum alignment, in bytes, of every pointer this allocator returns.
    fn alignment(&self) -> usize;

    /// Return a fresh block of at least `size` bytes.
    fn try_allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError>;

    /// Grow or shrink the block at `ptr` from `old_size` to `new_size` bytes.
    ///
    /// The returned pointer may differ from `ptr` only for backends that
    /// relocate; the contents up to `min(old_size, new_size)` are preserved.
    fn try_resize(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError>;

    /// Release the single block at `ptr` of `size` bytes.
    fn try_free(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError>;

    /// Reset the allocator to empty, invalidating every block it handed out.
    fn try_clear(&self) -> Result<(), AllocError>;

    /// [`try_allocate`](Allocator::try_allocate), fatal on error.
    #[track_caller]
    fn allocate(&self, size: usize) -> NonNull<u8> {
        self.try_allocate(size).unwrap_or_else(|err| fatal(err))
    }

    /// [`try_resize`](Allocator::try_resize), fatal on error.
    #[track_caller]
    fn resize(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> NonNull<u8> {
        self.try_resize(ptr, old_size, new_size)
            .unwrap_or_else(|err| fatal(err))
    }

    /// [`try_free`](Allocator::try_free), fatal on error.
    #[track_caller]
    fn free(&self, ptr: NonNull<u8>, size: usize) {
        self.try_free(ptr, size).unwrap_or_else(|err| fatal(err))
    }

    /// [`try_clear`](Allocator::try_clear), fatal on error.
    #[track_caller]
    fn clear(&self) {
        self.try_clear().unwrap_or_else(|err| fatal(err))
    }
}

macro_rules! forward_allocator {
    ($($ty:ty),*) => {$(
        impl<A: Allocator + ?Sized> Allocator for $ty {
            fn name(&self) -> &'static str {
                (**self).name()
            }

            fn alignment(&self) -> usize {
                (**self).alignment()
            }

            fn try_allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
                (**self).try_allocate(size)
            }

            fn try_resize(
                &self,
                ptr: NonNull<u8>,
                old_size: usize,
                new_size: usize,
            ) -> Result<NonNull<u8>, AllocError> {
                (**self).try_resize(ptr, old_size, new_size)
            }

            fn try_free(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
                (**self).try_free(ptr, size)
            }

            fn try_clear(&self) -> Result<(), AllocError> {
                (**self).try_clear()
            }
        }
    )*};
}

forward_allocator!(&A, Box<A>, Rc<A>);

/// Byte size of `count` values of `T` placed by `alloc`.
///
/// Fails if the size overflows `usize` or `T` needs stronger alignment than
/// `alloc` guarantees.
pub fn array_bytes<T, A: Allocator + ?Sized>(alloc: &A, count: usize) -> Result<usize, AllocError> {
    if align_of::<T>() > alloc.alignment() {
        return Err(AllocError::InvalidOperation {
            op: AllocOp::Allocate,
            reason: InvalidReason::AlignmentTooLarge,
        });
    }
    count
        .checked_mul(size_of::<T>())
        .ok_or(AllocError::ResourceExhausted {
            resource: Resource::Capacity,
            requested: count,
            available: usize::MAX / size_of::<T>().max(1),
        })
}

/// Allocate uninitialised storage for `count` values of `T`.
pub fn alloc_array<T, A: Allocator + ?Sized>(
    alloc: &A,
    count: usize,
) -> Result<NonNull<T>, AllocError> {
    let bytes = array_bytes::<T, A>(alloc, count)?;
    alloc.try_allocate(bytes).map(NonNull::cast)
}
