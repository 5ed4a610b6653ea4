//! [`DynArray`]: a growable array over any [`Allocator`].

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use vmarena_arena::{thread_pool, PooledArena};
use vmarena_core::{array_bytes, fatal, AllocError, Allocator};

use crate::growth::next_capacity;

/// Where a [`DynArray`] gets its storage.
enum Backing<'a> {
    /// A caller-owned allocator, shared by reference.
    Borrowed(&'a dyn Allocator),
    /// A lease on the thread's arena pool, held for the array's storage lifetime.
    Pooled(PooledArena),
}

impl Backing<'_> {
    fn allocator(&self) -> &dyn Allocator {
        match self {
            Backing::Borrowed(alloc) => *alloc,
            Backing::Pooled(lease) => lease,
        }
    }
}

/// Growable array of `T` whose storage comes from an [`Allocator`].
///
/// Growth follows [`next_capacity`]: the first growth for `k` slots allocates
/// `max(2k, 16)` slots, and each later growth resizes to `2 * (len + k)`.
/// The first growth issues an Allocate; later growths issue a Resize on the
/// same block, so an arena backend extends the array in place.
///
/// An array built with [`DynArray::new`] leases an arena from the calling
/// thread's pool at its first growth and hands it back when cleared or
/// dropped. An array built with [`DynArray::with_allocator`] shares a
/// caller-owned allocator; when that allocator is an arena, the array must
/// be the arena's most recent allocation whenever it grows, otherwise the
/// growth fails with a not-last-allocation error (fatal through [`push`]).
///
/// [`push`]: DynArray::push
pub struct DynArray<'a, T> {
    backing: Option<Backing<'a>>,
    data: NonNull<T>,
    cap: usize,
    len: usize,
    _owns: PhantomData<T>,
}

impl<'a, T> DynArray<'a, T> {
    /// Empty array that leases a pooled arena on first growth.
    pub fn new() -> Self {
        Self {
            backing: None,
            data: NonNull::dangling(),
            cap: 0,
            len: 0,
            _owns: PhantomData,
        }
    }

    /// Empty array over a caller-owned allocator.
    pub fn with_allocator(alloc: &'a dyn Allocator) -> Self {
        Self {
            backing: Some(Backing::Borrowed(alloc)),
            ..Self::new()
        }
    }

    /// Number of initialised elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Slots available before the next growth.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// `len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Name of the backing allocator, or `None` for an unresolved pooled array.
    pub fn allocator_name(&self) -> Option<&'static str> {
        self.backing.as_ref().map(|b| b.allocator().name())
    }

    /// Whether the storage currently lives in a leased pool arena.
    pub fn is_pooled(&self) -> bool {
        matches!(self.backing, Some(Backing::Pooled(_)))
    }

    /// The initialised elements.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: data is aligned and non-null (dangling when cap is 0), and
        // the first len slots are initialised.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    /// The initialised elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in as_slice; &mut self guarantees exclusivity.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }

    /// Make room for `additional` more elements.
    pub fn try_reserve_slots(&mut self, additional: usize) -> Result<(), AllocError> {
        let (cap, len, data) = (self.cap, self.len, self.data);
        let Some(new_cap) = next_capacity(cap, len, additional)? else {
            return Ok(());
        };
        let alloc = self.allocator()?;
        let new_bytes = array_bytes::<T, _>(alloc, new_cap)?;
        let ptr = if cap == 0 {
            alloc.try_allocate(new_bytes)?
        } else {
            // cap * size was representable when the block was allocated.
            alloc.try_resize(data.cast(), cap * size_of::<T>(), new_bytes)?
        };
        tracing::trace!(
            allocator = alloc.name(),
            from = cap,
            to = new_cap,
            "array grown"
        );
        self.data = ptr.cast();
        self.cap = new_cap;
        Ok(())
    }

    /// Like [`try_reserve_slots`](Self::try_reserve_slots), fatal on failure.
    pub fn reserve_slots(&mut self, additional: usize) {
        self.try_reserve_slots(additional)
            .unwrap_or_else(|err| fatal(err));
    }

    /// Append `value`, growing if needed.
    ///
    /// On failure the value is handed back along with the error.
    pub fn try_push(&mut self, value: T) -> Result<(), (T, AllocError)> {
        if let Err(err) = self.try_reserve_slots(1) {
            return Err((value, err));
        }
        // SAFETY: reserve guaranteed len < cap; the slot is uninitialised.
        unsafe { self.data.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Append `value`. Any allocation failure is fatal.
    pub fn push(&mut self, value: T) {
        if let Err((_, err)) = self.try_push(value) {
            fatal(err);
        }
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot len was initialised and is now outside the live range.
        Some(unsafe { self.data.as_ptr().add(self.len).read() })
    }

    /// Append clones of every element of `items` after a single growth.
    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        self.reserve_slots(items.len());
        for item in items {
            // SAFETY: reserve made room for all of items; len tracks each
            // write so a panicking clone leaves the array consistent.
            unsafe { self.data.as_ptr().add(self.len).write(item.clone()) };
            self.len += 1;
        }
    }

    /// Drop every element and give the storage back.
    ///
    /// A pooled lease returns to the pool. A borrowed allocator receives a
    /// Free, unless it only reclaims through Clear (arenas), in which case the
    /// storage stays with it until its owner clears it.
    pub fn try_clear(&mut self) -> Result<(), AllocError> {
        self.drop_elements();
        let (data, bytes) = (self.data, self.cap * size_of::<T>());
        let had_storage = self.cap > 0;
        self.data = NonNull::dangling();
        self.cap = 0;
        match self.backing.take() {
            Some(Backing::Pooled(lease)) => thread_pool::release(lease),
            Some(Backing::Borrowed(alloc)) => {
                self.backing = Some(Backing::Borrowed(alloc));
                if had_storage {
                    match alloc.try_free(data.cast(), bytes) {
                        Err(err) if !err.is_unsupported() => return Err(err),
                        _ => {}
                    }
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Like [`try_clear`](Self::try_clear), fatal on failure.
    pub fn clear(&mut self) {
        self.try_clear().unwrap_or_else(|err| fatal(err));
    }

    fn drop_elements(&mut self) {
        let live = ptr::slice_from_raw_parts_mut(self.data.as_ptr(), self.len);
        self.len = 0;
        // SAFETY: the first len slots were initialised and len is already 0,
        // so a panicking destructor cannot cause a double drop.
        unsafe { ptr::drop_in_place(live) };
    }

    fn allocator(&mut self) -> Result<&dyn Allocator, AllocError> {
        let backing = match self.backing.take() {
            Some(backing) => backing,
            None => {
                let lease = thread_pool::try_acquire()?;
                tracing::trace!(in_use = thread_pool::in_use(), "array leased pool arena");
                Backing::Pooled(lease)
            }
        };
        Ok(self.backing.insert(backing).allocator())
    }
}

impl<T> Default for DynArray<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for DynArray<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.try_clear() {
            tracing::error!(error = %err, "failed to release array storage");
        }
    }
}

impl<T> Deref for DynArray<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DynArray<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for DynArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for DynArray<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if lower > 0 {
            self.reserve_slots(lower);
        }
        for value in iter {
            self.push(value);
        }
    }
}
