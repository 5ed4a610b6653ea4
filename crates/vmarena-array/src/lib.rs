//! Growth-aware dynamic array over any vmarena allocator.
//!
//! [`DynArray`] stores its elements in a single block obtained from an
//! [`Allocator`](vmarena_core::Allocator). It grows by amortised doubling
//! (see [`growth`]): the first growth is an Allocate, every later growth is
//! a Resize of the same block. Over an arena that Resize extends the block in
//! place, so an array that is the arena's newest allocation never copies.
//!
//! # Backends
//!
//! ```text
//! DynArray::new()                      lease from the thread's arena pool
//! DynArray::with_allocator(&arena)     shared arena; must stay last to grow
//! DynArray::with_allocator(&heap)      general heap; frees on clear/drop
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod array;
pub mod growth;

pub use array::DynArray;
pub use growth::{next_capacity, MIN_CAPACITY};
