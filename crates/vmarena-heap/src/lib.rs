//! Heap-backed implementations of the vmarena allocator contract.
//!
//! These are the interchangeable alternatives to the arena: they free
//! individual blocks and may relocate on resize, and they refuse Clear.
//!
//! - [`HeapAllocator`] uses the Rust global allocator (`std::alloc`), which
//!   is the process heap unless a `#[global_allocator]` says otherwise.
//! - [`MallocAllocator`] calls the C runtime's `malloc`/`realloc`/`free`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod heap;
pub mod malloc;

pub use heap::HeapAllocator;
pub use malloc::MallocAllocator;
