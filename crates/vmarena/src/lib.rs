//! vmarena: pluggable allocators, virtual-memory bump arenas, and arrays
//! that grow in place on top of them.
//!
//! This is the facade crate that re-exports the public API of the vmarena
//! sub-crates. Depending on `vmarena` alone is enough for most users.
//!
//! # Quick start
//!
//! ```rust
//! use vmarena::prelude::*;
//!
//! // Arrays built with `new` lease an arena from this thread's pool.
//! let mut squares = DynArray::new();
//! for i in 0..1000u64 {
//!     squares.push(i * i);
//! }
//! assert_eq!(squares[31], 961);
//!
//! // Any allocator can back an array, including a caller-owned arena.
//! let arena = Arena::new(ArenaConfig::with_reserve_size(mib(1))).unwrap();
//! let mut bytes = DynArray::with_allocator(&arena);
//! bytes.extend_from_slice(b"hello");
//! assert_eq!(&bytes[..], b"hello");
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`allocator`] | `vmarena-core` | `Allocator` trait, errors, size and alignment helpers |
//! | [`arena`] | `vmarena-arena` | VM regions, `Arena`, `ArenaPool`, thread pools |
//! | [`heap`] | `vmarena-heap` | Global-heap and `malloc` allocators |
//! | [`array`] | `vmarena-array` | `DynArray` and its growth policy |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Allocator contract, error taxonomy and size helpers (`vmarena-core`).
pub use vmarena_core as allocator;

/// Virtual-memory regions, bump arenas and arena pools (`vmarena-arena`).
///
/// [`arena::Arena`] is the bump allocator; [`arena::thread_pool`] hands out
/// [`arena::PooledArena`] leases from the calling thread's pool.
pub use vmarena_arena as arena;

/// General-purpose heap backends (`vmarena-heap`).
pub use vmarena_heap as heap;

/// Growable arrays over any allocator (`vmarena-array`).
pub use vmarena_array as array;

/// Common imports for typical vmarena usage.
///
/// ```rust
/// use vmarena::prelude::*;
/// ```
pub mod prelude {
    pub use vmarena_core::{fatal, gib, kib, mib, AllocError, Allocator, PAGE_SIZE};

    pub use vmarena_arena::{thread_pool, Arena, ArenaConfig, ArenaPool, PoolConfig, PooledArena};

    pub use vmarena_heap::{HeapAllocator, MallocAllocator};

    pub use vmarena_array::DynArray;
}
