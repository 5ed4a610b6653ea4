//! Bump arenas over lazily committed virtual memory.
//!
//! Provides the reserve/commit/decommit/release layer over the operating
//! system, a pointer-bump [`Arena`] implementing the
//! [`Allocator`](vmarena_core::Allocator) contract on top of it, and a
//! fixed-capacity per-thread [`ArenaPool`]. `unsafe` code is confined to the
//! platform calls in [`os`].
//!
//! # Architecture
//!
//! ```text
//! thread_pool (one ArenaPool per thread, 128 slots)
//! └── Arena × N (unreserved until first allocation)
//!     └── Region (128 MiB reserved when pooled, committed in 1 MiB+ steps)
//! ```
//!
//! # Lifecycle
//!
//! An arena starts **unreserved**. Its first allocation reserves the
//! configured range and commits enough pages for the request plus the
//! commit increment. Later allocations commit more as needed. Clearing
//! resets the offset and, when the arena had grown past its decommit
//! threshold, decommits everything above the threshold. The range is
//! released when the arena is dropped, which for pooled arenas happens when
//! the owning thread exits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod os;
pub mod pool;

pub use arena::Arena;
pub use config::{ArenaConfig, PoolConfig};
pub use os::Region;
pub use pool::{thread_pool, ArenaPool, PooledArena};
