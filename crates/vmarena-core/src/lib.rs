//! Core contract for the vmarena allocator family.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! allocator capability trait every backend implements, the error taxonomy
//! shared by all of them, and the size/alignment arithmetic used by the
//! virtual-memory layer.
//!
//! # Failure policy
//!
//! Every operation comes in two flavours. The `try_*` methods return an
//! explicit [`AllocError`]; the plain methods ([`Allocator::allocate`],
//! [`Allocator::resize`], [`Allocator::free`], [`Allocator::clear`]) escalate
//! any error through [`fatal`]. The plain methods are the default: a
//! contract violation in the allocator layer must never be silently
//! continued past.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allocator;
pub mod error;
pub mod size;

pub use allocator::{alloc_array, array_bytes, Allocator};
pub use error::{fatal, AllocError, AllocOp, ErrorKind, InvalidReason, Resource};
pub use size::{align_offset, align_up, gib, is_power_of_two, kib, mib, PAGE_SIZE};
