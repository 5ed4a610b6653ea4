//! Error taxonomy shared by every allocator backend.
//!
//! Three families of failure exist: the allocator ran out of something it
//! cannot grow ([`AllocError::ResourceExhausted`]), the caller asked for an
//! operation the allocator does not permit ([`AllocError::InvalidOperation`]),
//! or the operating system refused a memory-mapping call
//! ([`AllocError::PlatformFailure`]). Configuration is validated up front and
//! rejected with [`AllocError::InvalidConfig`].
//!
//! None of these are recovered inside the allocator layer. The `try_*`
//! methods hand them back to the caller; everything else routes them
//! through [`fatal`].

use std::error::Error;
use std::fmt;

/// The four operations of the allocator capability contract, plus returning
/// an arena to its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocOp {
    /// Fresh allocation.
    Allocate,
    /// Grow or shrink an existing allocation.
    Resize,
    /// Release a single allocation.
    Free,
    /// Reset the allocator to empty.
    Clear,
    /// Return an arena to its pool.
    Release,
}

impl fmt::Display for AllocOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocate => write!(f, "allocate"),
            Self::Resize => write!(f, "resize"),
            Self::Free => write!(f, "free"),
            Self::Clear => write!(f, "clear"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// Which finite resource ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Reserved address space of a region.
    Reservation,
    /// Committed (physically backed) memory, including heap exhaustion.
    Commit,
    /// Free slots in an arena pool.
    PoolSlots,
    /// Element capacity arithmetic overflowed `usize`.
    Capacity,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reservation => write!(f, "reserved address space"),
            Self::Commit => write!(f, "committed memory"),
            Self::PoolSlots => write!(f, "arena pool slots"),
            Self::Capacity => write!(f, "array capacity"),
        }
    }
}

/// Why an operation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// Resize targeted something other than the arena's most recent allocation.
    NotLastAllocation,
    /// The backend does not implement this operation.
    Unsupported,
    /// `clear_to` asked for an offset past the bytes in use.
    ClearBeyondOffset,
    /// The requested element alignment exceeds what the allocator guarantees.
    AlignmentTooLarge,
    /// The pool already holds every arena it owns; the arena is not one of its leases.
    PoolFull,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLastAllocation => {
                write!(f, "target is not the arena's most recent allocation")
            }
            Self::Unsupported => write!(f, "operation not supported by this allocator"),
            Self::ClearBeyondOffset => write!(f, "target offset is beyond the bytes in use"),
            Self::AlignmentTooLarge => {
                write!(f, "element alignment exceeds the allocator's alignment")
            }
            Self::PoolFull => write!(f, "pool already holds all of its arenas"),
        }
    }
}

/// Coarse classification of an [`AllocError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`AllocError::ResourceExhausted`].
    ResourceExhausted,
    /// See [`AllocError::InvalidOperation`].
    InvalidOperation,
    /// See [`AllocError::PlatformFailure`].
    PlatformFailure,
    /// See [`AllocError::InvalidConfig`].
    InvalidConfig,
}

/// Errors produced by allocator operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// A reservation, commit, pool or capacity limit was hit.
    ResourceExhausted {
        /// What ran out.
        resource: Resource,
        /// Bytes (or slots) requested.
        requested: usize,
        /// Bytes (or slots) that were still available.
        available: usize,
    },
    /// The operation is not permitted on this allocator in its current state.
    InvalidOperation {
        /// The operation that was refused.
        op: AllocOp,
        /// Why it was refused.
        reason: InvalidReason,
    },
    /// A virtual-memory or heap call into the operating system failed.
    PlatformFailure {
        /// Name of the failing platform call.
        call: &'static str,
        /// Raw OS error code, 0 if none was reported.
        code: i32,
    },
    /// A configuration value was rejected at construction.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl AllocError {
    /// Shorthand for an [`InvalidReason::Unsupported`] refusal of `op`.
    pub fn unsupported(op: AllocOp) -> Self {
        Self::InvalidOperation {
            op,
            reason: InvalidReason::Unsupported,
        }
    }

    /// Capture the calling thread's last OS error for `call`.
    pub fn last_os_error(call: &'static str) -> Self {
        Self::PlatformFailure {
            call,
            code: std::io::Error::last_os_error().raw_os_error().unwrap_or(0),
        }
    }

    /// The coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::PlatformFailure { .. } => ErrorKind::PlatformFailure,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }

    /// Whether this is a refusal because the backend lacks the operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::InvalidOperation {
                reason: InvalidReason::Unsupported,
                ..
            }
        )
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceExhausted {
                resource,
                requested,
                available,
            } => write!(
                f,
                "{resource} exhausted: requested {requested}, available {available}"
            ),
            Self::InvalidOperation { op, reason } => write!(f, "invalid {op}: {reason}"),
            Self::PlatformFailure { call, code } => {
                write!(f, "platform call {call} failed (os error {code})")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid allocator config: {reason}"),
        }
    }
}

impl Error for AllocError {}

/// Escalate an allocator error: log it and panic with its message.
///
/// This is the single exit point for contract violations in the default
/// (non-`try`) mode. It never returns.
#[cold]
#[track_caller]
pub fn fatal(err: AllocError) -> ! {
    tracing::error!(kind = ?err.kind(), error = %err, "fatal allocator error");
    panic!("{err}");
}
