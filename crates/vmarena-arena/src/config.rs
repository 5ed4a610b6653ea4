//! Arena and pool configuration parameters.

use vmarena_core::{gib, is_power_of_two, mib, AllocError, PAGE_SIZE};

/// Configuration for a single [`Arena`](crate::Arena).
///
/// Controls reservation size, commit granularity, alignment and the
/// decommit threshold. Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Bytes of address space reserved the first time the arena grows.
    ///
    /// Default: 1 GiB. Exhausting it is fatal.
    pub reserve_size: usize,

    /// Extra bytes committed on every growth, beyond what the triggering
    /// request needs. Amortises commit syscalls.
    ///
    /// Default: 1 MiB.
    pub commit_increment: usize,

    /// Alignment of every allocation. Must be a power of two.
    ///
    /// Default: 8.
    pub alignment: usize,

    /// Offset below which a clear returns excess committed pages.
    ///
    /// When an arena whose offset is above this line is cleared to a target
    /// below it, committed memory beyond the line is decommitted. Must be a
    /// multiple of [`PAGE_SIZE`]. Zero disables decommit.
    ///
    /// Default: 1 MiB.
    pub decommit_threshold: usize,
}

impl ArenaConfig {
    /// Default reservation: 1 GiB.
    pub const DEFAULT_RESERVE_SIZE: usize = gib(1);

    /// Default commit increment: 1 MiB.
    pub const DEFAULT_COMMIT_INCREMENT: usize = mib(1);

    /// Default allocation alignment.
    pub const DEFAULT_ALIGNMENT: usize = 8;

    /// Default decommit threshold: 1 MiB.
    pub const DEFAULT_DECOMMIT_THRESHOLD: usize = mib(1);

    /// Default configuration with a custom reservation size.
    pub fn with_reserve_size(reserve_size: usize) -> Self {
        Self {
            reserve_size,
            ..Self::default()
        }
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), AllocError> {
        if self.reserve_size == 0 {
            return Err(AllocError::InvalidConfig {
                reason: "reserve_size must be non-zero".into(),
            });
        }
        if !is_power_of_two(self.alignment) {
            return Err(AllocError::InvalidConfig {
                reason: format!(
                    "alignment must be a power of two (got {})",
                    self.alignment
                ),
            });
        }
        if self.alignment > PAGE_SIZE {
            return Err(AllocError::InvalidConfig {
                reason: format!(
                    "alignment must not exceed the page size (got {})",
                    self.alignment
                ),
            });
        }
        if self.decommit_threshold % PAGE_SIZE != 0 {
            return Err(AllocError::InvalidConfig {
                reason: format!(
                    "decommit_threshold must be a multiple of {PAGE_SIZE} (got {})",
                    self.decommit_threshold
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            reserve_size: Self::DEFAULT_RESERVE_SIZE,
            commit_increment: Self::DEFAULT_COMMIT_INCREMENT,
            alignment: Self::DEFAULT_ALIGNMENT,
            decommit_threshold: Self::DEFAULT_DECOMMIT_THRESHOLD,
        }
    }
}

/// Configuration for an [`ArenaPool`](crate::ArenaPool).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of arena slots. The pool never grows past this.
    ///
    /// Default: 128.
    pub slots: usize,

    /// Configuration applied to every arena in the pool.
    ///
    /// Default: [`ArenaConfig`] defaults with a 128 MiB reservation and
    /// 16-byte alignment.
    pub arena: ArenaConfig,
}

impl PoolConfig {
    /// Default slot count per pool.
    pub const DEFAULT_SLOTS: usize = 128;

    /// Default reservation for pooled arenas: 128 MiB.
    pub const DEFAULT_ARENA_RESERVE: usize = mib(128);

    /// Default alignment for pooled arenas. Pooled arrays hold arbitrary
    /// element types, so this covers `u128` and SIMD-width scalars.
    pub const DEFAULT_ARENA_ALIGNMENT: usize = 16;

    /// Check slot count and the arena configuration.
    pub fn validate(&self) -> Result<(), AllocError> {
        if self.slots == 0 {
            return Err(AllocError::InvalidConfig {
                reason: "pool needs at least one slot".into(),
            });
        }
        self.arena.validate()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            slots: Self::DEFAULT_SLOTS,
            arena: ArenaConfig {
                alignment: Self::DEFAULT_ARENA_ALIGNMENT,
                ..ArenaConfig::with_reserve_size(Self::DEFAULT_ARENA_RESERVE)
            },
        }
    }
}
