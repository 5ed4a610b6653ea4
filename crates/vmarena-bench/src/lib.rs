//! Shared workloads for the vmarena benchmarks.
//!
//! - [`fill_ascending`]: push `0..n` one element at a time
//! - [`bench_arena_config`]: a small arena sized for repeated fill/clear cycles

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use vmarena_arena::ArenaConfig;
use vmarena_array::DynArray;
use vmarena_core::mib;

/// Push `0..n` into `array` one element at a time and return the sum read back.
pub fn fill_ascending(array: &mut DynArray<'_, u64>, n: u64) -> u64 {
    for i in 0..n {
        array.push(i);
    }
    array.iter().sum()
}

/// Arena config with a 64 MiB reservation, enough for 8M `u64` pushes.
pub fn bench_arena_config() -> ArenaConfig {
    ArenaConfig::with_reserve_size(mib(64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmarena_arena::Arena;
    use vmarena_heap::HeapAllocator;

    #[test]
    fn fill_sums_match_closed_form() {
        let heap = HeapAllocator::new();
        let mut a = DynArray::with_allocator(&heap);
        assert_eq!(fill_ascending(&mut a, 100), 4950);

        let arena = Arena::new(bench_arena_config()).unwrap();
        let mut b = DynArray::with_allocator(&arena);
        assert_eq!(fill_ascending(&mut b, 10), 45);
    }
}
