//! The same workload over every backend: 10,000 ascending integers pushed
//! one at a time and read back.

use std::thread;

use vmarena_arena::{thread_pool, Arena, ArenaConfig, PoolConfig};
use vmarena_array::DynArray;
use vmarena_core::{mib, Allocator};
use vmarena_heap::{HeapAllocator, MallocAllocator};
use vmarena_test_utils::init_tracing;

const COUNT: u64 = 10_000;

fn fill_and_check(mut a: DynArray<'_, u64>) {
    for i in 0..COUNT {
        a.push(i);
    }
    assert_eq!(a.len() as u64, COUNT);
    assert!(a.capacity() as u64 >= COUNT);
    for (i, v) in a.iter().enumerate() {
        assert_eq!(*v, i as u64);
    }
    a[0] = 42;
    assert_eq!(a[0], 42);
}

#[test]
fn pooled_arena_backend() {
    init_tracing();
    let before = thread_pool::in_use();
    fill_and_check(DynArray::new());
    assert_eq!(thread_pool::in_use(), before);
}

#[test]
fn explicit_arena_backend() {
    init_tracing();
    let arena = Arena::new(ArenaConfig::with_reserve_size(mib(4))).unwrap();
    fill_and_check(DynArray::with_allocator(&arena));
    assert!(arena.offset() >= COUNT as usize * 8);
    arena.clear();
    assert_eq!(arena.offset(), 0);
}

#[test]
fn heap_backend() {
    init_tracing();
    let heap = HeapAllocator::new();
    fill_and_check(DynArray::with_allocator(&heap));
    assert_eq!(heap.outstanding(), 0);
}

#[test]
fn malloc_backend() {
    init_tracing();
    fill_and_check(DynArray::with_allocator(&MallocAllocator));
}

#[test]
fn pooled_backend_with_wide_elements() {
    let mut a = DynArray::<u128>::new();
    for i in 0..COUNT as u128 {
        a.push(i * u64::MAX as u128);
    }
    for (i, v) in a.iter().enumerate() {
        assert_eq!(*v, i as u128 * u64::MAX as u128);
    }
}

#[test]
fn boxed_trait_object_backend() {
    let alloc: Box<dyn Allocator> = Box::new(HeapAllocator::new());
    fill_and_check(DynArray::with_allocator(&*alloc));
}

#[test]
fn arrays_on_separate_threads_use_separate_pools() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                assert_eq!(thread_pool::in_use(), 0);
                let mut a = DynArray::new();
                a.push(1u8);
                assert_eq!(thread_pool::in_use(), 1);
                assert_eq!(
                    thread_pool::available(),
                    PoolConfig::DEFAULT_SLOTS - 1
                );
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
#[should_panic(expected = "arena pool slots exhausted")]
fn pooled_array_on_exhausted_pool_is_fatal() {
    let leases: Vec<_> = (0..thread_pool::available())
        .map(|_| thread_pool::acquire())
        .collect();
    assert_eq!(thread_pool::available(), 0);
    let mut a = DynArray::<u8>::new();
    a.push(1);
    drop(leases);
}
