//! Criterion benchmarks for pushing 100K integers into a `DynArray` over each backend.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use vmarena_arena::Arena;
use vmarena_array::DynArray;
use vmarena_bench::{bench_arena_config, fill_ascending};
use vmarena_core::Allocator;
use vmarena_heap::{HeapAllocator, MallocAllocator};

const N: u64 = 100_000;

/// Benchmark: arrays that lease from the thread's arena pool.
fn bench_push_pooled(c: &mut Criterion) {
    c.bench_function("push_100k_pooled", |b| {
        b.iter(|| {
            let mut a = DynArray::new();
            black_box(fill_ascending(&mut a, N));
        });
    });
}

/// Benchmark: one long-lived arena, cleared after every iteration.
fn bench_push_arena(c: &mut Criterion) {
    let arena = Arena::new(bench_arena_config()).unwrap();
    c.bench_function("push_100k_arena", |b| {
        b.iter(|| {
            {
                let mut a = DynArray::with_allocator(&arena);
                black_box(fill_ascending(&mut a, N));
            }
            arena.clear();
        });
    });
}

/// Benchmark: the Rust global heap, which may copy on resize.
fn bench_push_heap(c: &mut Criterion) {
    let heap = HeapAllocator::new();
    c.bench_function("push_100k_heap", |b| {
        b.iter(|| {
            let mut a = DynArray::with_allocator(&heap);
            black_box(fill_ascending(&mut a, N));
        });
    });
}

/// Benchmark: the C runtime's malloc/realloc.
fn bench_push_malloc(c: &mut Criterion) {
    c.bench_function("push_100k_malloc", |b| {
        b.iter(|| {
            let mut a = DynArray::with_allocator(&MallocAllocator);
            black_box(fill_ascending(&mut a, N));
        });
    });
}

/// Baseline: `Vec` with the same element count.
fn bench_push_vec(c: &mut Criterion) {
    c.bench_function("push_100k_vec", |b| {
        b.iter(|| {
            let mut v = Vec::new();
            for i in 0..N {
                v.push(i);
            }
            black_box(v.iter().sum::<u64>());
        });
    });
}

criterion_group!(
    benches,
    bench_push_pooled,
    bench_push_arena,
    bench_push_heap,
    bench_push_malloc,
    bench_push_vec
);
criterion_main!(benches);
