//! Criterion micro-benchmarks for arena planning, commit, and handle access.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ferry_arena::{ArenaConfig, LinearMemory};
use ferry_bench::{decode_shaped_arena, mixed_arena};

/// Benchmark: Plan the layout of 1K mixed-width slots.
fn bench_plan_1k(c: &mut Criterion) {
    let arena = mixed_arena(1_000).unwrap();
    c.bench_function("arena_plan_1k", |b| {
        b.iter(|| black_box(arena.plan().unwrap()));
    });
}

/// Benchmark: Declare and commit a decode-shaped batch at a fixed base.
fn bench_commit_fixed(c: &mut Criterion) {
    let mut mem = LinearMemory::new(2);
    c.bench_function("arena_commit_fixed", |b| {
        b.iter(|| {
            let (mut arena, input) = decode_shaped_arena(ArenaConfig::fixed(0), 64 * 1024).unwrap();
            let layout = arena.commit(&mut mem).unwrap();
            black_box(layout.offset_of(&input).unwrap());
        });
    });
}

/// Benchmark: Tail commit on a fresh memory, including one growth.
fn bench_commit_tail_grow(c: &mut Criterion) {
    c.bench_function("arena_commit_tail_grow", |b| {
        b.iter(|| {
            let mut mem = LinearMemory::new(1);
            let (mut arena, _) = decode_shaped_arena(ArenaConfig::tail(), 64 * 1024).unwrap();
            arena.commit(&mut mem).unwrap();
            black_box(mem.pages());
        });
    });
}

/// Benchmark: 1K u32 set/get pairs through a scalar-array handle.
fn bench_handle_get_set_1k(c: &mut Criterion) {
    let mut mem = LinearMemory::new(1);
    let mut arena = ferry_arena::Arena::new(ArenaConfig::fixed(0)).unwrap();
    let desc = arena.declare_scalar_array(4, 4, 1_000).unwrap();
    let handle = arena.commit(&mut mem).unwrap().handle(&desc).unwrap();

    c.bench_function("handle_get_set_1k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for i in 0..1_000u32 {
                handle.set(&mut mem, i, i.wrapping_mul(7)).unwrap();
                sum += u64::from(handle.get::<u32, _>(&mem, i).unwrap());
            }
            black_box(sum);
        });
    });
}

/// Benchmark: Copy a 64 KiB input into a buffer slot.
fn bench_write_input_64k(c: &mut Criterion) {
    let mut mem = LinearMemory::new(2);
    let (mut arena, input) = decode_shaped_arena(ArenaConfig::fixed(0), 64 * 1024).unwrap();
    let handle = arena.commit(&mut mem).unwrap().handle(&input).unwrap();
    let bytes = vec![0x5au8; 64 * 1024];

    c.bench_function("handle_write_input_64k", |b| {
        b.iter(|| handle.write_bytes(&mut mem, black_box(&bytes)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_plan_1k,
    bench_commit_fixed,
    bench_commit_tail_grow,
    bench_handle_get_set_1k,
    bench_write_input_64k
);
criterion_main!(benches);
