//! Criterion benchmarks for the full decode pipeline against a wasmtime guest.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ferry_bench::decoder_session;
use ferry_surface::{SoftwareSurface, Viewport};

/// Benchmark: decode + release of a 64x64 image on a fresh session.
///
/// The fixture decoder grows guest memory on every call, so each
/// iteration gets its own instance; instantiation is not measured.
fn bench_decode_64(c: &mut Criterion) {
    c.bench_function("decode_release_64x64", |b| {
        b.iter_batched(
            || decoder_session(64, 64).unwrap(),
            |mut session| {
                let frame = session.decode().unwrap();
                black_box(session.release(frame).unwrap());
            },
            BatchSize::PerIteration,
        );
    });
}

/// Benchmark: present an already-decoded 256x256 frame at 2x zoom.
fn bench_present_256(c: &mut Criterion) {
    let mut session = decoder_session(256, 256).unwrap();
    let mut frame = session.decode().unwrap();
    let mut viewport = Viewport::identity();
    viewport.zoom_at((0.0, 0.0), 5.0);
    let mut surface = SoftwareSurface::new(512, 512);

    c.bench_function("present_256x256_zoom2", |b| {
        b.iter(|| {
            session
                .present(&mut frame, &viewport, &mut surface)
                .unwrap();
        });
    });
    session.release(frame).unwrap();
}

criterion_group!(benches, bench_decode_64, bench_present_256);
criterion_main!(benches);
