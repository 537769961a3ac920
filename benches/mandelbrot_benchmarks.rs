//! Mandelbrot simulation benchmarks
//!
//! Compares the sequential and rayon backends across grid sizes, plus the
//! cost of scoring a single point.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use repro_store::mandelbrot::{self, compute_point, Complex, MandelbrotParams};
use repro_store::Backend;

fn params(num_points: usize) -> MandelbrotParams {
    MandelbrotParams::new(-2.0, 1.0, -1.5, 1.5, num_points).with_max_iterations(500)
}

/// Benchmark single-point scoring inside and outside the set
fn bench_compute_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_point");

    for (label, point) in [
        ("escapes", Complex::new(0.5, 0.5)),
        ("stable", Complex::new(-0.1, 0.1)),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| black_box(compute_point(black_box(point), 1_000, 100.0).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark full grid evaluation per backend
fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    group.sample_size(20);

    for size in [32, 64, 128].iter() {
        let p = params(*size);

        group.bench_with_input(BenchmarkId::new("sequential", size), &p, |b, p| {
            b.iter(|| black_box(mandelbrot::simulate(p, Backend::Sequential).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("parallel", size), &p, |b, p| {
            b.iter(|| black_box(mandelbrot::simulate(p, Backend::default()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute_point, bench_simulate);
criterion_main!(benches);
