//! Benchmarks for sequence generation and trace building
//!
//! Measures performance of:
//! - Sequence generation at different sizes
//! - Trace building for hits and misses, per variant

use bisect_search::{build_trace, generate, Variant};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Benchmark sequence generation
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for &size in &[4usize, 36, 1_000, 100_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter(|| generate(black_box(n), 0, (n as i64) * 10, black_box(9473)))
        });
    }
    group.finish();
}

/// Benchmark trace building for both variants
fn bench_build_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_trace");
    let seq = generate(100_000, 0, 1_000_000, 42);
    let hit = seq[seq.len() / 3];
    let miss = seq[seq.len() - 1] + 1;

    for variant in [Variant::Iterative, Variant::Recursive] {
        for (name, target) in [("hit", hit), ("miss", miss)] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", variant), name),
                &target,
                |b, &t| b.iter(|| build_trace(black_box(&seq), black_box(t), variant)),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_build_trace);
criterion_main!(benches);
