//! Benchmark suite for dispatch and validation
//!
//! Measures the full harness round trip (allocate, dispatch, wait,
//! validate) over growing buffer sizes on the CPU reference queue.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cotejar::testing::index_init;
use cotejar::{CpuQueue, HarnessConfig, KernelHarness, TiledVectorAdd, VectorAdd};

fn bench_linear_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_dispatch");
    let harness = KernelHarness::new(CpuQueue::new());

    for &size in &[1usize << 10, 1 << 14, 1 << 18] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let config = HarnessConfig::linear(size, 16).quiet();
            b.iter(|| {
                let outcome = harness.run(
                    &config,
                    &VectorAdd,
                    index_init::<i32>(),
                    index_init::<i32>(),
                );
                assert!(outcome.passed());
                black_box(outcome)
            });
        });
    }
    group.finish();
}

fn bench_tiled_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiled_dispatch");
    let harness = KernelHarness::new(CpuQueue::new());

    for &bl in &[16usize, 32, 64] {
        let size = 16 * bl * bl;
        group.bench_with_input(BenchmarkId::from_parameter(bl), &bl, |b, &bl| {
            let config = HarnessConfig::tiled(size, bl).quiet();
            let kernel = TiledVectorAdd::new(16);
            b.iter(|| {
                let outcome = harness.run(
                    &config,
                    &kernel,
                    index_init::<f32>(),
                    index_init::<f32>(),
                );
                assert!(outcome.passed());
                black_box(outcome)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_linear_dispatch, bench_tiled_dispatch);
criterion_main!(benches);
