//! Matrix Multiplication Strategy Comparison
//!
//! Times each strategy against ndarray's `dot` on square matrices.
//!
//! # Usage:
//! ```bash
//! # Run all kernel benchmarks
//! cargo bench --bench kernels
//!
//! # Only the tile size sweep
//! cargo bench --bench kernels -- tile_sweep
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use matbench::kernels::suggest_tile_size;
use matbench::{
    Kernel, Matrix, Strategy, DEFAULT_TILE_SIZE, L1_CACHE_SIZE, L2_CACHE_SIZE, L3_CACHE_SIZE,
    LANE_WIDTH,
};
use rand::prelude::*;

fn random_matrix(size: usize, rng: &mut StdRng) -> Matrix {
    Matrix::random(size, size, rng, -1.0, 1.0).unwrap()
}

/// One group per size, one line per strategy plus ndarray.
fn bench_strategies_by_size(c: &mut Criterion) {
    for size in [64, 128, 256, 512] {
        let mut group = c.benchmark_group(format!("matmul_{size}x{size}"));
        group.sample_size(20);
        group.throughput(Throughput::Elements((2 * size * size * size) as u64));

        let mut rng = StdRng::seed_from_u64(42);
        let a = random_matrix(size, &mut rng);
        let b = random_matrix(size, &mut rng);
        let mut out = Matrix::new(size, size).unwrap();

        for strategy in Strategy::ALL {
            let kernel = Kernel::new(strategy, DEFAULT_TILE_SIZE, LANE_WIDTH).unwrap();
            group.bench_function(strategy.id(), |bench| {
                bench.iter(|| {
                    out.fill_zero();
                    kernel
                        .multiply(black_box(&a), black_box(&b), black_box(&mut out))
                        .unwrap();
                })
            });
        }

        let a_nd = a.to_array();
        let b_nd = b.to_array();
        group.bench_function("ndarray", |bench| {
            bench.iter(|| black_box(black_box(&a_nd).dot(black_box(&b_nd))))
        });

        group.finish();
    }
}

/// Tiled strategy across tile edges, including the cache-derived suggestions.
fn bench_tile_sweep(c: &mut Criterion) {
    let size = 256;
    let mut group = c.benchmark_group("tile_sweep");
    group.sample_size(20);

    let mut rng = StdRng::seed_from_u64(42);
    let a = random_matrix(size, &mut rng);
    let b = random_matrix(size, &mut rng);
    let mut out = Matrix::new(size, size).unwrap();

    let mut tiles = vec![8, 16, 32, 64, 128];
    for cache in [L1_CACHE_SIZE, L2_CACHE_SIZE, L3_CACHE_SIZE] {
        let suggested = suggest_tile_size(cache, std::mem::size_of::<f64>());
        if !tiles.contains(&suggested) {
            tiles.push(suggested);
        }
    }

    for tile in tiles {
        let kernel = Kernel::new(Strategy::Tiled, tile, LANE_WIDTH).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(tile), &tile, |bench, _| {
            bench.iter(|| {
                out.fill_zero();
                kernel
                    .multiply(black_box(&a), black_box(&b), black_box(&mut out))
                    .unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies_by_size, bench_tile_sweep);
criterion_main!(benches);
