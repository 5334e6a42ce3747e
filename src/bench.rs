//! # Benchmark Harness
//!
//! Runs one `(matrix size, tile size)` configuration end to end:
//!
//! 1. validate the configuration (before anything is allocated),
//! 2. allocate `A`, `B` and one result matrix per enabled strategy,
//! 3. fill `A` then `B` from a generator seeded with `config.seed`,
//! 4. for each strategy in the fixed order naive, tiled, lane-grouped:
//!    zero its result, time the multiplication, compute GFLOPS,
//! 5. optionally compare every non-naive result against the naive one.
//!
//! All matrices are owned by [`run`]'s stack frame, so they are released on
//! every return path, including an error from one of the kernels.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{validation_error, Result};
use crate::kernels::{effective_tile_size, Kernel, Strategy};
use crate::matrix::Matrix;
use crate::system::SystemInfo;
use crate::timer::{flop_count, gflops, Timer, MIN_ELAPSED_SECONDS};
use crate::verify::compare;
use crate::{
    BENCHMARK_ITERATIONS, DEFAULT_MATRIX_SIZE, DEFAULT_SEED, DEFAULT_TILE_SIZE, LANE_WIDTH,
    MAX_MATRIX_SIZE, MIN_MATRIX_SIZE, RANDOM_RANGE, VERIFICATION_TOLERANCE, WARMUP_ITERATIONS,
};

/// Configuration of a single harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Edge of the square matrices.
    pub size: usize,
    /// Requested tile edge; clamped to `size`.
    pub tile_size: usize,
    pub lane_width: usize,
    pub verify: bool,
    pub tolerance: f64,
    pub seed: u64,
    /// Strategies to run. Executed in [`Strategy::ALL`] order regardless of
    /// the order given here; duplicates are ignored.
    pub strategies: Vec<Strategy>,
    /// Untimed runs per strategy before measuring.
    pub warmup_iterations: usize,
    /// Timed runs per strategy; the fastest is reported.
    pub iterations: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            size: DEFAULT_MATRIX_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            lane_width: LANE_WIDTH,
            verify: false,
            tolerance: VERIFICATION_TOLERANCE,
            seed: DEFAULT_SEED,
            strategies: Strategy::default_set(),
            warmup_iterations: WARMUP_ITERATIONS,
            iterations: BENCHMARK_ITERATIONS,
        }
    }
}

impl BenchConfig {
    pub fn new(size: usize) -> Self {
        BenchConfig {
            size,
            ..Default::default()
        }
    }

    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_lane_width(mut self, lane_width: usize) -> Self {
        self.lane_width = lane_width;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_strategies(mut self, strategies: impl Into<Vec<Strategy>>) -> Self {
        self.strategies = strategies.into();
        self
    }

    pub fn with_iterations(mut self, warmup: usize, iterations: usize) -> Self {
        self.warmup_iterations = warmup;
        self.iterations = iterations;
        self
    }

    /// Tile edge actually used: `min(tile_size, size)`.
    pub fn effective_tile_size(&self) -> Result<usize> {
        effective_tile_size(self.tile_size, self.size)
    }

    /// Strategies to execute, in execution order and without duplicates.
    /// Strategies this build does not enable (see [`Strategy::is_enabled`])
    /// are dropped silently.
    pub fn ordered_strategies(&self) -> Vec<Strategy> {
        Strategy::ALL
            .into_iter()
            .filter(|s| s.is_enabled() && self.strategies.contains(s))
            .collect()
    }

    /// Checks every parameter before any matrix is allocated.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MATRIX_SIZE..=MAX_MATRIX_SIZE).contains(&self.size) {
            return Err(validation_error(format!(
                "matrix size must be between {MIN_MATRIX_SIZE} and {MAX_MATRIX_SIZE}, got {}",
                self.size
            )));
        }
        if self.strategies.is_empty() {
            return Err(validation_error("at least one strategy must be enabled"));
        }
        if self.iterations == 0 {
            return Err(validation_error("iterations must be at least 1"));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(validation_error(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        for strategy in self.ordered_strategies() {
            Kernel::new(strategy, self.tile_size, self.lane_width)?;
        }
        Ok(())
    }
}

/// Timing of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchRecord {
    pub method: String,
    pub strategy: Strategy,
    pub size: usize,
    /// Best elapsed time over the measured iterations.
    pub time_ms: f64,
    pub gflops: f64,
}

/// Outcome of comparing one strategy's result against the naive result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub method: String,
    pub reference: String,
    pub passed: bool,
    pub max_abs_diff: f64,
    pub mismatches: usize,
}

/// Everything one harness run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchReport {
    pub timestamp: DateTime<Utc>,
    pub system: SystemInfo,
    pub size: usize,
    pub tile_size: usize,
    pub lane_width: usize,
    pub seed: u64,
    pub tolerance: f64,
    /// Floating-point operations per multiplication.
    pub total_flops: f64,
    pub records: Vec<BenchRecord>,
    /// Empty unless verification was requested.
    pub verifications: Vec<Verification>,
}

impl BenchReport {
    pub fn record(&self, strategy: Strategy) -> Option<&BenchRecord> {
        self.records.iter().find(|r| r.strategy == strategy)
    }

    /// `true` if verification ran and every comparison passed.
    pub fn all_verified(&self) -> bool {
        !self.verifications.is_empty() && self.verifications.iter().all(|v| v.passed)
    }

    /// Naive time divided by each other strategy's time.
    pub fn speedups(&self) -> Vec<(String, f64)> {
        let Some(baseline) = self.record(Strategy::Naive) else {
            return Vec::new();
        };
        self.records
            .iter()
            .filter(|r| r.strategy != Strategy::Naive && r.time_ms > 0.0)
            .map(|r| (r.method.clone(), baseline.time_ms / r.time_ms))
            .collect()
    }
}

/// Deterministic operands for `config`: `A` then `B`, both `size × size`,
/// drawn from one generator seeded with `config.seed`.
pub fn generate_operands(config: &BenchConfig) -> Result<(Matrix, Matrix)> {
    let (min, max) = RANDOM_RANGE;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let a = Matrix::random(config.size, config.size, &mut rng, min, max)?;
    let b = Matrix::random(config.size, config.size, &mut rng, min, max)?;
    Ok((a, b))
}

/// Runs the configuration. See the module docs for the sequence.
///
/// # Errors
/// Any configuration, allocation or kernel error aborts the run; matrices
/// allocated so far are dropped before the error is returned.
pub fn run(config: &BenchConfig) -> Result<BenchReport> {
    config.validate()?;

    let n = config.size;
    let tile_size = config.effective_tile_size()?;
    if tile_size < config.tile_size {
        warn!(
            requested = config.tile_size,
            effective = tile_size,
            "tile size adjusted to matrix size"
        );
    }

    for skipped in config.strategies.iter().filter(|s| !s.is_enabled()) {
        info!(
            method = skipped.name(),
            "skipping strategy not enabled in this build"
        );
    }

    let kernels = config
        .ordered_strategies()
        .into_iter()
        .map(|s| Kernel::new(s, tile_size, config.lane_width))
        .collect::<Result<Vec<_>>>()?;

    info!(size = n, "allocating matrices");
    let (a, b) = generate_operands(config)?;
    let mut results = kernels
        .iter()
        .map(|k| Matrix::new(n, n).map(|c| (*k, c)))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(results.len());
    let mut timer = Timer::new();

    for (kernel, c) in results.iter_mut() {
        info!(method = kernel.name(), "running strategy");

        for _ in 0..config.warmup_iterations {
            c.fill_zero();
            kernel.multiply(&a, &b, c)?;
        }

        let mut best_seconds = f64::INFINITY;
        for iteration in 0..config.iterations {
            c.fill_zero();
            timer.measure(|| kernel.multiply(&a, &b, c))?;
            let seconds = timer.elapsed_seconds();
            debug!(method = kernel.name(), iteration, seconds, "iteration done");
            best_seconds = best_seconds.min(seconds);
        }

        records.push(bench_record(kernel, n, best_seconds)?);
    }

    let verifications = if config.verify {
        verify_results(config, &a, &b, &results)?
    } else {
        Vec::new()
    };

    Ok(BenchReport {
        timestamp: Utc::now(),
        system: SystemInfo::collect(config.lane_width),
        size: n,
        tile_size,
        lane_width: config.lane_width,
        seed: config.seed,
        tolerance: config.tolerance,
        total_flops: flop_count(n, n, n),
        records,
        verifications,
    })
}

/// Builds the record for the fastest run. A run too short for the clock to
/// resolve reads as zero and is floored to one tick.
fn bench_record(kernel: &Kernel, n: usize, best_seconds: f64) -> Result<BenchRecord> {
    let seconds = if best_seconds < MIN_ELAPSED_SECONDS {
        debug!(
            method = kernel.name(),
            best_seconds, "run below clock resolution, flooring to one tick"
        );
        MIN_ELAPSED_SECONDS
    } else {
        best_seconds
    };

    Ok(BenchRecord {
        method: kernel.name().to_string(),
        strategy: kernel.strategy(),
        size: n,
        time_ms: seconds * 1000.0,
        gflops: gflops(n, seconds)?,
    })
}

fn verify_results(
    config: &BenchConfig,
    a: &Matrix,
    b: &Matrix,
    results: &[(Kernel, Matrix)],
) -> Result<Vec<Verification>> {
    if results.iter().all(|(k, _)| *k == Kernel::Naive) {
        return Ok(Vec::new());
    }
    info!("verifying results");

    // Without a timed naive run, compute the reference untimed.
    let computed;
    let reference = match results.iter().find(|(k, _)| *k == Kernel::Naive) {
        Some((_, c)) => c,
        None => {
            let mut c = Matrix::new(config.size, config.size)?;
            Kernel::Naive.multiply(a, b, &mut c)?;
            computed = c;
            &computed
        }
    };

    let mut verifications = Vec::new();
    for (kernel, c) in results.iter().filter(|(k, _)| *k != Kernel::Naive) {
        let comparison = compare(reference, c, config.tolerance)?;
        if !comparison.passed {
            warn!(
                method = kernel.name(),
                max_abs_diff = comparison.max_abs_diff,
                mismatches = comparison.mismatches,
                "result differs from naive"
            );
        }
        verifications.push(Verification {
            method: kernel.name().to_string(),
            reference: Strategy::Naive.name().to_string(),
            passed: comparison.passed,
            max_abs_diff: comparison.max_abs_diff,
            mismatches: comparison.mismatches,
        });
    }
    Ok(verifications)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatmulError;

    #[test]
    fn test_validate_rejects_bad_configs() {
        assert!(BenchConfig::new(1).validate().is_err());
        assert!(BenchConfig::new(MAX_MATRIX_SIZE + 1).validate().is_err());
        assert_eq!(
            BenchConfig::new(16).with_tile_size(0).validate(),
            Err(MatmulError::InvalidTileSize { tile_size: 0 })
        );
        assert!(BenchConfig::new(16)
            .with_strategies(Vec::new())
            .validate()
            .is_err());
        assert!(BenchConfig::new(16).with_iterations(0, 0).validate().is_err());
        // A zero lane width only matters when a lane-grouped strategy is enabled.
        assert!(BenchConfig::new(16)
            .with_strategies([Strategy::Naive, Strategy::Tiled])
            .with_lane_width(0)
            .validate()
            .is_ok());
        #[cfg(feature = "lanes")]
        assert_eq!(
            BenchConfig::new(16)
                .with_strategies([Strategy::Lanes])
                .with_lane_width(0)
                .validate(),
            Err(MatmulError::InvalidLaneWidth { lane_width: 0 })
        );
    }

    #[test]
    fn test_ordered_strategies_fixed_order() {
        let config = BenchConfig::new(8).with_strategies([
            Strategy::Lanes,
            Strategy::Naive,
            Strategy::Lanes,
            Strategy::Tiled,
        ]);
        let expected: Vec<Strategy> = [Strategy::Naive, Strategy::Tiled, Strategy::Lanes]
            .into_iter()
            .filter(Strategy::is_enabled)
            .collect();
        assert_eq!(config.ordered_strategies(), expected);
    }

    #[test]
    fn test_ordered_strategies_follow_lanes_feature() {
        let config = BenchConfig::new(8).with_strategies(Strategy::ALL);
        let ordered = config.ordered_strategies();

        assert!(ordered.contains(&Strategy::Naive));
        assert!(ordered.contains(&Strategy::Tiled));
        for strategy in [Strategy::Lanes, Strategy::TiledLanes] {
            assert_eq!(
                ordered.contains(&strategy),
                cfg!(feature = "lanes"),
                "{strategy} presence does not match the lanes feature"
            );
        }
    }

    #[test]
    fn test_record_below_clock_resolution() {
        let record = bench_record(&Kernel::Naive, 2, 0.0).unwrap();
        assert_eq!(record.time_ms, MIN_ELAPSED_SECONDS * 1000.0);
        assert!(record.gflops.is_finite() && record.gflops > 0.0);

        // Measurable runs are reported as measured.
        let record = bench_record(&Kernel::Naive, 2, 0.5).unwrap();
        assert_eq!(record.time_ms, 500.0);

        assert!(matches!(
            bench_record(&Kernel::Naive, 2, f64::NAN),
            Err(MatmulError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_generate_operands_is_reproducible() {
        let config = BenchConfig::new(12).with_seed(7);
        let (a1, b1) = generate_operands(&config).unwrap();
        let (a2, b2) = generate_operands(&config).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
        assert_ne!(a1, b1);
    }

    #[test]
    fn test_speedups_relative_to_naive() {
        let report = BenchReport {
            timestamp: Utc::now(),
            system: SystemInfo::collect(8),
            size: 4,
            tile_size: 4,
            lane_width: 8,
            seed: 42,
            tolerance: 1e-10,
            total_flops: flop_count(4, 4, 4),
            records: vec![
                BenchRecord {
                    method: "Naive".into(),
                    strategy: Strategy::Naive,
                    size: 4,
                    time_ms: 10.0,
                    gflops: 1.0,
                },
                BenchRecord {
                    method: "Tiled".into(),
                    strategy: Strategy::Tiled,
                    size: 4,
                    time_ms: 4.0,
                    gflops: 2.5,
                },
            ],
            verifications: Vec::new(),
        };

        assert_eq!(report.speedups(), vec![("Tiled".to_string(), 2.5)]);
        assert!(!report.all_verified());
    }
}
