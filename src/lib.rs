//! Dense matrix multiplication kernels and the harness that times and
//! cross-checks them.
//!
//! Three interchangeable strategies compute `C = A * B` on row-major `f64`
//! matrices: an unblocked reference ([`kernels::multiply_naive`]), a
//! cache-blocked one ([`kernels::multiply_tiled`]) and a lane-grouped one
//! ([`kernels::multiply_lanes`]), plus a tiled + lane-grouped combination.
//! [`bench::run`] drives them over one configuration and reports time,
//! GFLOPS and agreement with the reference.
//!
//! ```
//! use matbench::{Kernel, Matrix, Strategy};
//!
//! let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
//! let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
//! let mut c = Matrix::new(2, 2).unwrap();
//!
//! Kernel::new(Strategy::Tiled, 64, 8).unwrap().multiply(&a, &b, &mut c).unwrap();
//! assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
//! ```

pub mod bench;
pub mod error;
pub mod kernels;
pub mod matrix;
pub mod report;
pub mod system;
pub mod timer;
pub mod verify;

pub use bench::{run, BenchConfig, BenchRecord, BenchReport, Verification};
pub use error::{MatmulError, Result};
pub use kernels::{Kernel, Strategy};
pub use matrix::Matrix;
pub use timer::{gflops, Timer};
pub use verify::verify;

pub const DEFAULT_MATRIX_SIZE: usize = 512;
pub const MIN_MATRIX_SIZE: usize = 2;
pub const MAX_MATRIX_SIZE: usize = 4096;

/// Default tile edge for the cache-blocked strategies.
pub const DEFAULT_TILE_SIZE: usize = 64;

/// Number of contiguous output columns processed per group.
pub const LANE_WIDTH: usize = 8;

/// Per-element tolerance used by the harness when comparing against naive.
pub const VERIFICATION_TOLERANCE: f64 = 1e-10;

/// Seed for operand generation; fixed so runs are reproducible.
pub const DEFAULT_SEED: u64 = 42;

/// Untimed runs per strategy before measuring.
pub const WARMUP_ITERATIONS: usize = 0;

/// Timed runs per strategy; the fastest is reported.
pub const BENCHMARK_ITERATIONS: usize = 1;

/// Operand values are drawn from `[RANDOM_RANGE.0, RANDOM_RANGE.1)`.
pub const RANDOM_RANGE: (f64, f64) = (-1.0, 1.0);

// Typical cache sizes, used to suggest a tile edge.
pub const L1_CACHE_SIZE: usize = 32 * 1024;
pub const L2_CACHE_SIZE: usize = 256 * 1024;
pub const L3_CACHE_SIZE: usize = 2 * 1024 * 1024;
