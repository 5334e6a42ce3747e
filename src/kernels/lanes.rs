//! # Lane-Grouped Multiplication
//!
//! Loop order is row (i) outer, shared dimension (k) middle, column (j)
//! innermost. For each `(i, k)` the scalar `A[i][k]` is broadcast against a
//! row of `B` and accumulated into the matching row of `C`, `lane_width`
//! contiguous columns at a time, with a scalar loop for the `p % lane_width`
//! tail columns. Like the tiled kernel this accumulates into `C`, so the
//! caller must zero it first.
//!
//! ## Backends
//!
//! * [`LaneBackend::Scalar`]: grouped scalar code, always available.
//! * [`LaneBackend::Avx`]: 256-bit `f64x4` loads/stores. Only compiled in when
//!   `build.rs` detected AVX on the build host (`cfg(avx)`), only selected when
//!   the running CPU reports AVX and `lane_width` is a multiple of 4.
//!
//! Both backends do a separate multiply then add per element (no FMA), in the
//! same order, so they produce identical results.

use std::cmp::min;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MatmulError, Result};
use crate::kernels::{check_dimensions, effective_tile_size};
use crate::matrix::Matrix;

/// How the grouped inner loop is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneBackend {
    Scalar,
    Avx,
}

impl LaneBackend {
    /// Picks the fastest backend usable for `lane_width` on this CPU.
    pub fn detect(lane_width: usize) -> Self {
        #[cfg(all(avx, target_arch = "x86_64"))]
        {
            if lane_width % avx::F64_LANES == 0 && std::arch::is_x86_feature_detected!("avx") {
                return LaneBackend::Avx;
            }
        }
        let _ = lane_width;
        LaneBackend::Scalar
    }

    pub fn name(&self) -> &'static str {
        match self {
            LaneBackend::Scalar => "scalar",
            LaneBackend::Avx => "avx",
        }
    }
}

/// Computes `C += A * B` processing columns in groups of `lane_width`.
///
/// # Errors
/// * [`MatmulError::DimensionMismatch`] if the shapes are incompatible.
/// * [`MatmulError::InvalidLaneWidth`] if `lane_width` is zero.
///
/// `C` is untouched on error.
pub fn multiply_lanes(a: &Matrix, b: &Matrix, c: &mut Matrix, lane_width: usize) -> Result<()> {
    let (n, m, p) = check_dimensions(a, b, c)?;
    check_lane_width(lane_width)?;

    let backend = LaneBackend::detect(lane_width);
    debug!(n, m, p, lane_width, backend = backend.name(), "lane-grouped multiply");

    for i in 0..n {
        let a_row = a.row(i);
        let c_row = c.row_mut(i);
        for (k, &a_ik) in a_row.iter().enumerate() {
            axpy_lanes(a_ik, b.row(k), c_row, lane_width, backend);
        }
    }

    Ok(())
}

/// Tiled + lane-grouped: cubic blocks as in
/// [`multiply_tiled`](super::multiply_tiled) (row, shared, column block
/// order), lane grouping applied to the column stripe inside each block.
///
/// # Errors
/// * [`MatmulError::DimensionMismatch`] if the shapes are incompatible.
/// * [`MatmulError::InvalidTileSize`] if `tile_size` is zero.
/// * [`MatmulError::InvalidLaneWidth`] if `lane_width` is zero.
pub fn multiply_tiled_lanes(
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    tile_size: usize,
    lane_width: usize,
) -> Result<()> {
    let (n, m, p) = check_dimensions(a, b, c)?;
    let tile = effective_tile_size(tile_size, n.max(m).max(p))?;
    check_lane_width(lane_width)?;

    let backend = LaneBackend::detect(lane_width);
    debug!(n, m, p, tile, lane_width, backend = backend.name(), "tiled lane-grouped multiply");

    for ii in (0..n).step_by(tile) {
        let i_end = min(ii + tile, n);
        for kk in (0..m).step_by(tile) {
            let k_end = min(kk + tile, m);
            for jj in (0..p).step_by(tile) {
                let j_end = min(jj + tile, p);

                for i in ii..i_end {
                    let a_row = a.row(i);
                    let c_stripe = &mut c.row_mut(i)[jj..j_end];
                    for k in kk..k_end {
                        axpy_lanes(a_row[k], &b.row(k)[jj..j_end], c_stripe, lane_width, backend);
                    }
                }
            }
        }
    }

    Ok(())
}

fn check_lane_width(lane_width: usize) -> Result<()> {
    if lane_width == 0 {
        return Err(MatmulError::InvalidLaneWidth { lane_width });
    }
    Ok(())
}

/// `c[j] += alpha * b[j]` for every `j`, `lane_width` elements per group,
/// then a scalar tail. `b` and `c` have the same length.
#[inline(always)]
fn axpy_lanes(alpha: f64, b: &[f64], c: &mut [f64], lane_width: usize, backend: LaneBackend) {
    debug_assert_eq!(b.len(), c.len());
    let split = c.len() - c.len() % lane_width;
    let (c_main, c_tail) = c.split_at_mut(split);
    let (b_main, b_tail) = b.split_at(split);

    match backend {
        #[cfg(all(avx, target_arch = "x86_64"))]
        LaneBackend::Avx => {
            // SAFETY: `Avx` is only returned by `detect` after the runtime
            // feature check, and `split` is a multiple of `lane_width`, which
            // is a multiple of 4.
            unsafe { avx::axpy(alpha, b_main, c_main) }
        }
        _ => {
            for (c_lane, b_lane) in c_main
                .chunks_exact_mut(lane_width)
                .zip(b_main.chunks_exact(lane_width))
            {
                for (cv, &bv) in c_lane.iter_mut().zip(b_lane) {
                    *cv += alpha * bv;
                }
            }
        }
    }

    // Scalar cleanup
    for (cv, &bv) in c_tail.iter_mut().zip(b_tail) {
        *cv += alpha * bv;
    }
}

#[cfg(all(avx, target_arch = "x86_64"))]
mod avx {
    use std::arch::x86_64::*;

    /// Number of f64 elements in a 256-bit AVX register.
    pub(super) const F64_LANES: usize = 4;

    /// `c += alpha * b` on 4-element groups.
    ///
    /// # Safety
    /// The CPU must support AVX and `b.len() == c.len()` must be a multiple of 4.
    #[target_feature(enable = "avx")]
    pub(super) unsafe fn axpy(alpha: f64, b: &[f64], c: &mut [f64]) {
        let va = _mm256_set1_pd(alpha);
        let mut j = 0;
        while j + F64_LANES <= c.len() {
            let vb = _mm256_loadu_pd(b.as_ptr().add(j));
            let vc = _mm256_loadu_pd(c.as_ptr().add(j));
            _mm256_storeu_pd(c.as_mut_ptr().add(j), _mm256_add_pd(vc, _mm256_mul_pd(va, vb)));
            j += F64_LANES;
        }
    }
}
