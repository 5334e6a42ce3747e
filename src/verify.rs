//! Tolerance-based comparison of two matrices.

use serde::{Deserialize, Serialize};

use crate::error::{validation_error, MatmulError, Result};
use crate::matrix::Matrix;

/// Detailed outcome of an elementwise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// `true` iff every `|a - b| <= tolerance`.
    pub passed: bool,
    /// Largest absolute difference seen (NaN if any element was NaN).
    pub max_abs_diff: f64,
    /// Number of elements outside the tolerance.
    pub mismatches: usize,
    /// `(row, col)` of the first element outside the tolerance.
    pub first_mismatch: Option<(usize, usize)>,
}

fn check_inputs(a: &Matrix, b: &Matrix, tolerance: f64) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(MatmulError::ShapeMismatch {
            left: a.shape(),
            right: b.shape(),
        });
    }
    if tolerance.is_nan() || tolerance < 0.0 {
        return Err(validation_error(format!(
            "tolerance must be non-negative, got {tolerance}"
        )));
    }
    Ok(())
}

/// Returns `Ok(true)` iff `|a[i] - b[i]| <= tolerance` for every element.
///
/// Stops at the first element outside the tolerance. A NaN on either side
/// never compares within tolerance.
///
/// # Errors
/// [`MatmulError::ShapeMismatch`] if the shapes differ, which is distinct from
/// an `Ok(false)` tolerance failure; [`MatmulError::Validation`] for a
/// negative or NaN tolerance.
pub fn verify(a: &Matrix, b: &Matrix, tolerance: f64) -> Result<bool> {
    check_inputs(a, b, tolerance)?;
    Ok(a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .all(|(x, y)| (x - y).abs() <= tolerance))
}

/// Like [`verify`], but scans every element and reports the worst deviation.
pub fn compare(a: &Matrix, b: &Matrix, tolerance: f64) -> Result<Comparison> {
    check_inputs(a, b, tolerance)?;

    let cols = a.cols();
    let mut max_abs_diff: f64 = 0.0;
    let mut mismatches = 0;
    let mut first_mismatch = None;

    for (idx, (x, y)) in a.as_slice().iter().zip(b.as_slice()).enumerate() {
        let diff = (x - y).abs();
        if diff.is_nan() || diff > max_abs_diff {
            max_abs_diff = diff;
        }
        // NaN never counts as within tolerance.
        let within = diff <= tolerance;
        if !within {
            mismatches += 1;
            first_mismatch.get_or_insert((idx / cols, idx % cols));
        }
    }

    Ok(Comparison {
        passed: mismatches == 0,
        max_abs_diff,
        mismatches,
        first_mismatch,
    })
}
