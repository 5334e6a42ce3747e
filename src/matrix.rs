//! # Dense Row-Major Matrix
//!
//! [`Matrix`] owns a contiguous buffer of `rows * cols` `f64` values stored in
//! **row-major** order, where element (i,j) lives at index `i * cols + j`.
//! That index arithmetic lives in [`at`] and nowhere else; kernels go through
//! [`Matrix::get`], [`Matrix::row`] and [`Matrix::row_mut`].
//!
//! The buffer is allocated fallibly (`try_reserve_exact`) so an oversized
//! request surfaces as [`MatmulError::Allocation`] instead of aborting the
//! process, and it is released exactly once when the matrix is dropped.
//!
//! [`MatmulError::Allocation`]: crate::MatmulError::Allocation

use std::ops::Index;

use ndarray::Array2;
use rand::Rng;

use crate::error::{allocation_error, validation_error, Result, Shape};

/// Calculates the 1D index for a 2D element in a row-major matrix.
///
/// # Arguments
/// * `i` - Row index.
/// * `j` - Column index.
/// * `ld` - Leading dimension (number of columns in the matrix).
#[inline(always)]
pub(crate) fn at(i: usize, j: usize, ld: usize) -> usize {
    (i * ld) + j
}

/// A dense, heap-allocated, row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Allocates a zero-filled `rows x cols` matrix.
    ///
    /// # Errors
    /// Returns [`MatmulError::Allocation`](crate::MatmulError::Allocation) if either dimension is zero, if
    /// `rows * cols` overflows, or if the buffer cannot be obtained.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(allocation_error(rows, cols, "dimensions must be non-zero"));
        }

        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| allocation_error(rows, cols, "element count overflows usize"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| allocation_error(rows, cols, e.to_string()))?;
        data.resize(len, 0.0);

        Ok(Matrix { rows, cols, data })
    }

    /// Wraps an existing row-major buffer.
    ///
    /// # Errors
    /// Returns [`MatmulError::Allocation`](crate::MatmulError::Allocation) for a zero dimension and
    /// [`MatmulError::Validation`](crate::MatmulError::Validation) if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(allocation_error(rows, cols, "dimensions must be non-zero"));
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(validation_error(format!(
                "buffer of length {} cannot hold a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Builds a matrix from a slice of equally long rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        if let Some(bad) = rows.iter().position(|r| r.as_ref().len() != cols) {
            return Err(validation_error(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].as_ref().len(),
                cols
            )));
        }
        let data = rows.iter().flat_map(|r| r.as_ref().iter().copied()).collect();
        Self::from_vec(rows.len(), cols, data)
    }

    /// An identity-like `rows x cols` matrix: 1 on the main diagonal, 0 elsewhere.
    pub fn identity(rows: usize, cols: usize) -> Result<Self> {
        let mut matrix = Self::new(rows, cols)?;
        for i in 0..rows.min(cols) {
            matrix.set(i, i, 1.0);
        }
        Ok(matrix)
    }

    /// Allocates a `rows x cols` matrix filled from `rng` with values in `[min, max)`.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        rng: &mut R,
        min: f64,
        max: f64,
    ) -> Result<Self> {
        let mut matrix = Self::new(rows, cols)?;
        matrix.fill_random(rng, min, max)?;
        Ok(matrix)
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[inline(always)]
    pub fn shape(&self) -> Shape {
        (self.rows, self.cols)
    }

    /// Number of elements, always `rows * cols`.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: zero-sized matrices cannot be constructed.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element (i,j). Only debug builds check that `j < cols`.
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[at(i, j, self.cols)]
    }

    /// Overwrites element (i,j).
    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[at(i, j, self.cols)] = value;
    }

    /// Row `i` as a contiguous slice of `cols` elements.
    #[inline(always)]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = at(i, 0, self.cols);
        &self.data[start..start + self.cols]
    }

    /// Row `i` as a mutable contiguous slice of `cols` elements.
    #[inline(always)]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let start = at(i, 0, self.cols);
        &mut self.data[start..start + self.cols]
    }

    /// The whole row-major buffer.
    #[inline(always)]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Overwrites every element with 0.
    pub fn fill_zero(&mut self) {
        self.fill(0.0);
    }

    /// Overwrites every element with `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Fills every element, in buffer order, with a value drawn uniformly
    /// from `[min, max)` (or exactly `min` when `min == max`).
    ///
    /// The generator is owned by the caller, so re-seeding it with the same
    /// seed reproduces the same matrix bit for bit.
    ///
    /// # Errors
    /// Returns [`MatmulError::Validation`](crate::MatmulError::Validation) if the bounds are not finite or
    /// `min > max`.
    pub fn fill_random<R: Rng + ?Sized>(&mut self, rng: &mut R, min: f64, max: f64) -> Result<()> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(validation_error(format!(
                "invalid random range [{min}, {max})"
            )));
        }
        if min == max {
            self.fill(min);
            return Ok(());
        }
        for value in self.data.iter_mut() {
            *value = rng.random_range(min..max);
        }
        Ok(())
    }

    /// Copies the matrix into an `ndarray` array of the same shape.
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows, self.cols), |(i, j)| self.get(i, j))
    }

    /// Copies an `ndarray` array (any memory layout) into a new matrix.
    pub fn from_array(array: &Array2<f64>) -> Result<Self> {
        let (rows, cols) = array.dim();
        let mut matrix = Self::new(rows, cols)?;
        for ((i, j), &value) in array.indexed_iter() {
            matrix.set(i, j, value);
        }
        Ok(matrix)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline(always)]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[at(i, j, self.cols)]
    }
}
