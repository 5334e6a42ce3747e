//! # Cache-Blocked Multiplication
//!
//! The iteration space over (row, shared dimension, column) is partitioned
//! into cubic blocks of edge `tile_size`. A given output tile of `C` is
//! revisited once per shared-dimension block, so partial dot products
//! accumulate in `C` itself: **the caller must zero `C` first**.
//!
//! Blocks on the last row/shared/column stripe are clipped to the true
//! matrix boundary and may be shorter than `tile_size`.
//!
//! Inside a block the kernel does the same accumulate-then-store as the naive
//! kernel, with the shared-dimension loop unrolled by 4 and a scalar tail.
//! For every `C[i][j]` the products are still added in increasing `k`, so the
//! result is bit-identical to [`multiply_naive`](super::multiply_naive) when
//! `C` starts at zero.

use std::cmp::min;
use std::ops::Range;

use tracing::debug;

use crate::error::Result;
use crate::kernels::{check_dimensions, effective_tile_size};
use crate::matrix::Matrix;

/// Shared-dimension unroll factor inside a block.
const UNROLL: usize = 4;

/// Block traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockOrder {
    /// Row blocks, then shared-dimension blocks, then column blocks.
    #[default]
    RowSharedCol,
    /// Row blocks, then column blocks, then shared-dimension blocks.
    RowColShared,
}

/// Computes `C += A * B` with cubic cache blocks in the canonical
/// [`BlockOrder::RowSharedCol`] order.
///
/// # Errors
/// * [`MatmulError::DimensionMismatch`](crate::MatmulError::DimensionMismatch)
///   if the shapes are incompatible.
/// * [`MatmulError::InvalidTileSize`](crate::MatmulError::InvalidTileSize)
///   if `tile_size` is zero.
///
/// `C` is untouched on error.
pub fn multiply_tiled(a: &Matrix, b: &Matrix, c: &mut Matrix, tile_size: usize) -> Result<()> {
    multiply_tiled_with_order(a, b, c, tile_size, BlockOrder::default())
}

/// [`multiply_tiled`] with an explicit block traversal order.
pub fn multiply_tiled_with_order(
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    tile_size: usize,
    order: BlockOrder,
) -> Result<()> {
    let (n, m, p) = check_dimensions(a, b, c)?;
    let tile = effective_tile_size(tile_size, n.max(m).max(p))?;

    debug!(n, m, p, tile, ?order, "tiled multiply");

    match order {
        BlockOrder::RowSharedCol => {
            for ii in (0..n).step_by(tile) {
                let i_end = min(ii + tile, n);
                for kk in (0..m).step_by(tile) {
                    let k_end = min(kk + tile, m);
                    for jj in (0..p).step_by(tile) {
                        let j_end = min(jj + tile, p);
                        block_update(a, b, c, ii..i_end, kk..k_end, jj..j_end);
                    }
                }
            }
        }
        BlockOrder::RowColShared => {
            for ii in (0..n).step_by(tile) {
                let i_end = min(ii + tile, n);
                for jj in (0..p).step_by(tile) {
                    let j_end = min(jj + tile, p);
                    for kk in (0..m).step_by(tile) {
                        let k_end = min(kk + tile, m);
                        block_update(a, b, c, ii..i_end, kk..k_end, jj..j_end);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Adds the contribution of `A[rows, shared] * B[shared, cols]` to `C[rows, cols]`.
#[inline(always)]
fn block_update(
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    rows: Range<usize>,
    shared: Range<usize>,
    cols: Range<usize>,
) {
    for i in rows {
        let a_row = a.row(i);
        for j in cols.clone() {
            let mut sum = c.get(i, j);

            let mut k = shared.start;
            while k + UNROLL <= shared.end {
                sum += a_row[k] * b.get(k, j);
                sum += a_row[k + 1] * b.get(k + 1, j);
                sum += a_row[k + 2] * b.get(k + 2, j);
                sum += a_row[k + 3] * b.get(k + 3, j);
                k += UNROLL;
            }

            // Remainder
            while k < shared.end {
                sum += a_row[k] * b.get(k, j);
                k += 1;
            }

            c.set(i, j, sum);
        }
    }
}

/// Suggests a power-of-two tile edge for a cache of `cache_bytes`.
///
/// Three tiles (one each from A, B and C) must fit in a quarter of the
/// cache. The result is clamped to `[8, 256]` and rounded down to a power
/// of two.
pub fn suggest_tile_size(cache_bytes: usize, element_size: usize) -> usize {
    let usable = cache_bytes / 4;
    let elements_per_tile = usable / (3 * element_size.max(1));

    // Integer square root, rounded down.
    let mut tile = 0usize;
    while (tile + 1) * (tile + 1) <= elements_per_tile {
        tile += 1;
    }

    let tile = tile.clamp(8, 256);
    1 << (usize::BITS - 1 - tile.leading_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::multiply_naive;
    use crate::MatmulError;

    /// Creates test matrix with values (row+1) + (col+1)*0.1 for easy verification.
    fn create_test_matrix(rows: usize, cols: usize) -> Matrix {
        let mut matrix = Matrix::new(rows, cols).unwrap();
        for i in 0..rows {
            for j in 0..cols {
                matrix.set(i, j, (i + 1) as f64 + (j + 1) as f64 * 0.1);
            }
        }
        matrix
    }

    fn naive(a: &Matrix, b: &Matrix) -> Matrix {
        let mut c = Matrix::new(a.rows(), b.cols()).unwrap();
        multiply_naive(a, b, &mut c).unwrap();
        c
    }

    #[test]
    fn test_tiled_2x2() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();

        for tile in 1..=3 {
            let mut c = Matrix::new(2, 2).unwrap();
            multiply_tiled(&a, &b, &mut c, tile).unwrap();
            assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0], "tile {tile}");
        }
    }

    /// Tests dimensions that don't align with the tile edge (clipped edge blocks).
    #[test]
    fn test_tiled_odd_dimensions() {
        let (n, m, p) = (7, 9, 5);
        let a = create_test_matrix(n, m);
        let b = create_test_matrix(m, p);
        let expected = naive(&a, &b);

        for tile in 1..=10 {
            for order in [BlockOrder::RowSharedCol, BlockOrder::RowColShared] {
                let mut c = Matrix::new(n, p).unwrap();
                multiply_tiled_with_order(&a, &b, &mut c, tile, order).unwrap();
                for idx in 0..n * p {
                    assert_eq!(
                        c.as_slice()[idx],
                        expected.as_slice()[idx],
                        "tile {tile} {order:?} mismatch at {idx}"
                    );
                }
            }
        }
    }

    /// Shared dimensions shorter than the unroll factor only take the remainder path.
    #[test]
    fn test_tiled_short_shared_dimension() {
        for m in 1..UNROLL {
            let a = create_test_matrix(3, m);
            let b = create_test_matrix(m, 3);
            let mut c = Matrix::new(3, 3).unwrap();
            multiply_tiled(&a, &b, &mut c, 2).unwrap();
            assert_eq!(c, naive(&a, &b), "m = {m}");
        }
    }

    #[test]
    fn test_tiled_oversized_tile_matches_full_tile() {
        let a = create_test_matrix(6, 6);
        let b = create_test_matrix(6, 6);

        let mut full = Matrix::new(6, 6).unwrap();
        let mut oversized = Matrix::new(6, 6).unwrap();
        multiply_tiled(&a, &b, &mut full, 6).unwrap();
        multiply_tiled(&a, &b, &mut oversized, 1000).unwrap();

        assert_eq!(full, oversized);
    }

    /// Verifies accumulation behavior by pre-initializing C with non-zero values.
    #[test]
    fn test_tiled_accumulates_into_output() {
        let a = Matrix::identity(3, 3).unwrap();
        let b = create_test_matrix(3, 3);
        let mut c = Matrix::new(3, 3).unwrap();
        c.fill(1.0);

        multiply_tiled(&a, &b, &mut c, 2).unwrap();

        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(c.get(i, j), b.get(i, j) + 1.0);
            }
        }
    }

    #[test]
    fn test_tiled_rejects_zero_tile() {
        let a = create_test_matrix(2, 2);
        let mut c = Matrix::new(2, 2).unwrap();
        c.fill(9.0);

        assert_eq!(
            multiply_tiled(&a, &a, &mut c, 0),
            Err(MatmulError::InvalidTileSize { tile_size: 0 })
        );
        assert!(c.as_slice().iter().all(|&v| v == 9.0));
    }

    #[test]
    fn test_suggest_tile_size() {
        // 32 KiB L1, f64: 8192/24 = 341 elements -> 18 -> clamp -> 16
        assert_eq!(suggest_tile_size(crate::L1_CACHE_SIZE, 8), 16);
        // 256 KiB L2: 65536/24 = 2730 -> 52 -> 32
        assert_eq!(suggest_tile_size(crate::L2_CACHE_SIZE, 8), 32);
        // 2 MiB L3: 524288/24 = 21845 -> 147 -> 128
        assert_eq!(suggest_tile_size(crate::L3_CACHE_SIZE, 8), 128);
        // Tiny and huge caches hit the clamps.
        assert_eq!(suggest_tile_size(64, 8), 8);
        assert_eq!(suggest_tile_size(1 << 30, 8), 256);
    }
}
