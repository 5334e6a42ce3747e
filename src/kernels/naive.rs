//! Unblocked reference multiplication.

use crate::error::Result;
use crate::kernels::check_dimensions;
use crate::matrix::Matrix;

/// Computes `C = A * B` with the standard IJK triple loop.
///
/// Each dot product is accumulated in a local before a single store to
/// `C[i][j]`, so `C` does not need to be zeroed first. This is the ordering
/// every other strategy is compared against.
///
/// # Errors
/// [`MatmulError::DimensionMismatch`](crate::MatmulError::DimensionMismatch)
/// if the shapes are incompatible; `C` is not written in that case.
pub fn multiply_naive(a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()> {
    let (n, _, p) = check_dimensions(a, b, c)?;

    for i in 0..n {
        let a_row = a.row(i);
        for j in 0..p {
            let mut sum = 0.0;
            for (k, &a_ik) in a_row.iter().enumerate() {
                sum += a_ik * b.get(k, j);
            }
            c.set(i, j, sum);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatmulError;

    /// Tests 2×2 multiplication with manually computed expected result.
    #[test]
    fn test_naive_2x2() {
        // A = | 1 2 |   B = | 5 6 |   C = | 1*5+2*7  1*6+2*8 | = | 19 22 |
        //     | 3 4 |       | 7 8 |       | 3*5+4*7  3*6+4*8 |   | 43 50 |
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
        let mut c = Matrix::new(2, 2).unwrap();

        multiply_naive(&a, &b, &mut c).unwrap();

        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    /// Test non-square matrices: 2x3 * 3x4 = 2x4
    #[test]
    fn test_naive_non_square() {
        let a = Matrix::from_rows(&[[1.0, 0.0, 2.0], [-1.0, 3.0, 1.0]]).unwrap();
        let b = Matrix::from_rows(&[
            [3.0, 1.0, 0.0, 2.0],
            [2.0, 1.0, 1.0, 0.0],
            [1.0, 0.0, 4.0, 1.0],
        ])
        .unwrap();
        let mut c = Matrix::new(2, 4).unwrap();

        multiply_naive(&a, &b, &mut c).unwrap();

        assert_eq!(c.row(0), &[5.0, 1.0, 8.0, 4.0]);
        assert_eq!(c.row(1), &[4.0, 2.0, 7.0, -1.0]);
    }

    /// The naive kernel overwrites; stale contents of C do not leak into the result.
    #[test]
    fn test_naive_overwrites_output() {
        let a = Matrix::identity(3, 3).unwrap();
        let b = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]).unwrap();
        let mut c = Matrix::new(3, 3).unwrap();
        c.fill(100.0);

        multiply_naive(&a, &b, &mut c).unwrap();

        assert_eq!(c, b);
    }

    #[test]
    fn test_naive_1x1() {
        let a = Matrix::from_vec(1, 1, vec![3.0]).unwrap();
        let b = Matrix::from_vec(1, 1, vec![-2.5]).unwrap();
        let mut c = Matrix::new(1, 1).unwrap();

        multiply_naive(&a, &b, &mut c).unwrap();

        assert_eq!(c.get(0, 0), -7.5);
    }

    #[test]
    fn test_naive_dimension_mismatch_leaves_output() {
        let a = Matrix::new(2, 3).unwrap();
        let b = Matrix::new(2, 3).unwrap();
        let mut c = Matrix::new(2, 3).unwrap();
        c.fill(-1.0);

        let err = multiply_naive(&a, &b, &mut c).unwrap_err();

        assert!(matches!(err, MatmulError::DimensionMismatch { .. }));
        assert!(c.as_slice().iter().all(|&v| v == -1.0));
    }
}
