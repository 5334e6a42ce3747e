//! Error types for matbench operations.
//!
//! Every failure is local and synchronous: it is returned at the point of
//! detection and never retried, since the kernels are deterministic.

use thiserror::Error;

/// A `(rows, cols)` pair used to report offending shapes.
pub type Shape = (usize, usize);

/// Errors that can occur while allocating, multiplying, verifying or timing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatmulError {
    /// The matrix buffer could not be obtained, or a dimension was zero.
    #[error("Matrix allocation failed: {message} (requested {rows}x{cols})")]
    Allocation {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
        /// Human-readable error message.
        message: String,
    },

    /// Operand or result shapes are incompatible for `C = A * B`.
    #[error("Dimension mismatch: A is {a:?}, B is {b:?}, C is {c:?} (rows, cols)")]
    DimensionMismatch {
        /// Shape of the left operand.
        a: Shape,
        /// Shape of the right operand.
        b: Shape,
        /// Shape of the result matrix.
        c: Shape,
    },

    /// The verifier was given two matrices of different shape.
    #[error("Shape mismatch: cannot compare {left:?} with {right:?}")]
    ShapeMismatch {
        /// Shape of the first matrix.
        left: Shape,
        /// Shape of the second matrix.
        right: Shape,
    },

    /// A tile size of zero was requested.
    #[error("Invalid tile size: {tile_size} (must be at least 1)")]
    InvalidTileSize {
        /// The rejected tile size.
        tile_size: usize,
    },

    /// A lane width of zero was requested.
    #[error("Invalid lane width: {lane_width} (must be at least 1)")]
    InvalidLaneWidth {
        /// The rejected lane width.
        lane_width: usize,
    },

    /// A non-positive (or non-finite) elapsed time was given to a throughput calculation.
    #[error("Invalid duration: {seconds} s (must be positive and finite)")]
    InvalidDuration {
        /// The rejected duration in seconds.
        seconds: f64,
    },

    /// Harness configuration error.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },
}

/// Result type alias for matbench operations.
pub type Result<T> = std::result::Result<T, MatmulError>;

/// Creates an allocation error.
pub fn allocation_error(rows: usize, cols: usize, message: impl Into<String>) -> MatmulError {
    MatmulError::Allocation {
        rows,
        cols,
        message: message.into(),
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> MatmulError {
    MatmulError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_error_display() {
        let error = allocation_error(0, 16, "dimensions must be non-zero");
        let display = format!("{}", error);
        assert!(display.contains("Matrix allocation failed"));
        assert!(display.contains("0x16"));
        assert!(display.contains("dimensions must be non-zero"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let error = MatmulError::DimensionMismatch {
            a: (2, 3),
            b: (4, 5),
            c: (2, 5),
        };
        let display = format!("{}", error);
        assert!(display.contains("A is (2, 3)"));
        assert!(display.contains("B is (4, 5)"));
        assert!(display.contains("C is (2, 5)"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let error = MatmulError::ShapeMismatch {
            left: (3, 3),
            right: (3, 4),
        };
        assert_eq!(
            format!("{}", error),
            "Shape mismatch: cannot compare (3, 3) with (3, 4)"
        );
    }

    #[test]
    fn test_validation_error_display() {
        let error = validation_error("matrix size must be at least 2");
        let display = format!("{}", error);
        assert!(display.contains("Validation error"));
        assert!(display.contains("matrix size must be at least 2"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = MatmulError::InvalidTileSize { tile_size: 0 };
        let error2 = MatmulError::InvalidTileSize { tile_size: 0 };
        let error3 = MatmulError::InvalidLaneWidth { lane_width: 0 };

        assert_eq!(error1, error2);
        assert_ne!(error1, error3);
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = MatmulError::InvalidDuration { seconds: 0.0 };

        let _: &dyn std::error::Error = &error;
        assert!(std::error::Error::source(&error).is_none());
    }
}
