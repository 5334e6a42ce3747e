//! # Multiplication Strategies
//!
//! Every strategy computes the same product `C = A * B` for `A` (n×m),
//! `B` (m×p) and a caller-supplied, distinct `C` (n×p). They differ only in
//! loop order and blocking:
//!
//! | Strategy              | Loop order                          | Writes to C          |
//! |-----------------------|-------------------------------------|----------------------|
//! | [`Strategy::Naive`]   | i, j, k                             | once per element     |
//! | [`Strategy::Tiled`]   | ii, kk, jj blocks; i, j, k inside   | accumulates (C += )  |
//! | [`Strategy::Lanes`]   | i, k, j grouped in `lane_width`     | accumulates (C += )  |
//! | [`Strategy::TiledLanes`] | ii, kk, jj blocks; i, k, j lanes | accumulates (C += )  |
//!
//! Accumulating strategies expect `C` to be zero-filled by the caller.
//! All of them validate shapes before touching `C`, so a
//! [`MatmulError::DimensionMismatch`] leaves `C` exactly as it was.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{validation_error, MatmulError, Result};
use crate::matrix::Matrix;

pub mod lanes;
pub mod naive;
pub mod tiled;

pub use lanes::{multiply_lanes, multiply_tiled_lanes, LaneBackend};
pub use naive::multiply_naive;
pub use tiled::{multiply_tiled, multiply_tiled_with_order, suggest_tile_size, BlockOrder};

/// Checks `A.cols == B.rows`, `C.rows == A.rows` and `C.cols == B.cols`.
///
/// Returns `(n, m, p)`: rows of A, shared dimension, columns of B.
pub fn check_dimensions(a: &Matrix, b: &Matrix, c: &Matrix) -> Result<(usize, usize, usize)> {
    if a.cols() != b.rows() || c.rows() != a.rows() || c.cols() != b.cols() {
        return Err(MatmulError::DimensionMismatch {
            a: a.shape(),
            b: b.shape(),
            c: c.shape(),
        });
    }
    Ok((a.rows(), a.cols(), b.cols()))
}

/// The tile edge actually used for a requested size: `min(requested, dim)`.
///
/// # Errors
/// Returns [`MatmulError::InvalidTileSize`] for a zero tile size.
pub fn effective_tile_size(requested: usize, dim: usize) -> Result<usize> {
    if requested == 0 {
        return Err(MatmulError::InvalidTileSize { tile_size: 0 });
    }
    Ok(requested.min(dim.max(1)))
}

/// Selectable multiplication strategy (the tag without its parameters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Naive,
    Tiled,
    Lanes,
    TiledLanes,
}

impl Strategy {
    /// All strategies in the fixed execution order.
    pub const ALL: [Strategy; 4] = [
        Strategy::Naive,
        Strategy::Tiled,
        Strategy::Lanes,
        Strategy::TiledLanes,
    ];

    /// Strategies run when none are requested explicitly. The lane-grouped
    /// strategy is only part of it when the `lanes` feature is compiled in.
    pub fn default_set() -> Vec<Strategy> {
        [Strategy::Naive, Strategy::Tiled, Strategy::Lanes]
            .into_iter()
            .filter(Strategy::is_enabled)
            .collect()
    }

    /// `Lanes` and `TiledLanes`.
    pub fn is_lane_grouped(&self) -> bool {
        matches!(self, Strategy::Lanes | Strategy::TiledLanes)
    }

    /// Whether the harness may run this strategy in this build. Lane-grouped
    /// strategies need the `lanes` feature.
    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "lanes") || !self.is_lane_grouped()
    }

    /// Name printed in the `Method` column of reports.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Naive => "Naive",
            Strategy::Tiled => "Tiled",
            Strategy::Lanes => "Vector",
            Strategy::TiledLanes => "TiledVector",
        }
    }

    /// Identifier accepted by [`FromStr`].
    pub fn id(&self) -> &'static str {
        match self {
            Strategy::Naive => "naive",
            Strategy::Tiled => "tiled",
            Strategy::Lanes => "lanes",
            Strategy::TiledLanes => "tiled-lanes",
        }
    }

    /// Whether this strategy accumulates into C and needs it zeroed first.
    pub fn accumulates(&self) -> bool {
        !matches!(self, Strategy::Naive)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = MatmulError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(Strategy::Naive),
            "tiled" | "blocked" => Ok(Strategy::Tiled),
            "lanes" | "vector" => Ok(Strategy::Lanes),
            "tiled-lanes" | "tiled-vector" | "tiledvector" => Ok(Strategy::TiledLanes),
            other => Err(validation_error(format!(
                "unknown strategy '{other}' (expected naive, tiled, lanes or tiled-lanes)"
            ))),
        }
    }
}

/// A strategy together with its parameters, behind one `multiply` entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Naive,
    Tiled { tile_size: usize },
    Lanes { lane_width: usize },
    TiledLanes { tile_size: usize, lane_width: usize },
}

impl Kernel {
    /// Builds the kernel for `strategy`, validating the parameters it uses.
    pub fn new(strategy: Strategy, tile_size: usize, lane_width: usize) -> Result<Self> {
        let check_tile = || {
            if tile_size == 0 {
                Err(MatmulError::InvalidTileSize { tile_size })
            } else {
                Ok(tile_size)
            }
        };
        let check_lanes = || {
            if lane_width == 0 {
                Err(MatmulError::InvalidLaneWidth { lane_width })
            } else {
                Ok(lane_width)
            }
        };

        Ok(match strategy {
            Strategy::Naive => Kernel::Naive,
            Strategy::Tiled => Kernel::Tiled {
                tile_size: check_tile()?,
            },
            Strategy::Lanes => Kernel::Lanes {
                lane_width: check_lanes()?,
            },
            Strategy::TiledLanes => Kernel::TiledLanes {
                tile_size: check_tile()?,
                lane_width: check_lanes()?,
            },
        })
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Kernel::Naive => Strategy::Naive,
            Kernel::Tiled { .. } => Strategy::Tiled,
            Kernel::Lanes { .. } => Strategy::Lanes,
            Kernel::TiledLanes { .. } => Strategy::TiledLanes,
        }
    }

    pub fn name(&self) -> &'static str {
        self.strategy().name()
    }

    /// Runs the kernel. Accumulating kernels add into `c`.
    pub fn multiply(&self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()> {
        match *self {
            Kernel::Naive => multiply_naive(a, b, c),
            Kernel::Tiled { tile_size } => multiply_tiled(a, b, c, tile_size),
            Kernel::Lanes { lane_width } => multiply_lanes(a, b, c, lane_width),
            Kernel::TiledLanes {
                tile_size,
                lane_width,
            } => multiply_tiled_lanes(a, b, c, tile_size, lane_width),
        }
    }
}
