//! Error types for lrtile

use thiserror::Error;

/// Errors that can occur while building or combining tiles.
#[derive(Debug, Error)]
pub enum TileError {
    /// Operand extents or contraction indices are incompatible.
    #[error("Shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    /// A factor pair (or chain) does not share its inner dimension.
    #[error("Factor shapes are incompatible: left {left:?}, right {right:?}")]
    FactorMismatch { left: Vec<usize>, right: Vec<usize> },

    /// The dense SVD, QR or GEMM could not produce a valid result.
    #[error("Numeric failure: {0}")]
    NumericFailure(#[from] anyhow::Error),

    /// Tolerance is not finite or is negative.
    #[error("Invalid tolerance value: {0}. tolerance must be finite and non-negative.")]
    InvalidTolerance(f64),

    /// Rank policy divisors must be non-zero.
    #[error(
        "Invalid rank policy: recompress divisor {recompress_divisor}, collapse divisor {collapse_divisor}"
    )]
    InvalidPolicy {
        recompress_divisor: usize,
        collapse_divisor: usize,
    },

    /// Buffer length does not match the extents.
    #[error("Data length {actual} does not match extents {dims:?} (expected {expected})")]
    InvalidData {
        dims: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A block needs at least one extent.
    #[error("A block needs at least one extent")]
    NoExtents,

    /// A factor chain needs at least one factor.
    #[error("A factor chain needs at least one factor")]
    EmptyChain,
}

impl TileError {
    /// Whether the error came from the numerical backend.
    ///
    /// Only these errors are eligible for the dense fallback.
    pub fn is_numeric(&self) -> bool {
        matches!(self, TileError::NumericFailure(_))
    }

    pub(crate) fn shape(op: &'static str, left: &[usize], right: &[usize]) -> Self {
        TileError::ShapeMismatch {
            op,
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }
}

/// Result type for tile operations
pub type Result<T> = std::result::Result<T, TileError>;
