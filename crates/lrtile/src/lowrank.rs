//! Compressed (low-rank) blocks stored as a `left × right` factor pair.

use crate::config::{validate_tolerance, CompressionOptions, RankPolicy};
use crate::dense::DenseBlock;
use crate::error::{Result, TileError};
use crate::reduction::RankReductionEngine;
use lrtile_backend::{matmul, LinalgScalar};
use std::fmt;

/// Low-rank block `A ≈ left · right`.
///
/// `left` is `M × rank` and `right` is `rank × d1 × ... × dk`; the logical
/// extents are `[M, d1, ..., dk]`. A rank-0 block represents zeros.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "CompressedBlockData<T>",
        bound(deserialize = "T: LinalgScalar + serde::Deserialize<'de>")
    )
)]
pub struct CompressedBlock<T> {
    cut: f64,
    policy: RankPolicy,
    left: DenseBlock<T>,
    right: DenseBlock<T>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(bound(deserialize = "T: LinalgScalar + serde::Deserialize<'de>"))]
struct CompressedBlockData<T> {
    cut: f64,
    policy: RankPolicy,
    left: DenseBlock<T>,
    right: DenseBlock<T>,
}

#[cfg(feature = "serde")]
impl<T: LinalgScalar> TryFrom<CompressedBlockData<T>> for CompressedBlock<T> {
    type Error = TileError;

    fn try_from(raw: CompressedBlockData<T>) -> Result<Self> {
        Self::from_parts(raw.left, raw.right, raw.cut, raw.policy)
    }
}

impl<T: LinalgScalar> CompressedBlock<T> {
    /// Compress a dense block with the given relative tolerance.
    ///
    /// # Errors
    /// Returns `InvalidTolerance`, or `NumericFailure` if the SVD fails.
    pub fn from_dense(block: &DenseBlock<T>, tolerance: f64) -> Result<Self> {
        Self::from_dense_with(block, &CompressionOptions::new().with_tolerance(tolerance))
    }

    /// Compress a dense block with explicit options.
    pub fn from_dense_with(block: &DenseBlock<T>, options: &CompressionOptions) -> Result<Self> {
        RankReductionEngine::from_options(options)?.compress(block)
    }

    /// Wrap an existing factor pair without any SVD.
    ///
    /// # Errors
    /// Returns `FactorMismatch` when `left` is not a matrix or its column
    /// count differs from `right.rows()`, and `InvalidTolerance`.
    pub fn from_factors(left: DenseBlock<T>, right: DenseBlock<T>, tolerance: f64) -> Result<Self> {
        Self::from_parts(left, right, tolerance, RankPolicy::default())
    }

    pub(crate) fn from_parts(
        left: DenseBlock<T>,
        right: DenseBlock<T>,
        tolerance: f64,
        policy: RankPolicy,
    ) -> Result<Self> {
        validate_tolerance(tolerance)?;
        policy.validate()?;
        if left.ndim() != 2 || left.cols() != right.rows() {
            return Err(TileError::FactorMismatch {
                left: left.dims().to_vec(),
                right: right.dims().to_vec(),
            });
        }
        let block = Self {
            cut: tolerance,
            policy,
            left,
            right,
        };
        block.debug_check_invariants();
        Ok(block)
    }

    /// Rank-0 block with the given extents.
    ///
    /// # Errors
    /// Returns `NoExtents` for empty `dims` and `InvalidTolerance`.
    pub fn zeros(dims: &[usize], tolerance: f64) -> Result<Self> {
        if dims.is_empty() {
            return Err(TileError::NoExtents);
        }
        let left = DenseBlock::zeros(&[dims[0], 0]);
        let mut right_dims = vec![0];
        right_dims.extend_from_slice(&dims[1..]);
        Self::from_factors(left, DenseBlock::zeros(&right_dims), tolerance)
    }

    /// Replace the rank policy carried by this block.
    ///
    /// # Errors
    /// Returns `InvalidPolicy` for zero divisors.
    pub fn with_policy(mut self, policy: RankPolicy) -> Result<Self> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    /// Relative singular-value cutoff fixed at construction.
    pub fn cut(&self) -> f64 {
        self.cut
    }

    pub fn policy(&self) -> RankPolicy {
        self.policy
    }

    /// Shared inner dimension of the factors.
    pub fn rank(&self) -> usize {
        self.left.cols()
    }

    pub fn left(&self) -> &DenseBlock<T> {
        &self.left
    }

    pub fn right(&self) -> &DenseBlock<T> {
        &self.right
    }

    pub fn factors(&self) -> [&DenseBlock<T>; 2] {
        [&self.left, &self.right]
    }

    /// Logical extents `[M] ++ right.dims[1..]`.
    pub fn dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.right.ndim());
        dims.push(self.left.rows());
        dims.extend_from_slice(&self.right.dims()[1..]);
        dims
    }

    pub fn rows(&self) -> usize {
        self.left.rows()
    }

    pub fn cols(&self) -> usize {
        self.right.cols()
    }

    /// `min(rows, cols)`.
    pub fn full_rank(&self) -> usize {
        self.rows().min(self.cols())
    }

    /// `M × N`.
    pub fn logical_size(&self) -> usize {
        self.rows() * self.cols()
    }

    /// `rank × (M + N)`.
    pub fn stored_size(&self) -> usize {
        self.rank() * (self.rows() + self.cols())
    }

    /// Multiply the factors into a dense block.
    pub fn reconstruct(&self) -> DenseBlock<T> {
        let (m, r, n) = (self.rows(), self.rank(), self.cols());
        let data = matmul(self.left.as_slice(), self.right.as_slice(), m, r, n);
        // Extents come from the factors, so the length always matches.
        DenseBlock::new(self.dims(), data).unwrap_or_else(|_| DenseBlock::zeros(&self.dims()))
    }

    /// Element at a multi-index without reconstructing the block.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        let dims = self.dims();
        if index.len() != dims.len() || index.iter().zip(dims.iter()).any(|(&i, &d)| i >= d) {
            return None;
        }
        let row = index[0];
        let col = index[1..]
            .iter()
            .zip(dims[1..].iter())
            .fold(0, |acc, (&i, &d)| acc * d + i);
        let r = self.rank();
        let n = self.cols();
        let left = self.left.as_slice();
        let right = self.right.as_slice();
        Some((0..r).fold(T::zero(), |acc, k| acc + left[row * r + k] * right[k * n + col]))
    }

    /// Multiply the block by `factor`, touching only the left factor.
    pub fn scale_to(&mut self, factor: T) -> &mut Self {
        self.left.scale_to(factor);
        self
    }

    /// `[L1 | factor·L2] · [R1; R2]`, exact, with rank `r1 + r2`.
    ///
    /// Keeps the cut and policy of `self`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the logical extents differ.
    pub fn concat(&self, other: &CompressedBlock<T>, factor: T) -> Result<CompressedBlock<T>> {
        let (lhs_dims, rhs_dims) = (self.dims(), other.dims());
        if lhs_dims != rhs_dims {
            return Err(TileError::shape("add", &lhs_dims, &rhs_dims));
        }
        let (r1, r2) = (self.rank(), other.rank());
        let out_rank = r1 + r2;
        let m = self.rows();

        let mut left = Vec::with_capacity(m * out_rank);
        let l1 = self.left.as_slice();
        let l2 = other.left.as_slice();
        for i in 0..m {
            left.extend_from_slice(&l1[i * r1..(i + 1) * r1]);
            left.extend(l2[i * r2..(i + 1) * r2].iter().map(|&x| x * factor));
        }

        // Row-major right factors stack without interleaving.
        let mut right = Vec::with_capacity(self.right.len() + other.right.len());
        right.extend_from_slice(self.right.as_slice());
        right.extend_from_slice(other.right.as_slice());

        let mut right_dims = vec![out_rank];
        right_dims.extend_from_slice(&lhs_dims[1..]);

        tracing::trace!(r1, r2, out_rank, "concatenated factors");
        Self::from_parts(
            DenseBlock::from_matrix(m, out_rank, left)?,
            DenseBlock::new(right_dims, right)?,
            self.cut,
            self.policy,
        )
    }

    /// Compare against a dense block: `‖self - other‖_F <= tolerance · max(‖other‖_F, 1)`.
    pub fn approx_eq(&self, other: &DenseBlock<T>, tolerance: f64) -> bool {
        self.reconstruct().approx_eq(other, tolerance)
    }

    /// Recheck the factor shape invariants in debug builds.
    pub(crate) fn debug_check_invariants(&self) {
        debug_assert_eq!(self.left.ndim(), 2, "left factor must be a matrix");
        debug_assert_eq!(
            self.left.cols(),
            self.right.rows(),
            "factors must share the rank dimension"
        );
        debug_assert!(self.right.ndim() >= 1, "right factor needs extents");
    }
}

impl<T: LinalgScalar> fmt::Display for CompressedBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompressedBlock: Cut = {:e}. Rank = {}. Extents = {:?}. Factors = {}",
            self.cut,
            self.rank(),
            self.dims(),
            self.factors().len()
        )
    }
}
