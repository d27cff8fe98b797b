//! The tile value type: dense or compressed, re-selected after every operation.

use crate::algebra;
use crate::config::CompressionOptions;
use crate::dense::{product_dims, DenseBlock};
use crate::error::{Result, TileError};
use crate::lowrank::CompressedBlock;
use crate::reduction::RankReductionEngine;
use lrtile_backend::LinalgScalar;
use std::fmt;

/// A block of a larger tensor, stored dense or as a low-rank factor pair.
///
/// Functional operations clone `self` and delegate to the matching `_to`
/// operation. A `_to` operation only replaces `self` on success and may
/// change its representation.
///
/// # Example
///
/// ```
/// use lrtile::{DenseBlock, Tile};
///
/// let block = DenseBlock::from_fn(&[40, 40], |idx| ((idx[0] + 1) * (idx[1] + 1)) as f64);
/// let tile = Tile::from_dense(block.clone(), 1e-10).unwrap();
/// assert!(tile.is_compressed());
/// assert_eq!(tile.rank(), 1);
///
/// let doubled = tile.add(&tile).unwrap();
/// let mut expected = block;
/// expected.scale_to(2.0);
/// assert!(doubled.approx_eq(&expected, 1e-10));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(deserialize = "T: LinalgScalar + serde::Deserialize<'de>"))
)]
pub enum Tile<T> {
    Dense(DenseBlock<T>),
    Compressed(CompressedBlock<T>),
}

impl<T: LinalgScalar> From<DenseBlock<T>> for Tile<T> {
    fn from(block: DenseBlock<T>) -> Self {
        Tile::Dense(block)
    }
}

impl<T: LinalgScalar> From<CompressedBlock<T>> for Tile<T> {
    fn from(block: CompressedBlock<T>) -> Self {
        Tile::Compressed(block)
    }
}

impl<T: LinalgScalar> Tile<T> {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Compress `block` when that pays off, otherwise keep it dense.
    ///
    /// The block stays dense when the retained rank trips the collapse gate
    /// or when the SVD fails.
    ///
    /// # Errors
    /// Returns `InvalidTolerance` for a negative or non-finite tolerance.
    pub fn from_dense(block: DenseBlock<T>, tolerance: f64) -> Result<Self> {
        Self::from_dense_with(block, &CompressionOptions::new().with_tolerance(tolerance))
    }

    /// [`Tile::from_dense`] with explicit options.
    pub fn from_dense_with(block: DenseBlock<T>, options: &CompressionOptions) -> Result<Self> {
        let engine = RankReductionEngine::from_options(options)?;
        let compressed = match engine.compress(&block) {
            Ok(compressed) => compressed,
            Err(err) if err.is_numeric() => {
                tracing::warn!(error = %err, "compression failed, keeping dense block");
                return Ok(Tile::Dense(block));
            }
            Err(err) => return Err(err),
        };
        let full_rank = block.full_rank();
        if engine.should_collapse_to_dense(compressed.rank(), full_rank) {
            tracing::debug!(rank = compressed.rank(), full_rank, "kept dense");
            Ok(Tile::Dense(block))
        } else {
            tracing::debug!(rank = compressed.rank(), full_rank, "kept compressed");
            Ok(Tile::Compressed(compressed))
        }
    }

    /// Tile from an existing factor pair.
    ///
    /// A rank above `min(rows, cols)` is recompressed first, and the collapse
    /// gate then decides the representation. A failed recompression gives
    /// the dense product `left · right`.
    ///
    /// # Errors
    /// Returns `FactorMismatch` or `InvalidTolerance`.
    pub fn from_factors(left: DenseBlock<T>, right: DenseBlock<T>, tolerance: f64) -> Result<Self> {
        let block = CompressedBlock::from_factors(left, right, tolerance)?;
        let full_rank = block.full_rank();
        algebra::or_dense("from_factors", algebra::settle(block.clone(), full_rank, false), || {
            Ok(block.reconstruct())
        })
    }

    /// Dense tile, never compressed.
    pub fn dense(block: DenseBlock<T>) -> Self {
        Tile::Dense(block)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn is_compressed(&self) -> bool {
        matches!(self, Tile::Compressed(_))
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Tile::Dense(_))
    }

    pub fn as_dense(&self) -> Option<&DenseBlock<T>> {
        match self {
            Tile::Dense(block) => Some(block),
            Tile::Compressed(_) => None,
        }
    }

    pub fn as_compressed(&self) -> Option<&CompressedBlock<T>> {
        match self {
            Tile::Dense(_) => None,
            Tile::Compressed(block) => Some(block),
        }
    }

    /// Factor rank; a dense tile reports `min(rows, cols)`.
    pub fn rank(&self) -> usize {
        match self {
            Tile::Dense(block) => block.full_rank(),
            Tile::Compressed(block) => block.rank(),
        }
    }

    /// Singular-value cutoff of a compressed tile.
    pub fn cut(&self) -> Option<f64> {
        self.as_compressed().map(CompressedBlock::cut)
    }

    pub fn dims(&self) -> Vec<usize> {
        match self {
            Tile::Dense(block) => block.dims().to_vec(),
            Tile::Compressed(block) => block.dims(),
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            Tile::Dense(block) => block.rows(),
            Tile::Compressed(block) => block.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Tile::Dense(block) => block.cols(),
            Tile::Compressed(block) => block.cols(),
        }
    }

    pub fn full_rank(&self) -> usize {
        self.rows().min(self.cols())
    }

    /// `M × N`.
    pub fn logical_size(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Elements actually stored: `M × N` dense, `rank × (M + N)` compressed.
    pub fn stored_size(&self) -> usize {
        match self {
            Tile::Dense(block) => block.len(),
            Tile::Compressed(block) => block.stored_size(),
        }
    }

    /// `stored_size / logical_size`, 1 for an empty tile.
    pub fn compression_ratio(&self) -> f64 {
        match self.logical_size() {
            0 => 1.0,
            logical => self.stored_size() as f64 / logical as f64,
        }
    }

    /// Element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        match self {
            Tile::Dense(block) => block.get(index).copied(),
            Tile::Compressed(block) => block.get(index),
        }
    }

    pub fn reconstruct(&self) -> DenseBlock<T> {
        match self {
            Tile::Dense(block) => block.clone(),
            Tile::Compressed(block) => block.reconstruct(),
        }
    }

    pub fn into_dense(self) -> DenseBlock<T> {
        match self {
            Tile::Dense(block) => block,
            Tile::Compressed(block) => block.reconstruct(),
        }
    }

    /// Frobenius norm. Compressed tiles use the QR core of their factors.
    pub fn norm(&self) -> f64 {
        match self {
            Tile::Dense(block) => block.norm(),
            Tile::Compressed(block) => {
                match RankReductionEngine::for_block(block).factored_norm(block) {
                    Ok(norm) => norm,
                    Err(err) => {
                        tracing::warn!(error = %err, "factored norm failed, reconstructing");
                        block.reconstruct().norm()
                    }
                }
            }
        }
    }

    /// `‖self - other‖_F <= tolerance · max(‖other‖_F, 1)`.
    pub fn approx_eq(&self, other: &DenseBlock<T>, tolerance: f64) -> bool {
        match self {
            Tile::Dense(block) => block.approx_eq(other, tolerance),
            Tile::Compressed(block) => block.approx_eq(other, tolerance),
        }
    }

    // ------------------------------------------------------------------
    // Scaling
    // ------------------------------------------------------------------

    pub fn scale_to(&mut self, factor: T) -> &mut Self {
        algebra::scale_to(self, factor);
        self
    }

    #[must_use]
    pub fn scale(&self, factor: T) -> Self {
        let mut out = self.clone();
        out.scale_to(factor);
        out
    }

    pub fn neg_to(&mut self) -> &mut Self {
        self.scale_to(-T::one())
    }

    #[must_use]
    pub fn neg(&self) -> Self {
        self.scale(-T::one())
    }

    // ------------------------------------------------------------------
    // Addition and subtraction
    // ------------------------------------------------------------------

    /// `self += factor · other`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the extents differ, or `NumericFailure`
    /// if the dense fallback also fails. `self` is unchanged on error.
    pub fn add_scaled_to(&mut self, other: &Tile<T>, factor: T) -> Result<&mut Self> {
        algebra::add_to(self, other, factor)?;
        Ok(self)
    }

    pub fn add_to(&mut self, other: &Tile<T>) -> Result<&mut Self> {
        self.add_scaled_to(other, T::one())
    }

    /// `self -= factor · other`.
    pub fn subt_scaled_to(&mut self, other: &Tile<T>, factor: T) -> Result<&mut Self> {
        self.add_scaled_to(other, -factor)
    }

    pub fn subt_to(&mut self, other: &Tile<T>) -> Result<&mut Self> {
        self.subt_scaled_to(other, T::one())
    }

    /// `self + factor · other`.
    pub fn add_scaled(&self, other: &Tile<T>, factor: T) -> Result<Self> {
        let mut out = self.clone();
        out.add_scaled_to(other, factor)?;
        Ok(out)
    }

    pub fn add(&self, other: &Tile<T>) -> Result<Self> {
        self.add_scaled(other, T::one())
    }

    /// `self - factor · other`.
    pub fn subt_scaled(&self, other: &Tile<T>, factor: T) -> Result<Self> {
        self.add_scaled(other, -factor)
    }

    pub fn subt(&self, other: &Tile<T>) -> Result<Self> {
        self.subt_scaled(other, T::one())
    }

    // ------------------------------------------------------------------
    // Contraction
    // ------------------------------------------------------------------

    /// `factor · (self × other)` over `self`'s column group and `other`'s
    /// leading mode. The result has extents `[rows] ++ other.dims[1..]`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when `self.cols() != other.rows()`.
    pub fn multiply_scaled(&self, other: &Tile<T>, factor: T) -> Result<Self> {
        algebra::multiply(self, other, factor)
    }

    pub fn multiply(&self, other: &Tile<T>) -> Result<Self> {
        self.multiply_scaled(other, T::one())
    }

    /// `self += factor · (a × b)`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when `a` and `b` cannot be contracted or when
    /// their product does not have the extents of `self`.
    pub fn gemm_to(&mut self, a: &Tile<T>, b: &Tile<T>, factor: T) -> Result<&mut Self> {
        if a.cols() != b.rows() {
            return Err(TileError::shape("multiply", &a.dims(), &b.dims()));
        }
        let product = product_dims(&a.dims(), &b.dims());
        let dims = self.dims();
        if product != dims {
            return Err(TileError::shape("gemm", &dims, &product));
        }
        let ab = a.multiply_scaled(b, factor)?;
        self.add_to(&ab)
    }
}

impl<T: LinalgScalar> fmt::Display for Tile<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tile::Dense(block) => write!(
                f,
                "Tile (dense): Extents = {:?}. Stored = {}",
                block.dims(),
                block.len()
            ),
            Tile::Compressed(block) => write!(f, "Tile (compressed): {}", block),
        }
    }
}
