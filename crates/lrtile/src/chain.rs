//! Deferred products of dense factors.

use crate::dense::DenseBlock;
use crate::error::{Result, TileError};
use crate::lowrank::CompressedBlock;
use lrtile_backend::LinalgScalar;

/// Ordered, non-empty sequence of factors whose product is the block.
///
/// Adjacent factors share their inner dimension:
/// `factors[i].cols() == factors[i + 1].rows()`. Only the trailing extents of
/// the last factor survive in the product.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorChain<T> {
    factors: Vec<DenseBlock<T>>,
}

impl<T: LinalgScalar> FactorChain<T> {
    pub fn new(first: DenseBlock<T>) -> Self {
        Self {
            factors: vec![first],
        }
    }

    /// # Errors
    /// Returns `EmptyChain` for no factors and `FactorMismatch` for the first
    /// adjacent pair that does not share its inner dimension.
    pub fn from_factors(factors: Vec<DenseBlock<T>>) -> Result<Self> {
        let mut iter = factors.into_iter();
        let first = iter.next().ok_or(TileError::EmptyChain)?;
        let mut chain = Self::new(first);
        for factor in iter {
            chain.push(factor)?;
        }
        Ok(chain)
    }

    /// Append a factor on the right.
    ///
    /// # Errors
    /// Returns `FactorMismatch` when `factor.rows()` differs from the
    /// current last factor's column count.
    pub fn push(&mut self, factor: DenseBlock<T>) -> Result<&mut Self> {
        let last = self.last();
        if last.cols() != factor.rows() {
            return Err(TileError::FactorMismatch {
                left: last.dims().to_vec(),
                right: factor.dims().to_vec(),
            });
        }
        self.factors.push(factor);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// A chain always holds at least one factor.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn factors(&self) -> &[DenseBlock<T>] {
        &self.factors
    }

    fn first(&self) -> &DenseBlock<T> {
        &self.factors[0]
    }

    fn last(&self) -> &DenseBlock<T> {
        &self.factors[self.factors.len() - 1]
    }

    /// Extents of the product.
    pub fn dims(&self) -> Vec<usize> {
        let mut dims = vec![self.first().rows()];
        dims.extend_from_slice(&self.last().dims()[1..]);
        dims
    }

    /// Smallest inner dimension, or `min(rows, cols)` for a single factor.
    pub fn rank(&self) -> usize {
        self.narrowest()
            .map(|(_, width)| width)
            .unwrap_or_else(|| self.first().full_rank())
    }

    /// Position and width of the narrowest inner dimension.
    fn narrowest(&self) -> Option<(usize, usize)> {
        self.factors[..self.factors.len() - 1]
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.cols()))
            .min_by_key(|&(_, width)| width)
    }

    /// Dense product of all factors.
    pub fn reconstruct(&self) -> Result<DenseBlock<T>> {
        let mut acc = self.first().clone();
        for factor in &self.factors[1..] {
            acc = acc.matmul(factor)?;
        }
        Ok(acc)
    }

    /// Contract the chain into a `left × right` pair split at the narrowest
    /// inner dimension.
    ///
    /// A single factor is compressed by truncated SVD instead.
    ///
    /// # Errors
    /// Returns `InvalidTolerance`, or `NumericFailure` from the SVD.
    pub fn into_compressed(self, tolerance: f64) -> Result<CompressedBlock<T>> {
        let Some((split, width)) = self.narrowest() else {
            return CompressedBlock::from_dense(self.first(), tolerance);
        };
        let m = self.first().rows();

        let (head, tail) = self.factors.split_at(split + 1);
        let mut left = head[0].clone();
        for factor in &head[1..] {
            left = left.matmul(factor)?;
        }
        let left = left.reshape(vec![m, width])?;

        let (last, middle) = tail.split_last().ok_or(TileError::EmptyChain)?;
        let mut right = last.clone();
        for factor in middle.iter().rev() {
            right = factor.matmul(&right)?;
        }

        tracing::trace!(factors = self.factors.len(), split, rank = width, "contracted factor chain");
        CompressedBlock::from_factors(left, right, tolerance)
    }
}
