//! Arithmetic on tiles, routed by representation pair.
//!
//! # Modules
//!
//! - [`add`]: sums; compressed pairs concatenate factors and pass through the gates
//! - [`multiply`]: contractions over `A`'s column group and `B`'s leading mode
//!
//! Every entry point checks extents before any numerical work. A numerical
//! failure while reducing rank falls back to the exact dense result for that
//! operation only.

pub(crate) mod add;
pub(crate) mod multiply;

use crate::dense::DenseBlock;
use crate::error::Result;
use crate::lowrank::CompressedBlock;
use crate::reduction::RankReductionEngine;
use crate::tile::Tile;
use lrtile_backend::LinalgScalar;

pub(crate) use add::add_to;
pub(crate) use multiply::multiply;

/// Multiply a tile by `factor`. Compressed tiles only touch the left factor.
pub(crate) fn scale_to<T: LinalgScalar>(tile: &mut Tile<T>, factor: T) {
    match tile {
        Tile::Dense(block) => {
            block.scale_to(factor);
        }
        Tile::Compressed(block) => {
            block.scale_to(factor);
        }
    }
}

/// Choose the representation for a freshly combined factor pair.
///
/// Recompresses when `recompress` is set and the recompress gate fires, or
/// unconditionally when the rank exceeds `full_rank`. Then demotes to dense if
/// the collapse gate fires on the resulting rank.
pub(crate) fn settle<T: LinalgScalar>(
    block: CompressedBlock<T>,
    full_rank: usize,
    recompress: bool,
) -> Result<Tile<T>> {
    let engine = RankReductionEngine::for_block(&block);
    let rank = block.rank();
    let block = if rank > full_rank || (recompress && engine.should_recompress(rank, full_rank)) {
        let reduced = engine.recompress(&block)?;
        tracing::debug!(
            rank_before = block.rank(),
            rank = reduced.rank(),
            full_rank,
            "recompressed"
        );
        reduced
    } else {
        block
    };

    if engine.should_collapse_to_dense(block.rank(), full_rank) {
        tracing::debug!(rank = block.rank(), full_rank, "collapsed to dense");
        Ok(Tile::Dense(block.reconstruct()))
    } else {
        tracing::debug!(rank = block.rank(), full_rank, "kept compressed");
        Ok(Tile::Compressed(block))
    }
}

/// Replace a numerical failure by the exact dense result.
///
/// Other errors pass through, as does a failure of the fallback itself.
pub(crate) fn or_dense<T: LinalgScalar>(
    op: &'static str,
    result: Result<Tile<T>>,
    fallback: impl FnOnce() -> Result<DenseBlock<T>>,
) -> Result<Tile<T>> {
    match result {
        Err(err) if err.is_numeric() => {
            tracing::warn!(op, error = %err, "rank reduction failed, using dense result");
            fallback().map(Tile::Dense)
        }
        other => other,
    }
}
