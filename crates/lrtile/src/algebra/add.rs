//! `lhs += factor · rhs` for every representation pair.

use super::{or_dense, settle};
use crate::error::{Result, TileError};
use crate::lowrank::CompressedBlock;
use crate::tile::Tile;
use lrtile_backend::LinalgScalar;

/// `lhs += factor · rhs`. `lhs` is left untouched when an error is returned.
///
/// Any dense operand gives a dense result. Two compressed operands
/// concatenate their factors and settle through the rank gates.
pub(crate) fn add_to<T: LinalgScalar>(lhs: &mut Tile<T>, rhs: &Tile<T>, factor: T) -> Result<()> {
    let (lhs_dims, rhs_dims) = (lhs.dims(), rhs.dims());
    if lhs_dims != rhs_dims {
        return Err(TileError::shape("add", &lhs_dims, &rhs_dims));
    }

    let replacement = match (&mut *lhs, rhs) {
        (Tile::Dense(a), Tile::Dense(b)) => {
            a.add_scaled_to(b, factor)?;
            None
        }
        (Tile::Dense(a), Tile::Compressed(b)) => {
            // a += factor · L · R
            a.gemm_to(b.left(), b.right(), factor)?;
            None
        }
        (Tile::Compressed(a), Tile::Dense(b)) => {
            let mut out = a.reconstruct();
            out.add_scaled_to(b, factor)?;
            Some(Tile::Dense(out))
        }
        (Tile::Compressed(a), Tile::Compressed(b)) => Some(add_compressed(a, b, factor)?),
    };

    if let Some(tile) = replacement {
        *lhs = tile;
    }
    Ok(())
}

fn add_compressed<T: LinalgScalar>(
    a: &CompressedBlock<T>,
    b: &CompressedBlock<T>,
    factor: T,
) -> Result<Tile<T>> {
    let full_rank = a.full_rank().max(b.full_rank());
    let sum = a.concat(b, factor)?;
    or_dense("add", settle(sum, full_rank, true), || {
        let mut out = a.reconstruct();
        out.gemm_to(b.left(), b.right(), factor)?;
        Ok(out)
    })
}
