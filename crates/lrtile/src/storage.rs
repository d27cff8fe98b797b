//! Storage and accuracy accounting over collections of tiles.

use crate::dense::DenseBlock;
use crate::error::{Result, TileError};
use crate::tile::Tile;
use lrtile_backend::LinalgScalar;
use std::fmt;
use std::ops::AddAssign;

const BYTES_PER_ELEMENT: f64 = 8.0;
const BYTES_PER_GIGABYTE: f64 = 1e9;

/// Element counts for an array of tiles, where a missing tile is zero.
///
/// - `full`: logical size of every tile, present or not
/// - `sparse`: logical size of present tiles
/// - `low_rank`: stored size of present tiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageReport {
    pub full: usize,
    pub sparse: usize,
    pub low_rank: usize,
}

impl StorageReport {
    /// Account a single tile slot with the given extents.
    pub fn record<T: LinalgScalar>(&mut self, dims: &[usize], tile: Option<&Tile<T>>) {
        self.full += dims.iter().product::<usize>();
        if let Some(tile) = tile {
            self.sparse += tile.logical_size();
            self.low_rank += tile.stored_size();
        }
    }

    /// Report over `(extents, tile)` slots.
    pub fn from_slots<'a, T, I>(slots: I) -> Self
    where
        T: LinalgScalar,
        I: IntoIterator<Item = (&'a [usize], Option<&'a Tile<T>>)>,
    {
        let mut report = Self::default();
        for (dims, tile) in slots {
            report.record(dims, tile);
        }
        report
    }

    /// `(full, sparse, low_rank)` in gigabytes at 8 bytes per element.
    pub fn gigabytes(&self) -> (f64, f64, f64) {
        let gb = |n: usize| n as f64 * BYTES_PER_ELEMENT / BYTES_PER_GIGABYTE;
        (gb(self.full), gb(self.sparse), gb(self.low_rank))
    }

    /// `low_rank / sparse`, or 1 when nothing is stored.
    pub fn compression_ratio(&self) -> f64 {
        if self.sparse == 0 {
            1.0
        } else {
            self.low_rank as f64 / self.sparse as f64
        }
    }

    pub fn merge(&mut self, other: &StorageReport) {
        *self += *other;
    }
}

impl AddAssign for StorageReport {
    fn add_assign(&mut self, other: Self) {
        self.full += other.full;
        self.sparse += other.sparse;
        self.low_rank += other.low_rank;
    }
}

impl fmt::Display for StorageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (full, sparse, low_rank) = self.gigabytes();
        write!(
            f,
            "Storage: full = {:.6} GB, sparse = {:.6} GB, low rank = {:.6} GB (ratio {:.4})",
            full,
            sparse,
            low_rank,
            self.compression_ratio()
        )
    }
}

/// Frobenius norm of the difference between reference blocks and tiles,
/// divided by the total volume of all slots.
///
/// Each slot is `(extents, reference, tile)`; a missing reference or tile is
/// a zero block of those extents.
///
/// # Errors
/// Returns `ShapeMismatch` when a present block differs from its slot's extents.
pub fn array_diff<'a, T, I>(slots: I) -> Result<f64>
where
    T: LinalgScalar,
    I: IntoIterator<Item = (&'a [usize], Option<&'a DenseBlock<T>>, Option<&'a Tile<T>>)>,
{
    let mut squared = 0.0;
    let mut volume = 0usize;
    for (dims, expected, tile) in slots {
        if let Some(expected) = expected {
            if expected.dims() != dims {
                return Err(TileError::shape("array_diff", dims, expected.dims()));
            }
        }
        if let Some(tile) = tile {
            if tile.dims() != dims {
                return Err(TileError::shape("array_diff", dims, &tile.dims()));
            }
        }
        let diff = match (expected, tile) {
            (Some(expected), Some(tile)) => tile.reconstruct().diff_norm(expected)?,
            (Some(expected), None) => expected.norm(),
            (None, Some(tile)) => tile.norm(),
            (None, None) => 0.0,
        };
        squared += diff * diff;
        volume += dims.iter().product::<usize>();
    }
    if volume == 0 {
        return Ok(0.0);
    }
    Ok(squared.sqrt() / volume as f64)
}
