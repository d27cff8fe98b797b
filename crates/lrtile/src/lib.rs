//! Dense and low-rank tensor tiles
//!
//! This crate provides:
//! - `DenseBlock`: row-major N-dimensional blocks, matricized as `dims[0] × prod(dims[1..])`
//! - `CompressedBlock`: low-rank `left × right` factorizations with a fixed relative cut
//! - `RankReductionEngine`: truncated SVD compression, QR-core recompression and the rank gates
//! - `Tile`: a dense or compressed block whose arithmetic stays in the compressed domain
//!   while that is cheaper, and falls back to dense once it is not
//! - `FactorChain`: deferred products of several factors
//! - `StorageReport` / `array_diff`: accounting over collections of tiles
//!
//! # Example
//!
//! ```
//! use lrtile::{DenseBlock, Tile};
//!
//! // 30 × 30 block of rank 2
//! let block = DenseBlock::from_fn(&[30, 30], |idx| {
//!     let (i, j) = (idx[0] as f64, idx[1] as f64);
//!     (i + 1.0) * (j - 2.0) + (0.1 * i).cos() * (0.2 * j).sin()
//! });
//! let tile = Tile::from_dense(block.clone(), 1e-10).unwrap();
//! assert!(tile.is_compressed());
//! assert_eq!(tile.rank(), 2);
//! assert_eq!(tile.stored_size(), 2 * (30 + 30));
//!
//! let product = tile.multiply(&tile).unwrap();
//! assert!(product.rank() <= 2);
//! assert!(product.approx_eq(&block.matmul(&block).unwrap(), 1e-10));
//! ```
//!
//! ## Feature Flags
//!
//! - `backend-faer` (default): Use FAER for SVD, QR and GEMM
//! - `serde`: Serialize and deserialize tiles, blocks and rank policies

mod algebra;
pub mod chain;
pub mod config;
pub mod dense;
pub mod error;
pub mod lowrank;
pub mod reduction;
pub mod storage;
pub mod tile;

// Re-export main types
pub use chain::FactorChain;
pub use config::{
    validate_tolerance, CompressionOptions, RankPolicy, DEFAULT_COLLAPSE_DIVISOR,
    DEFAULT_RECOMPRESS_DIVISOR, DEFAULT_TOLERANCE,
};
pub use dense::DenseBlock;
pub use error::{Result, TileError};
pub use lowrank::CompressedBlock;
pub use lrtile_backend::LinalgScalar;
pub use reduction::RankReductionEngine;
pub use storage::{array_diff, StorageReport};
pub use tile::Tile;
