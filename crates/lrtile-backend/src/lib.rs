//! Dense linear-algebra boundary for low-rank tiles.
//!
//! This crate provides:
//! - [`LinalgScalar`]: element types (`f64`, `Complex64`)
//! - Thin SVD and thin QR over row-major buffers ([`thin_svd`], [`thin_qr`])
//! - GEMM and Frobenius norm ([`matmul`], [`matmul_into`], [`frobenius_norm`])
//!
//! The `mdarray-linalg` dependency is kept internal to isolate API changes.
//!
//! ## Feature Flags
//!
//! - `backend-faer` (default): Use FAER for linear algebra operations

pub mod backend;
pub mod gemm;
pub mod scalar;

pub use backend::{qr_backend, svd_backend, thin_qr, thin_svd, SvdResult, ThinQr, ThinSvd};
pub use gemm::{adjoint, frobenius_norm, matmul, matmul_into};
pub use scalar::LinalgScalar;

pub use faer_traits;
pub use mdarray;
