//! Rank reduction: truncated SVD compression, recompression of factor
//! pairs, and the recompress / collapse gates.
//!
//! Recompression never forms the full `M × N` product. For `A = L · R` with
//! inner rank `r`:
//!
//! ```text
//! L  = Q_l · R_l          (thin QR, Q_l is M × k_l)
//! Rᴴ = Q_r · R_r          (thin QR, Q_r is N × k_r)
//! A  = Q_l · (R_l · R_rᴴ) · Q_rᴴ
//! ```
//!
//! and only the small `k_l × k_r` core `R_l · R_rᴴ` goes through the SVD. The
//! cost is proportional to `r² · (M + N)`.

use crate::config::{validate_tolerance, CompressionOptions, RankPolicy, DEFAULT_TOLERANCE};
use crate::dense::DenseBlock;
use crate::error::Result;
use crate::lowrank::CompressedBlock;
use lrtile_backend::{adjoint, frobenius_norm, matmul, thin_qr, thin_svd, LinalgScalar, ThinSvd};

/// Truncation and representation decisions for compressed blocks.
#[derive(Debug, Clone, Copy)]
pub struct RankReductionEngine {
    tolerance: f64,
    max_rank: Option<usize>,
    policy: RankPolicy,
}

impl Default for RankReductionEngine {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_rank: None,
            policy: RankPolicy::default(),
        }
    }
}

impl RankReductionEngine {
    /// # Errors
    ///
    /// Returns `InvalidTolerance` or `InvalidPolicy`.
    pub fn new(tolerance: f64, policy: RankPolicy) -> Result<Self> {
        validate_tolerance(tolerance)?;
        policy.validate()?;
        Ok(Self {
            tolerance,
            max_rank: None,
            policy,
        })
    }

    /// # Errors
    ///
    /// Returns `InvalidTolerance` or `InvalidPolicy`.
    pub fn from_options(options: &CompressionOptions) -> Result<Self> {
        let mut engine = Self::new(options.effective_tolerance(), options.policy)?;
        engine.max_rank = options.max_rank;
        Ok(engine)
    }

    /// Engine matching the cut and policy of an existing block.
    pub fn for_block<T: LinalgScalar>(block: &CompressedBlock<T>) -> Self {
        Self {
            tolerance: block.cut(),
            max_rank: None,
            policy: block.policy(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn policy(&self) -> RankPolicy {
        self.policy
    }

    /// Number of leading singular values to keep.
    ///
    /// Keeps `σ_i > tolerance · σ_max`; an all-zero spectrum gives rank 0.
    pub fn retained_rank(&self, singular_values: &[f64]) -> usize {
        let s_max = singular_values.iter().copied().fold(0.0, f64::max);
        if s_max == 0.0 {
            return 0;
        }
        let threshold = self.tolerance * s_max;
        let r = singular_values
            .iter()
            .take_while(|&&s| s > threshold)
            .count();
        match self.max_rank {
            Some(max_rank) => r.min(max_rank),
            None => r,
        }
    }

    /// `rank >= full_rank / recompress_divisor`.
    pub fn should_recompress(&self, rank: usize, full_rank: usize) -> bool {
        self.policy.should_recompress(rank, full_rank)
    }

    /// `rank > full_rank / collapse_divisor`.
    pub fn should_collapse_to_dense(&self, rank: usize, full_rank: usize) -> bool {
        self.policy.should_collapse_to_dense(rank, full_rank)
    }

    /// Compress a dense block by truncated SVD.
    ///
    /// `left = U·Σ` (M × r) and `right = Vᴴ` (r × trailing extents).
    ///
    /// # Errors
    /// Returns `NumericFailure` if the SVD fails.
    pub fn compress<T: LinalgScalar>(&self, block: &DenseBlock<T>) -> Result<CompressedBlock<T>> {
        let (m, n) = (block.rows(), block.cols());
        let svd = thin_svd(block.as_slice(), m, n)?;
        let r = self.retained_rank(&svd.s);
        tracing::trace!(rows = m, cols = n, rank = r, "compressed dense block");
        let (left, right) = truncate_svd(&svd, r);
        self.assemble(left, right, m, block.dims(), r)
    }

    /// Recompute a minimal-rank factorization of `block`.
    ///
    /// The returned rank never exceeds the input rank.
    ///
    /// # Errors
    /// Returns `NumericFailure` if a QR or the core SVD fails.
    pub fn recompress<T: LinalgScalar>(
        &self,
        block: &CompressedBlock<T>,
    ) -> Result<CompressedBlock<T>> {
        let r = block.rank();
        if r == 0 {
            return Ok(block.clone());
        }
        let (m, n) = (block.rows(), block.cols());
        let core = FactoredCore::new(block.left().as_slice(), block.right().as_slice(), m, r, n)?;

        let svd = thin_svd(&core.core, core.kl, core.kr)?;
        let new_rank = self.retained_rank(&svd.s).min(r);
        let (u_s, vh) = truncate_svd(&svd, new_rank);

        // Q_l (M × k_l) · U·Σ (k_l × r')
        let left = matmul(&core.ql, &u_s, m, core.kl, new_rank);
        // Vᴴ (r' × k_r) · Q_rᴴ (k_r × N)
        let qr_h = adjoint(&core.qr, n, core.kr);
        let right = matmul(&vh, &qr_h, new_rank, core.kr, n);

        tracing::trace!(rank = r, new_rank, rows = m, cols = n, "recompressed factors");
        let out = self.assemble(left, right, m, &block.dims(), new_rank)?;
        out.debug_check_invariants();
        Ok(out)
    }

    /// Frobenius norm of `L · R` without forming the product.
    ///
    /// # Errors
    /// Returns `NumericFailure` if a QR fails.
    pub fn factored_norm<T: LinalgScalar>(&self, block: &CompressedBlock<T>) -> Result<f64> {
        let r = block.rank();
        if r == 0 {
            return Ok(0.0);
        }
        let core = FactoredCore::new(
            block.left().as_slice(),
            block.right().as_slice(),
            block.rows(),
            r,
            block.cols(),
        )?;
        Ok(frobenius_norm(&core.core))
    }

    fn assemble<T: LinalgScalar>(
        &self,
        left: Vec<T>,
        right: Vec<T>,
        m: usize,
        dims: &[usize],
        r: usize,
    ) -> Result<CompressedBlock<T>> {
        let left = DenseBlock::from_matrix(m, r, left)?;
        let mut right_dims = Vec::with_capacity(dims.len());
        right_dims.push(r);
        right_dims.extend_from_slice(&dims[1..]);
        let right = DenseBlock::new(right_dims, right)?;
        CompressedBlock::from_parts(left, right, self.tolerance, self.policy)
    }
}

/// `k_l × k_r` core of a factor pair together with the orthonormal bases
/// from the two thin QRs.
struct FactoredCore<T> {
    ql: Vec<T>,
    qr: Vec<T>,
    core: Vec<T>,
    kl: usize,
    kr: usize,
}

impl<T: LinalgScalar> FactoredCore<T> {
    fn new(left: &[T], right: &[T], m: usize, r: usize, n: usize) -> Result<Self> {
        let qr_l = thin_qr(left, m, r)?;
        let right_h = adjoint(right, r, n);
        let qr_r = thin_qr(&right_h, n, r)?;
        // R_l (k_l × r) · R_rᴴ (r × k_r)
        let rr_h = adjoint(&qr_r.r, qr_r.k, r);
        let core = matmul(&qr_l.r, &rr_h, qr_l.k, r, qr_r.k);
        Ok(Self {
            ql: qr_l.q,
            qr: qr_r.q,
            core,
            kl: qr_l.k,
            kr: qr_r.k,
        })
    }
}

/// Split a thin SVD into `U·Σ` (m × r) and `Vᴴ` (r × n), keeping `r` triplets.
fn truncate_svd<T: LinalgScalar>(svd: &ThinSvd<T>, r: usize) -> (Vec<T>, Vec<T>) {
    let (m, n, k) = (svd.m, svd.n, svd.k);
    let mut u_s = Vec::with_capacity(m * r);
    for i in 0..m {
        for j in 0..r {
            u_s.push(svd.u[i * k + j] * T::from_real(svd.s[j]));
        }
    }
    let vh = svd.vh[..r * n].to_vec();
    (u_s, vh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(values: &[f64]) -> DenseBlock<f64> {
        let n = values.len();
        DenseBlock::from_fn(&[n, n], |idx| if idx[0] == idx[1] { values[idx[0]] } else { 0.0 })
    }

    #[test]
    fn test_retained_rank_relative_cut() {
        let engine = RankReductionEngine::new(1e-3, RankPolicy::default()).unwrap();
        assert_eq!(engine.retained_rank(&[10.0, 1.0, 0.011, 0.009]), 3);
        assert_eq!(engine.retained_rank(&[0.0, 0.0]), 0);
        assert_eq!(engine.retained_rank(&[]), 0);
    }

    #[test]
    fn test_retained_rank_max_rank() {
        let opts = CompressionOptions::new().with_tolerance(0.0).with_max_rank(2);
        let engine = RankReductionEngine::from_options(&opts).unwrap();
        assert_eq!(engine.retained_rank(&[3.0, 2.0, 1.0]), 2);
    }

    #[test]
    fn test_compress_diagonal() {
        let engine = RankReductionEngine::new(1e-6, RankPolicy::default()).unwrap();
        let block = diag(&[5.0, 3.0, 1e-9, 0.0]);
        let c = engine.compress(&block).unwrap();
        assert_eq!(c.rank(), 2);
        assert!(c.reconstruct().max_abs_diff(&block).unwrap() < 1e-8);
    }

    #[test]
    fn test_compress_zero_block() {
        let engine = RankReductionEngine::default();
        let c = engine.compress(&DenseBlock::<f64>::zeros(&[3, 4])).unwrap();
        assert_eq!(c.rank(), 0);
        assert_eq!(c.dims(), vec![3, 4]);
        assert_eq!(c.reconstruct(), DenseBlock::zeros(&[3, 4]));
    }

    #[test]
    fn test_compress_vector_block() {
        let engine = RankReductionEngine::default();
        let block = DenseBlock::new(vec![3], vec![1.0, 2.0, 2.0]).unwrap();
        let c = engine.compress(&block).unwrap();
        assert_eq!(c.rank(), 1);
        assert_eq!(c.right().dims(), &[1]);
        assert_eq!(c.dims(), vec![3]);
    }

    #[test]
    fn test_recompress_removes_duplicate_columns() {
        // [u | u] [v; v] has rank 1
        let engine = RankReductionEngine::new(1e-10, RankPolicy::default()).unwrap();
        let left = DenseBlock::from_rows(vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]).unwrap();
        let right = DenseBlock::from_rows(vec![vec![1.0, 0.5, -1.0, 2.0], vec![1.0, 0.5, -1.0, 2.0]]).unwrap();
        let block = CompressedBlock::from_factors(left, right, 1e-10).unwrap();
        let before = block.reconstruct();
        let reduced = engine.recompress(&block).unwrap();
        assert_eq!(reduced.rank(), 1);
        assert!(reduced.reconstruct().max_abs_diff(&before).unwrap() < 1e-12);
    }

    #[test]
    fn test_recompress_rank_zero_is_identity() {
        let engine = RankReductionEngine::default();
        let block = CompressedBlock::<f64>::zeros(&[4, 5], 1e-7).unwrap();
        let reduced = engine.recompress(&block).unwrap();
        assert_eq!(reduced.rank(), 0);
    }

    #[test]
    fn test_factored_norm() {
        let engine = RankReductionEngine::default();
        let block = diag(&[3.0, 4.0, 0.0]);
        let c = engine.compress(&block).unwrap();
        assert!((engine.factored_norm(&c).unwrap() - 5.0).abs() < 1e-12);
    }
}
