//! Backend dispatch for the SVD and QR factorizations.
//!
//! All mdarray-linalg types are wrapped so that downstream crates only see
//! row-major `Vec` buffers and the [`ThinSvd`] / [`ThinQr`] results.

use crate::scalar::LinalgScalar;
use anyhow::{bail, Result};
use mdarray::{DSlice, DTensor};
use mdarray_linalg::qr::QR;
use mdarray_linalg::svd::SVD;
use num_complex::ComplexFloat;

#[cfg(feature = "backend-faer")]
use mdarray_linalg_faer::Faer;

/// Full SVD factors straight from faer: `u` is m×m, `s` holds the singular
/// values in its first row, `vt` is the n×n transpose of V.
#[derive(Debug, Clone)]
pub struct SvdResult<T> {
    pub u: DTensor<T, 2>,
    pub s: DTensor<T, 2>,
    pub vt: DTensor<T, 2>,
}

/// Full SVD of `a`. The buffer is scratch space afterwards.
pub fn svd_backend<T: LinalgScalar>(a: &mut DSlice<T, 2>) -> Result<SvdResult<T>> {
    let decomp = {
        #[cfg(feature = "backend-faer")]
        {
            Faer.svd(a)
        }
        #[cfg(not(feature = "backend-faer"))]
        {
            compile_error!("The backend-faer feature must be enabled");
        }
    }
    .map_err(|e| anyhow::anyhow!("SVD computation failed: {}", e))?;

    Ok(SvdResult {
        u: to_owned_matrix(&decomp.u),
        s: to_owned_matrix(&decomp.s),
        vt: to_owned_matrix(&decomp.vt),
    })
}

fn to_owned_matrix<T: Clone>(tensor: &mdarray::Tensor<T, (usize, usize)>) -> DTensor<T, 2> {
    let dims = [tensor.dim(0), tensor.dim(1)];
    DTensor::<T, 2>::from_fn(dims, |idx| tensor[[idx[0], idx[1]]].clone())
}

/// Full QR of `a` as `(Q, R)` with Q m×m and R m×n.
pub fn qr_backend<T: LinalgScalar>(a: &mut DSlice<T, 2>) -> (DTensor<T, 2>, DTensor<T, 2>) {
    #[cfg(feature = "backend-faer")]
    {
        Faer.qr(a)
    }
    #[cfg(not(feature = "backend-faer"))]
    {
        compile_error!("The backend-faer feature must be enabled");
    }
}

/// Thin SVD `A = U · diag(s) · Vᴴ` of a row-major m×n matrix.
///
/// With `k = min(m, n)`, `u` is m×k, `s` has length k (descending), and
/// `vh` is k×n, all row-major.
#[derive(Debug, Clone)]
pub struct ThinSvd<T> {
    pub u: Vec<T>,
    pub s: Vec<f64>,
    pub vh: Vec<T>,
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

impl<T: LinalgScalar> ThinSvd<T> {
    /// Largest singular value, zero for an empty spectrum.
    pub fn max_singular_value(&self) -> f64 {
        self.s.first().copied().unwrap_or(0.0)
    }
}

/// Thin QR `A = Q · R` of a row-major m×n matrix.
///
/// With `k = min(m, n)`, `q` is m×k with orthonormal columns and `r` is k×n.
#[derive(Debug, Clone)]
pub struct ThinQr<T> {
    pub q: Vec<T>,
    pub r: Vec<T>,
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

fn to_dtensor<T: LinalgScalar>(data: &[T], m: usize, n: usize) -> DTensor<T, 2> {
    DTensor::<T, 2>::from_fn([m, n], |idx| data[idx[0] * n + idx[1]])
}

fn check_finite<T: LinalgScalar>(data: &[T], what: &str) -> Result<()> {
    if data.iter().any(|x| !x.is_finite_val()) {
        bail!("non-finite values encountered in {}", what);
    }
    Ok(())
}

/// Compute the thin SVD of a row-major m×n matrix.
///
/// # Errors
/// Fails if the input or the backend output contains non-finite values, or
/// if the backend does not converge.
pub fn thin_svd<T: LinalgScalar>(data: &[T], m: usize, n: usize) -> Result<ThinSvd<T>> {
    if data.len() != m * n {
        bail!("SVD input has {} elements, expected {}x{}", data.len(), m, n);
    }
    let k = m.min(n);
    if k == 0 {
        return Ok(ThinSvd {
            u: Vec::new(),
            s: Vec::new(),
            vh: Vec::new(),
            m,
            n,
            k,
        });
    }
    check_finite(data, "SVD input")?;

    let mut a_tensor = to_dtensor(data, m, n);
    let a_slice: &mut DSlice<T, 2> = a_tensor.as_mut();
    let SvdResult { u, s, vt } = svd_backend(a_slice)?;

    // `mdarray-linalg-faer` writes singular values into the first row of `s`.
    let mut s_vec: Vec<f64> = Vec::with_capacity(k);
    for i in 0..k {
        s_vec.push(s[[0, i]].re());
    }

    let mut u_vec = Vec::with_capacity(m * k);
    for i in 0..m {
        for j in 0..k {
            u_vec.push(u[[i, j]]);
        }
    }

    // The faer backend writes the plain transpose Vᵀ into `vt`, so Vᴴ needs a
    // conjugation (a no-op for real scalars). Only the first k rows are kept.
    let mut vh_vec = Vec::with_capacity(k * n);
    for i in 0..k {
        for j in 0..n {
            vh_vec.push(ComplexFloat::conj(vt[[i, j]]));
        }
    }

    if s_vec.iter().any(|x| !x.is_finite() || *x < 0.0) {
        bail!("SVD did not converge: invalid singular values");
    }
    check_finite(&u_vec, "left singular vectors")?;
    check_finite(&vh_vec, "right singular vectors")?;

    Ok(ThinSvd {
        u: u_vec,
        s: s_vec,
        vh: vh_vec,
        m,
        n,
        k,
    })
}

/// Compute the thin QR of a row-major m×n matrix.
///
/// # Errors
/// Fails if the input or the backend output contains non-finite values.
pub fn thin_qr<T: LinalgScalar>(data: &[T], m: usize, n: usize) -> Result<ThinQr<T>> {
    if data.len() != m * n {
        bail!("QR input has {} elements, expected {}x{}", data.len(), m, n);
    }
    let k = m.min(n);
    if k == 0 {
        return Ok(ThinQr {
            q: Vec::new(),
            r: Vec::new(),
            m,
            n,
            k,
        });
    }
    check_finite(data, "QR input")?;

    let mut a_tensor = to_dtensor(data, m, n);
    let a_slice: &mut DSlice<T, 2> = a_tensor.as_mut();
    let (q, r) = qr_backend(a_slice);

    let mut q_vec = Vec::with_capacity(m * k);
    for i in 0..m {
        for j in 0..k {
            q_vec.push(q[[i, j]]);
        }
    }
    let mut r_vec = Vec::with_capacity(k * n);
    for i in 0..k {
        for j in 0..n {
            r_vec.push(r[[i, j]]);
        }
    }
    check_finite(&q_vec, "QR factor Q")?;
    check_finite(&r_vec, "QR factor R")?;

    Ok(ThinQr {
        q: q_vec,
        r: r_vec,
        m,
        n,
        k,
    })
}
