//! Matrix products and norms over row-major buffers.

use crate::scalar::LinalgScalar;
use faer::linalg::matmul::matmul as faer_matmul;
use faer::{Accum, Par};

/// `C[m, n] = A[m, k] · B[k, n]` for row-major buffers.
///
/// # Panics
/// Panics if the buffer lengths do not match the given extents.
pub fn matmul<T: LinalgScalar>(a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Vec<T> {
    let mut c = vec![T::zero(); m * n];
    matmul_into(&mut c, a, b, m, k, n, T::one(), false);
    c
}

/// `C += alpha · A · B` (or `C = alpha · A · B` when `accumulate` is false).
///
/// # Panics
/// Panics if the buffer lengths do not match the given extents.
#[allow(clippy::too_many_arguments)]
pub fn matmul_into<T: LinalgScalar>(
    c: &mut [T],
    a: &[T],
    b: &[T],
    m: usize,
    k: usize,
    n: usize,
    alpha: T,
    accumulate: bool,
) {
    assert_eq!(a.len(), m * k, "lhs has wrong length for {}x{}", m, k);
    assert_eq!(b.len(), k * n, "rhs has wrong length for {}x{}", k, n);
    assert_eq!(c.len(), m * n, "output has wrong length for {}x{}", m, n);

    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        if !accumulate {
            c.iter_mut().for_each(|x| *x = T::zero());
        }
        return;
    }

    // Row-major views: row stride is the number of columns, column stride 1.
    // SAFETY: the lengths are checked above and the views do not outlive the slices.
    let a_mat = unsafe { faer::MatRef::from_raw_parts(a.as_ptr(), m, k, k as isize, 1) };
    let b_mat = unsafe { faer::MatRef::from_raw_parts(b.as_ptr(), k, n, n as isize, 1) };
    let mut c_mat =
        unsafe { faer::MatMut::from_raw_parts_mut(c.as_mut_ptr(), m, n, n as isize, 1) };

    let accum = if accumulate {
        Accum::Add
    } else {
        Accum::Replace
    };
    faer_matmul(&mut c_mat, accum, a_mat, b_mat, alpha, Par::Seq);
}

/// Conjugate transpose of a row-major m×n buffer, returned as n×m.
pub fn adjoint<T: LinalgScalar>(a: &[T], m: usize, n: usize) -> Vec<T> {
    debug_assert_eq!(a.len(), m * n);
    let mut out = Vec::with_capacity(m * n);
    for j in 0..n {
        for i in 0..m {
            out.push(num_complex::ComplexFloat::conj(a[i * n + j]));
        }
    }
    out
}

/// Frobenius norm of a buffer.
pub fn frobenius_norm<T: LinalgScalar>(a: &[T]) -> f64 {
    a.iter().map(|x| x.abs_sq()).sum::<f64>().sqrt()
}
