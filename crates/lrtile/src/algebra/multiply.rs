//! `factor · (lhs × rhs)` over `lhs`'s column group and `rhs`'s leading mode.

use super::{or_dense, settle};
use crate::dense::product_dims;
use crate::error::{Result, TileError};
use crate::lowrank::CompressedBlock;
use crate::tile::Tile;
use lrtile_backend::LinalgScalar;

/// Contract two tiles and scale the product by `factor`.
///
/// Any dense operand gives a dense result. For two compressed operands the
/// `r1 × r2` inner product `R1 · L2` is formed first and attached to the side
/// that leaves rank `min(r1, r2)`.
pub(crate) fn multiply<T: LinalgScalar>(lhs: &Tile<T>, rhs: &Tile<T>, factor: T) -> Result<Tile<T>> {
    if lhs.cols() != rhs.rows() {
        return Err(TileError::shape("multiply", &lhs.dims(), &rhs.dims()));
    }

    match (lhs, rhs) {
        (Tile::Dense(a), Tile::Dense(b)) => {
            let mut out = a.matmul(b)?;
            out.scale_to(factor);
            Ok(Tile::Dense(out))
        }
        (Tile::Dense(a), Tile::Compressed(b)) => {
            // (A · L) · R
            let mut al = a.matmul(b.left())?;
            al.scale_to(factor);
            Ok(Tile::Dense(al.matmul(b.right())?))
        }
        (Tile::Compressed(a), Tile::Dense(b)) => {
            // L · (R · B)
            let mut rb = a.right().matmul(b)?;
            rb.scale_to(factor);
            Ok(Tile::Dense(a.left().matmul(&rb)?))
        }
        (Tile::Compressed(a), Tile::Compressed(b)) => multiply_compressed(a, b, factor),
    }
}

fn multiply_compressed<T: LinalgScalar>(
    a: &CompressedBlock<T>,
    b: &CompressedBlock<T>,
    factor: T,
) -> Result<Tile<T>> {
    let (r1, r2) = (a.rank(), b.rank());
    let mut inner = a.right().matmul(b.left())?;
    inner.scale_to(factor);
    tracing::trace!(r1, r2, "formed inner product");

    let (left, right) = if r2 <= r1 {
        (a.left().matmul(&inner)?, b.right().clone())
    } else {
        (a.left().clone(), inner.matmul(b.right())?)
    };

    let dims = product_dims(&a.dims(), &b.dims());
    let full_rank = full_rank_of(&dims);
    let product = CompressedBlock::from_parts(left, right, a.cut(), a.policy())?;
    or_dense("multiply", settle(product, full_rank, r1 != r2), || {
        let mut out = a.reconstruct().matmul(&b.reconstruct())?;
        out.scale_to(factor);
        Ok(out)
    })
}

fn full_rank_of(dims: &[usize]) -> usize {
    let cols: usize = dims[1..].iter().product();
    dims[0].min(cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseBlock;

    fn low_rank(m: usize, n: usize, r: usize) -> DenseBlock<f64> {
        DenseBlock::from_fn(&[m, n], |idx| {
            let x = (idx[0] + 1) as f64 / m as f64;
            (0..r)
                .map(|k| x.powi(k as i32) * (0.3 * (k + 1) as f64 * idx[1] as f64 + 0.1).cos())
                .sum()
        })
    }

    fn compressed(block: &DenseBlock<f64>) -> Tile<f64> {
        Tile::Compressed(CompressedBlock::from_dense(block, 1e-12).unwrap())
    }

    fn dense_product(a: &DenseBlock<f64>, b: &DenseBlock<f64>, factor: f64) -> DenseBlock<f64> {
        let mut out = a.matmul(b).unwrap();
        out.scale_to(factor);
        out
    }

    #[test]
    fn test_mixed_operands_are_dense() {
        let a = low_rank(8, 6, 2);
        let b = low_rank(6, 5, 1);
        let expected = dense_product(&a, &b, 1.5);

        let dc = multiply(&Tile::Dense(a.clone()), &compressed(&b), 1.5).unwrap();
        assert!(dc.is_dense());
        assert!(dc.reconstruct().approx_eq(&expected, 1e-10));

        let cd = multiply(&compressed(&a), &Tile::Dense(b.clone()), 1.5).unwrap();
        assert!(cd.is_dense());
        assert!(cd.reconstruct().approx_eq(&expected, 1e-10));
    }

    #[test]
    fn test_inner_attached_to_smaller_rank() {
        let a = low_rank(30, 24, 3);
        let b = low_rank(24, 36, 1);
        let ta = compressed(&a);
        let tb = compressed(&b);
        assert_eq!(ta.rank(), 3);
        assert_eq!(tb.rank(), 1);

        let ab = multiply(&ta, &tb, 1.0).unwrap();
        assert!(ab.is_compressed());
        assert_eq!(ab.rank(), 1);
        assert!(ab.reconstruct().approx_eq(&dense_product(&a, &b, 1.0), 1e-10));

        let bt = low_rank(36, 30, 1);
        let ba = multiply(&compressed(&bt), &ta, 1.0).unwrap();
        assert_eq!(ba.rank(), 1);
        assert!(ba.reconstruct().approx_eq(&dense_product(&bt, &a, 1.0), 1e-10));
    }

    #[test]
    fn test_higher_order_rhs() {
        let a = low_rank(5, 4, 1);
        let b = DenseBlock::from_fn(&[4, 2, 3], |idx| (idx[0] + 1) as f64 * (idx[1] + 2 * idx[2]) as f64);
        let out = multiply(&compressed(&a), &compressed(&b), 2.0).unwrap();
        assert_eq!(out.dims(), vec![5, 2, 3]);
        let expected = dense_product(&a, &b, 2.0);
        assert!(out.reconstruct().approx_eq(&expected, 1e-10));
    }

    #[test]
    fn test_inner_dimension_mismatch() {
        let a = Tile::Dense(DenseBlock::<f64>::zeros(&[3, 4]));
        let b = Tile::Dense(DenseBlock::<f64>::zeros(&[5, 3]));
        assert!(matches!(
            multiply(&a, &b, 1.0),
            Err(TileError::ShapeMismatch { op: "multiply", .. })
        ));
    }
}
