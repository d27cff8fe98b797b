//! Dense blocks: row-major N-dimensional arrays matricized as
//! `dims[0] × prod(dims[1..])`.

use crate::error::{Result, TileError};
use lrtile_backend::{adjoint, frobenius_norm, matmul, matmul_into, LinalgScalar};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Dense row-major block with an N-dimensional extent.
///
/// All arithmetic treats the block as a matrix with `rows() = dims[0]` and
/// `cols() = prod(dims[1..])`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "DenseBlockData<T>",
        bound(deserialize = "T: LinalgScalar + serde::Deserialize<'de>")
    )
)]
pub struct DenseBlock<T> {
    dims: Vec<usize>,
    data: Vec<T>,
}

/// Wire form of a [`DenseBlock`], checked by [`DenseBlock::new`] on the way in.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DenseBlockData<T> {
    dims: Vec<usize>,
    data: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: LinalgScalar> TryFrom<DenseBlockData<T>> for DenseBlock<T> {
    type Error = TileError;

    fn try_from(raw: DenseBlockData<T>) -> Result<Self> {
        Self::new(raw.dims, raw.data)
    }
}

fn volume(dims: &[usize]) -> usize {
    dims.iter().product()
}

impl<T: LinalgScalar> DenseBlock<T> {
    /// Create a block from extents and row-major data.
    ///
    /// # Errors
    /// Returns `NoExtents` for empty `dims` and `InvalidData` when the
    /// data length differs from the product of the extents.
    pub fn new(dims: Vec<usize>, data: Vec<T>) -> Result<Self> {
        if dims.is_empty() {
            return Err(TileError::NoExtents);
        }
        let expected = volume(&dims);
        if data.len() != expected {
            return Err(TileError::InvalidData {
                dims,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Create an m×n matrix from row-major data.
    pub fn from_matrix(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        Self::new(vec![rows, cols], data)
    }

    /// Create a matrix from nested rows.
    ///
    /// # Errors
    /// Returns `InvalidData` when rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        let data: Vec<T> = rows.into_iter().flatten().collect();
        Self::from_matrix(nrows, ncols, data)
    }

    /// Zero-filled block.
    ///
    /// # Panics
    /// Panics if `dims` is empty.
    pub fn zeros(dims: &[usize]) -> Self {
        assert!(!dims.is_empty(), "a block needs at least one extent");
        Self {
            dims: dims.to_vec(),
            data: vec![T::zero(); volume(dims)],
        }
    }

    /// n×n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut block = Self::zeros(&[n, n]);
        for i in 0..n {
            block.data[i * n + i] = T::one();
        }
        block
    }

    /// Build a block by evaluating `f` at every multi-index (row-major order).
    ///
    /// # Panics
    /// Panics if `dims` is empty.
    pub fn from_fn(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        assert!(!dims.is_empty(), "a block needs at least one extent");
        let total = volume(dims);
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; dims.len()];
        for _ in 0..total {
            data.push(f(&idx));
            for axis in (0..dims.len()).rev() {
                idx[axis] += 1;
                if idx[axis] < dims[axis] {
                    break;
                }
                idx[axis] = 0;
            }
        }
        Self {
            dims: dims.to_vec(),
            data,
        }
    }

    /// Extents of the block.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of modes.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Row count of the matricized block.
    pub fn rows(&self) -> usize {
        self.dims[0]
    }

    /// Column count of the matricized block.
    pub fn cols(&self) -> usize {
        volume(&self.dims[1..])
    }

    /// `min(rows, cols)`.
    pub fn full_rank(&self) -> usize {
        self.rows().min(self.cols())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Reinterpret the data with new extents of the same volume.
    pub fn reshape(self, dims: Vec<usize>) -> Result<Self> {
        Self::new(dims, self.data)
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &d) in index.iter().zip(self.dims.iter()) {
            if i >= d {
                return None;
            }
            offset = offset * d + i;
        }
        Some(offset)
    }

    /// Element at a multi-index, `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.offset(index).map(|o| &self.data[o])
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        self.offset(index).map(move |o| &mut self.data[o])
    }

    /// Multiply every element by `factor`.
    pub fn scale_to(&mut self, factor: T) -> &mut Self {
        self.data.iter_mut().for_each(|x| *x = *x * factor);
        self
    }

    /// `self += factor · other`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the extents differ.
    pub fn add_scaled_to(&mut self, other: &DenseBlock<T>, factor: T) -> Result<&mut Self> {
        if self.dims != other.dims {
            return Err(TileError::shape("add", &self.dims, &other.dims));
        }
        for (x, &y) in self.data.iter_mut().zip(other.data.iter()) {
            *x += factor * y;
        }
        Ok(self)
    }

    /// Matrix product over `self`'s column group and `other`'s leading mode.
    ///
    /// The result has extents `[self.rows()] ++ other.dims[1..]`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when `self.cols() != other.rows()`.
    pub fn matmul(&self, other: &DenseBlock<T>) -> Result<DenseBlock<T>> {
        if self.cols() != other.rows() {
            return Err(TileError::shape("multiply", &self.dims, &other.dims));
        }
        let (m, k, n) = (self.rows(), self.cols(), other.cols());
        let data = matmul(&self.data, &other.data, m, k, n);
        Ok(DenseBlock {
            dims: product_dims(&self.dims, &other.dims),
            data,
        })
    }

    /// `self += alpha · a · b` without allocating the product.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the inner dimensions or the output
    /// extents do not agree.
    pub fn gemm_to(&mut self, a: &DenseBlock<T>, b: &DenseBlock<T>, alpha: T) -> Result<&mut Self> {
        if a.cols() != b.rows() {
            return Err(TileError::shape("multiply", &a.dims, &b.dims));
        }
        let dims = product_dims(&a.dims, &b.dims);
        if dims != self.dims {
            return Err(TileError::shape("gemm", &self.dims, &dims));
        }
        let (m, k, n) = (a.rows(), a.cols(), b.cols());
        matmul_into(&mut self.data, &a.data, &b.data, m, k, n, alpha, true);
        Ok(self)
    }

    /// Conjugate transpose of the matricized block, as a `cols × rows` matrix.
    pub fn adjoint(&self) -> DenseBlock<T> {
        let (m, n) = (self.rows(), self.cols());
        DenseBlock {
            dims: vec![n, m],
            data: adjoint(&self.data, m, n),
        }
    }

    /// Frobenius norm.
    pub fn norm(&self) -> f64 {
        frobenius_norm(&self.data)
    }

    /// Largest element-wise modulus of `self - other`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the extents differ.
    pub fn max_abs_diff(&self, other: &DenseBlock<T>) -> Result<f64> {
        if self.dims != other.dims {
            return Err(TileError::shape("compare", &self.dims, &other.dims));
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&x, &y)| (x - y).abs_sq().sqrt())
            .fold(0.0, f64::max))
    }

    /// Frobenius norm of `self - other`.
    pub fn diff_norm(&self, other: &DenseBlock<T>) -> Result<f64> {
        if self.dims != other.dims {
            return Err(TileError::shape("compare", &self.dims, &other.dims));
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&x, &y)| (x - y).abs_sq())
            .sum::<f64>()
            .sqrt())
    }

    /// `‖self - other‖_F <= tolerance · max(‖other‖_F, 1)`; false on a shape mismatch.
    pub fn approx_eq(&self, other: &DenseBlock<T>, tolerance: f64) -> bool {
        match self.diff_norm(other) {
            Ok(diff) => diff <= tolerance * other.norm().max(1.0),
            Err(_) => false,
        }
    }
}

/// Extents of the product of a block with `lhs` extents and one with `rhs` extents.
pub(crate) fn product_dims(lhs: &[usize], rhs: &[usize]) -> Vec<usize> {
    let mut dims = Vec::with_capacity(rhs.len());
    dims.push(lhs[0]);
    dims.extend_from_slice(&rhs[1..]);
    dims
}

impl<T: LinalgScalar> Index<[usize; 2]> for DenseBlock<T> {
    type Output = T;

    fn index(&self, idx: [usize; 2]) -> &Self::Output {
        &self.data[idx[0] * self.cols() + idx[1]]
    }
}

impl<T: LinalgScalar> IndexMut<[usize; 2]> for DenseBlock<T> {
    fn index_mut(&mut self, idx: [usize; 2]) -> &mut Self::Output {
        let cols = self.cols();
        &mut self.data[idx[0] * cols + idx[1]]
    }
}

impl<T: LinalgScalar> fmt::Display for DenseBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DenseBlock {:?}", self.dims)?;
        let cols = self.cols();
        if cols == 0 {
            return Ok(());
        }
        for row in self.data.chunks(cols) {
            let cells: Vec<String> = row.iter().map(|x| format!("{:?}", x)).collect();
            writeln!(f, "  [{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_new_rejects_bad_length() {
        let err = DenseBlock::<f64>::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            TileError::InvalidData {
                expected: 6,
                actual: 5,
                ..
            }
        ));
        assert!(matches!(
            DenseBlock::<f64>::new(vec![], vec![]),
            Err(TileError::NoExtents)
        ));
    }

    #[test]
    fn test_matricization() {
        let block = DenseBlock::<f64>::zeros(&[4, 3, 2]);
        assert_eq!(block.rows(), 4);
        assert_eq!(block.cols(), 6);
        assert_eq!(block.full_rank(), 4);
        assert_eq!(block.len(), 24);
    }

    #[test]
    fn test_from_fn_row_major() {
        let block = DenseBlock::<f64>::from_fn(&[2, 3], |idx| (idx[0] * 10 + idx[1]) as f64);
        assert_eq!(block.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(block.get(&[1, 2]), Some(&12.0));
        assert_eq!(block.get(&[2, 0]), None);
        assert_eq!(block.get(&[0]), None);
        assert_eq!(block[[1, 0]], 10.0);
    }

    #[test]
    fn test_scale_and_add() {
        let mut a = DenseBlock::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = DenseBlock::identity(2);
        a.scale_to(2.0).add_scaled_to(&b, -1.0).unwrap();
        assert_eq!(a.as_slice(), &[1.0, 4.0, 6.0, 7.0]);

        let c = DenseBlock::<f64>::zeros(&[2, 3]);
        assert!(a.add_scaled_to(&c, 1.0).is_err());
    }

    #[test]
    fn test_matmul_nd() {
        // (2x3) * (3 x [2, 2]) -> [2, 2, 2]
        let a = DenseBlock::from_rows(vec![vec![1.0, 0.0, 1.0], vec![0.0, 1.0, 0.0]]).unwrap();
        let b = DenseBlock::from_fn(&[3, 2, 2], |idx| (idx[0] * 4 + idx[1] * 2 + idx[2]) as f64);
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.dims(), &[2, 2, 2]);
        // row 0 = b[0,:] + b[2,:]
        assert_eq!(&c.as_slice()[..4], &[8.0, 10.0, 12.0, 14.0]);
        assert_eq!(&c.as_slice()[4..], &[4.0, 5.0, 6.0, 7.0]);

        assert!(b.matmul(&a).is_err());
    }

    #[test]
    fn test_gemm_to() {
        let a = DenseBlock::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let mut c = DenseBlock::identity(2);
        c.gemm_to(&a, &DenseBlock::identity(2), 2.0).unwrap();
        assert_eq!(c.as_slice(), &[3.0, 4.0, 6.0, 9.0]);
        let mut wrong = DenseBlock::<f64>::zeros(&[3, 2]);
        assert!(wrong.gemm_to(&a, &a, 1.0).is_err());
    }

    #[test]
    fn test_adjoint_complex() {
        let a = DenseBlock::from_matrix(
            1,
            2,
            vec![Complex64::new(1.0, 1.0), Complex64::new(0.0, -2.0)],
        )
        .unwrap();
        let ah = a.adjoint();
        assert_eq!(ah.dims(), &[2, 1]);
        assert_eq!(ah.as_slice()[0], Complex64::new(1.0, -1.0));
        assert_eq!(ah.as_slice()[1], Complex64::new(0.0, 2.0));
    }

    #[test]
    fn test_norms_and_comparison() {
        let a = DenseBlock::from_rows(vec![vec![3.0, 0.0], vec![0.0, 4.0]]).unwrap();
        assert!((a.norm() - 5.0).abs() < 1e-14);
        let mut b = a.clone();
        b[[0, 1]] = 1e-9;
        assert!((a.max_abs_diff(&b).unwrap() - 1e-9).abs() < 1e-20);
        assert!(a.approx_eq(&b, 1e-8));
        assert!(!a.approx_eq(&b, 1e-12));
        assert!(!a.approx_eq(&DenseBlock::zeros(&[4]), 1.0));
    }

    #[test]
    fn test_reshape() {
        let a = DenseBlock::<f64>::zeros(&[2, 6]);
        let b = a.clone().reshape(vec![2, 3, 2]).unwrap();
        assert_eq!(b.cols(), 6);
        assert!(a.reshape(vec![5]).is_err());
    }
}
