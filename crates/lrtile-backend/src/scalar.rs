//! Scalar types accepted by the dense linear-algebra backend.

use faer_traits::ComplexField;
use num_complex::{Complex64, ComplexFloat};
use std::fmt::Debug;
use std::ops::AddAssign;

/// Element type of dense blocks and low-rank factors.
///
/// Implemented for `f64` and `Complex64`. Singular values and norms are always
/// reported as `f64`.
pub trait LinalgScalar:
    ComplexFloat<Real = f64>
    + ComplexField
    + From<f64>
    + AddAssign
    + Debug
    + Default
    + Send
    + Sync
    + 'static
{
    /// Lift a real value into the scalar type.
    #[inline]
    fn from_real(value: f64) -> Self {
        <Self as From<f64>>::from(value)
    }

    /// Squared modulus as `f64`.
    fn abs_sq(self) -> f64;

    /// Whether both components are finite.
    fn is_finite_val(self) -> bool;
}

impl LinalgScalar for f64 {
    #[inline]
    fn abs_sq(self) -> f64 {
        self * self
    }

    #[inline]
    fn is_finite_val(self) -> bool {
        self.is_finite()
    }
}

impl LinalgScalar for Complex64 {
    #[inline]
    fn abs_sq(self) -> f64 {
        self.norm_sqr()
    }

    #[inline]
    fn is_finite_val(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}
