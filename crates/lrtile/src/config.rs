//! Compression parameters and the rank gates.
//!
//! Tolerances are **relative**: a singular value `σ_i` is kept when
//! `σ_i > tolerance · σ_max`. The recompress and collapse thresholds are
//! empirical and exposed through [`RankPolicy`] so they can be tuned.

use crate::error::{Result, TileError};

/// Default singular-value cutoff for new tiles.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Default divisor for the recompress gate (`rank >= full_rank / 6`).
pub const DEFAULT_RECOMPRESS_DIVISOR: usize = 6;

/// Default divisor for the collapse gate (`rank > full_rank / 2`).
pub const DEFAULT_COLLAPSE_DIVISOR: usize = 2;

/// Check that a tolerance is finite and non-negative.
pub fn validate_tolerance(tolerance: f64) -> Result<f64> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(TileError::InvalidTolerance(tolerance));
    }
    Ok(tolerance)
}

/// Thresholds deciding when a compressed block is recompressed or
/// demoted to dense storage.
///
/// Both gates depend only on `(rank, full_rank)`, so repeated applications
/// settle on the same representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RankPolicyData"))]
pub struct RankPolicy {
    /// Recompress once `rank >= full_rank / recompress_divisor`.
    pub recompress_divisor: usize,
    /// Collapse to dense once `rank > full_rank / collapse_divisor`.
    pub collapse_divisor: usize,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RankPolicyData {
    recompress_divisor: usize,
    collapse_divisor: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RankPolicyData> for RankPolicy {
    type Error = TileError;

    fn try_from(raw: RankPolicyData) -> Result<Self> {
        let policy = Self {
            recompress_divisor: raw.recompress_divisor,
            collapse_divisor: raw.collapse_divisor,
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            recompress_divisor: DEFAULT_RECOMPRESS_DIVISOR,
            collapse_divisor: DEFAULT_COLLAPSE_DIVISOR,
        }
    }
}

impl RankPolicy {
    /// Create a policy with the default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recompress divisor.
    #[must_use]
    pub fn with_recompress_divisor(mut self, divisor: usize) -> Self {
        self.recompress_divisor = divisor;
        self
    }

    /// Set the collapse divisor.
    #[must_use]
    pub fn with_collapse_divisor(mut self, divisor: usize) -> Self {
        self.collapse_divisor = divisor;
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidPolicy` if either divisor is zero.
    pub fn validate(&self) -> Result<()> {
        if self.recompress_divisor == 0 || self.collapse_divisor == 0 {
            return Err(TileError::InvalidPolicy {
                recompress_divisor: self.recompress_divisor,
                collapse_divisor: self.collapse_divisor,
            });
        }
        Ok(())
    }

    /// `rank >= full_rank / recompress_divisor`. A zero divisor disables the gate.
    pub fn should_recompress(&self, rank: usize, full_rank: usize) -> bool {
        full_rank
            .checked_div(self.recompress_divisor)
            .is_some_and(|threshold| rank >= threshold)
    }

    /// `rank > full_rank / collapse_divisor`. A zero divisor disables the gate.
    pub fn should_collapse_to_dense(&self, rank: usize, full_rank: usize) -> bool {
        full_rank
            .checked_div(self.collapse_divisor)
            .is_some_and(|threshold| rank > threshold)
    }
}

/// Options for compressing a dense block.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressionOptions {
    /// Relative singular-value cutoff. Uses [`DEFAULT_TOLERANCE`] when `None`.
    pub tolerance: Option<f64>,

    /// Maximum retained rank. No limit when `None`.
    pub max_rank: Option<usize>,

    /// Gates carried by the resulting block.
    pub policy: RankPolicy,
}

impl CompressionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set the maximum rank.
    #[must_use]
    pub fn with_max_rank(mut self, max_rank: usize) -> Self {
        self.max_rank = Some(max_rank);
        self
    }

    /// Set the rank policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RankPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The tolerance in effect, falling back to [`DEFAULT_TOLERANCE`].
    pub fn effective_tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }

    /// # Errors
    ///
    /// Returns `InvalidTolerance` or `InvalidPolicy`.
    pub fn validate(&self) -> Result<()> {
        validate_tolerance(self.effective_tolerance())?;
        self.policy.validate()
    }
}
