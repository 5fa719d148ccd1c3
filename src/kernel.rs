//! Matérn 5/2 covariance with ARD length scales.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Smallest length scale considered when tuning by marginal likelihood.
pub const LENGTH_SCALE_MIN: f64 = 1e-5;
/// Largest length scale considered when tuning by marginal likelihood.
pub const LENGTH_SCALE_MAX: f64 = 1e5;

/// Precomputed √5 constant.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Matérn kernel with smoothness ν = 5/2 and one length scale per dimension.
///
/// `k(x1, x2) = (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`.
///
/// Signal variance is fixed at 1, so `k(x, x) = 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Matern52 {
    length_scales: Vec<f64>,
}

impl Matern52 {
    /// Creates a kernel from per-dimension length scales.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `length_scales` is empty or
    /// contains a non-positive or non-finite value.
    pub fn new(length_scales: Vec<f64>) -> Result<Self> {
        if length_scales.is_empty() {
            return Err(Error::config("kernel needs at least one length scale"));
        }
        if length_scales.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(Error::config("kernel length scales must be positive"));
        }
        Ok(Self { length_scales })
    }

    /// Per-dimension length scales.
    #[must_use]
    pub fn length_scales(&self) -> &[f64] {
        &self.length_scales
    }

    /// Number of input dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.length_scales.len()
    }

    /// Covariance between two points.
    #[must_use]
    pub fn eval(&self, x1: &[f64], x2: &[f64]) -> f64 {
        let r_sq: f64 = x1
            .iter()
            .zip(x2)
            .zip(&self.length_scales)
            .map(|((a, b), l)| {
                let diff = (a - b) / l;
                diff * diff
            })
            .sum();
        let sqrt5_r = SQRT_5 * r_sq.sqrt();
        (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
    }

    /// Build the kernel matrix `K + σ²I`.
    pub(crate) fn matrix(&self, x: &[Vec<f64>], noise: f64) -> DMatrix<f64> {
        let n = x.len();
        DMatrix::from_fn(n, n, |i, j| {
            let k = self.eval(&x[i], &x[j]);
            if i == j { k + noise } else { k }
        })
    }

    /// Compute the kernel vector `k(x*, X)` for a test point.
    pub(crate) fn vector(&self, x_star: &[f64], x_train: &[Vec<f64>]) -> DVector<f64> {
        DVector::from_fn(x_train.len(), |i, _| self.eval(x_star, &x_train[i]))
    }
}
