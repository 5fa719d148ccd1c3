//! Gaussian Process regression with a Matérn 5/2 kernel.
//!
//! The model has a zero prior mean and unit signal variance, and targets
//! are used as given (callers normalize them to order-unity magnitudes).
//! The regularization term is added to the diagonal of the training
//! covariance; predictive standard deviations describe the latent function,
//! not a new noisy observation.
//!
//! Length scales are either taken as given ([`GaussianProcess::fit`]) or
//! re-estimated by maximizing the log marginal likelihood
//! ([`GaussianProcess::fit_tuned`]).

use core::f64::consts::PI;

use nalgebra::linalg::Cholesky;
use nalgebra::{DVector, Dyn};

use crate::error::{Error, Result};
use crate::kernel::{LENGTH_SCALE_MAX, LENGTH_SCALE_MIN, Matern52};
use crate::nelder_mead::NelderMead;

/// A fitted GP regression ready for predictions.
#[derive(Clone, Debug)]
pub struct GaussianProcess {
    kernel: Matern52,
    /// Cholesky factor L of K + σ²I.
    cholesky: Cholesky<f64, Dyn>,
    /// α = (K + σ²I)^{-1} y.
    alpha: DVector<f64>,
    /// Training inputs (each row is a data point, normalized to [0, 1]).
    x_train: Vec<Vec<f64>>,
    noise: f64,
    log_likelihood: f64,
}

impl GaussianProcess {
    /// Fits a GP to `(x_train, y_train)` with `noise` added to the kernel diagonal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateData`] if there is no training data, the
    /// inputs and targets differ in length, a target is non-finite, or
    /// `K + σ²I` is not positive definite. Returns
    /// [`Error::DimensionMismatch`] if a training point does not match the
    /// kernel's dimensionality.
    pub fn fit(
        x_train: &[Vec<f64>],
        y_train: &[f64],
        kernel: &Matern52,
        noise: f64,
    ) -> Result<Self> {
        if x_train.is_empty() {
            return Err(Error::degenerate("cannot fit a regression to zero points"));
        }
        if x_train.len() != y_train.len() {
            return Err(Error::degenerate(format!(
                "{} inputs but {} targets",
                x_train.len(),
                y_train.len()
            )));
        }
        if let Some(bad) = x_train.iter().find(|x| x.len() != kernel.dims()) {
            return Err(Error::DimensionMismatch {
                expected: kernel.dims(),
                got: bad.len(),
            });
        }
        if y_train.iter().any(|y| !y.is_finite()) {
            return Err(Error::degenerate("regression targets must be finite"));
        }

        let k = kernel.matrix(x_train, noise);
        let cholesky = Cholesky::new(k).ok_or_else(|| {
            Error::degenerate(format!(
                "covariance is not positive definite with noise {noise:e}"
            ))
        })?;

        let y_vec = DVector::from_column_slice(y_train);
        let alpha = cholesky.solve(&y_vec);

        // log p(y | X) = -½ yᵀα - Σ log L_ii - n/2 log 2π
        #[allow(clippy::cast_precision_loss)]
        let n = y_train.len() as f64;
        let log_det_half: f64 = cholesky.l_dirty().diagonal().iter().map(|d| d.ln()).sum();
        let log_likelihood = -0.5 * y_vec.dot(&alpha) - log_det_half - 0.5 * n * (2.0 * PI).ln();

        Ok(Self {
            kernel: kernel.clone(),
            cholesky,
            alpha,
            x_train: x_train.to_vec(),
            noise,
            log_likelihood,
        })
    }

    /// Fits a GP after choosing length scales that maximize the log marginal
    /// likelihood.
    ///
    /// The search starts from `kernel`'s length scales and runs
    /// [`NelderMead`] in log space over
    /// `[LENGTH_SCALE_MIN, LENGTH_SCALE_MAX]` per dimension, with at most
    /// `max_iters` iterations. The returned model's likelihood is never
    /// below that of the (clamped) starting scales.
    ///
    /// # Errors
    ///
    /// Same as [`fit`](Self::fit), when no length scale in range gives a
    /// positive definite covariance. Returns [`Error::LocalSearch`] if the
    /// minimizer fails.
    pub fn fit_tuned(
        x_train: &[Vec<f64>],
        y_train: &[f64],
        kernel: &Matern52,
        noise: f64,
        max_iters: usize,
    ) -> Result<Self> {
        let (lo, hi) = (LENGTH_SCALE_MIN.ln(), LENGTH_SCALE_MAX.ln());
        let to_unit = |l: f64| (l.clamp(LENGTH_SCALE_MIN, LENGTH_SCALE_MAX).ln() - lo) / (hi - lo);
        let from_unit = |u: f64| (lo + u * (hi - lo)).exp();
        let scales_at = |u: &[f64]| Matern52::new(u.iter().map(|&v| from_unit(v)).collect());

        let u0: Vec<f64> = kernel.length_scales().iter().map(|&l| to_unit(l)).collect();
        let start = scales_at(&u0).and_then(|k| Self::fit(x_train, y_train, &k, noise));

        let negative_log_likelihood = |u: &[f64]| {
            scales_at(u)
                .and_then(|k| Self::fit(x_train, y_train, &k, noise))
                .map_or(f64::INFINITY, |gp| -gp.log_likelihood)
        };
        let best = NelderMead::new(max_iters).minimize(negative_log_likelihood, &u0)?;
        if !best.value.is_finite() {
            return start;
        }

        let tuned = Self::fit(x_train, y_train, &scales_at(&best.x)?, noise)?;
        trace_debug!(
            length_scales = ?tuned.kernel.length_scales(),
            log_likelihood = tuned.log_likelihood,
            evaluations = best.evaluations,
            "length scales tuned"
        );
        match start {
            Ok(start) if start.log_likelihood >= tuned.log_likelihood => Ok(start),
            _ => Ok(tuned),
        }
    }

    /// Predict mean and standard deviation at a test point.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = self.kernel.vector(x, &self.x_train);

        // Mean: k*^T α
        let mean = k_star.dot(&self.alpha);

        // Variance: k(x*, x*) - k*^T (K + σ²I)^{-1} k*
        let v = self.cholesky.solve(&k_star);
        let var = (1.0 - k_star.dot(&v)).max(0.0);

        (mean, var.sqrt())
    }

    /// Predict only the mean at a test point.
    #[must_use]
    pub fn predict_mean(&self, x: &[f64]) -> f64 {
        self.kernel.vector(x, &self.x_train).dot(&self.alpha)
    }

    /// Log marginal likelihood of the training targets under this model.
    #[must_use]
    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Number of training points.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }

    /// Regularization added to the kernel diagonal.
    #[must_use]
    pub fn noise(&self) -> f64 {
        self.noise
    }

    /// The kernel the model was fitted with.
    #[must_use]
    pub fn kernel(&self) -> &Matern52 {
        &self.kernel
    }

    /// Training inputs in normalized coordinates.
    #[must_use]
    pub fn x_train(&self) -> &[Vec<f64>] {
        &self.x_train
    }
}
