//! Surrogate model fitting: normalization, noise auto-tuning, and the
//! objective and stability regressions.
//!
//! # Procedure
//!
//! 1. Settings are mapped into the unit cube with [`SearchBounds`].
//! 2. Objective and stability values are divided by the largest objective
//!    value so the regression sees order-unity targets.
//! 3. For each noise candidate an objective GP is fitted and the standard
//!    deviation of its training residuals is measured. The candidate whose
//!    residual spread is closest to the expected noise level wins: too little
//!    regularization fits the noise (residual → 0), too much oversmooths.
//! 4. The objective GP and the stability GP are refitted with the winner.
//!    The stability GP is trained on the ratio of normalized stability to
//!    normalized objective, a coefficient-of-variation style target.
//!
//! With [`optimize_length_scales`](crate::OptimizerConfigBuilder::optimize_length_scales)
//! every fit above (each candidate and both final models) re-estimates its
//! own length scales from the configured ones.

use crate::bounds::SearchBounds;
use crate::config::OptimizerConfig;
use crate::error::{Error, Result};
use crate::gp::GaussianProcess;
use crate::history::ObservationHistory;
use crate::kernel::Matern52;
use crate::stats::population_std;

/// Residual spread measured for one noise candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseScore {
    /// The candidate regularization value.
    pub noise: f64,
    /// Standard deviation of `prediction - target` at the training points,
    /// or `None` if the covariance was not positive definite.
    pub residual_std: Option<f64>,
}

/// Outcome of the noise auto-tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseSelection {
    /// The chosen regularization value.
    pub selected: f64,
    /// Index of the chosen value in the candidate list.
    pub index: usize,
    /// One score per candidate, in candidate order.
    pub scan: Vec<NoiseScore>,
}

/// Picks the candidate whose residual standard deviation is closest to `expected`.
///
/// Candidates that cannot be fitted are skipped. Ties go to the earliest
/// candidate. The selection is deterministic for fixed inputs.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `candidates` is empty and
/// [`Error::DegenerateData`] if no candidate produces a positive definite
/// covariance.
pub fn select_noise(
    x: &[Vec<f64>],
    y: &[f64],
    kernel: &Matern52,
    candidates: &[f64],
    expected: f64,
) -> Result<NoiseSelection> {
    scan_noise(x, y, candidates, expected, |noise| {
        GaussianProcess::fit(x, y, kernel, noise)
    })
}

/// Noise scan over an arbitrary fitting procedure (fixed or tuned kernel).
fn scan_noise<F>(
    x: &[Vec<f64>],
    y: &[f64],
    candidates: &[f64],
    expected: f64,
    fit: F,
) -> Result<NoiseSelection>
where
    F: Fn(f64) -> Result<GaussianProcess>,
{
    if candidates.is_empty() {
        return Err(Error::config("noise candidates cannot be empty"));
    }

    let mut scan = Vec::with_capacity(candidates.len());
    let mut best: Option<(usize, f64)> = None;

    for (index, &noise) in candidates.iter().enumerate() {
        let residual_std = match fit(noise) {
            Ok(gp) => {
                let residuals: Vec<f64> = x
                    .iter()
                    .zip(y)
                    .map(|(xi, yi)| gp.predict_mean(xi) - yi)
                    .collect();
                Some(population_std(&residuals))
            }
            Err(Error::DegenerateData(_)) => None,
            Err(e) => return Err(e),
        };
        trace_debug!(noise, residual_std = ?residual_std, "noise candidate scored");

        if let Some(sigma) = residual_std {
            let distance = (sigma - expected).abs();
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
        scan.push(NoiseScore {
            noise,
            residual_std,
        });
    }

    let (index, _) = best.ok_or_else(|| {
        Error::degenerate("no noise candidate yields a positive definite covariance")
    })?;
    Ok(NoiseSelection {
        selected: candidates[index],
        index,
        scan,
    })
}

/// The two fitted surrogates and the noise value they share.
///
/// # Examples
///
/// ```
/// use ion_optimizer::{ObservationHistory, OptimizerConfig, SearchBounds, SurrogateFit};
///
/// let history = ObservationHistory::from_parts(
///     vec![vec![0.0], vec![0.5], vec![1.0]],
///     vec![0.2, 0.6, 1.0],
///     vec![0.001, 0.002, 0.001],
/// )
/// .unwrap();
/// let config = OptimizerConfig::builder()
///     .kernel_length_scales(vec![0.5])
///     .build()
///     .unwrap();
/// let bounds = SearchBounds::unit(1);
///
/// let fit = SurrogateFit::fit(&history, &config, &bounds).unwrap();
/// let (mean, std) = fit.objective().predict(&[1.0]);
/// assert!(mean > 0.5 && std < 0.5);
/// ```
#[derive(Clone, Debug)]
pub struct SurrogateFit {
    objective: GaussianProcess,
    stability: GaussianProcess,
    selection: NoiseSelection,
    scale: f64,
}

impl SurrogateFit {
    /// Normalizes the history, selects the noise level, and fits both models.
    ///
    /// Does not touch `config`; persist [`selected_noise`](Self::selected_noise)
    /// with [`OptimizerConfig::record_fit`] if the next iteration should see it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateData`] for fewer than two observations, a
    /// zero maximum objective, a zero objective value (the stability ratio
    /// would be undefined), or a covariance that is not positive definite.
    /// Returns [`Error::DimensionMismatch`] if the settings, bounds, and
    /// length scales disagree on dimensionality.
    pub fn fit(
        history: &ObservationHistory,
        config: &OptimizerConfig,
        bounds: &SearchBounds,
    ) -> Result<Self> {
        history.validate()?;
        let dims = history.dims().unwrap_or_default();
        bounds.check_dims(dims)?;
        bounds.check_dims(config.dims())?;

        let x: Vec<Vec<f64>> = history
            .settings()
            .iter()
            .map(|s| bounds.normalize(s))
            .collect();

        let scale = history
            .max_objective()
            .ok_or_else(|| Error::degenerate("empty observation history"))?;
        let y: Vec<f64> = history.objective().iter().map(|v| v / scale).collect();
        let s: Vec<f64> = history.stability().iter().map(|v| v / scale).collect();
        let ratio: Vec<f64> = s.iter().zip(&y).map(|(si, yi)| si / yi).collect();
        if ratio.iter().any(|r| !r.is_finite()) {
            return Err(Error::degenerate(
                "instability ratio is undefined where the objective is zero",
            ));
        }

        let kernel = Matern52::new(config.kernel_length_scales().to_vec())?;
        let fit_gp = |targets: &[f64], noise: f64| {
            if config.optimize_length_scales() {
                GaussianProcess::fit_tuned(&x, targets, &kernel, noise, config.max_local_iters())
            } else {
                GaussianProcess::fit(&x, targets, &kernel, noise)
            }
        };
        let selection = scan_noise(
            &x,
            &y,
            config.noise_candidates(),
            config.expected_noise(),
            |noise| fit_gp(&y, noise),
        )?;
        trace_info!(
            selected_noise = selection.selected,
            n_obs = history.len(),
            "noise level selected"
        );

        let objective = fit_gp(&y, selection.selected)?;
        let stability = fit_gp(&ratio, selection.selected)?;
        trace_debug!(n_train = objective.n_train(), "surrogates fitted");

        Ok(Self {
            objective,
            stability,
            selection,
            scale,
        })
    }

    /// Model of normalized objective over normalized settings.
    #[must_use]
    pub fn objective(&self) -> &GaussianProcess {
        &self.objective
    }

    /// Model of the instability ratio over normalized settings.
    #[must_use]
    pub fn stability(&self) -> &GaussianProcess {
        &self.stability
    }

    /// Noise value both models were fitted with.
    #[must_use]
    pub fn selected_noise(&self) -> f64 {
        self.selection.selected
    }

    /// Residual spread per noise candidate, in candidate order.
    #[must_use]
    pub fn noise_scan(&self) -> &[NoiseScore] {
        &self.selection.scan
    }

    /// Largest objective value, the divisor used to normalize outputs.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }
}
