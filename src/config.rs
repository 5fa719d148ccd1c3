//! Optimizer configuration and its builder.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default weight on predictive uncertainty in the UCB score.
pub const DEFAULT_EXPLORATION_BIAS: f64 = 2.5;
/// Default residual standard deviation the noise auto-tuning aims for.
pub const DEFAULT_EXPECTED_NOISE: f64 = 0.01;
/// Default admissible probability of exceeding the instability threshold.
pub const DEFAULT_RISK_TOLERANCE: f64 = 0.2;
/// Default cutoff on the normalized instability ratio.
pub const DEFAULT_INSTABILITY_THRESHOLD: f64 = 0.05;
/// Default number of independent local searches.
pub const DEFAULT_N_STARTS: usize = 10;
/// Default regularization values tried by the noise auto-tuning.
pub const DEFAULT_NOISE_CANDIDATES: [f64; 6] = [1e-6, 1e-5, 1e-4, 1e-3, 1e-2, 1e-1];

/// Settings for [`StabilityOptimizer`](crate::StabilityOptimizer).
///
/// Created once by the caller and reused across control-loop iterations.
/// The only field that changes between calls is the selected noise, and
/// only when the caller stores it back with [`record_fit`](Self::record_fit).
///
/// # Examples
///
/// ```
/// use ion_optimizer::OptimizerConfig;
///
/// let config = OptimizerConfig::builder()
///     .kernel_length_scales(vec![0.3, 0.3])
///     .noise_candidates(vec![1e-4, 1e-3, 1e-2])
///     .exploration_bias(2.0)
///     .risk_tolerance(0.1)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.dims(), 2);
/// assert_eq!(config.n_starts(), 10);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "OptimizerConfigFields")
)]
pub struct OptimizerConfig {
    kernel_length_scales: Vec<f64>,
    noise_candidates: Vec<f64>,
    selected_noise: f64,
    exploration_bias: f64,
    expected_noise: f64,
    risk_tolerance: f64,
    instability_threshold: f64,
    n_starts: usize,
    max_local_iters: Option<usize>,
    parallel: bool,
    optimize_length_scales: bool,
}

impl OptimizerConfig {
    /// Creates a builder for configuring an `OptimizerConfig`.
    #[must_use]
    pub fn builder() -> OptimizerConfigBuilder {
        OptimizerConfigBuilder::new()
    }

    /// Per-dimension Matérn length scales in normalized units.
    #[must_use]
    pub fn kernel_length_scales(&self) -> &[f64] {
        &self.kernel_length_scales
    }

    /// Regularization values the noise auto-tuning chooses from.
    #[must_use]
    pub fn noise_candidates(&self) -> &[f64] {
        &self.noise_candidates
    }

    /// Noise value chosen by the most recent recorded fit (0 before any).
    #[must_use]
    pub fn selected_noise(&self) -> f64 {
        self.selected_noise
    }

    /// Weight on predictive standard deviation in the UCB score.
    #[must_use]
    pub fn exploration_bias(&self) -> f64 {
        self.exploration_bias
    }

    /// Target residual standard deviation for noise selection.
    #[must_use]
    pub fn expected_noise(&self) -> f64 {
        self.expected_noise
    }

    /// Maximum admissible probability of exceeding the instability threshold.
    #[must_use]
    pub fn risk_tolerance(&self) -> f64 {
        self.risk_tolerance
    }

    /// Cutoff on the normalized instability ratio.
    #[must_use]
    pub fn instability_threshold(&self) -> f64 {
        self.instability_threshold
    }

    /// Number of independent local searches per proposal.
    #[must_use]
    pub fn n_starts(&self) -> usize {
        self.n_starts
    }

    /// Whether the local searches run on the rayon thread pool.
    #[must_use]
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Whether length scales are re-estimated by marginal likelihood on every fit.
    #[must_use]
    pub fn optimize_length_scales(&self) -> bool {
        self.optimize_length_scales
    }

    /// Iteration budget of each local search.
    ///
    /// Defaults to `200 * dims`.
    #[must_use]
    pub fn max_local_iters(&self) -> usize {
        self.max_local_iters
            .unwrap_or(200 * self.kernel_length_scales.len())
    }

    /// Number of parameter dimensions implied by the length scales.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.kernel_length_scales.len()
    }

    /// Stores the noise value selected by a fit for the next iteration.
    pub fn record_fit(&mut self, selected_noise: f64) {
        self.selected_noise = selected_noise;
    }

    /// Returns a copy with a different risk tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `risk` is outside `[0, 1]`.
    pub fn with_risk_tolerance(&self, risk: f64) -> Result<Self> {
        check_risk(risk)?;
        Ok(Self {
            risk_tolerance: risk,
            ..self.clone()
        })
    }
}

/// Builder for configuring an [`OptimizerConfig`].
///
/// `kernel_length_scales` is required. Everything else has a default:
/// - `noise_candidates`: [`DEFAULT_NOISE_CANDIDATES`]
/// - `exploration_bias`: 2.5
/// - `expected_noise`: 0.01
/// - `risk_tolerance`: 0.2
/// - `instability_threshold`: 0.05
/// - `n_starts`: 10
/// - `max_local_iters`: `200 * dims`
/// - `parallel`: false
/// - `optimize_length_scales`: false
#[derive(Debug, Clone, Default)]
pub struct OptimizerConfigBuilder {
    kernel_length_scales: Option<Vec<f64>>,
    noise_candidates: Option<Vec<f64>>,
    selected_noise: Option<f64>,
    exploration_bias: Option<f64>,
    expected_noise: Option<f64>,
    risk_tolerance: Option<f64>,
    instability_threshold: Option<f64>,
    n_starts: Option<usize>,
    max_local_iters: Option<usize>,
    parallel: bool,
    optimize_length_scales: bool,
}

impl OptimizerConfigBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-dimension kernel length scales (anisotropic smoothness prior).
    #[must_use]
    pub fn kernel_length_scales(mut self, scales: Vec<f64>) -> Self {
        self.kernel_length_scales = Some(scales);
        self
    }

    /// Sets the ordered list of regularization values to search over.
    #[must_use]
    pub fn noise_candidates(mut self, candidates: Vec<f64>) -> Self {
        self.noise_candidates = Some(candidates);
        self
    }

    /// Seeds the selected noise, e.g. from a configuration persisted by the caller.
    #[must_use]
    pub fn selected_noise(mut self, noise: f64) -> Self {
        self.selected_noise = Some(noise);
        self
    }

    /// Sets the exploration weight on predictive uncertainty.
    ///
    /// Larger values favor sampling high-uncertainty regions.
    ///
    /// Default: 2.5.
    #[must_use]
    pub fn exploration_bias(mut self, bias: f64) -> Self {
        self.exploration_bias = Some(bias);
        self
    }

    /// Sets the residual standard deviation the noise auto-tuning aims for.
    ///
    /// Default: 0.01.
    #[must_use]
    pub fn expected_noise(mut self, noise: f64) -> Self {
        self.expected_noise = Some(noise);
        self
    }

    /// Sets the admissible probability of exceeding the instability threshold.
    ///
    /// Default: 0.2.
    #[must_use]
    pub fn risk_tolerance(mut self, risk: f64) -> Self {
        self.risk_tolerance = Some(risk);
        self
    }

    /// Sets the cutoff on the normalized instability ratio.
    ///
    /// Default: 0.05.
    #[must_use]
    pub fn instability_threshold(mut self, threshold: f64) -> Self {
        self.instability_threshold = Some(threshold);
        self
    }

    /// Sets the number of independent local searches.
    ///
    /// Default: 10.
    #[must_use]
    pub fn n_starts(mut self, n: usize) -> Self {
        self.n_starts = Some(n);
        self
    }

    /// Sets the iteration budget of each local search.
    ///
    /// Default: `200 * dims`.
    #[must_use]
    pub fn max_local_iters(mut self, iters: usize) -> Self {
        self.max_local_iters = Some(iters);
        self
    }

    /// Runs the local searches on the rayon thread pool.
    ///
    /// Results are still ranked by run index, so the outcome is identical
    /// to a serial run with the same seed. Without the `rayon` feature the
    /// searches always run serially.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Treats the configured length scales as a starting point and refits
    /// them by maximizing the marginal likelihood, within `[1e-5, 1e5]`.
    ///
    /// Default: false (length scales are used as given).
    #[must_use]
    pub fn optimize_length_scales(mut self, optimize: bool) -> Self {
        self.optimize_length_scales = optimize;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the length scales are missing,
    /// empty or non-positive; a noise candidate is negative or
    /// non-finite; the exploration bias is negative; the risk tolerance is
    /// outside `[0, 1]`; or `n_starts` / `max_local_iters` is zero.
    pub fn build(self) -> Result<OptimizerConfig> {
        let kernel_length_scales = self
            .kernel_length_scales
            .ok_or_else(|| Error::config("kernel length scales are required"))?;
        if kernel_length_scales.is_empty() {
            return Err(Error::config("kernel length scales cannot be empty"));
        }
        if kernel_length_scales
            .iter()
            .any(|l| !l.is_finite() || *l <= 0.0)
        {
            return Err(Error::config("kernel length scales must be positive"));
        }

        let noise_candidates = self
            .noise_candidates
            .unwrap_or_else(|| DEFAULT_NOISE_CANDIDATES.to_vec());
        if noise_candidates.is_empty() {
            return Err(Error::config("noise candidates cannot be empty"));
        }
        if noise_candidates.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(Error::config("noise candidates must be non-negative"));
        }

        let exploration_bias = self.exploration_bias.unwrap_or(DEFAULT_EXPLORATION_BIAS);
        if !exploration_bias.is_finite() || exploration_bias < 0.0 {
            return Err(Error::config(format!(
                "exploration bias must be non-negative, got {exploration_bias}"
            )));
        }

        let expected_noise = self.expected_noise.unwrap_or(DEFAULT_EXPECTED_NOISE);
        if !expected_noise.is_finite() {
            return Err(Error::config("expected noise level must be finite"));
        }

        let risk_tolerance = self.risk_tolerance.unwrap_or(DEFAULT_RISK_TOLERANCE);
        check_risk(risk_tolerance)?;

        let instability_threshold = self
            .instability_threshold
            .unwrap_or(DEFAULT_INSTABILITY_THRESHOLD);
        if !instability_threshold.is_finite() {
            return Err(Error::config("instability threshold must be finite"));
        }

        let n_starts = self.n_starts.unwrap_or(DEFAULT_N_STARTS);
        if n_starts == 0 {
            return Err(Error::config("at least one search start is required"));
        }
        if self.max_local_iters == Some(0) {
            return Err(Error::config("local search needs a non-zero iteration budget"));
        }

        Ok(OptimizerConfig {
            kernel_length_scales,
            noise_candidates,
            selected_noise: self.selected_noise.unwrap_or(0.0),
            exploration_bias,
            expected_noise,
            risk_tolerance,
            instability_threshold,
            n_starts,
            max_local_iters: self.max_local_iters,
            parallel: self.parallel,
            optimize_length_scales: self.optimize_length_scales,
        })
    }
}

/// Wire form of [`OptimizerConfig`]; deserialization goes through the builder.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct OptimizerConfigFields {
    kernel_length_scales: Vec<f64>,
    noise_candidates: Vec<f64>,
    selected_noise: f64,
    exploration_bias: f64,
    expected_noise: f64,
    risk_tolerance: f64,
    instability_threshold: f64,
    n_starts: usize,
    max_local_iters: Option<usize>,
    #[serde(default)]
    parallel: bool,
    #[serde(default)]
    optimize_length_scales: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<OptimizerConfigFields> for OptimizerConfig {
    type Error = Error;

    fn try_from(fields: OptimizerConfigFields) -> Result<Self> {
        let mut builder = OptimizerConfigBuilder::new()
            .kernel_length_scales(fields.kernel_length_scales)
            .noise_candidates(fields.noise_candidates)
            .selected_noise(fields.selected_noise)
            .exploration_bias(fields.exploration_bias)
            .expected_noise(fields.expected_noise)
            .risk_tolerance(fields.risk_tolerance)
            .instability_threshold(fields.instability_threshold)
            .n_starts(fields.n_starts)
            .parallel(fields.parallel)
            .optimize_length_scales(fields.optimize_length_scales);
        if let Some(iters) = fields.max_local_iters {
            builder = builder.max_local_iters(iters);
        }
        builder.build()
    }
}

fn check_risk(risk: f64) -> Result<()> {
    if (0.0..=1.0).contains(&risk) {
        Ok(())
    } else {
        Err(Error::config(format!(
            "risk tolerance must be in [0, 1], got {risk}"
        )))
    }
}
