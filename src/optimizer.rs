//! Stability-constrained Bayesian optimizer: one proposal per control-loop step.
//!
//! # Algorithm overview
//!
//! 1. **Fit surrogates**: [`SurrogateFit`] normalizes the history, picks the
//!    noise level whose residual spread matches the expected noise, and
//!    fits the objective and stability GPs.
//! 2. **Gate and score**: [`RiskGatedUcb`] scores a normalized point as
//!    `-(mean + bias * std)` if the stability model's probability of
//!    exceeding the threshold is within the risk tolerance, `+∞` otherwise.
//! 3. **Search**: [`MultiStart`] runs `n_starts` bounded Nelder-Mead
//!    searches from independent uniform starts and keeps the lowest score.
//! 4. **Denormalize**: the winner is mapped back into the physical box.
//!
//! The optimizer holds no model state between calls. The only thing carried
//! forward is the selected noise level, and only when the caller records it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::acquisition::RiskGatedUcb;
use crate::bounds::SearchBounds;
use crate::config::OptimizerConfig;
use crate::error::{Error, Result};
use crate::history::ObservationHistory;
use crate::nelder_mead::NelderMead;
use crate::search::{MultiStart, SearchOutcome};
use crate::surrogate::SurrogateFit;

/// The next setting to try, with the evidence behind it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Proposal {
    /// Candidate setting in physical units, inside the search bounds.
    pub point: Vec<f64>,
    /// The same candidate in the unit cube.
    pub normalized: Vec<f64>,
    /// Acquisition score at the candidate (lower is better, `+∞` if inadmissible).
    pub score: f64,
    /// Stability model's probability of exceeding the threshold at the candidate.
    pub instability_probability: f64,
    /// Noise level the surrogates were fitted with.
    pub selected_noise: f64,
    /// Index of the winning local search.
    pub best_run: usize,
    /// Number of local searches that ended on an admissible point.
    pub admissible_runs: usize,
}

impl Proposal {
    /// Returns `false` when no explored point satisfied the risk tolerance.
    ///
    /// Such a proposal is the least-bad point found and should not be
    /// applied to the device.
    #[must_use]
    pub fn is_admissible(&self) -> bool {
        self.score.is_finite()
    }
}

/// Proposes the next setting for a fixed search seed.
///
/// Pure function of its inputs: the same history, configuration, bounds,
/// and seed always produce the same proposal. `config` is not modified.
///
/// # Errors
///
/// Returns [`Error::DegenerateData`] if the history cannot be fitted and
/// [`Error::DimensionMismatch`] if history, bounds, and length scales
/// disagree on dimensionality. [`Error::LocalSearch`] is returned if the
/// local minimizer rejects its settings.
///
/// # Examples
///
/// ```
/// use ion_optimizer::{next_point_query, ObservationHistory, OptimizerConfig, SearchBounds};
///
/// let history = ObservationHistory::from_parts(
///     vec![vec![1.0], vec![2.0], vec![3.0]],
///     vec![0.4, 0.7, 0.9],
///     vec![0.0, 0.0, 0.0],
/// )
/// .unwrap();
/// let config = OptimizerConfig::builder()
///     .kernel_length_scales(vec![0.3])
///     .risk_tolerance(0.5)
///     .build()
///     .unwrap();
/// let bounds = SearchBounds::new(vec![0.0], vec![4.0]).unwrap();
///
/// let proposal = next_point_query(&history, &config, &bounds, 42).unwrap();
/// assert!(bounds.contains(&proposal.point));
/// ```
pub fn next_point_query(
    history: &ObservationHistory,
    config: &OptimizerConfig,
    bounds: &SearchBounds,
    seed: u64,
) -> Result<Proposal> {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("next_point", n_obs = history.len(), dims = bounds.dims())
        .entered();

    let fit = SurrogateFit::fit(history, config, bounds)?;
    let acquisition = RiskGatedUcb::from_config(fit.objective(), fit.stability(), config);

    let search = MultiStart::new(config.n_starts(), NelderMead::new(config.max_local_iters()))
        .parallel(config.parallel());
    let outcome = search.run(|p| acquisition.score(p), bounds.dims(), seed)?;

    let proposal = build_proposal(&outcome, &acquisition, &fit, bounds);
    if proposal.is_admissible() {
        trace_info!(
            score = proposal.score,
            best_run = proposal.best_run,
            admissible_runs = proposal.admissible_runs,
            "candidate selected"
        );
    } else {
        trace_info!(
            score = proposal.score,
            "no admissible candidate, returning least-bad point"
        );
    }
    Ok(proposal)
}

fn build_proposal(
    outcome: &SearchOutcome,
    acquisition: &RiskGatedUcb<'_>,
    fit: &SurrogateFit,
    bounds: &SearchBounds,
) -> Proposal {
    // The search already clips every vertex; clamp again so rounding in
    // denormalization cannot leave the box.
    let normalized: Vec<f64> = outcome
        .best_point()
        .iter()
        .map(|v| v.clamp(0.0, 1.0))
        .collect();
    let point = bounds
        .denormalize(&normalized)
        .iter()
        .zip(bounds.lower().iter().zip(bounds.upper()))
        .map(|(&x, (&lo, &hi))| x.clamp(lo, hi))
        .collect();

    Proposal {
        point,
        instability_probability: acquisition.instability_probability(&normalized),
        normalized,
        score: outcome.best_value(),
        selected_noise: fit.selected_noise(),
        best_run: outcome.best,
        admissible_runs: outcome
            .runs
            .iter()
            .filter(|r| r.result.value.is_finite())
            .count(),
    }
}

/// Control-loop driver owning the configuration and the seed sequence.
///
/// # Examples
///
/// ```
/// use ion_optimizer::{ObservationHistory, OptimizerConfig, SearchBounds, StabilityOptimizer};
///
/// let config = OptimizerConfig::builder()
///     .kernel_length_scales(vec![0.3, 0.3])
///     .build()
///     .unwrap();
/// let mut optimizer = StabilityOptimizer::with_seed(config, 7);
/// let bounds = SearchBounds::unit(2);
///
/// let history = ObservationHistory::from_parts(
///     vec![vec![0.2, 0.2], vec![0.5, 0.5], vec![0.8, 0.3]],
///     vec![0.5, 1.0, 0.6],
///     vec![0.001, 0.001, 0.001],
/// )
/// .unwrap();
///
/// let proposal = optimizer.next_point(&history, &bounds).unwrap();
/// optimizer.record(&proposal);
/// assert_eq!(optimizer.config().selected_noise(), proposal.selected_noise);
/// assert!(bounds.contains(&proposal.point));
/// ```
#[derive(Debug)]
pub struct StabilityOptimizer {
    config: OptimizerConfig,
    rng: fastrand::Rng,
}

impl StabilityOptimizer {
    /// Creates an optimizer with a random seed sequence.
    #[must_use]
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            rng: fastrand::Rng::new(),
        }
    }

    /// Creates an optimizer with a fixed seed sequence for reproducibility.
    #[must_use]
    pub fn with_seed(config: OptimizerConfig, seed: u64) -> Self {
        Self {
            config,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Mutable access to the configuration, e.g. to relax the risk tolerance.
    pub fn config_mut(&mut self) -> &mut OptimizerConfig {
        &mut self.config
    }

    /// Consumes the optimizer and returns its configuration.
    #[must_use]
    pub fn into_config(self) -> OptimizerConfig {
        self.config
    }

    /// Proposes the next setting, admissible or not.
    ///
    /// Check [`Proposal::is_admissible`] before applying the result.
    ///
    /// # Errors
    ///
    /// See [`next_point_query`].
    pub fn next_point(
        &mut self,
        history: &ObservationHistory,
        bounds: &SearchBounds,
    ) -> Result<Proposal> {
        let seed = self.rng.u64(..);
        next_point_query(history, &self.config, bounds, seed)
    }

    /// Proposes the next setting, failing when nothing admissible was found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAdmissibleCandidate`] if every local search ended
    /// on a point violating the risk tolerance, plus the errors of
    /// [`next_point_query`].
    pub fn next_safe_point(
        &mut self,
        history: &ObservationHistory,
        bounds: &SearchBounds,
    ) -> Result<Proposal> {
        let proposal = self.next_point(history, bounds)?;
        if proposal.is_admissible() {
            Ok(proposal)
        } else {
            Err(Error::NoAdmissibleCandidate {
                score: proposal.score,
            })
        }
    }

    /// Stores the proposal's selected noise for the next iteration.
    pub fn record(&mut self, proposal: &Proposal) {
        self.config.record_fit(proposal.selected_noise);
    }
}
