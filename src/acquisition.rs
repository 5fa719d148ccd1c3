//! Risk-gated upper-confidence-bound acquisition.
//!
//! A point is admissible when the stability model gives at most
//! `risk_tolerance` probability of the instability ratio exceeding the
//! threshold. Inadmissible points score `+∞`, which removes them from the
//! (minimizing) search outright instead of merely penalizing them.
//! Admissible points score the negated UCB `-(mean + bias * std)` of the
//! objective model.

use crate::config::OptimizerConfig;
use crate::gp::GaussianProcess;
use crate::stats::upper_tail;

/// Acquisition evaluator holding both fitted models and the risk parameters.
///
/// # Examples
///
/// ```
/// use ion_optimizer::{ObservationHistory, OptimizerConfig, RiskGatedUcb, SearchBounds, SurrogateFit};
///
/// let history = ObservationHistory::from_parts(
///     vec![vec![0.0], vec![1.0]],
///     vec![0.5, 1.0],
///     vec![0.0, 0.0],
/// )
/// .unwrap();
/// let config = OptimizerConfig::builder()
///     .kernel_length_scales(vec![0.4])
///     .noise_candidates(vec![1e-6])
///     .build()
///     .unwrap();
/// let fit = SurrogateFit::fit(&history, &config, &SearchBounds::unit(1)).unwrap();
///
/// let acq = RiskGatedUcb::from_config(fit.objective(), fit.stability(), &config);
/// assert!(acq.is_admissible(&[1.0]));
/// assert!(acq.score(&[1.0]) < 0.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct RiskGatedUcb<'a> {
    objective: &'a GaussianProcess,
    stability: &'a GaussianProcess,
    exploration_bias: f64,
    risk_tolerance: f64,
    instability_threshold: f64,
}

impl<'a> RiskGatedUcb<'a> {
    /// Creates an evaluator from explicit risk parameters.
    #[must_use]
    pub fn new(
        objective: &'a GaussianProcess,
        stability: &'a GaussianProcess,
        exploration_bias: f64,
        risk_tolerance: f64,
        instability_threshold: f64,
    ) -> Self {
        Self {
            objective,
            stability,
            exploration_bias,
            risk_tolerance,
            instability_threshold,
        }
    }

    /// Creates an evaluator with the risk parameters of `config`.
    #[must_use]
    pub fn from_config(
        objective: &'a GaussianProcess,
        stability: &'a GaussianProcess,
        config: &OptimizerConfig,
    ) -> Self {
        Self::new(
            objective,
            stability,
            config.exploration_bias(),
            config.risk_tolerance(),
            config.instability_threshold(),
        )
    }

    /// Probability that the instability ratio at `p` exceeds the threshold.
    #[must_use]
    pub fn instability_probability(&self, p: &[f64]) -> f64 {
        let (mean, std) = self.stability.predict(p);
        upper_tail(mean, std, self.instability_threshold)
    }

    /// Returns `true` if `p` passes the risk gate.
    #[must_use]
    pub fn is_admissible(&self, p: &[f64]) -> bool {
        self.instability_probability(p) <= self.risk_tolerance
    }

    /// Negated UCB of the objective at `p`, ignoring the risk gate.
    #[must_use]
    pub fn ucb(&self, p: &[f64]) -> f64 {
        let (mean, std) = self.objective.predict(p);
        mean + self.exploration_bias * std
    }

    /// Acquisition score to minimize: `+∞` if inadmissible, else `-UCB`.
    #[must_use]
    pub fn score(&self, p: &[f64]) -> f64 {
        if self.is_admissible(p) {
            -self.ucb(p)
        } else {
            f64::INFINITY
        }
    }

    /// Weight on predictive uncertainty.
    #[must_use]
    pub fn exploration_bias(&self) -> f64 {
        self.exploration_bias
    }

    /// Maximum admissible instability probability.
    #[must_use]
    pub fn risk_tolerance(&self) -> f64 {
        self.risk_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Matern52;

    /// Objective rises with x; the instability ratio spikes at x = 1.
    fn models() -> (GaussianProcess, GaussianProcess) {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![f64::from(i) * 0.25]).collect();
        let y: Vec<f64> = x.iter().map(|p| 0.2 + 0.8 * p[0]).collect();
        let s = vec![0.0, 0.0, 0.0, 0.0, 0.5];
        let kernel = Matern52::new(vec![0.15]).unwrap();
        (
            GaussianProcess::fit(&x, &y, &kernel, 1e-6).unwrap(),
            GaussianProcess::fit(&x, &s, &kernel, 1e-6).unwrap(),
        )
    }

    fn grid() -> Vec<Vec<f64>> {
        (0..=100).map(|i| vec![f64::from(i) / 100.0]).collect()
    }

    #[test]
    fn inadmissible_points_score_infinite() {
        let (obj, stab) = models();
        let acq = RiskGatedUcb::new(&obj, &stab, 2.5, 0.2, 0.05);
        assert!(!acq.is_admissible(&[1.0]));
        assert_eq!(acq.score(&[1.0]), f64::INFINITY);

        for p in grid() {
            if acq.instability_probability(&p) > acq.risk_tolerance() {
                assert!(!acq.score(&p).is_finite(), "finite score at {p:?}");
            } else {
                assert!(acq.score(&p).is_finite());
            }
        }
    }

    #[test]
    fn admissible_points_score_negated_ucb() {
        let (obj, stab) = models();
        let acq = RiskGatedUcb::new(&obj, &stab, 2.0, 0.2, 0.05);
        let p = [0.25];
        assert!(acq.is_admissible(&p));
        let (mean, std) = obj.predict(&p);
        assert!((acq.score(&p) + mean + 2.0 * std).abs() < 1e-12);
    }

    #[test]
    fn raising_risk_tolerance_never_shrinks_admissible_region() {
        let (obj, stab) = models();
        let tolerances = [0.0, 0.05, 0.2, 0.5, 0.9, 1.0];
        let mut previous: Option<Vec<bool>> = None;
        for risk in tolerances {
            let acq = RiskGatedUcb::new(&obj, &stab, 2.5, risk, 0.05);
            let admissible: Vec<bool> = grid().iter().map(|p| acq.is_admissible(p)).collect();
            if let Some(prev) = &previous {
                for (i, (was, now)) in prev.iter().zip(&admissible).enumerate() {
                    assert!(!was || *now, "point {i} dropped out at risk {risk}");
                }
            }
            previous = Some(admissible);
        }
        // Tolerance 1 admits everything.
        assert!(previous.unwrap().iter().all(|a| *a));
    }

    #[test]
    fn exploration_bias_rewards_uncertainty() {
        let x = vec![vec![0.0], vec![0.1]];
        let y = vec![0.5, 0.5];
        let kernel = Matern52::new(vec![0.1]).unwrap();
        let obj = GaussianProcess::fit(&x, &y, &kernel, 1e-6).unwrap();
        let stab = GaussianProcess::fit(&x, &[0.0, 0.0], &kernel, 1e-6).unwrap();

        let greedy = RiskGatedUcb::new(&obj, &stab, 0.0, 1.0, 0.05);
        let curious = RiskGatedUcb::new(&obj, &stab, 5.0, 1.0, 0.05);
        // Far from the data the mean reverts to 0 but the std is large.
        assert!(greedy.score(&[0.05]) < greedy.score(&[0.9]));
        assert!(curious.score(&[0.9]) < curious.score(&[0.05]));
    }
}
