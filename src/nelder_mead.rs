//! Nelder-Mead simplex minimizer on the unit cube, driven by `argmin`.
//!
//! Derivative-free, so it tolerates the hard `+∞` walls the risk gate puts
//! into the acquisition surface. The simplex itself is unconstrained; the
//! cost wrapper clamps every trial point into `[0, 1]^d` before evaluating,
//! and the reported minimizer is clamped the same way.

use argmin::core::{CostFunction, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead as ArgminNelderMead;

use crate::error::{Error, Result};

/// Relative perturbation of non-zero start coordinates in the initial simplex.
const NONZERO_DELTA: f64 = 0.05;
/// Absolute perturbation of zero start coordinates in the initial simplex.
const ZERO_DELTA: f64 = 0.000_25;
/// Default tolerance on the standard deviation of the simplex values.
pub const DEFAULT_SD_TOLERANCE: f64 = 1e-8;

/// Result of one local minimization.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalMinimum {
    /// Best vertex found, inside the unit cube.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub value: f64,
    /// Simplex iterations performed.
    pub iterations: usize,
    /// Objective evaluations performed.
    pub evaluations: usize,
    /// Whether the tolerance test passed before the budget ran out.
    pub converged: bool,
}

/// Nelder-Mead settings.
///
/// # Examples
///
/// ```
/// use ion_optimizer::NelderMead;
///
/// let nm = NelderMead::new(400);
/// let min = nm
///     .minimize(|p| (p[0] - 0.3).powi(2) + (p[1] - 0.7).powi(2), &[0.9, 0.1])
///     .unwrap();
/// assert!((min.x[0] - 0.3).abs() < 1e-3);
/// assert!((min.x[1] - 0.7).abs() < 1e-3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NelderMead {
    /// Maximum number of iterations.
    pub max_iters: usize,
    /// Convergence threshold on the standard deviation of vertex values.
    pub sd_tolerance: f64,
}

/// Adapts a plain function to `argmin`, clamping into the unit cube.
///
/// NaN values are reported as `+∞` so the simplex ordering stays total.
struct UnitCubeCost<'a, F> {
    f: &'a F,
}

impl<F> CostFunction for UnitCubeCost<'_, F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> core::result::Result<Self::Output, argmin::core::Error> {
        let value = (self.f)(&clamp_unit(p));
        Ok(if value.is_nan() { f64::INFINITY } else { value })
    }
}

impl NelderMead {
    /// Creates a minimizer with the given iteration budget and the default tolerance.
    #[must_use]
    pub fn new(max_iters: usize) -> Self {
        Self {
            max_iters,
            sd_tolerance: DEFAULT_SD_TOLERANCE,
        }
    }

    /// Minimizes `f` over the unit cube starting from `x0`.
    ///
    /// `x0` is clamped into the cube first. An empty `x0` evaluates `f`
    /// once at the empty point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocalSearch`] if the solver rejects its settings
    /// (e.g. a negative tolerance).
    pub fn minimize<F>(&self, f: F, x0: &[f64]) -> Result<LocalMinimum>
    where
        F: Fn(&[f64]) -> f64,
    {
        let x0 = clamp_unit(x0);
        if x0.is_empty() {
            let value = f(&x0);
            return Ok(LocalMinimum {
                x: x0,
                value,
                iterations: 0,
                evaluations: 1,
                converged: true,
            });
        }

        let solver: ArgminNelderMead<Vec<f64>, f64> =
            ArgminNelderMead::new(initial_simplex(&x0))
                .with_sd_tolerance(self.sd_tolerance)
                .map_err(|e| Error::LocalSearch(e.to_string()))?;
        let max_iters = self.max_iters as u64;

        let res = Executor::new(UnitCubeCost { f: &f }, solver)
            .configure(|state| state.max_iters(max_iters))
            .run()
            .map_err(|e| Error::LocalSearch(e.to_string()))?;

        let state = res.state();
        let x = state
            .get_best_param()
            .map_or_else(|| x0.clone(), |p| clamp_unit(p));
        let value = state.get_best_cost();
        #[allow(clippy::cast_possible_truncation)]
        let iterations = state.get_iter() as usize;
        #[allow(clippy::cast_possible_truncation)]
        let evaluations = state
            .get_func_counts()
            .get("cost_count")
            .copied()
            .unwrap_or_default() as usize;
        let converged = matches!(
            state.get_termination_reason(),
            Some(TerminationReason::SolverConverged)
        );

        Ok(LocalMinimum {
            x,
            value,
            iterations,
            evaluations,
            converged,
        })
    }
}

fn clamp_unit(p: &[f64]) -> Vec<f64> {
    p.iter().map(|v| v.clamp(0.0, 1.0)).collect()
}

/// Start vertex plus one vertex per axis, reflected inward when a step
/// would leave the cube.
fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.to_vec());
    for k in 0..x0.len() {
        let mut vertex = x0.to_vec();
        let stepped = if vertex[k] == 0.0 {
            ZERO_DELTA
        } else {
            (1.0 + NONZERO_DELTA) * vertex[k]
        };
        vertex[k] = if stepped > 1.0 { 2.0 - stepped } else { stepped };
        vertex[k] = vertex[k].clamp(0.0, 1.0);
        simplex.push(vertex);
    }
    simplex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_interior_minimum() {
        let nm = NelderMead::new(2000);
        let target = [0.25, 0.6, 0.8];
        let min = nm
            .minimize(
                |p| p.iter().zip(&target).map(|(a, b)| (a - b).powi(2)).sum(),
                &[0.9, 0.1, 0.5],
            )
            .unwrap();
        assert!(min.converged);
        for (a, b) in min.x.iter().zip(&target) {
            assert!((a - b).abs() < 5e-3, "{:?}", min.x);
        }
    }

    #[test]
    fn stops_at_the_boundary() {
        let nm = NelderMead::new(400);
        // Unconstrained minimum at x = 1.5, outside the cube.
        let min = nm.minimize(|p| (p[0] - 1.5).powi(2), &[0.2]).unwrap();
        assert!(min.x[0] <= 1.0);
        assert!((min.x[0] - 1.0).abs() < 1e-3, "{:?}", min.x);
        assert!((min.value - 0.25).abs() < 1e-6);
    }

    #[test]
    fn never_evaluates_outside_the_unit_cube() {
        let nm = NelderMead::new(400);
        let min = nm
            .minimize(
                |p| {
                    assert!(p.iter().all(|v| (0.0..=1.0).contains(v)), "{p:?}");
                    -p[0] - 2.0 * p[1]
                },
                &[0.5, 0.5],
            )
            .unwrap();
        assert!((min.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn walls_of_infinity_are_avoided() {
        let nm = NelderMead::new(400);
        let f = |p: &[f64]| {
            if p[0] > 0.6 {
                f64::INFINITY
            } else {
                -p[0]
            }
        };
        let min = nm.minimize(f, &[0.2]).unwrap();
        assert!(min.value.is_finite());
        assert!(min.x[0] <= 0.6);
        assert!(min.x[0] > 0.55, "{:?}", min.x);
    }

    #[test]
    fn all_infinite_surface_exhausts_the_budget() {
        let nm = NelderMead::new(100);
        let min = nm.minimize(|_| f64::INFINITY, &[0.4, 0.4]).unwrap();
        assert_eq!(min.value, f64::INFINITY);
        assert!(!min.converged);
        assert!(min.x.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn nan_is_treated_as_infinite() {
        let nm = NelderMead::new(200);
        let f = |p: &[f64]| if p[0] < 0.1 { f64::NAN } else { p[0] };
        let min = nm.minimize(f, &[0.5]).unwrap();
        assert!(min.value.is_finite());
        assert!(min.x[0] >= 0.1 && min.x[0] < 0.11, "{:?}", min.x);
    }

    #[test]
    fn initial_simplex_steps_inward_at_upper_edge() {
        let simplex = initial_simplex(&[1.0, 0.0]);
        assert_eq!(simplex.len(), 3);
        assert!((simplex[1][0] - 0.95).abs() < 1e-12);
        assert!((simplex[2][1] - ZERO_DELTA).abs() < 1e-15);
    }

    #[test]
    fn respects_iteration_budget() {
        let nm = NelderMead {
            max_iters: 5,
            sd_tolerance: 0.0,
        };
        let min = nm.minimize(|p| (p[0] - 0.3).powi(2), &[0.9]).unwrap();
        assert!(!min.converged);
        assert!(min.iterations <= 5);
        assert!(min.evaluations >= 2);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let nm = NelderMead {
            max_iters: 10,
            sd_tolerance: -1.0,
        };
        let err = nm.minimize(|p| p[0], &[0.5]).unwrap_err();
        assert!(matches!(err, Error::LocalSearch(_)));
    }
}
