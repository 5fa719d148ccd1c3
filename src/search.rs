//! Multi-start local search over the unit cube.
//!
//! The risk gate can split the admissible region into disconnected pieces,
//! so one local search is not enough. Each start is seeded independently
//! (`seed + run index`), runs its own [`NelderMead`] minimization, and the
//! best result wins. Results are ranked after all runs finish, by value and
//! then by run index, so parallel (`rayon` feature) and serial execution
//! agree.

use core::cmp::Ordering;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::error::Result;
use crate::nelder_mead::{LocalMinimum, NelderMead};
use crate::rng_util;

/// One finished local run.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRun {
    /// Position of the run in the start sequence.
    pub index: usize,
    /// Uniform random start point.
    pub start: Vec<f64>,
    /// Where the local search ended.
    pub result: LocalMinimum,
}

/// All runs of a multi-start search and the index of the winner.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    /// Runs in start order.
    pub runs: Vec<SearchRun>,
    /// Index into `runs` of the lowest value (first on ties).
    pub best: usize,
}

impl SearchOutcome {
    /// The winning run.
    #[must_use]
    pub fn best_run(&self) -> &SearchRun {
        &self.runs[self.best]
    }

    /// Winning point in the unit cube.
    #[must_use]
    pub fn best_point(&self) -> &[f64] {
        &self.best_run().result.x
    }

    /// Winning value.
    #[must_use]
    pub fn best_value(&self) -> f64 {
        self.best_run().result.value
    }

    /// Returns `true` if no run reached a finite value.
    #[must_use]
    pub fn all_non_finite(&self) -> bool {
        self.runs.iter().all(|r| !r.result.value.is_finite())
    }
}

/// Multi-start search settings.
///
/// # Examples
///
/// ```
/// use ion_optimizer::{MultiStart, NelderMead};
///
/// let search = MultiStart::new(8, NelderMead::new(200));
/// // Two basins; the deeper one is at x = 0.8.
/// let f = |p: &[f64]| ((p[0] - 0.2).powi(2) + 0.1).min((p[0] - 0.8).powi(2));
/// let outcome = search.run(f, 1, 42).unwrap();
/// assert!((outcome.best_point()[0] - 0.8).abs() < 0.01);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MultiStart {
    /// Number of independent starts.
    pub n_starts: usize,
    /// Run starts on the rayon thread pool (requires the `rayon` feature).
    pub parallel: bool,
    /// Local minimizer used by every start.
    pub local: NelderMead,
}

impl MultiStart {
    /// Creates a serial multi-start search.
    #[must_use]
    pub fn new(n_starts: usize, local: NelderMead) -> Self {
        Self {
            n_starts,
            parallel: false,
            local,
        }
    }

    /// Enables or disables threaded execution.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Start point of run `index` for the given base seed.
    #[must_use]
    pub fn start_point(dims: usize, seed: u64, index: usize) -> Vec<f64> {
        let mut rng = fastrand::Rng::with_seed(seed.wrapping_add(index as u64));
        rng_util::unit_point(&mut rng, dims)
    }

    /// Minimizes `f` over `[0, 1]^dims` from `n_starts` random starts.
    ///
    /// A zero `n_starts` is treated as one start. With the `rayon` feature
    /// and `parallel` set, starts run on the rayon pool; otherwise serially.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocalSearch`](crate::Error::LocalSearch) if a local
    /// minimization fails.
    pub fn run<F>(&self, f: F, dims: usize, seed: u64) -> Result<SearchOutcome>
    where
        F: Fn(&[f64]) -> f64 + Sync,
    {
        let n_starts = self.n_starts.max(1);
        let run_one = |index: usize| -> Result<SearchRun> {
            let start = Self::start_point(dims, seed, index);
            let result = self.local.minimize(&f, &start)?;
            trace_debug!(
                run = index,
                value = result.value,
                iterations = result.iterations,
                converged = result.converged,
                "local search finished"
            );
            Ok(SearchRun {
                index,
                start,
                result,
            })
        };

        #[cfg(feature = "rayon")]
        let runs: Vec<SearchRun> = if self.parallel && n_starts > 1 {
            (0..n_starts).into_par_iter().map(run_one).collect::<Result<_>>()?
        } else {
            (0..n_starts).map(run_one).collect::<Result<_>>()?
        };
        #[cfg(not(feature = "rayon"))]
        let runs: Vec<SearchRun> = (0..n_starts).map(run_one).collect::<Result<_>>()?;

        let best = best_index(&runs);
        Ok(SearchOutcome { runs, best })
    }
}

/// Lowest value wins; ties (including equal infinities) go to the lower index.
fn best_index(runs: &[SearchRun]) -> usize {
    runs.iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            a.result
                .value
                .partial_cmp(&b.result.value)
                .unwrap_or(Ordering::Equal)
                .then(ia.cmp(ib))
        })
        .map_or(0, |(i, _)| i)
}
