//! Measurement filtering at the boundary between the device and the optimizer.
//!
//! The optimizer expects filtered `(objective, stability)` pairs, not raw
//! samples. [`MeasurementFilter`] is the seam for any estimator that turns
//! a stream of readings into such a pair. [`KalmanFilter`] tracks level and
//! drift and is what a control loop normally uses; [`WindowStatistics`] is a
//! simple sliding-window alternative.

use std::collections::VecDeque;

use nalgebra::{Matrix2, RowVector2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::stats::population_std;

/// Filtered estimate of a noisy reading.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Estimate {
    /// Estimated mean (the objective value).
    pub mean: f64,
    /// Estimated standard deviation of the readings.
    pub std: f64,
}

impl Estimate {
    /// Relative fluctuation `std / mean`, the instability indicator fed to
    /// the optimizer. Larger is less stable.
    #[must_use]
    pub fn stability(&self) -> f64 {
        self.std / self.mean
    }
}

/// A recursive estimator that smooths readings and reports settling.
pub trait MeasurementFilter {
    /// Feeds one reading.
    fn update(&mut self, measurement: f64);

    /// Current estimate, if enough readings have been seen.
    fn estimate(&self) -> Option<Estimate>;

    /// Whether the underlying signal has stopped drifting.
    fn is_settled(&self) -> bool;

    /// Forgets all readings, e.g. after the setting changes.
    fn reset(&mut self);
}

/// Number of steps before [`KalmanFilter`] may report settling.
pub(crate) const SETTLE_MIN_STEPS: usize = 20;

/// Number of consecutive slope estimates that must be below the limit.
pub(crate) const SETTLE_WINDOW: usize = 10;

/// Default slope limit for [`KalmanFilter`], in reading units per time unit.
pub(crate) const DEFAULT_SLOPE_MAX: f64 = 1e-5;

/// Longest memory of the exponentially weighted spread estimate.
const SPREAD_MEMORY: f64 = 100.0;

/// Constant-velocity Kalman filter over a scalar reading.
///
/// The state is `(level, slope)`. Process noise is a continuous white
/// acceleration with unit intensity, so `measurement_noise` is the ratio of
/// measurement to process noise: larger values smooth harder. The spread of
/// the readings is estimated from the innovations, rescaled by the
/// filter's own innovation variance.
///
/// The filter counts as settled after more than [`SETTLE_MIN_STEPS`] updates
/// once the last [`SETTLE_WINDOW`] slope estimates are all below the slope
/// limit in magnitude.
///
/// # Examples
///
/// ```
/// use ion_optimizer::{KalmanFilter, MeasurementFilter};
///
/// let mut filter = KalmanFilter::new(1.0, 1e3);
/// for _ in 0..25 {
///     filter.update(1.0);
/// }
/// assert!(filter.is_settled());
/// assert_eq!(filter.estimate().unwrap().mean, 1.0);
/// ```
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    state: Vector2<f64>,
    covariance: Matrix2<f64>,
    measurement_noise: f64,
    slope_max: f64,
    steps: usize,
    slopes: VecDeque<f64>,
    spread: f64,
}

impl KalmanFilter {
    /// Creates a filter at `initial` level with zero slope.
    ///
    /// A non-positive or non-finite `measurement_noise` falls back to 1.
    #[must_use]
    pub fn new(initial: f64, measurement_noise: f64) -> Self {
        let measurement_noise = if measurement_noise.is_finite() && measurement_noise > 0.0 {
            measurement_noise
        } else {
            1.0
        };
        Self {
            state: Vector2::new(initial, 0.0),
            covariance: Self::prior(measurement_noise),
            measurement_noise,
            slope_max: DEFAULT_SLOPE_MAX,
            steps: 0,
            slopes: VecDeque::with_capacity(SETTLE_WINDOW),
            spread: 0.0,
        }
    }

    /// Sets the slope limit used by [`is_settled`](MeasurementFilter::is_settled).
    #[must_use]
    pub fn with_slope_max(mut self, slope_max: f64) -> Self {
        self.slope_max = slope_max.abs();
        self
    }

    fn prior(measurement_noise: f64) -> Matrix2<f64> {
        Matrix2::new(measurement_noise, 0.0, 0.0, 1.0)
    }

    /// Feeds one reading taken `dt` time units after the previous one.
    ///
    /// Negative or non-finite `dt` is treated as zero.
    pub fn update_with_dt(&mut self, measurement: f64, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let transition = Matrix2::new(1.0, dt, 0.0, 1.0);
        let process = Matrix2::new(
            dt.powi(3) / 3.0,
            dt * dt / 2.0,
            dt * dt / 2.0,
            dt,
        );
        let predicted = transition * self.state;
        let predicted_cov = transition * self.covariance * transition.transpose() + process;

        let observe = RowVector2::new(1.0, 0.0);
        let innovation = measurement - predicted[0];
        let innovation_var = predicted_cov[(0, 0)] + self.measurement_noise;
        let gain = predicted_cov.column(0) / innovation_var;

        self.state = predicted + gain * innovation;
        self.covariance = (Matrix2::identity() - gain * observe) * predicted_cov;

        self.steps += 1;
        #[allow(clippy::cast_precision_loss)]
        let weight = (1.0 / self.steps as f64).max(1.0 / SPREAD_MEMORY);
        let scaled = innovation * innovation * self.measurement_noise / innovation_var;
        self.spread = (1.0 - weight) * self.spread + weight * scaled;

        if self.slopes.len() == SETTLE_WINDOW {
            self.slopes.pop_front();
        }
        self.slopes.push_back(self.state[1]);
    }

    /// Current level estimate.
    #[must_use]
    pub fn level(&self) -> f64 {
        self.state[0]
    }

    /// Current slope estimate, per time unit.
    #[must_use]
    pub fn slope(&self) -> f64 {
        self.state[1]
    }

    /// Updates seen since creation or the last reset.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl MeasurementFilter for KalmanFilter {
    fn update(&mut self, measurement: f64) {
        self.update_with_dt(measurement, 1.0);
    }

    fn estimate(&self) -> Option<Estimate> {
        (self.steps > 0).then(|| Estimate {
            mean: self.state[0],
            std: self.spread.sqrt(),
        })
    }

    fn is_settled(&self) -> bool {
        self.steps > SETTLE_MIN_STEPS
            && self.slopes.len() == SETTLE_WINDOW
            && self.slopes.iter().all(|s| s.abs() < self.slope_max)
    }

    /// Restarts around the current level with zero slope.
    fn reset(&mut self) {
        self.state = Vector2::new(self.state[0], 0.0);
        self.covariance = Self::prior(self.measurement_noise);
        self.steps = 0;
        self.slopes.clear();
        self.spread = 0.0;
    }
}

/// Mean and standard deviation over the most recent `capacity` readings.
///
/// Settled once the window is full and the means of its older and newer
/// halves differ by at most `drift_tolerance`.
///
/// # Examples
///
/// ```
/// use ion_optimizer::{MeasurementFilter, WindowStatistics};
///
/// let mut filter = WindowStatistics::new(4, 1e-3);
/// for v in [1.0, 1.0, 1.0, 1.0] {
///     filter.update(v);
/// }
/// let est = filter.estimate().unwrap();
/// assert_eq!(est.mean, 1.0);
/// assert_eq!(est.std, 0.0);
/// assert!(filter.is_settled());
/// ```
#[derive(Clone, Debug)]
pub struct WindowStatistics {
    window: VecDeque<f64>,
    capacity: usize,
    drift_tolerance: f64,
}

impl WindowStatistics {
    /// Creates a filter over `capacity` readings (at least 2).
    #[must_use]
    pub fn new(capacity: usize, drift_tolerance: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            drift_tolerance,
        }
    }

    /// Number of readings currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Returns `true` if no readings are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[allow(clippy::cast_precision_loss)]
    fn half_means(&self) -> (f64, f64) {
        let half = self.window.len() / 2;
        let older = self.window.iter().take(half).sum::<f64>() / half as f64;
        let newer =
            self.window.iter().skip(half).sum::<f64>() / (self.window.len() - half) as f64;
        (older, newer)
    }
}

impl MeasurementFilter for WindowStatistics {
    fn update(&mut self, measurement: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(measurement);
    }

    #[allow(clippy::cast_precision_loss)]
    fn estimate(&self) -> Option<Estimate> {
        if self.window.len() < 2 {
            return None;
        }
        let values: Vec<f64> = self.window.iter().copied().collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(Estimate {
            mean,
            std: population_std(&values),
        })
    }

    fn is_settled(&self) -> bool {
        if self.window.len() < self.capacity {
            return false;
        }
        let (older, newer) = self.half_means();
        (newer - older).abs() <= self.drift_tolerance
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}
