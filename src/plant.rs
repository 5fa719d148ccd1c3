//! Simulated two-parameter ion source used to generate test data.
//!
//! The mean beam current and its noise amplitude are both 2-D Gaussians
//! over the two control settings. Moving to a new setting does not take
//! effect instantly: readings follow an arctan-shaped transient from the
//! old operating point to the new one.

use core::f64::consts::PI;

use crate::rng_util;

/// Transient sharpness.
const STRETCH: f64 = 0.02;
/// Transient midpoint, in transition steps.
const MIDPOINT: f64 = 20.0;

/// Axis-aligned 2-D Gaussian bump.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gaussian2d {
    /// Peak value.
    pub amplitude: f64,
    /// Centre along the first setting.
    pub x_mean: f64,
    /// Centre along the second setting.
    pub y_mean: f64,
    /// Width along the first setting.
    pub x_std: f64,
    /// Width along the second setting.
    pub y_std: f64,
}

impl Gaussian2d {
    /// Value at `(x, y)`.
    #[must_use]
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let dx = (x - self.x_mean) / self.x_std;
        let dy = (y - self.y_mean) / self.y_std;
        self.amplitude * (-0.5 * (dx * dx + dy * dy)).exp()
    }
}

/// Default beam-current profile: peak 1 at (0.5, 0.5).
pub const BEAM_PROFILE: Gaussian2d = Gaussian2d {
    amplitude: 1.0,
    x_mean: 0.5,
    y_mean: 0.5,
    x_std: 0.5,
    y_std: 0.3,
};

/// Default noise profile: an unstable pocket around (0.6, 0.6).
pub const NOISE_PROFILE: Gaussian2d = Gaussian2d {
    amplitude: 0.1,
    x_mean: 0.6,
    y_mean: 0.6,
    x_std: 0.2,
    y_std: 0.1,
};

/// Toy ion source with noisy readings and slow transitions.
///
/// # Examples
///
/// ```
/// use ion_optimizer::plant::IonSourceSim;
///
/// let mut source = IonSourceSim::with_seed([0.5, 0.5], 1);
/// let reading = source.read();
/// assert!((reading - 1.0).abs() < 0.5);
/// ```
#[derive(Debug)]
pub struct IonSourceSim {
    state: [f64; 2],
    beam: Gaussian2d,
    noise: Gaussian2d,
    time: f64,
    rng: fastrand::Rng,
}

impl IonSourceSim {
    /// Creates a source at `state` with the default profiles and a random seed.
    #[must_use]
    pub fn new(state: [f64; 2]) -> Self {
        Self::with_profiles(state, BEAM_PROFILE, NOISE_PROFILE, fastrand::Rng::new())
    }

    /// Creates a source at `state` with the default profiles and a fixed seed.
    #[must_use]
    pub fn with_seed(state: [f64; 2], seed: u64) -> Self {
        Self::with_profiles(
            state,
            BEAM_PROFILE,
            NOISE_PROFILE,
            fastrand::Rng::with_seed(seed),
        )
    }

    /// Creates a source with custom beam and noise profiles.
    #[must_use]
    pub fn with_profiles(
        state: [f64; 2],
        beam: Gaussian2d,
        noise: Gaussian2d,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            state,
            beam,
            noise,
            time: 0.0,
            rng,
        }
    }

    /// Current setting.
    #[must_use]
    pub fn state(&self) -> [f64; 2] {
        self.state
    }

    /// Noise-free beam current at `setting`.
    #[must_use]
    pub fn beam_mean(&self, setting: [f64; 2]) -> f64 {
        self.beam.eval(setting[0], setting[1])
    }

    /// Standard deviation of readings at `setting`.
    #[must_use]
    pub fn noise_amplitude(&self, setting: [f64; 2]) -> f64 {
        self.noise.eval(setting[0], setting[1])
    }

    /// Forces the source to `state` and restarts the transient clock.
    pub fn set_state(&mut self, state: [f64; 2]) {
        self.state = state;
        self.time = 0.0;
    }

    /// One noisy reading at the current setting.
    pub fn read(&mut self) -> f64 {
        let z = rng_util::standard_normal(&mut self.rng);
        self.beam_mean(self.state) + z * self.noise_amplitude(self.state)
    }

    /// One reading while moving from the current setting towards `target`.
    ///
    /// Each call advances the transient by one step. The blend weight is
    /// about 0.38 at the first step, 0.5 at step 20, and approaches 1 slowly.
    /// Call [`set_state`](Self::set_state) once the move is complete.
    pub fn transition(&mut self, target: [f64; 2]) -> f64 {
        self.time += 1.0;
        let weight = ((STRETCH * (self.time - MIDPOINT)).atan() * 2.0 / PI + 1.0) / 2.0;

        let departure = self.beam_mean(self.state);
        let arrival = self.beam_mean(target);
        let noise_from = self.noise_amplitude(self.state);
        let noise_to = self.noise_amplitude(target);

        let z = rng_util::standard_normal(&mut self.rng);
        departure
            + weight * (arrival - departure)
            + z * (noise_from + weight * (noise_to - noise_from))
    }
}
