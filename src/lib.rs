#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Stability-constrained Bayesian optimization for tuning an ion source,
//! or any device whose response is noisy, non-linear, and occasionally
//! unstable. Given the settings tried so far and their filtered
//! measurements, the optimizer proposes the next setting to try, trading
//! expected improvement against the risk of entering an unstable region.
//!
//! # Getting Started
//!
//! ```
//! use ion_optimizer::prelude::*;
//!
//! let config = OptimizerConfig::builder()
//!     .kernel_length_scales(vec![0.3])
//!     .risk_tolerance(0.5)
//!     .build()
//!     .unwrap();
//! let bounds = SearchBounds::new(vec![10.0], vec![20.0]).unwrap();
//! let mut optimizer = StabilityOptimizer::with_seed(config, 42);
//!
//! let mut history = ObservationHistory::new();
//! history.push(vec![11.0], 0.3, 0.001).unwrap();
//! history.push(vec![15.0], 0.8, 0.002).unwrap();
//! history.push(vec![18.0], 0.6, 0.001).unwrap();
//!
//! let proposal = optimizer.next_point(&history, &bounds).unwrap();
//! if proposal.is_admissible() {
//!     optimizer.record(&proposal);
//!     println!("try {:?}", proposal.point);
//! }
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`ObservationHistory`] | Settings tried so far with their objective and instability measurements. |
//! | [`OptimizerConfig`] | Kernel length scales, noise candidates, exploration bias, risk tolerance. |
//! | [`SearchBounds`] | Physical limits of every control; modeling happens in the unit cube. |
//! | [`SurrogateFit`] | Objective and stability Gaussian processes with an auto-tuned noise level. |
//! | [`RiskGatedUcb`] | Acquisition score: negated UCB where admissible, `+∞` where too risky. |
//! | [`StabilityOptimizer`] | Runs fit, gate, and multi-start search; returns a [`Proposal`]. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on configuration, bounds, history, and proposals | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at fit and search milestones | off |
//! | `rayon` | Runs multi-start local searches on the [`rayon`](https://docs.rs/rayon) thread pool when [`OptimizerConfig::parallel`] is set | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod acquisition;
mod bounds;
mod config;
mod error;
mod filter;
mod gp;
mod history;
mod kernel;
mod nelder_mead;
mod optimizer;
pub mod plant;
mod rng_util;
mod search;
mod stats;
mod surrogate;

pub use acquisition::RiskGatedUcb;
pub use bounds::SearchBounds;
pub use config::{
    DEFAULT_EXPECTED_NOISE, DEFAULT_EXPLORATION_BIAS, DEFAULT_INSTABILITY_THRESHOLD,
    DEFAULT_N_STARTS, DEFAULT_NOISE_CANDIDATES, DEFAULT_RISK_TOLERANCE, OptimizerConfig,
    OptimizerConfigBuilder,
};
pub use error::{Error, Result};
pub use filter::{Estimate, KalmanFilter, MeasurementFilter, WindowStatistics};
pub use gp::GaussianProcess;
pub use history::{MIN_OBSERVATIONS, ObservationHistory};
pub use kernel::{LENGTH_SCALE_MAX, LENGTH_SCALE_MIN, Matern52};
pub use nelder_mead::{DEFAULT_SD_TOLERANCE, LocalMinimum, NelderMead};
pub use optimizer::{Proposal, StabilityOptimizer, next_point_query};
pub use search::{MultiStart, SearchOutcome, SearchRun};
pub use surrogate::{NoiseScore, NoiseSelection, SurrogateFit, select_noise};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use ion_optimizer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bounds::SearchBounds;
    pub use crate::config::OptimizerConfig;
    pub use crate::error::{Error, Result};
    pub use crate::filter::{Estimate, KalmanFilter, MeasurementFilter, WindowStatistics};
    pub use crate::history::ObservationHistory;
    pub use crate::optimizer::{Proposal, StabilityOptimizer, next_point_query};
}
