//! Append-only record of tried settings and their filtered measurements.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum number of observations a regression can be fitted to.
pub const MIN_OBSERVATIONS: usize = 2;

/// Time-ordered observations fed to the optimizer, earliest first.
///
/// Each entry holds one control setting, the measured objective (e.g. mean
/// beam current), and an instability indicator (larger is less stable).
///
/// # Examples
///
/// ```
/// use ion_optimizer::ObservationHistory;
///
/// let mut history = ObservationHistory::new();
/// history.push(vec![0.2, 0.4], 0.7, 0.01).unwrap();
/// history.push(vec![0.5, 0.5], 1.0, 0.02).unwrap();
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.dims(), Some(2));
/// assert!(history.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationHistory {
    settings: Vec<Vec<f64>>,
    objective: Vec<f64>,
    stability: Vec<f64>,
}

impl ObservationHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from three parallel columns.
    ///
    /// Only shape is checked here; call [`validate`](Self::validate) to
    /// confirm the history can be fitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the columns differ in length and
    /// [`Error::DimensionMismatch`] if the settings are ragged.
    pub fn from_parts(
        settings: Vec<Vec<f64>>,
        objective: Vec<f64>,
        stability: Vec<f64>,
    ) -> Result<Self> {
        if settings.len() != objective.len() || settings.len() != stability.len() {
            return Err(Error::LengthMismatch {
                settings: settings.len(),
                objective: objective.len(),
                stability: stability.len(),
            });
        }
        if let Some(first) = settings.first() {
            let expected = first.len();
            if let Some(bad) = settings.iter().find(|s| s.len() != expected) {
                return Err(Error::DimensionMismatch {
                    expected,
                    got: bad.len(),
                });
            }
        }
        Ok(Self {
            settings,
            objective,
            stability,
        })
    }

    /// Appends one observation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `setting` does not match the
    /// dimensionality of earlier entries.
    pub fn push(&mut self, setting: Vec<f64>, objective: f64, stability: f64) -> Result<()> {
        if let Some(expected) = self.dims()
            && setting.len() != expected
        {
            return Err(Error::DimensionMismatch {
                expected,
                got: setting.len(),
            });
        }
        self.settings.push(setting);
        self.objective.push(objective);
        self.stability.push(stability);
        Ok(())
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Returns `true` if nothing has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Dimensionality of the recorded settings, if any exist.
    #[must_use]
    pub fn dims(&self) -> Option<usize> {
        self.settings.first().map(Vec::len)
    }

    /// Recorded settings in physical units.
    #[must_use]
    pub fn settings(&self) -> &[Vec<f64>] {
        &self.settings
    }

    /// Recorded objective values.
    #[must_use]
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    /// Recorded instability indicators.
    #[must_use]
    pub fn stability(&self) -> &[f64] {
        &self.stability
    }

    /// Largest recorded objective value, the divisor used to normalize outputs.
    #[must_use]
    pub fn max_objective(&self) -> Option<f64> {
        self.objective.iter().copied().reduce(f64::max)
    }

    /// Checks that the history can be fitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateData`] if there are fewer than
    /// [`MIN_OBSERVATIONS`] entries, a value is non-finite, or the largest
    /// objective value is zero.
    pub fn validate(&self) -> Result<()> {
        if self.len() < MIN_OBSERVATIONS {
            return Err(Error::degenerate(format!(
                "need at least {MIN_OBSERVATIONS} observations, got {}",
                self.len()
            )));
        }
        let all_finite = self
            .settings
            .iter()
            .flatten()
            .chain(&self.objective)
            .chain(&self.stability)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::degenerate("observation history contains non-finite values"));
        }
        match self.max_objective() {
            Some(max) if max != 0.0 => Ok(()),
            _ => Err(Error::degenerate(
                "maximum objective value is zero and cannot normalize outputs",
            )),
        }
    }
}
