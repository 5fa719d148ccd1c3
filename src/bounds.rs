//! Physical search box and the unit-cube mapping used for all modeling.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lower and upper limits of every control parameter.
///
/// All surrogate modeling and acquisition search happen in the unit cube;
/// [`normalize`](Self::normalize) and [`denormalize`](Self::denormalize)
/// convert between that cube and the physical box.
///
/// # Examples
///
/// ```
/// use ion_optimizer::SearchBounds;
///
/// let bounds = SearchBounds::new(vec![0.0, 10.0], vec![2.0, 20.0]).unwrap();
/// assert_eq!(bounds.normalize(&[1.0, 15.0]), vec![0.5, 0.5]);
/// assert_eq!(bounds.denormalize(&[0.0, 1.0]), vec![0.0, 20.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "BoundsFields")
)]
pub struct SearchBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

/// Wire form of [`SearchBounds`]; deserialization re-runs the validation.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct BoundsFields {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<BoundsFields> for SearchBounds {
    type Error = Error;

    fn try_from(fields: BoundsFields) -> Result<Self> {
        Self::new(fields.lower, fields.upper)
    }
}

impl SearchBounds {
    /// Creates a search box from per-dimension lower and upper limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the vectors differ in length
    /// or are empty, and [`Error::InvalidBounds`] if any dimension has
    /// `low >= high` or a non-finite limit.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.is_empty() || lower.len() != upper.len() {
            return Err(Error::DimensionMismatch {
                expected: lower.len().max(1),
                got: upper.len(),
            });
        }
        for (dim, (&low, &high)) in lower.iter().zip(&upper).enumerate() {
            if !low.is_finite() || !high.is_finite() || low >= high {
                return Err(Error::InvalidBounds { dim, low, high });
            }
        }
        Ok(Self { lower, upper })
    }

    /// The unit cube `[0, 1]^dims`.
    #[must_use]
    pub fn unit(dims: usize) -> Self {
        Self {
            lower: vec![0.0; dims],
            upper: vec![1.0; dims],
        }
    }

    /// Number of parameter dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.lower.len()
    }

    /// Per-dimension lower limits.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Per-dimension upper limits.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Maps a physical point into the unit cube: `(x - lower) / (upper - lower)`.
    ///
    /// Points outside the box map outside the cube; no clamping is applied.
    #[must_use]
    pub fn normalize(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&x, (&lo, &hi))| (x - lo) / (hi - lo))
            .collect()
    }

    /// Maps a unit-cube point back into the physical box: `p * (upper - lower) + lower`.
    #[must_use]
    pub fn denormalize(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&p, (&lo, &hi))| p * (hi - lo) + lo)
            .collect()
    }

    /// Returns `true` if `point` lies inside the box, limits inclusive.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dims()
            && point
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&x, (&lo, &hi))| (lo..=hi).contains(&x))
    }

    pub(crate) fn check_dims(&self, got: usize) -> Result<()> {
        if got == self.dims() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.dims(),
                got,
            })
        }
    }
}
