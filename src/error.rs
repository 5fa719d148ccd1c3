#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Returned when the observation history cannot support a regression:
    /// fewer than two points, a zero normalization divisor, non-finite
    /// targets, or a covariance matrix that is not positive definite.
    ///
    /// Gather more (or better-conditioned) observations before retrying.
    #[error("degenerate data: {0}")]
    DegenerateData(String),

    /// Returned when a point, bound, or length-scale vector has the wrong
    /// number of dimensions.
    #[error("dimension mismatch: expected {expected} dimensions but got {got}")]
    DimensionMismatch {
        /// The expected number of dimensions.
        expected: usize,
        /// The actual number of dimensions supplied.
        got: usize,
    },

    /// Returned when the three columns of an observation history differ in length.
    #[error(
        "history length mismatch: {settings} settings, {objective} objective values, {stability} stability values"
    )]
    LengthMismatch {
        /// Number of recorded settings.
        settings: usize,
        /// Number of recorded objective values.
        objective: usize,
        /// Number of recorded stability values.
        stability: usize,
    },

    /// Returned when a search dimension has `low >= high` or a non-finite limit.
    #[error("invalid bounds for dimension {dim}: low ({low}) must be less than high ({high})")]
    InvalidBounds {
        /// The offending dimension.
        dim: usize,
        /// The lower limit.
        low: f64,
        /// The upper limit.
        high: f64,
    },

    /// Returned when an optimizer configuration fails validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when the local minimizer itself fails, e.g. on an invalid
    /// tolerance.
    #[error("local search failed: {0}")]
    LocalSearch(String),

    /// Returned when every multi-start run ended on an inadmissible point,
    /// i.e. nothing explored satisfies the risk tolerance.
    ///
    /// Widen the bounds, relax the risk tolerance, or halt the control loop.
    #[error("no admissible candidate found (best score {score})")]
    NoAdmissibleCandidate {
        /// The least-bad (non-finite) acquisition score.
        score: f64,
    },
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateData(reason.into())
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Returns `true` when the caller should collect more observations
    /// before trying again.
    #[must_use]
    pub fn needs_more_data(&self) -> bool {
        matches!(self, Self::DegenerateData(_))
    }
}
