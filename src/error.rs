//! Error type shared by every estimation stage.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PodError>;

/// Errors raised while preparing data, fitting models or building POD curves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PodError {
    #[error("defect sample must be one-dimensional: expected dimension {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("paired samples differ in length: {defects} defects, {signals} signals")]
    LengthMismatch { defects: usize, signals: usize },

    #[error("not enough data points: got {got}, need at least {min}")]
    InsufficientData { got: usize, min: usize },

    #[error("input contains non-finite values")]
    NonFinite,

    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("design matrix is singular (defects have no spread)")]
    SingularDesign,

    #[error("Box-Cox transform requires strictly positive values")]
    NonPositiveSignal,

    #[error("no solution for target {target} in [{lower}, {upper}]")]
    NoSolutionInRange { target: f64, lower: f64, upper: f64 },

    #[error("quantile regression at level {level} is not increasing in defect size (slope {slope})")]
    NonMonotoneFit { level: f64, slope: f64 },

    #[error("{what} did not converge after {iterations} iterations")]
    NotConverged { what: &'static str, iterations: usize },

    #[error("POD model for censored data is not available: no censoring threshold was given")]
    CensoringDisabled,

    #[error("bootstrap produced only {succeeded} usable fits out of {total}")]
    Bootstrap { succeeded: usize, total: usize },

    #[error("bootstrap interrupted after {completed} iterations")]
    Interrupted { completed: usize },
}

impl PodError {
    /// Returns `true` for failures caused by root bracketing, either a
    /// missing sign change or a non-increasing predictor.
    pub fn is_no_solution(&self) -> bool {
        matches!(
            self,
            PodError::NoSolutionInRange { .. } | PodError::NonMonotoneFit { .. }
        )
    }
}

/// Checks that `value` is a probability strictly inside (0, 1).
pub(crate) fn check_open_unit(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(PodError::InvalidParameter { name, value })
    }
}
