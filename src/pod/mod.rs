//! POD curves: functions mapping a defect size to a probability of detection.
//!
//! Every curve is a small value type implementing [`PodCurve`]; the fitted
//! parameters live in struct fields, so curves can be cloned, sent across
//! threads and compared.
//!
//! - [`LinearPod`] — complementary CDF of the residuals at
//!   `detection − (β₀ + β₁·a)` (Berens-Binomial / Berens-Gauss / kernel)
//! - [`BinomialConfidencePod`] — closed-form lower tolerance bound for the
//!   empirical (Berens-Binomial) case
//! - [`EnsemblePod`] — lower empirical quantile over bootstrap curves
//! - [`InterpolatedPod`] — anchored piecewise-linear curve through inverted
//!   (defect size, quantile level) pairs
//!
//! # References
//!
//! Berens, A.P. (1989). "NDE Reliability Data Analysis", *ASM Handbook*
//! Vol. 17, 689–701.

mod binomial;
mod curve;

pub use binomial::binomial_confidence_bound;
pub use curve::{
    BinomialConfidencePod, EnsemblePod, InterpolatedPod, LinearPod, PodCurve, PodModel,
};

/// Which linear regression a POD curve is built on.
///
/// The censored variant exists only when a noise or saturation threshold
/// was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelVariant {
    /// Ordinary least squares on the in-range points.
    #[default]
    Uncensored,
    /// Maximum likelihood including the censored points.
    Censored,
}
