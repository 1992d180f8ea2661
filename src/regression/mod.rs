//! Regression models of signal against defect size.
//!
//! - [`fit_uncensored`] — ordinary least squares on the in-range points
//! - [`fit_censored`] — Gaussian maximum likelihood with censored points
//! - [`fit_quantile`] / [`quantile_regression`] — linear quantile regression
//!   (IRLS) and [`invert_to_defect_size`] to read a defect size off the line
//!
//! # References
//!
//! - Draper & Smith (1998). "Applied Regression Analysis", 3rd edition.
//! - Koenker, R. (2005). *Quantile Regression*. Cambridge University Press.
//! - MIL-HDBK-1823A (2009). *Nondestructive Evaluation System Reliability
//!   Assessment*, Section 4 (â vs a analysis with censored data).

mod censored;
mod ols;
mod quantile;

pub use censored::{censored_log_likelihood, fit_censored};
pub use ols::{fit_uncensored, LinearFit};
pub use quantile::{
    fit_quantile, invert_to_defect_size, quantile_regression, LinearPredictor, QuantRegOptions,
};

pub(crate) use ols::ols_line;
