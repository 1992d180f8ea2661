//! Numerical building blocks consumed by the estimators.
//!
//! - [`brent_root`] — derivative-free bracketed root finding
//! - [`golden_section_maximize`] / [`nelder_mead_maximize`] — 1-D and N-D
//!   maximization for likelihood fits
//! - [`LinearInterpolator`] — clamped piecewise-linear interpolation
//! - [`empirical_quantile`] / [`column_quantiles`] — order-statistic quantiles
//!
//! # References
//!
//! - Brent, R.P. (1973). *Algorithms for Minimization without Derivatives*.
//! - Nelder, J.A. & Mead, R. (1965). "A simplex method for function
//!   minimization", *Computer Journal* 7(4).

mod interpolate;
mod optimize;
mod quantile;
mod roots;

pub use interpolate::LinearInterpolator;
pub use optimize::{
    golden_section_maximize, nelder_mead_maximize, Maximum, NelderMeadOptions,
};
pub use quantile::{column_quantiles, empirical_quantile};
pub use roots::brent_root;

/// `n` evenly spaced values from `start` to `end` inclusive.
///
/// # Examples
///
/// ```
/// use u_pod::numerics::linspace;
///
/// let v = linspace(0.05, 0.98, 21);
/// assert_eq!(v.len(), 21);
/// assert_eq!(v[0], 0.05);
/// assert_eq!(v[20], 0.98);
/// ```
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + i as f64 * step })
                .collect()
        }
    }
}
