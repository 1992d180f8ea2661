//! Box-Cox power transform of the signal axis.
//!
//! y(λ) = (y^λ − 1)/λ for λ ≠ 0 and ln y for λ = 0. The transform is
//! monotone increasing for every λ, so it preserves the ordering of signals
//! against the detection and censoring thresholds.
//!
//! # Examples
//!
//! ```
//! use u_pod::transform::BoxCoxTransform;
//!
//! let t = BoxCoxTransform::new(0.5).unwrap();
//! assert!((t.apply(4.0).unwrap() - 2.0).abs() < 1e-12); // (√4 − 1)/0.5
//! let log = BoxCoxTransform::new(0.0).unwrap();
//! assert!((log.apply(std::f64::consts::E).unwrap() - 1.0).abs() < 1e-12);
//! ```
//!
//! # References
//!
//! Box, G.E.P. & Cox, D.R. (1964). "An analysis of transformations",
//! *JRSS B* 26(2), 211–252.

use crate::error::{PodError, Result};
use crate::numerics::golden_section_maximize;
use crate::regression::ols_line;

/// Search interval for the fitted λ.
pub const LAMBDA_RANGE: (f64, f64) = (-3.0, 3.0);

const LAMBDA_TOL: f64 = 1e-6;

/// Below this |λ| the logarithmic branch is used.
const LOG_BRANCH_EPS: f64 = 1e-12;

/// How the Box-Cox transform is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BoxCoxSpec {
    /// Signals are used as observed.
    #[default]
    Disabled,
    /// Use the given λ without fitting.
    Fixed(f64),
    /// Fit λ by maximizing the profile log-likelihood on each (re)sample.
    Fitted,
}

impl From<bool> for BoxCoxSpec {
    fn from(enabled: bool) -> Self {
        if enabled {
            BoxCoxSpec::Fitted
        } else {
            BoxCoxSpec::Disabled
        }
    }
}

impl From<f64> for BoxCoxSpec {
    fn from(lambda: f64) -> Self {
        BoxCoxSpec::Fixed(lambda)
    }
}

/// A Box-Cox transform with fixed λ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCoxTransform {
    lambda: f64,
}

impl BoxCoxTransform {
    pub fn new(lambda: f64) -> Result<Self> {
        if !lambda.is_finite() {
            return Err(PodError::InvalidParameter {
                name: "Box-Cox lambda",
                value: lambda,
            });
        }
        Ok(Self { lambda })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Transforms a single strictly positive value.
    pub fn apply(&self, y: f64) -> Result<f64> {
        if !y.is_finite() || y <= 0.0 {
            return Err(PodError::NonPositiveSignal);
        }
        Ok(transform_unchecked(y, self.lambda))
    }

    /// Transforms every value of `ys`.
    pub fn apply_all(&self, ys: &[f64]) -> Result<Vec<f64>> {
        ys.iter().map(|&y| self.apply(y)).collect()
    }
}

fn transform_unchecked(y: f64, lambda: f64) -> f64 {
    if lambda.abs() < LOG_BRANCH_EPS {
        y.ln()
    } else {
        (y.powf(lambda) - 1.0) / lambda
    }
}

// ---------------------------------------------------------------------------
// Profile likelihood
// ---------------------------------------------------------------------------

/// Profile log-likelihood of λ for the linear model signal(λ) = a + b·defect.
///
/// # Algorithm
///
/// With the regression coefficients and the residual variance profiled out,
///
/// ℓ(λ) = −(n/2)·ln(RSS(λ)/n) + (λ − 1)·Σ ln yᵢ
///
/// where RSS(λ) is the OLS residual sum of squares of the transformed
/// signals and the second term is the log-Jacobian of the transform.
///
/// # Errors
///
/// `NonPositiveSignal` if any signal is ≤ 0, plus the OLS errors.
pub fn box_cox_log_likelihood(defects: &[f64], signals: &[f64], lambda: f64) -> Result<f64> {
    if signals.iter().any(|&y| !y.is_finite() || y <= 0.0) {
        return Err(PodError::NonPositiveSignal);
    }
    let transformed: Vec<f64> = signals.iter().map(|&y| transform_unchecked(y, lambda)).collect();
    let (intercept, slope) = ols_line(defects, &transformed)?;
    let rss: f64 = defects
        .iter()
        .zip(transformed.iter())
        .map(|(&x, &y)| (y - intercept - slope * x).powi(2))
        .sum();
    let n = signals.len() as f64;
    let sum_ln_y: f64 = signals.iter().map(|y| y.ln()).sum();
    Ok(-0.5 * n * (rss / n).ln() + (lambda - 1.0) * sum_ln_y)
}

/// Evaluates [`box_cox_log_likelihood`] on a grid of λ values, e.g. for
/// plotting the likelihood profile next to the fitted λ.
pub fn box_cox_profile(defects: &[f64], signals: &[f64], lambdas: &[f64]) -> Result<Vec<f64>> {
    lambdas
        .iter()
        .map(|&l| box_cox_log_likelihood(defects, signals, l))
        .collect()
}

/// Fits λ by golden-section maximization of the profile log-likelihood on
/// [`LAMBDA_RANGE`].
///
/// # Errors
///
/// `NonPositiveSignal` for non-positive signals, `NotConverged` when the
/// likelihood is not finite at the optimum (e.g. an exact linear fit).
pub fn fit_box_cox(defects: &[f64], signals: &[f64]) -> Result<BoxCoxTransform> {
    // Validate once so the objective can ignore errors.
    box_cox_log_likelihood(defects, signals, 1.0)?;
    let objective = |lambda: f64| {
        box_cox_log_likelihood(defects, signals, lambda).unwrap_or(f64::NEG_INFINITY)
    };
    let best = golden_section_maximize(objective, LAMBDA_RANGE.0, LAMBDA_RANGE.1, LAMBDA_TOL)
        .map_err(|e| match e {
            PodError::NotConverged { iterations, .. } => PodError::NotConverged {
                what: "Box-Cox lambda fit",
                iterations,
            },
            other => other,
        })?;
    BoxCoxTransform::new(best.point[0])
}
