//! Ordinary least squares on the design matrix [1, defect].

use tracing::debug;

use crate::error::{PodError, Result};

/// Result of a linear fit: signal = intercept + slope · defect + ε.
///
/// Built once per (re)sample and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Intercept (β₀).
    pub intercept: f64,
    /// Slope (β₁).
    pub slope: f64,
    /// Residual standard deviation σ̂.
    pub stderr: f64,
    /// Residuals (yᵢ − ŷᵢ) over the in-range points.
    pub residuals: Vec<f64>,
}

impl LinearFit {
    /// Predicted signal for a defect size.
    pub fn predict(&self, defect: f64) -> f64 {
        self.intercept + self.slope * defect
    }
}

/// Closed-form OLS line: β₁ = Sxy/Sxx, β₀ = ȳ − β₁·x̄.
///
/// # Errors
///
/// `LengthMismatch`, `InsufficientData` (n < 3), `NonFinite`, or
/// `SingularDesign` when x has zero variance.
pub(crate) fn ols_line(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let n = x.len();
    if n != y.len() {
        return Err(PodError::LengthMismatch {
            defects: n,
            signals: y.len(),
        });
    }
    if n < 3 {
        return Err(PodError::InsufficientData { got: n, min: 3 });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(PodError::NonFinite);
    }

    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_mean;
        sxx += dx * dx;
        sxy += dx * (yi - y_mean);
    }
    if sxx < 1e-300 {
        return Err(PodError::SingularDesign);
    }

    let slope = sxy / sxx;
    Ok((y_mean - slope * x_mean, slope))
}

/// Fits the uncensored linear model by ordinary least squares.
///
/// # Algorithm
///
/// β₁ = cov(x,y) / var(x), β₀ = ȳ − β₁·x̄, and
/// σ̂ = √(SSE / (n − 2)), the square root of the residual scale.
///
/// # Errors
///
/// See [`ols_line`]: fewer than 3 points, mismatched lengths, non-finite
/// values, or defects without spread.
///
/// # Examples
///
/// ```
/// use u_pod::regression::fit_uncensored;
///
/// let x = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = [3.1, 4.9, 7.1, 8.9, 11.1];
/// let fit = fit_uncensored(&x, &y).unwrap();
/// assert!((fit.slope - 2.0).abs() < 0.1);
/// assert_eq!(fit.residuals.len(), 5);
/// ```
pub fn fit_uncensored(defects: &[f64], signals: &[f64]) -> Result<LinearFit> {
    let (intercept, slope) = ols_line(defects, signals)?;

    let residuals: Vec<f64> = defects
        .iter()
        .zip(signals.iter())
        .map(|(&x, &y)| y - (intercept + slope * x))
        .collect();
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let df_res = (defects.len() - 2) as f64;
    let stderr = (sse / df_res).sqrt();

    debug!(intercept, slope, stderr, n = defects.len(), "uncensored OLS fit");

    Ok(LinearFit {
        intercept,
        slope,
        stderr,
        residuals,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn residuals_orthogonal_to_x(
            data in proptest::collection::vec(-1e3_f64..1e3, 5..=30)
                .prop_flat_map(|x| {
                    let n = x.len();
                    (Just(x), proptest::collection::vec(-1e3_f64..1e3, n..=n))
                })
        ) {
            let (x, y) = data;
            if let Ok(r) = fit_uncensored(&x, &y) {
                // Σ(xᵢ · eᵢ) should be near zero (OLS normal equation)
                let dot: f64 = x.iter().zip(r.residuals.iter()).map(|(&xi, &ei)| xi * ei).sum();
                let norm = r.residuals.iter().map(|e| e * e).sum::<f64>().sqrt();
                let x_norm = x.iter().map(|xi| xi * xi).sum::<f64>().sqrt();
                if norm > 1e-10 && x_norm > 1e-10 {
                    prop_assert!((dot / (norm * x_norm)).abs() < 1e-6,
                        "residuals not orthogonal to x: dot={dot}");
                }
            }
        }
    }
}
