//! Linear quantile regression and its inversion to a defect size.

use tracing::debug;

use super::ols::ols_line;
use crate::error::{check_open_unit, PodError, Result};
use crate::numerics::brent_root;

/// Smallest |residual| used in the IRLS weights.
const RESIDUAL_FLOOR: f64 = 1e-6;

/// Controls for the IRLS quantile-regression solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantRegOptions {
    /// Maximum reweighting iterations.
    pub max_iter: usize,
    /// Stop once no coefficient moves by more than this.
    pub p_tol: f64,
}

impl Default for QuantRegOptions {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            p_tol: 1e-6,
        }
    }
}

/// Fitted quantile line: signal quantile τ at a defect = intercept + slope · defect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPredictor {
    pub intercept: f64,
    pub slope: f64,
    /// Conditional quantile of the signal this line estimates.
    pub tau: f64,
}

impl LinearPredictor {
    pub fn predict(&self, defect: f64) -> f64 {
        self.intercept + self.slope * defect
    }
}

/// Linear quantile regression of `y` on [1, x] at quantile `tau`.
///
/// # Algorithm
///
/// Iteratively reweighted least squares on the pinball loss
/// ρ_τ(r) = r·(τ − 1{r < 0}): each pass solves a weighted least-squares
/// problem with wᵢ = τ/|rᵢ| for rᵢ ≥ 0 and (1 − τ)/|rᵢ| for rᵢ < 0,
/// |rᵢ| floored at 1e-6. Starts from the OLS line; stops when no
/// coefficient moves by more than `p_tol`. Hitting `max_iter` keeps the
/// last iterate, which is already close to the LP optimum.
///
/// # Errors
///
/// `InvalidParameter` unless 0 < τ < 1, plus the OLS input errors.
///
/// # Examples
///
/// ```
/// use u_pod::regression::{quantile_regression, QuantRegOptions};
///
/// let x: Vec<f64> = (0..20).map(f64::from).collect();
/// let y: Vec<f64> = x.iter().map(|v| 1.0 + 2.0 * v).collect();
/// let line = quantile_regression(&x, &y, 0.5, QuantRegOptions::default()).unwrap();
/// assert!((line.slope - 2.0).abs() < 1e-4);
/// ```
pub fn quantile_regression(
    x: &[f64],
    y: &[f64],
    tau: f64,
    options: QuantRegOptions,
) -> Result<LinearPredictor> {
    check_open_unit("quantile", tau)?;
    let (mut intercept, mut slope) = ols_line(x, y)?;
    let mut iterations = 0;

    while iterations < options.max_iter {
        iterations += 1;
        let (mut s0, mut s1, mut s2, mut t0, mut t1) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (&xi, &yi) in x.iter().zip(y.iter()) {
            let r = yi - intercept - slope * xi;
            let scale = if r >= 0.0 { tau } else { 1.0 - tau };
            let w = scale / r.abs().max(RESIDUAL_FLOOR);
            s0 += w;
            s1 += w * xi;
            s2 += w * xi * xi;
            t0 += w * yi;
            t1 += w * xi * yi;
        }
        let det = s0 * s2 - s1 * s1;
        if !det.is_finite() || det <= 1e-14 * s0 * s2 {
            return Err(PodError::SingularDesign);
        }
        let new_slope = (s0 * t1 - s1 * t0) / det;
        let new_intercept = (t0 - new_slope * s1) / s0;
        let diff = (new_slope - slope).abs().max((new_intercept - intercept).abs());
        slope = new_slope;
        intercept = new_intercept;
        if diff <= options.p_tol {
            break;
        }
    }

    if iterations == options.max_iter {
        debug!(tau, iterations, "quantile regression stopped at the iteration limit");
    }

    Ok(LinearPredictor {
        intercept,
        slope,
        tau,
    })
}

/// Fits the quantile line whose crossing with the detection threshold gives
/// the defect size at POD = `prob_level`.
///
/// POD(a) ≥ p means P(signal ≥ detection | a) ≥ p, so the relevant line is
/// the conditional quantile of the signal at τ = 1 − p.
pub fn fit_quantile(
    defects: &[f64],
    signals: &[f64],
    prob_level: f64,
    options: QuantRegOptions,
) -> Result<LinearPredictor> {
    check_open_unit("probability level", prob_level)?;
    quantile_regression(defects, signals, 1.0 - prob_level, options)
}

/// Defect size in `bounds` where the quantile line reaches `detection`.
///
/// The line must increase with defect size over the bracket; a flat or
/// decreasing line has no meaningful crossing and is rejected rather than
/// solved.
///
/// # Errors
///
/// `NonMonotoneFit` for a non-increasing line, `NoSolutionInRange` if the
/// crossing lies outside `bounds`.
pub fn invert_to_defect_size(
    predictor: &LinearPredictor,
    detection: f64,
    bounds: (f64, f64),
    level: f64,
) -> Result<f64> {
    let (lower, upper) = bounds;
    let rise = predictor.slope * (upper - lower);
    let scale = 1.0 + predictor.intercept.abs() + detection.abs();
    if rise.is_nan() || rise <= 1e-12 * scale {
        return Err(PodError::NonMonotoneFit {
            level,
            slope: predictor.slope,
        });
    }
    brent_root(|a| predictor.predict(a), detection, lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<f64>, Vec<f64>) {
        // y = 1 + 2x + e with e cycling through -2..=2 at every x
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            for e in [-2.0, -1.0, 0.0, 1.0, 2.0] {
                let xi = i as f64 * 0.5;
                x.push(xi);
                y.push(1.0 + 2.0 * xi + e);
            }
        }
        (x, y)
    }

    #[test]
    fn median_line() {
        let (x, y) = data();
        let line = quantile_regression(&x, &y, 0.5, QuantRegOptions::default()).expect("fit");
        assert!((line.slope - 2.0).abs() < 1e-3, "slope = {}", line.slope);
        assert!((line.intercept - 1.0).abs() < 1e-2, "intercept = {}", line.intercept);
    }

    #[test]
    fn upper_quantile_shifts_up() {
        let (x, y) = data();
        let opts = QuantRegOptions::default();
        let q10 = quantile_regression(&x, &y, 0.1, opts).expect("fit");
        let q90 = quantile_regression(&x, &y, 0.9, opts).expect("fit");
        assert!(q90.predict(5.0) > q10.predict(5.0));
        // 90% of residuals at or below +2, 10% at or below -2
        assert!((q90.predict(5.0) - 13.0).abs() < 0.1, "{}", q90.predict(5.0));
        assert!((q10.predict(5.0) - 9.0).abs() < 0.1, "{}", q10.predict(5.0));
    }

    #[test]
    fn pinball_loss_not_worse_than_ols() {
        let (x, y) = data();
        let tau = 0.75;
        let line = quantile_regression(&x, &y, tau, QuantRegOptions::default()).expect("fit");
        let (a, b) = ols_line(&x, &y).expect("ols");
        let loss = |a: f64, b: f64| -> f64 {
            x.iter()
                .zip(&y)
                .map(|(&xi, &yi)| {
                    let r = yi - a - b * xi;
                    r * (tau - if r < 0.0 { 1.0 } else { 0.0 })
                })
                .sum()
        };
        assert!(loss(line.intercept, line.slope) <= loss(a, b) + 1e-9);
    }

    #[test]
    fn fit_quantile_uses_exceedance() {
        let (x, y) = data();
        let opts = QuantRegOptions::default();
        let pod90 = fit_quantile(&x, &y, 0.9, opts).expect("fit");
        assert!((pod90.tau - 0.1).abs() < 1e-12);
    }

    #[test]
    fn invalid_levels() {
        let (x, y) = data();
        let opts = QuantRegOptions::default();
        assert!(quantile_regression(&x, &y, 0.0, opts).is_err());
        assert!(quantile_regression(&x, &y, 1.0, opts).is_err());
        assert!(fit_quantile(&x, &y, 1.2, opts).is_err());
    }

    #[test]
    fn inversion_finds_crossing() {
        let line = LinearPredictor {
            intercept: 2.0,
            slope: 3.0,
            tau: 0.5,
        };
        let a = invert_to_defect_size(&line, 20.0, (0.0, 10.0), 0.5).expect("root");
        assert!((a - 6.0).abs() < 1e-10);
    }

    #[test]
    fn inversion_rejects_flat_or_decreasing_line() {
        let flat = LinearPredictor {
            intercept: 20.0,
            slope: 0.0,
            tau: 0.5,
        };
        assert!(matches!(
            invert_to_defect_size(&flat, 20.0, (0.0, 10.0), 0.5),
            Err(PodError::NonMonotoneFit { .. })
        ));
        let decreasing = LinearPredictor {
            intercept: 30.0,
            slope: -1.0,
            tau: 0.5,
        };
        assert!(matches!(
            invert_to_defect_size(&decreasing, 25.0, (0.0, 10.0), 0.5),
            Err(PodError::NonMonotoneFit { .. })
        ));
    }

    #[test]
    fn inversion_outside_bracket() {
        let line = LinearPredictor {
            intercept: 2.0,
            slope: 1.0,
            tau: 0.5,
        };
        assert!(matches!(
            invert_to_defect_size(&line, 50.0, (0.0, 10.0), 0.5),
            Err(PodError::NoSolutionInRange { .. })
        ));
    }
}
