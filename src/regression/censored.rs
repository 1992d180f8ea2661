//! Maximum-likelihood linear fit with noise- and saturation-censored points.

use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

use super::ols::LinearFit;
use crate::censoring::CensoredSplit;
use crate::error::{PodError, Result};
use crate::numerics::{nelder_mead_maximize, NelderMeadOptions};

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Log-likelihood of (intercept, slope, σ) under Gaussian errors with
/// left- and right-censoring.
///
/// ```text
/// ℓ = Σ_in  [−ln√(2π) − ln σ − ½((yᵢ − μᵢ)/σ)²]
///   + Σ_noise ln Φ((noise − μᵢ)/σ)
///   + Σ_sat   ln(1 − Φ((sat − μᵢ)/σ))
/// ```
///
/// with μᵢ = intercept + slope · defectᵢ. Returns −∞ for σ ≤ 0.
pub fn censored_log_likelihood(
    intercept: f64,
    slope: f64,
    sigma: f64,
    split: &CensoredSplit,
    noise: Option<f64>,
    saturation: Option<f64>,
) -> f64 {
    if !(sigma.is_finite() && sigma > 0.0) {
        return f64::NEG_INFINITY;
    }
    let std_normal = Normal::standard();
    let ln_sigma = sigma.ln();

    let mut ll: f64 = split
        .defects
        .iter()
        .zip(split.signals.iter())
        .map(|(&d, &y)| {
            let z = (y - intercept - slope * d) / sigma;
            -LN_SQRT_2PI - ln_sigma - 0.5 * z * z
        })
        .sum();

    if let Some(lo) = noise {
        ll += split
            .noise_defects
            .iter()
            .map(|&d| floor_ln(std_normal.cdf((lo - intercept - slope * d) / sigma)))
            .sum::<f64>();
    }
    if let Some(hi) = saturation {
        ll += split
            .saturation_defects
            .iter()
            .map(|&d| floor_ln(std_normal.sf((hi - intercept - slope * d) / sigma)))
            .sum::<f64>();
    }
    ll
}

fn floor_ln(p: f64) -> f64 {
    p.max(f64::MIN_POSITIVE).ln()
}

/// Fits the censored linear model by maximum likelihood.
///
/// # Algorithm
///
/// Nelder-Mead maximization of [`censored_log_likelihood`] over
/// (β₀, β₁, ln σ), seeded at the uncensored OLS fit. If the simplex does
/// not converge, the search is restarted once from a perturbed start.
/// Residuals are `signal − (β₀ + β₁·defect)` over the in-range points.
///
/// `noise` and `saturation` must already be in the (possibly Box-Cox
/// transformed) signal space of `split.signals`.
///
/// # Errors
///
/// `NotConverged` if both attempts fail.
pub fn fit_censored(
    initial: &LinearFit,
    split: &CensoredSplit,
    noise: Option<f64>,
    saturation: Option<f64>,
) -> Result<LinearFit> {
    let sigma0 = if initial.stderr > 0.0 && initial.stderr.is_finite() {
        initial.stderr
    } else {
        1.0
    };
    let objective = |p: &[f64]| {
        censored_log_likelihood(p[0], p[1], p[2].exp(), split, noise, saturation)
    };
    let start = [initial.intercept, initial.slope, sigma0.ln()];
    let options = NelderMeadOptions::default();

    let best = match nelder_mead_maximize(objective, &start, options) {
        Ok(m) => m,
        Err(PodError::NotConverged { .. }) => {
            warn!("censored MLE did not converge, retrying from a perturbed start");
            let perturbed = [
                initial.intercept + 0.1 * sigma0,
                initial.slope * 1.1,
                sigma0.ln() + 0.1,
            ];
            nelder_mead_maximize(objective, &perturbed, options).map_err(|_| {
                PodError::NotConverged {
                    what: "censored MLE",
                    iterations: 2 * options.max_iter,
                }
            })?
        }
        Err(e) => return Err(e),
    };

    let (intercept, slope, stderr) = (best.point[0], best.point[1], best.point[2].exp());
    let residuals = split
        .defects
        .iter()
        .zip(split.signals.iter())
        .map(|(&d, &y)| y - (intercept + slope * d))
        .collect();

    debug!(
        intercept,
        slope,
        stderr,
        noise_censored = split.noise_defects.len(),
        saturation_censored = split.saturation_defects.len(),
        "censored MLE fit"
    );

    Ok(LinearFit {
        intercept,
        slope,
        stderr,
        residuals,
    })
}
