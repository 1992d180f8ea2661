//! One-sided binomial tolerance bound used by the Berens-Binomial method.

use statrs::distribution::{Beta, ContinuousCDF};

use crate::error::{check_open_unit, PodError, Result};

/// Lower confidence bound on POD given `exceedances` of `size` residuals
/// above the defect-dependent threshold.
///
/// # Algorithm
///
/// With r = `size` and k = `exceedances`:
///
/// - k = r: POD_CL = c^(1/r)
/// - k < r: POD_CL = 1 − Beta⁻¹(r − k, k + 1; c)
///
/// where c is the confidence level and Beta⁻¹ the Beta quantile function.
///
/// # Errors
///
/// `InvalidParameter` unless 0 < c < 1 and k ≤ r, `InsufficientData` for r = 0.
///
/// # Examples
///
/// ```
/// use u_pod::pod::binomial_confidence_bound;
///
/// // 29 of 29 hits: the classic 29-point demonstration
/// let b = binomial_confidence_bound(29, 29, 0.95).unwrap();
/// assert!((b - 0.95_f64.powf(1.0 / 29.0)).abs() < 1e-15);
/// ```
pub fn binomial_confidence_bound(size: usize, exceedances: usize, confidence: f64) -> Result<f64> {
    check_open_unit("confidence level", confidence)?;
    if size == 0 {
        return Err(PodError::InsufficientData { got: 0, min: 1 });
    }
    if exceedances > size {
        return Err(PodError::InvalidParameter {
            name: "exceedance count",
            value: exceedances as f64,
        });
    }
    let r = size as f64;
    if exceedances == size {
        return Ok(confidence.powf(1.0 / r));
    }
    let k = exceedances as f64;
    let beta = Beta::new(r - k, k + 1.0).map_err(|_| PodError::InvalidParameter {
        name: "Beta shape",
        value: r - k,
    })?;
    Ok(1.0 - beta.inverse_cdf(confidence))
}
