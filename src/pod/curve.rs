use std::sync::Arc;

use super::binomial::binomial_confidence_bound;
use crate::distribution::{EmpiricalDistribution, ResidualDistribution, ResidualModel};
use crate::error::{check_open_unit, PodError, Result};
use crate::numerics::{empirical_quantile, LinearInterpolator};
use crate::regression::LinearFit;

/// A probability-of-detection curve.
pub trait PodCurve {
    /// POD at `defect`, in [0, 1]; NaN for a NaN `defect`.
    fn evaluate(&self, defect: f64) -> f64;

    /// Evaluates the curve on every point of `defects`.
    fn evaluate_many(&self, defects: &[f64]) -> Vec<f64> {
        defects.iter().map(|&d| self.evaluate(d)).collect()
    }
}

// ---------------------------------------------------------------------------
// Linear-model curves
// ---------------------------------------------------------------------------

/// POD(a) = P(ε > detection − (β₀ + β₁·a)) for a fitted linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPod {
    intercept: f64,
    slope: f64,
    detection: f64,
    residuals: ResidualModel,
}

impl LinearPod {
    pub fn new(intercept: f64, slope: f64, detection: f64, residuals: ResidualModel) -> Self {
        Self {
            intercept,
            slope,
            detection,
            residuals,
        }
    }

    /// Builds the curve from a regression fit, modelling its residuals with
    /// `distribution`.
    ///
    /// # Errors
    ///
    /// Propagates residual-model fitting failures.
    pub fn from_fit(fit: &LinearFit, detection: f64, distribution: ResidualDistribution) -> Result<Self> {
        let residuals = distribution.fit(&fit.residuals)?;
        Ok(Self::new(fit.intercept, fit.slope, detection, residuals))
    }

    pub fn residuals(&self) -> &ResidualModel {
        &self.residuals
    }

    fn threshold(&self, defect: f64) -> f64 {
        self.detection - (self.intercept + self.slope * defect)
    }
}

impl PodCurve for LinearPod {
    fn evaluate(&self, defect: f64) -> f64 {
        self.residuals.ccdf(self.threshold(defect))
    }
}

/// Berens-Binomial lower confidence bound on POD, computed point-wise from
/// the number of residuals exceeding the defect-dependent threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct BinomialConfidencePod {
    intercept: f64,
    slope: f64,
    detection: f64,
    residuals: EmpiricalDistribution,
    confidence: f64,
}

impl BinomialConfidencePod {
    /// # Errors
    ///
    /// `InvalidParameter` unless 0 < `confidence` < 1; residual errors from
    /// [`EmpiricalDistribution::new`].
    pub fn new(fit: &LinearFit, detection: f64, confidence: f64) -> Result<Self> {
        check_open_unit("confidence level", confidence)?;
        Ok(Self {
            intercept: fit.intercept,
            slope: fit.slope,
            detection,
            residuals: EmpiricalDistribution::new(&fit.residuals)?,
            confidence,
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl PodCurve for BinomialConfidencePod {
    fn evaluate(&self, defect: f64) -> f64 {
        let threshold = self.detection - (self.intercept + self.slope * defect);
        if threshold.is_nan() {
            return f64::NAN;
        }
        let k = self.residuals.exceedances(threshold);
        // Cannot fail: confidence is checked in `new`, size ≥ 1 and k ≤ size.
        binomial_confidence_bound(self.residuals.size(), k, self.confidence).unwrap_or(f64::NAN)
    }
}

/// Lower confidence curve over a bootstrap ensemble: at each defect size,
/// the (1 − confidence) empirical quantile of the member curves.
#[derive(Debug, Clone)]
pub struct EnsemblePod {
    members: Arc<[LinearPod]>,
    confidence: f64,
}

impl EnsemblePod {
    /// # Errors
    ///
    /// `InsufficientData` for an empty ensemble, `InvalidParameter` unless
    /// 0 < `confidence` < 1.
    pub fn new(members: Arc<[LinearPod]>, confidence: f64) -> Result<Self> {
        check_open_unit("confidence level", confidence)?;
        if members.is_empty() {
            return Err(PodError::InsufficientData { got: 0, min: 1 });
        }
        Ok(Self {
            members,
            confidence,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl PodCurve for EnsemblePod {
    fn evaluate(&self, defect: f64) -> f64 {
        let values: Vec<f64> = self.members.iter().map(|m| m.evaluate(defect)).collect();
        // None only when a member value is NaN.
        empirical_quantile(&values, 1.0 - self.confidence).unwrap_or(f64::NAN)
    }
}

// ---------------------------------------------------------------------------
// Interpolated curve
// ---------------------------------------------------------------------------

/// Piecewise-linear POD through (defect size, level) pairs, anchored at
/// (0, 0) and (a_max, max level) and constant outside [0, a_max].
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedPod {
    interpolator: LinearInterpolator,
}

impl InterpolatedPod {
    /// Builds the anchored curve.
    ///
    /// Defect sizes are clipped to [0, `defect_max`] and sorted, then paired
    /// with the sorted levels (monotone rearrangement), so the curve is
    /// non-decreasing even when inverted sizes cross.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if the slices differ in length, `InsufficientData`
    /// if they are empty, `NonFinite` on NaN/inf, `InvalidParameter` for a
    /// non-positive `defect_max`.
    pub fn anchored(defect_sizes: &[f64], levels: &[f64], defect_max: f64) -> Result<Self> {
        if defect_sizes.len() != levels.len() {
            return Err(PodError::LengthMismatch {
                defects: defect_sizes.len(),
                signals: levels.len(),
            });
        }
        if levels.is_empty() {
            return Err(PodError::InsufficientData { got: 0, min: 1 });
        }
        if defect_sizes.iter().chain(levels).any(|v| !v.is_finite()) {
            return Err(PodError::NonFinite);
        }
        if !defect_max.is_finite() || defect_max <= 0.0 {
            return Err(PodError::InvalidParameter {
                name: "maximum defect size",
                value: defect_max,
            });
        }

        let mut sizes: Vec<f64> = defect_sizes.iter().map(|d| d.clamp(0.0, defect_max)).collect();
        sizes.sort_by(f64::total_cmp);
        let mut ordered_levels = levels.to_vec();
        ordered_levels.sort_by(f64::total_cmp);
        let top = ordered_levels[ordered_levels.len() - 1];

        let mut xs = Vec::with_capacity(sizes.len() + 2);
        let mut ys = Vec::with_capacity(sizes.len() + 2);
        xs.push(0.0);
        ys.push(0.0);
        xs.extend(sizes);
        ys.extend(ordered_levels);
        xs.push(defect_max);
        ys.push(top);

        Ok(Self {
            interpolator: LinearInterpolator::new(xs, ys)?,
        })
    }

    /// Knot abscissae and ordinates, anchors included.
    pub fn knots(&self) -> (&[f64], &[f64]) {
        self.interpolator.knots()
    }
}

impl PodCurve for InterpolatedPod {
    fn evaluate(&self, defect: f64) -> f64 {
        self.interpolator.evaluate(defect)
    }
}

// ---------------------------------------------------------------------------
// Closed set of curves handed out by the estimators
// ---------------------------------------------------------------------------

/// Any POD curve produced by an estimator.
#[derive(Debug, Clone)]
pub enum PodModel {
    Linear(LinearPod),
    Binomial(BinomialConfidencePod),
    Ensemble(EnsemblePod),
    Interpolated(InterpolatedPod),
}

impl PodCurve for PodModel {
    fn evaluate(&self, defect: f64) -> f64 {
        match self {
            PodModel::Linear(c) => c.evaluate(defect),
            PodModel::Binomial(c) => c.evaluate(defect),
            PodModel::Ensemble(c) => c.evaluate(defect),
            PodModel::Interpolated(c) => c.evaluate(defect),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn anchored_curve_is_monotone_and_bounded(
            sizes in proptest::collection::vec(-2.0_f64..12.0, 1..15),
            dmax in 1.0_f64..10.0,
        ) {
            let n = sizes.len();
            let levels: Vec<f64> = (1..=n).map(|i| i as f64 / (n + 1) as f64).collect();
            let curve = InterpolatedPod::anchored(&sizes, &levels, dmax).expect("valid");
            let grid: Vec<f64> = (0..=130).map(|i| -1.0 + i as f64 * 0.1).collect();
            let v = curve.evaluate_many(&grid);
            for w in v.windows(2) {
                prop_assert!(w[0] <= w[1] + 1e-12);
            }
            prop_assert_eq!(curve.evaluate(0.0), 0.0);
            prop_assert_eq!(curve.evaluate(dmax), levels[n - 1]);
        }

        #[test]
        fn binomial_curve_is_monotone(
            residuals in proptest::collection::vec(-3.0_f64..3.0, 3..40),
            confidence in 0.5_f64..0.99,
        ) {
            let fit = LinearFit { intercept: 0.0, slope: 1.0, stderr: 1.0, residuals };
            let cl = BinomialConfidencePod::new(&fit, 0.0, confidence).expect("valid");
            let grid: Vec<f64> = (0..=80).map(|i| -4.0 + i as f64 * 0.1).collect();
            let v = cl.evaluate_many(&grid);
            for w in v.windows(2) {
                prop_assert!(w[0] <= w[1] + 1e-12);
            }
        }
    }
}
