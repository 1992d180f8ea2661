//! Data preparation: censoring filter followed by the optional Box-Cox
//! transform.
//!
//! Everything downstream works in transformed space. The detection value is
//! always taken from [`PreparedData::detection`], which equals the raw value
//! when no transform is requested.

use tracing::debug;

use crate::censoring::{censor_filter, CensoredSplit, Thresholds};
use crate::error::{PodError, Result};
use crate::sample::{SamplePair, MIN_SAMPLE_SIZE};
use crate::transform::{fit_box_cox, BoxCoxSpec, BoxCoxTransform};

/// A sample ready for regression.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    /// In-range points (signals transformed) and censored defect subsets.
    pub split: CensoredSplit,
    /// Detection threshold in transformed space.
    pub detection: f64,
    /// Censoring thresholds in transformed space.
    pub thresholds: Thresholds,
    /// The transform applied, if any.
    pub transform: Option<BoxCoxTransform>,
}

impl PreparedData {
    pub fn defects(&self) -> &[f64] {
        &self.split.defects
    }

    pub fn signals(&self) -> &[f64] {
        &self.split.signals
    }

    /// Fitted or fixed λ, `None` without a transform.
    pub fn lambda(&self) -> Option<f64> {
        self.transform.map(|t| t.lambda())
    }

    /// Largest in-range defect size.
    pub fn defect_max(&self) -> f64 {
        self.split
            .defects
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Censors `sample`, then fits or applies the Box-Cox transform.
///
/// λ is fitted on the in-range points only. The transform is applied to the
/// in-range signals, the detection value and every threshold that is set.
///
/// # Errors
///
/// - `NonFinite` for a non-finite detection value
/// - `InsufficientData` if fewer than three points remain in range
/// - `NonPositiveSignal` when a transformed value is not strictly positive
/// - `NotConverged` if the λ fit fails
///
/// # Examples
///
/// ```
/// use u_pod::censoring::Thresholds;
/// use u_pod::prepare::prepare;
/// use u_pod::transform::BoxCoxSpec;
/// use u_pod::SamplePair;
///
/// let sample = SamplePair::new(
///     vec![1.0, 2.0, 3.0, 4.0, 5.0],
///     vec![0.5, 3.0, 4.0, 6.0, 20.0],
/// ).unwrap();
/// let t = Thresholds::new(Some(1.0), Some(10.0)).unwrap();
/// let data = prepare(&sample, 5.0, &t, BoxCoxSpec::Disabled).unwrap();
/// assert_eq!(data.defects(), &[2.0, 3.0, 4.0]);
/// assert_eq!(data.split.noise_defects, vec![1.0]);
/// assert_eq!(data.split.saturation_defects, vec![5.0]);
/// assert_eq!(data.detection, 5.0);
/// ```
pub fn prepare(
    sample: &SamplePair,
    detection: f64,
    thresholds: &Thresholds,
    box_cox: BoxCoxSpec,
) -> Result<PreparedData> {
    if !detection.is_finite() {
        return Err(PodError::NonFinite);
    }
    let mut split = censor_filter(sample.defects(), sample.signals(), thresholds);
    if split.defects.len() < MIN_SAMPLE_SIZE {
        return Err(PodError::InsufficientData {
            got: split.defects.len(),
            min: MIN_SAMPLE_SIZE,
        });
    }

    let transform = match box_cox {
        BoxCoxSpec::Disabled => None,
        BoxCoxSpec::Fixed(lambda) => Some(BoxCoxTransform::new(lambda)?),
        BoxCoxSpec::Fitted => Some(fit_box_cox(&split.defects, &split.signals)?),
    };

    let Some(t) = transform else {
        return Ok(PreparedData {
            split,
            detection,
            thresholds: *thresholds,
            transform: None,
        });
    };

    split.signals = t.apply_all(&split.signals)?;
    let transformed = Thresholds {
        noise: thresholds.noise.map(|v| t.apply(v)).transpose()?,
        saturation: thresholds.saturation.map(|v| t.apply(v)).transpose()?,
    };
    let detection = t.apply(detection)?;
    debug!(lambda = t.lambda(), detection, "Box-Cox transform applied");

    Ok(PreparedData {
        split,
        detection,
        thresholds: transformed,
        transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SamplePair {
        let defects: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        let signals: Vec<f64> = defects
            .iter()
            .enumerate()
            .map(|(i, d)| (0.3 * d).exp() * if i % 2 == 0 { 1.05 } else { 0.95 })
            .collect();
        SamplePair::new(defects, signals).expect("valid")
    }

    #[test]
    fn untransformed_keeps_raw_values() {
        let s = sample();
        let data = prepare(&s, 3.0, &Thresholds::none(), BoxCoxSpec::Disabled).expect("valid");
        assert_eq!(data.defects(), s.defects());
        assert_eq!(data.signals(), s.signals());
        assert_eq!(data.detection, 3.0);
        assert_eq!(data.lambda(), None);
        assert_eq!(data.defect_max(), 12.0);
    }

    #[test]
    fn fixed_lambda_transforms_everything_set() {
        let s = sample();
        let t = Thresholds::new(Some(1.2), None).expect("valid");
        let data = prepare(&s, 3.0, &t, BoxCoxSpec::Fixed(0.0)).expect("valid");
        assert_eq!(data.lambda(), Some(0.0));
        assert!((data.detection - 3.0_f64.ln()).abs() < 1e-12);
        assert!((data.thresholds.noise.expect("set") - 1.2_f64.ln()).abs() < 1e-12);
        assert_eq!(data.thresholds.saturation, None);
        for (raw, tr) in s.signals().iter().filter(|&&y| y >= 1.2).zip(data.signals()) {
            assert!((raw.ln() - tr).abs() < 1e-12);
        }
    }

    #[test]
    fn fitted_lambda_linearizes_exponential_growth() {
        let data = prepare(&sample(), 3.0, &Thresholds::none(), BoxCoxSpec::Fitted).expect("valid");
        let lambda = data.lambda().expect("fitted");
        assert!(lambda.abs() < 0.5, "lambda = {lambda}");
    }

    #[test]
    fn too_few_in_range_points() {
        let s = sample();
        let t = Thresholds::new(Some(100.0), None).expect("valid");
        let err = prepare(&s, 3.0, &t, BoxCoxSpec::Disabled).unwrap_err();
        assert!(matches!(err, PodError::InsufficientData { .. }));
    }

    #[test]
    fn non_positive_detection_with_transform() {
        let err = prepare(&sample(), -1.0, &Thresholds::none(), BoxCoxSpec::Fixed(0.5)).unwrap_err();
        assert_eq!(err, PodError::NonPositiveSignal);
    }
}
