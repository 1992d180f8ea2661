//! Censoring thresholds and the censoring filter.
//!
//! Signals below the noise floor or above the saturation ceiling are only
//! known to lie beyond that threshold. They are removed from ordinary
//! regression and kept, by defect size, for the censored likelihood.

use crate::error::{PodError, Result};

/// Optional low (noise) and high (saturation) signal cut-offs.
///
/// An absent threshold censors nothing on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thresholds {
    pub noise: Option<f64>,
    pub saturation: Option<f64>,
}

impl Thresholds {
    /// No censoring on either side.
    pub fn none() -> Self {
        Self::default()
    }

    /// Validated thresholds.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for non-finite values or `noise >= saturation`.
    pub fn new(noise: Option<f64>, saturation: Option<f64>) -> Result<Self> {
        for (name, value) in [("noise threshold", noise), ("saturation threshold", saturation)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(PodError::InvalidParameter { name, value: v });
                }
            }
        }
        if let (Some(lo), Some(hi)) = (noise, saturation) {
            if lo >= hi {
                return Err(PodError::InvalidParameter {
                    name: "saturation threshold",
                    value: hi,
                });
            }
        }
        Ok(Self { noise, saturation })
    }

    /// Censoring is enabled as soon as either threshold is set.
    pub fn is_censored(&self) -> bool {
        self.noise.is_some() || self.saturation.is_some()
    }
}

/// Sample partitioned by the censoring filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CensoredSplit {
    /// Defects of in-range points.
    pub defects: Vec<f64>,
    /// Signals of in-range points.
    pub signals: Vec<f64>,
    /// Defects whose signal fell below the noise threshold.
    pub noise_defects: Vec<f64>,
    /// Defects whose signal rose above the saturation threshold.
    pub saturation_defects: Vec<f64>,
}

/// Partitions paired data by the censoring thresholds.
///
/// A point exactly on a threshold is in range.
///
/// # Examples
///
/// ```
/// use u_pod::censoring::{censor_filter, Thresholds};
///
/// let t = Thresholds::new(Some(1.0), Some(10.0)).unwrap();
/// let split = censor_filter(&[0.1, 0.5, 0.9], &[0.5, 4.0, 12.0], &t);
/// assert_eq!(split.defects, vec![0.5]);
/// assert_eq!(split.noise_defects, vec![0.1]);
/// assert_eq!(split.saturation_defects, vec![0.9]);
/// ```
pub fn censor_filter(defects: &[f64], signals: &[f64], thresholds: &Thresholds) -> CensoredSplit {
    let mut split = CensoredSplit::default();
    for (&d, &y) in defects.iter().zip(signals.iter()) {
        match (thresholds.noise, thresholds.saturation) {
            (Some(lo), _) if y < lo => split.noise_defects.push(d),
            (_, Some(hi)) if y > hi => split.saturation_defects.push(d),
            _ => {
                split.defects.push(d);
                split.signals.push(y);
            }
        }
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_validation() {
        assert!(Thresholds::new(Some(1.0), Some(2.0)).is_ok());
        assert!(Thresholds::new(Some(2.0), Some(1.0)).is_err());
        assert!(Thresholds::new(Some(f64::NAN), None).is_err());
        assert!(Thresholds::new(None, Some(f64::INFINITY)).is_err());
    }

    #[test]
    fn censoring_flag() {
        assert!(!Thresholds::none().is_censored());
        assert!(Thresholds::new(Some(1.0), None).expect("valid").is_censored());
        assert!(Thresholds::new(None, Some(1.0)).expect("valid").is_censored());
    }

    #[test]
    fn one_sided_noise() {
        let t = Thresholds::new(Some(2.0), None).expect("valid");
        let split = censor_filter(&[1.0, 2.0, 3.0], &[1.5, 2.0, 100.0], &t);
        assert_eq!(split.noise_defects, vec![1.0]);
        assert!(split.saturation_defects.is_empty());
        assert_eq!(split.defects, vec![2.0, 3.0]);
        assert_eq!(split.signals, vec![2.0, 100.0]);
    }

    #[test]
    fn one_sided_saturation() {
        let t = Thresholds::new(None, Some(5.0)).expect("valid");
        let split = censor_filter(&[1.0, 2.0, 3.0], &[-10.0, 5.0, 6.0], &t);
        assert!(split.noise_defects.is_empty());
        assert_eq!(split.saturation_defects, vec![3.0]);
        assert_eq!(split.defects, vec![1.0, 2.0]);
    }

    #[test]
    fn no_thresholds_keeps_everything() {
        let split = censor_filter(&[1.0, 2.0], &[-1e300, 1e300], &Thresholds::none());
        assert_eq!(split.defects.len(), 2);
        assert!(split.noise_defects.is_empty() && split.saturation_defects.is_empty());
    }
}
