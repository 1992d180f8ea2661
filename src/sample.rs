//! Paired (defect, signal) samples.
//!
//! A POD study observes, for each inspected specimen, the physical defect
//! size and the instrument signal. Both columns are one-dimensional; the
//! pairing is preserved through filtering and bootstrap resampling.

use rand::Rng;

use crate::error::{PodError, Result};

/// Minimum number of pairs for a one-dimensional linear regression with a
/// residual scale estimate (two coefficients plus one degree of freedom).
pub const MIN_SAMPLE_SIZE: usize = 3;

/// Ordered sequence of (defect, signal) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePair {
    defects: Vec<f64>,
    signals: Vec<f64>,
}

impl SamplePair {
    /// Builds a sample from two flat columns.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if the columns differ in length, `InsufficientData`
    /// if fewer than [`MIN_SAMPLE_SIZE`] pairs, `NonFinite` on NaN/inf.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_pod::SamplePair;
    ///
    /// let s = SamplePair::new(vec![1.0, 2.0, 3.0], vec![2.0, 4.1, 5.9]).unwrap();
    /// assert_eq!(s.len(), 3);
    /// assert_eq!(s.defect_max(), 3.0);
    /// ```
    pub fn new(defects: Vec<f64>, signals: Vec<f64>) -> Result<Self> {
        if defects.len() != signals.len() {
            return Err(PodError::LengthMismatch {
                defects: defects.len(),
                signals: signals.len(),
            });
        }
        if defects.len() < MIN_SAMPLE_SIZE {
            return Err(PodError::InsufficientData {
                got: defects.len(),
                min: MIN_SAMPLE_SIZE,
            });
        }
        if defects.iter().chain(signals.iter()).any(|v| !v.is_finite()) {
            return Err(PodError::NonFinite);
        }
        Ok(Self { defects, signals })
    }

    /// Builds a sample from row-oriented input and output samples, as
    /// produced by multi-dimensional experiment tables.
    ///
    /// Every row must hold exactly one value: POD is defined against a
    /// single defect parameter.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if any row is not one-dimensional, plus the
    /// errors of [`SamplePair::new`].
    pub fn from_rows(input: &[Vec<f64>], output: &[Vec<f64>]) -> Result<Self> {
        let defects = flatten_column(input)?;
        let signals = flatten_column(output)?;
        Self::new(defects, signals)
    }

    pub fn defects(&self) -> &[f64] {
        &self.defects
    }

    pub fn signals(&self) -> &[f64] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.defects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defects.is_empty()
    }

    /// Smallest observed defect size.
    pub fn defect_min(&self) -> f64 {
        self.defects.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest observed defect size.
    pub fn defect_max(&self) -> f64 {
        self.defects.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Draws `len()` pairs with replacement from the empirical joint
    /// distribution. Pairs are never split.
    pub fn resample<R: Rng + ?Sized>(&self, rng: &mut R) -> SamplePair {
        let n = self.len();
        let mut defects = Vec::with_capacity(n);
        let mut signals = Vec::with_capacity(n);
        for _ in 0..n {
            let i = rng.gen_range(0..n);
            defects.push(self.defects[i]);
            signals.push(self.signals[i]);
        }
        SamplePair { defects, signals }
    }
}

fn flatten_column(rows: &[Vec<f64>]) -> Result<Vec<f64>> {
    rows.iter()
        .map(|row| match row.as_slice() {
            [v] => Ok(*v),
            _ => Err(PodError::DimensionMismatch {
                expected: 1,
                found: row.len(),
            }),
        })
        .collect()
}
