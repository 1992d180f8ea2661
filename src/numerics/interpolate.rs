//! Piecewise-linear interpolation with clamped extrapolation.

use crate::error::{PodError, Result};

/// Piecewise-linear interpolant through `(x, y)` knots.
///
/// Outside the knot range the first or last `y` is returned, so the
/// anchors of a curve are reproduced exactly at and beyond its ends.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearInterpolator {
    /// Builds the interpolant.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` when the columns differ, `InsufficientData` with
    /// fewer than two knots, `NonFinite` on NaN/inf, `InvalidParameter` if
    /// `xs` decreases anywhere.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_pod::numerics::LinearInterpolator;
    ///
    /// let f = LinearInterpolator::new(vec![0.0, 2.0, 4.0], vec![0.0, 0.5, 0.9]).unwrap();
    /// assert_eq!(f.evaluate(1.0), 0.25);
    /// assert_eq!(f.evaluate(10.0), 0.9);
    /// ```
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(PodError::LengthMismatch {
                defects: xs.len(),
                signals: ys.len(),
            });
        }
        if xs.len() < 2 {
            return Err(PodError::InsufficientData {
                got: xs.len(),
                min: 2,
            });
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(PodError::NonFinite);
        }
        if let Some(w) = xs.windows(2).find(|w| w[1] < w[0]) {
            return Err(PodError::InvalidParameter {
                name: "interpolation knots",
                value: w[1],
            });
        }
        Ok(Self { xs, ys })
    }

    pub fn knots(&self) -> (&[f64], &[f64]) {
        (&self.xs, &self.ys)
    }

    /// Interpolated value at `x`; NaN for a NaN `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let last = self.xs.len() - 1;
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[last] {
            return self.ys[last];
        }
        // xs[i - 1] <= x < xs[i]
        let i = self.xs.partition_point(|&v| v <= x);
        let (x0, x1) = (self.xs[i - 1], self.xs[i]);
        let (y0, y1) = (self.ys[i - 1], self.ys[i]);
        if x1 == x0 {
            return y1;
        }
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_knots() {
        let f = LinearInterpolator::new(vec![0.0, 1.0, 3.0], vec![0.0, 0.2, 1.0]).expect("valid");
        assert!((f.evaluate(0.5) - 0.1).abs() < 1e-12);
        assert!((f.evaluate(2.0) - 0.6).abs() < 1e-12);
        assert_eq!(f.evaluate(1.0), 0.2);
    }

    #[test]
    fn clamps_outside_range() {
        let f = LinearInterpolator::new(vec![0.0, 1.0], vec![0.0, 0.95]).expect("valid");
        assert_eq!(f.evaluate(-3.0), 0.0);
        assert_eq!(f.evaluate(0.0), 0.0);
        assert_eq!(f.evaluate(1.0), 0.95);
        assert_eq!(f.evaluate(7.0), 0.95);
    }

    #[test]
    fn duplicate_knots_are_a_jump() {
        let f = LinearInterpolator::new(vec![0.0, 1.0, 1.0, 2.0], vec![0.0, 0.3, 0.6, 1.0])
            .expect("valid");
        assert!((f.evaluate(0.999_999) - 0.3).abs() < 1e-5);
        assert!((f.evaluate(1.5) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn nan_input_propagates() {
        let f = LinearInterpolator::new(vec![0.0, 1.0], vec![0.0, 1.0]).expect("valid");
        assert!(f.evaluate(f64::NAN).is_nan());
        assert_eq!(f.evaluate(f64::INFINITY), 1.0);
        assert_eq!(f.evaluate(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn rejects_bad_knots() {
        assert!(LinearInterpolator::new(vec![0.0], vec![0.0]).is_err());
        assert!(LinearInterpolator::new(vec![0.0, 1.0], vec![0.0]).is_err());
        assert!(LinearInterpolator::new(vec![1.0, 0.0], vec![0.0, 1.0]).is_err());
        assert!(LinearInterpolator::new(vec![0.0, f64::NAN], vec![0.0, 1.0]).is_err());
    }
}
