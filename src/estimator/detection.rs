use std::fmt;

use crate::error::{check_open_unit, Result};
use crate::numerics::brent_root;
use crate::pod::PodCurve;

/// Detection sizes a_p and, when a confidence level was given, a_p/c.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSize {
    pub probability: f64,
    pub confidence: Option<f64>,
    /// Defect size at which the POD curve reaches `probability`.
    pub a_p: f64,
    /// Defect size at which the confidence curve reaches `probability`.
    pub a_p_cl: Option<f64>,
}

impl DetectionSize {
    /// Label of the point estimate, e.g. `a90`.
    pub fn label(&self) -> String {
        format!("a{}", percent(self.probability))
    }

    /// Label of the confidence estimate, e.g. `a90/95`.
    pub fn confidence_label(&self) -> Option<String> {
        self.confidence
            .map(|c| format!("a{}/{}", percent(self.probability), percent(c)))
    }
}

impl fmt::Display for DetectionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.label(), self.a_p)?;
        if let (Some(label), Some(value)) = (self.confidence_label(), self.a_p_cl) {
            write!(f, ", {label} = {value}")?;
        }
        Ok(())
    }
}

fn percent(p: f64) -> u32 {
    (p * 100.0).round() as u32
}

const PLATEAU_ITER: usize = 200;

/// Smallest defect size in `[lower, upper]` where `curve` reaches
/// `probability`.
///
/// The crossing is bracketed with [`brent_root`]. When the root lands on a
/// stretch where the curve equals `probability` exactly (an interpolated
/// curve capped at its top level, or an empirical curve at k/n), the left
/// end of that stretch is located by bisection on `curve(a) >= probability`.
pub(crate) fn solve_curve<C: PodCurve + ?Sized>(
    curve: &C,
    probability: f64,
    (lower, upper): (f64, f64),
) -> Result<f64> {
    check_open_unit("probability level", probability)?;
    let root = brent_root(|a| curve.evaluate(a), probability, lower, upper)?;
    if curve.evaluate(root) != probability {
        return Ok(root);
    }
    if curve.evaluate(lower) >= probability {
        return Ok(lower);
    }
    let (mut lo, mut hi) = (lower, root);
    for _ in 0..PLATEAU_ITER {
        if hi - lo <= 1e-12 * (1.0 + hi.abs()) {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if curve.evaluate(mid) >= probability {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}
