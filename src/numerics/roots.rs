//! Brent's bracketed root finder.

use crate::error::{PodError, Result};

const MAX_ITER: usize = 500;

/// Absolute tolerance on the abscissa.
const X_TOL: f64 = 1e-12;

/// Finds `x` in `[lower, upper]` with `f(x) == target`.
///
/// # Algorithm
///
/// Brent's method on g(x) = f(x) − target: inverse quadratic interpolation
/// and secant steps, falling back to bisection whenever a step leaves the
/// bracket or converges too slowly. Convergence is guaranteed once g
/// changes sign over the bracket. For a step function the result is the
/// jump location.
///
/// # Errors
///
/// `NoSolutionInRange` if g has the same sign at both ends (or is NaN
/// there), `InvalidParameter` for an empty or non-finite bracket.
///
/// # Examples
///
/// ```
/// use u_pod::numerics::brent_root;
///
/// let x = brent_root(|x| x * x, 2.0, 0.0, 2.0).unwrap();
/// assert!((x - 2.0_f64.sqrt()).abs() < 1e-10);
/// assert!(brent_root(|x| x * x, 9.0, 0.0, 2.0).is_err());
/// ```
pub fn brent_root<F>(f: F, target: f64, lower: f64, upper: f64) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    if !lower.is_finite() || !upper.is_finite() || lower > upper {
        return Err(PodError::InvalidParameter {
            name: "root bracket",
            value: upper - lower,
        });
    }
    let g = |x: f64| f(x) - target;
    let no_solution = PodError::NoSolutionInRange {
        target,
        lower,
        upper,
    };

    let mut a = lower;
    let mut b = upper;
    let mut fa = g(a);
    let mut fb = g(b);
    if fa.is_nan() || fb.is_nan() {
        return Err(no_solution);
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(no_solution);
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_ITER {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * X_TOL;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q0 = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q0 * (q0 - r) - (b - a) * (r - 1.0)),
                    (q0 - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(xm) };
        fb = g(b);
        if fb.is_nan() {
            return Err(no_solution);
        }
    }

    Err(PodError::NotConverged {
        what: "Brent root finder",
        iterations: MAX_ITER,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_root() {
        let x = brent_root(|x| 2.0 + 3.0 * x, 20.0, 0.0, 10.0).expect("root");
        assert!((x - 6.0).abs() < 1e-10, "x = {x}");
    }

    #[test]
    fn decreasing_function() {
        let x = brent_root(|x| (-x).exp(), 0.5, 0.0, 5.0).expect("root");
        assert!((x - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn root_at_endpoint() {
        assert_eq!(brent_root(|x| x, 0.0, 0.0, 1.0), Ok(0.0));
        assert_eq!(brent_root(|x| x, 1.0, 0.0, 1.0), Ok(1.0));
    }

    #[test]
    fn step_function_finds_jump() {
        let x = brent_root(|x| if x < 1.5 { 0.0 } else { 1.0 }, 0.5, 0.0, 4.0).expect("jump");
        assert!((x - 1.5).abs() < 1e-9, "x = {x}");
    }

    #[test]
    fn no_sign_change() {
        let err = brent_root(|x| x, 5.0, 0.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            PodError::NoSolutionInRange {
                target: 5.0,
                lower: 0.0,
                upper: 1.0
            }
        );
    }

    #[test]
    fn invalid_bracket() {
        assert!(matches!(
            brent_root(|x| x, 0.5, 1.0, 0.0),
            Err(PodError::InvalidParameter { .. })
        ));
        assert!(brent_root(|x| x, 0.5, 0.0, f64::INFINITY).is_err());
    }
}
