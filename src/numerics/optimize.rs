//! Derivative-free maximizers for likelihood fitting.

use crate::error::{PodError, Result};

/// Location and value of a maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Maximum {
    /// Maximizing point.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Iterations used.
    pub iterations: usize,
}

// ---------------------------------------------------------------------------
// Golden-section search
// ---------------------------------------------------------------------------

const GOLDEN_MAX_ITER: usize = 200;

/// Maximizes a unimodal function on `[lower, upper]` by golden-section search.
///
/// The bracket shrinks by 1/φ per iteration; the search stops once its
/// width falls below `tol`.
///
/// # Errors
///
/// `InvalidParameter` for an empty bracket, `NotConverged` if the objective
/// is not finite at the located maximum.
///
/// # Examples
///
/// ```
/// use u_pod::numerics::golden_section_maximize;
///
/// let m = golden_section_maximize(|x| -(x - 0.7).powi(2), -3.0, 3.0, 1e-8).unwrap();
/// assert!((m.point[0] - 0.7).abs() < 1e-6);
/// ```
pub fn golden_section_maximize<F>(f: F, lower: f64, upper: f64, tol: f64) -> Result<Maximum>
where
    F: Fn(f64) -> f64,
{
    if !lower.is_finite() || !upper.is_finite() || lower >= upper {
        return Err(PodError::InvalidParameter {
            name: "search bracket",
            value: upper - lower,
        });
    }
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    // NaN compares as worst.
    let eval = |x: f64| {
        let v = f(x);
        if v.is_nan() {
            f64::NEG_INFINITY
        } else {
            v
        }
    };

    let (mut a, mut b) = (lower, upper);
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = eval(c);
    let mut fd = eval(d);
    let mut iterations = 0;

    while (b - a).abs() > tol && iterations < GOLDEN_MAX_ITER {
        iterations += 1;
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = eval(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = eval(d);
        }
    }

    let x = 0.5 * (a + b);
    let value = eval(x);
    if !value.is_finite() {
        return Err(PodError::NotConverged {
            what: "golden-section search",
            iterations,
        });
    }
    Ok(Maximum {
        point: vec![x],
        value,
        iterations,
    })
}

// ---------------------------------------------------------------------------
// Nelder-Mead simplex
// ---------------------------------------------------------------------------

/// Controls for [`nelder_mead_maximize`].
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadOptions {
    /// Maximum simplex iterations.
    pub max_iter: usize,
    /// Relative spread of objective values across the simplex at convergence.
    pub f_tol: f64,
    /// Relative spread of vertices at convergence.
    pub x_tol: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            f_tol: 1e-10,
            x_tol: 1e-8,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Maximizes `f` starting from `initial` with the Nelder-Mead simplex.
///
/// The initial simplex perturbs each coordinate by 5% (or 2.5e-4 for a zero
/// coordinate). Non-finite objective values are treated as −∞, so the
/// simplex retreats from infeasible regions.
///
/// # Errors
///
/// `NotConverged` if the tolerances are not met within `max_iter`
/// iterations, `InvalidParameter` for an empty starting point.
pub fn nelder_mead_maximize<F>(f: F, initial: &[f64], options: NelderMeadOptions) -> Result<Maximum>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = initial.len();
    if dim == 0 || initial.iter().any(|v| !v.is_finite()) {
        return Err(PodError::InvalidParameter {
            name: "simplex start",
            value: dim as f64,
        });
    }
    // Minimize the negated objective.
    let cost = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            -v
        } else {
            f64::INFINITY
        }
    };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(initial.to_vec());
    for i in 0..dim {
        let mut vertex = initial.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * 1.05
        } else {
            2.5e-4
        };
        simplex.push(vertex);
    }
    let mut costs: Vec<f64> = simplex.iter().map(|v| cost(v)).collect();

    for iter in 0..options.max_iter {
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&i, &j| costs[i].total_cmp(&costs[j]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        costs = order.iter().map(|&i| costs[i]).collect();

        let best = costs[0];
        let f_spread = costs[1..]
            .iter()
            .map(|c| (c - best).abs())
            .fold(0.0, f64::max);
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(simplex[0].iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let x_scale = 1.0 + simplex[0].iter().map(|v| v.abs()).fold(0.0, f64::max);
        if best.is_finite()
            && f_spread <= options.f_tol * (1.0 + best.abs())
            && x_spread <= options.x_tol * x_scale
        {
            return Ok(Maximum {
                point: simplex[0].clone(),
                value: -best,
                iterations: iter,
            });
        }

        let centroid: Vec<f64> = (0..dim)
            .map(|j| simplex[..dim].iter().map(|v| v[j]).sum::<f64>() / dim as f64)
            .collect();
        let toward = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(simplex[dim].iter())
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = toward(REFLECT);
        let reflected_cost = cost(&reflected);

        if reflected_cost < costs[0] {
            let expanded = toward(EXPAND);
            let expanded_cost = cost(&expanded);
            if expanded_cost < reflected_cost {
                simplex[dim] = expanded;
                costs[dim] = expanded_cost;
            } else {
                simplex[dim] = reflected;
                costs[dim] = reflected_cost;
            }
            continue;
        }
        if reflected_cost < costs[dim - 1] {
            simplex[dim] = reflected;
            costs[dim] = reflected_cost;
            continue;
        }

        let (contracted, contracted_cost) = if reflected_cost < costs[dim] {
            let outside = toward(CONTRACT * REFLECT);
            let c = cost(&outside);
            (outside, c)
        } else {
            let inside = toward(-CONTRACT);
            let c = cost(&inside);
            (inside, c)
        };
        if contracted_cost < costs[dim].min(reflected_cost) {
            simplex[dim] = contracted;
            costs[dim] = contracted_cost;
            continue;
        }

        let best_vertex = simplex[0].clone();
        for k in 1..=dim {
            for (x, b) in simplex[k].iter_mut().zip(best_vertex.iter()) {
                *x = b + SHRINK * (*x - b);
            }
            costs[k] = cost(&simplex[k]);
        }
    }

    Err(PodError::NotConverged {
        what: "Nelder-Mead",
        iterations: options.max_iter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_quadratic() {
        let m = golden_section_maximize(|x| 5.0 - (x + 1.25).powi(2), -3.0, 3.0, 1e-10)
            .expect("converges");
        assert!((m.point[0] + 1.25).abs() < 1e-6, "x = {}", m.point[0]);
        assert!((m.value - 5.0).abs() < 1e-10);
        assert!(m.iterations > 0);
    }

    #[test]
    fn golden_boundary_maximum() {
        // Monotone objective: maximum at the upper bracket edge.
        let m = golden_section_maximize(|x| x, 0.0, 1.0, 1e-9).expect("converges");
        assert!((m.point[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn golden_invalid_bracket() {
        assert!(golden_section_maximize(|x| x, 1.0, 1.0, 1e-6).is_err());
        assert!(golden_section_maximize(|x| x, 2.0, 1.0, 1e-6).is_err());
    }

    #[test]
    fn nelder_mead_quadratic_bowl() {
        let f = |x: &[f64]| -((x[0] - 1.0).powi(2) + 4.0 * (x[1] + 2.0).powi(2));
        let m = nelder_mead_maximize(f, &[0.0, 0.0], NelderMeadOptions::default())
            .expect("converges");
        assert!((m.point[0] - 1.0).abs() < 1e-4, "x0 = {}", m.point[0]);
        assert!((m.point[1] + 2.0).abs() < 1e-4, "x1 = {}", m.point[1]);
        assert!(m.value.abs() < 1e-8);
    }

    #[test]
    fn nelder_mead_rosenbrock() {
        let f = |x: &[f64]| -((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2));
        let m = nelder_mead_maximize(f, &[-1.2, 1.0], NelderMeadOptions::default())
            .expect("converges");
        assert!((m.point[0] - 1.0).abs() < 1e-3, "x0 = {}", m.point[0]);
        assert!((m.point[1] - 1.0).abs() < 1e-3, "x1 = {}", m.point[1]);
    }

    #[test]
    fn nelder_mead_avoids_infeasible_region() {
        // log-likelihood style objective undefined for x <= 0
        let f = |x: &[f64]| {
            if x[0] <= 0.0 {
                f64::NAN
            } else {
                -x[0] + 2.0 * x[0].ln()
            }
        };
        let m = nelder_mead_maximize(f, &[0.5], NelderMeadOptions::default()).expect("converges");
        assert!((m.point[0] - 2.0).abs() < 1e-4, "x = {}", m.point[0]);
    }

    #[test]
    fn nelder_mead_iteration_limit() {
        let f = |x: &[f64]| -((x[0] - 3.0).powi(2) + (x[1] - 3.0).powi(2));
        let options = NelderMeadOptions {
            max_iter: 2,
            ..Default::default()
        };
        assert!(matches!(
            nelder_mead_maximize(f, &[0.0, 0.0], options),
            Err(PodError::NotConverged { .. })
        ));
    }
}
