//! Empirical quantiles of samples and of sample columns.

/// Quantile of `values` at probability `p`, interpolating linearly between
/// order statistics (rank = p·(n−1)).
///
/// # Returns
///
/// `None` if `values` is empty, contains NaN, or `p` is outside [0, 1].
///
/// # Examples
///
/// ```
/// use u_pod::numerics::empirical_quantile;
///
/// let v = [4.0, 1.0, 3.0, 2.0, 5.0];
/// assert_eq!(empirical_quantile(&v, 0.5), Some(3.0));
/// assert_eq!(empirical_quantile(&v, 0.0), Some(1.0));
/// assert_eq!(empirical_quantile(&v, 0.125), Some(1.5));
/// ```
pub fn empirical_quantile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&p) || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted_quantile(&sorted, p))
}

/// Quantile of an already sorted slice. `sorted` must be non-empty.
pub(crate) fn sorted_quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let fraction = rank - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Per-column quantile of a row-major table (every row the same width).
///
/// # Returns
///
/// `None` if there are no rows, the rows are ragged, or any column quantile
/// is undefined.
pub fn column_quantiles(rows: &[Vec<f64>], p: f64) -> Option<Vec<f64>> {
    let width = rows.first()?.len();
    if rows.iter().any(|r| r.len() != width) {
        return None;
    }
    (0..width)
        .map(|j| {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            empirical_quantile(&column, p)
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn quantile_monotone_in_p(
            data in proptest::collection::vec(-1e3_f64..1e3, 1..=50),
            p1 in 0.0_f64..=1.0,
            p2 in 0.0_f64..=1.0,
        ) {
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            let qlo = empirical_quantile(&data, lo).expect("defined");
            let qhi = empirical_quantile(&data, hi).expect("defined");
            prop_assert!(qlo <= qhi + 1e-9, "q({lo}) = {qlo} > q({hi}) = {qhi}");
        }

        #[test]
        fn quantile_within_range(
            data in proptest::collection::vec(-1e3_f64..1e3, 1..=50),
            p in 0.0_f64..=1.0,
        ) {
            let q = empirical_quantile(&data, p).expect("defined");
            let min = data.iter().copied().fold(f64::INFINITY, f64::min);
            let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(q >= min - 1e-9 && q <= max + 1e-9);
        }
    }
}
