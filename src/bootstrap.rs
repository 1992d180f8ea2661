//! Bootstrap engine: refits a pipeline on resampled data.
//!
//! Each iteration draws a same-size resample of the (defect, signal) pairs
//! with replacement and hands it to a caller-supplied fit function. The
//! iterations share nothing but the input sample, so they run as a
//! rayon parallel map; iteration `i` seeds its own `StdRng` from
//! `(seed, i)`, which makes the ensemble independent of thread scheduling.
//!
//! # References
//!
//! Efron, B. & Tibshirani, R.J. (1993). *An Introduction to the Bootstrap*.
//! Chapman & Hall.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{PodError, Result};
use crate::sample::SamplePair;

/// Default number of bootstrap resamples.
pub const DEFAULT_SIMULATION_SIZE: usize = 100;

/// What to do when a single bootstrap fit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log a warning and drop the draw from the ensemble.
    #[default]
    Skip,
    /// Abort the whole run with the first failure.
    Strict,
}

/// Shared flag for stopping a bootstrap run between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bootstrap configuration
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Number of resamples (default: 100)
    pub simulation_size: usize,
    /// Base seed; `None` draws one from the thread RNG
    pub seed: Option<u64>,
    /// Whether to run iterations on the rayon pool
    pub parallel: bool,
    /// Handling of individual fit failures
    pub failure_policy: FailurePolicy,
    /// Minimum fraction of iterations that must succeed (default: 0.5)
    pub min_success_ratio: f64,
    /// Optional cancellation flag, checked before each iteration
    pub cancel: Option<CancelToken>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            simulation_size: DEFAULT_SIMULATION_SIZE,
            seed: None,
            parallel: true,
            failure_policy: FailurePolicy::Skip,
            min_success_ratio: 0.5,
            cancel: None,
        }
    }
}

impl BootstrapConfig {
    /// # Errors
    ///
    /// `InvalidParameter` for a zero simulation size or a success ratio
    /// outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.simulation_size == 0 {
            return Err(PodError::InvalidParameter {
                name: "simulation size",
                value: 0.0,
            });
        }
        if !(0.0..=1.0).contains(&self.min_success_ratio) {
            return Err(PodError::InvalidParameter {
                name: "minimum success ratio",
                value: self.min_success_ratio,
            });
        }
        Ok(())
    }

    fn required_successes(&self) -> usize {
        ((self.min_success_ratio * self.simulation_size as f64).ceil() as usize).max(1)
    }
}

/// Outcome counts of a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub skipped: usize,
}

/// Successful fits in iteration order, plus the run summary.
#[derive(Debug, Clone)]
pub struct BootstrapRun<T> {
    pub draws: Vec<T>,
    pub summary: BootstrapSummary,
}

enum Outcome<T> {
    Cancelled,
    Done(Result<T>),
}

/// Runs `fit` on `config.simulation_size` resamples of `sample`.
///
/// # Errors
///
/// - `InvalidParameter` for an invalid configuration
/// - the first fit error, under [`FailurePolicy::Strict`]
/// - `Interrupted` if the cancel token was set before every iteration ran
/// - `Bootstrap` when fewer than `min_success_ratio` of the fits succeed
///
/// # Examples
///
/// ```
/// use u_pod::bootstrap::{run_bootstrap, BootstrapConfig};
/// use u_pod::SamplePair;
///
/// let sample = SamplePair::new(vec![1.0, 2.0, 3.0, 4.0], vec![2.0, 4.1, 5.9, 8.0]).unwrap();
/// let config = BootstrapConfig { simulation_size: 20, seed: Some(7), ..Default::default() };
/// let run = run_bootstrap(&sample, &config, |draw| Ok(draw.len())).unwrap();
/// assert_eq!(run.draws, vec![4; 20]);
/// assert_eq!(run.summary.skipped, 0);
/// ```
pub fn run_bootstrap<T, F>(sample: &SamplePair, config: &BootstrapConfig, fit: F) -> Result<BootstrapRun<T>>
where
    T: Send,
    F: Fn(&SamplePair) -> Result<T> + Sync,
{
    config.validate()?;
    let total = config.simulation_size;
    let base_seed = config.seed.unwrap_or_else(|| thread_rng().gen());

    let iterate = |i: usize| -> Outcome<T> {
        if config.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Outcome::Cancelled;
        }
        let mut rng = StdRng::seed_from_u64(iteration_seed(base_seed, i));
        let draw = sample.resample(&mut rng);
        Outcome::Done(fit(&draw))
    };

    let outcomes: Vec<Outcome<T>> = if config.parallel {
        (0..total).into_par_iter().map(iterate).collect()
    } else {
        (0..total).map(iterate).collect()
    };

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Done(_)))
        .count();
    if completed < total {
        return Err(PodError::Interrupted { completed });
    }

    let mut draws = Vec::with_capacity(total);
    let mut skipped = 0;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::Done(Ok(value)) => draws.push(value),
            Outcome::Done(Err(e)) => match config.failure_policy {
                FailurePolicy::Strict => return Err(e),
                FailurePolicy::Skip => {
                    warn!(iteration = i, error = %e, "skipping failed bootstrap draw");
                    skipped += 1;
                }
            },
            Outcome::Cancelled => {}
        }
    }

    let succeeded = draws.len();
    if succeeded < config.required_successes() {
        return Err(PodError::Bootstrap { succeeded, total });
    }
    debug!(total, succeeded, skipped, seed = base_seed, "bootstrap finished");

    Ok(BootstrapRun {
        draws,
        summary: BootstrapSummary {
            requested: total,
            succeeded,
            skipped,
        },
    })
}

/// SplitMix64 finalizer over (seed, iteration).
fn iteration_seed(base: u64, iteration: usize) -> u64 {
    let mut z = base.wrapping_add((iteration as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SamplePair {
        let defects: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let signals: Vec<f64> = defects.iter().map(|d| 1.0 + 2.0 * d).collect();
        SamplePair::new(defects, signals).expect("valid")
    }

    fn config(seed: u64, parallel: bool) -> BootstrapConfig {
        BootstrapConfig {
            simulation_size: 30,
            seed: Some(seed),
            parallel,
            ..Default::default()
        }
    }

    fn mean_defect(draw: &SamplePair) -> Result<f64> {
        Ok(draw.defects().iter().sum::<f64>() / draw.len() as f64)
    }

    #[test]
    fn seeded_runs_are_reproducible_across_modes() {
        let s = sample();
        let par = run_bootstrap(&s, &config(11, true), mean_defect).expect("runs");
        let ser = run_bootstrap(&s, &config(11, false), mean_defect).expect("runs");
        assert_eq!(par.draws, ser.draws);
        assert_eq!(par.summary.succeeded, 30);
    }

    #[test]
    fn different_seeds_differ() {
        let s = sample();
        let a = run_bootstrap(&s, &config(1, false), mean_defect).expect("runs");
        let b = run_bootstrap(&s, &config(2, false), mean_defect).expect("runs");
        assert_ne!(a.draws, b.draws);
    }

    #[test]
    fn draws_keep_pairs_together() {
        let s = sample();
        let run = run_bootstrap(&s, &config(5, true), |draw| {
            Ok(draw
                .defects()
                .iter()
                .zip(draw.signals())
                .all(|(d, y)| (y - (1.0 + 2.0 * d)).abs() < 1e-12))
        })
        .expect("runs");
        assert!(run.draws.iter().all(|&ok| ok));
    }

    #[test]
    fn skip_policy_drops_failures() {
        let s = sample();
        let run = run_bootstrap(&s, &config(3, true), |draw| {
            if draw.defects()[0] < 2.0 {
                Err(PodError::SingularDesign)
            } else {
                Ok(())
            }
        });
        match run {
            Ok(r) => {
                assert_eq!(r.summary.succeeded + r.summary.skipped, 30);
                assert_eq!(r.draws.len(), r.summary.succeeded);
            }
            Err(e) => assert!(matches!(e, PodError::Bootstrap { .. })),
        }
    }

    #[test]
    fn strict_policy_surfaces_error() {
        let s = sample();
        let cfg = BootstrapConfig {
            failure_policy: FailurePolicy::Strict,
            ..config(3, false)
        };
        let err = run_bootstrap::<(), _>(&s, &cfg, |_| Err(PodError::SingularDesign)).unwrap_err();
        assert_eq!(err, PodError::SingularDesign);
    }

    #[test]
    fn too_many_failures() {
        let s = sample();
        let err = run_bootstrap::<(), _>(&s, &config(3, true), |_| Err(PodError::SingularDesign))
            .unwrap_err();
        assert_eq!(err, PodError::Bootstrap { succeeded: 0, total: 30 });
    }

    #[test]
    fn cancelled_before_start() {
        let s = sample();
        let token = CancelToken::new();
        token.cancel();
        let cfg = BootstrapConfig {
            cancel: Some(token),
            ..config(3, false)
        };
        let err = run_bootstrap(&s, &cfg, mean_defect).unwrap_err();
        assert_eq!(err, PodError::Interrupted { completed: 0 });
    }

    #[test]
    fn cancelled_midway() {
        let s = sample();
        let token = CancelToken::new();
        let cfg = BootstrapConfig {
            cancel: Some(token.clone()),
            ..config(3, false)
        };
        let err = run_bootstrap(&s, &cfg, |draw| {
            token.cancel();
            mean_defect(draw)
        })
        .unwrap_err();
        assert_eq!(err, PodError::Interrupted { completed: 1 });
    }

    #[test]
    fn invalid_config() {
        let s = sample();
        let cfg = BootstrapConfig {
            simulation_size: 0,
            ..Default::default()
        };
        assert!(run_bootstrap(&s, &cfg, mean_defect).is_err());
        let cfg = BootstrapConfig {
            min_success_ratio: 1.5,
            ..Default::default()
        };
        assert!(run_bootstrap(&s, &cfg, mean_defect).is_err());
    }

    #[test]
    fn iteration_seeds_are_distinct() {
        let seeds: std::collections::HashSet<u64> = (0..1000).map(|i| iteration_seed(42, i)).collect();
        assert_eq!(seeds.len(), 1000);
    }
}
