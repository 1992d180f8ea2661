//! Quantile-regression POD estimator.
//!
//! For each probability level p the signal's conditional quantile at 1 − p
//! is fitted as a line in defect size and solved against the detection
//! threshold. The (defect size, p) pairs, anchored at (0, 0) and
//! (a_max, max p), define a piecewise-linear POD curve. The confidence curve
//! repeats this on bootstrap resamples and takes, per level, the
//! `confidence` quantile of the defect sizes.
//!
//! No distributional assumption is made on the residuals.

use tracing::debug;

use super::detection::{solve_curve, DetectionSize};
use crate::bootstrap::{run_bootstrap, BootstrapConfig, BootstrapSummary};
use crate::censoring::Thresholds;
use crate::error::{check_open_unit, PodError, Result};
use crate::numerics::{column_quantiles, linspace};
use crate::pod::{InterpolatedPod, PodModel};
use crate::prepare::{prepare, PreparedData};
use crate::regression::{fit_quantile, invert_to_defect_size, LinearPredictor, QuantRegOptions};
use crate::sample::SamplePair;
use crate::transform::BoxCoxSpec;

/// 21 evenly spaced levels from 0.05 to 0.98.
pub fn default_quantile_levels() -> Vec<f64> {
    linspace(0.05, 0.98, 21)
}

/// Quantile estimator configuration
#[derive(Debug, Clone)]
pub struct QuantilePodConfig {
    /// Signals below this are censored (default: none)
    pub noise_threshold: Option<f64>,
    /// Signals above this are censored (default: none)
    pub saturation_threshold: Option<f64>,
    /// Box-Cox transform of the signals (default: disabled)
    pub box_cox: BoxCoxSpec,
    /// Probability levels, strictly increasing in (0, 1)
    pub quantile_levels: Vec<f64>,
    /// IRLS solver controls
    pub regression: QuantRegOptions,
    /// Bootstrap settings for the confidence curve
    pub bootstrap: BootstrapConfig,
}

impl Default for QuantilePodConfig {
    fn default() -> Self {
        Self {
            noise_threshold: None,
            saturation_threshold: None,
            box_cox: BoxCoxSpec::Disabled,
            quantile_levels: default_quantile_levels(),
            regression: QuantRegOptions::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl QuantilePodConfig {
    fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::new(self.noise_threshold, self.saturation_threshold)
    }

    fn validate(&self) -> Result<()> {
        self.thresholds()?;
        self.bootstrap.validate()?;
        if self.quantile_levels.is_empty() {
            return Err(PodError::InsufficientData { got: 0, min: 1 });
        }
        for &p in &self.quantile_levels {
            check_open_unit("quantile level", p)?;
        }
        if let Some(w) = self.quantile_levels.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PodError::InvalidParameter {
                name: "quantile level ordering",
                value: w[1],
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pure pipeline
// ---------------------------------------------------------------------------

/// Inverted defect sizes on one (re)sample, one per quantile level.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantilePipelineFit {
    pub prepared: PreparedData,
    pub defect_sizes: Vec<f64>,
}

/// Prepares `sample`, fits one quantile line per level and inverts each
/// over `[0, max in-range defect]`.
///
/// # Errors
///
/// Preparation failures, solver failures, and `NonMonotoneFit` /
/// `NoSolutionInRange` when a level has no crossing in range.
pub fn fit_quantile_pipeline(
    sample: &SamplePair,
    detection: f64,
    config: &QuantilePodConfig,
) -> Result<QuantilePipelineFit> {
    let prepared = prepare(sample, detection, &config.thresholds()?, config.box_cox)?;
    let bounds = (0.0, prepared.defect_max());
    let defect_sizes = config
        .quantile_levels
        .iter()
        .map(|&level| {
            let line = fit_quantile(prepared.defects(), prepared.signals(), level, config.regression)?;
            invert_to_defect_size(&line, prepared.detection, bounds, level)
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(QuantilePipelineFit {
        prepared,
        defect_sizes,
    })
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Quantile-regression POD estimator.
///
/// # Examples
///
/// ```
/// use u_pod::bootstrap::BootstrapConfig;
/// use u_pod::estimator::{QuantilePodConfig, QuantileRegressionPod};
/// use u_pod::pod::PodCurve;
/// use u_pod::SamplePair;
///
/// let defects: Vec<f64> = (1..=40).map(|i| 0.25 * i as f64).collect();
/// let signals: Vec<f64> = defects
///     .iter()
///     .enumerate()
///     .map(|(i, d)| 1.0 + 2.0 * d + [-0.6, -0.2, 0.2, 0.6][i % 4])
///     .collect();
/// let sample = SamplePair::new(defects, signals).unwrap();
/// let config = QuantilePodConfig {
///     quantile_levels: vec![0.1, 0.3, 0.5, 0.7, 0.9],
///     bootstrap: BootstrapConfig { simulation_size: 20, seed: Some(1), ..Default::default() },
///     ..Default::default()
/// };
///
/// let fitted = QuantileRegressionPod::new(sample, 10.0, config).unwrap().run().unwrap();
/// let pod = fitted.pod_model();
/// assert_eq!(pod.evaluate(0.0), 0.0);
/// assert_eq!(pod.evaluate(10.0), 0.9);
/// ```
#[derive(Debug, Clone)]
pub struct QuantileRegressionPod {
    sample: SamplePair,
    detection: f64,
    config: QuantilePodConfig,
}

impl QuantileRegressionPod {
    /// # Errors
    ///
    /// `NonFinite` for a non-finite detection value; `InvalidParameter` or
    /// `InsufficientData` for invalid thresholds, levels or bootstrap
    /// settings.
    pub fn new(sample: SamplePair, detection: f64, config: QuantilePodConfig) -> Result<Self> {
        if !detection.is_finite() {
            return Err(PodError::NonFinite);
        }
        config.validate()?;
        Ok(Self {
            sample,
            detection,
            config,
        })
    }

    /// Fits the POD curve and the bootstrap ensemble.
    ///
    /// # Errors
    ///
    /// Any failure of the pipeline on the input sample, and bootstrap
    /// failures per the configured [`FailurePolicy`](crate::bootstrap::FailurePolicy).
    pub fn run(&self) -> Result<QuantilePodFit> {
        let levels = &self.config.quantile_levels;
        let fit = fit_quantile_pipeline(&self.sample, self.detection, &self.config)?;
        let defect_max = fit.prepared.defect_max();
        let pod = InterpolatedPod::anchored(&fit.defect_sizes, levels, defect_max)?;
        debug!(
            levels = levels.len(),
            defect_max,
            lambda = ?fit.prepared.lambda(),
            "quantile POD model fitted"
        );

        let run = run_bootstrap(&self.sample, &self.config.bootstrap, |draw| {
            fit_quantile_pipeline(draw, self.detection, &self.config).map(|f| f.defect_sizes)
        })?;

        Ok(QuantilePodFit {
            defect_range: (self.sample.defect_min(), self.sample.defect_max()),
            regression: self.config.regression,
            fit,
            pod,
            ensemble: QuantileEnsemble {
                levels: levels.clone(),
                defect_sizes: run.draws,
                summary: run.summary,
            },
        })
    }
}

/// Bootstrap defect sizes of a quantile estimator: one row per successful
/// draw, one column per level.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileEnsemble {
    levels: Vec<f64>,
    defect_sizes: Vec<Vec<f64>>,
    summary: BootstrapSummary,
}

impl QuantileEnsemble {
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.defect_sizes
    }

    pub fn summary(&self) -> &BootstrapSummary {
        &self.summary
    }

    /// Per-level `confidence` quantile of the bootstrap defect sizes.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` unless 0 < `confidence` < 1.
    pub fn defect_quantiles(&self, confidence: f64) -> Result<Vec<f64>> {
        check_open_unit("confidence level", confidence)?;
        column_quantiles(&self.defect_sizes, confidence).ok_or(PodError::InsufficientData {
            got: self.defect_sizes.len(),
            min: 1,
        })
    }

    /// Anchored interpolation of [`defect_quantiles`](Self::defect_quantiles).
    pub fn confidence_curve(&self, confidence: f64, defect_max: f64) -> Result<InterpolatedPod> {
        InterpolatedPod::anchored(&self.defect_quantiles(confidence)?, &self.levels, defect_max)
    }
}

/// Result of [`QuantileRegressionPod::run`].
#[derive(Debug, Clone)]
pub struct QuantilePodFit {
    defect_range: (f64, f64),
    regression: QuantRegOptions,
    fit: QuantilePipelineFit,
    pod: InterpolatedPod,
    ensemble: QuantileEnsemble,
}

impl QuantilePodFit {
    pub fn levels(&self) -> &[f64] {
        self.ensemble.levels()
    }

    /// Defect size per level on the input sample, before rearrangement.
    pub fn defect_sizes(&self) -> &[f64] {
        &self.fit.defect_sizes
    }

    /// Largest in-range defect, the right anchor of every curve.
    pub fn defect_max(&self) -> f64 {
        self.fit.prepared.defect_max()
    }

    pub fn box_cox_lambda(&self) -> Option<f64> {
        self.fit.prepared.lambda()
    }

    pub fn detection(&self) -> f64 {
        self.fit.prepared.detection
    }

    pub fn ensemble(&self) -> &QuantileEnsemble {
        &self.ensemble
    }

    pub fn bootstrap_summary(&self) -> &BootstrapSummary {
        self.ensemble.summary()
    }

    pub fn pod_model(&self) -> PodModel {
        PodModel::Interpolated(self.pod.clone())
    }

    /// # Errors
    ///
    /// `InvalidParameter` unless 0 < `confidence` < 1.
    pub fn pod_cl_model(&self, confidence: f64) -> Result<PodModel> {
        Ok(PodModel::Interpolated(
            self.ensemble.confidence_curve(confidence, self.defect_max())?,
        ))
    }

    /// Refits the quantile line for probability level `level` (signal
    /// quantile 1 − `level`) on the prepared input sample.
    pub fn quantile_fit(&self, level: f64) -> Result<LinearPredictor> {
        fit_quantile(
            self.fit.prepared.defects(),
            self.fit.prepared.signals(),
            level,
            self.regression,
        )
    }

    /// a_p from the quantile line at `probability`, and a_p/c from the
    /// confidence curve when `confidence` is given.
    ///
    /// a_p is solved over `[0, max in-range defect]`, a_p/c over the
    /// observed defect range.
    ///
    /// # Errors
    ///
    /// `NonMonotoneFit` or `NoSolutionInRange` when a crossing is missing,
    /// `InvalidParameter` for levels outside (0, 1).
    pub fn compute_detection_size(
        &self,
        probability: f64,
        confidence: Option<f64>,
    ) -> Result<DetectionSize> {
        let line = self.quantile_fit(probability)?;
        let a_p = invert_to_defect_size(
            &line,
            self.fit.prepared.detection,
            (0.0, self.defect_max()),
            probability,
        )?;
        let a_p_cl = confidence
            .map(|c| solve_curve(&self.pod_cl_model(c)?, probability, self.defect_range))
            .transpose()?;
        Ok(DetectionSize {
            probability,
            confidence,
            a_p,
            a_p_cl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::FailurePolicy;
    use crate::pod::PodCurve;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn noisy_sample(n: usize, seed: u64) -> SamplePair {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).expect("valid");
        let defects: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
        let signals = defects
            .iter()
            .map(|d| 2.0 + 3.0 * d + noise.sample(&mut rng))
            .collect();
        SamplePair::new(defects, signals).expect("valid")
    }

    fn config(levels: Vec<f64>, seed: u64) -> QuantilePodConfig {
        QuantilePodConfig {
            quantile_levels: levels,
            bootstrap: BootstrapConfig {
                simulation_size: 30,
                seed: Some(seed),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn levels() -> Vec<f64> {
        (1..=9).map(|i| i as f64 / 10.0).collect()
    }

    #[test]
    fn default_levels() {
        let l = default_quantile_levels();
        assert_eq!(l.len(), 21);
        assert_eq!(l[0], 0.05);
        assert_eq!(l[20], 0.98);
    }

    #[test]
    fn anchors_hold_exactly() {
        let fitted = QuantileRegressionPod::new(noisy_sample(80, 1), 20.0, config(levels(), 1))
            .expect("valid")
            .run()
            .expect("fits");
        let pod = fitted.pod_model();
        assert_eq!(pod.evaluate(0.0), 0.0);
        assert_eq!(pod.evaluate(fitted.defect_max()), 0.9);
        let cl = fitted.pod_cl_model(0.95).expect("valid");
        assert_eq!(cl.evaluate(0.0), 0.0);
        assert_eq!(cl.evaluate(fitted.defect_max()), 0.9);
    }

    #[test]
    fn pod_reaches_level_at_its_defect_size() {
        let fitted = QuantileRegressionPod::new(noisy_sample(80, 2), 20.0, config(levels(), 2))
            .expect("valid")
            .run()
            .expect("fits");
        let sizes = fitted.defect_sizes();
        let monotone = sizes.windows(2).all(|w| w[0] <= w[1]);
        let d = fitted.compute_detection_size(0.5, None).expect("in range");
        assert!((d.a_p - sizes[4]).abs() < 1e-9);
        if monotone {
            assert!((fitted.pod_model().evaluate(d.a_p) - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn a90_near_theory() {
        let fitted = QuantileRegressionPod::new(noisy_sample(200, 3), 20.0, config(levels(), 3))
            .expect("valid")
            .run()
            .expect("fits");
        let d = fitted.compute_detection_size(0.9, Some(0.95)).expect("in range");
        // (20 − 2 + 1.2816) / 3
        assert!((d.a_p - 6.427).abs() < 0.4, "a90 = {}", d.a_p);
        assert!(d.a_p_cl.expect("requested") >= d.a_p - 0.2);
        assert_eq!(d.to_string().split(',').count(), 2);
    }

    #[test]
    fn confidence_curves_are_ordered() {
        let fitted = QuantileRegressionPod::new(noisy_sample(80, 4), 20.0, config(levels(), 4))
            .expect("valid")
            .run()
            .expect("fits");
        let lo = fitted.pod_cl_model(0.6).expect("valid");
        let hi = fitted.pod_cl_model(0.95).expect("valid");
        for i in 0..=100 {
            let a = i as f64 * 0.1;
            assert!(hi.evaluate(a) <= lo.evaluate(a) + 1e-12, "a = {a}");
        }
    }

    #[test]
    fn quantile_fit_uses_exceedance_level() {
        let fitted = QuantileRegressionPod::new(noisy_sample(120, 5), 20.0, config(levels(), 5))
            .expect("valid")
            .run()
            .expect("fits");
        let high = fitted.quantile_fit(0.9).expect("fits");
        let low = fitted.quantile_fit(0.1).expect("fits");
        assert!((high.tau - 0.1).abs() < 1e-12);
        assert!(high.predict(5.0) < low.predict(5.0));
    }

    #[test]
    fn unreachable_detection_fails_loudly() {
        // Detection far above every signal: no crossing inside [0, a_max].
        let err = QuantileRegressionPod::new(noisy_sample(40, 6), 500.0, config(levels(), 6))
            .expect("valid")
            .run()
            .unwrap_err();
        assert!(err.is_no_solution(), "{err}");
    }

    #[test]
    fn strict_bootstrap_propagates_draw_failures() {
        // Detection near the top of the range: some resamples miss the crossing.
        let mut cfg = config(levels(), 7);
        cfg.bootstrap.failure_policy = FailurePolicy::Strict;
        cfg.bootstrap.simulation_size = 60;
        let skip = QuantileRegressionPod::new(noisy_sample(30, 7), 27.0, config(levels(), 7))
            .expect("valid")
            .run();
        let strict = QuantileRegressionPod::new(noisy_sample(30, 7), 27.0, cfg)
            .expect("valid")
            .run();
        if let Ok(fitted) = skip {
            if fitted.bootstrap_summary().skipped > 0 {
                assert!(strict.is_err());
            }
        }
    }

    #[test]
    fn level_validation() {
        let s = noisy_sample(20, 8);
        for bad in [vec![], vec![0.5, 0.4], vec![0.0, 0.5], vec![0.5, 1.0], vec![0.3, 0.3]] {
            assert!(QuantileRegressionPod::new(s.clone(), 20.0, config(bad, 8)).is_err());
        }
    }
}
