//! Linear-regression POD estimator.
//!
//! The signal is regressed on defect size, by OLS on the in-range points
//! and, when a censoring threshold is set, by censored maximum likelihood
//! as well. POD(a) is the probability that the residual exceeds
//! `detection − (β₀ + β₁·a)`:
//!
//! | Residual hypothesis | POD | Confidence curve |
//! |---|---|---|
//! | `Empirical` (Berens-Binomial) | empirical CCDF | closed-form binomial bound |
//! | `Normal` (Berens-Gauss) | Normal survival function | bootstrap ensemble |
//! | `Weibull` | shifted Weibull survival function | bootstrap ensemble |
//! | `KernelSmoothing` | Gaussian-kernel survival function | bootstrap ensemble |
//!
//! # References
//!
//! - Berens, A.P. (1989). "NDE Reliability Data Analysis", *ASM Handbook*
//!   Vol. 17.
//! - MIL-HDBK-1823A (2009), Section 4.

use std::sync::Arc;

use tracing::debug;

use super::detection::{solve_curve, DetectionSize};
use crate::bootstrap::{run_bootstrap, BootstrapConfig, BootstrapSummary};
use crate::censoring::Thresholds;
use crate::distribution::ResidualDistribution;
use crate::error::{check_open_unit, PodError, Result};
use crate::pod::{BinomialConfidencePod, EnsemblePod, LinearPod, ModelVariant, PodModel};
use crate::prepare::{prepare, PreparedData};
use crate::regression::{fit_censored, fit_uncensored, LinearFit};
use crate::sample::SamplePair;
use crate::transform::BoxCoxSpec;

/// Linear estimator configuration
#[derive(Debug, Clone, Default)]
pub struct LinearPodConfig {
    /// Signals below this are censored (default: none)
    pub noise_threshold: Option<f64>,
    /// Signals above this are censored (default: none)
    pub saturation_threshold: Option<f64>,
    /// Box-Cox transform of the signals (default: disabled)
    pub box_cox: BoxCoxSpec,
    /// Residual hypothesis (default: empirical, i.e. Berens-Binomial)
    pub residuals: ResidualDistribution,
    /// Bootstrap settings, used for non-empirical residual hypotheses
    pub bootstrap: BootstrapConfig,
}

impl LinearPodConfig {
    fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::new(self.noise_threshold, self.saturation_threshold)
    }
}

// ---------------------------------------------------------------------------
// Pure pipeline
// ---------------------------------------------------------------------------

/// Regression results on one (re)sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPipelineFit {
    pub prepared: PreparedData,
    pub uncensored: LinearFit,
    /// Present exactly when a censoring threshold is set.
    pub censored: Option<LinearFit>,
}

impl LinearPipelineFit {
    /// # Errors
    ///
    /// `CensoringDisabled` for the censored variant without thresholds.
    pub fn fit(&self, variant: ModelVariant) -> Result<&LinearFit> {
        match variant {
            ModelVariant::Uncensored => Ok(&self.uncensored),
            ModelVariant::Censored => self.censored.as_ref().ok_or(PodError::CensoringDisabled),
        }
    }

    /// POD curve of one variant under the given residual hypothesis.
    pub fn pod(&self, variant: ModelVariant, residuals: ResidualDistribution) -> Result<LinearPod> {
        LinearPod::from_fit(self.fit(variant)?, self.prepared.detection, residuals)
    }
}

/// Prepares `sample` and fits the uncensored and, if enabled, censored
/// regressions.
///
/// # Errors
///
/// Invalid thresholds, preparation failures, OLS failures and censored MLE
/// non-convergence.
pub fn fit_linear_pipeline(
    sample: &SamplePair,
    detection: f64,
    config: &LinearPodConfig,
) -> Result<LinearPipelineFit> {
    let thresholds = config.thresholds()?;
    let prepared = prepare(sample, detection, &thresholds, config.box_cox)?;
    let uncensored = fit_uncensored(prepared.defects(), prepared.signals())?;
    let censored = if thresholds.is_censored() {
        Some(fit_censored(
            &uncensored,
            &prepared.split,
            prepared.thresholds.noise,
            prepared.thresholds.saturation,
        )?)
    } else {
        None
    };
    Ok(LinearPipelineFit {
        prepared,
        uncensored,
        censored,
    })
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Linear-regression POD estimator.
///
/// # Examples
///
/// ```
/// use u_pod::estimator::{LinearModelPod, LinearPodConfig};
/// use u_pod::pod::{ModelVariant, PodCurve};
/// use u_pod::SamplePair;
///
/// let defects: Vec<f64> = (0..30).map(|i| 0.2 * i as f64).collect();
/// let signals: Vec<f64> = defects
///     .iter()
///     .enumerate()
///     .map(|(i, d)| 1.0 + 2.0 * d + [-0.3, 0.1, 0.2][i % 3])
///     .collect();
/// let sample = SamplePair::new(defects, signals).unwrap();
///
/// let fitted = LinearModelPod::new(sample, 7.0, LinearPodConfig::default())
///     .unwrap()
///     .run()
///     .unwrap();
/// let pod = fitted.pod_model(ModelVariant::Uncensored).unwrap();
/// assert_eq!(pod.evaluate(0.0), 0.0);
/// assert_eq!(pod.evaluate(5.8), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct LinearModelPod {
    sample: SamplePair,
    detection: f64,
    config: LinearPodConfig,
    censored: bool,
}

impl LinearModelPod {
    /// # Errors
    ///
    /// `NonFinite` for a non-finite detection value, `InvalidParameter` for
    /// invalid thresholds or bootstrap settings.
    pub fn new(sample: SamplePair, detection: f64, config: LinearPodConfig) -> Result<Self> {
        if !detection.is_finite() {
            return Err(PodError::NonFinite);
        }
        let censored = config.thresholds()?.is_censored();
        config.bootstrap.validate()?;
        Ok(Self {
            sample,
            detection,
            config,
            censored,
        })
    }

    /// Whether the censored regression is fitted.
    pub fn is_censored(&self) -> bool {
        self.censored
    }

    /// Fits the model, and the bootstrap ensemble for non-empirical
    /// residual hypotheses.
    ///
    /// # Errors
    ///
    /// Any failure of the pipeline on the input sample, and bootstrap
    /// failures per the configured [`FailurePolicy`](crate::bootstrap::FailurePolicy).
    pub fn run(&self) -> Result<LinearPodFit> {
        let fit = fit_linear_pipeline(&self.sample, self.detection, &self.config)?;
        let residuals = self.config.residuals;
        let uncensored_pod = fit.pod(ModelVariant::Uncensored, residuals)?;
        let censored_pod = if self.censored {
            Some(fit.pod(ModelVariant::Censored, residuals)?)
        } else {
            None
        };
        debug!(
            intercept = fit.uncensored.intercept,
            slope = fit.uncensored.slope,
            censored = self.censored,
            ?residuals,
            "linear POD model fitted"
        );

        let ensemble = match residuals {
            ResidualDistribution::Empirical => None,
            _ => Some(self.bootstrap_ensemble()?),
        };

        Ok(LinearPodFit {
            defect_range: (self.sample.defect_min(), self.sample.defect_max()),
            residuals,
            fit,
            uncensored_pod,
            censored_pod,
            ensemble,
        })
    }

    fn bootstrap_ensemble(&self) -> Result<LinearEnsemble> {
        let residuals = self.config.residuals;
        let run = run_bootstrap(&self.sample, &self.config.bootstrap, |draw| {
            let fit = fit_linear_pipeline(draw, self.detection, &self.config)?;
            let uncensored = fit.pod(ModelVariant::Uncensored, residuals)?;
            let censored = if self.censored {
                Some(fit.pod(ModelVariant::Censored, residuals)?)
            } else {
                None
            };
            Ok((uncensored, censored, fit.prepared.lambda()))
        })?;

        let mut uncensored = Vec::with_capacity(run.draws.len());
        let mut censored = Vec::with_capacity(run.draws.len());
        let mut lambdas = Vec::with_capacity(run.draws.len());
        for (u, c, l) in run.draws {
            uncensored.push(u);
            censored.push(c);
            lambdas.push(l);
        }
        let censored = if self.censored {
            Some(censored.into_iter().flatten().collect::<Vec<_>>().into())
        } else {
            None
        };
        Ok(LinearEnsemble {
            uncensored: uncensored.into(),
            censored,
            lambdas,
            summary: run.summary,
        })
    }
}

/// Bootstrap POD curves of a linear estimator.
#[derive(Debug, Clone)]
pub struct LinearEnsemble {
    uncensored: Arc<[LinearPod]>,
    censored: Option<Arc<[LinearPod]>>,
    lambdas: Vec<Option<f64>>,
    summary: BootstrapSummary,
}

impl LinearEnsemble {
    /// Member curves of one variant.
    pub fn members(&self, variant: ModelVariant) -> Result<&Arc<[LinearPod]>> {
        match variant {
            ModelVariant::Uncensored => Ok(&self.uncensored),
            ModelVariant::Censored => self.censored.as_ref().ok_or(PodError::CensoringDisabled),
        }
    }

    /// Box-Cox λ of each member, in draw order; `None` without a transform.
    /// A fitted λ is refitted on every draw.
    pub fn box_cox_lambdas(&self) -> &[Option<f64>] {
        &self.lambdas
    }

    pub fn summary(&self) -> &BootstrapSummary {
        &self.summary
    }

    /// Lower confidence curve at `confidence` over one variant's members.
    pub fn confidence_curve(&self, variant: ModelVariant, confidence: f64) -> Result<EnsemblePod> {
        EnsemblePod::new(Arc::clone(self.members(variant)?), confidence)
    }
}

/// Result of [`LinearModelPod::run`].
#[derive(Debug, Clone)]
pub struct LinearPodFit {
    defect_range: (f64, f64),
    residuals: ResidualDistribution,
    fit: LinearPipelineFit,
    uncensored_pod: LinearPod,
    censored_pod: Option<LinearPod>,
    ensemble: Option<LinearEnsemble>,
}

impl LinearPodFit {
    /// Intercept, slope, standard error and residuals of one regression.
    ///
    /// # Errors
    ///
    /// `CensoringDisabled` for the censored variant without thresholds.
    pub fn linear_result(&self, variant: ModelVariant) -> Result<&LinearFit> {
        self.fit.fit(variant)
    }

    /// Box-Cox λ used on the input sample, `None` without a transform.
    pub fn box_cox_lambda(&self) -> Option<f64> {
        self.fit.prepared.lambda()
    }

    /// Detection threshold in transformed space.
    pub fn detection(&self) -> f64 {
        self.fit.prepared.detection
    }

    /// Counts of the bootstrap run, if one was needed.
    pub fn bootstrap_summary(&self) -> Option<&BootstrapSummary> {
        self.ensemble.as_ref().map(LinearEnsemble::summary)
    }

    pub fn ensemble(&self) -> Option<&LinearEnsemble> {
        self.ensemble.as_ref()
    }

    /// POD curve of one regression.
    ///
    /// # Errors
    ///
    /// `CensoringDisabled` for the censored variant without thresholds.
    pub fn pod_model(&self, variant: ModelVariant) -> Result<PodModel> {
        let pod = match variant {
            ModelVariant::Uncensored => &self.uncensored_pod,
            ModelVariant::Censored => self.censored_pod.as_ref().ok_or(PodError::CensoringDisabled)?,
        };
        Ok(PodModel::Linear(pod.clone()))
    }

    /// Lower confidence curve at `confidence`: the binomial bound for
    /// empirical residuals, the bootstrap ensemble quantile otherwise.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` unless 0 < `confidence` < 1, `CensoringDisabled`
    /// for the censored variant without thresholds.
    pub fn pod_cl_model(&self, variant: ModelVariant, confidence: f64) -> Result<PodModel> {
        check_open_unit("confidence level", confidence)?;
        match &self.ensemble {
            None => Ok(PodModel::Binomial(BinomialConfidencePod::new(
                self.fit.fit(variant)?,
                self.fit.prepared.detection,
                confidence,
            )?)),
            Some(ensemble) => Ok(PodModel::Ensemble(
                ensemble.confidence_curve(variant, confidence)?,
            )),
        }
    }

    /// Residual hypothesis the curves were built with.
    pub fn residual_distribution(&self) -> ResidualDistribution {
        self.residuals
    }

    /// a_p, and a_p/c when `confidence` is given, solved over the observed
    /// defect range.
    ///
    /// # Errors
    ///
    /// `NoSolutionInRange` when a curve does not reach `probability` inside
    /// the observed range, plus the accessor errors.
    pub fn compute_detection_size(
        &self,
        variant: ModelVariant,
        probability: f64,
        confidence: Option<f64>,
    ) -> Result<DetectionSize> {
        let a_p = solve_curve(&self.pod_model(variant)?, probability, self.defect_range)?;
        let a_p_cl = confidence
            .map(|c| solve_curve(&self.pod_cl_model(variant, c)?, probability, self.defect_range))
            .transpose()?;
        Ok(DetectionSize {
            probability,
            confidence,
            a_p,
            a_p_cl,
        })
    }
}
