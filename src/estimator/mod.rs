//! POD estimators.
//!
//! Each estimator validates its inputs at construction and produces an
//! immutable fitted result from `run()`. The fitted result hands out POD
//! curves, confidence curves and detection sizes.
//!
//! - [`LinearModelPod`] — linear regression of signal on defect size,
//!   uncensored and censored, with Berens-Binomial or distribution-fit POD
//! - [`QuantileRegressionPod`] — linear quantile regression inverted per
//!   probability level

mod detection;
pub mod linear;
pub mod quantile;

pub use detection::DetectionSize;
pub use linear::{
    fit_linear_pipeline, LinearEnsemble, LinearModelPod, LinearPipelineFit, LinearPodConfig,
    LinearPodFit,
};
pub use quantile::{
    default_quantile_levels, fit_quantile_pipeline, QuantileEnsemble, QuantilePipelineFit,
    QuantilePodConfig, QuantilePodFit, QuantileRegressionPod,
};
