//! # u-pod
//!
//! Probability-of-detection (POD) estimation for non-destructive testing
//! from paired (defect size, signal response) data.
//!
//! Given a detection threshold on the signal, the estimators produce POD as
//! a function of defect size, a lower confidence curve, and the classic
//! a90/95 detection-size figures.
//!
//! ## Modules
//!
//! - [`estimator`] — Linear-regression (Berens) and quantile-regression POD estimators
//! - [`pod`] — POD curve types and the binomial confidence bound
//! - [`bootstrap`] — Parallel, seeded bootstrap refits with failure policy and cancellation
//! - [`prepare`] — Censoring filter and Box-Cox transform ahead of regression
//! - [`regression`] — OLS, censored Gaussian MLE, quantile regression (IRLS)
//! - [`distribution`] — Residual distributions (empirical, Normal, Weibull, Gaussian kernel)
//! - [`transform`] — Box-Cox transform and λ profile likelihood
//! - [`censoring`] — Noise/saturation thresholds
//! - [`numerics`] — Root finding, maximization, interpolation, empirical quantiles
//!
//! ## Example
//!
//! ```
//! use u_pod::estimator::{LinearModelPod, LinearPodConfig};
//! use u_pod::pod::ModelVariant;
//! use u_pod::SamplePair;
//!
//! let defects: Vec<f64> = (0..60).map(|i| 0.1 + 0.15 * i as f64).collect();
//! let signals: Vec<f64> = defects
//!     .iter()
//!     .enumerate()
//!     .map(|(i, d)| 2.0 + 3.0 * d + 0.8 * ((i * 7 % 11) as f64 / 5.0 - 1.0))
//!     .collect();
//! let sample = SamplePair::new(defects, signals).unwrap();
//!
//! let fitted = LinearModelPod::new(sample, 20.0, LinearPodConfig::default())
//!     .unwrap()
//!     .run()
//!     .unwrap();
//! let sizes = fitted
//!     .compute_detection_size(ModelVariant::Uncensored, 0.9, Some(0.95))
//!     .unwrap();
//! assert!(sizes.a_p_cl.unwrap() >= sizes.a_p);
//! println!("{sizes}"); // a90 = …, a90/95 = …
//! ```
//!
//! ## Design Philosophy
//!
//! - **Immutable results**: every fit is a value built once per (re)sample
//! - **Explicit failures**: missing crossings and non-convergence are named errors
//! - **Research-backed**: Berens (1989), MIL-HDBK-1823A, Koenker (2005)

pub mod bootstrap;
pub mod censoring;
pub mod distribution;
pub mod error;
pub mod estimator;
pub mod numerics;
pub mod pod;
pub mod prepare;
pub mod regression;
pub mod sample;
pub mod transform;

pub use error::{PodError, Result};
pub use estimator::{DetectionSize, LinearModelPod, QuantileRegressionPod};
pub use pod::{ModelVariant, PodCurve, PodModel};
pub use sample::SamplePair;
