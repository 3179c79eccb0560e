//! Face analysis for camera-based proctoring.
//!
//! - [`adapter`] turns raw landmark output into a [`FacePoseSignal`]
//!   (no-face / looking away / nominal) using configurable thresholds.
//! - [`analyzer`] owns the landmark estimator for one exam attempt: one-time
//!   model load, result callback, one in-flight analysis at a time.
//! - [`pump`] drives capture at the display refresh cadence and tears the
//!   camera and model down on stop.
//!
//! [`FacePoseSignal`]: vigil_types::FacePoseSignal

pub mod adapter;
pub mod analyzer;
pub mod error;
pub mod estimator;
pub mod landmarks;
pub mod pump;

pub use adapter::{analyze, FacePoseThresholds};
pub use analyzer::{AnalyzerStats, FaceAnalyzer, ResultCallback, SubmitOutcome};
pub use error::FaceError;
pub use estimator::{Camera, EstimatorOptions, LandmarkEstimator, VideoFrame, VideoSource};
pub use landmarks::{Landmark, LandmarkResult};
pub use pump::FramePump;
