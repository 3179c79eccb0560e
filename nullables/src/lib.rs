//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the proctoring core (exam backend,
//! landmark model, camera) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return scripted values
//! - Record every call for assertions
//! - Never touch the network or real hardware
//!
//! Usage: swap real implementations for nullables in tests.

pub mod backend;
pub mod camera;
pub mod estimator;

pub use backend::NullBackend;
pub use camera::{NullCamera, NullVideoSource};
pub use estimator::{frontal_face, NullEstimator};
