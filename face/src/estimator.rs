//! Seams to the external capabilities the face pipeline consumes: the
//! landmark estimator and the camera.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vigil_types::Timestamp;

use crate::{FaceError, LandmarkResult};

/// Options handed to the estimator when its model is loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorOptions {
    pub max_num_faces: u32,
    pub refine_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            max_num_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// One captured camera frame.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub captured_at: Timestamp,
    pub pixels: Arc<[u8]>,
}

/// The facial-landmark model, consumed as a black box.
#[async_trait]
pub trait LandmarkEstimator: Send + Sync {
    /// Load the model. Called at most once per analyzer.
    async fn load(&self, options: &EstimatorOptions) -> Result<(), FaceError>;

    /// Estimate landmarks for one frame.
    async fn estimate(&self, frame: &VideoFrame) -> Result<LandmarkResult, FaceError>;

    /// Release the model instance.
    fn close(&self);
}

/// A live video stream owned by one monitoring context.
pub trait VideoSource: Send + Sync {
    /// The current frame, or `None` if the stream has nothing ready yet.
    fn capture(&self) -> Option<VideoFrame>;

    /// Stop every underlying media track.
    fn stop(&self);
}

/// Opens camera streams. Permission denial surfaces as
/// [`FaceError::CameraUnavailable`].
#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn VideoSource>, FaceError>;
}
