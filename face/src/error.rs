use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("landmark model failed to initialise: {0}")]
    ModelInit(String),

    #[error("landmark estimation failed: {0}")]
    Estimation(String),

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("invalid face-pose thresholds: {0}")]
    InvalidThresholds(String),

    #[error("face analyzer has been disposed")]
    Disposed,
}
