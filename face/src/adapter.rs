//! Face analysis adapter: landmark geometry → face-pose signal.
//!
//! Two scalar proxies are derived from the first detected face:
//! - **yaw**: nose-tip x minus the midpoint of the two cheek edges
//! - **pitch**: nose-tip height between forehead (0.0) and chin (1.0)
//!
//! The thresholds are empirical webcam tuning and live in
//! [`FacePoseThresholds`] so they can be recalibrated from config.

use serde::{Deserialize, Serialize};

use vigil_types::{FacePoseSignal, FaceStatus};

use crate::landmarks::{CHIN, FOREHEAD, LEFT_CHEEK, NOSE_TIP, RIGHT_CHEEK};
use crate::{FaceError, LandmarkResult};

pub const NO_FACE_MESSAGE: &str = "No face detected";
pub const LOOKING_SIDE_MESSAGE: &str = "Looking Away (Side)";
pub const LOOKING_UP_MESSAGE: &str = "Looking Away (Up)";
pub const LOOKING_DOWN_MESSAGE: &str = "Looking Away (Down)";

const SCORE_SAFE: u8 = 100;
const SCORE_LOOKING_AWAY: u8 = 70;
// Looking down is the phone posture, so it scores lower.
const SCORE_LOOKING_DOWN: u8 = 60;

/// Tunable decision boundaries for [`analyze`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacePoseThresholds {
    /// `|yaw|` above this is "looking away (side)".
    #[serde(default = "default_max_yaw")]
    pub max_yaw: f32,
    /// Pitch below this is "looking away (up)".
    #[serde(default = "default_min_pitch")]
    pub min_pitch: f32,
    /// Pitch above this is "looking away (down)".
    #[serde(default = "default_max_pitch")]
    pub max_pitch: f32,
}

fn default_max_yaw() -> f32 {
    0.12
}

fn default_min_pitch() -> f32 {
    0.25
}

fn default_max_pitch() -> f32 {
    0.75
}

impl Default for FacePoseThresholds {
    fn default() -> Self {
        Self {
            max_yaw: default_max_yaw(),
            min_pitch: default_min_pitch(),
            max_pitch: default_max_pitch(),
        }
    }
}

impl FacePoseThresholds {
    pub fn validate(&self) -> Result<(), FaceError> {
        if !(self.max_yaw.is_finite() && self.max_yaw > 0.0) {
            return Err(FaceError::InvalidThresholds(format!(
                "max_yaw must be positive, got {}",
                self.max_yaw
            )));
        }
        if !(self.min_pitch.is_finite() && self.max_pitch.is_finite())
            || self.min_pitch >= self.max_pitch
        {
            return Err(FaceError::InvalidThresholds(format!(
                "pitch window [{}, {}] is empty",
                self.min_pitch, self.max_pitch
            )));
        }
        Ok(())
    }
}

/// Classify one estimator result. Pure; only the first face is considered.
pub fn analyze(result: &LandmarkResult, thresholds: &FacePoseThresholds) -> FacePoseSignal {
    let Some(face) = result.multi_face_landmarks.first() else {
        return FacePoseSignal::no_face(NO_FACE_MESSAGE);
    };

    let (Some(nose), Some(left), Some(right), Some(forehead), Some(chin)) = (
        face.get(NOSE_TIP),
        face.get(LEFT_CHEEK),
        face.get(RIGHT_CHEEK),
        face.get(FOREHEAD),
        face.get(CHIN),
    ) else {
        // A partial mesh cannot be trusted to show a face.
        return FacePoseSignal::no_face(NO_FACE_MESSAGE);
    };

    let yaw = nose.x - (left.x + right.x) / 2.0;

    let face_height = chin.y - forehead.y;
    if !face_height.is_finite() || face_height.abs() < f32::EPSILON {
        return FacePoseSignal::no_face(NO_FACE_MESSAGE);
    }
    let pitch = (nose.y - forehead.y) / face_height;

    let (status, message, score) = if yaw.abs() > thresholds.max_yaw {
        (FaceStatus::Warning, LOOKING_SIDE_MESSAGE, SCORE_LOOKING_AWAY)
    } else if pitch < thresholds.min_pitch {
        (FaceStatus::Warning, LOOKING_UP_MESSAGE, SCORE_LOOKING_AWAY)
    } else if pitch > thresholds.max_pitch {
        (FaceStatus::Warning, LOOKING_DOWN_MESSAGE, SCORE_LOOKING_DOWN)
    } else {
        (FaceStatus::Safe, "", SCORE_SAFE)
    };

    FacePoseSignal {
        status,
        message: message.to_string(),
        yaw,
        pitch,
        score,
    }
}
