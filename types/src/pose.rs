//! Per-frame face-pose signal produced by the face analysis adapter.

use serde::{Deserialize, Serialize};

use crate::ViolationSignal;

/// Classification of one analysed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceStatus {
    NoFace,
    Warning,
    Safe,
}

/// Derived, ephemeral result of analysing one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacePoseSignal {
    pub status: FaceStatus,
    pub message: String,
    /// Nose offset from the cheek midpoint (normalised image units).
    pub yaw: f32,
    /// Nose height between forehead (0.0) and chin (1.0).
    pub pitch: f32,
    /// Informational attention score, 0..=100.
    pub score: u8,
}

impl FacePoseSignal {
    pub fn no_face(message: impl Into<String>) -> Self {
        Self {
            status: FaceStatus::NoFace,
            message: message.into(),
            yaw: 0.0,
            pitch: 0.0,
            score: 0,
        }
    }

    /// The violation this frame represents, if any. `NO_FACE` and
    /// `WARNING` are both hard.
    pub fn to_violation(&self) -> Option<ViolationSignal> {
        match self.status {
            FaceStatus::Safe => None,
            FaceStatus::NoFace | FaceStatus::Warning => {
                Some(ViolationSignal::hard(self.message.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_frames_are_not_violations() {
        let signal = FacePoseSignal {
            status: FaceStatus::Safe,
            message: String::new(),
            yaw: 0.01,
            pitch: 0.5,
            score: 100,
        };
        assert!(signal.to_violation().is_none());
    }

    #[test]
    fn no_face_is_a_hard_violation() {
        let violation = FacePoseSignal::no_face("No face detected")
            .to_violation()
            .unwrap();
        assert!(violation.is_hard());
        assert_eq!(violation.reason, "No face detected");
    }

    #[test]
    fn status_uses_wire_names() {
        assert_eq!(serde_json::to_string(&FaceStatus::NoFace).unwrap(), "\"NO_FACE\"");
    }
}
