//! Raw output of the facial-landmark estimator.

use serde::{Deserialize, Serialize};

/// Nose tip in the 468/478-point face mesh.
pub const NOSE_TIP: usize = 1;
/// Left cheek edge.
pub const LEFT_CHEEK: usize = 234;
/// Right cheek edge.
pub const RIGHT_CHEEK: usize = 454;
/// Top of the forehead.
pub const FOREHEAD: usize = 10;
/// Bottom of the chin.
pub const CHIN: usize = 152;

/// One landmark in normalised image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Per-frame estimator result: one landmark list per detected face, empty
/// when no face was found.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkResult {
    #[serde(default)]
    pub multi_face_landmarks: Vec<Vec<Landmark>>,
}

impl LandmarkResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(face: Vec<Landmark>) -> Self {
        Self {
            multi_face_landmarks: vec![face],
        }
    }
}
