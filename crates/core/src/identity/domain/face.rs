use serde::{Deserialize, Serialize};

use crate::shared::geometry::BoundingBox;
use crate::tracking::domain::tracked_object::TrackId;

/// Outcome of running face detection + embedding on one person crop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FaceDetectionResult {
    Found {
        region: BoundingBox,
        embedding: Vec<f32>,
    },
    NotFound,
    Failed {
        reason: String,
    },
}

/// Face pipeline output for the current frame, optionally tied to the
/// person track it was cropped from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
    #[serde(flatten)]
    pub result: FaceDetectionResult,
}

/// A classified face in the current frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub region: BoundingBox,
    pub name: String,
    pub trusted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
}
