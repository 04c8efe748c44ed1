use serde::{Deserialize, Serialize};

use crate::shared::geometry::BoundingBox;

use super::tracked_object::TrackedObject;

/// A person detection handed to the tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f64,
}

/// Domain interface for the multi-object tracker.
///
/// Implementations are stateful across frames, hence `&mut self`.
pub trait ObjectTracker: Send {
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject>;

    /// Drops every track, e.g. when the video source changes.
    fn reset(&mut self);

    /// Detections scoring below this are ignored. Default: no-op.
    fn set_min_score(&mut self, _min_score: f64) {}
}
