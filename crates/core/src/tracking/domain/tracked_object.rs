use serde::{Deserialize, Serialize};

use crate::shared::geometry::BoundingBox;

/// Stable identity assigned by the tracker. Never reused within a session.
pub type TrackId = u64;

/// One person as reported by the tracker for the current frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub track_id: TrackId,
    pub bbox: BoundingBox,
    /// Whether the tracker considers this identity stable.
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
    /// Frames since the last successful association.
    #[serde(default)]
    pub staleness: u32,
}

fn default_confirmed() -> bool {
    true
}

impl TrackedObject {
    pub fn new(track_id: TrackId, bbox: BoundingBox) -> Self {
        Self {
            track_id,
            bbox,
            confirmed: true,
            staleness: 0,
        }
    }

    /// Unconfirmed tracks that have also missed more than one frame are
    /// noise. A confirmed track that is briefly stale is kept to ride out
    /// detector misses.
    pub fn is_reportable(&self) -> bool {
        self.confirmed || self.staleness <= 1
    }
}
