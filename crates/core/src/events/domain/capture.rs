use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::geometry::BoundingBox;
use crate::tracking::domain::tracked_object::TrackId;

/// Evidence the event detector wants saved. Each request is emitted at
/// most once per track per stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureRequest {
    /// An unrecognized face, attributed to the track it belongs to.
    UnknownFace {
        track_id: TrackId,
        region: BoundingBox,
        timestamp: f64,
    },
    /// A track just crossed the loitering threshold.
    Loitering {
        track_id: TrackId,
        bbox: BoundingBox,
        timestamp: f64,
        duration: f64,
    },
}

impl CaptureRequest {
    pub fn track_id(&self) -> TrackId {
        match self {
            CaptureRequest::UnknownFace { track_id, .. }
            | CaptureRequest::Loitering { track_id, .. } => *track_id,
        }
    }
}

/// Persists capture requests.
///
/// Returns the saved image path, or `None` when nothing could be saved
/// (e.g. no pixels accompany the frame).
pub trait CaptureSink: Send {
    fn capture(
        &mut self,
        request: &CaptureRequest,
        frame: Option<&Frame>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>>;
}

/// Discards every request.
pub struct NullCaptureSink;

impl CaptureSink for NullCaptureSink {
    fn capture(
        &mut self,
        _request: &CaptureRequest,
        _frame: Option<&Frame>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
        Ok(None)
    }
}
