use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::identity::domain::face::FaceObservation;
use crate::shared::frame::Frame;
use crate::tracking::domain::object_tracker::Detection;
use crate::tracking::domain::tracked_object::TrackedObject;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("failed to load frame image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("source is not open")]
    NotOpen,
    #[error("stream ended unexpectedly after frame {0}")]
    Interrupted(usize),
}

/// People in a frame, either already tracked upstream or as raw
/// detections that still need a tracker.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameObjects {
    Tracked(Vec<TrackedObject>),
    Detections(Vec<Detection>),
}

impl Default for FrameObjects {
    fn default() -> Self {
        FrameObjects::Tracked(Vec::new())
    }
}

/// Everything the monitor consumes for one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    /// Stream time in seconds.
    pub timestamp: f64,
    pub objects: FrameObjects,
    /// `None` when the face pipeline did not run for this frame.
    pub faces: Option<Vec<FaceObservation>>,
    /// Pixels, when available, for evidence captures.
    pub frame: Option<Frame>,
}

#[derive(Clone, Debug)]
pub struct FrameRecord {
    pub index: usize,
    pub input: FrameInput,
}

/// Yields recorded or live frames for one camera stream.
///
/// A source error is an upstream failure: the stream cannot continue.
pub trait FrameSource: Send {
    fn open(&mut self, path: &Path) -> Result<(), SourceError>;

    /// Frames in stream order.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<FrameRecord, SourceError>> + '_>;

    fn close(&mut self);
}
