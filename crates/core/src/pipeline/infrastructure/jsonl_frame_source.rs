use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::identity::domain::face::FaceObservation;
use crate::pipeline::domain::frame_source::{
    FrameInput, FrameObjects, FrameRecord, FrameSource, SourceError,
};
use crate::shared::frame::Frame;
use crate::tracking::domain::object_tracker::Detection;
use crate::tracking::domain::tracked_object::TrackedObject;

/// One line of a recording.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    tracks: Option<Vec<TrackedObject>>,
    #[serde(default)]
    detections: Option<Vec<Detection>>,
    #[serde(default)]
    faces: Option<Vec<FaceObservation>>,
    /// Frame pixels, relative to the recording's directory.
    #[serde(default)]
    image: Option<PathBuf>,
}

/// Replays a recorded stream stored as JSON lines, one frame per line.
///
/// Missing timestamps are derived from the frame index and `fps`.
/// Blank lines are skipped. A frame image that cannot be loaded is logged
/// and the record is replayed without pixels.
pub struct JsonLinesFrameSource {
    fps: f64,
    reader: Option<BufReader<File>>,
    base_dir: PathBuf,
    line: usize,
    index: usize,
}

impl JsonLinesFrameSource {
    pub fn new(fps: f64) -> Self {
        Self {
            fps: if fps.is_finite() && fps > 0.0 { fps } else { 1.0 },
            reader: None,
            base_dir: PathBuf::new(),
            line: 0,
            index: 0,
        }
    }

    fn next_record(&mut self) -> Option<Result<FrameRecord, SourceError>> {
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return Some(Err(SourceError::NotOpen)),
        };

        let mut buf = String::new();
        loop {
            buf.clear();
            let read = match reader.read_line(&mut buf) {
                Ok(n) => n,
                Err(source) => {
                    return Some(Err(SourceError::Io {
                        path: self.base_dir.clone(),
                        source,
                    }))
                }
            };
            if read == 0 {
                return None;
            }
            self.line += 1;
            if !buf.trim().is_empty() {
                break;
            }
        }

        let truncated = !buf.ends_with('\n');
        let raw: RawRecord = match serde_json::from_str(buf.trim()) {
            Ok(raw) => raw,
            Err(_) if truncated && self.index > 0 => {
                return Some(Err(SourceError::Interrupted(self.index - 1)))
            }
            Err(e) => {
                return Some(Err(SourceError::Malformed {
                    line: self.line,
                    reason: e.to_string(),
                }))
            }
        };
        Some(self.build(raw))
    }

    fn build(&mut self, raw: RawRecord) -> Result<FrameRecord, SourceError> {
        let objects = match (raw.tracks, raw.detections) {
            (Some(_), Some(_)) => {
                return Err(SourceError::Malformed {
                    line: self.line,
                    reason: "record has both `tracks` and `detections`".to_string(),
                })
            }
            (Some(tracks), None) => FrameObjects::Tracked(tracks),
            (None, Some(detections)) => FrameObjects::Detections(detections),
            (None, None) => FrameObjects::default(),
        };

        let index = self.index;
        let frame = raw.image.and_then(|rel| {
            load_frame(&self.base_dir.join(rel), index)
                .map_err(|e| log::warn!("Line {}: {e}; continuing without pixels", self.line))
                .ok()
        });
        self.index += 1;

        Ok(FrameRecord {
            index,
            input: FrameInput {
                timestamp: raw.timestamp.unwrap_or(index as f64 / self.fps),
                objects,
                faces: raw.faces,
                frame,
            },
        })
    }
}

impl FrameSource for JsonLinesFrameSource {
    fn open(&mut self, path: &Path) -> Result<(), SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.reader = Some(BufReader::new(file));
        self.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.line = 0;
        self.index = 0;
        log::info!("Opened recording {}", path.display());
        Ok(())
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<FrameRecord, SourceError>> + '_> {
        Box::new(std::iter::from_fn(move || self.next_record()))
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

fn load_frame(path: &Path, index: usize) -> Result<Frame, SourceError> {
    let img = image::open(path)
        .map_err(|source| SourceError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, index))
}
