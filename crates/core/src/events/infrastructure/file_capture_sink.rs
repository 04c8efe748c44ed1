use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::events::domain::capture::{CaptureRequest, CaptureSink};
use crate::identity::domain::identity_store::{IdentityStore, StoreError};
use crate::shared::frame::Frame;
use crate::tracking::domain::tracked_object::TrackId;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to write capture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode capture: {0}")]
    Image(#[from] image::ImageError),
    #[error("frame buffer does not match its dimensions")]
    BadFrame,
    #[error("face region for track {0} lies outside the frame")]
    EmptyCrop(TrackId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Saves capture requests as JPEG files in a directory.
///
/// Unknown faces are cropped to their region and logged in the identity
/// store; loitering captures keep the whole frame.
pub struct FileCaptureSink {
    dir: PathBuf,
    store: Option<Box<dyn IdentityStore>>,
}

impl FileCaptureSink {
    pub fn new(dir: impl Into<PathBuf>, store: Option<Box<dyn IdentityStore>>) -> Self {
        Self {
            dir: dir.into(),
            store,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, prefix: &str, track_id: TrackId) -> PathBuf {
        self.dir
            .join(format!("{prefix}_{track_id}_{}.jpg", unix_millis()))
    }

    fn save(&self, frame: &Frame, path: &Path) -> Result<(), CaptureError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CaptureError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or(CaptureError::BadFrame)?;
        img.save(path)?;
        Ok(())
    }

    fn capture_request(
        &mut self,
        request: &CaptureRequest,
        frame: &Frame,
    ) -> Result<PathBuf, CaptureError> {
        match request {
            CaptureRequest::UnknownFace {
                track_id, region, ..
            } => {
                let crop = frame.crop(region).ok_or(CaptureError::EmptyCrop(*track_id))?;
                let path = self.file_path("face", *track_id);
                self.save(&crop, &path)?;
                if let Some(store) = self.store.as_mut() {
                    let id = store.log_capture(&path)?;
                    log::debug!("Logged capture {id} for track {track_id}");
                }
                Ok(path)
            }
            CaptureRequest::Loitering { track_id, .. } => {
                let path = self.file_path("loitering", *track_id);
                self.save(frame, &path)?;
                Ok(path)
            }
        }
    }
}

impl CaptureSink for FileCaptureSink {
    fn capture(
        &mut self,
        request: &CaptureRequest,
        frame: Option<&Frame>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
        let Some(frame) = frame else {
            log::debug!(
                "No pixels for track {} capture; skipping",
                request.track_id()
            );
            return Ok(None);
        };
        let path = self.capture_request(request, frame)?;
        log::info!("Saved capture {}", path.display());
        Ok(Some(path))
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
