use std::sync::Arc;

use super::face::{FaceDetectionResult, FaceMatch, FaceObservation};
use super::identity_matcher::match_identity;
use super::reference_identity::ReferenceIdentity;

/// Classifies face-pipeline observations against the reference set.
///
/// The reference set is shared read-only between camera sessions.
pub struct FaceRecognizer {
    references: Arc<[ReferenceIdentity]>,
    threshold: f64,
}

impl FaceRecognizer {
    pub fn new(references: Arc<[ReferenceIdentity]>, threshold: f64) -> Self {
        Self {
            references,
            threshold,
        }
    }

    pub fn set_references(&mut self, references: Arc<[ReferenceIdentity]>) {
        self.references = references;
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Faces that were not found are dropped silently; failed detections
    /// are logged and dropped for this frame only.
    pub fn recognize(&self, observations: &[FaceObservation]) -> Vec<FaceMatch> {
        observations
            .iter()
            .filter_map(|obs| match &obs.result {
                FaceDetectionResult::Found { region, embedding } => {
                    let outcome = match_identity(embedding, &self.references, self.threshold);
                    Some(FaceMatch {
                        region: *region,
                        name: outcome.name,
                        trusted: outcome.trusted,
                        track_id: obs.track_id,
                    })
                }
                FaceDetectionResult::NotFound => None,
                FaceDetectionResult::Failed { reason } => {
                    log::warn!(
                        "Face analysis failed for track {:?}: {reason}",
                        obs.track_id
                    );
                    None
                }
            })
            .collect()
    }
}
