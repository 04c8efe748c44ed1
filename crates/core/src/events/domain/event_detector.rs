use std::collections::{HashMap, HashSet};

use crate::identity::domain::face::FaceMatch;
use crate::shared::geometry::in_zone;
use crate::shared::settings::MonitorSettings;
use crate::tracking::domain::track_history::TrackHistory;
use crate::tracking::domain::tracked_object::{TrackId, TrackedObject};

use super::capture::CaptureRequest;
use super::frame_alerts::{FaceOverlay, FrameAlertSummary, FrameOverlays, ObjectOverlay};

/// Detector output for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameEvaluation {
    pub summary: FrameAlertSummary,
    pub overlays: FrameOverlays,
    pub captures: Vec<CaptureRequest>,
}

/// Stateful per-stream event logic.
///
/// Owns the track history, the loitering flags and the set of tracks whose
/// evidence was already saved. One instance per camera stream; frames must
/// be fed in order.
///
/// Capture requests repeat every frame until the caller confirms a save
/// with [`EventDetector::mark_captured`].
pub struct EventDetector {
    settings: MonitorSettings,
    history: TrackHistory,
    loitering_flags: HashSet<TrackId>,
    loitering_captured: HashSet<TrackId>,
    /// Tracks with a captured unknown face, mapped to when they were last seen.
    captured_faces: HashMap<TrackId, f64>,
}

impl EventDetector {
    pub fn new(settings: MonitorSettings) -> Self {
        let history = TrackHistory::new(settings.history);
        Self {
            settings,
            history,
            loitering_flags: HashSet::new(),
            loitering_captured: HashSet::new(),
            captured_faces: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Takes effect from the next frame; accumulated state is kept.
    pub fn set_settings(&mut self, settings: MonitorSettings) {
        self.history.set_retention(settings.history);
        self.settings = settings;
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    pub fn is_loitering(&self, track_id: TrackId) -> bool {
        self.loitering_flags.contains(&track_id)
    }

    pub fn is_captured(&self, request: &CaptureRequest) -> bool {
        match request {
            CaptureRequest::UnknownFace { track_id, .. } => {
                self.captured_faces.contains_key(track_id)
            }
            CaptureRequest::Loitering { track_id, .. } => {
                self.loitering_captured.contains(track_id)
            }
        }
    }

    /// Records that the evidence for `request` was saved, which stops
    /// further requests of that kind for the track.
    pub fn mark_captured(&mut self, request: &CaptureRequest) {
        match *request {
            CaptureRequest::UnknownFace {
                track_id,
                timestamp,
                ..
            } => {
                self.captured_faces.insert(track_id, timestamp);
            }
            CaptureRequest::Loitering { track_id, .. } => {
                self.loitering_captured.insert(track_id);
            }
        }
    }

    /// Forgets every track, e.g. when the video source changes.
    pub fn reset(&mut self) {
        self.history.clear();
        self.loitering_flags.clear();
        self.loitering_captured.clear();
        self.captured_faces.clear();
    }

    /// Evaluates one frame.
    ///
    /// `faces` is `None` when the face pipeline did not run for this frame,
    /// which disables untrusted-face detection for the frame.
    pub fn evaluate(
        &mut self,
        objects: &[TrackedObject],
        timestamp: f64,
        faces: Option<&[FaceMatch]>,
    ) -> FrameEvaluation {
        let settings = &self.settings;
        let zone = settings.trespassing_zone;
        let mut summary = FrameAlertSummary::default();
        let mut overlays = FrameOverlays {
            zone: settings.trespassing_enabled.then_some(zone),
            ..Default::default()
        };
        let mut captures = Vec::new();

        let survivors: Vec<&TrackedObject> = objects
            .iter()
            .filter(|o| o.is_reportable())
            .filter(|o| {
                let ok = o.bbox.is_well_formed();
                if !ok {
                    log::warn!(
                        "Skipping track {} with malformed box {:?}",
                        o.track_id,
                        <[f64; 4]>::from(o.bbox)
                    );
                }
                ok
            })
            .collect();
        summary.count = survivors.len();

        for obj in &survivors {
            let id = obj.track_id;
            let trespassing =
                settings.trespassing_enabled && in_zone(obj.bbox.trespass_point(), &zone);
            summary.trespassing |= trespassing;

            if settings.loitering_enabled {
                self.history.record(id, timestamp, obj.bbox.center());
                let duration = self.history.duration(id, timestamp);
                if duration > settings.loitering_threshold_seconds {
                    summary.loitering = true;
                    if self.loitering_flags.insert(id) {
                        log::info!("Track {id} loitering for {duration:.1}s");
                    }
                    if !self.loitering_captured.contains(&id) {
                        captures.push(CaptureRequest::Loitering {
                            track_id: id,
                            bbox: obj.bbox,
                            timestamp,
                            duration,
                        });
                    }
                }
            }

            if let Some(last_seen) = self.captured_faces.get_mut(&id) {
                *last_seen = timestamp;
            }
            overlays.objects.push(ObjectOverlay {
                track_id: id,
                bbox: obj.bbox,
                trespassing,
                loitering: self.loitering_flags.contains(&id),
            });
        }

        summary.crowd = settings.crowd_enabled && summary.count > settings.crowd_threshold_count;

        if let Some(faces) = faces {
            for face in faces {
                overlays.faces.push(FaceOverlay {
                    region: face.region,
                    label: face.name.clone(),
                    trusted: face.trusted,
                });
                if face.trusted {
                    continue;
                }
                summary.untrusted_face = true;

                let owner = face.track_id.or_else(|| {
                    let center = face.region.center();
                    survivors
                        .iter()
                        .find(|o| o.bbox.contains(center))
                        .map(|o| o.track_id)
                });
                match owner {
                    Some(track_id)
                        if !self.captured_faces.contains_key(&track_id)
                            && !requested_face(&captures, track_id) =>
                    {
                        captures.push(CaptureRequest::UnknownFace {
                            track_id,
                            region: face.region,
                            timestamp,
                        });
                    }
                    Some(_) => {}
                    None => log::debug!("Unknown face at {:?} has no owning track", face.region),
                }
            }
        }

        self.evict_idle(timestamp);

        overlays.alert_lines = FrameOverlays::alert_lines_for(&summary);
        FrameEvaluation {
            summary,
            overlays,
            captures,
        }
    }

    fn evict_idle(&mut self, now: f64) {
        for id in self.history.evict_idle(now) {
            self.loitering_flags.remove(&id);
            self.loitering_captured.remove(&id);
        }
        let window = self.settings.history.idle_eviction_seconds;
        self.captured_faces
            .retain(|_, last_seen| now - *last_seen <= window);
    }
}

fn requested_face(captures: &[CaptureRequest], track_id: TrackId) -> bool {
    captures.iter().any(|c| {
        matches!(c, CaptureRequest::UnknownFace { track_id: t, .. } if *t == track_id)
    })
}
