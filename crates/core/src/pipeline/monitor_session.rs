use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alerts::domain::alert_gate::{AlertGate, FiredAlert};
use crate::alerts::domain::notifier::Notifier;
use crate::alerts::infrastructure::notification_dispatcher::{
    DispatchOutcome, NotificationDispatcher,
};
use crate::events::domain::capture::CaptureSink;
use crate::events::domain::event_detector::EventDetector;
use crate::events::domain::frame_alerts::{FrameAlertSummary, FrameOverlays};
use crate::identity::domain::face_recognizer::FaceRecognizer;
use crate::identity::domain::reference_identity::ReferenceIdentity;
use crate::shared::settings::{MonitorSettings, SettingsError};
use crate::tracking::domain::object_tracker::ObjectTracker;
use crate::tracking::domain::tracked_object::TrackedObject;

use super::domain::frame_source::{FrameInput, FrameObjects};

/// What the session produced for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub timestamp: f64,
    /// Current conditions for display, independent of notification cooldown.
    pub summary: FrameAlertSummary,
    pub overlays: FrameOverlays,
    /// Alerts handed to the notifier this frame.
    pub fired: Vec<FiredAlert>,
    pub captures: Vec<PathBuf>,
}

/// One camera's monitoring pipeline.
///
/// Frames flow `tracker → face recognition → event detection → alert gate`,
/// with evidence captures and notifications as side effects. Sessions share
/// only the read-only reference set.
pub struct MonitorSession {
    detector: EventDetector,
    gate: AlertGate,
    tracker: Option<Box<dyn ObjectTracker>>,
    recognizer: FaceRecognizer,
    capture_sink: Box<dyn CaptureSink>,
    dispatcher: NotificationDispatcher,
    warned_untracked: bool,
}

impl MonitorSession {
    pub fn new(
        settings: MonitorSettings,
        references: Vec<ReferenceIdentity>,
        mut tracker: Option<Box<dyn ObjectTracker>>,
        capture_sink: Box<dyn CaptureSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        if let Some(t) = tracker.as_mut() {
            t.set_min_score(settings.confidence_threshold);
        }
        let recognizer = FaceRecognizer::new(references.into(), settings.identity_match_threshold);
        Self {
            gate: AlertGate::new(cooldown(&settings)),
            detector: EventDetector::new(settings),
            tracker,
            recognizer,
            capture_sink,
            dispatcher: NotificationDispatcher::new(notifier),
            warned_untracked: false,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        self.detector.settings()
    }

    pub fn detector(&self) -> &EventDetector {
        &self.detector
    }

    pub fn process_frame(&mut self, input: FrameInput) -> FrameReport {
        self.process_frame_at(input, Instant::now())
    }

    /// Processes a frame with an explicit wall-clock instant for the alert
    /// gate. Stream time (`input.timestamp`) drives loitering; wall time
    /// drives notification cooldown.
    pub fn process_frame_at(&mut self, input: FrameInput, now: Instant) -> FrameReport {
        let objects = self.track(input.objects);
        let faces = input.faces.map(|obs| self.recognizer.recognize(&obs));

        let evaluation = self
            .detector
            .evaluate(&objects, input.timestamp, faces.as_deref());

        // Unsaved requests are repeated by the detector on later frames.
        let mut captures = Vec::new();
        for request in &evaluation.captures {
            match self.capture_sink.capture(request, input.frame.as_ref()) {
                Ok(Some(path)) => {
                    self.detector.mark_captured(request);
                    captures.push(path);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Capture for track {} failed: {e}", request.track_id()),
            }
        }

        let fired = self.gate.evaluate(&evaluation.summary, now);
        for alert in &fired {
            log::info!("{}", alert.message);
        }
        self.dispatcher.dispatch_all(fired.iter().cloned());

        FrameReport {
            timestamp: input.timestamp,
            summary: evaluation.summary,
            overlays: evaluation.overlays,
            fired,
            captures,
        }
    }

    fn track(&mut self, objects: FrameObjects) -> Vec<TrackedObject> {
        match objects {
            FrameObjects::Tracked(tracked) => tracked,
            FrameObjects::Detections(detections) => match self.tracker.as_mut() {
                Some(tracker) => tracker.update(&detections),
                None => {
                    if !self.warned_untracked {
                        log::warn!(
                            "Received raw detections but no tracker is configured; ignoring them"
                        );
                        self.warned_untracked = true;
                    }
                    Vec::new()
                }
            },
        }
    }

    /// Starts a new video source: per-track state and the tracker are
    /// cleared and the reference set is refreshed. Alert cooldowns carry
    /// over so a reconnect cannot cause a notification burst.
    pub fn restart_stream(&mut self, references: Vec<ReferenceIdentity>) {
        self.detector.reset();
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.reset();
        }
        self.recognizer.set_references(references.into());
        log::info!(
            "Stream restarted with {} reference identities",
            self.recognizer.reference_count()
        );
    }

    /// Applies new settings from the next frame on. Accumulated track
    /// state is kept.
    pub fn update_settings(&mut self, settings: MonitorSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.gate.set_cooldown(cooldown(&settings));
        self.recognizer.set_threshold(settings.identity_match_threshold);
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.set_min_score(settings.confidence_threshold);
        }
        self.detector.set_settings(settings);
        Ok(())
    }

    /// Merges a partial JSON update over the current settings and applies
    /// the result. Invalid updates leave the session unchanged.
    pub fn apply_settings_update(
        &mut self,
        update: &serde_json::Value,
    ) -> Result<(), SettingsError> {
        let mut settings = self.settings().clone();
        settings.apply_update(update)?;
        self.update_settings(settings)
    }

    /// Notification results that have arrived so far.
    pub fn drain_outcomes(&self) -> Vec<DispatchOutcome> {
        self.dispatcher.drain_outcomes()
    }

    /// Waits for in-flight notifications to finish.
    pub fn finish(&mut self) {
        self.dispatcher.wait();
    }
}

fn cooldown(settings: &MonitorSettings) -> Duration {
    Duration::try_from_secs_f64(settings.alert_cooldown_seconds).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::domain::notifier::NotifyError;
    use crate::events::domain::capture::{CaptureRequest, NullCaptureSink};
    use crate::events::domain::frame_alerts::AlertKind;
    use crate::identity::domain::face::{FaceDetectionResult, FaceObservation};
    use crate::shared::frame::Frame;
    use crate::shared::geometry::{BoundingBox, Zone};
    use crate::tracking::domain::object_tracker::Detection;
    use crate::tracking::infrastructure::bytetrack_tracker::ByteTracker;
    use std::sync::Mutex;

    // --- Stubs ---

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(AlertKind, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, kind: AlertKind, message: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push((kind, message.to_string()));
            Ok(())
        }
    }

    impl RecordingNotifier {
        fn kinds(&self) -> Vec<AlertKind> {
            self.sent.lock().unwrap().iter().map(|(k, _)| *k).collect()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        requests: Arc<Mutex<Vec<(CaptureRequest, bool)>>>,
    }

    impl CaptureSink for RecordingSink {
        fn capture(
            &mut self,
            request: &CaptureRequest,
            frame: Option<&Frame>,
        ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
            self.requests
                .lock()
                .unwrap()
                .push((request.clone(), frame.is_some()));
            Ok(frame.map(|_| PathBuf::from(format!("capture_{}.jpg", request.track_id()))))
        }
    }

    struct FailingSink;

    /// Fails the first `failures` captures, then records the rest.
    #[derive(Clone, Default)]
    struct FlakySink {
        failures: usize,
        inner: RecordingSink,
    }

    impl CaptureSink for FlakySink {
        fn capture(
            &mut self,
            request: &CaptureRequest,
            frame: Option<&Frame>,
        ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err("disk full".into());
            }
            self.inner.capture(request, frame)
        }
    }

    impl CaptureSink for FailingSink {
        fn capture(
            &mut self,
            _request: &CaptureRequest,
            _frame: Option<&Frame>,
        ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
            Err("disk full".into())
        }
    }

    // --- Helpers ---

    fn settings() -> MonitorSettings {
        MonitorSettings {
            crowd_threshold_count: 5,
            trespassing_zone: Zone::new(200.0, 300.0, 400.0, 450.0),
            ..Default::default()
        }
    }

    fn reference(name: &str, embedding: Vec<f32>) -> ReferenceIdentity {
        ReferenceIdentity {
            id: 1,
            name: name.to_string(),
            embedding,
            image_path: None,
        }
    }

    fn tracked(objects: Vec<TrackedObject>, timestamp: f64) -> FrameInput {
        FrameInput {
            timestamp,
            objects: FrameObjects::Tracked(objects),
            ..Default::default()
        }
    }

    fn person(id: u64, x: f64) -> TrackedObject {
        TrackedObject::new(id, BoundingBox::new(x, 0.0, x + 40.0, 100.0))
    }

    fn crowd_of(n: u64) -> Vec<TrackedObject> {
        (1..=n).map(|i| person(i, i as f64 * 50.0)).collect()
    }

    fn session(notifier: Arc<RecordingNotifier>) -> MonitorSession {
        MonitorSession::new(
            settings(),
            Vec::new(),
            None,
            Box::new(NullCaptureSink),
            notifier,
        )
    }

    // --- Tests ---

    #[test]
    fn test_notifier_fires_once_per_cooldown_window() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut session = session(notifier.clone());
        let t0 = Instant::now();

        for s in 0..15u64 {
            // Stream time stays below the loitering threshold.
            let report = session.process_frame_at(
                tracked(crowd_of(6), s as f64 * 0.1),
                t0 + Duration::from_secs(s),
            );
            assert!(report.summary.crowd, "display stays on at {s}s");
            assert!(report
                .overlays
                .alert_lines
                .contains(&"Crowd Alert!".to_string()));
        }
        session.finish();
        assert_eq!(notifier.kinds(), vec![AlertKind::Crowd]);

        let report =
            session.process_frame_at(tracked(crowd_of(6), 1.6), t0 + Duration::from_secs(16));
        assert_eq!(report.fired.len(), 1);
        session.finish();
        assert_eq!(notifier.kinds().len(), 2);
        assert_eq!(
            notifier.sent.lock().unwrap()[0].1,
            "👥 CROWD ALERT! High traffic detected. Count: 6"
        );
    }

    #[test]
    fn test_quiet_frames_do_not_notify() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut session = session(notifier.clone());
        let report = session.process_frame(tracked(vec![person(1, 0.0)], 0.0));
        session.finish();
        assert_eq!(report.summary.count, 1);
        assert!(report.fired.is_empty());
        assert!(notifier.kinds().is_empty());
    }

    #[test]
    fn test_restart_clears_tracks_but_keeps_cooldown() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut session = session(notifier.clone());
        let t0 = Instant::now();

        session.process_frame_at(tracked(vec![person(1, 0.0)], 0.0), t0);
        let report =
            session.process_frame_at(tracked(vec![person(1, 0.0)], 11.0), t0 + Duration::from_secs(1));
        assert!(report.summary.loitering);
        assert!(session.detector().is_loitering(1));

        session.restart_stream(Vec::new());
        assert!(!session.detector().is_loitering(1));
        assert!(session.detector().history().is_empty());

        // Same track id on the new stream starts from scratch.
        let report =
            session.process_frame_at(tracked(vec![person(1, 0.0)], 0.0), t0 + Duration::from_secs(2));
        assert!(!report.summary.loitering);

        // Loitering is still cooling down from before the restart.
        session.process_frame_at(tracked(vec![person(1, 0.0)], 0.0), t0 + Duration::from_secs(3));
        let report = session
            .process_frame_at(tracked(vec![person(1, 0.0)], 12.0), t0 + Duration::from_secs(4));
        assert!(report.summary.loitering);
        assert!(report.fired.is_empty());
        session.finish();
        assert_eq!(notifier.kinds(), vec![AlertKind::Loitering]);
    }

    #[test]
    fn test_update_settings_applies_next_frame() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut session = session(notifier);
        let t0 = Instant::now();

        let report = session.process_frame_at(tracked(crowd_of(3), 0.0), t0);
        assert!(!report.summary.crowd);

        let mut lower = settings();
        lower.crowd_threshold_count = 2;
        session.update_settings(lower).unwrap();

        let report = session.process_frame_at(tracked(crowd_of(3), 1.0), t0);
        assert!(report.summary.crowd);
        assert_eq!(session.settings().crowd_threshold_count, 2);
        // History survived the update.
        assert_eq!(session.detector().history().len(), 3);
    }

    #[test]
    fn test_partial_update_applies_to_session() {
        let mut session = session(Arc::new(RecordingNotifier::default()));
        session
            .apply_settings_update(&serde_json::json!({ "crowd_threshold_count": 2 }))
            .unwrap();
        let report = session.process_frame(tracked(crowd_of(3), 0.0));
        assert!(report.summary.crowd);

        assert!(session
            .apply_settings_update(&serde_json::json!({ "alert_cooldown_seconds": 0 }))
            .is_err());
        assert_eq!(session.settings().crowd_threshold_count, 2);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut session = session(Arc::new(RecordingNotifier::default()));
        let mut bad = settings();
        bad.alert_cooldown_seconds = -1.0;
        assert!(session.update_settings(bad).is_err());
        assert_eq!(session.settings().crowd_threshold_count, 5);
    }

    #[test]
    fn test_raw_detections_go_through_tracker() {
        let mut session = MonitorSession::new(
            settings(),
            Vec::new(),
            Some(Box::new(ByteTracker::new(30, 1, 0.15))),
            Box::new(NullCaptureSink),
            Arc::new(RecordingNotifier::default()),
        );
        let detections = vec![
            Detection {
                bbox: BoundingBox::new(250.0, 300.0, 350.0, 400.0),
                score: 0.9,
            },
            Detection {
                bbox: BoundingBox::new(0.0, 0.0, 40.0, 100.0),
                score: 0.05,
            },
        ];
        let report = session.process_frame(FrameInput {
            timestamp: 0.0,
            objects: FrameObjects::Detections(detections),
            ..Default::default()
        });
        assert_eq!(report.summary.count, 1);
        assert!(report.summary.trespassing);
    }

    #[test]
    fn test_detections_without_tracker_are_ignored() {
        let mut session = session(Arc::new(RecordingNotifier::default()));
        let report = session.process_frame(FrameInput {
            timestamp: 0.0,
            objects: FrameObjects::Detections(vec![Detection {
                bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                score: 0.9,
            }]),
            ..Default::default()
        });
        assert_eq!(report.summary.count, 0);
    }

    #[test]
    fn test_untrusted_face_is_captured_once_with_pixels() {
        let sink = RecordingSink::default();
        let mut session = MonitorSession::new(
            settings(),
            vec![reference("alice", vec![0.0, 0.0])],
            None,
            Box::new(sink.clone()),
            Arc::new(RecordingNotifier::default()),
        );
        let stranger = FaceObservation {
            track_id: Some(1),
            result: FaceDetectionResult::Found {
                region: BoundingBox::new(5.0, 5.0, 20.0, 20.0),
                embedding: vec![3.0, 4.0],
            },
        };
        let frame = Frame::new(vec![0; 64 * 64 * 3], 64, 64, 0);

        for t in 0..3 {
            let report = session.process_frame(FrameInput {
                timestamp: t as f64,
                objects: FrameObjects::Tracked(vec![person(1, 0.0)]),
                faces: Some(vec![stranger.clone()]),
                frame: Some(frame.clone()),
            });
            assert!(report.summary.untrusted_face);
            assert_eq!(report.overlays.faces[0].label, "Unknown");
            if t == 0 {
                assert_eq!(report.captures, vec![PathBuf::from("capture_1.jpg")]);
            } else {
                assert!(report.captures.is_empty());
            }
        }
        let requests = sink.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].1);
    }

    #[test]
    fn test_unknown_face_captured_once_pixels_arrive() {
        let sink = RecordingSink::default();
        let mut session = MonitorSession::new(
            settings(),
            vec![reference("alice", vec![0.0, 0.0])],
            None,
            Box::new(sink.clone()),
            Arc::new(RecordingNotifier::default()),
        );
        let stranger = FaceObservation {
            track_id: Some(1),
            result: FaceDetectionResult::Found {
                region: BoundingBox::new(5.0, 5.0, 20.0, 20.0),
                embedding: vec![3.0, 4.0],
            },
        };
        let frame = Frame::new(vec![0; 64 * 64 * 3], 64, 64, 0);
        let input = |t: f64, pixels: Option<Frame>| FrameInput {
            timestamp: t,
            objects: FrameObjects::Tracked(vec![person(1, 0.0)]),
            faces: Some(vec![stranger.clone()]),
            frame: pixels,
        };

        let report = session.process_frame(input(0.0, None));
        assert!(report.summary.untrusted_face);
        assert!(report.captures.is_empty());

        let report = session.process_frame(input(1.0, Some(frame.clone())));
        assert_eq!(report.captures, vec![PathBuf::from("capture_1.jpg")]);

        let report = session.process_frame(input(2.0, Some(frame)));
        assert!(report.captures.is_empty());

        let requests = sink.requests.lock().unwrap();
        let with_pixels: Vec<bool> = requests.iter().map(|(_, pixels)| *pixels).collect();
        assert_eq!(with_pixels, vec![false, true]);
    }

    #[test]
    fn test_loitering_capture_retried_after_sink_error() {
        let sink = FlakySink {
            failures: 1,
            ..Default::default()
        };
        let recorded = sink.inner.requests.clone();
        let mut session = MonitorSession::new(
            settings(),
            Vec::new(),
            None,
            Box::new(sink),
            Arc::new(RecordingNotifier::default()),
        );
        let frame = Frame::new(vec![0; 64 * 64 * 3], 64, 64, 0);
        let input = |t: f64| FrameInput {
            timestamp: t,
            objects: FrameObjects::Tracked(vec![person(1, 0.0)]),
            faces: None,
            frame: Some(frame.clone()),
        };

        session.process_frame(input(0.0));
        let report = session.process_frame(input(11.0));
        assert!(report.summary.loitering);
        assert!(report.captures.is_empty());

        let report = session.process_frame(input(12.0));
        assert_eq!(report.captures, vec![PathBuf::from("capture_1.jpg")]);
        let report = session.process_frame(input(13.0));
        assert!(report.captures.is_empty());
        assert!(session.detector().is_loitering(1));

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0].0, CaptureRequest::Loitering { track_id: 1, .. }));
    }

    #[test]
    fn test_trusted_face_does_not_alert() {
        let mut session = MonitorSession::new(
            settings(),
            vec![reference("alice", vec![0.0, 0.0])],
            None,
            Box::new(NullCaptureSink),
            Arc::new(RecordingNotifier::default()),
        );
        let report = session.process_frame(FrameInput {
            timestamp: 0.0,
            objects: FrameObjects::Tracked(vec![person(1, 0.0)]),
            faces: Some(vec![FaceObservation {
                track_id: Some(1),
                result: FaceDetectionResult::Found {
                    region: BoundingBox::new(5.0, 5.0, 20.0, 20.0),
                    embedding: vec![0.1, 0.1],
                },
            }]),
            frame: None,
        });
        assert!(!report.summary.untrusted_face);
        assert_eq!(report.overlays.faces[0].label, "alice");
    }

    #[test]
    fn test_capture_failure_does_not_stop_frame() {
        let mut session = MonitorSession::new(
            settings(),
            Vec::new(),
            None,
            Box::new(FailingSink),
            Arc::new(RecordingNotifier::default()),
        );
        session.process_frame(tracked(vec![person(1, 0.0)], 0.0));
        let report = session.process_frame(tracked(vec![person(1, 0.0)], 11.0));
        assert!(report.summary.loitering);
        assert!(report.captures.is_empty());
    }

    #[test]
    fn test_outcomes_are_drained_after_finish() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut session = session(notifier);
        session.process_frame(tracked(crowd_of(6), 0.0));
        session.finish();
        let outcomes = session.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_ok());
    }
}
