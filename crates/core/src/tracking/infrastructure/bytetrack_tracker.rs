use std::collections::HashSet;

use crate::shared::geometry::BoundingBox;
use crate::tracking::domain::object_tracker::{Detection, ObjectTracker};
use crate::tracking::domain::tracked_object::{TrackId, TrackedObject};

const HIGH_THRESH: f64 = 0.5;
const MATCH_THRESH: f64 = 0.3;

#[derive(Clone, Debug)]
struct TrackState {
    id: TrackId,
    bbox: BoundingBox,
    hits: usize,
    confirmed: bool,
    frames_lost: u32,
    matched: bool,
}

/// Simplified ByteTrack person tracker.
///
/// Two-stage association: high-confidence detections are matched first,
/// then low-confidence detections fill remaining unmatched tracks. Lost
/// tracks keep being reported (with their staleness) until `max_age`
/// frames pass, leaving noise filtering to the event detector.
pub struct ByteTracker {
    tracks: Vec<TrackState>,
    next_id: TrackId,
    max_age: usize,
    n_init: usize,
    min_score: f64,
}

impl ByteTracker {
    /// `min_score` drops detections before association; it is where the
    /// configured confidence threshold takes effect.
    pub fn new(max_age: usize, n_init: usize, min_score: f64) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_age,
            n_init: n_init.max(1),
            min_score,
        }
    }

    fn reset_match_flags(&mut self) {
        for track in &mut self.tracks {
            track.matched = false;
        }
    }

    fn match_high_confidence(&mut self, high: &[(usize, &Detection)]) -> HashSet<usize> {
        let track_refs: Vec<(usize, BoundingBox)> = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.bbox))
            .collect();

        let mut matched_det_indices = HashSet::new();
        for (ti, di, bbox) in greedy_match(&track_refs, high, MATCH_THRESH) {
            self.apply_match(ti, bbox);
            matched_det_indices.insert(di);
        }
        matched_det_indices
    }

    fn match_low_confidence(&mut self, low: &[(usize, &Detection)]) {
        let unmatched_refs: Vec<(usize, BoundingBox)> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.matched)
            .map(|(i, t)| (i, t.bbox))
            .collect();

        for (ti, _, bbox) in greedy_match(&unmatched_refs, low, MATCH_THRESH) {
            self.apply_match(ti, bbox);
        }
    }

    fn apply_match(&mut self, track_idx: usize, bbox: BoundingBox) {
        let n_init = self.n_init;
        let track = &mut self.tracks[track_idx];
        track.bbox = bbox;
        track.frames_lost = 0;
        track.matched = true;
        track.hits += 1;
        if track.hits >= n_init {
            track.confirmed = true;
        }
    }

    fn create_new_tracks(&mut self, high: &[(usize, &Detection)], matched: &HashSet<usize>) {
        for (di, det) in high {
            if !matched.contains(di) {
                self.tracks.push(TrackState {
                    id: self.next_id,
                    bbox: det.bbox,
                    hits: 1,
                    confirmed: self.n_init <= 1,
                    frames_lost: 0,
                    matched: true,
                });
                self.next_id += 1;
            }
        }
    }

    /// Unmatched tracks age; unconfirmed tracks die on their first miss.
    fn age_unmatched_tracks(&mut self, num_existing: usize) {
        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
            }
        }
        let max_age = self.max_age as u32;
        self.tracks
            .retain(|t| t.frames_lost <= max_age && (t.confirmed || t.frames_lost == 0));
    }

    fn snapshot(&self) -> Vec<TrackedObject> {
        self.tracks
            .iter()
            .map(|t| TrackedObject {
                track_id: t.id,
                bbox: t.bbox,
                confirmed: t.confirmed,
                staleness: t.frames_lost,
            })
            .collect()
    }
}

impl ObjectTracker for ByteTracker {
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        let usable: Vec<(usize, &Detection)> = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.score >= self.min_score && d.bbox.is_well_formed())
            .collect();
        let (high, low): (Vec<_>, Vec<_>) =
            usable.into_iter().partition(|(_, d)| d.score >= HIGH_THRESH);

        self.reset_match_flags();
        let num_existing = self.tracks.len();
        let matched_high = self.match_high_confidence(&high);
        self.match_low_confidence(&low);
        self.create_new_tracks(&high, &matched_high);
        self.age_unmatched_tracks(num_existing);

        self.snapshot()
    }

    fn reset(&mut self) {
        self.tracks.clear();
    }

    fn set_min_score(&mut self, min_score: f64) {
        self.min_score = min_score;
    }
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track/detection
/// used at most once. Yields `(track_idx, det_idx, det_bbox)`.
fn greedy_match(
    tracks: &[(usize, BoundingBox)],
    dets: &[(usize, &Detection)],
    thresh: f64,
) -> Vec<(usize, usize, BoundingBox)> {
    let mut pairs: Vec<(usize, usize, BoundingBox, f64)> = Vec::new();
    for (ti, bbox) in tracks {
        for (di, det) in dets {
            let score = bbox.iou(&det.bbox);
            if score >= thresh {
                pairs.push((*ti, *di, det.bbox, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, bbox, _) in pairs {
        if !used_tracks.contains(&ti) && !used_dets.contains(&di) {
            used_tracks.insert(ti);
            used_dets.insert(di);
            matches.push((ti, di, bbox));
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> Detection {
        Detection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            score,
        }
    }

    fn tracker() -> ByteTracker {
        ByteTracker::new(5, 1, 0.1)
    }

    #[test]
    fn test_new_detections_get_unique_ids() {
        let mut tracker = tracker();
        let tracks = tracker.update(&[
            det(0.0, 0.0, 50.0, 50.0, 0.9),
            det(100.0, 100.0, 150.0, 150.0, 0.8),
        ]);
        assert_eq!(tracks.len(), 2);
        assert_ne!(tracks[0].track_id, tracks[1].track_id);
        assert!(tracks.iter().all(|t| t.confirmed && t.staleness == 0));
    }

    #[test]
    fn test_consistent_id_across_frames() {
        let mut tracker = tracker();
        let id = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;

        let t2 = tracker.update(&[det(12.0, 12.0, 62.0, 62.0, 0.9)]);
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].track_id, id);
    }

    #[test]
    fn test_lost_track_reported_with_staleness() {
        let mut tracker = tracker();
        tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)]);

        let t = tracker.update(&[]);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].staleness, 1);
        let t = tracker.update(&[]);
        assert_eq!(t[0].staleness, 2);
    }

    #[test]
    fn test_lost_track_removed_after_max_age() {
        let mut tracker = ByteTracker::new(2, 1, 0.1);
        tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)]);

        tracker.update(&[]);
        tracker.update(&[]);
        assert!(tracker.update(&[]).is_empty());
    }

    #[test]
    fn test_track_recovers_within_max_age() {
        let mut tracker = ByteTracker::new(3, 1, 0.1);
        let id = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;

        tracker.update(&[]);
        tracker.update(&[]);

        let t2 = tracker.update(&[det(12.0, 12.0, 62.0, 62.0, 0.9)]);
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].track_id, id);
        assert_eq!(t2[0].staleness, 0);
    }

    #[test]
    fn test_n_init_delays_confirmation() {
        let mut tracker = ByteTracker::new(5, 2, 0.1);
        let t1 = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)]);
        assert!(!t1[0].confirmed);
        let t2 = tracker.update(&[det(11.0, 11.0, 61.0, 61.0, 0.9)]);
        assert!(t2[0].confirmed);
    }

    #[test]
    fn test_unconfirmed_track_dies_on_first_miss() {
        let mut tracker = ByteTracker::new(5, 3, 0.1);
        tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)]);
        assert!(tracker.update(&[]).is_empty());
    }

    #[test]
    fn test_low_confidence_matches_existing_track() {
        let mut tracker = tracker();
        let id = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;

        let t2 = tracker.update(&[det(12.0, 12.0, 62.0, 62.0, 0.3)]);
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].track_id, id);
        assert_eq!(t2[0].staleness, 0);
    }

    #[test]
    fn test_low_confidence_does_not_start_new_track() {
        let mut tracker = tracker();
        assert!(tracker
            .update(&[det(10.0, 10.0, 60.0, 60.0, 0.3)])
            .is_empty());
    }

    #[test]
    fn test_min_score_filters_detections() {
        let mut tracker = ByteTracker::new(5, 1, 0.95);
        assert!(tracker
            .update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])
            .is_empty());
    }

    #[test]
    fn test_reset_drops_tracks_but_not_id_sequence() {
        let mut tracker = tracker();
        let first = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;
        tracker.reset();
        assert!(tracker.update(&[]).is_empty());
        let second = tracker.update(&[det(10.0, 10.0, 60.0, 60.0, 0.9)])[0].track_id;
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_frame() {
        let mut tracker = tracker();
        assert!(tracker.update(&[]).is_empty());
    }
}
