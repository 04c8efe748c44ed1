use std::collections::{HashMap, VecDeque};

use crate::shared::geometry::Point;
use crate::shared::settings::HistoryRetention;

use super::tracked_object::TrackId;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistorySample {
    pub timestamp: f64,
    pub point: Point,
}

#[derive(Debug)]
struct Timeline {
    first_seen: f64,
    last_seen: f64,
    samples: VecDeque<HistorySample>,
}

/// Per-track timeline of (timestamp, center) samples.
///
/// First-seen time is kept apart from the sample buffer, so trimming old
/// samples never changes a track's loitering duration.
pub struct TrackHistory {
    timelines: HashMap<TrackId, Timeline>,
    retention: HistoryRetention,
}

impl TrackHistory {
    pub fn new(retention: HistoryRetention) -> Self {
        Self {
            timelines: HashMap::new(),
            retention,
        }
    }

    pub fn set_retention(&mut self, retention: HistoryRetention) {
        self.retention = retention;
    }

    pub fn record(&mut self, track_id: TrackId, timestamp: f64, point: Point) {
        let max_samples = self.retention.max_samples_per_track.max(1);
        let timeline = self.timelines.entry(track_id).or_insert_with(|| Timeline {
            first_seen: timestamp,
            last_seen: timestamp,
            samples: VecDeque::new(),
        });
        timeline.last_seen = timeline.last_seen.max(timestamp);
        timeline.samples.push_back(HistorySample { timestamp, point });
        while timeline.samples.len() > max_samples {
            timeline.samples.pop_front();
        }
    }

    /// Seconds since `track_id` was first recorded; zero for unseen tracks.
    pub fn duration(&self, track_id: TrackId, timestamp: f64) -> f64 {
        self.timelines
            .get(&track_id)
            .map_or(0.0, |t| (timestamp - t.first_seen).max(0.0))
    }

    pub fn first_seen(&self, track_id: TrackId) -> Option<f64> {
        self.timelines.get(&track_id).map(|t| t.first_seen)
    }

    pub fn samples(&self, track_id: TrackId) -> Option<&VecDeque<HistorySample>> {
        self.timelines.get(&track_id).map(|t| &t.samples)
    }

    /// Removes tracks not recorded within the idle window ending at `now`
    /// and returns their ids.
    pub fn evict_idle(&mut self, now: f64) -> Vec<TrackId> {
        let window = self.retention.idle_eviction_seconds;
        let expired: Vec<TrackId> = self
            .timelines
            .iter()
            .filter(|(_, t)| now - t.last_seen > window)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.timelines.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    pub fn clear(&mut self) {
        self.timelines.clear();
    }
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new(HistoryRetention::default())
    }
}
