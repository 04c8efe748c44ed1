use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::geometry::{BoundingBox, Zone};
use crate::tracking::domain::tracked_object::TrackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Trespassing,
    Loitering,
    Crowd,
    UntrustedFace,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::Trespassing,
        AlertKind::Loitering,
        AlertKind::Crowd,
        AlertKind::UntrustedFace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Trespassing => "trespassing",
            AlertKind::Loitering => "loitering",
            AlertKind::Crowd => "crowd",
            AlertKind::UntrustedFace => "untrusted_face",
        }
    }

    /// Overlay caption shown while the condition holds.
    pub fn caption(&self) -> &'static str {
        match self {
            AlertKind::Trespassing => "Trespassing Alert!",
            AlertKind::Loitering => "Loitering Alert!",
            AlertKind::Crowd => "Crowd Alert!",
            AlertKind::UntrustedFace => "Untrusted Face Alert!",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame alert conditions. Recomputed every frame, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAlertSummary {
    pub count: usize,
    pub trespassing: bool,
    pub loitering: bool,
    pub crowd: bool,
    pub untrusted_face: bool,
}

impl FrameAlertSummary {
    pub fn is_active(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::Trespassing => self.trespassing,
            AlertKind::Loitering => self.loitering,
            AlertKind::Crowd => self.crowd,
            AlertKind::UntrustedFace => self.untrusted_face,
        }
    }

    pub fn active_kinds(&self) -> impl Iterator<Item = AlertKind> + '_ {
        AlertKind::ALL.into_iter().filter(move |k| self.is_active(*k))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectOverlay {
    pub track_id: TrackId,
    pub bbox: BoundingBox,
    pub trespassing: bool,
    pub loitering: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceOverlay {
    pub region: BoundingBox,
    pub label: String,
    pub trusted: bool,
}

/// Everything an external renderer needs to annotate the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameOverlays {
    /// Present only while trespassing detection is enabled.
    pub zone: Option<Zone>,
    pub objects: Vec<ObjectOverlay>,
    pub faces: Vec<FaceOverlay>,
    /// Status lines, top to bottom. Always mirrors the current summary,
    /// regardless of notification cooldowns.
    pub alert_lines: Vec<String>,
}

impl FrameOverlays {
    pub fn alert_lines_for(summary: &FrameAlertSummary) -> Vec<String> {
        let mut lines = vec![format!("People Count: {}", summary.count)];
        for kind in [
            AlertKind::Crowd,
            AlertKind::Loitering,
            AlertKind::Trespassing,
            AlertKind::UntrustedFace,
        ] {
            if summary.is_active(kind) {
                lines.push(kind.caption().to_string());
            }
        }
        lines
    }
}
