use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::events::domain::frame_alerts::{AlertKind, FrameAlertSummary};

/// A notification the gate decided to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredAlert {
    pub kind: AlertKind,
    pub message: String,
}

/// Per-kind notification rate limiter.
///
/// A kind fires when its condition is true and strictly more than the
/// cooldown has passed since it last fired (or it never fired). Cooling
/// down is purely time-based, so a condition that stays true re-fires
/// once per window. Display state is unaffected by the gate.
pub struct AlertGate {
    cooldown: Duration,
    last_fired: HashMap<AlertKind, Instant>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    pub fn is_cooling_down(&self, kind: AlertKind, now: Instant) -> bool {
        self.last_fired
            .get(&kind)
            .is_some_and(|fired| now.saturating_duration_since(*fired) <= self.cooldown)
    }

    /// Decides which of the frame's active conditions to notify about and
    /// records their fire time.
    pub fn evaluate(&mut self, summary: &FrameAlertSummary, now: Instant) -> Vec<FiredAlert> {
        let mut fired = Vec::new();
        for kind in summary.active_kinds() {
            if self.is_cooling_down(kind, now) {
                log::trace!("Suppressing {kind} alert during cooldown");
                continue;
            }
            self.last_fired.insert(kind, now);
            fired.push(FiredAlert {
                kind,
                message: alert_message(kind, summary),
            });
        }
        fired
    }
}

pub fn alert_message(kind: AlertKind, summary: &FrameAlertSummary) -> String {
    match kind {
        AlertKind::Trespassing => {
            "🚨 TRESPASSING ALERT! Person detected in restricted zone.".to_string()
        }
        AlertKind::Loitering => "⚠️ LOITERING ALERT! Suspicious activity detected.".to_string(),
        AlertKind::Crowd => format!(
            "👥 CROWD ALERT! High traffic detected. Count: {}",
            summary.count
        ),
        AlertKind::UntrustedFace => {
            "👤 UNTRUSTED FACE ALERT! Unrecognized individual detected.".to_string()
        }
    }
}
