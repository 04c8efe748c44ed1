use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_ALERT_COOLDOWN_SECS, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_CROWD_THRESHOLD,
    DEFAULT_IDENTITY_MATCH_THRESHOLD, DEFAULT_IDLE_EVICTION_SECS, DEFAULT_LOITERING_THRESHOLD_SECS,
    DEFAULT_MAX_SAMPLES_PER_TRACK, DEFAULT_TRESPASSING_ZONE,
};
use super::geometry::Zone;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Retention policy for the per-track position history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRetention {
    pub max_samples_per_track: usize,
    pub idle_eviction_seconds: f64,
}

impl Default for HistoryRetention {
    fn default() -> Self {
        Self {
            max_samples_per_track: DEFAULT_MAX_SAMPLES_PER_TRACK,
            idle_eviction_seconds: DEFAULT_IDLE_EVICTION_SECS,
        }
    }
}

/// Option set for one monitoring pipeline.
///
/// Every field has a default so partial JSON files load cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub loitering_threshold_seconds: f64,
    pub crowd_threshold_count: usize,
    /// Passed through to the detector/tracker stage; not interpreted by
    /// the event logic.
    pub confidence_threshold: f64,
    pub trespassing_zone: Zone,
    pub trespassing_enabled: bool,
    pub loitering_enabled: bool,
    pub crowd_enabled: bool,
    pub identity_match_threshold: f64,
    pub alert_cooldown_seconds: f64,
    pub history: HistoryRetention,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            loitering_threshold_seconds: DEFAULT_LOITERING_THRESHOLD_SECS,
            crowd_threshold_count: DEFAULT_CROWD_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            trespassing_zone: Zone::from(DEFAULT_TRESPASSING_ZONE),
            trespassing_enabled: true,
            loitering_enabled: true,
            crowd_enabled: true,
            identity_match_threshold: DEFAULT_IDENTITY_MATCH_THRESHOLD,
            alert_cooldown_seconds: DEFAULT_ALERT_COOLDOWN_SECS,
            history: HistoryRetention::default(),
        }
    }
}

impl MonitorSettings {
    /// Platform config location: `<config dir>/Hawkeye/settings.json`.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|d| d.join("Hawkeye").join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(write_err)
    }

    /// Merges a partial JSON object over the current values, then validates.
    /// On error the current settings are left untouched.
    pub fn apply_update(&mut self, update: &serde_json::Value) -> Result<(), SettingsError> {
        let mut merged = serde_json::to_value(&*self)?;
        if let (Some(target), Some(patch)) = (merged.as_object_mut(), update.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        } else {
            return Err(SettingsError::Invalid {
                field: "update",
                reason: "expected a JSON object".to_string(),
            });
        }
        let candidate: Self = serde_json::from_value(merged)?;
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        non_negative("loitering_threshold_seconds", self.loitering_threshold_seconds)?;
        non_negative("identity_match_threshold", self.identity_match_threshold)?;
        non_negative("history.idle_eviction_seconds", self.history.idle_eviction_seconds)?;
        if !(self.alert_cooldown_seconds.is_finite() && self.alert_cooldown_seconds > 0.0) {
            return Err(SettingsError::Invalid {
                field: "alert_cooldown_seconds",
                reason: format!("must be positive, got {}", self.alert_cooldown_seconds),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(SettingsError::Invalid {
                field: "confidence_threshold",
                reason: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.confidence_threshold
                ),
            });
        }
        if self.history.max_samples_per_track == 0 {
            return Err(SettingsError::Invalid {
                field: "history.max_samples_per_track",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.trespassing_enabled && self.trespassing_zone.is_degenerate() {
            log::warn!(
                "Trespassing zone {:?} has zero area; trespassing will never trigger",
                self.trespassing_zone.corners()
            );
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Invalid {
            field,
            reason: format!("must be a non-negative number, got {value}"),
        })
    }
}
