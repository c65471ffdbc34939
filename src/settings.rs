//! Session settings and preferences
//!
//! Persisted as a JSON file next to the binary. Missing fields fall back to
//! defaults so older files keep loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::tuning::Tuning;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// What gets sent and how often
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationSettings {
    /// Host NPC broadcast rate, independent of the per-tick ball rate
    pub npc_rate_hz: f64,
    /// Offsets (seconds after the match begins) at which `start` is sent
    pub start_resend_delays: Vec<f64>,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            npc_rate_hz: NPC_RATE_HZ,
            start_resend_delays: START_RESEND_DELAYS.to_vec(),
        }
    }
}

impl ReplicationSettings {
    /// Seconds between NPC broadcasts (never zero)
    pub fn npc_interval(&self) -> f64 {
        if self.npc_rate_hz.is_finite() && self.npc_rate_hz > 0.0 {
            1.0 / self.npc_rate_hz
        } else {
            1.0 / NPC_RATE_HZ
        }
    }
}

/// Remote proxy smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationSettings {
    /// Dead-reckon from the last snapshot's velocity
    pub extrapolate: bool,
    pub position_rate: f64,
    pub radius_rate: f64,
    pub max_extrapolation: f64,
    /// Snap instead of smoothing when the proxy is this far off
    pub teleport_distance: f64,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            extrapolate: true,
            position_rate: PROXY_POSITION_RATE,
            radius_rate: PROXY_RADIUS_RATE,
            max_extrapolation: MAX_EXTRAPOLATION,
            teleport_distance: PROXY_TELEPORT_DISTANCE,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed level seed; random when absent
    pub seed: Option<u64>,
    pub replication: ReplicationSettings,
    pub interpolation: InterpolationSettings,
    pub tuning: Tuning,
}

impl Settings {
    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a file
    pub fn try_load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Read settings from a file, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{e} ({}), using default settings", path.display());
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_npc_interval_guards_bad_rate() {
        let mut replication = ReplicationSettings::default();
        assert!((replication.npc_interval() - 0.1).abs() < 1e-12);
        replication.npc_rate_hz = 0.0;
        assert!((replication.npc_interval() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_from(Path::new("/nonexistent/rollout/settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("rollout-settings-{}.json", std::process::id()));
        let settings = Settings {
            seed: Some(42),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        let loaded = Settings::try_load_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.seed, Some(42));
    }
}
