//! Simulation settings
//!
//! Arena size, frame step, global cooldown and player autopilot, read from a
//! RON file. A missing or unreadable file falls back to defaults.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::battle::components::ArenaBounds;
use crate::battle::constants::{GLOBAL_COOLDOWN_MS, HEADLESS_STEP_MS, PLACEMENT_DURATION_MS};

/// Tunables for one battle app.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleSettings {
    pub arena_width: f32,
    pub arena_height: f32,
    /// Fixed frame length; `None` follows real time
    pub fixed_step_ms: Option<f32>,
    pub global_cooldown_ms: f32,
    pub placement_ms: f32,
    /// Let the AI drive the player hero
    pub autopilot: bool,
}

impl Default for BattleSettings {
    fn default() -> Self {
        let bounds = ArenaBounds::default();
        Self {
            arena_width: bounds.width,
            arena_height: bounds.height,
            fixed_step_ms: Some(HEADLESS_STEP_MS),
            global_cooldown_ms: GLOBAL_COOLDOWN_MS,
            placement_ms: PLACEMENT_DURATION_MS,
            autopilot: true,
        }
    }
}

impl BattleSettings {
    /// Default location, next to the executable's working directory.
    pub fn settings_path() -> PathBuf {
        PathBuf::from("settings.ron")
    }

    /// Load settings from `path`, or return defaults if it doesn't exist or
    /// doesn't parse.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Save settings to `path`.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, contents)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn bounds(&self) -> ArenaBounds {
        ArenaBounds {
            width: self.arena_width,
            height: self.arena_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: BattleSettings = ron::from_str("(autopilot: false, arena_width: 800.0)").unwrap();
        assert!(!settings.autopilot);
        assert_eq!(settings.arena_width, 800.0);
        assert_eq!(settings.global_cooldown_ms, GLOBAL_COOLDOWN_MS);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = BattleSettings::load(Path::new("does/not/exist.ron"));
        assert_eq!(settings, BattleSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("skirmish-settings-{}.ron", std::process::id()));
        let settings = BattleSettings {
            autopilot: false,
            fixed_step_ms: None,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(BattleSettings::load(&path), settings);
        let _ = fs::remove_file(&path);
    }
}
