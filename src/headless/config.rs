//! JSON configuration parsing for headless mode
//!
//! Parses JSON battle configurations and converts them to a `BattleSetup`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::battle::abilities::EnemyId;
use crate::battle::match_config::{BattleSetup, HeroSlot, OpposingForce};

/// Largest hero party per side.
pub const MAX_PARTY_SIZE: usize = 5;

/// Largest creature wave.
pub const MAX_WAVE_SIZE: usize = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("the hero side needs a player or at least one ally")]
    NoHeroes,
    #[error("the hero side has {0} members (max {max})", max = MAX_PARTY_SIZE)]
    TooManyHeroes(usize),
    #[error("exactly one of opponent_heroes and enemy_wave must be given")]
    OpponentsNotSpecified,
    #[error("opponent_heroes has {0} members (max {max})", max = MAX_PARTY_SIZE)]
    TooManyOpponents(usize),
    #[error("enemy_wave has {0} members (max {max})", max = MAX_WAVE_SIZE)]
    WaveTooLarge(usize),
    #[error("threat must be at least 1")]
    InvalidThreat,
    #[error("max_duration_secs must be positive, got {0}")]
    InvalidDuration(f32),
}

/// Headless battle configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessBattleConfig {
    /// The player's hero (AI-driven unless autopilot is off)
    #[serde(default)]
    pub player: Option<HeroSlot>,
    /// AI heroes fighting alongside the player
    #[serde(default)]
    pub allies: Vec<HeroSlot>,
    /// An opposing hero party
    #[serde(default)]
    pub opponent_heroes: Vec<HeroSlot>,
    /// A creature wave
    #[serde(default)]
    pub enemy_wave: Vec<EnemyId>,
    /// Difficulty scalar (default: 1)
    #[serde(default = "default_threat")]
    pub threat: u32,
    /// Custom output path for the battle log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Maximum battle duration in seconds (default: 300)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Random seed for deterministic battle reproduction
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Directory holding abilities/units/items RON files (default: built-in content)
    #[serde(default)]
    pub content_dir: Option<String>,
}

fn default_threat() -> u32 {
    1
}

fn default_max_duration() -> f32 {
    300.0
}

impl HeadlessBattleConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: HeadlessBattleConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let heroes = self.allies.len() + usize::from(self.player.is_some());
        if heroes == 0 {
            return Err(ConfigError::NoHeroes);
        }
        if heroes > MAX_PARTY_SIZE {
            return Err(ConfigError::TooManyHeroes(heroes));
        }

        match (self.opponent_heroes.is_empty(), self.enemy_wave.is_empty()) {
            (false, true) if self.opponent_heroes.len() > MAX_PARTY_SIZE => {
                return Err(ConfigError::TooManyOpponents(self.opponent_heroes.len()));
            }
            (true, false) if self.enemy_wave.len() > MAX_WAVE_SIZE => {
                return Err(ConfigError::WaveTooLarge(self.enemy_wave.len()));
            }
            (false, true) | (true, false) => {}
            _ => return Err(ConfigError::OpponentsNotSpecified),
        }

        if self.threat == 0 {
            return Err(ConfigError::InvalidThreat);
        }
        if self.max_duration_secs.is_nan() || self.max_duration_secs <= 0.0 {
            return Err(ConfigError::InvalidDuration(self.max_duration_secs));
        }
        Ok(())
    }

    /// Convert to the battle's roster composition
    pub fn to_battle_setup(&self) -> BattleSetup {
        let opponents = if self.enemy_wave.is_empty() {
            OpposingForce::Heroes(self.opponent_heroes.clone())
        } else {
            OpposingForce::Wave(self.enemy_wave.clone())
        };
        BattleSetup {
            player: self.player.clone(),
            allies: self.allies.clone(),
            opponents,
            threat: self.threat,
        }
    }
}
