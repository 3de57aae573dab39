//! Headless mode for automated testing
//!
//! This module runs battles without any graphical output, suitable for
//! automated testing and balance sweeps.
//!
//! ## Usage
//!
//! ```bash
//! # Run a headless battle
//! cargo run --release -- --headless battle_config.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "player": { "class": "Ranger", "items": ["Warding Censer"] },
//!   "allies": [{ "class": "Guardian" }, { "class": "Cleric" }],
//!   "enemy_wave": ["Goblin", "GoblinArcher", "Shaman"],
//!   "threat": 2,
//!   "random_seed": 42,
//!   "max_duration_secs": 120
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{ConfigError, HeadlessBattleConfig};
pub use runner::{run_headless_battle, simulate_battle, BattleResult, HeadlessError};
