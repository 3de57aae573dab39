//! Skirmish - Party-vs-Party Combat Simulation Core
//!
//! A deterministic, data-driven rules engine for real-time battles between a
//! hero party and an opposing party or creature wave: stats, abilities,
//! auras, projectiles, areas, summons and bosses.
//!
//! This library exposes the simulation for headless runs, tests and any
//! presentation layer that wants to read its snapshots.

pub mod battle;
pub mod cli;
pub mod combat;
pub mod headless;
pub mod settings;

// Re-export commonly used types
pub use battle::match_config::{BattleSetup, HeroSlot, OpposingForce};
pub use battle::{build_battle_app, BattlePlugin};
pub use combat::log::{CombatLog, CombatLogEventType};
pub use headless::HeadlessBattleConfig;
pub use settings::BattleSettings;
