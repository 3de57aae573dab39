//! Headless battle execution
//!
//! Runs battles without any graphical output, suitable for automated testing.
//! The clock always uses a fixed step here, so a seeded battle replays exactly.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use std::path::Path;
use thiserror::Error;

use crate::battle::ability_config::{ContentDefinitions, ContentError};
use crate::battle::components::Side;
use crate::battle::constants::HEADLESS_STEP_MS;
use crate::battle::match_flow::{BattleLimits, BattleOutcome, CombatReport};
use crate::battle::systems::BattleSystemPhase;
use crate::battle::{build_battle_app, BattlePlugin};
use crate::combat::log::CombatLog;
use crate::settings::BattleSettings;

use super::config::HeadlessBattleConfig;

/// Frames simulated past the timeout before giving up on a battle.
const STALL_GRACE_FRAMES: u64 = 600;

#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("battle did not finish after {0} frames")]
    Stalled(u64),
}

/// Result of a completed headless battle
///
/// This struct provides programmatic access to battle results for testing and analysis.
#[derive(Debug, Clone)]
pub struct BattleResult {
    /// The winning side, or None for a draw
    pub winner: Option<Side>,
    /// Battle time in seconds when the battle ended
    pub battle_time: f32,
    /// Per-combatant statistics
    pub report: CombatReport,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
    /// Where the combat log was written, if saving succeeded
    pub log_path: Option<String>,
}

/// Resource to track headless battle state
#[derive(Resource, Default)]
pub struct HeadlessBattleState {
    /// Custom output path for the battle log
    pub output_path: Option<String>,
    /// Random seed for deterministic simulation (if provided)
    pub random_seed: Option<u64>,
    /// Skip writing the log file
    pub save_log: bool,
    /// Battle result (populated when the battle ends)
    pub result: Option<BattleResult>,
}

/// Plugin that captures the result and saves the log once the battle ends
pub struct HeadlessPlugin {
    pub output_path: Option<String>,
    pub random_seed: Option<u64>,
    pub save_log: bool,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(HeadlessBattleState {
            output_path: self.output_path.clone(),
            random_seed: self.random_seed,
            save_log: self.save_log,
            result: None,
        })
        .add_systems(
            Update,
            headless_finish_battle
                .after(BattleSystemPhase::CombatResolution)
                .before(BattleSystemPhase::Snapshot),
        );
    }
}

/// Build the result and save the log the first frame the battle is over.
fn headless_finish_battle(world: &mut World) {
    let ended = world.get_resource::<BattleOutcome>().is_some_and(|o| o.has_ended());
    let pending = world
        .get_resource::<HeadlessBattleState>()
        .is_some_and(|s| s.result.is_none());
    if !ended || !pending {
        return;
    }

    let report = CombatReport::from_world(world);
    let (output_path, random_seed, save_log) = match world.get_resource::<HeadlessBattleState>() {
        Some(state) => (state.output_path.clone(), state.random_seed, state.save_log),
        None => return,
    };

    let log_path = if save_log {
        world
            .get_resource::<CombatLog>()
            .and_then(|log| match log.save_to_file(&report, output_path.as_deref()) {
                Ok(path) => {
                    println!("Battle complete. Log saved to: {}", path);
                    Some(path)
                }
                Err(e) => {
                    warn!("Failed to save combat log: {}", e);
                    None
                }
            })
    } else {
        None
    };

    let result = BattleResult {
        winner: report.winner,
        battle_time: report.duration_secs,
        report,
        random_seed,
        log_path,
    };
    if let Some(mut state) = world.get_resource_mut::<HeadlessBattleState>() {
        state.result = Some(result);
    }
}

/// Run a headless battle with the given configuration and settings
pub fn run_headless_battle(config: &HeadlessBattleConfig, settings: BattleSettings) -> Result<BattleResult, HeadlessError> {
    run_battle(config, settings, true)
}

/// Same as [`run_headless_battle`], without writing a log file.
pub fn simulate_battle(config: &HeadlessBattleConfig, settings: BattleSettings) -> Result<BattleResult, HeadlessError> {
    run_battle(config, settings, false)
}

fn run_battle(config: &HeadlessBattleConfig, settings: BattleSettings, save_log: bool) -> Result<BattleResult, HeadlessError> {
    info!("Starting headless battle simulation...");
    info!("  Player: {:?}", config.player.as_ref().map(|p| p.class));
    info!("  Allies: {:?}", config.allies.iter().map(|a| a.class).collect::<Vec<_>>());
    if config.enemy_wave.is_empty() {
        info!(
            "  Opponents: {:?}",
            config.opponent_heroes.iter().map(|h| h.class).collect::<Vec<_>>()
        );
    } else {
        info!("  Wave: {:?} at threat {}", config.enemy_wave, config.threat);
    }
    info!("  Max duration: {:.0}s", config.max_duration_secs);

    let content = match &config.content_dir {
        Some(dir) => ContentDefinitions::load_from_dir(Path::new(dir))?,
        None => ContentDefinitions::builtin()?,
    };
    let step_ms = settings.fixed_step_ms.filter(|s| *s > 0.0).unwrap_or(HEADLESS_STEP_MS);
    let placement_ms = settings.placement_ms;
    let limits = BattleLimits {
        max_duration_ms: config.max_duration_secs as f64 * 1000.0,
    };
    let plugin = BattlePlugin {
        settings: BattleSettings {
            fixed_step_ms: Some(step_ms),
            ..settings
        },
        limits,
        seed: config.random_seed,
    };

    let mut app = build_battle_app(plugin, content, &config.to_battle_setup())?;
    app.add_plugins((
        MinimalPlugins.build().disable::<ScheduleRunnerPlugin>(),
        HeadlessPlugin {
            output_path: config.output_path.clone(),
            random_seed: config.random_seed,
            save_log,
        },
    ));
    app.finish();
    app.cleanup();

    let frame_budget = ((limits.max_duration_ms + placement_ms as f64) / step_ms as f64).ceil() as u64 + STALL_GRACE_FRAMES;
    for _ in 0..frame_budget {
        app.update();
        let result = app
            .world_mut()
            .get_resource_mut::<HeadlessBattleState>()
            .and_then(|mut state| state.result.take());
        if let Some(result) = result {
            return Ok(result);
        }
    }
    Err(HeadlessError::Stalled(frame_budget))
}
