//! Battle simulation
//!
//! Everything that happens between "combatants spawned" and "battle over":
//! stats, auras, abilities, auto-attacks, projectiles, areas, movement, boss
//! state machines and the end-of-battle latch.
//!
//! ## Module Structure
//! - `components`: `Combatant`, auras, clock/arena resources, presentation cues
//! - `abilities` / `ability_config`: ability ids and the RON content model
//! - `class_ai`: per-class ability handlers (pure functions returning effects)
//! - `effects`: the effect vocabulary and the single point that mutates combatants
//! - `combat_core`, `combat_ai`, `movement`, `projectiles`, `areas`, `auras`,
//!   `boss`, `scheduler`, `dispatch`: the per-frame systems
//! - `match_flow`: clock, placement, battle end and the combat report
//! - `match_config`: roster composition and spawning
//! - `systems`: the stable system API and phase ordering
//! - `snapshot`: the post-frame picture for presentation

pub mod abilities;
pub mod ability_config;
pub mod areas;
pub mod auras;
pub mod boss;
pub mod class_ai;
pub mod combat_ai;
pub mod combat_core;
pub mod components;
pub mod constants;
pub mod dispatch;
pub mod effects;
pub mod match_config;
pub mod match_flow;
pub mod movement;
pub mod projectiles;
pub mod roster;
pub mod scheduler;
pub mod snapshot;
pub mod stats;
pub mod systems;

use bevy::prelude::*;

use crate::combat::CombatPlugin;
use crate::settings::BattleSettings;
use ability_config::{ContentDefinitions, ContentError};
use class_ai::AbilityHandlers;
use combat_ai::AbilityRequests;
use components::visual::PresentationFeed;
use components::{BattleClock, GameRng};
use effects::PendingEffects;
use match_config::{spawn_battle, BattleSetup};
use match_flow::{BattleLimits, BattleOutcome, BattlePhase};
use scheduler::ScheduledActions;
use snapshot::BattleSnapshot;

/// Plugin for one battle: resources plus the ordered simulation systems.
///
/// Content (`ContentDefinitions`) is not loaded here; insert it before the
/// first update, or use [`build_battle_app`].
#[derive(Clone, Debug, Default)]
pub struct BattlePlugin {
    pub settings: BattleSettings,
    pub limits: BattleLimits,
    /// Seed for dodge/crit rolls; `None` uses entropy
    pub seed: Option<u64>,
}

impl Plugin for BattlePlugin {
    fn build(&self, app: &mut App) {
        let clock = match self.settings.fixed_step_ms {
            Some(step) => BattleClock::fixed(step),
            None => BattleClock::default(),
        };
        let rng = match self.seed {
            Some(seed) => {
                info!("Using deterministic RNG with seed: {}", seed);
                GameRng::from_seed(seed)
            }
            None => GameRng::from_entropy(),
        };

        app.insert_resource(self.settings.clone())
            .insert_resource(self.settings.bounds())
            .insert_resource(self.limits)
            .insert_resource(clock)
            .insert_resource(rng)
            .insert_resource(BattlePhase::Placement {
                remaining_ms: self.settings.placement_ms,
            })
            .init_resource::<BattleOutcome>()
            .init_resource::<BattleSnapshot>()
            .init_resource::<PendingEffects>()
            .init_resource::<ScheduledActions>()
            .init_resource::<PresentationFeed>()
            .init_resource::<AbilityRequests>()
            .init_resource::<AbilityHandlers>();

        systems::configure_battle_system_ordering(app);
        systems::add_core_battle_systems(app, || true);
    }
}

/// A battle app ready to update: content checked against the handler
/// registry, combatants spawned, placement phase running.
pub fn build_battle_app(
    plugin: BattlePlugin,
    content: ContentDefinitions,
    setup: &BattleSetup,
) -> Result<App, ContentError> {
    AbilityHandlers::default().validate(&content)?;

    let mut app = App::new();
    app.add_plugins((CombatPlugin, plugin)).insert_resource(content);
    spawn_battle(app.world_mut(), setup)?;
    app.insert_resource(setup.clone());
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abilities::{ClassId, EnemyId};
    use match_config::{HeroSlot, OpposingForce};

    fn setup() -> BattleSetup {
        BattleSetup {
            player: None,
            allies: vec![HeroSlot::new(ClassId::Guardian)],
            opponents: OpposingForce::Wave(vec![EnemyId::Goblin]),
            threat: 1,
        }
    }

    #[test]
    fn test_placement_precedes_combat() {
        let plugin = BattlePlugin {
            settings: BattleSettings {
                placement_ms: 100.0,
                fixed_step_ms: Some(50.0),
                ..Default::default()
            },
            seed: Some(7),
            ..Default::default()
        };
        let content = ContentDefinitions::builtin().unwrap();
        let mut app = build_battle_app(plugin, content, &setup()).unwrap();

        app.update();
        assert!(matches!(app.world().resource::<BattlePhase>(), BattlePhase::Placement { .. }));
        app.update();
        assert_eq!(*app.world().resource::<BattlePhase>(), BattlePhase::Combat);
    }

    #[test]
    fn test_snapshot_lists_spawned_combatants() {
        let content = ContentDefinitions::builtin().unwrap();
        let mut app = build_battle_app(BattlePlugin::default(), content, &setup()).unwrap();
        app.update();
        let snapshot = app.world().resource::<BattleSnapshot>();
        assert_eq!(snapshot.combatants.len(), 2);
        assert_eq!(snapshot.frame, 1);
    }
}
