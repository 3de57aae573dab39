//! Battle Systems API
//!
//! Stable entry point for the simulation systems. Both the headless runner and
//! any presentation app should import from here rather than from the internal
//! modules.
//!
//! ## System Phases
//!
//! Battle systems run in five ordered phases each frame:
//!
//! 1. **Clock** - Advance battle time, count down placement
//! 2. **ResourcesAndAuras** - Cooldowns, aura expiry and DOT/HOT ticks
//! 3. **CombatAndMovement** - Continuations, boss phases, targeting, abilities, movement
//! 4. **CombatResolution** - Auto-attacks, projectiles, areas, event drain, battle end
//! 5. **Snapshot** - Post-frame picture for the presentation layer
//!
//! Phases 2-4 only run while the battle is in `BattlePhase::Combat`. Pending
//! effects are resolved after every step that produces them, so a frame's
//! damage lands before the end-of-battle check.
//!
//! ## Usage
//!
//! ```ignore
//! use skirmish::battle::systems;
//!
//! systems::configure_battle_system_ordering(&mut app);
//! systems::add_core_battle_systems(&mut app, || true);
//! ```

use bevy::prelude::*;

// === Phase 1: Clock ===
pub use super::match_flow::{advance_clock, update_placement};

// === Phase 2: Resources and Auras ===
pub use super::auras::tick_auras;
pub use super::combat_core::update_cooldowns;
pub use super::effects::resolve::resolve_pending_effects;

// === Phase 3: Combat and Movement ===
pub use super::boss::update_boss_states;
pub use super::combat_ai::{acquire_targets, decide_abilities};
pub use super::match_flow::expire_summons;
pub use super::movement::move_to_target;
pub use super::scheduler::run_scheduled_actions;

// === Phase 4: Combat Resolution ===
pub use super::areas::tick_areas;
pub use super::combat_core::combat_auto_attack;
pub use super::dispatch::dispatch_events;
pub use super::match_flow::check_battle_end;
pub use super::projectiles::{move_projectiles, process_projectile_hits};
pub use crate::combat::systems::record_combat_log;

// === Phase 5: Snapshot ===
pub use super::snapshot::update_snapshot;

// === Run conditions ===
pub use super::match_flow::in_combat;

/// System set labels for battle system ordering.
///
/// Use these to order custom systems that interact with the battle.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BattleSystemPhase {
    /// Phase 1: battle clock and placement countdown
    Clock,
    /// Phase 2: cooldowns, aura expiry, DOT/HOT ticks
    ResourcesAndAuras,
    /// Phase 3: continuations, boss phases, targeting, abilities, movement
    CombatAndMovement,
    /// Phase 4: auto-attacks, projectiles, areas, event drain, battle end
    CombatResolution,
    /// Phase 5: post-frame snapshot
    Snapshot,
}

/// Configures the ordering between battle system phases.
///
/// Call this once during app setup before adding battle systems.
pub fn configure_battle_system_ordering(app: &mut App) {
    app.configure_sets(
        Update,
        (
            BattleSystemPhase::Clock,
            BattleSystemPhase::ResourcesAndAuras,
            BattleSystemPhase::CombatAndMovement,
            BattleSystemPhase::CombatResolution,
            BattleSystemPhase::Snapshot,
        )
            .chain(),
    );
}

/// Adds the core battle simulation systems to the app.
///
/// # Arguments
/// * `app` - The Bevy App to add systems to
/// * `run_condition` - Extra gate for the whole simulation (e.g. an app state)
///
/// # Example
/// ```ignore
/// // Headless: always run
/// add_core_battle_systems(&mut app, || true);
/// ```
pub fn add_core_battle_systems<M>(app: &mut App, run_condition: impl Condition<M> + Clone)
where
    M: 'static,
{
    // Phase 1: Clock
    app.add_systems(
        Update,
        (advance_clock, update_placement)
            .chain()
            .in_set(BattleSystemPhase::Clock)
            .run_if(run_condition.clone()),
    );

    // Phase 2: Resources and Auras
    app.add_systems(
        Update,
        (update_cooldowns, tick_auras, resolve_pending_effects)
            .chain()
            .in_set(BattleSystemPhase::ResourcesAndAuras)
            .run_if(run_condition.clone())
            .run_if(in_combat),
    );

    // Phase 3: Combat and Movement
    app.add_systems(
        Update,
        (
            expire_summons,
            run_scheduled_actions,
            update_boss_states,
            acquire_targets,
            decide_abilities,
            resolve_pending_effects,
            move_to_target,
        )
            .chain()
            .in_set(BattleSystemPhase::CombatAndMovement)
            .run_if(run_condition.clone())
            .run_if(in_combat),
    );

    // Phase 4: Combat Resolution
    app.add_systems(
        Update,
        (
            combat_auto_attack,
            resolve_pending_effects,
            move_projectiles,
            process_projectile_hits,
            tick_areas,
            resolve_pending_effects,
            dispatch_events,
            record_combat_log,
            check_battle_end,
        )
            .chain()
            .in_set(BattleSystemPhase::CombatResolution)
            .run_if(run_condition.clone())
            .run_if(in_combat),
    );

    // Phase 5: Snapshot
    app.add_systems(
        Update,
        update_snapshot
            .in_set(BattleSystemPhase::Snapshot)
            .run_if(run_condition),
    );
}
