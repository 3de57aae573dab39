//! Combat events and logging
//!
//! Shared by the battle simulation and anything observing it:
//! - `events`: the domain `CombatEvent`, the per-frame `EventQueue`, `BattleEnded`
//! - `log`: the `CombatLog` resource and JSON export
//! - `systems`: turns forwarded events into log lines

use bevy::prelude::*;

pub mod events;
pub mod log;
pub mod systems;

use events::*;

/// Plugin for combat events and the combat log
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app
            // Combat events
            .add_event::<CombatEvent>()
            .add_event::<BattleEnded>()
            // Resources
            .init_resource::<EventQueue>()
            .init_resource::<log::CombatLog>();
    }
}
