//! Battle Snapshot
//!
//! Read-only picture of the battle taken at the end of every frame. The
//! presentation side reads this (and the `PresentationFeed`) and nothing else.

use bevy::prelude::*;

use super::components::{Combatant, Side};

/// Coarse status for drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatantStatus {
    Alive,
    Stunned,
    Hidden,
    Untargetable,
    Dead,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CombatantView {
    pub entity: Entity,
    pub name: String,
    pub side: Side,
    pub status: CombatantStatus,
    pub position: Vec2,
    pub size: f32,
    /// Opaque tag from the unit template
    pub visual: String,
    pub hp: f32,
    pub max_hp: f32,
    pub shield: f32,
    pub aura_icons: Vec<String>,
    pub is_boss: bool,
}

/// The most recent post-frame snapshot.
#[derive(Resource, Clone, Debug, Default)]
pub struct BattleSnapshot {
    pub frame: u64,
    pub now_ms: f64,
    pub combatants: Vec<CombatantView>,
    /// First living boss: `(health %, shield %)` of max health
    pub boss_bar: Option<(f32, f32)>,
}

impl BattleSnapshot {
    pub fn get(&self, entity: Entity) -> Option<&CombatantView> {
        self.combatants.iter().find(|c| c.entity == entity)
    }
}

fn status_of(c: &Combatant) -> CombatantStatus {
    if !c.alive {
        CombatantStatus::Dead
    } else if c.is_untargetable() {
        CombatantStatus::Untargetable
    } else if c.is_invisible() {
        CombatantStatus::Hidden
    } else if c.is_stunned() {
        CombatantStatus::Stunned
    } else {
        CombatantStatus::Alive
    }
}

/// Rebuild the snapshot from the current world.
pub fn update_snapshot(
    clock: Res<super::components::BattleClock>,
    mut snapshot: ResMut<BattleSnapshot>,
    combatants: Query<(Entity, &Combatant)>,
) {
    let mut views: Vec<CombatantView> = combatants
        .iter()
        .map(|(entity, c)| CombatantView {
            entity,
            name: c.name.clone(),
            side: c.side,
            status: status_of(c),
            position: c.position,
            size: c.stats.size,
            visual: c.template.visual.clone(),
            hp: c.hp,
            max_hp: c.stats.max_hp,
            shield: c.shield,
            aura_icons: c.auras().filter(|a| !a.icon.is_empty()).map(|a| a.icon.clone()).collect(),
            is_boss: c.template.boss,
        })
        .collect();
    views.sort_by_key(|v| v.entity);

    snapshot.boss_bar = views
        .iter()
        .find(|v| v.is_boss && v.status != CombatantStatus::Dead && v.max_hp > 0.0)
        .map(|v| (v.hp / v.max_hp * 100.0, v.shield / v.max_hp * 100.0));
    snapshot.frame = clock.frame;
    snapshot.now_ms = clock.now_ms;
    snapshot.combatants = views;
}
