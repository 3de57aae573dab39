//! Lingering Areas
//!
//! An `ActiveArea` (venom puddle, etc.) sits on the ground for its lifetime and,
//! on its own tick interval, hits every opposing combatant currently inside its
//! radius. Area ticks are periodic damage: they bypass dodge but still go
//! through mitigation and shields.

use bevy::prelude::*;

use super::abilities::AbilityId;
use super::components::{BattleClock, Combatant, Side};
use super::effects::{DamageEffect, EffectResult, PendingEffects};

/// Everything needed to place an area.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaSpec {
    pub source: Entity,
    pub side: Side,
    pub ability: AbilityId,
    pub position: Vec2,
    pub radius: f32,
    pub tick_interval_ms: f32,
    pub duration_ms: f32,
    pub damage_per_tick: f32,
    /// Aura (re)applied to everyone inside on each tick
    pub aura: Option<AbilityId>,
}

#[derive(Component, Clone, Debug)]
pub struct ActiveArea {
    pub spec: AreaSpec,
    pub remaining_ms: f32,
    pub last_tick_ms: f64,
}

impl ActiveArea {
    pub fn new(spec: AreaSpec, now_ms: f64) -> Self {
        Self {
            remaining_ms: spec.duration_ms,
            last_tick_ms: now_ms,
            spec,
        }
    }

    pub fn contains(&self, position: Vec2, size: f32) -> bool {
        self.spec.position.distance(position) <= self.spec.radius + size / 2.0
    }
}

/// Tick lingering areas and despawn expired ones.
pub fn tick_areas(
    clock: Res<BattleClock>,
    mut commands: Commands,
    mut pending: ResMut<PendingEffects>,
    mut areas: Query<(Entity, &mut ActiveArea)>,
    combatants: Query<(Entity, &Combatant)>,
) {
    for (entity, mut area) in areas.iter_mut() {
        if clock.now_ms - area.last_tick_ms >= area.spec.tick_interval_ms as f64 {
            area.last_tick_ms = clock.now_ms;
            for (victim, combatant) in combatants.iter() {
                if !combatant.alive
                    || combatant.side == area.spec.side
                    || combatant.is_untargetable()
                    || !area.contains(combatant.position, combatant.stats.size)
                {
                    continue;
                }
                if area.spec.damage_per_tick > 0.0 {
                    pending.push(EffectResult::Damage(DamageEffect::periodic(
                        Some(area.spec.source),
                        victim,
                        area.spec.damage_per_tick,
                        area.spec.ability,
                    )));
                }
                if let Some(aura) = area.spec.aura {
                    pending.push(EffectResult::aura(area.spec.source, victim, aura));
                }
            }
        }

        area.remaining_ms -= clock.delta_ms;
        if area.remaining_ms <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_accounts_for_body_size() {
        let area = ActiveArea::new(
            AreaSpec {
                source: Entity::from_raw(1),
                side: Side::Heroes,
                ability: AbilityId::VenomTrap,
                position: Vec2::ZERO,
                radius: 50.0,
                tick_interval_ms: 1000.0,
                duration_ms: 5000.0,
                damage_per_tick: 10.0,
                aura: None,
            },
            0.0,
        );
        assert!(area.contains(Vec2::new(60.0, 0.0), 30.0));
        assert!(!area.contains(Vec2::new(70.0, 0.0), 30.0));
    }
}
