//! Boss Phase Systems
//!
//! The phase transitions themselves are scheduled continuations (see
//! `class_ai::creatures`). This module does the per-frame work while a boss is
//! mid-ability: interrupting a channel on stun, tunnelling away, charging
//! through the enemy line and drifting toward a leap landing.

use bevy::prelude::*;

use super::abilities::AbilityId;
use super::ability_config::{AbilityConfig, ContentDefinitions};
use super::components::{ArenaBounds, BattleClock, BossState, Combatant};
use super::effects::{DamageEffect, EffectResult, PendingEffects};
use super::roster::Roster;

/// Airborne bosses close this fraction of the remaining distance each second.
const LEAP_DRIFT_SPEED_MULT: f32 = 3.0;

/// Advance every busy boss by one frame.
pub fn update_boss_states(
    clock: Res<BattleClock>,
    bounds: Res<ArenaBounds>,
    content: Res<ContentDefinitions>,
    mut pending: ResMut<PendingEffects>,
    mut combatants: Query<(Entity, &mut Combatant)>,
) {
    let roster = Roster::build(combatants.iter());
    for (entity, mut boss) in combatants.iter_mut() {
        if !boss.alive || !boss.boss.is_busy() {
            continue;
        }
        let config = content.ability(match boss.boss {
            BossState::Airborne { .. } => AbilityId::Leap,
            _ => AbilityId::Burrow,
        });
        let Some(config) = config else {
            warn!("{} is mid-ability without a config; resetting", boss.name);
            boss.boss = BossState::None;
            continue;
        };
        pending.extend(step_boss(entity, &mut boss, &roster, config, clock.delta_ms, *bounds));
    }
}

/// One frame of boss phase movement. Returns follow-up effects.
pub fn step_boss(
    entity: Entity,
    boss: &mut Combatant,
    roster: &Roster,
    config: &AbilityConfig,
    dt_ms: f32,
    bounds: ArenaBounds,
) -> Vec<EffectResult> {
    let dt = dt_ms / 1000.0;
    let speed = boss.stats.movement_speed;
    let size = boss.stats.size;
    let target_position = boss.target.and_then(|t| roster.get(t)).map(|t| t.position);

    match &mut boss.boss {
        BossState::None => Vec::new(),
        BossState::BurrowChanneling => {
            if !boss.is_stunned() {
                return Vec::new();
            }
            boss.boss = BossState::None;
            vec![EffectResult::notify(
                "Interrupted!",
                boss.position,
                bevy::color::palettes::css::ORANGE.into(),
            )]
        }
        BossState::BurrowRetreating => {
            if let Some(from) = target_position {
                let away = (boss.position - from).normalize_or_zero();
                boss.position = bounds.clamp(boss.position + away * speed * dt, size);
            }
            Vec::new()
        }
        BossState::BurrowCharging { heading, struck } => {
            let step = *heading * speed * config.prop_or("charge_speed_mult", 2.0) * dt;
            let position = bounds.clamp(boss.position + step, size);
            let damage = boss.stats.damage * config.prop_or("charge_damage_mult", 1.0);
            let knockback = config.prop_or("knockback", 0.0);

            let mut effects = Vec::new();
            for victim in roster.enemies(boss.side) {
                if struck.contains(&victim.entity) || victim.position.distance(position) > (size + victim.stats.size) / 2.0 {
                    continue;
                }
                struck.push(victim.entity);
                effects.push(EffectResult::Damage(
                    DamageEffect::ability(entity, victim.entity, damage, AbilityId::Burrow).never_miss(),
                ));
                effects.push(EffectResult::aura(entity, victim.entity, AbilityId::Concussed));
                if knockback > 0.0 {
                    effects.push(EffectResult::Knockback {
                        target: victim.entity,
                        from: position,
                        distance: knockback,
                    });
                }
            }
            boss.position = position;
            effects
        }
        BossState::Airborne { landing } => {
            let to_landing = *landing - boss.position;
            let max_step = speed * LEAP_DRIFT_SPEED_MULT * dt;
            boss.position = if to_landing.length() <= max_step {
                *landing
            } else {
                boss.position + to_landing.normalize_or_zero() * max_step
            };
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use smallvec::SmallVec;

    use super::*;
    use crate::battle::abilities::{ClassId, EnemyId};
    use crate::battle::class_ai::test_support::Arena;
    use crate::battle::components::Side;

    #[test]
    fn test_charge_strikes_each_enemy_once() {
        let mut arena = Arena::new();
        let worm = arena.enemy(EnemyId::Sandworm, Vec2::new(300.0, 300.0));
        let hero = arena.hero(ClassId::Guardian, Side::Heroes, Vec2::new(320.0, 300.0));
        arena.get_mut(worm).boss = BossState::BurrowCharging {
            heading: Vec2::X,
            struck: SmallVec::new(),
        };
        let config = arena.config(AbilityId::Burrow);
        let roster = arena.roster();

        let first = step_boss(worm, arena.get_mut(worm), &roster, &config, 16.0, ArenaBounds::default());
        assert!(first
            .iter()
            .any(|e| matches!(e, EffectResult::Damage(d) if d.target == hero && d.never_miss)));
        assert!(first.contains(&EffectResult::aura(worm, hero, AbilityId::Concussed)));

        let second = step_boss(worm, arena.get_mut(worm), &roster, &config, 16.0, ArenaBounds::default());
        assert!(second.is_empty());
    }

    #[test]
    fn test_airborne_drifts_to_landing() {
        let mut arena = Arena::new();
        let ogre = arena.enemy(EnemyId::OgreChieftain, Vec2::new(100.0, 300.0));
        let landing = Vec2::new(110.0, 300.0);
        arena.get_mut(ogre).boss = BossState::Airborne { landing };
        let config = arena.config(AbilityId::Leap);
        let roster = arena.roster();
        step_boss(ogre, arena.get_mut(ogre), &roster, &config, 1000.0, ArenaBounds::default());
        assert_eq!(arena.get_mut(ogre).position, landing);
    }
}
