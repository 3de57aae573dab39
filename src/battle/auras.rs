//! Aura & Periodic Effect Systems
//!
//! Runs once per frame, before pending effects resolve:
//! 1. Periodic effects (DOT, HOT, channelled pulses) fire when
//!    `now − last_tick ≥ interval`, independent of remaining duration, so the
//!    final tick lands on the frame the aura expires.
//! 2. Every aura's `remaining_ms` drops by the frame length; expired auras are
//!    removed and stats recomputed.
//!
//! Ticks don't touch health directly. They become `EffectResult`s so DOTs go
//! through mitigation and shields like any other hit.

use bevy::prelude::*;

use super::components::{AuraEffect, BattleClock, Combatant};
use super::effects::{CritMode, DamageEffect, EffectResult, PendingEffects};
use super::roster::Roster;

/// Fire due periodic effects, then age and expire auras.
pub fn tick_auras(
    clock: Res<BattleClock>,
    mut pending: ResMut<PendingEffects>,
    mut combatants: Query<(Entity, &mut Combatant)>,
) {
    let roster = Roster::build(combatants.iter());
    for (entity, mut combatant) in combatants.iter_mut() {
        if !combatant.alive {
            continue;
        }
        pending.extend(collect_periodic_ticks(entity, &mut combatant, &roster, clock.now_ms));
        expire_auras(&mut combatant, clock.delta_ms);
    }
}

/// Periodic effects due on `bearer` at `now_ms`. Advances their tick clocks.
pub fn collect_periodic_ticks(entity: Entity, bearer: &mut Combatant, roster: &Roster, now_ms: f64) -> Vec<EffectResult> {
    let mut effects = Vec::new();
    let missing = bearer.missing_health();
    let (side, position) = (bearer.side, bearer.position);

    let bearer = &mut *bearer;
    for aura in bearer.buffs.iter_mut().chain(bearer.debuffs.iter_mut()) {
        let source_stats = roster.get(aura.source).map(|s| &s.stats);
        let stacks = aura.stacks.max(1) as f32;
        for effect in aura.effects.iter_mut() {
            match effect {
                AuraEffect::DamageOverTime {
                    amount,
                    interval_ms,
                    last_tick_ms,
                } => {
                    if now_ms - *last_tick_ms < *interval_ms as f64 {
                        continue;
                    }
                    *last_tick_ms = now_ms;
                    let value = amount.evaluate(source_stats, missing) * stacks;
                    if value > 0.0 {
                        effects.push(EffectResult::Damage(DamageEffect::periodic(
                            Some(aura.source),
                            entity,
                            value,
                            aura.ability,
                        )));
                    }
                }
                AuraEffect::HealOverTime {
                    amount,
                    interval_ms,
                    last_tick_ms,
                } => {
                    if now_ms - *last_tick_ms < *interval_ms as f64 {
                        continue;
                    }
                    *last_tick_ms = now_ms;
                    let value = amount.evaluate(source_stats, missing) * stacks;
                    if value > 0.0 {
                        effects.push(EffectResult::Heal {
                            source: aura.source,
                            target: entity,
                            amount: value,
                            crit: CritMode::Never,
                            secondary: true,
                        });
                    }
                }
                AuraEffect::ChannelledAura {
                    radius,
                    heal,
                    damage,
                    interval_ms,
                    last_tick_ms,
                } => {
                    if now_ms - *last_tick_ms < *interval_ms as f64 {
                        continue;
                    }
                    *last_tick_ms = now_ms;
                    let heal = heal.evaluate(source_stats, 0.0);
                    if heal > 0.0 {
                        for ally in roster.allies_within(side, position, *radius) {
                            effects.push(EffectResult::Heal {
                                source: entity,
                                target: ally.entity,
                                amount: heal,
                                crit: CritMode::Never,
                                secondary: true,
                            });
                        }
                    }
                    let damage = damage.evaluate(source_stats, 0.0);
                    if damage > 0.0 {
                        for enemy in roster.enemies_within(side, position, *radius) {
                            effects.push(EffectResult::Damage(DamageEffect::periodic(
                                Some(entity),
                                enemy.entity,
                                damage,
                                aura.ability,
                            )));
                        }
                    }
                }
                _ => {}
            }
        }
    }
    effects
}

/// Age every aura by `dt_ms` and drop the expired ones. Returns whether any expired.
pub fn expire_auras(combatant: &mut Combatant, dt_ms: f32) -> bool {
    let mut expired = false;
    let combatant_ref = &mut *combatant;
    for aura in combatant_ref.buffs.iter_mut().chain(combatant_ref.debuffs.iter_mut()) {
        aura.remaining_ms -= dt_ms;
        expired |= aura.is_expired();
    }
    if expired {
        combatant.buffs.retain(|a| !a.is_expired());
        combatant.debuffs.retain(|a| !a.is_expired());
        combatant.recalculate_stats();
    }
    expired
}
