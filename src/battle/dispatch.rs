//! Event Dispatch
//!
//! Drains the frame's `EventQueue` once, after everything else has moved,
//! and hands each event to every living combatant. The dead only hear about
//! their own death. Reactions (class resource gains, item passives, enemy
//! passives) are queued as effects for the next frame, then the drained
//! events are forwarded as Bevy events for the log and observers.

use bevy::prelude::*;

use super::abilities::ResourceKind;
use super::ability_config::{ItemPassive, PassiveTrigger};
use super::components::visual::VfxKind;
use super::components::{BattleClock, Combatant};
use super::constants::*;
use super::effects::{CritMode, DamageEffect, EffectResult, PendingEffects, ResourceChange};
use super::roster::Roster;
use crate::combat::events::{CombatEvent, EventQueue, HitResult};

/// Broadcast queued events to combatants and forward them.
pub fn dispatch_events(
    clock: Res<BattleClock>,
    mut queue: ResMut<EventQueue>,
    mut pending: ResMut<PendingEffects>,
    mut forward: EventWriter<CombatEvent>,
    mut combatants: Query<(Entity, &mut Combatant)>,
) {
    let events = queue.drain();
    if events.is_empty() {
        return;
    }
    let roster = Roster::build(combatants.iter());
    for event in &events {
        for (entity, mut combatant) in combatants.iter_mut() {
            if !combatant.alive && event.victim() != Some(entity) {
                continue;
            }
            pending.extend(handle_event(entity, &mut combatant, event, &roster, clock.now_ms));
        }
    }
    forward.send_batch(events);
}

/// One combatant's reaction to one event.
///
/// Bookkeeping that must not fire twice (enrage latch, passive cooldowns) is
/// written immediately; everything else comes back as effects.
pub fn handle_event(
    me: Entity,
    combatant: &mut Combatant,
    event: &CombatEvent,
    roster: &Roster,
    now_ms: f64,
) -> Vec<EffectResult> {
    let mut effects = Vec::new();
    class_passives(me, combatant, event, &mut effects);
    item_passives(me, combatant, event, now_ms, &mut effects);
    enemy_passives(me, combatant, event, roster, &mut effects);
    effects
}

fn gain(me: Entity, kind: ResourceKind, amount: f32) -> EffectResult {
    EffectResult::Resource {
        entity: me,
        change: ResourceChange::Gain(kind, amount),
    }
}

fn class_passives(me: Entity, combatant: &Combatant, event: &CombatEvent, effects: &mut Vec<EffectResult>) {
    if combatant.resources.fury.is_some() {
        match event {
            CombatEvent::DamageDealt {
                attacker, ability: None, ..
            } if *attacker == me => effects.push(gain(me, ResourceKind::Fury, FURY_PER_BASIC_ATTACK)),
            CombatEvent::DamageTaken {
                target,
                result: HitResult::Hit,
                ..
            } if *target == me => effects.push(gain(me, ResourceKind::Fury, FURY_PER_HIT_TAKEN)),
            _ => {}
        }
    }
    if combatant.resources.corruption.is_some() {
        match event {
            CombatEvent::EntityDied { victim, .. } if *victim != me => {
                effects.push(gain(me, ResourceKind::Corruption, CORRUPTION_PER_DEATH))
            }
            CombatEvent::DamageDealt {
                attacker,
                ability: Some(_),
                ..
            } if *attacker == me => effects.push(gain(me, ResourceKind::Corruption, CORRUPTION_PER_ABILITY_HIT)),
            _ => {}
        }
    }
}

fn item_passives(me: Entity, combatant: &mut Combatant, event: &CombatEvent, now_ms: f64, effects: &mut Vec<EffectResult>) {
    if !combatant.alive {
        return;
    }
    for index in 0..combatant.items.len() {
        let Some(passive) = combatant.items[index].passive.clone() else {
            continue;
        };
        match (passive, event) {
            (
                ItemPassive::StackOnBasicAttack { aura },
                CombatEvent::DamageDealt {
                    attacker, ability: None, ..
                },
            ) if *attacker == me => effects.push(EffectResult::aura(me, me, aura)),
            (
                ItemPassive::ShieldOnHeal { percent, cooldown_ms },
                CombatEvent::HealPerformed { caster, target, amount, .. },
            ) if *caster == me && *target != me => {
                let ready = combatant.passive_ready_at.get(&index).copied().unwrap_or(0.0);
                if now_ms < ready {
                    continue;
                }
                combatant.passive_ready_at.insert(index, now_ms + cooldown_ms as f64);
                effects.push(EffectResult::Shield {
                    source: me,
                    target: *target,
                    amount: amount * percent / 100.0,
                });
            }
            (ItemPassive::HealOnKill { amount }, CombatEvent::EntityDied { killer, .. }) if *killer == Some(me) => {
                effects.push(EffectResult::Heal {
                    source: me,
                    target: me,
                    amount,
                    crit: CritMode::Never,
                    secondary: true,
                });
            }
            _ => {}
        }
    }
}

fn enemy_passives(
    me: Entity,
    combatant: &mut Combatant,
    event: &CombatEvent,
    roster: &Roster,
    effects: &mut Vec<EffectResult>,
) {
    for passive in combatant.template.passives.clone() {
        match (passive, event) {
            (
                PassiveTrigger::OnHitAura { aura },
                CombatEvent::DamageDealt {
                    attacker,
                    target,
                    ability: None,
                    ..
                },
            ) if *attacker == me && combatant.alive => effects.push(EffectResult::aura(me, *target, aura)),
            (
                PassiveTrigger::EnrageAtHealth { threshold, aura },
                CombatEvent::DamageTaken {
                    target,
                    result: HitResult::Hit,
                    ..
                },
            ) if *target == me && combatant.alive && !combatant.enraged && combatant.health_pct() < threshold => {
                combatant.enraged = true;
                effects.push(EffectResult::aura(me, me, aura));
                effects.push(EffectResult::notify(
                    "Enraged!",
                    combatant.position,
                    bevy::color::palettes::css::RED.into(),
                ));
            }
            (PassiveTrigger::DeathBurst { radius, damage }, CombatEvent::EntityDied { victim, .. }) if *victim == me => {
                for enemy in roster.enemies_within(combatant.side, combatant.position, radius) {
                    effects.push(EffectResult::Damage(DamageEffect {
                        source: Some(me),
                        target: enemy.entity,
                        amount: damage,
                        crit: CritMode::Never,
                        ability: None,
                        never_miss: true,
                        periodic: false,
                        drain: 0.0,
                    }));
                }
                effects.push(EffectResult::Vfx {
                    kind: VfxKind::Burst,
                    position: combatant.position,
                    radius,
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::{AbilityId, ClassId, EnemyId};
    use crate::battle::class_ai::test_support::Arena;
    use crate::battle::components::Side;

    fn basic_hit(attacker: Entity, target: Entity) -> CombatEvent {
        CombatEvent::DamageDealt {
            attacker,
            target,
            amount: 10.0,
            is_crit: false,
            ability: None,
        }
    }

    #[test]
    fn test_berserker_gains_fury_from_basic_attacks_and_hits() {
        let mut arena = Arena::new();
        let zerk = arena.hero(ClassId::Berserker, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Cleric, Side::Opponents, Vec2::new(130.0, 300.0));
        let roster = arena.roster();

        let dealt = handle_event(zerk, arena.get_mut(zerk), &basic_hit(zerk, foe), &roster, 0.0);
        assert_eq!(dealt, vec![gain(zerk, ResourceKind::Fury, FURY_PER_BASIC_ATTACK)]);

        let taken = CombatEvent::DamageTaken {
            target: zerk,
            attacker: Some(foe),
            amount: 10.0,
            result: HitResult::Hit,
            is_crit: false,
        };
        let reacted = handle_event(zerk, arena.get_mut(zerk), &taken, &roster, 0.0);
        assert_eq!(reacted, vec![gain(zerk, ResourceKind::Fury, FURY_PER_HIT_TAKEN)]);

        // Someone else's hit means nothing to the berserker
        assert!(handle_event(zerk, arena.get_mut(zerk), &basic_hit(foe, zerk), &roster, 0.0).is_empty());
    }

    #[test]
    fn test_necromancer_gains_corruption_on_any_death() {
        let mut arena = Arena::new();
        let necro = arena.hero(ClassId::Necromancer, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Cleric, Side::Opponents, Vec2::new(130.0, 300.0));
        let roster = arena.roster();
        let died = CombatEvent::EntityDied { victim: foe, killer: None };
        assert_eq!(
            handle_event(necro, arena.get_mut(necro), &died, &roster, 0.0),
            vec![gain(necro, ResourceKind::Corruption, CORRUPTION_PER_DEATH)]
        );
    }

    #[test]
    fn test_enrage_fires_once() {
        let mut arena = Arena::new();
        let troll = arena.enemy(EnemyId::Troll, Vec2::new(300.0, 300.0));
        let hero = arena.hero(ClassId::Berserker, Side::Heroes, Vec2::new(330.0, 300.0));
        let max = arena.get_mut(troll).stats.max_hp;
        arena.get_mut(troll).hp = max * 0.2;
        let roster = arena.roster();
        let taken = CombatEvent::DamageTaken {
            target: troll,
            attacker: Some(hero),
            amount: 10.0,
            result: HitResult::Hit,
            is_crit: false,
        };

        let first = handle_event(troll, arena.get_mut(troll), &taken, &roster, 0.0);
        assert!(first.contains(&EffectResult::aura(troll, troll, AbilityId::Enrage)));
        let second = handle_event(troll, arena.get_mut(troll), &taken, &roster, 0.0);
        assert!(!second.contains(&EffectResult::aura(troll, troll, AbilityId::Enrage)));
    }

    #[test]
    fn test_bloater_bursts_on_death() {
        let mut arena = Arena::new();
        let bloater = arena.enemy(EnemyId::Bloater, Vec2::new(300.0, 300.0));
        let near = arena.hero(ClassId::Guardian, Side::Heroes, Vec2::new(340.0, 300.0));
        let far = arena.hero(ClassId::Cleric, Side::Heroes, Vec2::new(900.0, 300.0));
        let roster = arena.roster();
        arena.get_mut(bloater).kill();

        let died = CombatEvent::EntityDied {
            victim: bloater,
            killer: Some(near),
        };
        let burst = handle_event(bloater, arena.get_mut(bloater), &died, &roster, 0.0);
        assert!(burst
            .iter()
            .any(|e| matches!(e, EffectResult::Damage(d) if d.target == near && d.never_miss)));
        assert!(!burst
            .iter()
            .any(|e| matches!(e, EffectResult::Damage(d) if d.target == far)));
    }

    #[test]
    fn test_shield_on_heal_respects_cooldown() {
        let mut arena = Arena::new();
        let cleric = arena.hero(ClassId::Cleric, Side::Heroes, Vec2::new(100.0, 300.0));
        let ally = arena.hero(ClassId::Guardian, Side::Heroes, Vec2::new(150.0, 300.0));
        let item = arena.content.item("Warding Censer").unwrap().clone();
        arena.get_mut(cleric).items.push(item);
        let roster = arena.roster();
        let heal = CombatEvent::HealPerformed {
            caster: cleric,
            target: ally,
            amount: 100.0,
            is_crit: false,
        };

        let first = handle_event(cleric, arena.get_mut(cleric), &heal, &roster, 1000.0);
        assert!(matches!(first.as_slice(), [EffectResult::Shield { target, .. }] if *target == ally));
        assert!(handle_event(cleric, arena.get_mut(cleric), &heal, &roster, 1100.0).is_empty());
    }
}
