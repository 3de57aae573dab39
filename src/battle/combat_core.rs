//! Combat Core
//!
//! Damage, heal and shield application on a single combatant, plus the
//! per-frame cooldown tick and auto-attack systems.
//!
//! `take_damage` is the only way health goes down. It never fails: every
//! outcome (miss, dodge, block, hit) is returned as data.

use bevy::prelude::*;

use super::abilities::AbilityId;
use super::components::{AuraEffect, BattleClock, Combatant, CombatantKind, GameRng};
use super::constants::*;
use super::effects::{CritMode, DamageEffect, EffectResult, PendingEffects};
use super::projectiles::ProjectileSpec;
use super::roster::Roster;

/// One incoming hit, after crit and before mitigation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IncomingHit {
    pub raw: f32,
    pub attacker: Option<Entity>,
    /// Attacker accuracy; `BASE_ACCURACY` when there is no attacker
    pub accuracy: f32,
    pub never_miss: bool,
}

/// How `take_damage` resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DamageOutcome {
    /// Dead, untargetable or invulnerable target
    Missed,
    Dodged,
    Blocked,
    Hit {
        /// Total damage after mitigation (shield + health)
        amount: f32,
        absorbed: f32,
        killed: bool,
    },
}

/// Result of a heal landing on a combatant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealOutcome {
    pub applied: f32,
    /// Treants answer primary heals with a burst of this size around them
    pub burst: Option<f32>,
}

/// `round(amount × (1 + crit_damage/100))`.
pub fn crit_damage(amount: f32, crit_damage_pct: f32) -> f32 {
    (amount * (1.0 + crit_damage_pct / 100.0)).round()
}

/// `round(max(1, raw × 100/(100+resistance)))`.
pub fn mitigate(raw: f32, resistance: f32) -> f32 {
    (raw * 100.0 / (100.0 + resistance)).max(1.0).round()
}

/// Dodge chance after the attacker's surplus accuracy.
pub fn dodge_chance(dodge: f32, accuracy: f32) -> f32 {
    (dodge.min(MAX_DODGE) - (accuracy - BASE_ACCURACY).max(0.0)).max(0.0)
}

/// Bonus multiplier from a missing-health mark: 10% at full health, growing
/// linearly to 70% at 70% missing.
pub fn mark_bonus(missing_fraction: f32) -> f32 {
    let t = (missing_fraction / MARK_MISSING_HEALTH_CAP).clamp(0.0, 1.0);
    MARK_MIN_BONUS + (MARK_MAX_BONUS - MARK_MIN_BONUS) * t
}

/// Apply a hit to `target`. See `DamageOutcome`.
pub fn take_damage(target: &mut Combatant, hit: IncomingHit, rng: &mut GameRng) -> DamageOutcome {
    debug_assert!(hit.raw >= 0.0, "take_damage: negative raw damage {}", hit.raw);

    if !target.alive || (target.is_untargetable() && !target.is_invisible()) {
        return DamageOutcome::Missed;
    }

    let mut raw = hit.raw.max(0.0);
    if let Some(attacker) = hit.attacker {
        let marked = target.debuffs.iter().any(|a| {
            a.source == attacker && a.has_effect(|e| matches!(e, AuraEffect::MissingHealthMark))
        });
        if marked {
            let missing = 1.0 - target.health_pct();
            raw *= 1.0 + mark_bonus(missing);
        }
    }

    if target.consume_block_charge() {
        return DamageOutcome::Blocked;
    }

    if target.is_invulnerable() {
        return DamageOutcome::Missed;
    }

    if !hit.never_miss && rng.roll_percent(dodge_chance(target.stats.dodge, hit.accuracy)) {
        return DamageOutcome::Dodged;
    }

    let amount = mitigate(raw, target.stats.resistance);
    let absorbed = amount.min(target.shield);
    target.shield -= absorbed;
    let to_health = amount - absorbed;
    target.hp = (target.hp - to_health).max(0.0);
    target.report.damage_taken += amount;

    let killed = target.hp <= 0.0;
    if killed {
        target.kill();
    }
    target.debug_validate();

    DamageOutcome::Hit {
        amount,
        absorbed,
        killed,
    }
}

/// Heal `target`, scaled by its healing-received bonus and capped at max HP.
///
/// `secondary` heals (bursts, lifesteal) never trigger a treant burst.
pub fn receive_heal(target: &mut Combatant, amount: f32, secondary: bool) -> HealOutcome {
    if !target.alive {
        return HealOutcome {
            applied: 0.0,
            burst: None,
        };
    }
    let scaled = (amount * (1.0 + target.stats.healing_received / 100.0)).max(0.0);
    let applied = scaled.min(target.missing_health());
    target.hp += applied;

    let burst = match target.kind {
        CombatantKind::TreeSummon { .. } if !secondary && amount > 0.0 => Some(amount * TREANT_BURST_RATIO),
        _ => None,
    };
    target.debug_validate();
    HealOutcome { applied, burst }
}

/// Add shield HP, capped at max HP. Returns the amount actually added.
pub fn grant_shield(target: &mut Combatant, amount: f32) -> f32 {
    if !target.alive || amount <= 0.0 {
        return 0.0;
    }
    let before = target.shield;
    target.shield = (target.shield + amount).min(target.stats.max_hp);
    target.shield - before
}

// ============================================================================
// Systems
// ============================================================================

/// Decrement ability cooldowns, the global cooldown and the swing timer.
pub fn update_cooldowns(clock: Res<BattleClock>, mut combatants: Query<&mut Combatant>) {
    for mut combatant in combatants.iter_mut() {
        if combatant.alive {
            combatant.tick_cooldowns(clock.delta_ms);
        }
    }
}

/// Swing at the current target when the timer is ready and it is in range.
///
/// Consumes next-attack modifiers and breaks invisibility. Templates with an
/// `attack_projectile_speed` fire a homing projectile instead of hitting
/// directly.
pub fn combat_auto_attack(mut pending: ResMut<PendingEffects>, mut combatants: Query<(Entity, &mut Combatant)>) {
    let roster = Roster::build(combatants.iter());

    for (entity, mut combatant) in combatants.iter_mut() {
        if !combatant.alive
            || combatant.is_stunned()
            || combatant.boss.is_busy()
            || combatant.attack_timer_ms > 0.0
        {
            continue;
        }
        let Some(target) = combatant
            .target
            .and_then(|t| roster.get(t))
            .filter(|t| t.is_targetable() && t.side != combatant.side)
        else {
            continue;
        };
        let Some(me) = roster.get(entity) else {
            continue;
        };
        if !me.in_range(target, combatant.stats.range) {
            continue;
        }

        let mut damage = combatant.stats.damage;
        let mut crit = CritMode::Roll;
        let mut consumed: Vec<AbilityId> = Vec::new();
        for aura in &combatant.buffs {
            for effect in &aura.effects {
                if let AuraEffect::NextAttack {
                    damage_percent,
                    guaranteed_crit,
                } = effect
                {
                    damage *= 1.0 + damage_percent / 100.0;
                    if *guaranteed_crit {
                        crit = CritMode::Always;
                    }
                    consumed.push(aura.ability);
                }
            }
        }
        for ability in consumed {
            combatant.remove_aura(ability);
        }
        combatant.remove_auras_with(|e| matches!(e, AuraEffect::Invisibility));

        match combatant.template.attack_projectile_speed {
            Some(speed) => pending.push(EffectResult::SpawnProjectile(
                ProjectileSpec::homing(
                    entity,
                    combatant.side,
                    combatant.position,
                    target.entity,
                    target.position,
                    speed,
                    damage,
                    None,
                )
                .with_crit(crit),
            )),
            None => pending.push(EffectResult::Damage(DamageEffect::basic(entity, target.entity, damage, crit))),
        }
        combatant.attack_timer_ms = combatant.stats.attack_interval_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::ClassId;
    use crate::battle::ability_config::UnitTemplate;
    use crate::battle::components::{AuraKind, AuraTemplate, Side};
    use crate::battle::stats::BaseStats;

    fn template(resistance: f32, dodge: f32) -> UnitTemplate {
        UnitTemplate {
            name: "Dummy".into(),
            visual: "dummy".into(),
            hp: 1000.0,
            damage: 10.0,
            attack_interval_ms: 1000.0,
            range: 40.0,
            movement_speed: 60.0,
            size: 30.0,
            base: BaseStats {
                resistance,
                dodge,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn dummy(resistance: f32, dodge: f32) -> Combatant {
        Combatant::new(
            "Dummy",
            CombatantKind::AiHero(ClassId::Guardian),
            Side::Heroes,
            template(resistance, dodge),
            Vec::new(),
            1,
            Vec2::ZERO,
        )
    }

    fn hit(raw: f32) -> IncomingHit {
        IncomingHit {
            raw,
            attacker: Some(Entity::from_raw(99)),
            accuracy: BASE_ACCURACY,
            never_miss: false,
        }
    }

    fn aura(ability: AbilityId, kind: AuraKind, effects: Vec<AuraEffect>, source: Entity) -> crate::battle::components::Aura {
        AuraTemplate {
            name: ability.name().into(),
            icon: String::new(),
            kind,
            duration_ms: 10_000.0,
            effects,
            max_stacks: None,
            payoff: None,
        }
        .instantiate(ability, source, None, 0.0)
    }

    #[test]
    fn test_plain_hit_deals_exact_damage() {
        let mut target = dummy(0.0, 0.0);
        let mut rng = GameRng::from_seed(1);
        let outcome = take_damage(&mut target, hit(100.0), &mut rng);
        assert_eq!(
            outcome,
            DamageOutcome::Hit {
                amount: 100.0,
                absorbed: 0.0,
                killed: false
            }
        );
        assert_eq!(target.hp, 900.0);
    }

    #[test]
    fn test_resistance_100_halves_damage() {
        assert_eq!(mitigate(100.0, 100.0), 50.0);
        assert_eq!(mitigate(100.0, 0.0), 100.0);
        assert_eq!(mitigate(0.2, 0.0), 1.0);
    }

    #[test]
    fn test_crit_formula() {
        assert_eq!(crit_damage(100.0, 50.0), 150.0);
        assert_eq!(crit_damage(33.0, 50.0), 50.0);
        assert!(crit_damage(7.0, 0.0) >= 7.0);
    }

    #[test]
    fn test_shield_absorbs_before_health() {
        let mut target = dummy(0.0, 0.0);
        target.shield = 30.0;
        let mut rng = GameRng::from_seed(1);
        let outcome = take_damage(&mut target, hit(100.0), &mut rng);
        assert_eq!(
            outcome,
            DamageOutcome::Hit {
                amount: 100.0,
                absorbed: 30.0,
                killed: false
            }
        );
        assert_eq!(target.shield, 0.0);
        assert_eq!(target.hp, 930.0);
    }

    #[test]
    fn test_two_block_charges_absorb_two_hits() {
        let mut target = dummy(0.0, 0.0);
        target.apply_aura(aura(
            AbilityId::ShieldWall,
            AuraKind::Buff,
            vec![AuraEffect::BlockCharges { charges: 2 }],
            Entity::from_raw(5),
        ));
        let mut rng = GameRng::from_seed(1);
        assert_eq!(take_damage(&mut target, hit(100.0), &mut rng), DamageOutcome::Blocked);
        assert!(target.has_aura(AbilityId::ShieldWall));
        assert_eq!(take_damage(&mut target, hit(100.0), &mut rng), DamageOutcome::Blocked);
        assert!(!target.has_aura(AbilityId::ShieldWall));
        assert!(matches!(take_damage(&mut target, hit(100.0), &mut rng), DamageOutcome::Hit { .. }));
        assert_eq!(target.hp, 900.0);
    }

    #[test]
    fn test_untargetable_but_visible_is_missed() {
        let mut target = dummy(0.0, 0.0);
        target.apply_aura(aura(AbilityId::Leap, AuraKind::Buff, vec![AuraEffect::Untargetable], Entity::from_raw(5)));
        let mut rng = GameRng::from_seed(1);
        assert_eq!(take_damage(&mut target, hit(100.0), &mut rng), DamageOutcome::Missed);
    }

    #[test]
    fn test_full_dodge_without_never_miss() {
        let mut target = dummy(0.0, 100.0);
        let mut rng = GameRng::from_seed(7);
        assert_eq!(target.stats.dodge, MAX_DODGE);
        let mut accurate = hit(100.0);
        accurate.accuracy = BASE_ACCURACY + MAX_DODGE;
        assert!(matches!(take_damage(&mut target, accurate, &mut rng), DamageOutcome::Hit { .. }));
        let mut sure = hit(100.0);
        sure.never_miss = true;
        assert!(matches!(take_damage(&mut target, sure, &mut rng), DamageOutcome::Hit { .. }));
    }

    #[test]
    fn test_mark_from_same_attacker_adds_bonus() {
        let attacker = Entity::from_raw(99);
        let mut target = dummy(0.0, 0.0);
        target.apply_aura(aura(AbilityId::MarkForDeath, AuraKind::Debuff, vec![AuraEffect::MissingHealthMark], attacker));
        let mut rng = GameRng::from_seed(1);
        let outcome = take_damage(&mut target, hit(100.0), &mut rng);
        assert!(matches!(outcome, DamageOutcome::Hit { amount, .. } if amount == 110.0));

        let mut other = hit(100.0);
        other.attacker = Some(Entity::from_raw(3));
        assert!(matches!(take_damage(&mut target, other, &mut rng), DamageOutcome::Hit { amount, .. } if amount == 100.0));
        assert!((mark_bonus(0.7) - MARK_MAX_BONUS).abs() < 1e-6);
        assert!((mark_bonus(1.0) - MARK_MAX_BONUS).abs() < 1e-6);
    }

    #[test]
    fn test_lethal_hit_kills() {
        let mut target = dummy(0.0, 0.0);
        let mut rng = GameRng::from_seed(1);
        let outcome = take_damage(&mut target, hit(5000.0), &mut rng);
        assert!(matches!(outcome, DamageOutcome::Hit { killed: true, .. }));
        assert!(!target.alive);
        assert_eq!(target.hp, 0.0);
        assert_eq!(take_damage(&mut target, hit(10.0), &mut rng), DamageOutcome::Missed);
    }

    #[test]
    fn test_heal_capped_at_max() {
        let mut target = dummy(0.0, 0.0);
        target.hp = 950.0;
        let outcome = receive_heal(&mut target, 200.0, false);
        assert_eq!(outcome.applied, 50.0);
        assert_eq!(outcome.burst, None);
        assert_eq!(target.hp, 1000.0);
    }

    #[test]
    fn test_treant_bursts_on_primary_heal_only() {
        let mut treant = dummy(0.0, 0.0);
        treant.kind = CombatantKind::TreeSummon {
            master: Entity::from_raw(1),
        };
        assert_eq!(receive_heal(&mut treant, 40.0, false).burst, Some(40.0 * TREANT_BURST_RATIO));
        assert_eq!(receive_heal(&mut treant, 40.0, true).burst, None);
    }

    #[test]
    fn test_shield_capped_at_max_hp() {
        let mut target = dummy(0.0, 0.0);
        assert_eq!(grant_shield(&mut target, 600.0), 600.0);
        assert_eq!(grant_shield(&mut target, 600.0), 400.0);
        assert_eq!(target.shield, 1000.0);
    }
}
