//! Aura Components
//!
//! Buff/debuff system: the effect bag (`AuraEffect`), tick amounts, stack
//! payoffs, the config-side `AuraTemplate` and the live `Aura`.
//!
//! An aura is unique by ability id within its list. Reapplying refreshes it in
//! place; auras with `max_stacks` gain a stack instead and fire their payoff
//! exactly once when the cap is reached, removing themselves.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::battle::abilities::AbilityId;
use crate::battle::stats::{CombatStats, StatKind};

/// Buffs and debuffs live in separate lists on the combatant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuraKind {
    Buff,
    Debuff,
}

/// Per-tick magnitude of a periodic effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TickAmount {
    /// Fixed value per tick
    Fixed(f32),
    /// Resolved from the source's stats once, when the aura lands
    FromStats {
        base: f32,
        #[serde(default)]
        lethality: f32,
        #[serde(default)]
        healing_power: f32,
    },
    /// Re-evaluated every tick from the source's current stats and the
    /// bearer's missing health
    Dynamic {
        base: f32,
        #[serde(default)]
        lethality: f32,
        #[serde(default)]
        healing_power: f32,
        #[serde(default)]
        missing_health: f32,
    },
}

impl TickAmount {
    /// Freeze stat-derived amounts against the source's stats at application time.
    pub fn freeze(&self, source: Option<&CombatStats>) -> TickAmount {
        match (self, source) {
            (
                TickAmount::FromStats {
                    base,
                    lethality,
                    healing_power,
                },
                Some(stats),
            ) => TickAmount::Fixed(base + lethality * stats.lethality + healing_power * stats.healing_power),
            (TickAmount::FromStats { base, .. }, None) => TickAmount::Fixed(*base),
            (other, _) => other.clone(),
        }
    }

    /// Amount for one tick. `source` is the caster's current stats if it still exists.
    pub fn evaluate(&self, source: Option<&CombatStats>, bearer_missing_health: f32) -> f32 {
        let amount = match self {
            TickAmount::Fixed(value) => *value,
            TickAmount::FromStats {
                base,
                lethality,
                healing_power,
            } => {
                let (l, h) = source.map_or((0.0, 0.0), |s| (s.lethality, s.healing_power));
                base + lethality * l + healing_power * h
            }
            TickAmount::Dynamic {
                base,
                lethality,
                healing_power,
                missing_health,
            } => {
                let (l, h) = source.map_or((0.0, 0.0), |s| (s.lethality, s.healing_power));
                base + lethality * l + healing_power * h + missing_health * bearer_missing_health.max(0.0)
            }
        };
        amount.max(0.0)
    }
}

/// One entry of an aura's effect bag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AuraEffect {
    /// Flat bonus to a stat (scaled by stack count)
    StatFlat { stat: StatKind, amount: f32 },
    /// Percent bonus to a stat; all percents on a stat are summed, then applied once
    StatPercent { stat: StatKind, percent: f32 },
    /// Replaces the computed attack interval outright
    OverrideAttackInterval { interval_ms: f32 },
    DamageOverTime {
        amount: TickAmount,
        interval_ms: f32,
        #[serde(default)]
        last_tick_ms: f64,
    },
    HealOverTime {
        amount: TickAmount,
        interval_ms: f32,
        #[serde(default)]
        last_tick_ms: f64,
    },
    /// Pulses around the bearer: heals allies and damages enemies in `radius`
    ChannelledAura {
        radius: f32,
        heal: TickAmount,
        damage: TickAmount,
        interval_ms: f32,
        #[serde(default)]
        last_tick_ms: f64,
    },
    Immobilize,
    Stun,
    Invisibility,
    Untargetable,
    Invulnerable,
    /// Forces the bearer to target the aura's source
    Taunt,
    /// Each charge fully negates one hit
    BlockCharges { charges: u32 },
    /// Consumed by the bearer's next basic attack
    NextAttack {
        damage_percent: f32,
        #[serde(default)]
        guaranteed_crit: bool,
    },
    /// Multiplies movement speed until the bearer reaches its target
    DashToTarget { speed_multiplier: f32 },
    /// Hits from the aura's source deal bonus damage based on missing health
    MissingHealthMark,
}

impl AuraEffect {
    /// Whether this effect ticks on its own interval.
    pub fn is_periodic(&self) -> bool {
        matches!(
            self,
            AuraEffect::DamageOverTime { .. } | AuraEffect::HealOverTime { .. } | AuraEffect::ChannelledAura { .. }
        )
    }

    fn with_start_time(mut self, now_ms: f64, source: Option<&CombatStats>) -> Self {
        match &mut self {
            AuraEffect::DamageOverTime { amount, last_tick_ms, .. }
            | AuraEffect::HealOverTime { amount, last_tick_ms, .. } => {
                *amount = amount.freeze(source);
                *last_tick_ms = now_ms;
            }
            AuraEffect::ChannelledAura {
                heal,
                damage,
                last_tick_ms,
                ..
            } => {
                *heal = heal.freeze(source);
                *damage = damage.freeze(source);
                *last_tick_ms = now_ms;
            }
            _ => {}
        }
        self
    }
}

/// What happens when a stacking aura reaches its cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackPayoff {
    /// Aura applied to the bearer in place of the stacking aura
    pub apply: AbilityId,
}

/// Aura definition as written in the content files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuraTemplate {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub kind: AuraKind,
    pub duration_ms: f32,
    pub effects: Vec<AuraEffect>,
    #[serde(default)]
    pub max_stacks: Option<u32>,
    #[serde(default)]
    pub payoff: Option<StackPayoff>,
}

impl AuraTemplate {
    /// Build a live aura. Stat-derived tick amounts are frozen against
    /// `source_stats` here, so a DOT reflects the attacker at hit time.
    pub fn instantiate(
        &self,
        ability: AbilityId,
        source: Entity,
        source_stats: Option<&CombatStats>,
        now_ms: f64,
    ) -> Aura {
        Aura {
            ability,
            name: self.name.clone(),
            icon: self.icon.clone(),
            kind: self.kind,
            duration_ms: self.duration_ms,
            remaining_ms: self.duration_ms,
            effects: self
                .effects
                .iter()
                .cloned()
                .map(|e| e.with_start_time(now_ms, source_stats))
                .collect(),
            source,
            stacks: 1,
            max_stacks: self.max_stacks,
            payoff: self.payoff,
        }
    }
}

/// A buff or debuff on a combatant.
#[derive(Clone, Debug)]
pub struct Aura {
    pub ability: AbilityId,
    pub name: String,
    pub icon: String,
    pub kind: AuraKind,
    pub duration_ms: f32,
    pub remaining_ms: f32,
    pub effects: SmallVec<[AuraEffect; 2]>,
    /// Entity that applied the aura (may no longer exist)
    pub source: Entity,
    pub stacks: u32,
    pub max_stacks: Option<u32>,
    pub payoff: Option<StackPayoff>,
}

impl Aura {
    pub fn has_effect(&self, pred: impl Fn(&AuraEffect) -> bool) -> bool {
        self.effects.iter().any(pred)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ms <= 0.0
    }
}

/// Result of putting an aura on a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuraApplyOutcome {
    Applied,
    Refreshed,
    Stacked(u32),
    /// The stacking aura hit its cap and was removed; the payoff must fire now
    ReachedMax(Option<StackPayoff>),
}

/// Put `aura` on `list`, refreshing or stacking an entry with the same id.
pub fn apply_to_list(list: &mut Vec<Aura>, aura: Aura) -> AuraApplyOutcome {
    let Some(index) = list.iter().position(|a| a.ability == aura.ability) else {
        if let Some(max) = aura.max_stacks {
            if aura.stacks >= max {
                return AuraApplyOutcome::ReachedMax(aura.payoff);
            }
        }
        list.push(aura);
        return AuraApplyOutcome::Applied;
    };

    let existing = &mut list[index];
    match existing.max_stacks {
        Some(max) => {
            existing.stacks += aura.stacks.max(1);
            existing.remaining_ms = aura.duration_ms;
            existing.duration_ms = aura.duration_ms;
            existing.source = aura.source;
            if existing.stacks >= max {
                let payoff = existing.payoff;
                list.remove(index);
                AuraApplyOutcome::ReachedMax(payoff)
            } else {
                AuraApplyOutcome::Stacked(existing.stacks)
            }
        }
        None => {
            *existing = aura;
            AuraApplyOutcome::Refreshed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poison_template() -> AuraTemplate {
        AuraTemplate {
            name: "Poison".into(),
            icon: "poison".into(),
            kind: AuraKind::Debuff,
            duration_ms: 6000.0,
            effects: vec![AuraEffect::DamageOverTime {
                amount: TickAmount::FromStats {
                    base: 2.0,
                    lethality: 0.5,
                    healing_power: 0.0,
                },
                interval_ms: 1000.0,
                last_tick_ms: 0.0,
            }],
            max_stacks: Some(5),
            payoff: Some(StackPayoff {
                apply: AbilityId::Paralysis,
            }),
        }
    }

    #[test]
    fn test_stack_payoff_fires_once_and_removes() {
        let template = poison_template();
        let source = Entity::from_raw(1);
        let mut list = Vec::new();
        let mut payoffs = 0;
        for i in 0..5 {
            let outcome = apply_to_list(&mut list, template.instantiate(AbilityId::PoisonArrow, source, None, 0.0));
            match outcome {
                AuraApplyOutcome::ReachedMax(Some(payoff)) => {
                    assert_eq!(payoff.apply, AbilityId::Paralysis);
                    payoffs += 1;
                }
                AuraApplyOutcome::Applied => assert_eq!(i, 0),
                AuraApplyOutcome::Stacked(n) => assert_eq!(n, i + 1),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(payoffs, 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_non_stacking_refresh_replaces() {
        let mut template = poison_template();
        template.max_stacks = None;
        template.payoff = None;
        let source = Entity::from_raw(1);
        let mut list = Vec::new();
        apply_to_list(&mut list, template.instantiate(AbilityId::Decay, source, None, 0.0));
        list[0].remaining_ms = 10.0;
        let outcome = apply_to_list(&mut list, template.instantiate(AbilityId::Decay, source, None, 500.0));
        assert_eq!(outcome, AuraApplyOutcome::Refreshed);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].remaining_ms, 6000.0);
    }

    #[test]
    fn test_dot_amount_frozen_at_application() {
        let template = poison_template();
        let stats = CombatStats {
            lethality: 10.0,
            ..Default::default()
        };
        let aura = template.instantiate(AbilityId::PoisonArrow, Entity::from_raw(3), Some(&stats), 250.0);
        match &aura.effects[0] {
            AuraEffect::DamageOverTime {
                amount, last_tick_ms, ..
            } => {
                assert_eq!(*amount, TickAmount::Fixed(7.0));
                assert_eq!(*last_tick_ms, 250.0);
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_amount_uses_missing_health() {
        let amount = TickAmount::Dynamic {
            base: 5.0,
            lethality: 0.0,
            healing_power: 1.0,
            missing_health: 0.1,
        };
        let stats = CombatStats {
            healing_power: 20.0,
            ..Default::default()
        };
        assert_eq!(amount.evaluate(Some(&stats), 100.0), 35.0);
        assert_eq!(amount.evaluate(None, 0.0), 5.0);
    }
}
