//! Stat Pipeline
//!
//! Pure function turning (template, equipment, auras, threat) into a resolved
//! `CombatStats` snapshot. `Combatant::recalculate_stats` is the only caller in
//! the simulation; it runs whenever equipment or auras change.
//!
//! Order of operations:
//! 1. seed from the template's base block
//! 2. heroes add equipment (flat stats scale with threat, percent-type stats don't,
//!    item resistance is capped); creatures scale lethality/vigor with threat and
//!    cap template resistance
//! 3. fold auras: flats add, percents sum per stat and apply once, an attack
//!    interval override wins outright
//! 4. clamp resistance into the hero/creature range
//! 5. derive max health, damage, attack interval, range and movement speed

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::abilities::Role;
use super::ability_config::{ItemDef, UnitTemplate};
use super::components::auras::{Aura, AuraEffect};
use super::constants::*;

/// Every stat an item or aura can modify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Lethality,
    Vigor,
    AttackSpeed,
    CritChance,
    CritDamage,
    Dodge,
    Accuracy,
    Resistance,
    Vampirism,
    HealingPower,
    HealingReceived,
    MovementSpeed,
    /// Flat/percent on effective damage
    Damage,
    /// Flat/percent on max health
    MaxHealth,
    /// Percent on template range
    Range,
}

impl StatKind {
    /// Percent-type stats are not scaled by threat when they come from items.
    pub fn is_percent_type(&self) -> bool {
        matches!(
            self,
            StatKind::AttackSpeed
                | StatKind::CritChance
                | StatKind::CritDamage
                | StatKind::Dodge
                | StatKind::Accuracy
                | StatKind::Vampirism
                | StatKind::HealingReceived
                | StatKind::Resistance
                | StatKind::Range
        )
    }
}

/// The primary stat block carried by class and enemy templates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStats {
    pub lethality: f32,
    pub vigor: f32,
    pub attack_speed: f32,
    pub crit_chance: f32,
    pub crit_damage: f32,
    pub dodge: f32,
    pub accuracy: f32,
    pub resistance: f32,
    pub vampirism: f32,
    pub healing_power: f32,
    pub healing_received: f32,
    pub movement_speed: f32,
}

impl Default for BaseStats {
    fn default() -> Self {
        Self {
            lethality: 0.0,
            vigor: 0.0,
            attack_speed: 0.0,
            crit_chance: 5.0,
            crit_damage: 50.0,
            dodge: 0.0,
            accuracy: BASE_ACCURACY,
            resistance: 0.0,
            vampirism: 0.0,
            healing_power: 0.0,
            healing_received: 0.0,
            movement_speed: 0.0,
        }
    }
}

impl BaseStats {
    fn slot(&mut self, stat: StatKind) -> Option<&mut f32> {
        Some(match stat {
            StatKind::Lethality => &mut self.lethality,
            StatKind::Vigor => &mut self.vigor,
            StatKind::AttackSpeed => &mut self.attack_speed,
            StatKind::CritChance => &mut self.crit_chance,
            StatKind::CritDamage => &mut self.crit_damage,
            StatKind::Dodge => &mut self.dodge,
            StatKind::Accuracy => &mut self.accuracy,
            StatKind::Resistance => &mut self.resistance,
            StatKind::Vampirism => &mut self.vampirism,
            StatKind::HealingPower => &mut self.healing_power,
            StatKind::HealingReceived => &mut self.healing_received,
            StatKind::MovementSpeed => &mut self.movement_speed,
            StatKind::Damage | StatKind::MaxHealth | StatKind::Range => return None,
        })
    }
}

/// How the template is scaled by threat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatScaling {
    /// Heroes: template as-is, equipment scales
    Hero,
    /// Enemies and summons: lethality/vigor scale by `1 + scaling·(threat−1)`
    Creature { scaling: f32 },
}

/// Everything the pipeline reads.
pub struct StatInputs<'a> {
    pub template: &'a UnitTemplate,
    pub scaling: StatScaling,
    pub items: &'a [ItemDef],
    pub buffs: &'a [Aura],
    pub debuffs: &'a [Aura],
    pub threat: u32,
    pub is_opponent: bool,
}

/// Fully resolved combat stats. Never mutated directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombatStats {
    pub max_hp: f32,
    pub damage: f32,
    pub attack_interval_ms: f32,
    pub range: f32,
    pub movement_speed: f32,
    pub lethality: f32,
    pub vigor: f32,
    pub crit_chance: f32,
    pub crit_damage: f32,
    pub dodge: f32,
    pub accuracy: f32,
    pub resistance: f32,
    pub vampirism: f32,
    pub healing_power: f32,
    pub healing_received: f32,
    pub size: f32,
    pub role: Role,
    pub is_opponent: bool,
    pub visual: String,
}

/// Item flat stats grow 10% per threat level above 1.
pub fn item_threat_factor(threat: u32) -> f32 {
    1.0 + ITEM_THREAT_SCALING * (threat.max(1) - 1) as f32
}

/// Resolve a stat snapshot.
pub fn compute_stats(input: &StatInputs) -> CombatStats {
    let template = input.template;
    let mut work = template.base.clone();
    let mut flat_damage = 0.0;
    let mut flat_max_hp = 0.0;
    let threat_steps = (input.threat.max(1) - 1) as f32;

    let resistance_range = match input.scaling {
        StatScaling::Hero => {
            let factor = item_threat_factor(input.threat);
            let mut item_resistance = 0.0;
            for item in input.items {
                for &(stat, amount) in &item.stats {
                    match stat {
                        StatKind::Resistance => item_resistance += amount,
                        StatKind::Damage => flat_damage += amount * factor,
                        StatKind::MaxHealth => flat_max_hp += amount * factor,
                        _ if stat.is_percent_type() => {
                            if let Some(slot) = work.slot(stat) {
                                *slot += amount;
                            }
                        }
                        _ => {
                            if let Some(slot) = work.slot(stat) {
                                *slot += amount * factor;
                            }
                        }
                    }
                }
            }
            work.resistance += item_resistance.min(ITEM_RESISTANCE_CAP);
            HERO_RESISTANCE_RANGE
        }
        StatScaling::Creature { scaling } => {
            let factor = 1.0 + scaling * threat_steps;
            work.lethality *= factor;
            work.vigor *= factor;
            work.resistance = work.resistance.min(ENEMY_TEMPLATE_RESISTANCE_CAP);
            ENEMY_RESISTANCE_RANGE
        }
    };

    // Fold auras. Percents accumulate per stat and are applied exactly once.
    let mut percents: HashMap<StatKind, f32> = HashMap::new();
    let mut interval_override: Option<f32> = None;
    for aura in input.buffs.iter().chain(input.debuffs.iter()) {
        let stacks = aura.stacks.max(1) as f32;
        for effect in &aura.effects {
            match effect {
                AuraEffect::StatFlat { stat, amount } => match stat {
                    StatKind::Damage => flat_damage += amount * stacks,
                    StatKind::MaxHealth => flat_max_hp += amount * stacks,
                    _ => {
                        if let Some(slot) = work.slot(*stat) {
                            *slot += amount * stacks;
                        }
                    }
                },
                AuraEffect::StatPercent { stat, percent } => {
                    *percents.entry(*stat).or_insert(0.0) += percent * stacks;
                }
                AuraEffect::OverrideAttackInterval { interval_ms } => {
                    interval_override = Some(match interval_override {
                        Some(current) => current.min(*interval_ms),
                        None => *interval_ms,
                    });
                }
                _ => {}
            }
        }
    }

    let multiplier = |stat: StatKind| 1.0 + percents.get(&stat).copied().unwrap_or(0.0) / 100.0;
    for stat in [
        StatKind::Lethality,
        StatKind::Vigor,
        StatKind::Resistance,
        StatKind::HealingPower,
    ] {
        if percents.contains_key(&stat) {
            let m = multiplier(stat);
            if let Some(slot) = work.slot(stat) {
                *slot *= m;
            }
        }
    }
    // These are already percentages, so their auras add points.
    for stat in [
        StatKind::AttackSpeed,
        StatKind::CritChance,
        StatKind::CritDamage,
        StatKind::Dodge,
        StatKind::Accuracy,
        StatKind::Vampirism,
        StatKind::HealingReceived,
    ] {
        if let (Some(points), Some(slot)) = (percents.get(&stat), work.slot(stat)) {
            *slot += points;
        }
    }

    let resistance = work.resistance.clamp(resistance_range.0, resistance_range.1);

    let max_hp = ((work.vigor * HEALTH_PER_VIGOR + template.hp + flat_max_hp) * multiplier(StatKind::MaxHealth)).max(1.0);
    let damage = ((work.lethality * DAMAGE_PER_LETHALITY + template.damage + flat_damage) * multiplier(StatKind::Damage)).max(0.0);
    let attack_speed = work.attack_speed.max(MIN_ATTACK_SPEED);
    let attack_interval_ms = interval_override
        .unwrap_or(template.attack_interval_ms / (1.0 + attack_speed / 100.0))
        .max(MIN_ATTACK_INTERVAL_MS);
    let range = template.range * multiplier(StatKind::Range).max(0.0);
    let movement_speed = ((template.movement_speed + work.movement_speed) * multiplier(StatKind::MovementSpeed)).max(0.0);

    CombatStats {
        max_hp,
        damage,
        attack_interval_ms,
        range,
        movement_speed,
        lethality: work.lethality,
        vigor: work.vigor,
        crit_chance: work.crit_chance.clamp(0.0, 100.0),
        crit_damage: work.crit_damage.max(0.0),
        dodge: work.dodge.clamp(0.0, MAX_DODGE),
        accuracy: work.accuracy,
        resistance,
        vampirism: work.vampirism.max(0.0),
        healing_power: work.healing_power.max(0.0),
        healing_received: work.healing_received.max(-100.0),
        size: template.size,
        role: template.role,
        is_opponent: input.is_opponent,
        visual: template.visual.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::{AbilityId, ClassId};
    use crate::battle::ability_config::ContentDefinitions;
    use crate::battle::components::auras::{AuraKind, AuraTemplate};
    use bevy::prelude::Entity;

    fn template() -> UnitTemplate {
        UnitTemplate {
            name: "Test".into(),
            visual: "T".into(),
            hp: 200.0,
            damage: 10.0,
            attack_interval_ms: 1000.0,
            range: 40.0,
            movement_speed: 80.0,
            size: 30.0,
            base: BaseStats {
                lethality: 4.0,
                vigor: 2.0,
                resistance: 20.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn buff(effects: Vec<AuraEffect>) -> Aura {
        AuraTemplate {
            name: "Buff".into(),
            icon: String::new(),
            kind: AuraKind::Buff,
            duration_ms: 1000.0,
            effects,
            max_stacks: None,
            payoff: None,
        }
        .instantiate(AbilityId::WarAnthem, Entity::from_raw(9), None, 0.0)
    }

    fn hero_inputs<'a>(t: &'a UnitTemplate, items: &'a [ItemDef], buffs: &'a [Aura], threat: u32) -> StatInputs<'a> {
        StatInputs {
            template: t,
            scaling: StatScaling::Hero,
            items,
            buffs,
            debuffs: &[],
            threat,
            is_opponent: false,
        }
    }

    #[test]
    fn test_derived_health_and_damage() {
        let t = template();
        let stats = compute_stats(&hero_inputs(&t, &[], &[], 1));
        assert_eq!(stats.max_hp, 400.0);
        assert_eq!(stats.damage, 15.0);
        assert_eq!(stats.attack_interval_ms, 1000.0);
        assert_eq!(stats.range, 40.0);
    }

    #[test]
    fn test_percent_modifiers_are_additive() {
        let t = template();
        let buffs = vec![
            buff(vec![AuraEffect::StatPercent {
                stat: StatKind::Damage,
                percent: 20.0,
            }]),
            {
                let mut b = buff(vec![AuraEffect::StatPercent {
                    stat: StatKind::Damage,
                    percent: 30.0,
                }]);
                b.ability = AbilityId::Bloodlust;
                b
            },
        ];
        let stats = compute_stats(&hero_inputs(&t, &[], &buffs, 1));
        // 15 * 1.5, not 15 * 1.2 * 1.3
        assert!((stats.damage - 22.5).abs() < 1e-4);
    }

    fn content_aura(content: &ContentDefinitions, ability: AbilityId) -> Aura {
        content
            .aura_template(ability)
            .expect("aura template")
            .instantiate(ability, Entity::from_raw(9), None, 0.0)
    }

    #[test]
    fn test_bloodlust_shortens_attack_interval() {
        let content = ContentDefinitions::builtin().unwrap();
        let berserker = content.class(ClassId::Berserker).unwrap();
        assert_eq!(berserker.base.attack_speed, 0.0);

        let before = compute_stats(&hero_inputs(berserker, &[], &[], 1));
        let buffs = vec![content_aura(&content, AbilityId::Bloodlust)];
        let after = compute_stats(&hero_inputs(berserker, &[], &buffs, 1));

        assert!((after.attack_interval_ms - before.attack_interval_ms / 1.4).abs() < 1e-3);
        assert!(after.vampirism > before.vampirism);
    }

    #[test]
    fn test_frenzy_stacks_add_attack_speed_points() {
        let content = ContentDefinitions::builtin().unwrap();
        let berserker = content.class(ClassId::Berserker).unwrap();
        let mut frenzy = content_aura(&content, AbilityId::Frenzy);
        frenzy.stacks = 3;
        let buffs = vec![frenzy];
        let stats = compute_stats(&hero_inputs(berserker, &[], &buffs, 1));
        // 3 stacks of +5 points
        assert!((stats.attack_interval_ms - berserker.attack_interval_ms / 1.15).abs() < 1e-3);
    }

    #[test]
    fn test_decay_and_barkskin_move_healing_received() {
        let content = ContentDefinitions::builtin().unwrap();
        let cleric = content.class(ClassId::Cleric).unwrap();
        let decay = vec![content_aura(&content, AbilityId::Decay)];
        let stats = compute_stats(&StatInputs {
            template: cleric,
            scaling: StatScaling::Hero,
            items: &[],
            buffs: &[],
            debuffs: &decay,
            threat: 1,
            is_opponent: false,
        });
        assert_eq!(stats.healing_received, -25.0);

        let barkskin = vec![content_aura(&content, AbilityId::Barkskin)];
        let stats = compute_stats(&hero_inputs(cleric, &[], &barkskin, 1));
        assert_eq!(stats.healing_received, 20.0);
    }

    #[test]
    fn test_attack_interval_override_wins() {
        let t = template();
        let buffs = vec![buff(vec![
            AuraEffect::StatFlat {
                stat: StatKind::AttackSpeed,
                amount: 100.0,
            },
            AuraEffect::OverrideAttackInterval { interval_ms: 900.0 },
        ])];
        let stats = compute_stats(&hero_inputs(&t, &[], &buffs, 1));
        assert_eq!(stats.attack_interval_ms, 900.0);
    }

    #[test]
    fn test_item_flat_stats_scale_with_threat_but_percents_do_not() {
        let t = template();
        let items = vec![ItemDef {
            name: "Blade".into(),
            stats: vec![(StatKind::Lethality, 4.0), (StatKind::CritChance, 10.0)],
            passive: None,
        }];
        let stats = compute_stats(&hero_inputs(&t, &items, &[], 6));
        // 4 base + 4 * 1.5
        assert!((stats.lethality - 10.0).abs() < 1e-4);
        assert!((stats.crit_chance - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_item_resistance_capped() {
        let t = template();
        let items = vec![ItemDef {
            name: "Plate".into(),
            stats: vec![(StatKind::Resistance, 200.0)],
            passive: None,
        }];
        let stats = compute_stats(&hero_inputs(&t, &items, &[], 1));
        assert_eq!(stats.resistance, 20.0 + ITEM_RESISTANCE_CAP);
    }

    #[test]
    fn test_creature_scaling_touches_only_lethality_and_vigor() {
        let mut t = template();
        t.base.resistance = 90.0;
        t.base.dodge = 10.0;
        let stats = compute_stats(&StatInputs {
            template: &t,
            scaling: StatScaling::Creature { scaling: 0.5 },
            items: &[],
            buffs: &[],
            debuffs: &[],
            threat: 3,
            is_opponent: true,
        });
        assert_eq!(stats.lethality, 8.0);
        assert_eq!(stats.vigor, 4.0);
        assert_eq!(stats.dodge, 10.0);
        assert_eq!(stats.resistance, ENEMY_TEMPLATE_RESISTANCE_CAP);
        assert!(stats.is_opponent);
    }

    #[test]
    fn test_range_percent_multiplies_template_range() {
        let t = template();
        let buffs = vec![buff(vec![AuraEffect::StatPercent {
            stat: StatKind::Range,
            percent: 25.0,
        }])];
        let stats = compute_stats(&hero_inputs(&t, &[], &buffs, 1));
        assert_eq!(stats.range, 50.0);
    }
}
