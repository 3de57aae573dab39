//! Roster Snapshots
//!
//! Per-frame, read-only copies of every combatant. Handlers, targeting and
//! continuations read the roster instead of ECS queries, so they can be
//! tested in isolation and never alias the mutable combatant data.
//!
//! Targets are weak references: an `Entity` that may no longer resolve.

use bevy::prelude::*;
use std::collections::HashMap;

use super::abilities::{AbilityId, SummonKind};
use super::components::{AuraKind, BossState, ClassResources, Combatant, CombatantKind, Side};
use super::stats::CombatStats;

/// Snapshot of one aura.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuraInfo {
    pub ability: AbilityId,
    pub source: Entity,
    pub stacks: u32,
    pub kind: AuraKind,
}

/// Per-frame snapshot of a single combatant.
#[derive(Clone, Debug)]
pub struct CombatantInfo {
    pub entity: Entity,
    pub name: String,
    pub kind: CombatantKind,
    pub side: Side,
    pub position: Vec2,
    pub hp: f32,
    pub shield: f32,
    pub alive: bool,
    pub untargetable: bool,
    pub invisible: bool,
    pub stunned: bool,
    pub stats: CombatStats,
    pub auras: Vec<AuraInfo>,
    pub resources: ClassResources,
    pub boss: BossState,
    pub target: Option<Entity>,
}

impl CombatantInfo {
    pub fn from_combatant(entity: Entity, c: &Combatant) -> Self {
        Self {
            entity,
            name: c.name.clone(),
            kind: c.kind,
            side: c.side,
            position: c.position,
            hp: c.hp,
            shield: c.shield,
            alive: c.alive,
            untargetable: c.is_untargetable(),
            invisible: c.is_invisible(),
            stunned: c.is_stunned(),
            stats: c.stats.clone(),
            auras: c
                .auras()
                .map(|a| AuraInfo {
                    ability: a.ability,
                    source: a.source,
                    stacks: a.stacks,
                    kind: a.kind,
                })
                .collect(),
            resources: c.resources.clone(),
            boss: c.boss.clone(),
            target: c.target,
        }
    }

    pub fn max_hp(&self) -> f32 {
        self.stats.max_hp
    }

    pub fn health_pct(&self) -> f32 {
        if self.stats.max_hp > 0.0 {
            self.hp / self.stats.max_hp
        } else {
            0.0
        }
    }

    pub fn missing_health(&self) -> f32 {
        (self.stats.max_hp - self.hp).max(0.0)
    }

    /// Alive and open to direct targeting.
    pub fn is_targetable(&self) -> bool {
        self.alive && !self.untargetable && !self.invisible
    }

    /// Alive and able to be hit by area effects.
    pub fn is_hittable(&self) -> bool {
        self.alive && !self.untargetable
    }

    /// Gap between the two bodies' edges.
    pub fn edge_distance(&self, other: &CombatantInfo) -> f32 {
        (self.position.distance(other.position) - (self.stats.size + other.stats.size) / 2.0).max(0.0)
    }

    pub fn in_range(&self, other: &CombatantInfo, range: f32) -> bool {
        self.edge_distance(other) <= range
    }

    pub fn has_aura(&self, ability: AbilityId) -> bool {
        self.auras.iter().any(|a| a.ability == ability)
    }

    pub fn has_aura_from(&self, ability: AbilityId, source: Entity) -> bool {
        self.auras.iter().any(|a| a.ability == ability && a.source == source)
    }

    pub fn is_opponent_of(&self, other: &CombatantInfo) -> bool {
        self.side != other.side
    }
}

/// Snapshot of all combatants, ordered by entity for deterministic iteration.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    entries: Vec<CombatantInfo>,
    index: HashMap<Entity, usize>,
}

impl Roster {
    pub fn build<'a>(combatants: impl Iterator<Item = (Entity, &'a Combatant)>) -> Self {
        let mut entries: Vec<CombatantInfo> = combatants
            .map(|(entity, c)| CombatantInfo::from_combatant(entity, c))
            .collect();
        entries.sort_by_key(|info| info.entity);
        let index = entries.iter().enumerate().map(|(i, info)| (info.entity, i)).collect();
        Self { entries, index }
    }

    pub fn get(&self, entity: Entity) -> Option<&CombatantInfo> {
        self.index.get(&entity).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatantInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Living members of `side`.
    pub fn allies(&self, side: Side) -> impl Iterator<Item = &CombatantInfo> {
        self.entries.iter().filter(move |c| c.alive && c.side == side)
    }

    /// Living, hittable members of the side opposing `side`.
    pub fn enemies(&self, side: Side) -> impl Iterator<Item = &CombatantInfo> {
        self.entries
            .iter()
            .filter(move |c| c.side != side && c.is_hittable())
    }

    /// Hittable enemies of `side` whose bodies overlap the circle.
    pub fn enemies_within(&self, side: Side, center: Vec2, radius: f32) -> Vec<&CombatantInfo> {
        self.enemies(side)
            .filter(|c| c.position.distance(center) <= radius + c.stats.size / 2.0)
            .collect()
    }

    /// Living allies of `side` whose bodies overlap the circle.
    pub fn allies_within(&self, side: Side, center: Vec2, radius: f32) -> Vec<&CombatantInfo> {
        self.allies(side)
            .filter(|c| c.position.distance(center) <= radius + c.stats.size / 2.0)
            .collect()
    }

    /// Nearest enemy of `from` that can be directly targeted.
    pub fn nearest_targetable_enemy(&self, from: &CombatantInfo) -> Option<&CombatantInfo> {
        self.entries
            .iter()
            .filter(|c| c.side != from.side && c.is_targetable())
            .min_by(|a, b| {
                a.position
                    .distance(from.position)
                    .total_cmp(&b.position.distance(from.position))
            })
    }

    /// Living summons of `kind` belonging to `master`.
    pub fn summon_count(&self, master: Entity, kind: SummonKind) -> usize {
        self.entries
            .iter()
            .filter(|c| c.alive && c.kind.master() == Some(master) && c.kind.summon_kind() == Some(kind))
            .count()
    }

    /// Ally of `caster` (including itself) within `range` with the lowest health
    /// fraction below `below_pct`.
    pub fn most_injured_ally(&self, caster: &CombatantInfo, range: f32, below_pct: f32) -> Option<&CombatantInfo> {
        self.most_injured_where(caster, range, below_pct, |_| true)
    }

    /// [`Roster::most_injured_ally`], skipping allies that already carry `aura`
    /// from anyone.
    pub fn most_injured_ally_without(
        &self,
        caster: &CombatantInfo,
        range: f32,
        below_pct: f32,
        aura: AbilityId,
    ) -> Option<&CombatantInfo> {
        self.most_injured_where(caster, range, below_pct, |c| !c.has_aura(aura))
    }

    fn most_injured_where(
        &self,
        caster: &CombatantInfo,
        range: f32,
        below_pct: f32,
        keep: impl Fn(&CombatantInfo) -> bool,
    ) -> Option<&CombatantInfo> {
        self.allies(caster.side)
            .filter(|c| c.entity == caster.entity || caster.in_range(c, range))
            .filter(|c| c.health_pct() < below_pct && keep(c))
            .min_by(|a, b| a.health_pct().total_cmp(&b.health_pct()))
    }

    /// Convenience for tests and tools: the first combatant of a kind.
    pub fn find_kind(&self, pred: impl Fn(&CombatantKind) -> bool) -> Option<&CombatantInfo> {
        self.entries.iter().find(|c| pred(&c.kind))
    }
}
