//! Component Definitions for the Battle
//!
//! ECS components, resources and data structures used during the simulation.
//!
//! ## Module Structure
//! - `auras`: Buff/debuff system (AuraEffect, AuraTemplate, Aura)
//! - `visual`: Presentation cues (damage numbers, VFX, notifications)
//!
//! The `Combatant` component owns everything about one fighter: derived stats,
//! health/shield, aura lists, cooldowns, class resources and boss phase state.

pub mod auras;
pub mod visual;

use bevy::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use smallvec::SmallVec;
use std::collections::HashMap;

use super::abilities::{AbilityId, ClassId, EnemyId, Note, ResourceKind, SummonKind};
use super::ability_config::{ItemDef, UnitTemplate};
use super::constants::*;
use super::stats::{compute_stats, CombatStats, StatInputs, StatScaling};

pub use auras::{apply_to_list, Aura, AuraApplyOutcome, AuraEffect, AuraKind, AuraTemplate, StackPayoff, TickAmount};

// ============================================================================
// Resources
// ============================================================================

/// Seeded random number generator for deterministic battle simulation.
///
/// When a seed is provided (e.g., via headless config), the same seed will
/// always produce the same battle. Without a seed, uses system entropy.
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    /// Create a new GameRng with a specific seed for deterministic behavior
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a new GameRng with random entropy (non-deterministic)
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Generate a random f32 in the range [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Generate a random f32 in the given range
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }

    /// Roll against a percent chance (0-100).
    pub fn roll_percent(&mut self, chance: f32) -> bool {
        chance > 0.0 && self.random_f32() * 100.0 < chance
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Battle time. Advanced once per frame, either from `Time` or a fixed step.
#[derive(Resource, Debug, Clone, Default)]
pub struct BattleClock {
    /// Milliseconds since the battle app started
    pub now_ms: f64,
    /// Length of the current frame
    pub delta_ms: f32,
    /// Fixed frame length (headless, tests); `None` uses real time
    pub fixed_step_ms: Option<f32>,
    /// Frames simulated so far
    pub frame: u64,
}

impl BattleClock {
    pub fn fixed(step_ms: f32) -> Self {
        Self {
            fixed_step_ms: Some(step_ms),
            ..Default::default()
        }
    }
}

/// Arena bounds for movement clamping.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ArenaBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 600.0,
        }
    }
}

impl ArenaBounds {
    /// Clamp a body of the given size inside the arena.
    pub fn clamp(&self, position: Vec2, size: f32) -> Vec2 {
        let half = (size / 2.0).min(self.width / 2.0).min(self.height / 2.0);
        Vec2::new(
            position.x.clamp(half, self.width - half),
            position.y.clamp(half, self.height - half),
        )
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// Which side a combatant fights for. Summons inherit their master's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Heroes,
    Opponents,
}

impl Side {
    pub fn opposing(&self) -> Side {
        match self {
            Side::Heroes => Side::Opponents,
            Side::Opponents => Side::Heroes,
        }
    }
}

/// Concrete combatant variants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CombatantKind {
    /// Hero driven by explicit ability requests
    PlayerHero(ClassId),
    /// Hero driven by AI (allied or opposing)
    AiHero(ClassId),
    Enemy(EnemyId),
    SkeletonSummon { master: Entity },
    TreeSummon { master: Entity },
}

impl CombatantKind {
    pub fn class(&self) -> Option<ClassId> {
        match self {
            CombatantKind::PlayerHero(c) | CombatantKind::AiHero(c) => Some(*c),
            _ => None,
        }
    }

    pub fn enemy(&self) -> Option<EnemyId> {
        match self {
            CombatantKind::Enemy(e) => Some(*e),
            _ => None,
        }
    }

    /// The summoner, for summons.
    pub fn master(&self) -> Option<Entity> {
        match self {
            CombatantKind::SkeletonSummon { master } | CombatantKind::TreeSummon { master } => Some(*master),
            _ => None,
        }
    }

    pub fn summon_kind(&self) -> Option<SummonKind> {
        match self {
            CombatantKind::SkeletonSummon { .. } => Some(SummonKind::Skeleton),
            CombatantKind::TreeSummon { .. } => Some(SummonKind::Treant),
            _ => None,
        }
    }

    pub fn is_summon(&self) -> bool {
        self.master().is_some()
    }

    pub fn is_hero(&self) -> bool {
        self.class().is_some()
    }
}

/// Class-specific resource gauges. Only the fields the class uses are `Some`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassResources {
    pub fury: Option<f32>,
    pub corruption: Option<f32>,
    pub composition: Option<SmallVec<[Note; COMPOSITION_LENGTH]>>,
}

impl ClassResources {
    pub fn for_kind(kind: Option<ResourceKind>) -> Self {
        match kind {
            Some(ResourceKind::Fury) => Self {
                fury: Some(0.0),
                ..Default::default()
            },
            Some(ResourceKind::Corruption) => Self {
                corruption: Some(0.0),
                ..Default::default()
            },
            Some(ResourceKind::Composition) => Self {
                composition: Some(SmallVec::new()),
                ..Default::default()
            },
            None => Self::default(),
        }
    }

    pub fn gauge(&self, kind: ResourceKind) -> Option<f32> {
        match kind {
            ResourceKind::Fury => self.fury,
            ResourceKind::Corruption => self.corruption,
            ResourceKind::Composition => self.composition.as_ref().map(|c| c.len() as f32),
        }
    }

    /// Add to a gauge, clamped to `[0, MAX_RESOURCE]`. No-op if the class lacks it.
    pub fn gain(&mut self, kind: ResourceKind, amount: f32) {
        let slot = match kind {
            ResourceKind::Fury => &mut self.fury,
            ResourceKind::Corruption => &mut self.corruption,
            ResourceKind::Composition => return,
        };
        if let Some(value) = slot {
            *value = (*value + amount).clamp(0.0, MAX_RESOURCE);
        }
    }

    pub fn reset(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Fury => {
                if let Some(v) = &mut self.fury {
                    *v = 0.0;
                }
            }
            ResourceKind::Corruption => {
                if let Some(v) = &mut self.corruption {
                    *v = 0.0;
                }
            }
            ResourceKind::Composition => {
                if let Some(c) = &mut self.composition {
                    c.clear();
                }
            }
        }
    }

    /// Append a note, keeping only the most recent `COMPOSITION_LENGTH`.
    pub fn push_note(&mut self, note: Note) {
        if let Some(c) = &mut self.composition {
            if c.len() == COMPOSITION_LENGTH {
                c.remove(0);
            }
            c.push(note);
        }
    }

    /// All three distinct notes are present.
    pub fn composition_complete(&self) -> bool {
        self.composition.as_ref().is_some_and(|c| {
            [Note::Verse, Note::Chorus, Note::Bridge]
                .iter()
                .all(|n| c.contains(n))
        })
    }
}

/// Boss phase machine state. `None` for everything that isn't mid-ability.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BossState {
    #[default]
    None,
    /// Winding up a burrow; a stun interrupts it
    BurrowChanneling,
    /// Underground, moving away from the target
    BurrowRetreating,
    /// Underground, charging along `heading`; each enemy is struck once
    BurrowCharging {
        heading: Vec2,
        struck: SmallVec<[Entity; 4]>,
    },
    /// Mid-leap toward `landing`
    Airborne { landing: Vec2 },
}

impl BossState {
    pub fn is_untargetable(&self) -> bool {
        matches!(
            self,
            BossState::BurrowRetreating | BossState::BurrowCharging { .. } | BossState::Airborne { .. }
        )
    }

    /// Busy bosses skip normal targeting, movement, attacks and abilities.
    pub fn is_busy(&self) -> bool {
        !matches!(self, BossState::None)
    }
}

/// Anti-stuck bookkeeping for steering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovementState {
    pub stuck_frames: u32,
    pub last_distance: Option<f32>,
    pub probe: Option<Probe>,
}

/// A time-boxed heading offset used to slide around an obstruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Probe {
    pub angle: f32,
    pub until_ms: f64,
    /// Distance when the probe started; beating it clears the probe
    pub start_distance: f32,
}

/// Per-combatant report counters.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct CombatantReport {
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    pub shielding_granted: f32,
    pub kills: u32,
}

/// A fighter. See module docs.
#[derive(Component, Clone, Debug)]
pub struct Combatant {
    pub name: String,
    pub kind: CombatantKind,
    pub side: Side,
    pub template: UnitTemplate,
    pub items: Vec<ItemDef>,
    pub threat: u32,
    pub stats: CombatStats,
    pub position: Vec2,
    pub alive: bool,
    pub hp: f32,
    pub shield: f32,
    pub buffs: Vec<Aura>,
    pub debuffs: Vec<Aura>,
    /// Remaining cooldown per ability (entries are removed at zero)
    pub ability_cooldowns: HashMap<AbilityId, f32>,
    pub global_cooldown_ms: f32,
    pub attack_timer_ms: f32,
    /// Weak reference, re-resolved every frame
    pub target: Option<Entity>,
    pub resources: ClassResources,
    pub boss: BossState,
    pub movement: MovementState,
    /// Summons expire at this battle time
    pub expires_at_ms: Option<f64>,
    /// Item passive index -> time it is ready again
    pub passive_ready_at: HashMap<usize, f64>,
    /// Health-threshold passives that already fired
    pub enraged: bool,
    pub report: CombatantReport,
}

impl Combatant {
    /// Build a combatant at full health.
    pub fn new(
        name: impl Into<String>,
        kind: CombatantKind,
        side: Side,
        template: UnitTemplate,
        items: Vec<ItemDef>,
        threat: u32,
        position: Vec2,
    ) -> Self {
        let resources = ClassResources::for_kind(template.resource);
        let mut combatant = Self {
            name: name.into(),
            kind,
            side,
            template,
            items,
            threat: threat.max(1),
            stats: CombatStats::default(),
            position,
            alive: true,
            hp: 0.0,
            shield: 0.0,
            buffs: Vec::new(),
            debuffs: Vec::new(),
            ability_cooldowns: HashMap::new(),
            global_cooldown_ms: 0.0,
            attack_timer_ms: 0.0,
            target: None,
            resources,
            boss: BossState::None,
            movement: MovementState::default(),
            expires_at_ms: None,
            passive_ready_at: HashMap::new(),
            enraged: false,
            report: CombatantReport::default(),
        };
        combatant.stats = combatant.compute();
        combatant.hp = combatant.stats.max_hp;
        combatant.attack_timer_ms = combatant.stats.attack_interval_ms * 0.5;
        combatant
    }

    fn scaling(&self) -> StatScaling {
        if self.kind.is_hero() {
            StatScaling::Hero
        } else {
            StatScaling::Creature {
                scaling: self.template.scaling,
            }
        }
    }

    fn compute(&self) -> CombatStats {
        compute_stats(&StatInputs {
            template: &self.template,
            scaling: self.scaling(),
            items: &self.items,
            buffs: &self.buffs,
            debuffs: &self.debuffs,
            threat: self.threat,
            is_opponent: self.side == Side::Opponents,
        })
    }

    /// Re-run the stat pipeline, preserving health percentage.
    ///
    /// Living combatants never drop below 1 HP from a recompute.
    pub fn recalculate_stats(&mut self) {
        let old_max = self.stats.max_hp;
        let fraction = if old_max > 0.0 { self.hp / old_max } else { 1.0 };
        self.stats = self.compute();
        if self.alive {
            let max = self.stats.max_hp;
            self.hp = (fraction * max).clamp(1.0, max);
        } else {
            self.hp = 0.0;
        }
        self.shield = self.shield.max(0.0);
        self.debug_validate();
    }

    // === Status queries ===

    pub fn auras(&self) -> impl Iterator<Item = &Aura> {
        self.buffs.iter().chain(self.debuffs.iter())
    }

    pub fn has_effect(&self, pred: impl Fn(&AuraEffect) -> bool + Copy) -> bool {
        self.auras().any(|a| a.has_effect(pred))
    }

    pub fn has_aura(&self, ability: AbilityId) -> bool {
        self.auras().any(|a| a.ability == ability)
    }

    pub fn has_aura_from(&self, ability: AbilityId, source: Entity) -> bool {
        self.auras().any(|a| a.ability == ability && a.source == source)
    }

    pub fn is_stunned(&self) -> bool {
        self.has_effect(|e| matches!(e, AuraEffect::Stun))
    }

    pub fn is_immobilized(&self) -> bool {
        self.has_effect(|e| matches!(e, AuraEffect::Immobilize | AuraEffect::Stun))
    }

    pub fn is_invisible(&self) -> bool {
        self.has_effect(|e| matches!(e, AuraEffect::Invisibility))
    }

    pub fn is_untargetable(&self) -> bool {
        self.boss.is_untargetable() || self.has_effect(|e| matches!(e, AuraEffect::Untargetable))
    }

    pub fn is_invulnerable(&self) -> bool {
        self.has_effect(|e| matches!(e, AuraEffect::Invulnerable))
    }

    /// Can be chosen as a target by enemies.
    pub fn is_targetable(&self) -> bool {
        self.alive && !self.is_untargetable() && !self.is_invisible()
    }

    /// Entity forcing this combatant's target selection, if any.
    pub fn taunted_by(&self) -> Option<Entity> {
        self.debuffs
            .iter()
            .find(|a| a.has_effect(|e| matches!(e, AuraEffect::Taunt)))
            .map(|a| a.source)
    }

    pub fn missing_health(&self) -> f32 {
        (self.stats.max_hp - self.hp).max(0.0)
    }

    pub fn health_pct(&self) -> f32 {
        if self.stats.max_hp > 0.0 {
            self.hp / self.stats.max_hp
        } else {
            0.0
        }
    }

    /// Entity that gets credit for this combatant's damage and healing.
    pub fn credit_owner(&self, me: Entity) -> Entity {
        self.kind.master().unwrap_or(me)
    }

    pub fn cooldown(&self, ability: AbilityId) -> f32 {
        self.ability_cooldowns.get(&ability).copied().unwrap_or(0.0)
    }

    pub fn is_ready(&self, ability: AbilityId) -> bool {
        self.cooldown(ability) <= 0.0
    }

    // === Mutation ===

    /// Put an aura on the matching list and recompute stats.
    ///
    /// Returns `ReachedMax` when a stacking aura hit its cap; the caller fires
    /// the payoff.
    pub fn apply_aura(&mut self, aura: Aura) -> AuraApplyOutcome {
        if !self.alive {
            return AuraApplyOutcome::Refreshed;
        }
        let list = match aura.kind {
            AuraKind::Buff => &mut self.buffs,
            AuraKind::Debuff => &mut self.debuffs,
        };
        let outcome = apply_to_list(list, aura);
        self.recalculate_stats();
        outcome
    }

    /// Remove every aura with this id. Returns whether anything was removed.
    pub fn remove_aura(&mut self, ability: AbilityId) -> bool {
        let before = self.buffs.len() + self.debuffs.len();
        self.buffs.retain(|a| a.ability != ability);
        self.debuffs.retain(|a| a.ability != ability);
        let removed = self.buffs.len() + self.debuffs.len() != before;
        if removed {
            self.recalculate_stats();
        }
        removed
    }

    /// Remove every aura carrying an effect matching `pred`.
    pub fn remove_auras_with(&mut self, pred: impl Fn(&AuraEffect) -> bool + Copy) -> bool {
        let before = self.buffs.len() + self.debuffs.len();
        self.buffs.retain(|a| !a.has_effect(pred));
        self.debuffs.retain(|a| !a.has_effect(pred));
        let removed = self.buffs.len() + self.debuffs.len() != before;
        if removed {
            self.recalculate_stats();
        }
        removed
    }

    /// Spend a block charge if one is available. Removes the aura at zero charges.
    pub fn consume_block_charge(&mut self) -> bool {
        let Some(index) = self
            .buffs
            .iter()
            .position(|a| a.has_effect(|e| matches!(e, AuraEffect::BlockCharges { charges } if *charges > 0)))
        else {
            return false;
        };
        let mut depleted = false;
        for effect in self.buffs[index].effects.iter_mut() {
            if let AuraEffect::BlockCharges { charges } = effect {
                *charges = charges.saturating_sub(1);
                depleted = *charges == 0;
            }
        }
        if depleted {
            self.buffs.remove(index);
            self.recalculate_stats();
        }
        true
    }

    /// Tick cooldowns and timers by one frame.
    pub fn tick_cooldowns(&mut self, dt_ms: f32) {
        for remaining in self.ability_cooldowns.values_mut() {
            *remaining = (*remaining - dt_ms).max(0.0);
        }
        self.ability_cooldowns.retain(|_, remaining| *remaining > 0.0);
        self.global_cooldown_ms = (self.global_cooldown_ms - dt_ms).max(0.0);
        self.attack_timer_ms = (self.attack_timer_ms - dt_ms).max(0.0);
    }

    /// Flip to dead. Auras and shield are dropped.
    pub fn kill(&mut self) {
        self.alive = false;
        self.hp = 0.0;
        self.shield = 0.0;
        self.buffs.clear();
        self.debuffs.clear();
        self.boss = BossState::None;
        self.target = None;
    }

    /// Debug-only invariant checks.
    pub fn debug_validate(&self) {
        debug_assert!(self.shield >= 0.0, "{}: negative shield {}", self.name, self.shield);
        debug_assert!(
            self.hp <= self.stats.max_hp + 0.01,
            "{}: hp {} above max {}",
            self.name,
            self.hp,
            self.stats.max_hp
        );
        debug_assert!(
            !self.alive || self.hp > 0.0,
            "{}: alive with non-positive hp",
            self.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::stats::{BaseStats, StatKind};

    fn template() -> UnitTemplate {
        UnitTemplate {
            name: "Dummy".into(),
            visual: "dummy".into(),
            hp: 100.0,
            damage: 10.0,
            attack_interval_ms: 1000.0,
            range: 40.0,
            movement_speed: 60.0,
            size: 30.0,
            base: BaseStats {
                vigor: 1.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn dummy() -> Combatant {
        Combatant::new(
            "Dummy",
            CombatantKind::AiHero(ClassId::Guardian),
            Side::Heroes,
            template(),
            Vec::new(),
            1,
            Vec2::ZERO,
        )
    }

    fn vigor_buff(amount: f32) -> Aura {
        AuraTemplate {
            name: "Fortify".into(),
            icon: String::new(),
            kind: AuraKind::Buff,
            duration_ms: 5000.0,
            effects: vec![AuraEffect::StatFlat {
                stat: StatKind::Vigor,
                amount,
            }],
            max_stacks: None,
            payoff: None,
        }
        .instantiate(AbilityId::Rally, Entity::from_raw(7), None, 0.0)
    }

    #[test]
    fn test_game_rng_deterministic() {
        let mut a = GameRng::from_seed(12345);
        let mut b = GameRng::from_seed(12345);
        for _ in 0..100 {
            assert_eq!(a.random_f32(), b.random_f32());
        }
    }

    #[test]
    fn test_game_rng_range() {
        let mut rng = GameRng::from_seed(42);
        for _ in 0..1000 {
            let val = rng.random_range(10.0, 20.0);
            assert!((10.0..20.0).contains(&val));
        }
    }

    #[test]
    fn test_recalculate_preserves_health_percentage() {
        let mut c = dummy();
        assert_eq!(c.stats.max_hp, 200.0);
        c.hp = 100.0;
        c.apply_aura(vigor_buff(2.0));
        assert_eq!(c.stats.max_hp, 400.0);
        assert_eq!(c.hp, 200.0);
        c.remove_aura(AbilityId::Rally);
        assert_eq!(c.hp, 100.0);
    }

    #[test]
    fn test_recalculate_floors_living_health_at_one() {
        let mut c = dummy();
        c.hp = 0.001;
        c.recalculate_stats();
        assert_eq!(c.hp, 1.0);
        c.kill();
        c.recalculate_stats();
        assert_eq!(c.hp, 0.0);
    }

    #[test]
    fn test_reapplying_buff_does_not_duplicate() {
        let mut c = dummy();
        c.apply_aura(vigor_buff(1.0));
        c.apply_aura(vigor_buff(1.0));
        assert_eq!(c.buffs.len(), 1);
        assert_eq!(c.stats.max_hp, 300.0);
    }

    #[test]
    fn test_cooldowns_never_negative() {
        let mut c = dummy();
        c.ability_cooldowns.insert(AbilityId::Taunt, 100.0);
        c.tick_cooldowns(60.0);
        assert_eq!(c.cooldown(AbilityId::Taunt), 40.0);
        c.tick_cooldowns(60.0);
        assert!(!c.ability_cooldowns.contains_key(&AbilityId::Taunt));
        assert_eq!(c.cooldown(AbilityId::Taunt), 0.0);
    }

    #[test]
    fn test_composition_keeps_latest_notes() {
        let mut r = ClassResources::for_kind(Some(ResourceKind::Composition));
        r.push_note(Note::Verse);
        r.push_note(Note::Chorus);
        r.push_note(Note::Chorus);
        assert!(!r.composition_complete());
        r.push_note(Note::Bridge);
        assert!(!r.composition_complete());
        r.push_note(Note::Verse);
        assert!(r.composition_complete());
        assert_eq!(r.gauge(ResourceKind::Composition), Some(3.0));
    }

    #[test]
    fn test_gain_clamps_gauge() {
        let mut r = ClassResources::for_kind(Some(ResourceKind::Fury));
        r.gain(ResourceKind::Fury, 250.0);
        assert_eq!(r.fury, Some(MAX_RESOURCE));
        r.gain(ResourceKind::Corruption, 10.0);
        assert_eq!(r.corruption, None);
    }

    #[test]
    fn test_arena_clamp_respects_size() {
        let bounds = ArenaBounds {
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(bounds.clamp(Vec2::new(-10.0, 80.0), 10.0), Vec2::new(5.0, 45.0));
    }
}
