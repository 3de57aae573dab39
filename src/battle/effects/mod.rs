//! Effect Results
//!
//! Everything that changes battle state flows through an `EffectResult`.
//! Ability handlers, auto-attacks, aura ticks, projectiles, areas, scheduled
//! continuations and passives all *produce* effects; only the resolver in
//! `resolve` *applies* them. This keeps handlers pure and gives every damage
//! source the same mitigation path.
//!
//! ## Pattern
//!
//! Producers push into the `PendingEffects` resource. `resolve_pending_effects`
//! runs after each producing phase and drains it. Effects returned by event
//! passives are pushed after the last resolve of the frame, so they land at
//! the start of the next frame.

pub mod resolve;

use bevy::prelude::*;

use super::abilities::{AbilityId, Note, ResourceKind, SummonKind};
use super::areas::AreaSpec;
use super::components::visual::VfxKind;
use super::components::BossState;
use super::projectiles::ProjectileSpec;
use super::scheduler::DelayedAction;

pub use resolve::{resolve_pending_effects, EffectSink};

/// How a hit decides whether it crits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CritMode {
    /// Roll the source's crit chance when the effect resolves
    Roll,
    Always,
    Never,
}

impl CritMode {
    pub fn from_flag(is_crit: bool) -> Self {
        if is_crit {
            CritMode::Always
        } else {
            CritMode::Never
        }
    }
}

/// A single damage application.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageEffect {
    pub source: Option<Entity>,
    pub target: Entity,
    /// Raw damage before crit and mitigation
    pub amount: f32,
    pub crit: CritMode,
    /// `None` marks a basic attack
    pub ability: Option<AbilityId>,
    /// Skips the dodge roll
    pub never_miss: bool,
    /// Periodic damage (DOTs, areas, pulses): no lifesteal
    pub periodic: bool,
    /// Fraction of the health damage dealt that heals the source
    pub drain: f32,
}

impl DamageEffect {
    /// A basic attack hit.
    pub fn basic(source: Entity, target: Entity, amount: f32, crit: CritMode) -> Self {
        Self {
            source: Some(source),
            target,
            amount,
            crit,
            ability: None,
            never_miss: false,
            periodic: false,
            drain: 0.0,
        }
    }

    /// A direct ability hit.
    pub fn ability(source: Entity, target: Entity, amount: f32, ability: AbilityId) -> Self {
        Self {
            source: Some(source),
            target,
            amount,
            crit: CritMode::Roll,
            ability: Some(ability),
            never_miss: false,
            periodic: false,
            drain: 0.0,
        }
    }

    /// A periodic tick (bypasses dodge, no lifesteal, never crits).
    pub fn periodic(source: Option<Entity>, target: Entity, amount: f32, ability: AbilityId) -> Self {
        Self {
            source,
            target,
            amount,
            crit: CritMode::Never,
            ability: Some(ability),
            never_miss: true,
            periodic: true,
            drain: 0.0,
        }
    }

    pub fn with_crit(mut self, crit: CritMode) -> Self {
        self.crit = crit;
        self
    }

    /// Heal the source for `ratio` of the health damage that lands.
    pub fn with_drain(mut self, ratio: f32) -> Self {
        self.drain = ratio;
        self
    }

    pub fn never_miss(mut self) -> Self {
        self.never_miss = true;
        self
    }
}

/// Changes to a class resource gauge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResourceChange {
    Gain(ResourceKind, f32),
    Reset(ResourceKind),
    AddNote(Note),
}

/// One state change to apply.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectResult {
    Damage(DamageEffect),
    Heal {
        source: Entity,
        target: Entity,
        amount: f32,
        crit: CritMode,
        /// Secondary heals (treant bursts) never trigger further bursts
        secondary: bool,
    },
    Shield {
        source: Entity,
        target: Entity,
        amount: f32,
    },
    /// Instantiate the aura template of `aura` on `target`
    ApplyAura {
        source: Entity,
        target: Entity,
        aura: AbilityId,
    },
    RemoveAura {
        target: Entity,
        aura: AbilityId,
    },
    SpawnProjectile(ProjectileSpec),
    SpawnArea(AreaSpec),
    Summon {
        master: Entity,
        kind: SummonKind,
        position: Vec2,
    },
    Teleport {
        entity: Entity,
        position: Vec2,
    },
    Knockback {
        target: Entity,
        from: Vec2,
        distance: f32,
    },
    Schedule {
        delay_ms: f32,
        caster: Entity,
        target: Option<Entity>,
        action: DelayedAction,
    },
    SetBossState {
        entity: Entity,
        state: BossState,
    },
    Resource {
        entity: Entity,
        change: ResourceChange,
    },
    Notify {
        text: String,
        position: Vec2,
        color: Color,
    },
    Vfx {
        kind: VfxKind,
        position: Vec2,
        radius: f32,
    },
}

impl EffectResult {
    pub fn damage(effect: DamageEffect) -> Self {
        EffectResult::Damage(effect)
    }

    pub fn heal(source: Entity, target: Entity, amount: f32, crit: CritMode) -> Self {
        EffectResult::Heal {
            source,
            target,
            amount,
            crit,
            secondary: false,
        }
    }

    pub fn aura(source: Entity, target: Entity, aura: AbilityId) -> Self {
        EffectResult::ApplyAura { source, target, aura }
    }

    pub fn notify(text: impl Into<String>, position: Vec2, color: Color) -> Self {
        EffectResult::Notify {
            text: text.into(),
            position,
            color,
        }
    }
}

/// Effects waiting to be resolved.
#[derive(Resource, Default, Debug)]
pub struct PendingEffects {
    effects: Vec<EffectResult>,
}

impl PendingEffects {
    pub fn push(&mut self, effect: EffectResult) {
        self.effects.push(effect);
    }

    pub fn extend(&mut self, effects: impl IntoIterator<Item = EffectResult>) {
        self.effects.extend(effects);
    }

    pub fn drain(&mut self) -> Vec<EffectResult> {
        std::mem::take(&mut self.effects)
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectResult> {
        self.effects.iter()
    }
}
