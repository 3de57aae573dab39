//! Ability Handler Library
//!
//! One module per class (plus `creatures` for enemy abilities). Every handler
//! is a pure function from a read-only `AbilityContext` and the ability's
//! config to a list of `EffectResult`s.
//!
//! ## Contract
//!
//! - `Ok(vec![])`: the ability cannot execute right now (out of range, no valid
//!   target, not enough resource). The caller starts no cooldown and
//!   dispatches no `AbilityCast`.
//! - `Ok(effects)`: success. The caller dispatches `AbilityCast`, starts the
//!   cooldown and queues the effects.
//! - `Err(AbilityError)`: the config is malformed. Logged, treated as a failed
//!   activation; the battle continues.
//!
//! Handlers are registered by `AbilityId` in `AbilityHandlers`.

pub mod assassin;
pub mod bard;
pub mod berserker;
pub mod cleric;
pub mod creatures;
pub mod druid;
pub mod guardian;
pub mod necromancer;
pub mod ranger;

use bevy::prelude::*;
use std::collections::HashMap;

use super::abilities::AbilityId;
use super::ability_config::{AbilityConfig, AbilityError, ContentDefinitions, ContentError};
use super::effects::EffectResult;
use super::roster::{CombatantInfo, Roster};
use super::scheduler::DelayedAction;

/// Read-only view handed to handlers.
pub struct AbilityContext<'a> {
    pub ability: AbilityId,
    pub caster: &'a CombatantInfo,
    /// The caster's current target, if it still resolves
    pub target: Option<&'a CombatantInfo>,
    pub roster: &'a Roster,
    pub content: &'a ContentDefinitions,
    pub now_ms: f64,
}

impl<'a> AbilityContext<'a> {
    /// Current target if it is a living, targetable enemy within `range`.
    pub fn enemy_in_range(&self, range: f32) -> Option<&'a CombatantInfo> {
        self.target
            .filter(|t| t.is_opponent_of(self.caster) && t.is_targetable() && self.caster.in_range(t, range))
    }

    /// Current target if it is a living, targetable enemy (any distance).
    pub fn enemy_target(&self) -> Option<&'a CombatantInfo> {
        self.target
            .filter(|t| t.is_opponent_of(self.caster) && t.is_targetable())
    }

    /// Fails when the ability's own aura template is missing.
    pub fn require_aura(&self, id: AbilityId) -> Result<AbilityId, AbilityError> {
        if self.content.aura_template(id).is_some() {
            Ok(id)
        } else {
            Err(AbilityError::MissingAura(id))
        }
    }

    /// `caster.damage × damage_mult`.
    pub fn scaled_damage(&self, config: &AbilityConfig) -> Result<f32, AbilityError> {
        Ok(self.caster.stats.damage * config.positive_prop("damage_mult")?)
    }

    /// `heal + healing_power × heal_scaling`.
    pub fn scaled_heal(&self, config: &AbilityConfig) -> Result<f32, AbilityError> {
        Ok(config.positive_prop("heal")? + self.caster.stats.healing_power * config.prop_or("heal_scaling", 1.0))
    }
}

pub type AbilityHandler = fn(&AbilityContext, &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError>;

/// Registry mapping ability ids to handler functions.
#[derive(Resource)]
pub struct AbilityHandlers {
    handlers: HashMap<AbilityId, AbilityHandler>,
}

impl AbilityHandlers {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, ability: AbilityId, handler: AbilityHandler) {
        self.handlers.insert(ability, handler);
    }

    pub fn get(&self, ability: AbilityId) -> Option<AbilityHandler> {
        self.handlers.get(&ability).copied()
    }

    pub fn contains(&self, ability: AbilityId) -> bool {
        self.handlers.contains_key(&ability)
    }

    /// Every ability on a unit template must have a handler.
    pub fn validate(&self, content: &ContentDefinitions) -> Result<(), ContentError> {
        for &ability in content.ability_ids() {
            let usable = content.ability(ability).is_some_and(|c| !c.aura_only);
            if usable && !self.contains(ability) {
                return Err(ContentError::MissingHandler(ability));
            }
        }
        Ok(())
    }
}

impl Default for AbilityHandlers {
    fn default() -> Self {
        let mut handlers = Self::empty();
        guardian::register(&mut handlers);
        berserker::register(&mut handlers);
        necromancer::register(&mut handlers);
        bard::register(&mut handlers);
        druid::register(&mut handlers);
        ranger::register(&mut handlers);
        cleric::register(&mut handlers);
        assassin::register(&mut handlers);
        creatures::register(&mut handlers);
        handlers
    }
}

/// Handler that evaluates a scheduled continuation.
pub fn continuation_handler(action: DelayedAction) -> AbilityHandler {
    match action {
        DelayedAction::SecondShot => ranger::second_shot,
        DelayedAction::ShadowstepStrike => assassin::shadowstep_strike,
        DelayedAction::BurrowSubmerge => creatures::burrow_submerge,
        DelayedAction::BurrowCharge => creatures::burrow_charge,
        DelayedAction::BurrowEmerge => creatures::burrow_emerge,
        DelayedAction::LeapLand => creatures::leap_land,
    }
}

/// Outcome of evaluating one activation.
#[derive(Debug, PartialEq)]
pub enum CastOutcome {
    Cast(Vec<EffectResult>),
    /// Legal no-op: no cooldown, no event
    Failed,
    Malformed(AbilityError),
    Unhandled,
}

/// Run the registered handler for `ctx.ability`.
pub fn evaluate_ability(handlers: &AbilityHandlers, ctx: &AbilityContext, config: &AbilityConfig) -> CastOutcome {
    let Some(handler) = handlers.get(ctx.ability) else {
        return CastOutcome::Unhandled;
    };
    match handler(ctx, config) {
        Ok(effects) if effects.is_empty() => CastOutcome::Failed,
        Ok(effects) => CastOutcome::Cast(effects),
        Err(e) => CastOutcome::Malformed(e),
    }
}

/// Point `distance` beyond `target` along the line from `from`.
pub(crate) fn point_behind(from: Vec2, target: Vec2, distance: f32) -> Vec2 {
    let dir = (target - from).normalize_or_zero();
    let dir = if dir == Vec2::ZERO { Vec2::X } else { dir };
    target + dir * distance
}
