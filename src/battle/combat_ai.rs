//! Combat AI Systems
//!
//! Handles AI decision-making for combatants:
//! - Target acquisition (taunts, keeping a target, picking the nearest)
//! - Ability decisions (priority list, first handler that produces effects wins)
//!
//! The player hero only casts what `AbilityRequests` asks for, unless
//! autopilot is on.

use bevy::prelude::*;
use std::collections::VecDeque;

use super::abilities::{AbilityId, Role};
use super::ability_config::ContentDefinitions;
use super::class_ai::{evaluate_ability, AbilityContext, AbilityHandlers, CastOutcome};
use super::components::{BattleClock, Combatant, CombatantKind};
use super::constants::TARGET_RETAIN_RANGE_FACTOR;
use super::effects::{EffectResult, PendingEffects};
use super::roster::{CombatantInfo, Roster};
use crate::combat::events::{CombatEvent, EventQueue};
use crate::settings::BattleSettings;

/// Explicit activation requests for the player hero, oldest first.
#[derive(Resource, Default, Debug)]
pub struct AbilityRequests {
    queue: VecDeque<AbilityId>,
}

impl AbilityRequests {
    pub fn request(&mut self, ability: AbilityId) {
        self.queue.push_back(ability);
    }

    pub fn pop(&mut self) -> Option<AbilityId> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Pick a target for `me`.
///
/// A living, targetable taunter overrides everything. The current target is
/// kept while it stays targetable and within `TARGET_RETAIN_RANGE_FACTOR ×
/// range`. Otherwise the nearest targetable enemy wins; with
/// `prefer_guardians`, the nearest Guardian-role enemy wins first.
pub fn choose_target(
    me: &CombatantInfo,
    current: Option<Entity>,
    taunter: Option<Entity>,
    roster: &Roster,
    prefer_guardians: bool,
) -> Option<Entity> {
    let valid = |entity: Entity| roster.get(entity).filter(|t| t.is_opponent_of(me) && t.is_targetable());

    if let Some(taunter) = taunter.and_then(valid) {
        return Some(taunter.entity);
    }
    if let Some(current) = current.and_then(valid) {
        if me.in_range(current, me.stats.range * TARGET_RETAIN_RANGE_FACTOR) {
            return Some(current.entity);
        }
    }
    if prefer_guardians {
        let guardian = roster
            .iter()
            .filter(|c| c.is_opponent_of(me) && c.is_targetable() && c.stats.role == Role::Guardian)
            .min_by(|a, b| {
                a.position
                    .distance(me.position)
                    .total_cmp(&b.position.distance(me.position))
            });
        if let Some(guardian) = guardian {
            return Some(guardian.entity);
        }
    }
    roster.nearest_targetable_enemy(me).map(|c| c.entity)
}

/// Resolve every living combatant's target for this frame.
pub fn acquire_targets(mut combatants: Query<(Entity, &mut Combatant)>) {
    let roster = Roster::build(combatants.iter());
    for (entity, mut combatant) in combatants.iter_mut() {
        if !combatant.alive || combatant.boss.is_busy() {
            continue;
        }
        let Some(me) = roster.get(entity) else {
            continue;
        };
        let prefer_guardians = matches!(combatant.kind, CombatantKind::Enemy(_));
        let target = choose_target(me, combatant.target, combatant.taunted_by(), &roster, prefer_guardians);
        if combatant.target != target {
            combatant.target = target;
        }
    }
}

/// Try `abilities` in order and return the first that casts.
pub fn choose_ability(
    handlers: &AbilityHandlers,
    content: &ContentDefinitions,
    roster: &Roster,
    caster: &Combatant,
    me: &CombatantInfo,
    abilities: impl IntoIterator<Item = AbilityId>,
    now_ms: f64,
) -> Option<(AbilityId, Vec<EffectResult>)> {
    let target = caster.target.and_then(|t| roster.get(t));
    for ability in abilities {
        if !caster.is_ready(ability) {
            continue;
        }
        let Some(config) = content.ability(ability) else {
            warn!("{} has no config for {:?}", caster.name, ability);
            continue;
        };
        let ctx = AbilityContext {
            ability,
            caster: me,
            target,
            roster,
            content,
            now_ms,
        };
        match evaluate_ability(handlers, &ctx, config) {
            CastOutcome::Cast(effects) => return Some((ability, effects)),
            CastOutcome::Failed => {}
            CastOutcome::Malformed(e) => warn!("{} could not cast {}: {}", caster.name, config.name, e),
            CastOutcome::Unhandled => warn!("No handler registered for {:?}", ability),
        }
    }
    None
}

/// Activate abilities for every combatant that is free to act.
#[allow(clippy::too_many_arguments)]
pub fn decide_abilities(
    clock: Res<BattleClock>,
    settings: Res<BattleSettings>,
    content: Res<ContentDefinitions>,
    handlers: Res<AbilityHandlers>,
    mut requests: ResMut<AbilityRequests>,
    mut pending: ResMut<PendingEffects>,
    mut queue: ResMut<EventQueue>,
    mut combatants: Query<(Entity, &mut Combatant)>,
) {
    let roster = Roster::build(combatants.iter());
    for (entity, mut combatant) in combatants.iter_mut() {
        if !combatant.alive
            || combatant.is_stunned()
            || combatant.boss.is_busy()
            || combatant.global_cooldown_ms > 0.0
        {
            continue;
        }
        let Some(me) = roster.get(entity) else {
            continue;
        };

        let manual = matches!(combatant.kind, CombatantKind::PlayerHero(_)) && !settings.autopilot;
        let candidates: Vec<AbilityId> = if manual {
            let Some(requested) = requests.pop() else {
                continue;
            };
            if !combatant.template.abilities.contains(&requested) {
                warn!("{} does not know {:?}", combatant.name, requested);
                continue;
            }
            vec![requested]
        } else {
            combatant.template.abilities.clone()
        };

        let Some((ability, effects)) =
            choose_ability(&handlers, &content, &roster, &combatant, me, candidates, clock.now_ms)
        else {
            if manual {
                debug!("{}'s requested ability could not be cast", combatant.name);
            }
            continue;
        };

        let cooldown = content.ability(ability).map_or(0.0, |c| c.cooldown_ms);
        if cooldown > 0.0 {
            combatant.ability_cooldowns.insert(ability, cooldown);
        }
        combatant.global_cooldown_ms = settings.global_cooldown_ms;
        queue.push(CombatEvent::AbilityCast { caster: entity, ability });
        pending.extend(effects);
    }
}
