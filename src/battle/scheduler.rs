//! Delayed Continuations
//!
//! Handlers never sleep. Anything that happens "later" (a second arrow, the
//! strike at the end of a shadowstep, each boss phase transition) is a
//! `ScheduledAction` keyed by an absolute fire time. Due actions are evaluated
//! against a fresh roster snapshot; continuations check that their caster is
//! alive and still in the expected state, and return no effects otherwise.

use bevy::prelude::*;

use super::abilities::AbilityId;
use super::ability_config::ContentDefinitions;
use super::class_ai::{continuation_handler, AbilityContext};
use super::components::{BattleClock, Combatant};
use super::effects::PendingEffects;
use super::roster::Roster;

/// What a scheduled action does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayedAction {
    /// Double Shot's second arrow
    SecondShot,
    /// Shadowstep's teleport-strike at the end of the channel
    ShadowstepStrike,
    /// Burrow channel completes: go underground and retreat
    BurrowSubmerge,
    /// Retreat ends: charge at the target
    BurrowCharge,
    /// Charge ends: surface with an area stun
    BurrowEmerge,
    /// Leap lands at the stored landing point
    LeapLand,
}

impl DelayedAction {
    /// Ability whose config and handler module own this continuation.
    pub fn ability(&self) -> AbilityId {
        match self {
            DelayedAction::SecondShot => AbilityId::DoubleShot,
            DelayedAction::ShadowstepStrike => AbilityId::Shadowstep,
            DelayedAction::BurrowSubmerge | DelayedAction::BurrowCharge | DelayedAction::BurrowEmerge => {
                AbilityId::Burrow
            }
            DelayedAction::LeapLand => AbilityId::Leap,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledAction {
    pub fire_at_ms: f64,
    pub caster: Entity,
    pub target: Option<Entity>,
    pub action: DelayedAction,
    seq: u64,
}

/// Pending continuations, fired in `(fire_at_ms, insertion)` order.
#[derive(Resource, Default, Debug)]
pub struct ScheduledActions {
    actions: Vec<ScheduledAction>,
    next_seq: u64,
}

impl ScheduledActions {
    pub fn schedule(&mut self, fire_at_ms: f64, caster: Entity, target: Option<Entity>, action: DelayedAction) {
        self.actions.push(ScheduledAction {
            fire_at_ms,
            caster,
            target,
            action,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Remove and return every action due at `now_ms`.
    pub fn take_due(&mut self, now_ms: f64) -> Vec<ScheduledAction> {
        let (mut due, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.actions).into_iter().partition(|a| a.fire_at_ms <= now_ms);
        self.actions = waiting;
        due.sort_by(|a, b| a.fire_at_ms.total_cmp(&b.fire_at_ms).then(a.seq.cmp(&b.seq)));
        due
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledAction> {
        self.actions.iter()
    }
}

/// Fire due continuations. Their effects resolve in the same frame.
pub fn run_scheduled_actions(
    clock: Res<BattleClock>,
    content: Res<ContentDefinitions>,
    mut scheduled: ResMut<ScheduledActions>,
    mut pending: ResMut<PendingEffects>,
    combatants: Query<(Entity, &Combatant)>,
) {
    let due = scheduled.take_due(clock.now_ms);
    if due.is_empty() {
        return;
    }
    let roster = Roster::build(combatants.iter());

    for action in due {
        let Some(caster) = roster.get(action.caster).filter(|c| c.alive) else {
            continue;
        };
        let ability = action.action.ability();
        let Some(config) = content.ability(ability) else {
            warn!("Scheduled {:?} has no config for {:?}", action.action, ability);
            continue;
        };
        let ctx = AbilityContext {
            ability,
            caster,
            target: action.target.and_then(|t| roster.get(t)),
            roster: &roster,
            content: &content,
            now_ms: clock.now_ms,
        };
        match continuation_handler(action.action)(&ctx, config) {
            Ok(effects) => pending.extend(effects),
            Err(e) => warn!("{} continuation failed: {}", caster.name, e),
        }
    }
}
