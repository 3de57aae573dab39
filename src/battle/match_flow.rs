//! Match Flow Systems
//!
//! Handles the overall flow of a battle:
//! - The battle clock
//! - Pre-combat placement phase with a countdown
//! - Summon expiry
//! - Battle end detection (elimination or timeout) behind a one-shot latch
//! - The end-of-battle combat report

use bevy::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::components::visual::PresentationFeed;
use super::components::{ArenaBounds, BattleClock, Combatant, CombatantKind, Side};
use crate::combat::events::{BattleEnded, CombatEvent, EventQueue};
use crate::combat::log::{CombatLog, CombatLogEventType};

/// Where the battle is in its lifecycle.
#[derive(Resource, Clone, Debug, PartialEq)]
pub enum BattlePhase {
    /// Combatants may still be moved; nothing acts
    Placement { remaining_ms: f32 },
    Combat,
    Ended,
}

/// Hard limit on battle length. Reaching it is a draw.
#[derive(Resource, Clone, Copy, Debug)]
pub struct BattleLimits {
    pub max_duration_ms: f64,
}

impl Default for BattleLimits {
    fn default() -> Self {
        Self {
            max_duration_ms: 300_000.0,
        }
    }
}

/// The end-of-battle latch. Closes exactly once.
#[derive(Resource, Clone, Debug, Default)]
pub struct BattleOutcome {
    ended_at_ms: Option<f64>,
    winner: Option<Side>,
    end_count: u32,
}

impl BattleOutcome {
    pub fn has_ended(&self) -> bool {
        self.ended_at_ms.is_some()
    }

    /// `None` while running or after a draw.
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn ended_at_ms(&self) -> Option<f64> {
        self.ended_at_ms
    }

    /// How many times the latch closed. Always 0 or 1.
    pub fn end_count(&self) -> u32 {
        self.end_count
    }

    /// Close the latch. Returns false if it was already closed.
    pub fn close(&mut self, winner: Option<Side>, now_ms: f64) -> bool {
        if self.has_ended() {
            return false;
        }
        self.ended_at_ms = Some(now_ms);
        self.winner = winner;
        self.end_count += 1;
        true
    }
}

/// Advance battle time by one frame and drop last frame's presentation cues.
///
/// A fixed step (headless, tests) ignores wall-clock time entirely.
pub fn advance_clock(time: Option<Res<Time>>, mut clock: ResMut<BattleClock>, mut feed: ResMut<PresentationFeed>) {
    let delta_ms = match (clock.fixed_step_ms, time) {
        (Some(step), _) => step,
        (None, Some(time)) => time.delta_secs() * 1000.0,
        (None, None) => 0.0,
    };
    clock.delta_ms = delta_ms;
    clock.now_ms += delta_ms as f64;
    clock.frame += 1;
    feed.cues.clear();
}

/// Run condition: combat systems only run during `BattlePhase::Combat`.
pub fn in_combat(phase: Res<BattlePhase>) -> bool {
    *phase == BattlePhase::Combat
}

/// Count down the placement phase and open combat.
pub fn update_placement(clock: Res<BattleClock>, mut phase: ResMut<BattlePhase>, mut combat_log: ResMut<CombatLog>) {
    let BattlePhase::Placement { remaining_ms } = phase.as_mut() else {
        return;
    };
    *remaining_ms -= clock.delta_ms;
    if *remaining_ms <= 0.0 {
        *phase = BattlePhase::Combat;
        combat_log.log(CombatLogEventType::MatchEvent, "Combat begins!".to_string());
        info!("Placement over - combat begins");
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("combatants can only be placed before combat starts")]
    CombatStarted,
    #[error("no combatant {0:?}")]
    UnknownCombatant(Entity),
}

/// Move a combatant before combat starts. The position is clamped to the arena.
pub fn place_combatant(world: &mut World, entity: Entity, position: Vec2) -> Result<Vec2, PlacementError> {
    if !matches!(world.get_resource::<BattlePhase>(), Some(BattlePhase::Placement { .. })) {
        return Err(PlacementError::CombatStarted);
    }
    let bounds = world.get_resource::<ArenaBounds>().copied().unwrap_or_default();
    let mut combatant = world
        .get_mut::<Combatant>(entity)
        .ok_or(PlacementError::UnknownCombatant(entity))?;
    let size = combatant.stats.size;
    combatant.position = bounds.clamp(position, size);
    Ok(combatant.position)
}

/// Kill summons whose lifetime ran out. Expiry credits nobody.
pub fn expire_summons(
    clock: Res<BattleClock>,
    mut queue: ResMut<EventQueue>,
    mut combatants: Query<(Entity, &mut Combatant)>,
) {
    for (entity, mut combatant) in combatants.iter_mut() {
        let expired = combatant.expires_at_ms.is_some_and(|t| clock.now_ms >= t);
        if combatant.alive && expired {
            combatant.kill();
            queue.push(CombatEvent::EntityDied {
                victim: entity,
                killer: None,
            });
        }
    }
}

/// Decide whether the battle is over.
///
/// A side is eliminated when none of its non-summon members are alive.
/// Returns `Some(winner)` (`Some(None)` for a draw) once over.
pub fn decide_outcome(
    members: impl Iterator<Item = (Side, bool, bool)>,
    now_ms: f64,
    limits: BattleLimits,
) -> Option<Option<Side>> {
    let (mut heroes, mut opponents) = (false, false);
    for (side, alive, is_summon) in members {
        if alive && !is_summon {
            match side {
                Side::Heroes => heroes = true,
                Side::Opponents => opponents = true,
            }
        }
    }
    match (heroes, opponents) {
        (true, false) => Some(Some(Side::Heroes)),
        (false, true) => Some(Some(Side::Opponents)),
        (false, false) => Some(None),
        (true, true) if now_ms >= limits.max_duration_ms => Some(None),
        (true, true) => None,
    }
}

/// Close the latch and announce the end exactly once.
pub fn check_battle_end(
    clock: Res<BattleClock>,
    limits: Res<BattleLimits>,
    mut outcome: ResMut<BattleOutcome>,
    mut phase: ResMut<BattlePhase>,
    mut combat_log: ResMut<CombatLog>,
    mut ended: EventWriter<BattleEnded>,
    combatants: Query<&Combatant>,
) {
    if outcome.has_ended() {
        return;
    }
    let members = combatants.iter().map(|c| (c.side, c.alive, c.kind.is_summon()));
    let Some(winner) = decide_outcome(members, clock.now_ms, *limits) else {
        return;
    };
    if !outcome.close(winner, clock.now_ms) {
        return;
    }
    *phase = BattlePhase::Ended;
    let message = match winner {
        Some(Side::Heroes) => "Battle over: heroes win".to_string(),
        Some(Side::Opponents) => "Battle over: opponents win".to_string(),
        None => "Battle over: draw".to_string(),
    };
    combat_log.log(CombatLogEventType::MatchEvent, message.clone());
    info!("{} after {:.1}s", message, clock.now_ms / 1000.0);
    ended.send(BattleEnded {
        winner,
        duration_ms: clock.now_ms,
    });
}

/// One line of the report.
#[derive(Clone, Debug, Serialize)]
pub struct CombatantSummary {
    pub name: String,
    /// Class or enemy template name
    pub kind: String,
    pub side: Side,
    pub survived: bool,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    pub shielding_granted: f32,
    pub kills: u32,
}

/// Post-battle summary. Summon contributions are already credited to masters.
#[derive(Clone, Debug, Serialize)]
pub struct CombatReport {
    pub winner: Option<Side>,
    pub duration_secs: f32,
    pub combatants: Vec<CombatantSummary>,
}

impl CombatReport {
    pub fn collect<'a>(outcome: &BattleOutcome, now_ms: f64, combatants: impl Iterator<Item = &'a Combatant>) -> Self {
        let combatants = combatants
            .filter(|c| !c.kind.is_summon())
            .map(|c| CombatantSummary {
                name: c.name.clone(),
                kind: match c.kind {
                    CombatantKind::PlayerHero(class) | CombatantKind::AiHero(class) => class.name().to_string(),
                    CombatantKind::Enemy(enemy) => enemy.name().to_string(),
                    _ => c.template.name.clone(),
                },
                side: c.side,
                survived: c.alive,
                damage_dealt: c.report.damage_dealt,
                damage_taken: c.report.damage_taken,
                healing_done: c.report.healing_done,
                shielding_granted: c.report.shielding_granted,
                kills: c.report.kills,
            })
            .collect();
        Self {
            winner: outcome.winner(),
            duration_secs: (outcome.ended_at_ms().unwrap_or(now_ms) / 1000.0) as f32,
            combatants,
        }
    }

    /// Build the report from a battle world.
    pub fn from_world(world: &mut World) -> Self {
        let outcome = world.get_resource::<BattleOutcome>().cloned().unwrap_or_default();
        let now_ms = world.get_resource::<BattleClock>().map_or(0.0, |c| c.now_ms);
        let mut query = world.query::<&Combatant>();
        let mut report = Self::collect(&outcome, now_ms, query.iter(world));
        report.combatants.sort_by(|a, b| a.name.cmp(&b.name));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elimination_ignores_summons() {
        let members = [
            (Side::Heroes, true, true),
            (Side::Heroes, false, false),
            (Side::Opponents, true, false),
        ];
        assert_eq!(
            decide_outcome(members.into_iter(), 1000.0, BattleLimits::default()),
            Some(Some(Side::Opponents))
        );
    }

    #[test]
    fn test_both_alive_runs_until_timeout() {
        let members = [(Side::Heroes, true, false), (Side::Opponents, true, false)];
        let limits = BattleLimits {
            max_duration_ms: 5000.0,
        };
        assert_eq!(decide_outcome(members.into_iter(), 4999.0, limits), None);
        assert_eq!(decide_outcome(members.into_iter(), 5000.0, limits), Some(None));
    }

    #[test]
    fn test_mutual_wipe_is_draw() {
        let members = [(Side::Heroes, false, false), (Side::Opponents, false, false)];
        assert_eq!(
            decide_outcome(members.into_iter(), 0.0, BattleLimits::default()),
            Some(None)
        );
    }

    #[test]
    fn test_latch_closes_once() {
        let mut outcome = BattleOutcome::default();
        assert!(outcome.close(Some(Side::Heroes), 100.0));
        assert!(!outcome.close(Some(Side::Opponents), 200.0));
        assert_eq!(outcome.end_count(), 1);
        assert_eq!(outcome.winner(), Some(Side::Heroes));
        assert_eq!(outcome.ended_at_ms(), Some(100.0));
    }
}
