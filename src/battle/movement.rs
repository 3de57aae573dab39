//! Movement
//!
//! Straight-line steering toward the current target until it is in range.
//! Bodies block each other; a combatant that stops making progress starts a
//! short probe that bends its heading to slide around the obstruction.

use bevy::prelude::*;

use super::components::{ArenaBounds, AuraEffect, BattleClock, Combatant, Probe};
use super::constants::{BODY_OVERLAP_TOLERANCE, PROBE_ANGLE, PROBE_DURATION_MS, STUCK_EPSILON, STUCK_FRAME_THRESHOLD};
use super::roster::Roster;

/// Move every free combatant one frame toward its target.
pub fn move_to_target(
    clock: Res<BattleClock>,
    bounds: Res<ArenaBounds>,
    mut combatants: Query<(Entity, &mut Combatant)>,
) {
    let roster = Roster::build(combatants.iter());
    for (entity, mut combatant) in combatants.iter_mut() {
        steer(entity, &mut combatant, &roster, clock.now_ms, clock.delta_ms, *bounds);
    }
}

/// One steering step. Positions of other bodies come from `roster`.
pub fn steer(entity: Entity, me: &mut Combatant, roster: &Roster, now_ms: f64, dt_ms: f32, bounds: ArenaBounds) {
    if !me.alive || me.boss.is_busy() || me.is_immobilized() {
        return;
    }
    let Some(target) = me.target.and_then(|t| roster.get(t)) else {
        return;
    };
    let reach = (me.stats.size + target.stats.size) / 2.0;
    let distance = (me.position.distance(target.position) - reach).max(0.0);
    if distance <= me.stats.range {
        me.movement = Default::default();
        me.remove_auras_with(|e| matches!(e, AuraEffect::DashToTarget { .. }));
        return;
    }

    let dash = me
        .auras()
        .flat_map(|a| a.effects.iter())
        .filter_map(|e| match e {
            AuraEffect::DashToTarget { speed_multiplier } => Some(*speed_multiplier),
            _ => None,
        })
        .fold(1.0_f32, f32::max);
    let speed = me.stats.movement_speed * dash;

    let mut heading = (target.position - me.position).normalize_or_zero();
    if let Some(probe) = me.movement.probe {
        if now_ms >= probe.until_ms || distance < probe.start_distance - STUCK_EPSILON {
            me.movement.probe = None;
        } else {
            heading = Vec2::from_angle(probe.angle).rotate(heading);
        }
    }

    let next = bounds.clamp(me.position + heading * speed * dt_ms / 1000.0, me.stats.size);
    let blocked = roster.iter().any(|other| {
        if other.entity == entity || !other.alive {
            return false;
        }
        let contact = (me.stats.size + other.stats.size) / 2.0 * BODY_OVERLAP_TOLERANCE;
        let now = me.position.distance(other.position);
        let after = next.distance(other.position);
        after < contact && after < now
    });
    if !blocked {
        me.position = next;
    }

    let new_distance = (target.position.distance(me.position) - reach).max(0.0);
    match me.movement.last_distance {
        Some(last) if last - new_distance < STUCK_EPSILON => me.movement.stuck_frames += 1,
        _ => me.movement.stuck_frames = 0,
    }
    me.movement.last_distance = Some(new_distance);

    if me.movement.stuck_frames >= STUCK_FRAME_THRESHOLD && me.movement.probe.is_none() {
        let sign = if entity.index() % 2 == 0 { 1.0 } else { -1.0 };
        me.movement.probe = Some(Probe {
            angle: PROBE_ANGLE * sign,
            until_ms: now_ms + PROBE_DURATION_MS,
            start_distance: new_distance,
        });
        me.movement.stuck_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::{AbilityId, ClassId};
    use crate::battle::class_ai::test_support::Arena;
    use crate::battle::components::Side;

    #[test]
    fn test_moves_toward_target_until_in_range() {
        let mut arena = Arena::new();
        let me = arena.hero(ClassId::Berserker, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Cleric, Side::Opponents, Vec2::new(600.0, 300.0));
        arena.get_mut(me).target = Some(foe);
        let roster = arena.roster();

        steer(me, arena.get_mut(me), &roster, 0.0, 100.0, ArenaBounds::default());
        let moved = arena.get_mut(me).position;
        assert!(moved.x > 100.0);
        assert_eq!(moved.y, 300.0);
    }

    #[test]
    fn test_in_range_does_not_move() {
        let mut arena = Arena::new();
        let me = arena.hero(ClassId::Berserker, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Cleric, Side::Opponents, Vec2::new(130.0, 300.0));
        arena.get_mut(me).target = Some(foe);
        let roster = arena.roster();
        steer(me, arena.get_mut(me), &roster, 0.0, 100.0, ArenaBounds::default());
        assert_eq!(arena.get_mut(me).position, Vec2::new(100.0, 300.0));
    }

    #[test]
    fn test_stunned_does_not_move() {
        let mut arena = Arena::new();
        let me = arena.hero(ClassId::Berserker, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Cleric, Side::Opponents, Vec2::new(600.0, 300.0));
        arena.get_mut(me).target = Some(foe);
        let stun = arena
            .content
            .aura_template(AbilityId::ShieldBash)
            .unwrap()
            .instantiate(AbilityId::ShieldBash, foe, None, 0.0);
        arena.get_mut(me).apply_aura(stun);
        let roster = arena.roster();
        steer(me, arena.get_mut(me), &roster, 0.0, 100.0, ArenaBounds::default());
        assert_eq!(arena.get_mut(me).position, Vec2::new(100.0, 300.0));
    }

    #[test]
    fn test_blocked_body_starts_probe() {
        let mut arena = Arena::new();
        let me = arena.hero(ClassId::Berserker, Side::Heroes, Vec2::new(100.0, 300.0));
        // Ally standing directly in the path
        arena.hero(ClassId::Guardian, Side::Heroes, Vec2::new(128.0, 300.0));
        let foe = arena.hero(ClassId::Cleric, Side::Opponents, Vec2::new(600.0, 300.0));
        arena.get_mut(me).target = Some(foe);
        let roster = arena.roster();

        for frame in 0..STUCK_FRAME_THRESHOLD + 10 {
            steer(me, arena.get_mut(me), &roster, frame as f64 * 16.0, 16.0, ArenaBounds::default());
        }
        assert!(arena.get_mut(me).movement.probe.is_some());
    }

    #[test]
    fn test_position_stays_in_bounds() {
        let mut arena = Arena::new();
        let me = arena.hero(ClassId::Berserker, Side::Heroes, Vec2::new(990.0, 300.0));
        let foe = arena.hero(ClassId::Cleric, Side::Opponents, Vec2::new(5000.0, 300.0));
        arena.get_mut(me).target = Some(foe);
        let roster = arena.roster();
        steer(me, arena.get_mut(me), &roster, 0.0, 1000.0, ArenaBounds::default());
        let pos = arena.get_mut(me).position;
        assert!(pos.x <= 1000.0 - arena.get_mut(me).stats.size / 2.0);
    }
}
