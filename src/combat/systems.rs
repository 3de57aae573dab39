//! Combat log systems
//!
//! Turns forwarded `CombatEvent`s into human-readable combat log entries.

use bevy::prelude::*;

use super::events::{CombatEvent, HitResult};
use super::log::{CombatLog, CombatLogEventType};
use crate::battle::components::{BattleClock, Combatant};

fn name_of(combatants: &Query<&Combatant>, entity: Entity) -> String {
    combatants
        .get(entity)
        .map(|c| c.name.clone())
        .unwrap_or_else(|_| "Unknown".to_string())
}

/// Build the log line for an event.
pub fn describe_event(event: &CombatEvent, name: impl Fn(Entity) -> String) -> (CombatLogEventType, String) {
    match event {
        CombatEvent::DamageDealt {
            attacker,
            target,
            amount,
            is_crit,
            ability,
        } => {
            let source = ability.map_or("Auto Attack", |a| a.name());
            let crit = if *is_crit { " (Critical)" } else { "" };
            (
                CombatLogEventType::Damage,
                format!("{}'s {} hits {} for {:.0} damage{}", name(*attacker), source, name(*target), amount, crit),
            )
        }
        CombatEvent::DamageTaken { target, attacker, result, .. } => {
            let attacker = attacker.map_or_else(|| "Something".to_string(), &name);
            match result {
                HitResult::Dodge => (
                    CombatLogEventType::Avoided,
                    format!("{} dodges {}'s attack", name(*target), attacker),
                ),
                HitResult::Block => (
                    CombatLogEventType::Avoided,
                    format!("{} blocks {}'s attack", name(*target), attacker),
                ),
                HitResult::Hit => (CombatLogEventType::Damage, String::new()),
            }
        }
        CombatEvent::HealPerformed {
            caster,
            target,
            amount,
            is_crit,
        } => {
            let crit = if *is_crit { " (Critical)" } else { "" };
            (
                CombatLogEventType::Healing,
                format!("{} heals {} for {:.0}{}", name(*caster), name(*target), amount, crit),
            )
        }
        CombatEvent::ShieldApplied { caster, target, amount } => (
            CombatLogEventType::Shield,
            format!("{} shields {} for {:.0}", name(*caster), name(*target), amount),
        ),
        CombatEvent::AbilityCast { caster, ability } => (
            CombatLogEventType::AbilityUsed,
            format!("{} uses {}", name(*caster), ability.name()),
        ),
        CombatEvent::EntityDied { victim, killer } => {
            let message = match killer {
                Some(killer) => format!("{} has been slain by {}", name(*victim), name(*killer)),
                None => format!("{} has died", name(*victim)),
            };
            (CombatLogEventType::Death, message)
        }
        CombatEvent::SummonPerformed { caster, summon } => (
            CombatLogEventType::Summon,
            format!("{} summons {}", name(*caster), name(*summon)),
        ),
        CombatEvent::NotificationText { text, .. } => (CombatLogEventType::Notification, text.clone()),
    }
}

/// Record forwarded events to the combat log.
///
/// `DamageTaken` hits are skipped; the matching `DamageDealt` already carries them.
pub fn record_combat_log(
    clock: Res<BattleClock>,
    mut combat_log: ResMut<CombatLog>,
    mut events: EventReader<CombatEvent>,
    combatants: Query<&Combatant>,
) {
    combat_log.match_time = (clock.now_ms / 1000.0) as f32;
    for event in events.read() {
        if matches!(event, CombatEvent::DamageTaken { result: HitResult::Hit, .. }) {
            continue;
        }
        let (event_type, message) = describe_event(event, |e| name_of(&combatants, e));
        combat_log.log(event_type, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::AbilityId;

    #[test]
    fn test_describe_basic_attack() {
        let event = CombatEvent::DamageDealt {
            attacker: Entity::from_raw(1),
            target: Entity::from_raw(2),
            amount: 42.4,
            is_crit: true,
            ability: None,
        };
        let (kind, message) = describe_event(&event, |e| format!("E{}", e.index()));
        assert_eq!(kind, CombatLogEventType::Damage);
        assert_eq!(message, "E1's Auto Attack hits E2 for 42 damage (Critical)");
    }

    #[test]
    fn test_describe_ability_cast() {
        let event = CombatEvent::AbilityCast {
            caster: Entity::from_raw(4),
            ability: AbilityId::ShieldBash,
        };
        let (_, message) = describe_event(&event, |_| "Guardian".to_string());
        assert_eq!(message, "Guardian uses Shield Bash");
    }
}
