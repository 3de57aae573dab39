//! Combat events
//!
//! Domain events produced while resolving effects. They are collected in the
//! per-battle `EventQueue`, drained once at the end of the frame, broadcast to
//! every living combatant's passives, then forwarded as Bevy events and
//! recorded in the combat log.

use bevy::prelude::*;

use crate::battle::abilities::AbilityId;

/// How an incoming hit resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum HitResult {
    Hit,
    Dodge,
    Block,
}

/// A domain event. Immutable once queued.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum CombatEvent {
    DamageDealt {
        attacker: Entity,
        target: Entity,
        amount: f32,
        is_crit: bool,
        /// `None` for basic attacks
        ability: Option<AbilityId>,
    },
    DamageTaken {
        target: Entity,
        attacker: Option<Entity>,
        amount: f32,
        result: HitResult,
        is_crit: bool,
    },
    HealPerformed {
        caster: Entity,
        target: Entity,
        amount: f32,
        is_crit: bool,
    },
    ShieldApplied {
        caster: Entity,
        target: Entity,
        amount: f32,
    },
    AbilityCast {
        caster: Entity,
        ability: AbilityId,
    },
    EntityDied {
        victim: Entity,
        killer: Option<Entity>,
    },
    SummonPerformed {
        caster: Entity,
        summon: Entity,
    },
    NotificationText {
        text: String,
        x: f32,
        y: f32,
        color: Color,
    },
}

impl CombatEvent {
    /// The entity this event is "about", used for death-only delivery.
    pub fn victim(&self) -> Option<Entity> {
        match self {
            CombatEvent::EntityDied { victim, .. } => Some(*victim),
            _ => None,
        }
    }
}

/// Events produced during the current frame, in order.
#[derive(Resource, Default, Debug)]
pub struct EventQueue {
    events: Vec<CombatEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter()
    }
}

/// Sent once when the battle-end latch closes.
#[derive(Event, Debug, Clone)]
pub struct BattleEnded {
    /// `None` for a draw
    pub winner: Option<crate::battle::components::Side>,
    pub duration_ms: f64,
}
