//! Presentation Cues
//!
//! Ephemeral descriptions of *what happened* this frame, for the presentation
//! collaborator to render however it likes. The core never reads them back.
//!
//! ## Types
//! - `DamageNumber`: a number popping off a combatant
//! - `VfxCue`: a named effect at a point (impact, burst, teleport...)
//! - `PresentationFeed`: per-frame list of cues, cleared when the next frame starts

use bevy::prelude::*;

/// What a floating number represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberKind {
    Damage,
    Heal,
    Shield,
    Dodge,
    Block,
    Miss,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DamageNumber {
    pub target: Entity,
    pub position: Vec2,
    pub amount: f32,
    pub kind: NumberKind,
    pub is_crit: bool,
}

/// Named visual effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VfxKind {
    Impact,
    Burst,
    Teleport,
    Summon,
    Burrow,
    Emerge,
    Landing,
    Stun,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VfxCue {
    pub kind: VfxKind,
    pub position: Vec2,
    pub radius: f32,
}

/// One presentation cue.
#[derive(Clone, Debug, PartialEq)]
pub enum VisualCue {
    Number(DamageNumber),
    Vfx(VfxCue),
    Notification { text: String, position: Vec2, color: Color },
}

/// Cues produced during the current frame.
#[derive(Resource, Default, Debug)]
pub struct PresentationFeed {
    pub cues: Vec<VisualCue>,
}

impl PresentationFeed {
    pub fn number(&mut self, target: Entity, position: Vec2, amount: f32, kind: NumberKind, is_crit: bool) {
        self.cues.push(VisualCue::Number(DamageNumber {
            target,
            position,
            amount,
            kind,
            is_crit,
        }));
    }

    pub fn vfx(&mut self, kind: VfxKind, position: Vec2, radius: f32) {
        self.cues.push(VisualCue::Vfx(VfxCue { kind, position, radius }));
    }

    pub fn numbers(&self) -> impl Iterator<Item = &DamageNumber> {
        self.cues.iter().filter_map(|c| match c {
            VisualCue::Number(n) => Some(n),
            _ => None,
        })
    }
}
