//! Ability System - Identifiers and Enums
//!
//! Stable identifiers for abilities, classes, enemy templates and summons.
//! Ability numbers live in `assets/config/abilities.ron` (see `ability_config`),
//! behavior lives in the handler library (see `class_ai`).

use serde::{Deserialize, Serialize};

/// Every ability and every aura the simulation knows about.
///
/// Aura-only ids (`Paralysis`, `Frenzy`, ...) never appear in an ability bar;
/// they exist so that auras created by passives and payoffs stay unique by id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbilityId {
    // Guardian
    ShieldWall,
    Taunt,
    ShieldBash,
    Rally,
    // Berserker
    Cleave,
    Rampage,
    Bloodlust,
    Charge,
    // Necromancer
    RaiseSkeleton,
    BoneSpear,
    DrainSoul,
    Decay,
    // Bard
    BalladOfMending,
    WarAnthem,
    Dirge,
    Crescendo,
    // Druid
    Rejuvenation,
    SummonTreant,
    Entangle,
    Barkskin,
    // Ranger
    PoisonArrow,
    VenomTrap,
    Volley,
    DoubleShot,
    Camouflage,
    // Cleric
    HolyLight,
    Aegis,
    Renew,
    DivineIntervention,
    // Assassin
    Shadowstep,
    MarkForDeath,
    Backstab,
    Vanish,
    // Enemies
    AimedShot,
    MendAlly,
    Regenerate,
    Smash,
    Burrow,
    Leap,
    // Aura-only
    Paralysis,
    Hemorrhage,
    Frenzy,
    FrenzyUnleashed,
    Enrage,
    VenomBite,
    Concussed,
    Dazed,
}

impl AbilityId {
    /// Human-readable name used in logs when no config name is at hand.
    pub fn name(&self) -> &'static str {
        match self {
            AbilityId::ShieldWall => "Shield Wall",
            AbilityId::Taunt => "Taunt",
            AbilityId::ShieldBash => "Shield Bash",
            AbilityId::Rally => "Rally",
            AbilityId::Cleave => "Cleave",
            AbilityId::Rampage => "Rampage",
            AbilityId::Bloodlust => "Bloodlust",
            AbilityId::Charge => "Charge",
            AbilityId::RaiseSkeleton => "Raise Skeleton",
            AbilityId::BoneSpear => "Bone Spear",
            AbilityId::DrainSoul => "Drain Soul",
            AbilityId::Decay => "Decay",
            AbilityId::BalladOfMending => "Ballad of Mending",
            AbilityId::WarAnthem => "War Anthem",
            AbilityId::Dirge => "Dirge",
            AbilityId::Crescendo => "Crescendo",
            AbilityId::Rejuvenation => "Rejuvenation",
            AbilityId::SummonTreant => "Summon Treant",
            AbilityId::Entangle => "Entangle",
            AbilityId::Barkskin => "Barkskin",
            AbilityId::PoisonArrow => "Poison Arrow",
            AbilityId::VenomTrap => "Venom Trap",
            AbilityId::Volley => "Volley",
            AbilityId::DoubleShot => "Double Shot",
            AbilityId::Camouflage => "Camouflage",
            AbilityId::HolyLight => "Holy Light",
            AbilityId::Aegis => "Aegis",
            AbilityId::Renew => "Renew",
            AbilityId::DivineIntervention => "Divine Intervention",
            AbilityId::Shadowstep => "Shadowstep",
            AbilityId::MarkForDeath => "Mark for Death",
            AbilityId::Backstab => "Backstab",
            AbilityId::Vanish => "Vanish",
            AbilityId::AimedShot => "Aimed Shot",
            AbilityId::MendAlly => "Mend Ally",
            AbilityId::Regenerate => "Regenerate",
            AbilityId::Smash => "Smash",
            AbilityId::Burrow => "Burrow",
            AbilityId::Leap => "Leap",
            AbilityId::Paralysis => "Paralysis",
            AbilityId::Hemorrhage => "Hemorrhage",
            AbilityId::Frenzy => "Frenzy",
            AbilityId::FrenzyUnleashed => "Frenzy Unleashed",
            AbilityId::Enrage => "Enrage",
            AbilityId::VenomBite => "Venom Bite",
            AbilityId::Concussed => "Concussed",
            AbilityId::Dazed => "Dazed",
        }
    }
}

/// Who an ability is aimed at. Handlers enforce the actual selection.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TargetType {
    /// The caster only
    SelfOnly,
    /// The caster's current enemy target
    Enemy,
    /// A single ally picked by the handler
    Ally,
    /// Every ally in a radius around the caster
    AllAllies,
    /// Every enemy in a radius around the caster or the target
    AllEnemies,
    /// A point on the ground (usually the target's position)
    Ground,
}

/// Hero classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassId {
    Guardian,
    Berserker,
    Necromancer,
    Bard,
    Druid,
    Ranger,
    Cleric,
    Assassin,
}

impl ClassId {
    pub fn name(&self) -> &'static str {
        match self {
            ClassId::Guardian => "Guardian",
            ClassId::Berserker => "Berserker",
            ClassId::Necromancer => "Necromancer",
            ClassId::Bard => "Bard",
            ClassId::Druid => "Druid",
            ClassId::Ranger => "Ranger",
            ClassId::Cleric => "Cleric",
            ClassId::Assassin => "Assassin",
        }
    }

    pub fn all() -> [ClassId; 8] {
        [
            ClassId::Guardian,
            ClassId::Berserker,
            ClassId::Necromancer,
            ClassId::Bard,
            ClassId::Druid,
            ClassId::Ranger,
            ClassId::Cleric,
            ClassId::Assassin,
        ]
    }
}

/// Enemy templates for waves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyId {
    Goblin,
    GoblinArcher,
    Shaman,
    Spider,
    Troll,
    Bloater,
    Sandworm,
    OgreChieftain,
}

impl EnemyId {
    pub fn name(&self) -> &'static str {
        match self {
            EnemyId::Goblin => "Goblin",
            EnemyId::GoblinArcher => "Goblin Archer",
            EnemyId::Shaman => "Shaman",
            EnemyId::Spider => "Spider",
            EnemyId::Troll => "Troll",
            EnemyId::Bloater => "Bloater",
            EnemyId::Sandworm => "Sandworm",
            EnemyId::OgreChieftain => "Ogre Chieftain",
        }
    }
}

/// Summoned allies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SummonKind {
    Skeleton,
    Treant,
}

/// Broad combat role. Enemy AI prefers `Guardian` targets.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Role {
    Guardian,
    #[default]
    Striker,
    Support,
    Caster,
}

/// Class-specific resource gauges.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ResourceKind {
    Fury,
    Corruption,
    Composition,
}

/// A note in a bard's composition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Note {
    Verse,
    Chorus,
    Bridge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_names_are_unique() {
        let ids = [
            AbilityId::ShieldWall,
            AbilityId::Taunt,
            AbilityId::Frenzy,
            AbilityId::FrenzyUnleashed,
            AbilityId::Paralysis,
        ];
        let names: std::collections::HashSet<_> = ids.iter().map(|id| id.name()).collect();
        assert_eq!(names.len(), ids.len());
    }

    #[test]
    fn test_all_classes_listed_once() {
        let all = ClassId::all();
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 8);
    }
}
