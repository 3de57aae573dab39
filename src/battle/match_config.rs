//! Battle setup data and spawning
//!
//! `BattleSetup` describes who fights: an optional player hero, AI allies, and
//! either an opposing hero party or an enemy wave, plus the threat level.
//! `spawn_battle` turns it into `Combatant` entities lined up on the two ends
//! of the arena.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::abilities::{ClassId, EnemyId};
use super::ability_config::{ContentDefinitions, ContentError, ItemDef};
use super::components::{ArenaBounds, Combatant, CombatantKind, Side};
use crate::combat::log::{CombatLog, CombatLogEventType};

/// Distance from the arena edge to each side's starting line.
const SPAWN_MARGIN: f32 = 100.0;

/// Vertical spacing between combatants on the same starting line.
const SPAWN_SPACING: f32 = 70.0;

/// One hero and their equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroSlot {
    pub class: ClassId,
    /// Item names from `items.ron`
    #[serde(default)]
    pub items: Vec<String>,
}

impl HeroSlot {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            items: Vec::new(),
        }
    }
}

/// What the heroes are up against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpposingForce {
    /// Another hero party
    Heroes(Vec<HeroSlot>),
    /// A creature wave
    Wave(Vec<EnemyId>),
}

impl OpposingForce {
    pub fn len(&self) -> usize {
        match self {
            OpposingForce::Heroes(heroes) => heroes.len(),
            OpposingForce::Wave(enemies) => enemies.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Roster composition for one battle.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSetup {
    /// The controllable hero, if any
    #[serde(default)]
    pub player: Option<HeroSlot>,
    /// AI-controlled heroes on the player's side
    #[serde(default)]
    pub allies: Vec<HeroSlot>,
    pub opponents: OpposingForce,
    /// Scales item stats and creature lethality/vigor
    #[serde(default = "default_threat")]
    pub threat: u32,
}

fn default_threat() -> u32 {
    1
}

impl BattleSetup {
    /// Number of heroes on the player's side.
    pub fn hero_count(&self) -> usize {
        self.allies.len() + usize::from(self.player.is_some())
    }

    /// Build every combatant at its starting position, heroes first.
    pub fn build_combatants(
        &self,
        content: &ContentDefinitions,
        bounds: ArenaBounds,
    ) -> Result<Vec<Combatant>, ContentError> {
        let mut names = NameCounter::default();
        let mut combatants = Vec::new();

        let heroes = self
            .player
            .iter()
            .map(|slot| (slot, true))
            .chain(self.allies.iter().map(|slot| (slot, false)));
        let hero_count = self.hero_count();
        for (index, (slot, is_player)) in heroes.enumerate() {
            let position = starting_position(bounds, Side::Heroes, index, hero_count);
            let kind = if is_player {
                CombatantKind::PlayerHero(slot.class)
            } else {
                CombatantKind::AiHero(slot.class)
            };
            combatants.push(self.hero(content, slot, kind, Side::Heroes, position, &mut names)?);
        }

        let count = self.opponents.len();
        match &self.opponents {
            OpposingForce::Heroes(heroes) => {
                for (index, slot) in heroes.iter().enumerate() {
                    let position = starting_position(bounds, Side::Opponents, index, count);
                    let kind = CombatantKind::AiHero(slot.class);
                    combatants.push(self.hero(content, slot, kind, Side::Opponents, position, &mut names)?);
                }
            }
            OpposingForce::Wave(enemies) => {
                for (index, &id) in enemies.iter().enumerate() {
                    let template = content
                        .enemy(id)
                        .ok_or_else(|| ContentError::MissingTemplate(id.name().to_string()))?
                        .clone();
                    let position = starting_position(bounds, Side::Opponents, index, count);
                    combatants.push(Combatant::new(
                        names.next(id.name()),
                        CombatantKind::Enemy(id),
                        Side::Opponents,
                        template,
                        Vec::new(),
                        self.threat,
                        position,
                    ));
                }
            }
        }
        Ok(combatants)
    }

    fn hero(
        &self,
        content: &ContentDefinitions,
        slot: &HeroSlot,
        kind: CombatantKind,
        side: Side,
        position: Vec2,
        names: &mut NameCounter,
    ) -> Result<Combatant, ContentError> {
        let template = content
            .class(slot.class)
            .ok_or_else(|| ContentError::MissingTemplate(slot.class.name().to_string()))?
            .clone();
        let items = slot
            .items
            .iter()
            .map(|name| {
                content
                    .item(name)
                    .cloned()
                    .ok_or_else(|| ContentError::UnknownItem(name.clone()))
            })
            .collect::<Result<Vec<ItemDef>, _>>()?;
        Ok(Combatant::new(
            names.next(slot.class.name()),
            kind,
            side,
            template,
            items,
            self.threat,
            position,
        ))
    }
}

/// Gives duplicates a numeric suffix: "Goblin", "Goblin 2", ...
#[derive(Default)]
struct NameCounter {
    seen: HashMap<String, usize>,
}

impl NameCounter {
    fn next(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{} {}", base, count)
        }
    }
}

/// Heroes line up on the left, opponents on the right, centered vertically.
pub fn starting_position(bounds: ArenaBounds, side: Side, index: usize, count: usize) -> Vec2 {
    let x = match side {
        Side::Heroes => SPAWN_MARGIN,
        Side::Opponents => bounds.width - SPAWN_MARGIN,
    };
    let offset = index as f32 - (count.max(1) - 1) as f32 / 2.0;
    let y = bounds.height / 2.0 + offset * SPAWN_SPACING;
    bounds.clamp(Vec2::new(x, y), 0.0)
}

/// Spawn every combatant described by `setup` into `world`.
///
/// Needs `ContentDefinitions` in the world; `ArenaBounds` falls back to the
/// default arena.
pub fn spawn_battle(world: &mut World, setup: &BattleSetup) -> Result<Vec<Entity>, ContentError> {
    let bounds = world.get_resource::<ArenaBounds>().copied().unwrap_or_default();
    let combatants = {
        let content = world
            .get_resource::<ContentDefinitions>()
            .ok_or_else(|| ContentError::MissingTemplate("content definitions".to_string()))?;
        setup.build_combatants(content, bounds)?
    };

    let mut joined = Vec::with_capacity(combatants.len());
    let mut entities = Vec::with_capacity(combatants.len());
    for combatant in combatants {
        joined.push(format!(
            "{} joins the {:?} ({:.0} HP)",
            combatant.name, combatant.side, combatant.stats.max_hp
        ));
        entities.push(world.spawn(combatant).id());
    }
    if let Some(mut log) = world.get_resource_mut::<CombatLog>() {
        for line in joined {
            log.log(CombatLogEventType::MatchEvent, line);
        }
    }
    info!("Spawned {} combatants at threat {}", entities.len(), setup.threat);
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> ContentDefinitions {
        ContentDefinitions::builtin().expect("builtin content")
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let setup = BattleSetup {
            player: None,
            allies: vec![HeroSlot::new(ClassId::Guardian)],
            opponents: OpposingForce::Wave(vec![EnemyId::Goblin, EnemyId::Goblin, EnemyId::Spider]),
            threat: 1,
        };
        let combatants = setup.build_combatants(&content(), ArenaBounds::default()).unwrap();
        let names: Vec<_> = combatants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Guardian", "Goblin", "Goblin 2", "Spider"]);
    }

    #[test]
    fn test_sides_start_apart() {
        let setup = BattleSetup {
            player: Some(HeroSlot::new(ClassId::Ranger)),
            allies: vec![HeroSlot::new(ClassId::Cleric)],
            opponents: OpposingForce::Heroes(vec![HeroSlot::new(ClassId::Berserker)]),
            threat: 1,
        };
        let combatants = setup.build_combatants(&content(), ArenaBounds::default()).unwrap();
        assert!(matches!(combatants[0].kind, CombatantKind::PlayerHero(ClassId::Ranger)));
        assert!(matches!(combatants[1].kind, CombatantKind::AiHero(ClassId::Cleric)));
        assert_eq!(combatants[2].side, Side::Opponents);
        assert!(combatants[2].position.x > combatants[0].position.x);
        assert_ne!(combatants[0].position, combatants[1].position);
    }

    #[test]
    fn test_unknown_item_is_rejected() {
        let setup = BattleSetup {
            player: None,
            allies: vec![HeroSlot {
                class: ClassId::Guardian,
                items: vec!["Sword of Nowhere".to_string()],
            }],
            opponents: OpposingForce::Wave(vec![EnemyId::Goblin]),
            threat: 1,
        };
        let err = setup.build_combatants(&content(), ArenaBounds::default()).unwrap_err();
        assert!(matches!(err, ContentError::UnknownItem(name) if name == "Sword of Nowhere"));
    }

    #[test]
    fn test_threat_scales_creatures() {
        let wave = |threat| BattleSetup {
            player: None,
            allies: vec![HeroSlot::new(ClassId::Guardian)],
            opponents: OpposingForce::Wave(vec![EnemyId::Troll]),
            threat,
        };
        let low = wave(1).build_combatants(&content(), ArenaBounds::default()).unwrap();
        let high = wave(5).build_combatants(&content(), ArenaBounds::default()).unwrap();
        assert!(high[1].stats.max_hp > low[1].stats.max_hp);
    }
}
