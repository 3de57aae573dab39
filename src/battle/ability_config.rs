//! Data-Driven Content Configuration
//!
//! Ability, class, enemy, summon and item definitions are loaded from RON files
//! in `assets/config/`:
//! - `abilities.ron`: cooldowns, ranges, handler properties and aura templates
//! - `units.ron`: class, enemy and summon stat templates
//! - `items.ron`: equipment stat bonuses and passives
//!
//! The same files are compiled into the binary (`ContentDefinitions::builtin`)
//! so tests and the headless runner work from any working directory.
//! Validation runs at load time; the simulation itself never fails on content.
//!
//! ## Usage
//! ```ignore
//! fn my_system(content: Res<ContentDefinitions>) {
//!     if let Some(config) = content.ability(AbilityId::ShieldBash) {
//!         println!("Shield Bash range: {}", config.range);
//!     }
//! }
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::abilities::{AbilityId, ClassId, EnemyId, ResourceKind, Role, SummonKind, TargetType};
use super::components::auras::AuraTemplate;
use super::stats::{BaseStats, StatKind};

const ABILITIES_FILE: &str = "abilities.ron";
const UNITS_FILE: &str = "units.ron";
const ITEMS_FILE: &str = "items.ron";

/// Errors raised while loading or validating content. Startup only.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("{owner} references ability {ability:?}, which has no definition")]
    MissingAbility { owner: String, ability: AbilityId },
    #[error("aura {0:?} is referenced but has no aura template")]
    MissingAura(AbilityId),
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("ability {0:?} has no registered handler")]
    MissingHandler(AbilityId),
    #[error("no template for {0}")]
    MissingTemplate(String),
}

/// A single ability activation could not be evaluated because its
/// properties are malformed. Fails the activation, never the frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AbilityError {
    #[error("{ability} is missing property '{key}'")]
    MissingProperty { ability: String, key: &'static str },
    #[error("{ability} property '{key}' has invalid value {value}")]
    InvalidProperty {
        ability: String,
        key: &'static str,
        value: f32,
    },
    #[error("{0:?} has no aura template")]
    MissingAura(AbilityId),
}

/// Immutable ability template.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbilityConfig {
    /// Display name
    pub name: String,
    /// Cooldown started on a successful activation
    pub cooldown_ms: f32,
    /// Generic duration (channels, boss phases)
    #[serde(default)]
    pub duration_ms: f32,
    pub target: TargetType,
    /// Maximum edge-to-edge distance to the target
    #[serde(default)]
    pub range: f32,
    /// Handler-specific numbers
    #[serde(default)]
    pub properties: HashMap<String, f32>,
    /// Aura applied by the handler (or by projectiles/passives referencing this id)
    #[serde(default)]
    pub aura: Option<AuraTemplate>,
    /// Only an aura definition (payoffs, passives); never activated
    #[serde(default)]
    pub aura_only: bool,
}

impl AbilityConfig {
    /// Look up a required property.
    pub fn prop(&self, key: &'static str) -> Result<f32, AbilityError> {
        self.properties
            .get(key)
            .copied()
            .ok_or_else(|| AbilityError::MissingProperty {
                ability: self.name.clone(),
                key,
            })
    }

    /// Look up a required property that must be strictly positive.
    pub fn positive_prop(&self, key: &'static str) -> Result<f32, AbilityError> {
        let value = self.prop(key)?;
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(AbilityError::InvalidProperty {
                ability: self.name.clone(),
                key,
                value,
            })
        }
    }

    /// Optional property with a fallback.
    pub fn prop_or(&self, key: &str, default: f32) -> f32 {
        self.properties.get(key).copied().unwrap_or(default)
    }
}

/// Passive behavior attached to enemy templates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PassiveTrigger {
    /// Basic attacks that land apply this aura to the victim
    OnHitAura { aura: AbilityId },
    /// Once, when health drops below `threshold` (fraction), apply this aura to self
    EnrageAtHealth { threshold: f32, aura: AbilityId },
    /// On death, damage every enemy within `radius`
    DeathBurst { radius: f32, damage: f32 },
}

/// Passive behavior attached to items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ItemPassive {
    /// Landing a basic attack adds a stack of `aura` (its template owns the cap/payoff)
    StackOnBasicAttack { aura: AbilityId },
    /// Healing an ally also shields them for `percent` of the heal, on a cooldown
    ShieldOnHeal { percent: f32, cooldown_ms: f32 },
    /// Killing blows heal the wearer
    HealOnKill { amount: f32 },
}

/// Equipment definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    #[serde(default)]
    pub stats: Vec<(StatKind, f32)>,
    #[serde(default)]
    pub passive: Option<ItemPassive>,
}

/// Stat template for a class, enemy or summon.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub name: String,
    /// Opaque tag handed to the presentation layer
    pub visual: String,
    #[serde(default)]
    pub role: Role,
    pub hp: f32,
    pub damage: f32,
    pub attack_interval_ms: f32,
    pub range: f32,
    pub movement_speed: f32,
    pub size: f32,
    #[serde(default)]
    pub base: BaseStats,
    /// Threat scaling of lethality/vigor (creatures only)
    #[serde(default)]
    pub scaling: f32,
    /// Abilities in AI priority order
    #[serde(default)]
    pub abilities: Vec<AbilityId>,
    #[serde(default)]
    pub passives: Vec<PassiveTrigger>,
    #[serde(default)]
    pub resource: Option<ResourceKind>,
    /// Basic attacks fire a homing projectile at this speed
    #[serde(default)]
    pub attack_projectile_speed: Option<f32>,
    #[serde(default)]
    pub boss: bool,
    /// Summons expire after this long
    #[serde(default)]
    pub lifetime_ms: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct AbilitiesFile {
    abilities: HashMap<AbilityId, AbilityConfig>,
}

#[derive(Debug, Deserialize)]
struct UnitsFile {
    classes: HashMap<ClassId, UnitTemplate>,
    enemies: HashMap<EnemyId, UnitTemplate>,
    summons: HashMap<SummonKind, UnitTemplate>,
}

#[derive(Debug, Deserialize)]
struct ItemsFile {
    items: HashMap<String, ItemDef>,
}

/// All content definitions.
///
/// Inserted as a resource before the battle starts.
#[derive(Resource, Debug)]
pub struct ContentDefinitions {
    abilities: HashMap<AbilityId, AbilityConfig>,
    classes: HashMap<ClassId, UnitTemplate>,
    enemies: HashMap<EnemyId, UnitTemplate>,
    summons: HashMap<SummonKind, UnitTemplate>,
    items: HashMap<String, ItemDef>,
}

fn parse<T: serde::de::DeserializeOwned>(path: &str, contents: &str) -> Result<T, ContentError> {
    ron::from_str(contents).map_err(|source| ContentError::Parse {
        path: path.to_string(),
        source,
    })
}

impl ContentDefinitions {
    /// Parse content from the three file bodies and validate it.
    pub fn from_strs(abilities: &str, units: &str, items: &str) -> Result<Self, ContentError> {
        let abilities: AbilitiesFile = parse(ABILITIES_FILE, abilities)?;
        let units: UnitsFile = parse(UNITS_FILE, units)?;
        let items: ItemsFile = parse(ITEMS_FILE, items)?;

        let content = Self {
            abilities: abilities.abilities,
            classes: units.classes,
            enemies: units.enemies,
            summons: units.summons,
            items: items.items,
        };
        content.validate()?;
        Ok(content)
    }

    /// Content compiled into the binary from `assets/config/`.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_strs(
            include_str!("../../assets/config/abilities.ron"),
            include_str!("../../assets/config/units.ron"),
            include_str!("../../assets/config/items.ron"),
        )
    }

    /// Load content from a directory containing the three RON files.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ContentError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| ContentError::Io {
                path: path.display().to_string(),
                source,
            })
        };
        let content = Self::from_strs(&read(ABILITIES_FILE)?, &read(UNITS_FILE)?, &read(ITEMS_FILE)?)?;
        info!(
            "Loaded {} abilities, {} classes, {} enemies, {} items from {}",
            content.abilities.len(),
            content.classes.len(),
            content.enemies.len(),
            content.items.len(),
            dir.display()
        );
        Ok(content)
    }

    /// `dir` when it exists, otherwise the compiled-in copy.
    pub fn load_or_builtin(dir: &Path) -> Result<Self, ContentError> {
        if dir.exists() {
            Self::load_from_dir(dir)
        } else {
            debug!("{} not found, using built-in content", dir.display());
            Self::builtin()
        }
    }

    pub fn ability(&self, id: AbilityId) -> Option<&AbilityConfig> {
        self.abilities.get(&id)
    }

    pub fn aura_template(&self, id: AbilityId) -> Option<&AuraTemplate> {
        self.abilities.get(&id).and_then(|a| a.aura.as_ref())
    }

    pub fn class(&self, id: ClassId) -> Option<&UnitTemplate> {
        self.classes.get(&id)
    }

    pub fn enemy(&self, id: EnemyId) -> Option<&UnitTemplate> {
        self.enemies.get(&id)
    }

    pub fn summon(&self, kind: SummonKind) -> Option<&UnitTemplate> {
        self.summons.get(&kind)
    }

    pub fn item(&self, name: &str) -> Option<&ItemDef> {
        self.items.get(name)
    }

    pub fn ability_ids(&self) -> impl Iterator<Item = &AbilityId> {
        self.abilities.keys()
    }

    pub fn item_names(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    /// Every ability a template uses must be defined, and every aura
    /// reference (payoffs, passives) must resolve to a template.
    pub fn validate(&self) -> Result<(), ContentError> {
        let templates = self
            .classes
            .values()
            .chain(self.enemies.values())
            .chain(self.summons.values());
        for template in templates {
            for ability in &template.abilities {
                if !self.abilities.contains_key(ability) {
                    return Err(ContentError::MissingAbility {
                        owner: template.name.clone(),
                        ability: *ability,
                    });
                }
            }
            for passive in &template.passives {
                match passive {
                    PassiveTrigger::OnHitAura { aura } | PassiveTrigger::EnrageAtHealth { aura, .. } => {
                        self.require_aura(*aura)?;
                    }
                    PassiveTrigger::DeathBurst { .. } => {}
                }
            }
        }

        for item in self.items.values() {
            if let Some(ItemPassive::StackOnBasicAttack { aura }) = &item.passive {
                self.require_aura(*aura)?;
            }
        }

        for config in self.abilities.values() {
            if let Some(payoff) = config.aura.as_ref().and_then(|a| a.payoff) {
                self.require_aura(payoff.apply)?;
            }
        }

        for kind in [SummonKind::Skeleton, SummonKind::Treant] {
            if !self.summons.contains_key(&kind) {
                return Err(ContentError::MissingTemplate(format!("{:?}", kind)));
            }
        }

        Ok(())
    }

    fn require_aura(&self, id: AbilityId) -> Result<(), ContentError> {
        if self.aura_template(id).is_some() {
            Ok(())
        } else {
            Err(ContentError::MissingAura(id))
        }
    }
}
