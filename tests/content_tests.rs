//! Integration tests for the shipped content files
//!
//! These tests verify that:
//! - The RON files on disk match the compiled-in content
//! - Every template is usable by the handler registry
//! - Broken content is rejected at load time

use std::path::{Path, PathBuf};

use skirmish::battle::abilities::{AbilityId, ClassId, EnemyId};
use skirmish::battle::ability_config::{ContentDefinitions, ContentError};
use skirmish::battle::class_ai::AbilityHandlers;

fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/config")
}

const ALL_ENEMIES: [EnemyId; 8] = [
    EnemyId::Goblin,
    EnemyId::GoblinArcher,
    EnemyId::Shaman,
    EnemyId::Spider,
    EnemyId::Troll,
    EnemyId::Bloater,
    EnemyId::Sandworm,
    EnemyId::OgreChieftain,
];

#[test]
fn test_content_dir_loads_and_has_handlers() {
    let content = ContentDefinitions::load_from_dir(&config_dir()).expect("content on disk");
    AbilityHandlers::default()
        .validate(&content)
        .expect("every usable ability has a handler");
}

#[test]
fn test_disk_and_builtin_agree() {
    let disk = ContentDefinitions::load_from_dir(&config_dir()).unwrap();
    let builtin = ContentDefinitions::builtin().unwrap();

    let mut disk_ids: Vec<_> = disk.ability_ids().copied().collect();
    let mut builtin_ids: Vec<_> = builtin.ability_ids().copied().collect();
    disk_ids.sort();
    builtin_ids.sort();
    assert_eq!(disk_ids, builtin_ids);
    assert_eq!(disk.item_names().count(), builtin.item_names().count());
}

#[test]
fn test_missing_dir_falls_back_to_builtin() {
    let content = ContentDefinitions::load_or_builtin(Path::new("/nonexistent/skirmish")).unwrap();
    assert!(content.class(ClassId::Guardian).is_some());

    assert!(matches!(
        ContentDefinitions::load_from_dir(Path::new("/nonexistent/skirmish")),
        Err(ContentError::Io { .. })
    ));
}

#[test]
fn test_every_unit_is_fightable() {
    let content = ContentDefinitions::builtin().unwrap();
    for class in ClassId::all() {
        let template = content.class(class).expect("class template");
        assert!(template.size > 0.0, "{:?} has no size", class);
        assert!(template.hp > 0.0);
        assert!(!template.abilities.is_empty(), "{:?} has no abilities", class);
        for ability in &template.abilities {
            let config = content.ability(*ability).unwrap();
            assert!(!config.aura_only, "{:?} lists aura-only {:?}", class, ability);
        }
    }
    for enemy in ALL_ENEMIES {
        let template = content.enemy(enemy).expect("enemy template");
        assert_eq!(template.name, enemy.name());
        assert!(template.size > 0.0 && template.hp > 0.0);
    }
}

#[test]
fn test_aura_only_entries_carry_auras() {
    let content = ContentDefinitions::builtin().unwrap();
    for id in [
        AbilityId::Paralysis,
        AbilityId::Frenzy,
        AbilityId::FrenzyUnleashed,
        AbilityId::Enrage,
        AbilityId::VenomBite,
    ] {
        let config = content.ability(id).expect("definition");
        assert!(config.aura_only, "{:?} should be aura-only", id);
        assert!(content.aura_template(id).is_some(), "{:?} has no aura", id);
    }
}

#[test]
fn test_dangling_ability_is_rejected() {
    let units = r#"(
        classes: {
            Guardian: (
                name: "Guardian", visual: "guardian", hp: 100.0, damage: 5.0,
                attack_interval_ms: 1000.0, range: 10.0, movement_speed: 90.0, size: 30.0,
                abilities: [Taunt],
            ),
        },
        enemies: {},
        summons: {
            Skeleton: (name: "Skeleton", visual: "s", hp: 10.0, damage: 1.0,
                attack_interval_ms: 1000.0, range: 10.0, movement_speed: 90.0, size: 20.0),
            Treant: (name: "Treant", visual: "t", hp: 10.0, damage: 1.0,
                attack_interval_ms: 1000.0, range: 10.0, movement_speed: 90.0, size: 20.0),
        },
    )"#;
    let result = ContentDefinitions::from_strs("(abilities: {})", units, "(items: {})");
    assert!(matches!(
        result,
        Err(ContentError::MissingAbility {
            ability: AbilityId::Taunt,
            ..
        })
    ));
}

#[test]
fn test_malformed_ron_names_the_file() {
    let err = ContentDefinitions::from_strs("(abilities: {", "(classes: {})", "(items: {})").unwrap_err();
    match err {
        ContentError::Parse { path, .. } => assert_eq!(path, "abilities.ron"),
        other => panic!("expected parse error, got {}", other),
    }
}
