//! Integration tests for headless battles
//!
//! These tests verify that:
//! - JSON configs run to completion and produce a result
//! - Seeded runs are reproducible
//! - Logs are written where the config asks

use skirmish::battle::components::Side;
use skirmish::headless::{run_headless_battle, simulate_battle, ConfigError, HeadlessError};
use skirmish::{BattleSettings, HeadlessBattleConfig};

fn config(json: &str) -> HeadlessBattleConfig {
    HeadlessBattleConfig::from_json(json).expect("valid config")
}

fn quick_settings() -> BattleSettings {
    BattleSettings {
        placement_ms: 0.0,
        fixed_step_ms: Some(20.0),
        ..Default::default()
    }
}

#[test]
fn test_wave_battle_completes() {
    let config = config(
        r#"{
            "player": { "class": "Berserker" },
            "allies": [{ "class": "Guardian" }, { "class": "Cleric" }],
            "enemy_wave": ["Goblin"],
            "random_seed": 42,
            "max_duration_secs": 120
        }"#,
    );
    let result = simulate_battle(&config, quick_settings()).expect("battle runs");

    assert_eq!(result.winner, Some(Side::Heroes));
    assert_eq!(result.random_seed, Some(42));
    assert!(result.battle_time > 0.0 && result.battle_time <= 120.0);
    assert!(result.log_path.is_none());

    assert_eq!(result.report.combatants.len(), 4);
    let goblin = result
        .report
        .combatants
        .iter()
        .find(|c| c.side == Side::Opponents)
        .expect("goblin in report");
    assert!(!goblin.survived);
    let hero_damage: f32 = result
        .report
        .combatants
        .iter()
        .filter(|c| c.side == Side::Heroes)
        .map(|c| c.damage_dealt)
        .sum();
    assert!(hero_damage > 0.0);
}

#[test]
fn test_mirror_match_runs_to_a_result() {
    let config = config(
        r#"{
            "allies": [{ "class": "Assassin" }, { "class": "Druid" }],
            "opponent_heroes": [{ "class": "Necromancer" }, { "class": "Bard" }],
            "random_seed": 8,
            "max_duration_secs": 30
        }"#,
    );
    let result = simulate_battle(&config, quick_settings()).expect("battle runs");

    // Summons never appear in the report
    assert_eq!(result.report.combatants.len(), 4);
    assert!(result.battle_time <= 30.0 + 0.1);
    assert!(result.report.combatants.iter().all(|c| c.kind != "Skeleton" && c.kind != "Treant"));
}

#[test]
fn test_seeded_runs_match() {
    let json = r#"{
        "player": { "class": "Ranger", "items": ["Hawkeye Bow"] },
        "allies": [{ "class": "Bard" }],
        "enemy_wave": ["Spider", "Goblin"],
        "threat": 2,
        "random_seed": 99,
        "max_duration_secs": 60
    }"#;
    let first = simulate_battle(&config(json), quick_settings()).expect("first run");
    let second = simulate_battle(&config(json), quick_settings()).expect("second run");

    assert_eq!(first.winner, second.winner);
    assert_eq!(first.battle_time, second.battle_time);
    let damage = |r: &skirmish::headless::BattleResult| -> Vec<f32> {
        r.report.combatants.iter().map(|c| c.damage_dealt).collect()
    };
    assert_eq!(damage(&first), damage(&second));
}

#[test]
fn test_log_written_to_output_path() {
    let path = std::env::temp_dir().join(format!("skirmish_headless_{}.json", std::process::id()));
    let json = format!(
        r#"{{
            "allies": [{{ "class": "Guardian" }}, {{ "class": "Ranger" }}],
            "enemy_wave": ["Goblin"],
            "random_seed": 5,
            "max_duration_secs": 90,
            "output_path": {}
        }}"#,
        serde_json::to_string(path.to_str().unwrap()).unwrap()
    );
    let result = run_headless_battle(&config(&json), quick_settings()).expect("battle runs");

    let written = result.log_path.expect("log path");
    let contents = std::fs::read_to_string(&written).unwrap();
    let _ = std::fs::remove_file(&written);

    let saved: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(saved["report"]["combatants"].as_array().unwrap().len(), 3);
    assert!(saved["entries"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["message"].as_str().is_some_and(|m| m.starts_with("Battle over"))));
}

#[test]
fn test_missing_content_dir_is_an_error() {
    let config = config(
        r#"{
            "allies": [{ "class": "Guardian" }],
            "enemy_wave": ["Goblin"],
            "content_dir": "/nonexistent/skirmish/content"
        }"#,
    );
    assert!(matches!(
        simulate_battle(&config, quick_settings()),
        Err(HeadlessError::Content(_))
    ));
}

#[test]
fn test_oversized_configs_are_rejected() {
    let party = r#"{
        "player": { "class": "Ranger" },
        "allies": [
            { "class": "Guardian" }, { "class": "Cleric" },
            { "class": "Bard" }, { "class": "Druid" }, { "class": "Assassin" }
        ],
        "enemy_wave": ["Goblin"]
    }"#;
    assert!(matches!(
        HeadlessBattleConfig::from_json(party),
        Err(ConfigError::TooManyHeroes(6))
    ));

    let wave: Vec<&str> = std::iter::repeat("\"Goblin\"").take(13).collect();
    let json = format!(r#"{{ "allies": [{{ "class": "Guardian" }}], "enemy_wave": [{}] }}"#, wave.join(", "));
    assert!(matches!(
        HeadlessBattleConfig::from_json(&json),
        Err(ConfigError::WaveTooLarge(13))
    ));

    let zero_threat = r#"{ "allies": [{ "class": "Guardian" }], "enemy_wave": ["Goblin"], "threat": 0 }"#;
    assert!(matches!(
        HeadlessBattleConfig::from_json(zero_threat),
        Err(ConfigError::InvalidThreat)
    ));
}
