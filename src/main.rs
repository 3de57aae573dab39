//! Skirmish - Party-vs-Party Combat Simulation Core
//!
//! Runs a headless battle from a JSON config and prints the outcome.

use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use std::process::ExitCode;

use skirmish::cli::{self, Args};
use skirmish::headless::{run_headless_battle, HeadlessBattleConfig};
use skirmish::settings::BattleSettings;

fn main() -> ExitCode {
    let args = cli::parse_args();

    // Installs the global tracing subscriber
    App::new()
        .add_plugins(LogPlugin {
            level: Level::INFO,
            filter: "skirmish=info".to_string(),
            ..default()
        })
        .finish();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let Some(config_path) = args.headless else {
        return Err("no battle to run: pass --headless <CONFIG_FILE>".into());
    };

    let mut config = HeadlessBattleConfig::load_from_file(&config_path)?;
    if let Some(output) = args.output {
        config.output_path = Some(output.display().to_string());
    }
    if let Some(max_duration) = args.max_duration {
        config.max_duration_secs = max_duration;
    }
    if args.seed.is_some() {
        config.random_seed = args.seed;
    }
    config.validate()?;

    let settings_path = args.settings.unwrap_or_else(BattleSettings::settings_path);
    let settings = BattleSettings::load(&settings_path);

    let result = run_headless_battle(&config, settings)?;
    let winner = match result.winner {
        Some(side) => format!("{:?}", side),
        None => "Draw".to_string(),
    };
    println!("Winner: {} after {:.1}s", winner, result.battle_time);
    for c in &result.report.combatants {
        println!(
            "  {:<16} {:<10} {:>8.0} dmg {:>8.0} heal {:>7.0} shield {:>2} kills {}",
            c.name,
            format!("{:?}", c.side),
            c.damage_dealt,
            c.healing_done,
            c.shielding_granted,
            c.kills,
            if c.survived { "" } else { "(dead)" }
        );
    }
    Ok(())
}
