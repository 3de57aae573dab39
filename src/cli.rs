//! Command-line interface for skirmish

use clap::Parser;
use std::path::PathBuf;

/// Party-vs-party combat simulator
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Party-vs-party real-time combat simulator")]
#[command(version)]
pub struct Args {
    /// Run a headless battle with the specified JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the battle log (overrides the config file)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum battle duration in seconds (overrides the config file)
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Random seed for a reproducible battle (overrides the config file)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulation settings file
    #[arg(long, value_name = "SETTINGS_FILE")]
    pub settings: Option<PathBuf>,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_parse() {
        let args = Args::parse_from([
            "skirmish",
            "--headless",
            "battle.json",
            "--seed",
            "42",
            "--max-duration",
            "90",
        ]);
        assert_eq!(args.headless, Some(PathBuf::from("battle.json")));
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.max_duration, Some(90.0));
        assert!(args.settings.is_none());
    }
}
