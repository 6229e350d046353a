use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use goalscan::scenario::load_scenario;
use goalscan::spoiler::get_spoiler_goals;
use goalscan::{parse_hint_settings, update_goal_items};

#[derive(Parser)]
struct Args {
    #[arg(long)]
    scenario: PathBuf,

    // Overrides the settings embedded in the scenario.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    output_spoiler: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let mut loaded = load_scenario(&args.scenario)?.build()?;
    if let Some(path) = &args.settings {
        let settings_str = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        loaded.settings = parse_hint_settings(&settings_str)
            .with_context(|| format!("unable to parse {}", path.display()))?;
    }
    info!(
        "Loaded {} worlds from {}",
        loaded.worlds.len(),
        args.scenario.display()
    );

    let report = update_goal_items(&loaded.worlds, &mut loaded.goals, &loaded.settings)?;
    let spoiler = get_spoiler_goals(&loaded.worlds, &loaded.goals, &report);
    let spoiler_str = serde_json::to_string_pretty(&spoiler)?;
    match &args.output_spoiler {
        Some(path) => {
            std::fs::write(path, spoiler_str)
                .with_context(|| format!("unable to write {}", path.display()))?;
            info!("Wrote spoiler goals to {}", path.display());
        }
        None => println!("{spoiler_str}"),
    }
    Ok(())
}
