use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use goalscan_game::{World, WorldSpec};
use goalscan_logic::{CategorySpec, WorldGoals};

use crate::settings::HintSettings;

#[derive(Deserialize, Clone, Debug)]
pub struct ScenarioWorld {
    #[serde(flatten)]
    pub world: WorldSpec,
    // Replaces the scenario-wide goal categories for this world only.
    #[serde(default)]
    pub goal_categories: Option<Vec<CategorySpec>>,
}

// A finished world set plus its goals, as handed over by the placement step.
#[derive(Deserialize, Clone, Debug)]
pub struct Scenario {
    #[serde(default)]
    pub settings: HintSettings,
    #[serde(default)]
    pub goal_categories: Vec<CategorySpec>,
    pub worlds: Vec<ScenarioWorld>,
}

pub struct LoadedScenario {
    pub worlds: Vec<World>,
    pub goals: Vec<WorldGoals>,
    pub settings: HintSettings,
}

impl Scenario {
    pub fn build(&self) -> Result<LoadedScenario> {
        let mut worlds = vec![];
        let mut goals = vec![];
        for (id, w) in self.worlds.iter().enumerate() {
            worlds.push(World::from_spec(id, &w.world).with_context(|| format!("world {id}"))?);
            let specs = w.goal_categories.as_ref().unwrap_or(&self.goal_categories);
            let mut categories = vec![];
            for spec in specs {
                categories.push(
                    spec.build()
                        .with_context(|| format!("world {id}: goal category {:?}", spec.name))?,
                );
            }
            goals.push(WorldGoals::new(id, categories)?);
        }
        Ok(LoadedScenario {
            worlds,
            goals,
            settings: self.settings.clone(),
        })
    }
}

pub fn parse_scenario(scenario_json: &str) -> Result<Scenario> {
    let mut des = serde_json::Deserializer::from_str(scenario_json);
    let scenario = serde_path_to_error::deserialize(&mut des)?;
    Ok(scenario)
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let scenario_str = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    parse_scenario(&scenario_str).with_context(|| format!("unable to parse {}", path.display()))
}
