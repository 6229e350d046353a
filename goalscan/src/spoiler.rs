use goalscan_game::util::sorted_hashmap_iter;
use goalscan_game::{LocationKey, World, WorldId};
use goalscan_logic::{GoalItem, RequiredLocation, WorldGoals};
use serde::Serialize;

use crate::analyze::GoalReport;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SpoilerLocation {
    pub world: WorldId,
    pub location: String,
    pub item: Option<String>,
    pub item_world: Option<WorldId>,
}

impl SpoilerLocation {
    fn new(worlds: &[World], key: LocationKey) -> Self {
        let loc = &worlds[key.world].locations[key.idx];
        SpoilerLocation {
            world: key.world,
            location: loc.name.clone(),
            item: loc.item.as_ref().map(|i| i.name.clone()),
            item_world: loc.item.as_ref().map(|i| i.world),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct SpoilerRequiredLocation {
    pub location: SpoilerLocation,
    pub weight: u8,
    pub bottleneck_weight: u8,
    pub hintable_worlds: Vec<WorldId>,
}

#[derive(Serialize, Clone, Debug)]
pub struct SpoilerGoal {
    pub name: String,
    pub hint_text: String,
    pub color: String,
    pub weight: u8,
    pub items: Vec<GoalItem>,
    pub locations: Vec<String>,
    pub required_locations: Vec<SpoilerRequiredLocation>,
}

#[derive(Serialize, Clone, Debug)]
pub struct SpoilerCategory {
    pub name: String,
    pub priority: i32,
    pub weight: u8,
    pub goals: Vec<SpoilerGoal>,
}

// Necessary locations for one goal of `goal_world`, held by `location_world`.
#[derive(Serialize, Clone, Debug)]
pub struct SpoilerGoalLocations {
    pub category: String,
    pub goal: String,
    pub location_world: WorldId,
    pub locations: Vec<SpoilerLocation>,
}

#[derive(Serialize, Clone, Debug)]
pub struct SpoilerWorldGoals {
    pub world: WorldId,
    pub categories: Vec<SpoilerCategory>,
    pub goal_locations: Vec<SpoilerGoalLocations>,
    pub woth_locations: Vec<SpoilerLocation>,
    pub tracked_location: Option<SpoilerLocation>,
}

#[derive(Serialize, Clone, Debug)]
pub struct SpoilerGoals {
    pub worlds: Vec<SpoilerWorldGoals>,
}

fn get_spoiler_required(worlds: &[World], r: &RequiredLocation) -> SpoilerRequiredLocation {
    SpoilerRequiredLocation {
        location: SpoilerLocation::new(worlds, r.location),
        weight: r.weight,
        bottleneck_weight: r.bottleneck_weight,
        hintable_worlds: r.hintable_worlds.clone(),
    }
}

pub fn get_spoiler_goals(worlds: &[World], goals: &[WorldGoals], report: &GoalReport) -> SpoilerGoals {
    let mut out = vec![];
    for world_goals in goals {
        let world = world_goals.world;
        let categories = world_goals
            .categories()
            .iter()
            .map(|c| SpoilerCategory {
                name: c.name.clone(),
                priority: c.priority,
                weight: c.weight,
                goals: c
                    .goals
                    .iter()
                    .map(|g| SpoilerGoal {
                        name: g.name.clone(),
                        hint_text: g.hint_text.clone(),
                        color: g.color.to_string(),
                        weight: g.weight,
                        items: g.items.clone(),
                        locations: g.locations.clone(),
                        required_locations: g
                            .required_locations
                            .iter()
                            .map(|r| get_spoiler_required(worlds, r))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let mut goal_locations = vec![];
        if let Some(by_category) = report.goal_locations.get(&world) {
            for (category, by_goal) in sorted_hashmap_iter(by_category) {
                for (goal, by_world) in sorted_hashmap_iter(by_goal) {
                    for (&location_world, keys) in sorted_hashmap_iter(by_world) {
                        goal_locations.push(SpoilerGoalLocations {
                            category: category.clone(),
                            goal: goal.clone(),
                            location_world,
                            locations: keys
                                .iter()
                                .map(|&k| SpoilerLocation::new(worlds, k))
                                .collect(),
                        });
                    }
                }
            }
        }

        out.push(SpoilerWorldGoals {
            world,
            categories,
            goal_locations,
            woth_locations: report
                .woth_locations
                .get(world)
                .map(|keys| keys.iter().map(|&k| SpoilerLocation::new(worlds, k)).collect())
                .unwrap_or_default(),
            tracked_location: report
                .tracked_locations
                .get(&world)
                .map(|&k| SpoilerLocation::new(worlds, k)),
        });
    }
    SpoilerGoals { worlds: out }
}
