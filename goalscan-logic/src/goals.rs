use std::cmp::min;
use std::str::FromStr;

use anyhow::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, VariantNames};

use goalscan_game::{Capacity, IndexedVec, LocationKey, ScanError, WorldId};

use crate::search::Search;
use crate::state::State;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
pub enum GoalColor {
    White,
    Red,
    Green,
    Blue,
    #[strum(serialize = "Light Blue")]
    #[serde(rename = "Light Blue")]
    LightBlue,
    Pink,
    Yellow,
    Black,
}

fn one() -> Capacity {
    1
}

fn yes() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalItem {
    pub name: String,
    #[serde(default = "one")]
    pub quantity: Capacity,
    #[serde(default = "one")]
    pub minimum: Capacity,
    // False for items with many interchangeable copies (tokens, pieces): a single location
    // holding one of them is never hinted as required.
    #[serde(default = "yes")]
    pub hintable: bool,
}

impl GoalItem {
    pub fn new(name: &str, quantity: Capacity, minimum: Capacity, hintable: bool) -> Self {
        GoalItem {
            name: name.to_string(),
            quantity,
            minimum,
            hintable,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequiredLocation {
    pub location: LocationKey,
    pub weight: u8,
    pub bottleneck_weight: u8,
    pub hintable_worlds: Vec<WorldId>,
}

#[derive(Clone, Debug)]
pub struct Goal {
    pub name: String,
    pub hint_text: String,
    pub color: GoalColor,
    pub items: Vec<GoalItem>,
    pub locations: Vec<String>,
    pub required_locations: Vec<RequiredLocation>,
    pub weight: u8,
    pub category: Option<String>,
    item_isv: IndexedVec<String>,
}

impl Goal {
    pub fn new(
        name: &str,
        hint_text: &str,
        color: &str,
        items: Vec<GoalItem>,
        locations: Vec<String>,
    ) -> Result<Goal> {
        if items.is_empty() && locations.is_empty() {
            bail!(ScanError::EmptyGoal {
                goal: name.to_string(),
            });
        }
        let Ok(color) = GoalColor::from_str(color) else {
            bail!(ScanError::UnsupportedColor {
                goal: name.to_string(),
                color: color.to_string(),
            });
        };
        let mut item_isv = IndexedVec::default();
        for i in &items {
            item_isv.push(i.name.clone());
        }
        Ok(Goal {
            name: name.to_string(),
            hint_text: hint_text.to_string(),
            color,
            items,
            locations,
            required_locations: vec![],
            weight: 0,
            category: None,
            item_isv,
        })
    }

    pub fn get_item(&self, item: &str) -> Result<&GoalItem> {
        match self.item_isv.get(item) {
            Some(idx) => Ok(&self.items[idx]),
            None => bail!(ScanError::UnknownGoalItem {
                goal: self.name.clone(),
                item: item.to_string(),
            }),
        }
    }

    pub fn get_item_mut(&mut self, item: &str) -> Result<&mut GoalItem> {
        match self.item_isv.get(item) {
            Some(idx) => Ok(&mut self.items[idx]),
            None => bail!(ScanError::UnknownGoalItem {
                goal: self.name.clone(),
                item: item.to_string(),
            }),
        }
    }

    // Prevent direct hints for items that can have many duplicates, such as tokens.
    pub fn requires(&self, item: &str) -> bool {
        self.items.iter().any(|i| i.name == item && !i.hintable)
    }
}

#[derive(Clone, Debug)]
pub struct GoalCategory {
    pub name: String,
    pub priority: i32,
    pub goal_count: usize,
    pub minimum_goals: usize,
    pub lock_locations: Vec<String>,
    pub lock_entrances: Vec<String>,
    pub goals: Vec<Goal>,
    pub weight: u8,
    // Added by the analysis itself rather than configured; never scanned.
    pub synthetic: bool,
    goal_isv: IndexedVec<String>,
}

impl GoalCategory {
    pub fn new(name: &str, priority: i32, goal_count: usize, minimum_goals: usize) -> Self {
        GoalCategory {
            name: name.to_string(),
            priority,
            goal_count,
            minimum_goals,
            lock_locations: vec![],
            lock_entrances: vec![],
            goals: vec![],
            weight: 0,
            synthetic: false,
            goal_isv: IndexedVec::default(),
        }
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn with_locks(mut self, lock_locations: Vec<String>, lock_entrances: Vec<String>) -> Self {
        self.lock_locations = lock_locations;
        self.lock_entrances = lock_entrances;
        self
    }

    pub fn is_locked(&self) -> bool {
        !self.lock_entrances.is_empty() || !self.lock_locations.is_empty()
    }

    pub fn add_goal(&mut self, mut goal: Goal) -> Result<()> {
        if self.goal_isv.push(goal.name.clone()).is_none() {
            bail!(ScanError::DuplicateGoal {
                category: self.name.clone(),
                goal: goal.name,
            });
        }
        goal.category = Some(self.name.clone());
        self.goals.push(goal);
        Ok(())
    }

    pub fn get_goal(&self, goal: &str) -> Result<&Goal> {
        match self.goal_isv.get(goal) {
            Some(idx) => Ok(&self.goals[idx]),
            None => bail!(self.unknown_goal(goal)),
        }
    }

    pub fn get_goal_mut(&mut self, goal: &str) -> Result<&mut Goal> {
        match self.goal_isv.get(goal) {
            Some(idx) => Ok(&mut self.goals[idx]),
            None => bail!(self.unknown_goal(goal)),
        }
    }

    fn unknown_goal(&self, goal: &str) -> ScanError {
        ScanError::UnknownGoal {
            category: self.name.clone(),
            goal: goal.to_string(),
        }
    }

    // If the category requirements are already satisfied by starting items, there is nothing
    // to hint for any goal of the category.
    pub fn is_beaten(&self, search: &Search, goals: &[WorldGoals]) -> Result<bool> {
        let starting_goals = search.can_beat_goals(goals, &[self.name.as_str()], false)?;
        let Some(beatable) = starting_goals.category(&self.name) else {
            return Ok(false);
        };
        Ok(search
            .states
            .iter()
            .all(|s| beatable.goals_for_world(s.world).len() >= self.minimum_goals))
    }

    // Lower target quantities to what the fully collected state actually holds, but only when
    // every target still meets its minimum. Keeps hints from citing inflated counts when fewer
    // copies are reachable than configured.
    pub fn update_reachable_goals(&mut self, full_state: &State) {
        for goal in &mut self.goals {
            if goal.items.is_empty() {
                continue;
            }
            if goal.items.iter().all(|i| full_state.has_item_goal(i)) {
                for i in &mut goal.items {
                    let quantity = min(full_state.item_count(&i.name), i.quantity);
                    if quantity != i.quantity {
                        debug!(
                            "[world {}] goal {:?}: lowering {} quantity {} -> {}",
                            full_state.world, goal.name, i.name, i.quantity, quantity
                        );
                    }
                    i.quantity = quantity;
                }
            }
        }
    }
}

/// Applies `GoalCategory::update_reachable_goals` to the named category of every world.
/// The two searches must list the same worlds in the same positions; call once for all worlds,
/// never per world.
pub fn update_reachable_goals(
    goals: &mut [WorldGoals],
    category: &str,
    starting_search: &Search,
    full_search: &Search,
) -> Result<()> {
    if starting_search.states.len() != full_search.states.len() {
        bail!(ScanError::SearchMismatch {
            detail: format!(
                "{} starting states vs {} full states",
                starting_search.states.len(),
                full_search.states.len()
            ),
        });
    }
    for (index, state) in starting_search.states.iter().enumerate() {
        let full_state = &full_search.states[index];
        if full_state.world != state.world {
            bail!(ScanError::SearchMismatch {
                detail: format!(
                    "position {index} holds world {} and world {}",
                    state.world, full_state.world
                ),
            });
        }
        let Some(world_goals) = goals.get_mut(state.world) else {
            bail!(ScanError::UnknownCategory {
                world: state.world,
                category: category.to_string(),
            });
        };
        world_goals
            .category_mut(category)?
            .update_reachable_goals(full_state);
    }
    Ok(())
}

// One world's goal categories, in ascending priority order (stable for equal priorities).
#[derive(Clone, Debug)]
pub struct WorldGoals {
    pub world: WorldId,
    categories: Vec<GoalCategory>,
    category_isv: IndexedVec<String>,
}

impl WorldGoals {
    pub fn new(world: WorldId, categories: Vec<GoalCategory>) -> Result<Self> {
        let mut out = WorldGoals {
            world,
            categories: vec![],
            category_isv: IndexedVec::default(),
        };
        for c in categories {
            out.insert(c)?;
        }
        Ok(out)
    }

    pub fn insert(&mut self, category: GoalCategory) -> Result<()> {
        if self.category_isv.get(&category.name).is_some() {
            bail!(ScanError::DuplicateCategory {
                world: self.world,
                category: category.name,
            });
        }
        let pos = self
            .categories
            .iter()
            .position(|c| c.priority > category.priority)
            .unwrap_or(self.categories.len());
        self.categories.insert(pos, category);
        self.reindex();
        Ok(())
    }

    fn reindex(&mut self) {
        self.category_isv = IndexedVec::default();
        for c in &self.categories {
            self.category_isv.push(c.name.clone());
        }
    }

    // Drops the results of a previous analysis: synthesized categories, required locations
    // and weights. Lowered goal quantities are kept.
    pub fn reset_results(&mut self) {
        self.categories.retain(|c| !c.synthetic);
        self.reindex();
        for c in &mut self.categories {
            c.weight = 0;
            for g in &mut c.goals {
                g.weight = 0;
                g.required_locations.clear();
            }
        }
    }

    pub fn categories(&self) -> &[GoalCategory] {
        &self.categories
    }

    pub fn contains(&self, name: &str) -> bool {
        self.category_isv.get(name).is_some()
    }

    pub fn category(&self, name: &str) -> Result<&GoalCategory> {
        match self.category_isv.get(name) {
            Some(idx) => Ok(&self.categories[idx]),
            None => bail!(ScanError::UnknownCategory {
                world: self.world,
                category: name.to_string(),
            }),
        }
    }

    pub fn category_mut(&mut self, name: &str) -> Result<&mut GoalCategory> {
        match self.category_isv.get(name) {
            Some(idx) => Ok(&mut self.categories[idx]),
            None => bail!(ScanError::UnknownCategory {
                world: self.world,
                category: name.to_string(),
            }),
        }
    }

    pub fn locked_categories(&self) -> impl Iterator<Item = &GoalCategory> {
        self.categories
            .iter()
            .filter(|c| !c.synthetic && c.is_locked())
    }

    pub fn unlocked_categories(&self) -> impl Iterator<Item = &GoalCategory> {
        self.categories
            .iter()
            .filter(|c| !c.synthetic && !c.is_locked())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GoalSpec {
    pub name: String,
    #[serde(default)]
    pub hint_text: String,
    pub color: String,
    #[serde(default)]
    pub items: Vec<GoalItem>,
    #[serde(default)]
    pub locations: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    pub priority: i32,
    #[serde(default)]
    pub goal_count: usize,
    #[serde(default)]
    pub minimum_goals: usize,
    #[serde(default)]
    pub lock_locations: Vec<String>,
    #[serde(default)]
    pub lock_entrances: Vec<String>,
    pub goals: Vec<GoalSpec>,
}

impl CategorySpec {
    pub fn build(&self) -> Result<GoalCategory> {
        let mut category = GoalCategory::new(
            &self.name,
            self.priority,
            self.goal_count,
            self.minimum_goals,
        )
        .with_locks(self.lock_locations.clone(), self.lock_entrances.clone());
        for g in &self.goals {
            category.add_goal(Goal::new(
                &g.name,
                &g.hint_text,
                &g.color,
                g.items.clone(),
                g.locations.clone(),
            )?)?;
        }
        Ok(category)
    }
}
