use anyhow::{Result, bail};
use hashbrown::{HashMap, HashSet};
use log::{debug, info};
use serde::Serialize;

use goalscan_game::{Item, Location, LocationKey, ScanError, World, WorldId};
use goalscan_logic::{
    BeatableGoals, Goal, GoalCategory, GoalItem, ReachableWalk, RequiredLocation, Search,
    WorldGoals, update_reachable_goals, with_category_locks,
};

use crate::settings::HintSettings;

// category -> goal -> necessity records, across all worlds, in walk order.
pub type RequiredByCategory = HashMap<String, HashMap<String, Vec<RequiredLocation>>>;

// goal world -> category -> goal -> location world -> locations.
pub type GoalLocations =
    HashMap<WorldId, HashMap<String, HashMap<String, HashMap<WorldId, Vec<LocationKey>>>>>;

#[derive(Clone, Debug, Default, Serialize)]
pub struct GoalReport {
    pub required_locations: RequiredByCategory,
    pub goal_locations: GoalLocations,
    // Way-of-the-hero locations, indexed by the world holding them.
    pub woth_locations: Vec<Vec<LocationKey>>,
    // First candidate location of the tracked item, keyed by the item's world.
    pub tracked_locations: HashMap<WorldId, LocationKey>,
}

impl GoalReport {
    pub fn has_required_locations(&self) -> bool {
        self.required_locations
            .values()
            .any(|goals| goals.values().any(|records| !records.is_empty()))
    }
}

// Accumulated results of all category passes of one analysis.
struct GoalScan<'s> {
    settings: &'s HintSettings,
    item_locations: HashSet<LocationKey>,
    // Location name -> category that claimed it first.
    priority_locations: HashMap<String, String>,
    required: RequiredByCategory,
    woth: Vec<LocationKey>,
    tracked: HashMap<WorldId, LocationKey>,
}

impl<'s> GoalScan<'s> {
    fn new(worlds: &[World], settings: &'s HintSettings) -> Self {
        let mut item_locations = HashSet::new();
        for world in worlds {
            for (idx, loc) in world.filled_locations() {
                let Some(item) = &loc.item else {
                    continue;
                };
                if item.major && !loc.locked && !settings.is_excluded_goal_item(&item.name) {
                    item_locations.insert(world.location_key(idx));
                }
            }
        }
        GoalScan {
            settings,
            item_locations,
            priority_locations: HashMap::new(),
            required: HashMap::new(),
            woth: vec![],
            tracked: HashMap::new(),
        }
    }

    fn is_hint_excluded(&self, worlds: &[World], location: &Location) -> bool {
        self.settings.is_always_hinted(&location.name)
            || worlds[location.world]
                .hint_exclusions
                .contains(&location.name)
    }

    fn maybe_track(&mut self, key: LocationKey, item: &Item) {
        if self.settings.playthrough || item.name != self.settings.tracked_item {
            return;
        }
        if !self.tracked.contains_key(&item.world) {
            self.tracked.insert(item.world, key);
            debug!("{} [{}] set to {:?}", item.name, item.world, key);
        }
    }

    // Walks every filled location reachable from `search`, testing each candidate for
    // necessity by withholding it on a copy. Collects into `search` as it goes.
    fn search_goals(
        &mut self,
        categories: &[String],
        reachable_goals: &BeatableGoals,
        search: &mut Search,
        goals: &mut [WorldGoals],
        search_woth: bool,
    ) -> Result<()> {
        let worlds = search.worlds;
        let world_ids = search.world_ids();
        let category_names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
        let mut walk = ReachableWalk::new(search.filled_locations());
        while let Some(key) = walk.next(search) {
            if self.item_locations.contains(&key) {
                if let Some(item) = search.item_at(key) {
                    let location = search.location(key);
                    let mut removed = search.copy();
                    removed.withhold(key);
                    removed.collect_locations();
                    let valid_goals = removed.can_beat_goals(goals, &category_names, false)?;
                    for name in categories {
                        let Some(reachable) = reachable_goals.category(name) else {
                            continue;
                        };
                        // Nothing in this category is beatable even with every item.
                        if !reachable.any_beatable() {
                            continue;
                        }
                        let goal_names: Vec<String> = goals[0]
                            .category(name)?
                            .goals
                            .iter()
                            .map(|g| g.name.clone())
                            .collect();
                        for goal_name in &goal_names {
                            let reachable_worlds = reachable.worlds(goal_name);
                            if reachable_worlds.is_empty() {
                                continue;
                            }
                            if goals[0].category(name)?.get_goal(goal_name)?.requires(&item.name) {
                                continue;
                            }
                            if let Some(owner) = self.priority_locations.get(&location.name) {
                                if owner != name {
                                    continue;
                                }
                            }
                            let valid_worlds = valid_goals.worlds(name, goal_name);
                            let hintable_worlds: Vec<WorldId> = world_ids
                                .iter()
                                .copied()
                                .filter(|w| !valid_worlds.contains(w) && reachable_worlds.contains(w))
                                .collect();
                            if hintable_worlds.is_empty() {
                                continue;
                            }
                            let weight = if self.is_hint_excluded(worlds, location) {
                                0
                            } else {
                                1
                            };
                            debug!(
                                "[world {}] {} ({}) required for {} {:?}, worlds {:?}",
                                key.world, location.name, item.name, name, goal_name, hintable_worlds
                            );
                            self.required
                                .entry_ref(name.as_str())
                                .or_default()
                                .entry_ref(goal_name.as_str())
                                .or_default()
                                .push(RequiredLocation {
                                    location: key,
                                    weight,
                                    bottleneck_weight: weight,
                                    hintable_worlds,
                                });
                            for world_goals in goals.iter_mut() {
                                let category = world_goals.category_mut(name)?;
                                category.weight = 1;
                                category.get_goal_mut(goal_name)?.weight = 1;
                            }
                            // Categories are visited in priority order, so the first claim wins.
                            self.priority_locations
                                .insert(location.name.clone(), name.clone());
                        }
                    }
                    if search_woth && !valid_goals.game_beatable {
                        self.woth.push(key);
                    }
                    self.maybe_track(key, item);
                }
            }
            search.collect_location(key);
        }
        Ok(())
    }

    fn finish(self, worlds: &[World], goals: &mut [WorldGoals]) -> Result<GoalReport> {
        let woth_locations: Vec<Vec<LocationKey>> = worlds
            .iter()
            .map(|w| self.woth.iter().copied().filter(|k| k.world == w.id).collect())
            .collect();
        let mut report = GoalReport {
            required_locations: self.required,
            goal_locations: HashMap::new(),
            woth_locations,
            tracked_locations: self.tracked,
        };

        let default_goal = &self.settings.default_goal;
        if !report.has_required_locations()
            && !goals.iter().any(|g| g.contains(&default_goal.category))
            && self.settings.use_default_goals
        {
            info!(
                "No goal has required locations; falling back to {:?}",
                default_goal.goal
            );
            for world_goals in goals.iter_mut() {
                let world = world_goals.world;
                let locations = &report.woth_locations[world];
                let mut category =
                    GoalCategory::new(&default_goal.category, default_goal.priority, 1, 1)
                        .synthetic();
                let mut goal = Goal::new(
                    &default_goal.goal,
                    &default_goal.hint_text,
                    &default_goal.color,
                    vec![GoalItem::new(&default_goal.item, 1, 1, true)],
                    vec![],
                )?;
                goal.required_locations = locations
                    .iter()
                    .map(|&location| RequiredLocation {
                        location,
                        weight: 1,
                        bottleneck_weight: 1,
                        hintable_worlds: vec![world],
                    })
                    .collect();
                category.add_goal(goal)?;
                world_goals.insert(category)?;
                report
                    .goal_locations
                    .entry(world)
                    .or_default()
                    .entry(default_goal.category.clone())
                    .or_default()
                    .entry(default_goal.goal.clone())
                    .or_default()
                    .insert(world, locations.clone());
            }
            return Ok(report);
        }

        for world_goals in goals.iter_mut() {
            let world = world_goals.world;
            let names: Vec<String> = world_goals
                .categories()
                .iter()
                .map(|c| c.name.clone())
                .collect();
            for name in names {
                let Some(found) = report.required_locations.get(&name) else {
                    continue;
                };
                let category = world_goals.category_mut(&name)?;
                for goal in &mut category.goals {
                    let Some(records) = found.get(&goal.name) else {
                        continue;
                    };
                    goal.required_locations = records
                        .iter()
                        .filter(|r| r.location.world == world)
                        .cloned()
                        .collect();
                    for r in &goal.required_locations {
                        for &goal_world in &r.hintable_worlds {
                            report
                                .goal_locations
                                .entry(goal_world)
                                .or_default()
                                .entry(name.clone())
                                .or_default()
                                .entry(goal.name.clone())
                                .or_default()
                                .entry(world)
                                .or_default()
                                .push(r.location);
                        }
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Determines, for every goal of every world, which item locations are necessary to reach it.
///
/// Locked categories of world 0 are scanned one at a time inside their lock window; all unlocked
/// categories are then scanned together, which also builds the way-of-the-hero list. Goal tables
/// are updated in place (quantities, weights, required locations); results of an earlier run,
/// including a synthesized default goal, are replaced.
pub fn update_goal_items(
    worlds: &[World],
    goals: &mut [WorldGoals],
    settings: &HintSettings,
) -> Result<GoalReport> {
    if goals.len() != worlds.len() {
        bail!(ScanError::SearchMismatch {
            detail: format!("{} goal tables for {} worlds", goals.len(), worlds.len()),
        });
    }
    if worlds.is_empty() {
        return Ok(GoalReport::default());
    }
    for world_goals in goals.iter_mut() {
        world_goals.reset_results();
    }
    let mut scan = GoalScan::new(worlds, settings);
    info!(
        "Scanning {} candidate locations across {} worlds",
        scan.item_locations.len(),
        worlds.len()
    );

    let locked: Vec<GoalCategory> = goals[0].locked_categories().cloned().collect();
    for category in &locked {
        let mut search = Search::new(worlds)?;
        search.collect_pseudo_starting_items()?;
        with_category_locks(&mut search, category, |search| {
            if category.is_beaten(search, goals)? {
                info!("Category {:?} already beaten, skipping", category.name);
                return Ok(());
            }
            info!("Scanning locked category {:?}", category.name);
            let mut full_search = search.copy();
            full_search.collect_locations();
            update_reachable_goals(goals, &category.name, search, &full_search)?;
            let reachable_goals =
                full_search.can_beat_goals(goals, &[category.name.as_str()], false)?;
            scan.search_goals(
                std::slice::from_ref(&category.name),
                &reachable_goals,
                search,
                goals,
                false,
            )
        })?;
    }

    let unlocked: Vec<String> = goals[0]
        .unlocked_categories()
        .map(|c| c.name.clone())
        .collect();
    info!("Scanning {} unlocked categories", unlocked.len());
    let mut search = Search::new(worlds)?;
    search.collect_pseudo_starting_items()?;
    let mut full_search = search.copy();
    full_search.collect_locations();
    for name in &unlocked {
        update_reachable_goals(goals, name, &search, &full_search)?;
    }
    let unlocked_names: Vec<&str> = unlocked.iter().map(|c| c.as_str()).collect();
    let reachable_goals = full_search.can_beat_goals(goals, &unlocked_names, false)?;
    scan.search_goals(&unlocked, &reachable_goals, &mut search, goals, true)?;

    let report = scan.finish(worlds, goals)?;
    info!(
        "Found required locations for {} categories, {} way-of-the-hero locations",
        report.required_locations.len(),
        report.woth_locations.iter().map(|l| l.len()).sum::<usize>()
    );
    Ok(report)
}
