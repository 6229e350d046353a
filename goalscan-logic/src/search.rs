use std::collections::VecDeque;

use anyhow::{Result, bail};
use hashbrown::{HashMap, HashSet};

use goalscan_game::{
    EntranceIdx, Item, Location, LocationKey, RegionIdx, ScanError, World, WorldId,
};

use crate::goals::{Goal, WorldGoals};
use crate::state::{State, StateView};

// World ids for which each goal of a category is currently beatable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryBeatable {
    pub goals: HashMap<String, Vec<WorldId>>,
    pub by_world: HashMap<WorldId, Vec<String>>,
}

impl CategoryBeatable {
    pub fn worlds(&self, goal: &str) -> &[WorldId] {
        self.goals.get(goal).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn goals_for_world(&self, world: WorldId) -> &[String] {
        self.by_world.get(&world).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn any_beatable(&self) -> bool {
        self.goals.values().any(|w| !w.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BeatableGoals {
    pub categories: HashMap<String, CategoryBeatable>,
    // Every world's win condition holds.
    pub game_beatable: bool,
}

impl BeatableGoals {
    pub fn category(&self, name: &str) -> Option<&CategoryBeatable> {
        self.categories.get(name)
    }

    pub fn worlds(&self, category: &str, goal: &str) -> &[WorldId] {
        self.categories
            .get(category)
            .map(|c| c.worlds(goal))
            .unwrap_or(&[])
    }
}

// Reachability search over all worlds at once. The world graph is borrowed and shared by every
// copy; only the accumulated state (items, visited locations, region cache, overrides) is owned.
#[derive(Clone, Debug)]
pub struct Search<'a> {
    pub worlds: &'a [World],
    pub states: Vec<State>,
    pub(crate) visited: HashSet<LocationKey>,
    pub(crate) withheld: HashSet<LocationKey>,
    pub(crate) disabled_entrances: HashSet<(WorldId, EntranceIdx)>,
    pub(crate) disabled_locations: HashSet<LocationKey>,
    pub(crate) open_lock: Option<String>,
    reachable_regions: Vec<Vec<bool>>,
}

impl<'a> Search<'a> {
    pub fn new(worlds: &'a [World]) -> Result<Self> {
        for (position, world) in worlds.iter().enumerate() {
            if world.id != position {
                bail!(ScanError::WorldIdMismatch {
                    position,
                    id: world.id,
                });
            }
            for (_, loc) in world.filled_locations() {
                if let Some(item) = &loc.item {
                    if item.world >= worlds.len() {
                        bail!(ScanError::UnknownName {
                            world: world.id,
                            kind: "item world",
                            name: format!("{} ({})", item.world, loc.name),
                        });
                    }
                }
            }
        }
        let mut search = Search {
            worlds,
            states: worlds.iter().map(|w| State::new(w.id)).collect(),
            visited: HashSet::new(),
            withheld: HashSet::new(),
            disabled_entrances: HashSet::new(),
            disabled_locations: HashSet::new(),
            open_lock: None,
            reachable_regions: vec![],
        };
        search.reset_regions();
        Ok(search)
    }

    // Independent snapshot: mutating the copy never affects `self`.
    pub fn copy(&self) -> Search<'a> {
        self.clone()
    }

    pub fn world_ids(&self) -> Vec<WorldId> {
        self.states.iter().map(|s| s.world).collect()
    }

    pub fn location(&self, key: LocationKey) -> &'a Location {
        let worlds: &'a [World] = self.worlds;
        &worlds[key.world].locations[key.idx]
    }

    /// The item a location yields in this search; `None` if empty or withheld.
    pub fn item_at(&self, key: LocationKey) -> Option<&'a Item> {
        if self.withheld.contains(&key) {
            return None;
        }
        self.location(key).item.as_ref()
    }

    // Treat the location as empty for the rest of this search's life. Used on copies to ask
    // "what if this item were not here".
    pub fn withhold(&mut self, key: LocationKey) {
        self.withheld.insert(key);
    }

    pub fn is_visited(&self, key: LocationKey) -> bool {
        self.visited.contains(&key)
    }

    pub fn collect(&mut self, item: &Item) {
        self.states[item.world].collect(item);
    }

    pub fn collect_location(&mut self, key: LocationKey) {
        if let Some(item) = self.item_at(key) {
            self.collect(item);
        }
    }

    pub fn collect_pseudo_starting_items(&mut self) -> Result<()> {
        let worlds = self.worlds;
        for world in worlds {
            for (name, count) in &world.starting_items {
                self.states[world.id].collect_count(name, *count)?;
            }
            for (idx, loc) in world.locations.iter().enumerate() {
                if loc.pseudo_starting {
                    let key = world.location_key(idx);
                    self.visited.insert(key);
                    self.collect_location(key);
                }
            }
        }
        Ok(())
    }

    /// Every filled location, world-major then by location index.
    pub fn filled_locations(&self) -> Vec<LocationKey> {
        self.worlds
            .iter()
            .flat_map(|w| w.filled_locations().map(|(idx, _)| w.location_key(idx)))
            .collect()
    }

    pub fn collect_locations(&mut self) {
        let mut walk = ReachableWalk::new(self.filled_locations());
        while let Some(key) = walk.next(self) {
            self.collect_location(key);
        }
    }

    pub(crate) fn reset_regions(&mut self) {
        self.reachable_regions = self
            .worlds
            .iter()
            .map(|w| {
                let mut r = vec![false; w.regions.len()];
                r[w.root_region] = true;
                r
            })
            .collect();
        self.update_regions();
    }

    pub fn update_regions(&mut self) {
        let mut regions = std::mem::take(&mut self.reachable_regions);
        self.expand_regions(&mut regions);
        self.reachable_regions = regions;
    }

    // Regions only ever become reachable, so expansion starts from the cached set.
    fn expand_regions(&self, regions: &mut [Vec<bool>]) {
        let view = StateView(&self.states);
        let mut modified: HashSet<(WorldId, RegionIdx)> = HashSet::new();
        for (w, r) in regions.iter().enumerate() {
            for (idx, &reachable) in r.iter().enumerate() {
                if reachable {
                    modified.insert((w, idx));
                }
            }
        }
        while !modified.is_empty() {
            let mut new_modified: HashSet<(WorldId, RegionIdx)> = HashSet::new();
            // Process in sorted order, to make the traversal deterministic.
            let mut modified_vec: Vec<(WorldId, RegionIdx)> = modified.into_iter().collect();
            modified_vec.sort();
            for (w, src) in modified_vec {
                let world = &self.worlds[w];
                for &exit in &world.regions[src].exits {
                    let entrance = &world.entrances[exit];
                    if regions[w][entrance.to] || self.disabled_entrances.contains(&(w, exit)) {
                        continue;
                    }
                    if entrance.requirement.is_satisfied(w, &view) {
                        regions[w][entrance.to] = true;
                        new_modified.insert((w, entrance.to));
                    }
                }
            }
            modified = new_modified;
        }
    }

    // Region reachability for the current states, without touching the cache.
    pub fn current_regions(&self) -> Vec<Vec<bool>> {
        let mut regions = self.reachable_regions.clone();
        self.expand_regions(&mut regions);
        regions
    }

    fn is_reachable_in(&self, regions: &[Vec<bool>], key: LocationKey) -> bool {
        let loc = self.location(key);
        regions[key.world][loc.region]
            && !self.disabled_locations.contains(&key)
            && loc
                .requirement
                .is_satisfied(key.world, &StateView(&self.states))
    }

    pub fn can_reach_location(&mut self, key: LocationKey) -> bool {
        self.update_regions();
        self.is_reachable_in(&self.reachable_regions, key)
    }

    pub fn can_beat_game(&self) -> bool {
        let view = StateView(&self.states);
        self.worlds
            .iter()
            .all(|w| w.win_condition.is_satisfied(w.id, &view))
    }

    /// Which goals of the named categories are beatable, per world. With `scan_for_items`, a copy
    /// of this search is first collected to a fixpoint; `self` is never modified.
    pub fn can_beat_goals(
        &self,
        goals: &[WorldGoals],
        categories: &[&str],
        scan_for_items: bool,
    ) -> Result<BeatableGoals> {
        if scan_for_items {
            let mut search = self.copy();
            search.collect_locations();
            search.test_category_goals(goals, categories)
        } else {
            self.test_category_goals(goals, categories)
        }
    }

    fn test_category_goals(
        &self,
        goals: &[WorldGoals],
        categories: &[&str],
    ) -> Result<BeatableGoals> {
        if goals.len() != self.states.len() {
            bail!(ScanError::SearchMismatch {
                detail: format!(
                    "{} goal tables for {} world states",
                    goals.len(),
                    self.states.len()
                ),
            });
        }
        for (position, g) in goals.iter().enumerate() {
            if g.world != position {
                bail!(ScanError::WorldIdMismatch {
                    position,
                    id: g.world,
                });
            }
        }
        let regions = self.current_regions();
        let mut out = BeatableGoals {
            categories: HashMap::new(),
            game_beatable: self.can_beat_game(),
        };
        for &name in categories {
            let reference = goals[0].category(name)?;
            let mut beatable = CategoryBeatable::default();
            for state in &self.states {
                beatable.by_world.insert(state.world, vec![]);
            }
            for reference_goal in &reference.goals {
                let mut worlds: Vec<WorldId> = vec![];
                for state in &self.states {
                    let goal = goals[state.world]
                        .category(name)?
                        .get_goal(&reference_goal.name)?;
                    if self.is_goal_satisfied(goal, state, &regions)? {
                        worlds.push(state.world);
                        beatable
                            .by_world
                            .entry(state.world)
                            .or_default()
                            .push(goal.name.clone());
                    }
                }
                beatable.goals.insert(reference_goal.name.clone(), worlds);
            }
            out.categories.insert(name.to_string(), beatable);
        }
        Ok(out)
    }

    fn is_goal_satisfied(&self, goal: &Goal, state: &State, regions: &[Vec<bool>]) -> Result<bool> {
        if !goal.items.iter().all(|i| state.has(&i.name, i.quantity)) {
            return Ok(false);
        }
        let world = &self.worlds[state.world];
        for name in &goal.locations {
            let key = world.location_key(world.get_location(name)?);
            if !self.is_reachable_in(regions, key) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// Lazy cursor over the reachable subset of a candidate list. Each pass takes every unvisited,
// reachable candidate in candidate order; a location is marked visited when it is yielded, so the
// caller can collect items between calls and later passes will see them. The walk ends once a pass
// finds nothing. It holds no borrow of the search, which stays free for the caller to mutate.
pub struct ReachableWalk {
    candidates: Vec<LocationKey>,
    pending: VecDeque<LocationKey>,
}

impl ReachableWalk {
    pub fn new(candidates: Vec<LocationKey>) -> Self {
        ReachableWalk {
            candidates,
            pending: VecDeque::new(),
        }
    }

    pub fn next(&mut self, search: &mut Search) -> Option<LocationKey> {
        loop {
            while let Some(key) = self.pending.pop_front() {
                if search.visited.insert(key) {
                    return Some(key);
                }
            }
            search.update_regions();
            let regions = &search.reachable_regions;
            self.pending = self
                .candidates
                .iter()
                .copied()
                .filter(|&key| !search.visited.contains(&key) && search.is_reachable_in(regions, key))
                .collect();
            if self.pending.is_empty() {
                return None;
            }
        }
    }
}
