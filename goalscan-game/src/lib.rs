// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod error;
pub mod util;

use std::borrow::Borrow;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;
use std::sync::Arc;

use anyhow::{Result, bail};
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, VariantNames};

pub use crate::error::{ErrorKind, ScanError};

pub type WorldId = usize;
pub type RegionIdx = usize;
pub type EntranceIdx = usize;
pub type LocationIdx = usize;
pub type Capacity = i32;

pub const DEFAULT_ROOT_REGION: &str = "Root";
pub const DEFAULT_WIN_ITEM: &str = "Triforce";

// Build-once map from name to position. Lookups that miss are reported by the caller
// as a typed `ScanError::UnknownName`.
#[derive(Default, Clone, Debug)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq + Clone> IndexedVec<T> {
    /// Appends `key`, returning its index, or `None` if it is already present.
    pub fn push(&mut self, key: T) -> Option<usize> {
        if self.index_by_key.contains_key(&key) {
            return None;
        }
        let idx = self.keys.len();
        self.index_by_key.insert(key.clone(), idx);
        self.keys.push(key);
        Some(idx)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index_by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// Read access to the collected items of every world, as seen by access rules.
pub trait ItemHoldings {
    fn item_count(&self, world: WorldId, item: &str) -> Capacity;

    fn has(&self, world: WorldId, item: &str, count: Capacity) -> bool {
        self.item_count(world, item) >= count
    }
}

pub type RuleFn = dyn Fn(WorldId, &dyn ItemHoldings) -> bool + Send + Sync;

// Opaque access predicate, supplied by whoever builds the world graph.
#[derive(Clone)]
pub struct Rule(pub Arc<RuleFn>);

impl Debug for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Rule(..)")
    }
}

fn one() -> Capacity {
    1
}

#[derive(Clone, Debug, Default, Deserialize)]
pub enum Requirement {
    #[default]
    Free,
    Never,
    Item {
        item: String,
        #[serde(default = "one")]
        count: Capacity,
    },
    // Inter-world logic: an item held by another world's state.
    WorldItem {
        world: WorldId,
        item: String,
        #[serde(default = "one")]
        count: Capacity,
    },
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
    #[serde(skip)]
    Custom(Rule),
}

impl Requirement {
    pub fn item(name: &str) -> Requirement {
        Requirement::Item {
            item: name.to_string(),
            count: 1,
        }
    }

    pub fn items(name: &str, count: Capacity) -> Requirement {
        Requirement::Item {
            item: name.to_string(),
            count,
        }
    }

    pub fn custom<F>(f: F) -> Requirement
    where
        F: Fn(WorldId, &dyn ItemHoldings) -> bool + Send + Sync + 'static,
    {
        Requirement::Custom(Rule(Arc::new(f)))
    }

    /// Evaluates the requirement for `world`, with every world's holdings visible.
    pub fn is_satisfied(&self, world: WorldId, holdings: &dyn ItemHoldings) -> bool {
        match self {
            Requirement::Free => true,
            Requirement::Never => false,
            Requirement::Item { item, count } => holdings.has(world, item, *count),
            Requirement::WorldItem {
                world: other,
                item,
                count,
            } => holdings.has(*other, item, *count),
            Requirement::And(reqs) => reqs.iter().all(|r| r.is_satisfied(world, holdings)),
            Requirement::Or(reqs) => reqs.iter().any(|r| r.is_satisfied(world, holdings)),
            Requirement::Custom(rule) => (rule.0)(world, holdings),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub world: WorldId, // World whose state receives the item when collected.
    pub major: bool,
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
)]
pub enum LocationKind {
    Chest,
    Shop,
    Song,
    Drop,
    Scrub,
    Collectable,
    Event,
    #[default]
    Other,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey {
    pub world: WorldId,
    pub idx: LocationIdx,
}

#[derive(Clone, Debug)]
pub struct Location {
    pub name: String,
    pub world: WorldId,
    pub region: RegionIdx,
    pub kind: LocationKind,
    pub dungeon: Option<String>,
    pub item: Option<Item>,
    pub locked: bool,
    // Item is already held when play begins (e.g. a reward handed out before the first check).
    pub pseudo_starting: bool,
    pub requirement: Requirement,
}

#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub exits: Vec<EntranceIdx>,
    pub locations: Vec<LocationIdx>,
}

#[derive(Clone, Debug)]
pub struct Entrance {
    pub name: String,
    pub from: RegionIdx,
    pub to: RegionIdx,
    pub requirement: Requirement,
}

#[derive(Clone, Debug)]
pub struct World {
    pub id: WorldId,
    pub root_region: RegionIdx,
    pub region_isv: IndexedVec<String>,
    pub regions: Vec<Region>,
    pub entrance_isv: IndexedVec<String>,
    pub entrances: Vec<Entrance>,
    pub location_isv: IndexedVec<String>,
    pub locations: Vec<Location>,
    pub starting_items: Vec<(String, Capacity)>,
    pub hint_exclusions: HashSet<String>,
    pub win_condition: Requirement,
}

impl World {
    pub fn get_region(&self, name: &str) -> Result<RegionIdx> {
        self.lookup(&self.region_isv, "region", name)
    }

    pub fn get_entrance(&self, name: &str) -> Result<EntranceIdx> {
        self.lookup(&self.entrance_isv, "entrance", name)
    }

    pub fn get_location(&self, name: &str) -> Result<LocationIdx> {
        self.lookup(&self.location_isv, "location", name)
    }

    fn lookup(&self, isv: &IndexedVec<String>, kind: &'static str, name: &str) -> Result<usize> {
        match isv.get(name) {
            Some(idx) => Ok(idx),
            None => bail!(ScanError::UnknownName {
                world: self.id,
                kind,
                name: name.to_string(),
            }),
        }
    }

    pub fn location_key(&self, idx: LocationIdx) -> LocationKey {
        LocationKey {
            world: self.id,
            idx,
        }
    }

    pub fn filled_locations(&self) -> impl Iterator<Item = (LocationIdx, &Location)> {
        self.locations
            .iter()
            .enumerate()
            .filter(|(_, loc)| loc.item.is_some())
    }

    pub fn from_spec(id: WorldId, spec: &WorldSpec) -> Result<World> {
        let mut builder = WorldBuilder::new(id, &spec.root_region);
        for name in &spec.regions {
            if name != &spec.root_region {
                builder.region(name)?;
            }
        }
        for e in &spec.entrances {
            builder.entrance(&e.name, &e.from, &e.to, e.requirement.clone())?;
        }
        for l in &spec.locations {
            let item = l.item.as_ref().map(|i| Item {
                name: i.name.clone(),
                world: i.world.unwrap_or(id),
                major: i.major,
            });
            let loc = builder.location(&l.name, &l.region, item, l.requirement.clone())?;
            loc.kind = l.kind;
            loc.dungeon = l.dungeon.clone();
            loc.locked = l.locked;
            loc.pseudo_starting = l.pseudo_starting;
        }
        for s in &spec.starting_items {
            builder.starting_item(&s.name, s.count)?;
        }
        for name in &spec.hint_exclusions {
            builder.hint_exclusion(name);
        }
        if let Some(req) = &spec.win_condition {
            builder.win_condition(req.clone());
        }
        Ok(builder.build())
    }
}

pub struct WorldBuilder {
    world: World,
}

impl WorldBuilder {
    pub fn new(id: WorldId, root_region: &str) -> Self {
        let mut region_isv = IndexedVec::default();
        region_isv.push(root_region.to_string());
        WorldBuilder {
            world: World {
                id,
                root_region: 0,
                region_isv,
                regions: vec![Region {
                    name: root_region.to_string(),
                    exits: vec![],
                    locations: vec![],
                }],
                entrance_isv: IndexedVec::default(),
                entrances: vec![],
                location_isv: IndexedVec::default(),
                locations: vec![],
                starting_items: vec![],
                hint_exclusions: HashSet::new(),
                win_condition: Requirement::item(DEFAULT_WIN_ITEM),
            },
        }
    }

    fn duplicate(&self, kind: &'static str, name: &str) -> ScanError {
        ScanError::DuplicateName {
            world: self.world.id,
            kind,
            name: name.to_string(),
        }
    }

    pub fn region(&mut self, name: &str) -> Result<RegionIdx> {
        let Some(idx) = self.world.region_isv.push(name.to_string()) else {
            bail!(self.duplicate("region", name));
        };
        self.world.regions.push(Region {
            name: name.to_string(),
            exits: vec![],
            locations: vec![],
        });
        Ok(idx)
    }

    pub fn entrance(
        &mut self,
        name: &str,
        from: &str,
        to: &str,
        requirement: Requirement,
    ) -> Result<EntranceIdx> {
        let from_idx = self.world.get_region(from)?;
        let to_idx = self.world.get_region(to)?;
        let Some(idx) = self.world.entrance_isv.push(name.to_string()) else {
            bail!(self.duplicate("entrance", name));
        };
        self.world.entrances.push(Entrance {
            name: name.to_string(),
            from: from_idx,
            to: to_idx,
            requirement,
        });
        self.world.regions[from_idx].exits.push(idx);
        Ok(idx)
    }

    pub fn location(
        &mut self,
        name: &str,
        region: &str,
        item: Option<Item>,
        requirement: Requirement,
    ) -> Result<&mut Location> {
        let region_idx = self.world.get_region(region)?;
        let Some(idx) = self.world.location_isv.push(name.to_string()) else {
            bail!(self.duplicate("location", name));
        };
        self.world.locations.push(Location {
            name: name.to_string(),
            world: self.world.id,
            region: region_idx,
            kind: LocationKind::default(),
            dungeon: None,
            item,
            locked: false,
            pseudo_starting: false,
            requirement,
        });
        self.world.regions[region_idx].locations.push(idx);
        Ok(&mut self.world.locations[idx])
    }

    pub fn starting_item(&mut self, name: &str, count: Capacity) -> Result<&mut Self> {
        if count <= 0 {
            bail!(ScanError::InvalidStartingCount {
                world: self.world.id,
                item: name.to_string(),
                count,
            });
        }
        self.world.starting_items.push((name.to_string(), count));
        Ok(self)
    }

    pub fn hint_exclusion(&mut self, name: &str) -> &mut Self {
        self.world.hint_exclusions.insert(name.to_string());
        self
    }

    pub fn win_condition(&mut self, requirement: Requirement) -> &mut Self {
        self.world.win_condition = requirement;
        self
    }

    pub fn build(self) -> World {
        self.world
    }
}

fn default_root_region() -> String {
    DEFAULT_ROOT_REGION.to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    #[serde(default)]
    pub world: Option<WorldId>,
    #[serde(default)]
    pub major: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EntranceSpec {
    pub name: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub requirement: Requirement,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LocationSpec {
    pub name: String,
    #[serde(default = "default_root_region")]
    pub region: String,
    #[serde(default)]
    pub kind: LocationKind,
    #[serde(default)]
    pub dungeon: Option<String>,
    #[serde(default)]
    pub item: Option<ItemSpec>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub pseudo_starting: bool,
    #[serde(default)]
    pub requirement: Requirement,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StartingItemSpec {
    pub name: String,
    #[serde(default = "one")]
    pub count: Capacity,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldSpec {
    #[serde(default = "default_root_region")]
    pub root_region: String,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub entrances: Vec<EntranceSpec>,
    #[serde(default)]
    pub locations: Vec<LocationSpec>,
    #[serde(default)]
    pub starting_items: Vec<StartingItemSpec>,
    #[serde(default)]
    pub hint_exclusions: Vec<String>,
    #[serde(default)]
    pub win_condition: Option<Requirement>,
}
