use anyhow::{Result, bail};
use hashbrown::HashMap;

use goalscan_game::{Capacity, Item, ItemHoldings, ScanError, WorldId};

use crate::goals::GoalItem;

// Items held by one world. Counts only ever grow; hypotheses are explored on copies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    pub world: WorldId,
    prog_items: HashMap<String, Capacity>,
}

impl State {
    pub fn new(world: WorldId) -> Self {
        State {
            world,
            prog_items: HashMap::new(),
        }
    }

    pub fn collect(&mut self, item: &Item) {
        *self.prog_items.entry_ref(item.name.as_str()).or_insert(0) += 1;
    }

    pub fn collect_count(&mut self, name: &str, count: Capacity) -> Result<()> {
        if count <= 0 {
            bail!(ScanError::NonMonotonicCollect {
                world: self.world,
                item: name.to_string(),
                count,
            });
        }
        *self.prog_items.entry_ref(name).or_insert(0) += count;
        Ok(())
    }

    pub fn item_count(&self, name: &str) -> Capacity {
        self.prog_items.get(name).copied().unwrap_or(0)
    }

    pub fn has(&self, name: &str, count: Capacity) -> bool {
        self.item_count(name) >= count
    }

    // Whether the minimum requirement of a goal target is met; used to decide whether a goal
    // quantity can be lowered to what is actually obtainable.
    pub fn has_item_goal(&self, goal_item: &GoalItem) -> bool {
        self.item_count(&goal_item.name) >= goal_item.minimum
    }

    pub fn total_items(&self) -> Capacity {
        self.prog_items.values().sum()
    }

    pub fn iter_items(&self) -> impl Iterator<Item = (&String, &Capacity)> {
        self.prog_items.iter()
    }
}

// All states of a search, indexed by world id, as seen by access rules.
pub struct StateView<'s>(pub &'s [State]);

impl ItemHoldings for StateView<'_> {
    fn item_count(&self, world: WorldId, item: &str) -> Capacity {
        self.0.get(world).map(|s| s.item_count(item)).unwrap_or(0)
    }
}
