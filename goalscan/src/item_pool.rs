use anyhow::{Context, Result, bail};
use hashbrown::{HashMap, HashSet};
use log::debug;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use goalscan_game::ScanError;

use crate::settings::HintSettings;

pub const JUNK_POOL_BASE: [(&str, u32); 10] = [
    ("Bombs (5)", 8),
    ("Bombs (10)", 2),
    ("Arrows (5)", 8),
    ("Arrows (10)", 2),
    ("Deku Stick (1)", 5),
    ("Deku Nuts (5)", 5),
    ("Deku Seeds (30)", 5),
    ("Rupees (5)", 10),
    ("Rupees (20)", 4),
    ("Rupees (50)", 1),
];

pub const ICE_TRAP: &str = "Ice Trap";

// Filler that may be swapped out for a pending item, beyond the weighted base table.
const EXTRA_REMOVABLE_JUNK: [&str; 4] = ["Recovery Heart", "Bombs (20)", "Arrows (30)", ICE_TRAP];

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum JunkIceTraps {
    Off,
    #[default]
    Normal,
    On,
    Mayhem,
    Onslaught,
}

// Weighted junk filler, plus items waiting to displace junk once the pool is assembled.
pub struct JunkPool {
    weighted: Vec<(String, u32)>,
    pending: Vec<String>,
    rng: StdRng,
}

impl JunkPool {
    pub fn new(ice_traps: JunkIceTraps, seed: u64) -> Self {
        let weighted = match ice_traps {
            JunkIceTraps::Mayhem | JunkIceTraps::Onslaught => vec![(ICE_TRAP.to_string(), 1)],
            _ => {
                let mut w: Vec<(String, u32)> = JUNK_POOL_BASE
                    .iter()
                    .map(|&(name, weight)| (name.to_string(), weight))
                    .collect();
                if ice_traps == JunkIceTraps::On {
                    w.push((ICE_TRAP.to_string(), 10));
                }
                w
            }
        };
        JunkPool {
            weighted,
            pending: vec![],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_settings(settings: &HintSettings, seed: u64) -> Self {
        JunkPool::new(settings.junk_ice_traps, seed)
    }

    pub fn weighted(&self) -> &[(String, u32)] {
        &self.weighted
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn add_pending(&mut self, item: &str) {
        self.pending.push(item.to_string());
    }

    /// Draws `count` junk items. Pending items are handed out first, most recently added first.
    pub fn get_junk_item(&mut self, count: usize) -> Result<Vec<String>> {
        let (mut out, remaining) = self.take_pending(count)?;
        let weighted = self.weighted.clone();
        out.extend(self.draw(remaining, &weighted)?);
        Ok(out)
    }

    /// Like `get_junk_item`, but skips junk whose plando count is already met by `pool`.
    pub fn get_junk_item_restricted(
        &mut self,
        count: usize,
        pool: &[String],
        plando_counts: &HashMap<String, usize>,
    ) -> Result<Vec<String>> {
        let (mut out, remaining) = self.take_pending(count)?;
        let allowed: Vec<(String, u32)> = self
            .weighted
            .iter()
            .filter(|(junk, _)| match plando_counts.get(junk) {
                Some(&max) => pool.iter().filter(|i| *i == junk).count() < max,
                None => true,
            })
            .cloned()
            .collect();
        if allowed.is_empty() {
            bail!(ScanError::JunkExhausted {
                item: "removed items".to_string(),
            });
        }
        out.extend(self.draw(remaining, &allowed)?);
        Ok(out)
    }

    fn take_pending(&mut self, count: usize) -> Result<(Vec<String>, usize)> {
        if count < 1 {
            bail!(ScanError::InvalidJunkCount { count });
        }
        let pending_count = count.min(self.pending.len());
        let mut out = Vec::with_capacity(count);
        for _ in 0..pending_count {
            if let Some(item) = self.pending.pop() {
                out.push(item);
            }
        }
        Ok((out, count - pending_count))
    }

    fn draw(&mut self, count: usize, entries: &[(String, u32)]) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(vec![]);
        }
        let dist = WeightedIndex::new(entries.iter().map(|(_, w)| *w))
            .context("invalid junk weights")?;
        Ok((0..count)
            .map(|_| entries[dist.sample(&mut self.rng)].0.clone())
            .collect())
    }

    /// Keeps the first `max` copies of `item` in `pool` and replaces the rest with junk.
    pub fn replace_max_item(&mut self, pool: &mut [String], item: &str, max: usize) -> Result<()> {
        let mut count = 0;
        for i in 0..pool.len() {
            if pool[i] == item {
                if count >= max {
                    let junk = self.get_junk_item(1)?;
                    pool[i] = junk.into_iter().next().context("empty junk draw")?;
                }
                count += 1;
            }
        }
        Ok(())
    }

    /// Swaps every pending item into `pool` in place of a randomly chosen removable junk item.
    pub fn place_pending_junk(&mut self, pool: &mut [String]) -> Result<()> {
        let removable: HashSet<&str> = JUNK_POOL_BASE
            .iter()
            .map(|(name, _)| *name)
            .chain(EXTRA_REMOVABLE_JUNK)
            .collect();
        let mut candidates: Vec<usize> = (0..pool.len())
            .filter(|&i| removable.contains(pool[i].as_str()))
            .collect();
        while let Some(pending_item) = self.pending.pop() {
            if candidates.is_empty() {
                bail!(ScanError::JunkExhausted { item: pending_item });
            }
            let idx = candidates.swap_remove(self.rng.gen_range(0..candidates.len()));
            debug!("Replacing {} with pending {}", pool[idx], pending_item);
            pool[idx] = pending_item;
        }
        Ok(())
    }
}
