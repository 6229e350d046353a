use anyhow::{Result, bail};
use log::debug;

use goalscan_game::{EntranceIdx, LocationKey, ScanError, WorldId};

use crate::goals::GoalCategory;
use crate::search::Search;

// Token for one open lock window: exactly the overrides that `lock_category` added.
#[derive(Debug, PartialEq, Eq)]
pub struct CategoryLocks {
    pub category: String,
    pub entrances: Vec<(WorldId, EntranceIdx)>,
    pub locations: Vec<LocationKey>,
}

/// Makes the category's lock entrances impassable (and its lock locations unreachable) in every
/// world of `search` and of any copy taken from it while the window is open. Only one window may
/// be open at a time.
pub fn lock_category(category: &GoalCategory, search: &mut Search) -> Result<CategoryLocks> {
    if let Some(open) = &search.open_lock {
        bail!(ScanError::LockOverlap {
            open: open.clone(),
            requested: category.name.clone(),
        });
    }
    // Resolve every name before touching the search, so a bad name leaves it unlocked.
    let mut locks = CategoryLocks {
        category: category.name.clone(),
        entrances: vec![],
        locations: vec![],
    };
    for world in search.worlds {
        for name in &category.lock_entrances {
            locks.entrances.push((world.id, world.get_entrance(name)?));
        }
        for name in &category.lock_locations {
            locks.locations.push(world.location_key(world.get_location(name)?));
        }
    }
    for &e in &locks.entrances {
        search.disabled_entrances.insert(e);
    }
    for &l in &locks.locations {
        search.disabled_locations.insert(l);
    }
    search.open_lock = Some(category.name.clone());
    search.reset_regions();
    debug!(
        "Locked {} entrances and {} locations for category {:?}",
        locks.entrances.len(),
        locks.locations.len(),
        category.name
    );
    Ok(locks)
}

pub fn unlock_category(locks: CategoryLocks, search: &mut Search) -> Result<()> {
    if search.open_lock.as_deref() != Some(locks.category.as_str()) {
        bail!(ScanError::LockMismatch {
            category: locks.category,
        });
    }
    for e in &locks.entrances {
        if !search.disabled_entrances.remove(e) {
            bail!(ScanError::LockMismatch {
                category: locks.category,
            });
        }
    }
    for l in &locks.locations {
        if !search.disabled_locations.remove(l) {
            bail!(ScanError::LockMismatch {
                category: locks.category,
            });
        }
    }
    search.open_lock = None;
    search.reset_regions();
    Ok(())
}

/// Runs `f` inside the category's lock window. The window is closed whether or not `f` succeeds;
/// an error from `f` takes precedence over one from unlocking.
pub fn with_category_locks<'a, T>(
    search: &mut Search<'a>,
    category: &GoalCategory,
    f: impl FnOnce(&mut Search<'a>) -> Result<T>,
) -> Result<T> {
    let locks = lock_category(category, search)?;
    let result = f(search);
    let unlocked = unlock_category(locks, search);
    let value = result?;
    unlocked?;
    Ok(value)
}
