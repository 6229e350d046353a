// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod goals;
pub mod locks;
pub mod search;
pub mod state;

pub use goals::{
    CategorySpec, Goal, GoalCategory, GoalColor, GoalItem, GoalSpec, RequiredLocation, WorldGoals,
    update_reachable_goals,
};
pub use locks::{CategoryLocks, lock_category, unlock_category, with_category_locks};
pub use search::{BeatableGoals, CategoryBeatable, ReachableWalk, Search};
pub use state::{State, StateView};
