// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod analyze;
pub mod item_pool;
pub mod scenario;
pub mod settings;
pub mod spoiler;

pub use analyze::{GoalReport, update_goal_items};
pub use settings::{HintSettings, parse_hint_settings};
