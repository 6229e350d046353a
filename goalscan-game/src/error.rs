use thiserror::Error;

use crate::{Capacity, WorldId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    // Bad input: fix the settings, goals, or world definition.
    Configuration,
    // A finite resource (e.g. junk filler) ran out; only upstream configuration can help.
    Exhaustion,
    // Programming error in the caller or in this crate; never retried.
    Invariant,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid goal {goal:?}: no items or locations set")]
    EmptyGoal { goal: String },
    #[error("invalid goal {goal:?}: color {color:?} not supported")]
    UnsupportedColor { goal: String, color: String },
    #[error("no such goal {goal:?} in category {category:?}")]
    UnknownGoal { category: String, goal: String },
    #[error("no such item {item:?} for goal {goal:?}")]
    UnknownGoalItem { goal: String, item: String },
    #[error("duplicate goal {goal:?} in category {category:?}")]
    DuplicateGoal { category: String, goal: String },
    #[error("world {world}: no such goal category {category:?}")]
    UnknownCategory { world: WorldId, category: String },
    #[error("world {world}: duplicate goal category {category:?}")]
    DuplicateCategory { world: WorldId, category: String },
    #[error("world {world}: no such {kind} {name:?}")]
    UnknownName {
        world: WorldId,
        kind: &'static str,
        name: String,
    },
    #[error("world {world}: duplicate {kind} {name:?}")]
    DuplicateName {
        world: WorldId,
        kind: &'static str,
        name: String,
    },
    #[error("world at position {position} has id {id}")]
    WorldIdMismatch { position: usize, id: WorldId },
    #[error("world {world}: starting item {item:?} has count {count}, must be greater than 0")]
    InvalidStartingCount {
        world: WorldId,
        item: String,
        count: Capacity,
    },
    #[error("world {world}: collecting {count} of {item:?} would not grow the state")]
    NonMonotonicCollect {
        world: WorldId,
        item: String,
        count: Capacity,
    },
    #[error("junk item count must be greater than 0, got {count}")]
    InvalidJunkCount { count: usize },
    #[error("not enough junk is available in the item pool to make room for {item:?}")]
    JunkExhausted { item: String },
    #[error("cannot lock category {requested:?} while {open:?} is still locked")]
    LockOverlap { open: String, requested: String },
    #[error("locks for category {category:?} do not match the open lock window")]
    LockMismatch { category: String },
    #[error("searches are not positionally correlated: {detail}")]
    SearchMismatch { detail: String },
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        use ScanError::*;
        match self {
            JunkExhausted { .. } => ErrorKind::Exhaustion,
            LockOverlap { .. }
            | LockMismatch { .. }
            | SearchMismatch { .. }
            | NonMonotonicCollect { .. } => ErrorKind::Invariant,
            _ => ErrorKind::Configuration,
        }
    }
}
