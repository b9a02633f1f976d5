//! Milking-group transition workflow.
//!
//! ```text
//! NORMAL ──flag──▶ FLAGGED_FOR_MOVE ──mark moved──▶ MOVED_TO_MILKING
//!   ▲  └──────────────mark moved────────────────────▲
//!   └──undo flag──┘
//! ```
//!
//! `MOVED_TO_MILKING` is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Cow, MilkingGroupState};
use crate::store::RecordStore;

use super::{EngineError, EngineResult};

/// Staff action on a cow's milking-group state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MilkingAction {
    FlagForMove,
    UndoFlag,
    MarkMoved,
}

/// Compute the next state. `now` stamps flag and move times.
pub fn transition(
    state: MilkingGroupState,
    action: MilkingAction,
    now: DateTime<Utc>,
) -> EngineResult<MilkingGroupState> {
    use MilkingGroupState::*;

    match (state, action) {
        (MovedToMilking { .. }, _) => Err(EngineError::Validation(format!(
            "cow already moved to milking; {action:?} not allowed"
        ))),
        (Normal | FlaggedForMove { .. }, MilkingAction::FlagForMove) => {
            Ok(FlaggedForMove { at: now })
        }
        (Normal | FlaggedForMove { .. }, MilkingAction::UndoFlag) => Ok(Normal),
        (Normal | FlaggedForMove { .. }, MilkingAction::MarkMoved) => {
            Ok(MovedToMilking { at: now })
        }
    }
}

/// Workflow bound to a record store.
pub struct MilkingWorkflow<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> MilkingWorkflow<'a, S> {
    /// Create a new workflow handle.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Apply `action` to the cow and persist the new flags.
    pub fn apply(&self, cow_id: &str, action: MilkingAction, now: DateTime<Utc>) -> EngineResult<Cow> {
        let cow = self
            .store
            .get_cow(cow_id)
            .map_err(EngineError::store)?
            .ok_or_else(|| EngineError::NotFound(format!("cow {cow_id}")))?;

        let next = transition(cow.milking, action, now)?;
        let updated = self
            .store
            .update_cow_flags(cow_id, &next)
            .map_err(EngineError::store)?;

        tracing::info!(
            cow_id,
            cow_number = %updated.cow_number,
            from = cow.milking.label(),
            to = next.label(),
            "milking group transition"
        );
        Ok(updated)
    }

    pub fn flag_for_move(&self, cow_id: &str, now: DateTime<Utc>) -> EngineResult<Cow> {
        self.apply(cow_id, MilkingAction::FlagForMove, now)
    }

    pub fn undo_flag(&self, cow_id: &str, now: DateTime<Utc>) -> EngineResult<Cow> {
        self.apply(cow_id, MilkingAction::UndoFlag, now)
    }

    pub fn mark_moved(&self, cow_id: &str, now: DateTime<Utc>) -> EngineResult<Cow> {
        self.apply(cow_id, MilkingAction::MarkMoved, now)
    }
}
