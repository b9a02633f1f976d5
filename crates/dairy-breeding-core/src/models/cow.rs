//! Cow models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a cow stands in the move to the milking group.
///
/// `MovedToMilking` is terminal: no action leads back to `Normal`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MilkingGroupState {
    #[default]
    Normal,
    FlaggedForMove { at: DateTime<Utc> },
    MovedToMilking { at: DateTime<Utc> },
}

/// A cow record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cow {
    /// Local UUID
    pub id: String,
    /// Herd number shown to staff; also the final sort tie-break
    pub cow_number: String,
    /// Milking-group transition state
    pub milking: MilkingGroupState,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Cow {
    /// Create a new cow with no milking-group flags set.
    pub fn new(cow_number: impl Into<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cow_number: cow_number.into(),
            milking: MilkingGroupState::Normal,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn needs_milking_move(&self) -> bool {
        matches!(self.milking, MilkingGroupState::FlaggedForMove { .. })
    }

    pub fn needs_milking_move_at(&self) -> Option<DateTime<Utc>> {
        match self.milking {
            MilkingGroupState::FlaggedForMove { at } => Some(at),
            _ => None,
        }
    }

    pub fn moved_to_milking(&self) -> bool {
        matches!(self.milking, MilkingGroupState::MovedToMilking { .. })
    }

    pub fn moved_to_milking_at(&self) -> Option<DateTime<Utc>> {
        match self.milking {
            MilkingGroupState::MovedToMilking { at } => Some(at),
            _ => None,
        }
    }
}

impl MilkingGroupState {
    /// Short label used in exports and over FFI.
    pub fn label(&self) -> &'static str {
        match self {
            MilkingGroupState::Normal => "normal",
            MilkingGroupState::FlaggedForMove { .. } => "flagged_for_move",
            MilkingGroupState::MovedToMilking { .. } => "moved_to_milking",
        }
    }

    /// Rebuild the state from the four persisted flag columns.
    ///
    /// `moved_to_milking` wins over a stale `needs_milking_move`. A set flag
    /// without a timestamp falls back to `fallback_at`.
    pub fn from_flags(
        needs_milking_move: bool,
        needs_milking_move_at: Option<DateTime<Utc>>,
        moved_to_milking: bool,
        moved_to_milking_at: Option<DateTime<Utc>>,
        fallback_at: DateTime<Utc>,
    ) -> Self {
        if moved_to_milking {
            MilkingGroupState::MovedToMilking {
                at: moved_to_milking_at.unwrap_or(fallback_at),
            }
        } else if needs_milking_move {
            MilkingGroupState::FlaggedForMove {
                at: needs_milking_move_at.unwrap_or(fallback_at),
            }
        } else {
            MilkingGroupState::Normal
        }
    }
}
