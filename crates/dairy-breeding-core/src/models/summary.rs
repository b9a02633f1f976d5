//! Derived per-cow views. Never persisted.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cycle::{BreedingCycle, PdResult};

/// Lifecycle status derived from a single breeding cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Delivered,
    Pregnant,
    NotPregnant,
    Failed,
    Pending,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Delivered => "delivered",
            CycleStatus::Pregnant => "pregnant",
            CycleStatus::NotPregnant => "not_pregnant",
            CycleStatus::Failed => "failed",
            CycleStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cow's current breeding cycle joined with its milking-group flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CowSummary {
    pub cow_id: String,
    pub cow_number: String,
    /// AI date of the current cycle
    pub latest_ai_date: NaiveDate,
    pub service_number: u32,
    pub status: CycleStatus,
    pub pd_done: bool,
    pub pd_result: Option<PdResult>,
    pub pd_date: Option<NaiveDate>,
    /// Explicit expected date, or AI date plus gestation length
    pub expected_delivery_date: NaiveDate,
    pub delivered_date: Option<NaiveDate>,
    pub needs_milking_move: bool,
    pub moved_to_milking: bool,
    /// The current cycle this summary was built from
    pub cycle: BreedingCycle,
}
