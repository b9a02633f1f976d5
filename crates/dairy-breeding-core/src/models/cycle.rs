//! Breeding cycle models (one record per AI attempt).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A status string that names no known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Outcome of the insemination itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AiStatus {
    /// Insemination performed
    Done,
    /// Scheduled or not yet confirmed
    Pending,
    /// Attempt failed (e.g. cow not in heat, straw issue)
    Failed,
}

/// Pregnancy diagnosis result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PdResult {
    Positive,
    Negative,
    Inconclusive,
}

/// Calf gender recorded at delivery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CalfGender {
    Male,
    Female,
}

/// A recorded pregnancy diagnosis.
///
/// Result and date exist together or not at all, so a cycle with `pd_done`
/// and no result cannot be constructed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PdOutcome {
    pub result: PdResult,
    pub date: NaiveDate,
}

/// A recorded delivery (calving).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delivery {
    pub date: NaiveDate,
    pub calf_gender: Option<CalfGender>,
}

/// One artificial-insemination attempt and everything that follows from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreedingCycle {
    /// Unique cycle ID
    pub id: String,
    /// Owning cow ID
    pub cow_id: String,
    /// 1-based attempt number for this cow
    pub service_number: u32,
    /// Date of insemination (primary key for current-cycle selection)
    pub ai_date: NaiveDate,
    /// Insemination status
    pub ai_status: AiStatus,
    /// Pregnancy diagnosis, once recorded
    pub pd: Option<PdOutcome>,
    /// Explicit expected delivery date (derived from config when absent)
    pub expected_delivery_date: Option<NaiveDate>,
    /// Actual delivery date; presence concludes the cycle
    pub actual_delivery_date: Option<NaiveDate>,
    /// Calf gender (descriptive only)
    pub calf_gender: Option<CalfGender>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl BreedingCycle {
    /// Whether a PD outcome has been recorded.
    pub fn pd_done(&self) -> bool {
        self.pd.is_some()
    }

    pub fn pd_result(&self) -> Option<PdResult> {
        self.pd.map(|pd| pd.result)
    }

    pub fn pd_date(&self) -> Option<NaiveDate> {
        self.pd.map(|pd| pd.date)
    }

    /// Whether the cycle has been concluded by a delivery.
    pub fn is_delivered(&self) -> bool {
        self.actual_delivery_date.is_some()
    }

    /// Apply a patch in place, touching `updated_at`.
    pub fn apply(&mut self, patch: &CyclePatch) {
        match patch {
            CyclePatch::RecordPd(outcome) => self.pd = Some(*outcome),
            CyclePatch::RecordDelivery(delivery) => {
                self.actual_delivery_date = Some(delivery.date);
                self.calf_gender = delivery.calf_gender;
            }
            CyclePatch::SetAiStatus(status) => self.ai_status = *status,
        }
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Data needed to open a new cycle. The store assigns `id` and
/// `service_number`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCycle {
    pub cow_id: String,
    pub ai_date: NaiveDate,
    pub ai_status: AiStatus,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewCycle {
    /// A completed insemination on the given date.
    pub fn new(cow_id: impl Into<String>, ai_date: NaiveDate) -> Self {
        Self {
            cow_id: cow_id.into(),
            ai_date,
            ai_status: AiStatus::Done,
            expected_delivery_date: None,
            notes: None,
        }
    }

    /// Materialise the record with a fresh ID and the given service number.
    pub fn into_cycle(self, service_number: u32) -> BreedingCycle {
        let now = chrono::Utc::now().to_rfc3339();
        BreedingCycle {
            id: uuid::Uuid::new_v4().to_string(),
            cow_id: self.cow_id,
            service_number,
            ai_date: self.ai_date,
            ai_status: self.ai_status,
            pd: None,
            expected_delivery_date: self.expected_delivery_date,
            actual_delivery_date: None,
            calf_gender: None,
            notes: self.notes,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A single validated mutation of an existing cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CyclePatch {
    RecordPd(PdOutcome),
    RecordDelivery(Delivery),
    SetAiStatus(AiStatus),
}

// =========================================================================
// String forms (storage + FFI)
// =========================================================================

impl AiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiStatus::Done => "done",
            AiStatus::Pending => "pending",
            AiStatus::Failed => "failed",
        }
    }
}

impl PdResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdResult::Positive => "positive",
            PdResult::Negative => "negative",
            PdResult::Inconclusive => "inconclusive",
        }
    }
}

impl CalfGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalfGender::Male => "male",
            CalfGender::Female => "female",
        }
    }
}

impl FromStr for AiStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "done" => Ok(AiStatus::Done),
            "pending" => Ok(AiStatus::Pending),
            "failed" => Ok(AiStatus::Failed),
            other => Err(ParseEnumError::new("AI status", other)),
        }
    }
}

impl FromStr for PdResult {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(PdResult::Positive),
            "negative" => Ok(PdResult::Negative),
            "inconclusive" => Ok(PdResult::Inconclusive),
            other => Err(ParseEnumError::new("PD result", other)),
        }
    }
}

impl FromStr for CalfGender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(CalfGender::Male),
            "female" | "f" => Ok(CalfGender::Female),
            other => Err(ParseEnumError::new("calf gender", other)),
        }
    }
}

impl fmt::Display for AiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
