//! Single-open-cycle guard.
//!
//! A cow may not start a new breeding cycle while its current cycle has no
//! PD outcome. The allowed sequence is AI → PD → (delivery) → next AI.
//!
//! [`CycleGuard::open_cycle`] checks and then creates in two steps against
//! the store. Two sessions can both pass the check before either writes; the
//! SQLite store closes that gap by re-checking inside its insert
//! transaction. Other stores only get best-effort enforcement.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{BreedingCycle, NewCycle};
use crate::store::RecordStore;

use super::{current_cycle, EngineError, EngineResult};

/// Outcome of the guard check. Denial is a normal value, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GuardResult {
    Allowed,
    Blocked { blocking_record: BreedingCycle },
}

impl GuardResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardResult::Allowed)
    }

    pub fn blocking_record(&self) -> Option<&BreedingCycle> {
        match self {
            GuardResult::Allowed => None,
            GuardResult::Blocked { blocking_record } => Some(blocking_record),
        }
    }
}

/// Pure guard rule over a cow's existing cycles.
pub fn evaluate_guard(cycles: &[BreedingCycle]) -> GuardResult {
    match current_cycle(cycles) {
        Some(current) if !current.pd_done() => GuardResult::Blocked {
            blocking_record: current.clone(),
        },
        _ => GuardResult::Allowed,
    }
}

/// Reject an AI dated before the cow's current cycle.
///
/// A back-dated AI would become an older, unresolved cycle that the guard
/// never sees, and would break the rule that service numbers grow with AI
/// date. Same-day AIs are accepted.
pub fn check_ai_date(cycles: &[BreedingCycle], ai_date: NaiveDate) -> EngineResult<()> {
    match current_cycle(cycles) {
        Some(current) if ai_date < current.ai_date => Err(EngineError::Validation(format!(
            "AI date {ai_date} is before the current cycle's AI date {} (service {})",
            current.ai_date, current.service_number
        ))),
        _ => Ok(()),
    }
}

/// Result of trying to open a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenCycleOutcome {
    Opened(BreedingCycle),
    Blocked { blocking_record: BreedingCycle },
}

/// Guard bound to a record store.
pub struct CycleGuard<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> CycleGuard<'a, S> {
    /// Create a new guard.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Whether `cow_id` may start a new cycle right now.
    pub fn can_start_new_cycle(&self, cow_id: &str) -> EngineResult<GuardResult> {
        let cycles = self
            .store
            .list_cycles_for_cow(cow_id)
            .map_err(EngineError::store)?;
        let result = evaluate_guard(&cycles);
        if let Some(blocking) = result.blocking_record() {
            tracing::debug!(cow_id, blocking_cycle = %blocking.id, "new cycle blocked");
        }
        Ok(result)
    }

    /// Check the guard, then create the cycle if allowed.
    pub fn open_cycle(&self, new_cycle: &NewCycle) -> EngineResult<OpenCycleOutcome> {
        if self.store.get_cow(&new_cycle.cow_id).map_err(EngineError::store)?.is_none() {
            return Err(EngineError::NotFound(format!("cow {}", new_cycle.cow_id)));
        }

        let cycles = self
            .store
            .list_cycles_for_cow(&new_cycle.cow_id)
            .map_err(EngineError::store)?;
        match evaluate_guard(&cycles) {
            GuardResult::Blocked { blocking_record } => {
                tracing::debug!(
                    cow_id = %new_cycle.cow_id,
                    blocking_cycle = %blocking_record.id,
                    "new cycle blocked"
                );
                Ok(OpenCycleOutcome::Blocked { blocking_record })
            }
            GuardResult::Allowed => {
                check_ai_date(&cycles, new_cycle.ai_date)?;
                let cycle = self
                    .store
                    .create_cycle(new_cycle)
                    .map_err(EngineError::store)?;
                tracing::info!(
                    cow_id = %cycle.cow_id,
                    cycle_id = %cycle.id,
                    service_number = cycle.service_number,
                    "opened breeding cycle"
                );
                Ok(OpenCycleOutcome::Opened(cycle))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PdOutcome, PdResult};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn resolved(mut cycle: BreedingCycle) -> BreedingCycle {
        cycle.pd = Some(PdOutcome {
            result: PdResult::Negative,
            date: cycle.ai_date + chrono::Days::new(60),
        });
        cycle
    }

    #[test]
    fn test_no_cycles_allowed() {
        assert_eq!(evaluate_guard(&[]), GuardResult::Allowed);
    }

    #[test]
    fn test_open_current_cycle_blocks() {
        let first = resolved(NewCycle::new("cow-1", date("2024-01-01")).into_cycle(1));
        let second = NewCycle::new("cow-1", date("2024-03-15")).into_cycle(2);

        let result = evaluate_guard(&[first, second.clone()]);
        assert!(!result.is_allowed());
        assert_eq!(result.blocking_record(), Some(&second));
    }

    #[test]
    fn test_resolved_current_cycle_allows() {
        let first = NewCycle::new("cow-1", date("2024-01-01")).into_cycle(1);
        let second = resolved(NewCycle::new("cow-1", date("2024-03-15")).into_cycle(2));

        // Only the current cycle matters
        assert!(evaluate_guard(&[first, second]).is_allowed());
    }

    #[test]
    fn test_back_dated_ai_rejected() {
        let current = resolved(NewCycle::new("cow-1", date("2024-05-01")).into_cycle(1));
        let cycles = [current];

        assert!(matches!(
            check_ai_date(&cycles, date("2024-01-01")),
            Err(EngineError::Validation(_))
        ));
        assert!(check_ai_date(&cycles, date("2024-05-01")).is_ok());
        assert!(check_ai_date(&cycles, date("2024-07-01")).is_ok());
        assert!(check_ai_date(&[], date("2000-01-01")).is_ok());
    }

    #[test]
    fn test_guard_result_json_shape() {
        let json = serde_json::to_value(GuardResult::Allowed).unwrap();
        assert_eq!(json["result"], "allowed");

        let blocking = NewCycle::new("cow-1", date("2024-01-01")).into_cycle(1);
        let json = serde_json::to_value(GuardResult::Blocked {
            blocking_record: blocking.clone(),
        })
        .unwrap();
        assert_eq!(json["result"], "blocked");
        assert_eq!(json["blocking_record"]["id"], blocking.id.as_str());
    }
}
