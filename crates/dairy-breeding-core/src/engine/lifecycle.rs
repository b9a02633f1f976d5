//! Validated mutations of an existing cycle.
//!
//! A cycle is written at most twice after creation: once for the PD outcome
//! and once for the delivery. Delivery is only accepted on a positive PD.

use crate::models::{AiStatus, BreedingCycle, CyclePatch, Delivery, PdOutcome, PdResult};
use crate::store::RecordStore;

use super::{EngineError, EngineResult};

/// Validate recording a PD outcome.
pub fn record_pd(cycle: &BreedingCycle, outcome: PdOutcome) -> EngineResult<CyclePatch> {
    if let Some(existing) = cycle.pd {
        return Err(EngineError::Validation(format!(
            "cycle {} already has a PD result ({})",
            cycle.id, existing.result
        )));
    }
    if outcome.date < cycle.ai_date {
        return Err(EngineError::Validation(format!(
            "PD date {} is before AI date {}",
            outcome.date, cycle.ai_date
        )));
    }
    Ok(CyclePatch::RecordPd(outcome))
}

/// Validate recording a delivery.
pub fn record_delivery(cycle: &BreedingCycle, delivery: Delivery) -> EngineResult<CyclePatch> {
    if let Some(date) = cycle.actual_delivery_date {
        return Err(EngineError::Validation(format!(
            "cycle {} already delivered on {}",
            cycle.id, date
        )));
    }
    if cycle.pd_result() != Some(PdResult::Positive) {
        return Err(EngineError::Validation(format!(
            "cycle {} has no positive PD; delivery cannot be recorded",
            cycle.id
        )));
    }
    if delivery.date < cycle.ai_date {
        return Err(EngineError::Validation(format!(
            "delivery date {} is before AI date {}",
            delivery.date, cycle.ai_date
        )));
    }
    Ok(CyclePatch::RecordDelivery(delivery))
}

/// Validate an AI status change. Only allowed before PD is recorded.
pub fn set_ai_status(cycle: &BreedingCycle, status: AiStatus) -> EngineResult<CyclePatch> {
    if cycle.pd_done() {
        return Err(EngineError::Validation(format!(
            "cycle {} already has a PD result; AI status is fixed",
            cycle.id
        )));
    }
    Ok(CyclePatch::SetAiStatus(status))
}

/// Lifecycle operations bound to a record store.
pub struct CycleLifecycle<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> CycleLifecycle<'a, S> {
    /// Create a new lifecycle handle.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn load(&self, cycle_id: &str) -> EngineResult<BreedingCycle> {
        self.store
            .get_cycle(cycle_id)
            .map_err(EngineError::store)?
            .ok_or_else(|| EngineError::NotFound(format!("cycle {cycle_id}")))
    }

    fn apply(&self, cycle_id: &str, patch: CyclePatch) -> EngineResult<BreedingCycle> {
        let updated = self
            .store
            .update_cycle(cycle_id, &patch)
            .map_err(EngineError::store)?;
        tracing::info!(cycle_id, cow_id = %updated.cow_id, ?patch, "updated breeding cycle");
        Ok(updated)
    }

    pub fn record_pd(&self, cycle_id: &str, outcome: PdOutcome) -> EngineResult<BreedingCycle> {
        let cycle = self.load(cycle_id)?;
        let patch = record_pd(&cycle, outcome)?;
        self.apply(cycle_id, patch)
    }

    pub fn record_delivery(&self, cycle_id: &str, delivery: Delivery) -> EngineResult<BreedingCycle> {
        let cycle = self.load(cycle_id)?;
        let patch = record_delivery(&cycle, delivery)?;
        self.apply(cycle_id, patch)
    }

    pub fn set_ai_status(&self, cycle_id: &str, status: AiStatus) -> EngineResult<BreedingCycle> {
        let cycle = self.load(cycle_id)?;
        let patch = set_ai_status(&cycle, status)?;
        self.apply(cycle_id, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalfGender, NewCycle};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn open_cycle() -> BreedingCycle {
        NewCycle::new("cow-1", date("2024-01-01")).into_cycle(1)
    }

    fn positive(date_str: &str) -> PdOutcome {
        PdOutcome {
            result: PdResult::Positive,
            date: date(date_str),
        }
    }

    #[test]
    fn test_record_pd_once() {
        let mut cycle = open_cycle();
        let patch = record_pd(&cycle, positive("2024-03-01")).unwrap();
        cycle.apply(&patch);

        let again = record_pd(&cycle, positive("2024-03-05"));
        assert!(matches!(again, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_record_pd_before_ai_rejected() {
        let result = record_pd(&open_cycle(), positive("2023-12-31"));
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_delivery_requires_positive_pd() {
        let delivery = Delivery {
            date: date("2024-10-10"),
            calf_gender: Some(CalfGender::Male),
        };

        let mut cycle = open_cycle();
        assert!(record_delivery(&cycle, delivery).is_err());

        cycle.pd = Some(PdOutcome {
            result: PdResult::Negative,
            date: date("2024-03-01"),
        });
        assert!(record_delivery(&cycle, delivery).is_err());

        cycle.pd = Some(positive("2024-03-01"));
        let patch = record_delivery(&cycle, delivery).unwrap();
        cycle.apply(&patch);
        assert!(cycle.is_delivered());

        // Only once
        assert!(record_delivery(&cycle, delivery).is_err());
    }

    #[test]
    fn test_ai_status_fixed_after_pd() {
        let mut cycle = open_cycle();
        assert_eq!(
            set_ai_status(&cycle, AiStatus::Failed).unwrap(),
            CyclePatch::SetAiStatus(AiStatus::Failed)
        );

        cycle.pd = Some(positive("2024-03-01"));
        assert!(set_ai_status(&cycle, AiStatus::Failed).is_err());
    }
}
