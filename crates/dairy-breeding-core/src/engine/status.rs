//! Lifecycle status derivation.

use crate::models::{AiStatus, BreedingCycle, CycleStatus, PdResult};

/// Derive the status of a cycle. First match wins:
///
/// 1. delivery recorded → `Delivered`
/// 2. PD positive → `Pregnant`
/// 3. PD negative → `NotPregnant`
/// 4. AI failed → `Failed`
/// 5. otherwise → `Pending`
///
/// An inconclusive PD is treated like no PD at all and lands on `Pending`
/// (or `Failed` when the AI itself failed), since the cow still needs a
/// conclusive check.
pub fn derive_status(cycle: &BreedingCycle) -> CycleStatus {
    if cycle.actual_delivery_date.is_some() {
        return CycleStatus::Delivered;
    }
    match cycle.pd_result() {
        Some(PdResult::Positive) => CycleStatus::Pregnant,
        Some(PdResult::Negative) => CycleStatus::NotPregnant,
        Some(PdResult::Inconclusive) | None => match cycle.ai_status {
            AiStatus::Failed => CycleStatus::Failed,
            AiStatus::Done | AiStatus::Pending => CycleStatus::Pending,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCycle, PdOutcome};
    use chrono::NaiveDate;

    fn cycle() -> BreedingCycle {
        NewCycle::new("cow-1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).into_cycle(1)
    }

    fn pd(result: PdResult) -> Option<PdOutcome> {
        Some(PdOutcome {
            result,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        })
    }

    #[test]
    fn test_fresh_cycle_is_pending() {
        assert_eq!(derive_status(&cycle()), CycleStatus::Pending);
    }

    #[test]
    fn test_delivery_takes_precedence() {
        let mut c = cycle();
        c.pd = pd(PdResult::Negative);
        c.ai_status = AiStatus::Failed;
        c.actual_delivery_date = NaiveDate::from_ymd_opt(2024, 10, 10);
        assert_eq!(derive_status(&c), CycleStatus::Delivered);
    }

    #[test]
    fn test_pd_results() {
        let mut c = cycle();
        c.pd = pd(PdResult::Positive);
        assert_eq!(derive_status(&c), CycleStatus::Pregnant);

        c.pd = pd(PdResult::Negative);
        c.ai_status = AiStatus::Failed;
        assert_eq!(derive_status(&c), CycleStatus::NotPregnant);
    }

    #[test]
    fn test_failed_ai() {
        let mut c = cycle();
        c.ai_status = AiStatus::Failed;
        assert_eq!(derive_status(&c), CycleStatus::Failed);
    }

    #[test]
    fn test_inconclusive_falls_through() {
        let mut c = cycle();
        c.pd = pd(PdResult::Inconclusive);
        assert_eq!(derive_status(&c), CycleStatus::Pending);

        c.ai_status = AiStatus::Failed;
        assert_eq!(derive_status(&c), CycleStatus::Failed);
    }
}
