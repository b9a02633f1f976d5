//! Reduce all cycles to one current-cycle summary per cow.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{AlertConfig, BreedingCycle, Cow, CowSummary};

use super::{delivery_due_date, derive_status};

/// Ordering used to pick the current cycle: latest `ai_date`, then highest
/// `service_number`, then greatest `id`.
fn recency(a: &BreedingCycle, b: &BreedingCycle) -> Ordering {
    a.ai_date
        .cmp(&b.ai_date)
        .then(a.service_number.cmp(&b.service_number))
        .then_with(|| a.id.cmp(&b.id))
}

/// The current cycle among a cow's cycles, or `None` if there are none.
pub fn current_cycle<'a, I>(cycles: I) -> Option<&'a BreedingCycle>
where
    I: IntoIterator<Item = &'a BreedingCycle>,
{
    cycles.into_iter().max_by(|a, b| recency(a, b))
}

/// Next service number for a cow that already has `existing` cycles.
pub fn next_service_number(existing: &[BreedingCycle]) -> u32 {
    existing.len() as u32 + 1
}

/// Build a summary from a cow's current cycle.
pub fn summarize(cycle: &BreedingCycle, cow: &Cow, config: &AlertConfig) -> CowSummary {
    CowSummary {
        cow_id: cow.id.clone(),
        cow_number: cow.cow_number.clone(),
        latest_ai_date: cycle.ai_date,
        service_number: cycle.service_number,
        status: derive_status(cycle),
        pd_done: cycle.pd_done(),
        pd_result: cycle.pd_result(),
        pd_date: cycle.pd_date(),
        expected_delivery_date: delivery_due_date(cycle, config),
        delivered_date: cycle.actual_delivery_date,
        needs_milking_move: cow.needs_milking_move(),
        moved_to_milking: cow.moved_to_milking(),
        cycle: cycle.clone(),
    }
}

/// One summary per cow that has at least one cycle.
///
/// Output order is unspecified; use [`super::classify_and_sort`] to order it.
/// Cycles that reference a cow missing from `cows` are skipped.
pub fn build_summaries(
    cycles: &[BreedingCycle],
    cows: &[Cow],
    config: &AlertConfig,
) -> Vec<CowSummary> {
    let cows_by_id: HashMap<&str, &Cow> = cows.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut current: HashMap<&str, &BreedingCycle> = HashMap::new();
    for cycle in cycles {
        current
            .entry(cycle.cow_id.as_str())
            .and_modify(|best| {
                if recency(cycle, *best) == Ordering::Greater {
                    *best = cycle;
                }
            })
            .or_insert(cycle);
    }

    let summaries: Vec<CowSummary> = current
        .into_iter()
        .filter_map(|(cow_id, cycle)| match cows_by_id.get(cow_id) {
            Some(cow) => Some(summarize(cycle, cow, config)),
            None => {
                tracing::warn!(cow_id, cycle_id = %cycle.id, "skipping cycle for unknown cow");
                None
            }
        })
        .collect();

    tracing::debug!(
        cycles = cycles.len(),
        cows = cows.len(),
        summaries = summaries.len(),
        "built cow summaries"
    );
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CycleStatus, MilkingGroupState, NewCycle, PdOutcome, PdResult};
    use chrono::{NaiveDate, Utc};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn cycle(cow: &Cow, ai: &str, service: u32) -> BreedingCycle {
        NewCycle::new(cow.id.clone(), date(ai)).into_cycle(service)
    }

    #[test]
    fn test_current_cycle_is_latest_ai_date() {
        let cow = Cow::new("1");
        let cycles = vec![
            cycle(&cow, "2024-01-01", 1),
            cycle(&cow, "2024-05-01", 3),
            cycle(&cow, "2024-03-01", 2),
        ];
        assert_eq!(current_cycle(&cycles).unwrap().service_number, 3);
        assert!(current_cycle(&Vec::<BreedingCycle>::new()).is_none());
    }

    #[test]
    fn test_equal_ai_date_prefers_higher_service_number() {
        let cow = Cow::new("1");
        let cycles = vec![cycle(&cow, "2024-05-01", 2), cycle(&cow, "2024-05-01", 1)];
        assert_eq!(current_cycle(&cycles).unwrap().service_number, 2);

        let reversed: Vec<_> = cycles.iter().rev().cloned().collect();
        assert_eq!(current_cycle(&reversed).unwrap().service_number, 2);
    }

    #[test]
    fn test_next_service_number() {
        let cow = Cow::new("1");
        assert_eq!(next_service_number(&[]), 1);
        assert_eq!(
            next_service_number(&[cycle(&cow, "2024-01-01", 1), cycle(&cow, "2024-02-01", 2)]),
            3
        );
    }

    #[test]
    fn test_build_summaries_one_per_cow() {
        let mut cow_a = Cow::new("A");
        cow_a.milking = MilkingGroupState::FlaggedForMove { at: Utc::now() };
        let cow_b = Cow::new("B");
        let cow_without_cycles = Cow::new("C");

        let mut old = cycle(&cow_a, "2023-06-01", 1);
        old.pd = Some(PdOutcome {
            result: PdResult::Negative,
            date: date("2023-08-01"),
        });
        let cycles = vec![
            old,
            cycle(&cow_a, "2023-09-01", 2),
            cycle(&cow_b, "2024-01-15", 1),
        ];

        let cfg = AlertConfig::default();
        let summaries = build_summaries(
            &cycles,
            &[cow_a.clone(), cow_b.clone(), cow_without_cycles.clone()],
            &cfg,
        );
        assert_eq!(summaries.len(), 2);

        let a = summaries.iter().find(|s| s.cow_id == cow_a.id).unwrap();
        assert_eq!(a.service_number, 2);
        assert_eq!(a.latest_ai_date, date("2023-09-01"));
        assert_eq!(a.status, CycleStatus::Pending);
        assert!(!a.pd_done);
        assert!(a.needs_milking_move);
        assert_eq!(a.expected_delivery_date, date("2024-06-10"));

        assert!(summaries.iter().all(|s| s.cow_id != cow_without_cycles.id));
    }

    #[test]
    fn test_orphan_cycles_skipped() {
        let ghost = Cow::new("ghost");
        let cycles = vec![cycle(&ghost, "2024-01-01", 1)];
        let summaries = build_summaries(&cycles, &[], &AlertConfig::default());
        assert!(summaries.is_empty());
    }
}
