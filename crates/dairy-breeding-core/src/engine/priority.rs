//! Priority buckets and attention ordering.
//!
//! Buckets, most urgent first (first match wins):
//! 1. `MoveToMilking`  - delivered within 60 days, not yet moved
//! 2. `AboutToDeliver` - PD positive, 0..=35 days to expected delivery
//! 3. `PdOverdue`      - no PD, more than `pd_overdue_days` since AI
//! 4. `PdDue`          - no PD, PD target date reached
//! 5. `FlaggedForMove` - manually flagged, not yet moved
//! 6. `Others`
//!
//! Within a bucket: ascending day count, then `cow_number`, then `cow_id`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AlertConfig, CowSummary, PdResult};

use super::{
    days_to_delivery, days_until_pd, is_about_to_deliver, is_move_to_close_up, is_pd_due,
    is_pd_overdue, move_to_milking_days_left,
};

/// Priority bucket. Declaration order is urgency order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortGroup {
    MoveToMilking,
    AboutToDeliver,
    PdOverdue,
    PdDue,
    FlaggedForMove,
    Others,
}

impl SortGroup {
    pub const ALL: [SortGroup; 6] = [
        SortGroup::MoveToMilking,
        SortGroup::AboutToDeliver,
        SortGroup::PdOverdue,
        SortGroup::PdDue,
        SortGroup::FlaggedForMove,
        SortGroup::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortGroup::MoveToMilking => "MOVE_TO_MILKING",
            SortGroup::AboutToDeliver => "ABOUT_TO_DELIVER",
            SortGroup::PdOverdue => "PD_OVERDUE",
            SortGroup::PdDue => "PD_DUE",
            SortGroup::FlaggedForMove => "FLAGGED_FOR_MOVE",
            SortGroup::Others => "OTHERS",
        }
    }
}

impl fmt::Display for SortGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge flags, independent of which bucket won.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AlertFlags {
    pub pd_due: bool,
    pub pd_overdue: bool,
    pub about_to_deliver: bool,
    pub move_to_close_up: bool,
    pub move_to_milking: bool,
}

/// A summary placed in its bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedCow {
    pub bucket: SortGroup,
    /// Day count the bucket sorts by (`None` for `FlaggedForMove` and `Others`)
    pub sort_days: Option<i64>,
    /// Days to expected delivery while pregnant
    pub days_to_delivery: Option<i64>,
    pub flags: AlertFlags,
    pub summary: CowSummary,
}

/// Classify a single summary.
pub fn classify(summary: &CowSummary, today: NaiveDate, config: &AlertConfig) -> ClassifiedCow {
    // Delivery windows key on the PD result alone. An early calving that
    // has already been moved still shows up until the expected date passes.
    let to_delivery = if summary.pd_result == Some(PdResult::Positive) {
        days_to_delivery(Some(summary.expected_delivery_date), today)
    } else {
        None
    };
    let milking_days_left =
        move_to_milking_days_left(summary.delivered_date, summary.moved_to_milking, today);
    let pd_days = days_until_pd(summary.latest_ai_date, today, config);

    let flags = AlertFlags {
        pd_due: is_pd_due(summary.latest_ai_date, summary.pd_done, today, config),
        pd_overdue: is_pd_overdue(summary.latest_ai_date, summary.pd_done, today, config),
        about_to_deliver: is_about_to_deliver(to_delivery),
        move_to_close_up: is_move_to_close_up(to_delivery),
        move_to_milking: milking_days_left.is_some(),
    };

    let (bucket, sort_days) = if let Some(left) = milking_days_left {
        (SortGroup::MoveToMilking, Some(left))
    } else if flags.about_to_deliver {
        (SortGroup::AboutToDeliver, to_delivery)
    } else if flags.pd_overdue {
        (SortGroup::PdOverdue, Some(pd_days))
    } else if flags.pd_due {
        (SortGroup::PdDue, Some(pd_days))
    } else if summary.needs_milking_move && !summary.moved_to_milking {
        (SortGroup::FlaggedForMove, None)
    } else {
        (SortGroup::Others, None)
    };

    ClassifiedCow {
        bucket,
        sort_days,
        days_to_delivery: to_delivery,
        flags,
        summary: summary.clone(),
    }
}

fn attention_order(a: &ClassifiedCow, b: &ClassifiedCow) -> Ordering {
    a.bucket
        .cmp(&b.bucket)
        .then(a.sort_days.cmp(&b.sort_days))
        .then_with(|| a.summary.cow_number.cmp(&b.summary.cow_number))
        .then_with(|| a.summary.cow_id.cmp(&b.summary.cow_id))
}

/// Classify every summary and return them in attention order.
///
/// The order is total: identical inputs always give identical output.
pub fn classify_and_sort(
    summaries: &[CowSummary],
    today: NaiveDate,
    config: &AlertConfig,
) -> Vec<ClassifiedCow> {
    let mut classified: Vec<ClassifiedCow> = summaries
        .iter()
        .map(|s| classify(s, today, config))
        .collect();
    classified.sort_by(attention_order);

    tracing::debug!(count = classified.len(), %today, "classified herd attention list");
    classified
}

/// Number of cows per bucket. Every bucket is present, possibly with zero.
pub fn bucket_counts(classified: &[ClassifiedCow]) -> BTreeMap<SortGroup, usize> {
    let mut counts: BTreeMap<SortGroup, usize> =
        SortGroup::ALL.iter().map(|g| (*g, 0)).collect();
    for item in classified {
        *counts.entry(item.bucket).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_summaries;
    use crate::models::{BreedingCycle, Cow, MilkingGroupState, NewCycle, PdOutcome};
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn summary_for(cow: &Cow, cycle: BreedingCycle) -> CowSummary {
        build_summaries(&[cycle], std::slice::from_ref(cow), &AlertConfig::default())
            .pop()
            .unwrap()
    }

    fn pregnant_cycle(cow: &Cow, ai: &str, expected: &str) -> BreedingCycle {
        let mut cycle = NewCycle::new(cow.id.clone(), date(ai)).into_cycle(1);
        cycle.pd = Some(PdOutcome {
            result: PdResult::Positive,
            date: date(ai) + chrono::Days::new(60),
        });
        cycle.expected_delivery_date = Some(date(expected));
        cycle
    }

    #[test]
    fn test_about_to_deliver_boundaries() {
        let cfg = AlertConfig::default();
        let cow = Cow::new("1");
        let s = summary_for(&cow, pregnant_cycle(&cow, "2023-07-01", "2024-04-05"));

        let at_35 = classify(&s, date("2024-03-01"), &cfg);
        assert_eq!(at_35.bucket, SortGroup::AboutToDeliver);
        assert_eq!(at_35.sort_days, Some(35));
        assert!(at_35.flags.move_to_close_up);

        let at_36 = classify(&s, date("2024-02-29"), &cfg);
        assert_eq!(at_36.bucket, SortGroup::Others);
        assert!(!at_36.flags.about_to_deliver);

        let at_0 = classify(&s, date("2024-04-05"), &cfg);
        assert_eq!(at_0.bucket, SortGroup::AboutToDeliver);
        assert!(!at_0.flags.move_to_close_up);

        let past_due = classify(&s, date("2024-04-06"), &cfg);
        assert_eq!(past_due.days_to_delivery, Some(-1));
        assert_eq!(past_due.bucket, SortGroup::Others);
    }

    #[test]
    fn test_move_to_milking_beats_flag() {
        let cfg = AlertConfig::default();
        let mut cow = Cow::new("1");
        cow.milking = MilkingGroupState::FlaggedForMove { at: Utc::now() };
        let mut cycle = pregnant_cycle(&cow, "2023-06-01", "2024-03-10");
        cycle.actual_delivery_date = Some(date("2024-03-08"));

        let c = classify(&summary_for(&cow, cycle), date("2024-03-20"), &cfg);
        assert_eq!(c.bucket, SortGroup::MoveToMilking);
        assert_eq!(c.sort_days, Some(48));
        assert!(c.flags.move_to_milking);
        assert_eq!(c.days_to_delivery, Some(-10));
    }

    #[test]
    fn test_early_calving_still_about_to_deliver() {
        let cfg = AlertConfig::default();
        let mut cow = Cow::new("1");
        cow.milking = MilkingGroupState::MovedToMilking { at: Utc::now() };
        let mut cycle = pregnant_cycle(&cow, "2023-07-01", "2024-04-10");
        cycle.actual_delivery_date = Some(date("2024-03-20"));

        let c = classify(&summary_for(&cow, cycle), date("2024-03-25"), &cfg);
        assert_eq!(c.summary.status, crate::models::CycleStatus::Delivered);
        assert_eq!(c.days_to_delivery, Some(16));
        assert!(c.flags.about_to_deliver);
        assert!(!c.flags.move_to_milking);
        assert_eq!(c.bucket, SortGroup::AboutToDeliver);
        assert_eq!(c.sort_days, Some(16));
    }

    #[test]
    fn test_pd_due_then_overdue() {
        let cfg = AlertConfig::default();
        let cow = Cow::new("1");
        let cycle = NewCycle::new(cow.id.clone(), date("2024-01-01")).into_cycle(1);
        let s = summary_for(&cow, cycle);

        assert_eq!(classify(&s, date("2024-02-29"), &cfg).bucket, SortGroup::Others);

        let due = classify(&s, date("2024-03-01"), &cfg);
        assert_eq!(due.bucket, SortGroup::PdDue);
        assert_eq!(due.sort_days, Some(0));

        let overdue = classify(&s, date("2024-03-02"), &cfg);
        assert_eq!(overdue.bucket, SortGroup::PdOverdue);
        assert_eq!(overdue.sort_days, Some(-1));
        assert!(overdue.flags.pd_due);
    }

    #[test]
    fn test_sort_within_bucket() {
        let cfg = AlertConfig::default();
        let today = date("2024-03-01");
        let cows = [Cow::new("20"), Cow::new("3"), Cow::new("100")];
        let cycles = vec![
            NewCycle::new(cows[0].id.clone(), date("2023-12-01")).into_cycle(1),
            NewCycle::new(cows[1].id.clone(), date("2023-12-20")).into_cycle(1),
            NewCycle::new(cows[2].id.clone(), date("2023-12-01")).into_cycle(1),
        ];
        let summaries = build_summaries(&cycles, &cows, &cfg);
        let sorted = classify_and_sort(&summaries, today, &cfg);

        assert!(sorted.iter().all(|c| c.bucket == SortGroup::PdOverdue));
        let order: Vec<&str> = sorted.iter().map(|c| c.summary.cow_number.as_str()).collect();
        // Most overdue first; equal day counts fall back to lexical cow number
        assert_eq!(order, vec!["100", "20", "3"]);
    }

    #[test]
    fn test_bucket_counts() {
        let cfg = AlertConfig::default();
        let cow = Cow::new("1");
        let s = summary_for(&cow, NewCycle::new(cow.id.clone(), date("2024-01-01")).into_cycle(1));
        let list = classify_and_sort(&[s], date("2024-01-02"), &cfg);

        let counts = bucket_counts(&list);
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[&SortGroup::Others], 1);
        assert_eq!(counts[&SortGroup::PdDue], 0);
    }

    #[test]
    fn test_sort_group_order_and_labels() {
        assert!(SortGroup::MoveToMilking < SortGroup::AboutToDeliver);
        assert!(SortGroup::FlaggedForMove < SortGroup::Others);
        assert_eq!(SortGroup::PdOverdue.to_string(), "PD_OVERDUE");
        assert_eq!(
            serde_json::to_string(&SortGroup::FlaggedForMove).unwrap(),
            "\"FLAGGED_FOR_MOVE\""
        );
    }
}
