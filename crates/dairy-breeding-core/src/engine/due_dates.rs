//! PD and delivery due-date arithmetic.
//!
//! Every function takes `today` as an argument. Date addition saturates at
//! `NaiveDate::MAX`, so all of these are total over valid dates.

use std::ops::RangeInclusive;

use chrono::{DateTime, Days, NaiveDate};

use crate::models::{AlertConfig, BreedingCycle};

use super::{EngineError, EngineResult};

/// Days to delivery for the "about to deliver" badge and bucket.
pub const ABOUT_TO_DELIVER_WINDOW: RangeInclusive<i64> = 0..=35;

/// Days to delivery during which a pregnant cow should go to the close-up pen.
pub const MOVE_TO_CLOSE_UP_WINDOW: RangeInclusive<i64> = 28..=35;

/// Days after delivery during which an unmoved cow should join the milking group.
pub const MOVE_TO_MILKING_WINDOW_DAYS: i64 = 60;

/// Parse a calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(input: &str) -> EngineResult<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .map_err(|_| EngineError::Validation(format!("invalid date: {input:?}")))
}

/// Parse an optional date; empty strings count as absent.
pub fn parse_optional_date(input: Option<&str>) -> EngineResult<Option<NaiveDate>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some),
    }
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Date on which PD becomes due.
pub fn pd_target_date(ai_date: NaiveDate, config: &AlertConfig) -> NaiveDate {
    add_days(ai_date, config.pd_alert_days)
}

/// Days from `today` until the PD target; negative once it has passed.
pub fn days_until_pd(ai_date: NaiveDate, today: NaiveDate, config: &AlertConfig) -> i64 {
    (pd_target_date(ai_date, config) - today).num_days()
}

/// PD is due from the target date onwards until a result is recorded.
pub fn is_pd_due(ai_date: NaiveDate, pd_done: bool, today: NaiveDate, config: &AlertConfig) -> bool {
    !pd_done && today >= pd_target_date(ai_date, config)
}

/// PD is overdue once more than `pd_overdue_days` have passed since AI.
pub fn is_pd_overdue(
    ai_date: NaiveDate,
    pd_done: bool,
    today: NaiveDate,
    config: &AlertConfig,
) -> bool {
    !pd_done && (today - ai_date).num_days() > i64::from(config.pd_overdue_days)
}

/// Expected delivery: the explicit date if recorded, else AI date plus gestation.
pub fn delivery_due_date(cycle: &BreedingCycle, config: &AlertConfig) -> NaiveDate {
    cycle
        .expected_delivery_date
        .unwrap_or_else(|| add_days(cycle.ai_date, config.delivery_expected_days))
}

/// Whole days from `today` to the expected date.
pub fn days_to_delivery(expected: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    expected.map(|date| (date - today).num_days())
}

pub fn is_about_to_deliver(days_to_delivery: Option<i64>) -> bool {
    days_to_delivery.is_some_and(|d| ABOUT_TO_DELIVER_WINDOW.contains(&d))
}

pub fn is_move_to_close_up(days_to_delivery: Option<i64>) -> bool {
    days_to_delivery.is_some_and(|d| MOVE_TO_CLOSE_UP_WINDOW.contains(&d))
}

/// Days left to move a delivered cow into the milking group.
///
/// `None` when the cow has not delivered, was already moved, or the
/// delivery date lies outside `[today - 60, today]`.
pub fn move_to_milking_days_left(
    delivered: Option<NaiveDate>,
    moved_to_milking: bool,
    today: NaiveDate,
) -> Option<i64> {
    if moved_to_milking {
        return None;
    }
    let since = (today - delivered?).num_days();
    (0..=MOVE_TO_MILKING_WINDOW_DAYS)
        .contains(&since)
        .then_some(MOVE_TO_MILKING_WINDOW_DAYS - since)
}
