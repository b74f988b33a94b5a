//! Pure recurrence arithmetic: which calendar dates a rule produces inside a horizon.
//! Storage concerns live in `services::materializer`.

use chrono::{Datelike, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HORIZON_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// Structured override stored next to the frequency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrequencyData {
    /// Every `interval` days / weeks / months.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}

impl FrequencyData {
    pub fn interval(&self) -> u32 {
        self.interval.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Dates from `max(start_date, today)` through `today + horizon_days` (or `end_date` if
/// earlier), inclusive, in ascending order.
pub fn occurrence_dates(rule: &RecurrenceRule, today: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    let interval = rule.interval.max(1);
    let mut cursor = rule.start_date.max(today);
    let anchor_day = cursor.day();

    let mut horizon = match today.checked_add_signed(TimeDelta::days(i64::from(horizon_days))) {
        Some(date) => date,
        None => return Vec::new(),
    };
    if let Some(end_date) = rule.end_date {
        horizon = horizon.min(end_date);
    }

    let mut dates = Vec::new();
    while cursor <= horizon {
        dates.push(cursor);
        cursor = match advance(rule.frequency, interval, cursor, anchor_day) {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

fn advance(frequency: Frequency, interval: u32, cursor: NaiveDate, anchor_day: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => cursor.checked_add_signed(TimeDelta::days(i64::from(interval))),
        Frequency::Weekly => cursor.checked_add_signed(TimeDelta::weeks(i64::from(interval))),
        Frequency::Monthly => add_months_clamped(cursor, interval, anchor_day),
    }
}

/// Same day-of-month `months` months later; a day that does not exist in the target month
/// becomes that month's last day.
pub fn add_months_clamped(date: NaiveDate, months: u32, anchor_day: u32) -> Option<NaiveDate> {
    let (year, month) = shift_month(date.year(), date.month(), months)?;
    let last_day = last_day_of_month(year, month)?;
    if anchor_day <= last_day.day() {
        NaiveDate::from_ymd_opt(year, month, anchor_day)
    } else {
        Some(last_day)
    }
}

/// First day of the following month, minus one day.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = shift_month(year, month, 1)?;
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn shift_month(year: i32, month: u32, months: u32) -> Option<(i32, u32)> {
    let zero_based = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(months);
    let year = i32::try_from(zero_based.div_euclid(12)).ok()?;
    let month = u32::try_from(zero_based.rem_euclid(12) + 1).ok()?;
    Some((year, month))
}
