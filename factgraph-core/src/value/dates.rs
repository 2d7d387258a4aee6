//! Civil-date helpers for the `Day` value type and the date operators.

use crate::error::ValueError;
use chrono::{Datelike, NaiveDate};

/// Parses the canonical `YYYY-MM-DD` form.
///
/// # Errors
/// Returns [`ValueError::MalformedDate`] for any other shape or an
/// impossible calendar day.
pub fn parse(value: &str) -> Result<NaiveDate, ValueError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValueError::MalformedDate {
        value: value.to_string(),
    })
}

/// Renders the canonical `YYYY-MM-DD` form.
pub fn format(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The number of days in `date`'s month.
pub fn days_in_month(date: NaiveDate) -> u32 {
    last_day_of_month(date).day()
}

/// The final day of `date`'s month.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = next_month(date.year(), date.month());
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Shifts a date by whole months under the payroll rule: a date that falls
/// on the last day of its month stays anchored to the last day of the
/// target month; otherwise the day-of-month carries over, clamped to the
/// target month's length.
pub fn add_payroll_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let total = i64::from(date.year()) * 12 + i64::from(date.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    let target_first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let target_len = days_in_month(target_first);
    let day = if date.day() == days_in_month(date) {
        target_len
    } else {
        date.day().min(target_len)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
