use crate::error::{AllocationError, Result};
use crate::schema::MonthKey;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month(key: MonthKey) -> MonthKey {
    if key.month() == 12 {
        MonthKey::from_parts(key.year() + 1, 1)
    } else {
        MonthKey::from_parts(key.year(), key.month() + 1)
    }
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Number of calendar months touched by `[start, end]`, counting both ends.
///
/// Zero or negative when `end` falls in a month before `start`'s month.
pub fn span_months(start: NaiveDate, end: NaiveDate) -> i32 {
    months_between(start, end) + 1
}

/// Every month from `start` through `end`, inclusive. Empty when `end < start`.
pub fn month_range(start: MonthKey, end: MonthKey) -> Vec<MonthKey> {
    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(current);
        current = next_month(current);
    }
    months
}

/// Sums `values`, clamping at `Decimal::MAX`/`Decimal::MIN` instead of panicking.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, value| acc.saturating_add(value))
}

/// Parses a column label in the format "YYYY-MM".
pub fn parse_month_label(label: &str) -> Result<MonthKey> {
    let trimmed = label.trim();
    let (year_str, month_str) = trimmed.split_once('-').ok_or_else(|| {
        AllocationError::DateError(format!(
            "Invalid month label: {}. Expected YYYY-MM",
            label
        ))
    })?;

    if year_str.len() != 4 || month_str.len() != 2 {
        return Err(AllocationError::DateError(format!(
            "Invalid month label: {}. Expected YYYY-MM",
            label
        )));
    }

    let year: i32 = year_str.parse().map_err(|_| {
        AllocationError::DateError(format!("Invalid year in month label: {}", label))
    })?;
    let month: u32 = month_str.parse().map_err(|_| {
        AllocationError::DateError(format!("Invalid month in month label: {}", label))
    })?;

    MonthKey::new(year, month)
}
