use crate::schema::{MonthKey, ProjectRecord};
use crate::utils::{first_of_month, next_month, span_months};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One month's share of an allocated amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyShare {
    pub month: MonthKey,
    pub value: Decimal,
}

/// Chronologically ordered monthly shares of a single record.
pub type Allocation = Vec<MonthlyShare>;

/// Splits `amount` evenly across every calendar month touched by `[start, end]`.
///
/// Both dates are normalized to the first of their month, so a project running
/// from the 15th of January to the 10th of March receives three equal shares.
/// Day counts inside the first and last month are ignored.
///
/// Returns an empty allocation when `end` lies in a month before `start`'s month.
pub fn allocate(start: NaiveDate, end: NaiveDate, amount: Decimal) -> Allocation {
    let start_month = first_of_month(start);
    let end_month = first_of_month(end);

    let span = span_months(start_month, end_month);
    if span <= 0 {
        return Vec::new();
    }

    let per_month = amount / Decimal::from(span);

    let mut shares = Vec::with_capacity(span as usize);
    let mut month = MonthKey::from_date(start_month);
    for _ in 0..span {
        shares.push(MonthlyShare {
            month,
            value: per_month,
        });
        month = next_month(month);
    }

    shares
}

pub fn allocate_record(record: &ProjectRecord) -> Allocation {
    let shares = allocate(record.start, record.end, record.amount);
    debug!(
        "Allocated {} for '{}' across {} month(s)",
        record.amount,
        record.project,
        shares.len()
    );
    shares
}

/// True when the record's end month precedes its start month.
pub fn is_degenerate(record: &ProjectRecord) -> bool {
    span_months(record.start, record.end) <= 0
}
