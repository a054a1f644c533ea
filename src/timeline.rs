use crate::schema::ProjectRecord;
use crate::utils::span_months;
use chrono::NaiveDate;
use serde::Serialize;

/// One bar of the Gantt view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub project: String,
    pub phase: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Calendar months the bar touches; zero for degenerate intervals.
    pub span_months: u32,
    pub degenerate: bool,
}

/// Timeline bars ordered by start date, then project name.
pub fn timeline(records: &[ProjectRecord]) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = records
        .iter()
        .map(|record| {
            let span = span_months(record.start, record.end);
            TimelineEntry {
                project: record.project.clone(),
                phase: record.phase.clone(),
                start: record.start,
                end: record.end,
                span_months: span.max(0) as u32,
                degenerate: span <= 0,
            }
        })
        .collect();

    entries.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.project.cmp(&b.project)));
    entries
}
