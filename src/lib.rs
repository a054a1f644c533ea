//! # Project Month Allocation
//!
//! Spreads the contract sum of each project evenly over the calendar months it
//! runs ("straight-line" allocation) and aggregates the monthly values by
//! project, by phase, or by both.
//!
//! ## Core Concepts
//!
//! - **Allocation**: `amount / n` for each of the `n` calendar months between the
//!   start month and the end month, inclusive. Day counts are ignored.
//! - **Aggregate table**: a dense group × month matrix. Months without activity
//!   hold an explicit zero.
//! - **Selection**: optional phase and start-year filters. A selection that
//!   matches nothing is an [`AllocationError::EmptySelection`], not an empty table.
//! - **Cost breakdown**: percentage cost fields converted to currency against the
//!   contract sum and summed per project.
//!
//! ## Example
//!
//! ```rust
//! use project_month_allocation::*;
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//!
//! let records = vec![ProjectRecord::new(
//!     "Schule Nord",
//!     Some("Rohbau"),
//!     NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
//!     Decimal::from(300),
//! )];
//!
//! let table = MonthlyAllocationProcessor::process(&records, &Selection::all(), Grouping::Phase)
//!     .unwrap();
//! assert_eq!(table.column_labels(), vec!["2024-01", "2024-02", "2024-03"]);
//! assert_eq!(table.grand_total(), Decimal::from(300));
//! ```

pub mod aggregator;
pub mod costs;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod schema;
pub mod timeline;
pub mod utils;

pub use aggregator::{
    aggregate, aggregate_by, aggregate_by_phase, aggregate_by_project, month_axis,
    AggregateTable, GroupKey, Grouping,
};
pub use costs::{decompose, CostBreakdown};
pub use engine::{allocate, allocate_record, is_degenerate, Allocation, MonthlyShare};
pub use error::{AllocationError, Result};
pub use filter::{filter_records, Selection};
pub use ingestion::*;
pub use schema::*;
pub use timeline::{timeline, TimelineEntry};
pub use utils::*;

use log::{info, warn};
use serde::Serialize;

/// Every projection the dashboard shows for one selection.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    pub selection: Selection,
    pub record_count: usize,
    /// Records left out of every table because they end before they start.
    pub skipped_records: usize,
    pub by_project: AggregateTable<String>,
    pub by_phase: AggregateTable<String>,
    pub costs: CostBreakdown,
    pub timeline: Vec<TimelineEntry>,
}

pub struct MonthlyAllocationProcessor;

impl MonthlyAllocationProcessor {
    pub fn process(
        records: &[ProjectRecord],
        selection: &Selection,
        grouping: Grouping,
    ) -> Result<AggregateTable<GroupKey>> {
        info!(
            "Allocating {} records by {:?} for selection {:?}",
            records.len(),
            grouping,
            selection
        );

        let filtered = filter_records(records, selection)?;
        let table = aggregate_by(&filtered, grouping);
        report_skipped(table.skipped_records());

        Ok(table)
    }

    pub fn report(
        records: &[ProjectRecord],
        selection: &Selection,
        config: &ReportConfig,
    ) -> Result<ProjectReport> {
        info!(
            "Building project report for {} records, selection {:?}",
            records.len(),
            selection
        );

        let filtered = filter_records(records, selection)?;

        let by_project = aggregate_by_project(&filtered);
        let by_phase = aggregate_by_phase(&filtered);
        let skipped_records = filtered.iter().filter(|r| is_degenerate(r)).count();
        report_skipped(skipped_records);

        let costs = decompose(&filtered, &config.cost_components);

        Ok(ProjectReport {
            selection: selection.clone(),
            record_count: filtered.len(),
            skipped_records,
            by_project,
            by_phase,
            costs,
            timeline: timeline(&filtered),
        })
    }
}

fn report_skipped(skipped: usize) {
    if skipped > 0 {
        warn!(
            "{} record(s) end before they start and were left out of the allocation",
            skipped
        );
    }
}

pub fn build_report(
    records: &[ProjectRecord],
    selection: &Selection,
    config: &ReportConfig,
) -> Result<ProjectReport> {
    MonthlyAllocationProcessor::report(records, selection, config)
}
