use crate::engine::allocate_record;
use crate::schema::{MonthKey, ProjectRecord};
use crate::utils::{month_range, saturating_sum};
use log::debug;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grouping {
    /// One row per project
    Project,
    /// One row per phase, summed over all projects in that phase
    Phase,
    /// One row per (project, phase) pair
    ProjectPhase,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GroupKey {
    Project(String),
    Phase(String),
    ProjectPhase { project: String, phase: String },
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Project(project) => write!(f, "{}", project),
            GroupKey::Phase(phase) => write!(f, "{}", phase),
            GroupKey::ProjectPhase { project, phase } => write!(f, "{} / {}", project, phase),
        }
    }
}

impl Grouping {
    /// Records without a phase have no key under phase-based groupings.
    pub fn key_for(&self, record: &ProjectRecord) -> Option<GroupKey> {
        match self {
            Grouping::Project => Some(GroupKey::Project(record.project.clone())),
            Grouping::Phase => record.phase.clone().map(GroupKey::Phase),
            Grouping::ProjectPhase => record.phase.as_ref().map(|phase| GroupKey::ProjectPhase {
                project: record.project.clone(),
                phase: phase.clone(),
            }),
        }
    }
}

/// Dense `(group, month)` matrix of allocated values.
///
/// Every row spans the full month axis; months without contributions hold an
/// explicit zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "K: Serialize"))]
pub struct AggregateTable<K: Ord> {
    months: Vec<MonthKey>,
    #[serde(serialize_with = "serialize_rows")]
    rows: BTreeMap<K, Vec<Decimal>>,
    skipped_records: usize,
    excluded_records: usize,
}

#[derive(Serialize)]
struct TableRow<'a, K> {
    key: &'a K,
    values: &'a [Decimal],
}

fn serialize_rows<K, S>(
    rows: &BTreeMap<K, Vec<Decimal>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    K: Serialize,
    S: Serializer,
{
    serializer.collect_seq(rows.iter().map(|(key, values)| TableRow { key, values }))
}

impl<K: Ord> AggregateTable<K> {
    pub fn months(&self) -> &[MonthKey] {
        &self.months
    }

    /// Month axis rendered as `YYYY-MM` column labels.
    pub fn column_labels(&self) -> Vec<String> {
        self.months.iter().map(|m| m.to_string()).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.keys()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&K, &[Decimal])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn row(&self, key: &K) -> Option<&[Decimal]> {
        self.rows.get(key).map(|v| v.as_slice())
    }

    /// `None` when either the key or the month is outside the table.
    pub fn get(&self, key: &K, month: MonthKey) -> Option<Decimal> {
        let idx = self.months.binary_search(&month).ok()?;
        self.rows.get(key).map(|row| row[idx])
    }

    pub fn row_total(&self, key: &K) -> Option<Decimal> {
        self.rows.get(key).map(|row| saturating_sum(row.iter().copied()))
    }

    pub fn month_total(&self, month: MonthKey) -> Option<Decimal> {
        let idx = self.months.binary_search(&month).ok()?;
        Some(saturating_sum(self.rows.values().map(|row| row[idx])))
    }

    pub fn grand_total(&self) -> Decimal {
        saturating_sum(self.rows.values().flat_map(|row| row.iter().copied()))
    }

    /// Records whose end month precedes their start month.
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// Records that produced no group key (e.g. no phase under phase grouping).
    pub fn excluded_records(&self) -> usize {
        self.excluded_records
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Month axis covering the earliest start month through the latest end month.
pub fn month_axis(records: &[ProjectRecord]) -> Vec<MonthKey> {
    let first = records.iter().map(|r| r.start_month()).min();
    let last = records.iter().map(|r| r.end_month()).max();

    match (first, last) {
        (Some(first), Some(last)) => month_range(first, last),
        _ => Vec::new(),
    }
}

/// Allocates every record and folds the monthly shares into a dense table keyed by `key_fn`.
///
/// Cells clamp at `Decimal::MAX`/`Decimal::MIN` rather than overflowing.
pub fn aggregate<K, F>(records: &[ProjectRecord], key_fn: F) -> AggregateTable<K>
where
    K: Ord,
    F: Fn(&ProjectRecord) -> Option<K>,
{
    let months = month_axis(records);
    let index: BTreeMap<MonthKey, usize> = months
        .iter()
        .enumerate()
        .map(|(i, month)| (*month, i))
        .collect();

    debug!(
        "Aggregating {} records over {} months ({:?} to {:?})",
        records.len(),
        months.len(),
        months.first(),
        months.last()
    );

    let mut rows: BTreeMap<K, Vec<Decimal>> = BTreeMap::new();
    let mut skipped_records = 0;
    let mut excluded_records = 0;

    for record in records {
        let Some(key) = key_fn(record) else {
            excluded_records += 1;
            continue;
        };

        let row = rows
            .entry(key)
            .or_insert_with(|| vec![Decimal::ZERO; months.len()]);

        let shares = allocate_record(record);
        if shares.is_empty() {
            debug!(
                "Skipping '{}': end {} lies in a month before start {}",
                record.project, record.end, record.start
            );
            skipped_records += 1;
            continue;
        }

        for share in shares {
            if let Some(&i) = index.get(&share.month) {
                row[i] = row[i].saturating_add(share.value);
            }
        }
    }

    AggregateTable {
        months,
        rows,
        skipped_records,
        excluded_records,
    }
}

pub fn aggregate_by(records: &[ProjectRecord], grouping: Grouping) -> AggregateTable<GroupKey> {
    aggregate(records, |record| grouping.key_for(record))
}

pub fn aggregate_by_project(records: &[ProjectRecord]) -> AggregateTable<String> {
    aggregate(records, |record| Some(record.project.clone()))
}

pub fn aggregate_by_phase(records: &[ProjectRecord]) -> AggregateTable<String> {
    aggregate(records, |record| record.phase.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn sample_records() -> Vec<ProjectRecord> {
        vec![
            ProjectRecord::new("Alpha", Some("Planung"), date(2024, 1, 10), date(2024, 2, 20), dec!(200)),
            ProjectRecord::new("Beta", Some("Planung"), date(2024, 2, 1), date(2024, 4, 30), dec!(300)),
            ProjectRecord::new("Gamma", Some("Ausführung"), date(2024, 2, 15), date(2024, 2, 16), dec!(50)),
        ]
    }

    #[test]
    fn test_overlapping_records_accumulate_in_same_cell() {
        let table = aggregate_by_phase(&sample_records());

        let planung = "Planung".to_string();
        assert_eq!(table.get(&planung, month(2024, 1)), Some(dec!(100)));
        assert_eq!(table.get(&planung, month(2024, 2)), Some(dec!(200)));
        assert_eq!(table.get(&planung, month(2024, 4)), Some(dec!(100)));

        let ausfuehrung = "Ausführung".to_string();
        assert_eq!(table.get(&ausfuehrung, month(2024, 2)), Some(dec!(50)));
    }

    #[test]
    fn test_different_keys_stay_in_separate_rows() {
        let table = aggregate_by_project(&sample_records());

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&"Alpha".to_string(), month(2024, 2)), Some(dec!(100)));
        assert_eq!(table.get(&"Beta".to_string(), month(2024, 2)), Some(dec!(100)));
        assert_eq!(table.get(&"Gamma".to_string(), month(2024, 2)), Some(dec!(50)));
        assert_eq!(table.month_total(month(2024, 2)), Some(dec!(250)));
    }

    #[test]
    fn test_table_is_dense_with_explicit_zeros() {
        let table = aggregate_by_project(&sample_records());

        assert_eq!(table.column_labels(), vec!["2024-01", "2024-02", "2024-03", "2024-04"]);
        for (_, row) in table.rows() {
            assert_eq!(row.len(), 4);
        }
        assert_eq!(table.get(&"Gamma".to_string(), month(2024, 4)), Some(Decimal::ZERO));
        assert_eq!(table.get(&"Gamma".to_string(), month(2024, 5)), None);
        assert_eq!(table.get(&"Delta".to_string(), month(2024, 1)), None);
    }

    #[test]
    fn test_grouping_independence_of_grand_total() {
        let records = sample_records();
        let by_project = aggregate_by_project(&records);
        let by_phase = aggregate_by_phase(&records);
        let by_pair = aggregate_by(&records, Grouping::ProjectPhase);

        assert_eq!(by_project.grand_total(), dec!(550));
        assert_eq!(by_phase.grand_total(), dec!(550));
        assert_eq!(by_pair.grand_total(), dec!(550));
    }

    #[test]
    fn test_degenerate_records_are_counted_not_allocated() {
        let mut records = sample_records();
        records.push(ProjectRecord::new(
            "Delta",
            Some("Planung"),
            date(2024, 4, 1),
            date(2024, 2, 1),
            dec!(999),
        ));

        let table = aggregate_by_project(&records);
        assert_eq!(table.skipped_records(), 1);
        assert_eq!(table.grand_total(), dec!(550));
        assert_eq!(table.row_total(&"Delta".to_string()), Some(Decimal::ZERO));
    }

    #[test]
    fn test_project_with_multiple_phases() {
        let records = vec![
            ProjectRecord::new("Alpha", Some("Planung"), date(2024, 1, 1), date(2024, 1, 31), dec!(100)),
            ProjectRecord::new("Alpha", Some("Ausführung"), date(2024, 2, 1), date(2024, 3, 31), dec!(400)),
        ];

        let by_pair = aggregate_by(&records, Grouping::ProjectPhase);
        assert_eq!(by_pair.len(), 2);

        let execution = GroupKey::ProjectPhase {
            project: "Alpha".to_string(),
            phase: "Ausführung".to_string(),
        };
        assert_eq!(by_pair.get(&execution, month(2024, 1)), Some(Decimal::ZERO));
        assert_eq!(by_pair.get(&execution, month(2024, 3)), Some(dec!(200)));
        assert_eq!(execution.to_string(), "Alpha / Ausführung");

        let by_project = aggregate_by(&records, Grouping::Project);
        assert_eq!(by_project.len(), 1);
        assert_eq!(
            by_project.row(&GroupKey::Project("Alpha".to_string())),
            Some(&[dec!(100), dec!(200), dec!(200)][..])
        );
    }

    #[test]
    fn test_records_without_phase_excluded_from_phase_rows() {
        let records = vec![
            ProjectRecord::new("Alpha", Some("Planung"), date(2024, 1, 1), date(2024, 1, 31), dec!(100)),
            ProjectRecord::new("Beta", None, date(2024, 1, 1), date(2024, 2, 28), dec!(60)),
        ];

        let by_phase = aggregate_by_phase(&records);
        assert_eq!(by_phase.len(), 1);
        assert_eq!(by_phase.excluded_records(), 1);
        assert_eq!(by_phase.grand_total(), dec!(100));
        // Axis still spans every input record
        assert_eq!(by_phase.months().len(), 2);

        let by_project = aggregate_by_project(&records);
        assert_eq!(by_project.excluded_records(), 0);
        assert_eq!(by_project.grand_total(), dec!(160));
    }

    #[test]
    fn test_cells_saturate_instead_of_overflowing() {
        let records = vec![
            ProjectRecord::new("Alpha", Some("Planung"), date(2024, 1, 1), date(2024, 1, 31), Decimal::MAX),
            ProjectRecord::new("Beta", Some("Planung"), date(2024, 1, 1), date(2024, 1, 31), Decimal::MAX),
        ];

        let by_phase = aggregate_by_phase(&records);
        assert_eq!(by_phase.get(&"Planung".to_string(), month(2024, 1)), Some(Decimal::MAX));
        assert_eq!(by_phase.grand_total(), Decimal::MAX);

        let by_project = aggregate_by_project(&records);
        assert_eq!(by_project.month_total(month(2024, 1)), Some(Decimal::MAX));
        assert_eq!(by_project.grand_total(), Decimal::MAX);
    }

    #[test]
    fn test_empty_input_yields_empty_table() {
        let table = aggregate_by_project(&[]);
        assert!(table.is_empty());
        assert!(table.months().is_empty());
        assert_eq!(table.grand_total(), Decimal::ZERO);
    }

    #[test]
    fn test_table_serializes_rows_as_sequence() {
        let table = aggregate_by_phase(&sample_records());
        let json = serde_json::to_value(&table).unwrap();

        assert_eq!(json["months"][0], "2024-01");
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["key"], "Ausführung");
    }
}
