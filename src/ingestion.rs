use crate::schema::ProjectRecord;
use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A spreadsheet row as parsed, before required fields are checked.
///
/// Columns other than the five named ones are collected into `cost_fields`.
/// Blank or non-numeric cells there deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProjectRow {
    #[serde(alias = "Projekt")]
    pub project: Option<String>,
    #[serde(alias = "Phase")]
    pub phase: Option<String>,
    #[serde(alias = "Beginn")]
    pub start: Option<NaiveDate>,
    #[serde(alias = "Ende")]
    pub end: Option<NaiveDate>,
    #[serde(alias = "Auftragssumme")]
    pub amount: Option<Decimal>,
    #[serde(flatten, deserialize_with = "deserialize_cost_fields")]
    pub cost_fields: BTreeMap<String, Option<Decimal>>,
}

impl RawProjectRow {
    pub fn with_cost_field(mut self, name: impl Into<String>, value: Option<Decimal>) -> Self {
        self.cost_fields.insert(name.into(), value);
        self
    }
}

struct CostCell(Option<Decimal>);

struct CostCellVisitor;

impl<'de> Visitor<'de> for CostCellVisitor {
    type Value = CostCell;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a numeric string or an empty cell")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<CostCell, E> {
        Ok(CostCell(Decimal::from_str(v.trim()).ok()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<CostCell, E> {
        Ok(CostCell(Some(Decimal::from(v))))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<CostCell, E> {
        Ok(CostCell(Some(Decimal::from(v))))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<CostCell, E> {
        Ok(CostCell(Decimal::try_from(v).ok()))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<CostCell, E> {
        Ok(CostCell(None))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<CostCell, E> {
        Ok(CostCell(None))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<CostCell, E> {
        Ok(CostCell(None))
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<CostCell, D::Error> {
        CostCell::deserialize(d)
    }
}

impl<'de> Deserialize<'de> for CostCell {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        d.deserialize_any(CostCellVisitor)
    }
}

fn deserialize_cost_fields<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    let cells = BTreeMap::<String, CostCell>::deserialize(deserializer)?;
    Ok(cells.into_iter().map(|(name, cell)| (name, cell.0)).collect())
}

#[derive(Debug, Clone, Default)]
pub struct IngestionOutcome {
    pub records: Vec<ProjectRecord>,
    /// Rows lacking project, start, end or amount.
    pub dropped_rows: usize,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turns raw rows into records, dropping rows with a missing required field.
///
/// A missing phase does not drop the row.
pub fn convert_rows_to_records(rows: &[RawProjectRow]) -> IngestionOutcome {
    let mut records = Vec::with_capacity(rows.len());
    let mut dropped_rows = 0;

    for (idx, row) in rows.iter().enumerate() {
        let (Some(project), Some(start), Some(end), Some(amount)) =
            (non_blank(row.project.as_deref()), row.start, row.end, row.amount)
        else {
            warn!("Dropping row #{}: missing project, start, end or amount", idx);
            dropped_rows += 1;
            continue;
        };

        let cost_fields = row
            .cost_fields
            .iter()
            .filter_map(|(name, value)| value.map(|v| (name.clone(), v)))
            .collect();

        records.push(ProjectRecord {
            project,
            phase: non_blank(row.phase.as_deref()),
            start,
            end,
            amount,
            cost_fields,
        });
    }

    info!(
        "Ingested {} project records ({} rows dropped)",
        records.len(),
        dropped_rows
    );

    IngestionOutcome {
        records,
        dropped_rows,
    }
}

/// First sheet whose name contains `hint`, ignoring case.
pub fn select_sheet<'a>(sheet_names: &'a [String], hint: &str) -> Option<&'a str> {
    let hint = hint.to_lowercase();
    sheet_names
        .iter()
        .find(|name| name.to_lowercase().contains(&hint))
        .map(String::as_str)
}

/// Distinct phases, sorted, for the phase selection list.
pub fn available_phases(records: &[ProjectRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.phase.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct start years, sorted, for the year selection list.
pub fn available_years(records: &[ProjectRecord]) -> Vec<i32> {
    records
        .iter()
        .map(|r| r.start_year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
