use crate::error::{AllocationError, Result};
use crate::utils::{first_of_month, parse_month_label};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A calendar month (year + month number) used as the time axis.
///
/// Ordering is chronological. Rendered and parsed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AllocationError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    pub(crate) fn from_parts(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self> {
        parse_month_label(s)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = AllocationError;

    fn try_from(value: String) -> Result<Self> {
        parse_month_label(&value)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// One validated row of project input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project: String,
    /// Categorical phase label. Needed for phase grouping and filtering only.
    pub phase: Option<String>,
    pub start: NaiveDate,
    /// May precede `start` in raw data; such records allocate nothing.
    pub end: NaiveDate,
    /// Contract sum ("Auftragssumme"), signed.
    pub amount: Decimal,
    #[serde(default)]
    pub cost_fields: BTreeMap<String, Decimal>,
}

impl ProjectRecord {
    pub fn new(
        project: impl Into<String>,
        phase: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            project: project.into(),
            phase: phase.map(str::to_string),
            start,
            end,
            amount,
            cost_fields: BTreeMap::new(),
        }
    }

    pub fn with_cost_field(mut self, name: impl Into<String>, value: Decimal) -> Self {
        self.cost_fields.insert(name.into(), value);
        self
    }

    pub fn start_month(&self) -> MonthKey {
        MonthKey::from_date(first_of_month(self.start))
    }

    pub fn end_month(&self) -> MonthKey {
        MonthKey::from_date(first_of_month(self.end))
    }

    pub fn start_year(&self) -> i32 {
        self.start.year()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CostUnit {
    #[schemars(description = "The raw value is a percentage of the contract sum (10 means 10%).")]
    Percentage,

    #[schemars(description = "The raw value is already an absolute currency amount.")]
    Absolute,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CostComponent {
    #[schemars(description = "Column name of the cost component in the project sheet")]
    pub name: String,

    #[schemars(description = "How the raw column value is to be interpreted")]
    pub unit: CostUnit,
}

impl CostComponent {
    pub fn percentage(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: CostUnit::Percentage,
        }
    }

    pub fn absolute(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: CostUnit::Absolute,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportConfig {
    #[serde(default = "default_sheet_name_hint")]
    #[schemars(
        description = "Case-insensitive substring identifying the worksheet that holds the project list"
    )]
    pub sheet_name_hint: String,

    #[serde(default = "default_all_sentinel")]
    #[schemars(description = "Selection value meaning 'do not filter' for phase and year")]
    pub all_sentinel: String,

    #[serde(default = "default_cost_components")]
    #[schemars(description = "Ordered cost components to decompose per project")]
    pub cost_components: Vec<CostComponent>,
}

fn default_sheet_name_hint() -> String {
    "projekt".to_string()
}

fn default_all_sentinel() -> String {
    "Alle".to_string()
}

fn default_cost_components() -> Vec<CostComponent> {
    vec![
        CostComponent::absolute("Herstellkosten"),
        CostComponent::percentage("Ergebnis"),
        CostComponent::percentage("Gewährleistung"),
    ]
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sheet_name_hint: default_sheet_name_hint(),
            all_sentinel: default_all_sentinel(),
            cost_components: default_cost_components(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// True when `value` is the "no filter" selection (`all_sentinel`, or "all" in any case).
    pub fn is_all_sentinel(&self, value: &str) -> bool {
        let value = value.trim();
        value == self.all_sentinel || value.eq_ignore_ascii_case("all")
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
