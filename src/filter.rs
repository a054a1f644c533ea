use crate::error::{AllocationError, Result};
use crate::schema::{ProjectRecord, ReportConfig};
use log::debug;
use serde::{Deserialize, Serialize};

/// Phase/year selection. `None` means "no filtering" on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub phase: Option<String>,
    pub year: Option<i32>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Builds a selection from raw widget values, mapping the "all" sentinel to no filter.
    pub fn from_widget_values(phase: &str, year: &str, config: &ReportConfig) -> Result<Self> {
        let phase = if config.is_all_sentinel(phase) {
            None
        } else {
            Some(phase.to_string())
        };

        let year = if config.is_all_sentinel(year) {
            None
        } else {
            let parsed = year.trim().parse::<i32>().map_err(|_| {
                AllocationError::DateError(format!("Invalid year selection: {}", year))
            })?;
            Some(parsed)
        };

        Ok(Self { phase, year })
    }

    pub fn matches(&self, record: &ProjectRecord) -> bool {
        let phase_ok = match &self.phase {
            Some(phase) => record.phase.as_deref() == Some(phase.as_str()),
            None => true,
        };
        let year_ok = match self.year {
            Some(year) => record.start_year() == year,
            None => true,
        };
        phase_ok && year_ok
    }
}

/// Narrows `records` to the selection.
///
/// An empty result is reported as [`AllocationError::EmptySelection`] so callers
/// can tell "nothing matched" apart from a table of zeros.
pub fn filter_records(records: &[ProjectRecord], selection: &Selection) -> Result<Vec<ProjectRecord>> {
    let filtered: Vec<ProjectRecord> = records
        .iter()
        .filter(|record| selection.matches(record))
        .cloned()
        .collect();

    debug!(
        "Selection {:?} kept {} of {} records",
        selection,
        filtered.len(),
        records.len()
    );

    if filtered.is_empty() {
        return Err(AllocationError::EmptySelection {
            phase: selection.phase.clone(),
            year: selection.year,
        });
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(project: &str, phase: Option<&str>, start_year: i32) -> ProjectRecord {
        ProjectRecord::new(
            project,
            phase,
            NaiveDate::from_ymd_opt(start_year, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(start_year + 1, 2, 1).unwrap(),
            dec!(1200),
        )
    }

    fn records() -> Vec<ProjectRecord> {
        vec![
            record("A", Some("Planung"), 2023),
            record("B", Some("Planung"), 2024),
            record("C", Some("Ausführung"), 2024),
            record("D", None, 2024),
        ]
    }

    fn names(records: &[ProjectRecord]) -> Vec<&str> {
        records.iter().map(|r| r.project.as_str()).collect()
    }

    #[test]
    fn test_no_filter_keeps_everything() {
        let filtered = filter_records(&records(), &Selection::all()).unwrap();
        assert_eq!(filtered.len(), 4);
    }

    #[test]
    fn test_phase_filter_exact_match() {
        let filtered = filter_records(&records(), &Selection::all().phase("Planung")).unwrap();
        assert_eq!(names(&filtered), vec!["A", "B"]);

        let result = filter_records(&records(), &Selection::all().phase("planung"));
        assert!(matches!(result, Err(AllocationError::EmptySelection { .. })));
    }

    #[test]
    fn test_year_filter_uses_start_date() {
        // Every record ends in the following year
        let filtered = filter_records(&records(), &Selection::all().year(2024)).unwrap();
        assert_eq!(names(&filtered), vec!["B", "C", "D"]);

        let result = filter_records(&records(), &Selection::all().year(2025));
        assert!(result.is_err());
    }

    #[test]
    fn test_filters_commute() {
        let data = records();
        let phase_first = filter_records(&data, &Selection::all().phase("Planung"))
            .and_then(|r| filter_records(&r, &Selection::all().year(2024)))
            .unwrap();
        let year_first = filter_records(&data, &Selection::all().year(2024))
            .and_then(|r| filter_records(&r, &Selection::all().phase("Planung")))
            .unwrap();
        let combined = filter_records(&data, &Selection::all().phase("Planung").year(2024)).unwrap();

        assert_eq!(phase_first, year_first);
        assert_eq!(phase_first, combined);
        assert_eq!(names(&combined), vec!["B"]);
    }

    #[test]
    fn test_empty_selection_reports_criteria() {
        let result = filter_records(&records(), &Selection::all().phase("Ausführung").year(2023));
        match result {
            Err(AllocationError::EmptySelection { phase, year }) => {
                assert_eq!(phase.as_deref(), Some("Ausführung"));
                assert_eq!(year, Some(2023));
            }
            other => panic!("Expected EmptySelection, got {:?}", other),
        }
    }

    #[test]
    fn test_from_widget_values() {
        let config = ReportConfig::default();

        let all = Selection::from_widget_values("Alle", "Alle", &config).unwrap();
        assert_eq!(all, Selection::all());

        let specific = Selection::from_widget_values("Planung", "2024", &config).unwrap();
        assert_eq!(specific, Selection::all().phase("Planung").year(2024));

        assert!(Selection::from_widget_values("Alle", "zwanzig", &config).is_err());
    }
}
