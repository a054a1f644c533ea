use crate::schema::{CostComponent, CostUnit, ProjectRecord};
use crate::utils::saturating_sum;
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Absolute cost components per project, independent of the month axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Requested components that exist in the input, in request order.
    components: Vec<String>,
    projects: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl CostBreakdown {
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn projects(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Decimal>)> {
        self.projects.iter()
    }

    pub fn project(&self, project: &str) -> Option<&BTreeMap<String, Decimal>> {
        self.projects.get(project)
    }

    pub fn get(&self, project: &str, component: &str) -> Option<Decimal> {
        self.projects.get(project)?.get(component).copied()
    }

    /// Sum of one component across all projects.
    pub fn component_total(&self, component: &str) -> Option<Decimal> {
        if !self.components.iter().any(|c| c == component) {
            return None;
        }
        Some(saturating_sum(
            self.projects
                .values()
                .filter_map(|values| values.get(component))
                .copied(),
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

fn absolute_value(component: &CostComponent, raw: Decimal, amount: Decimal) -> Decimal {
    match component.unit {
        CostUnit::Percentage => (raw / Decimal::ONE_HUNDRED).saturating_mul(amount),
        CostUnit::Absolute => raw,
    }
}

/// Converts cost fields to absolute currency and sums them per project.
///
/// A component counts as present when at least one record carries it. Absent
/// components are left out of every project's mapping; a present component
/// missing from an individual row contributes zero for that row.
pub fn decompose(records: &[ProjectRecord], components: &[CostComponent]) -> CostBreakdown {
    let mut present: Vec<&CostComponent> = Vec::new();
    for component in components {
        if present.iter().any(|c| c.name == component.name) {
            continue;
        }
        if records
            .iter()
            .any(|r| r.cost_fields.contains_key(&component.name))
        {
            present.push(component);
        } else {
            debug!("Cost component '{}' not found in input, omitting", component.name);
        }
    }

    let mut projects: BTreeMap<String, BTreeMap<String, Decimal>> = BTreeMap::new();
    for record in records {
        let values = projects.entry(record.project.clone()).or_default();
        for component in &present {
            let slot = values.entry(component.name.clone()).or_default();
            if let Some(raw) = record.cost_fields.get(&component.name) {
                *slot = slot.saturating_add(absolute_value(component, *raw, record.amount));
            }
        }
    }

    CostBreakdown {
        components: present.iter().map(|c| c.name.clone()).collect(),
        projects,
    }
}
