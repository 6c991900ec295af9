//! Company and metric selection state.
//!
//! Holds which companies and metrics are toggled on. Every mutation bumps a
//! revision drawn from a process-wide counter, so two selections never share
//! a revision and derived aggregates can tell when they are stale.

use crate::models::Dataset;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Errors raised while changing the selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{kind} index {index} is out of range (have {len})")]
    OutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Unknown {kind}: {}", .names.join(", "))]
    UnknownNames {
        kind: &'static str,
        names: Vec<String>,
    },
}

/// A toggleable entry in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionItem {
    pub name: String,
    pub selected: bool,
}

/// Selection over the companies and metrics of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    companies: Vec<SelectionItem>,
    metrics: Vec<SelectionItem>,
    #[serde(skip, default = "next_revision")]
    revision: u64,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            companies: Vec::new(),
            metrics: Vec::new(),
            revision: next_revision(),
        }
    }
}

impl Selection {
    /// Everything in the dataset, all selected.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let all = |names: &[String]| {
            names
                .iter()
                .map(|name| SelectionItem {
                    name: name.clone(),
                    selected: true,
                })
                .collect()
        };

        Self {
            companies: all(&dataset.companies),
            metrics: all(&dataset.metrics),
            revision: next_revision(),
        }
    }

    pub fn companies(&self) -> &[SelectionItem] {
        &self.companies
    }

    pub fn metrics(&self) -> &[SelectionItem] {
        &self.metrics
    }

    /// Identifies this state. Unique across all selections in the process
    /// and replaced on every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Flip one company on or off.
    pub fn toggle_company(&mut self, index: usize) -> Result<bool, SelectionError> {
        let selected = toggle(&mut self.companies, index, "company")?;
        self.touch();
        Ok(selected)
    }

    /// Flip one metric on or off.
    pub fn toggle_metric(&mut self, index: usize) -> Result<bool, SelectionError> {
        let selected = toggle(&mut self.metrics, index, "metric")?;
        self.touch();
        Ok(selected)
    }

    pub fn toggle_company_by_name(&mut self, name: &str) -> Result<bool, SelectionError> {
        let index = position(&self.companies, name, "company")?;
        self.toggle_company(index)
    }

    pub fn toggle_metric_by_name(&mut self, name: &str) -> Result<bool, SelectionError> {
        let index = position(&self.metrics, name, "metric")?;
        self.toggle_metric(index)
    }

    /// Select every company and metric.
    #[allow(dead_code)] // Utility for resetting the selection
    pub fn select_all(&mut self) {
        set_all(&mut self.companies, true);
        set_all(&mut self.metrics, true);
        self.touch();
    }

    /// Deselect every company and metric.
    #[allow(dead_code)] // Utility for resetting the selection
    pub fn clear_all(&mut self) {
        set_all(&mut self.companies, false);
        set_all(&mut self.metrics, false);
        self.touch();
    }

    /// Select exactly the named companies.
    ///
    /// Fails without changing anything if a name is not in the dataset.
    pub fn restrict_companies(&mut self, names: &[String]) -> Result<(), SelectionError> {
        restrict(&mut self.companies, names, "company")?;
        self.touch();
        Ok(())
    }

    /// Select exactly the named metrics.
    pub fn restrict_metrics(&mut self, names: &[String]) -> Result<(), SelectionError> {
        restrict(&mut self.metrics, names, "metric")?;
        self.touch();
        Ok(())
    }

    /// Selected company names, in dataset order.
    pub fn selected_companies(&self) -> Vec<&str> {
        selected_names(&self.companies)
    }

    /// Selected metric names, in dataset order.
    pub fn selected_metrics(&self) -> Vec<&str> {
        selected_names(&self.metrics)
    }

    pub fn is_company_selected(&self, name: &str) -> bool {
        self.companies.iter().any(|c| c.selected && c.name == name)
    }

    pub fn is_metric_selected(&self, name: &str) -> bool {
        self.metrics.iter().any(|m| m.selected && m.name == name)
    }

    fn touch(&mut self) {
        self.revision = next_revision();
    }
}

fn toggle(
    items: &mut [SelectionItem],
    index: usize,
    kind: &'static str,
) -> Result<bool, SelectionError> {
    let len = items.len();
    let item = items
        .get_mut(index)
        .ok_or(SelectionError::OutOfRange { kind, index, len })?;
    item.selected = !item.selected;
    Ok(item.selected)
}

fn position(items: &[SelectionItem], name: &str, kind: &'static str) -> Result<usize, SelectionError> {
    items
        .iter()
        .position(|item| item.name == name)
        .ok_or_else(|| SelectionError::UnknownNames {
            kind,
            names: vec![name.to_string()],
        })
}

fn set_all(items: &mut [SelectionItem], selected: bool) {
    for item in items {
        item.selected = selected;
    }
}

fn restrict(
    items: &mut [SelectionItem],
    names: &[String],
    kind: &'static str,
) -> Result<(), SelectionError> {
    let unknown: Vec<String> = names
        .iter()
        .filter(|name| !items.iter().any(|item| &item.name == *name))
        .cloned()
        .collect();

    if !unknown.is_empty() {
        return Err(SelectionError::UnknownNames {
            kind,
            names: unknown,
        });
    }

    for item in items {
        item.selected = names.contains(&item.name);
    }
    Ok(())
}

fn selected_names(items: &[SelectionItem]) -> Vec<&str> {
    items
        .iter()
        .filter(|item| item.selected)
        .map(|item| item.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset() -> Dataset {
        Dataset {
            companies: vec!["Acme".into(), "Globex".into(), "Initech".into()],
            metrics: vec!["Ventas".into(), "Calidad".into()],
            ..Dataset::default()
        }
    }

    #[test]
    fn test_starts_fully_selected() {
        let selection = Selection::from_dataset(&make_dataset());
        assert_eq!(selection.selected_companies(), vec!["Acme", "Globex", "Initech"]);
        assert_eq!(selection.selected_metrics(), vec!["Ventas", "Calidad"]);
    }

    #[test]
    fn test_toggle_company() {
        let mut selection = Selection::from_dataset(&make_dataset());
        let start = selection.revision();

        assert_eq!(selection.toggle_company(1), Ok(false));
        let after_first = selection.revision();
        assert_ne!(after_first, start);
        assert_eq!(selection.selected_companies(), vec!["Acme", "Initech"]);

        assert_eq!(selection.toggle_company(1), Ok(true));
        assert_eq!(selection.selected_companies(), vec!["Acme", "Globex", "Initech"]);
        assert_ne!(selection.revision(), after_first);
        assert_ne!(selection.revision(), start);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut selection = Selection::from_dataset(&make_dataset());
        let start = selection.revision();
        let err = selection.toggle_metric(5).unwrap_err();
        assert_eq!(
            err,
            SelectionError::OutOfRange {
                kind: "metric",
                index: 5,
                len: 2
            }
        );
        assert_eq!(selection.revision(), start);
    }

    #[test]
    fn test_toggle_by_name() {
        let mut selection = Selection::from_dataset(&make_dataset());
        assert_eq!(selection.toggle_metric_by_name("Calidad"), Ok(false));
        assert!(!selection.is_metric_selected("Calidad"));
        assert!(selection.toggle_company_by_name("Hooli").is_err());
    }

    #[test]
    fn test_select_all_and_clear_all() {
        let mut selection = Selection::from_dataset(&make_dataset());
        let start = selection.revision();

        selection.clear_all();
        let cleared = selection.revision();
        assert_ne!(cleared, start);
        assert!(selection.selected_companies().is_empty());
        assert!(selection.selected_metrics().is_empty());

        selection.select_all();
        assert_eq!(selection.selected_companies().len(), 3);
        assert_eq!(selection.selected_metrics().len(), 2);
        assert_ne!(selection.revision(), cleared);
    }

    #[test]
    fn test_revisions_are_unique_across_selections() {
        let dataset = make_dataset();
        let mut first = Selection::from_dataset(&dataset);
        let mut second = Selection::from_dataset(&dataset);
        assert_ne!(first.revision(), second.revision());

        first.toggle_company(0).unwrap();
        second.toggle_company(1).unwrap();
        assert_ne!(first.revision(), second.revision());

        let restored: Selection = serde_json::from_str(&serde_json::to_string(&first).unwrap()).unwrap();
        assert_ne!(restored.revision(), first.revision());
        assert_eq!(restored.selected_companies(), first.selected_companies());
    }

    #[test]
    fn test_restrict_companies() {
        let mut selection = Selection::from_dataset(&make_dataset());
        selection
            .restrict_companies(&["Initech".to_string(), "Acme".to_string()])
            .unwrap();

        // Dataset order is kept regardless of argument order
        assert_eq!(selection.selected_companies(), vec!["Acme", "Initech"]);
    }

    #[test]
    fn test_restrict_unknown_names_leaves_selection_untouched() {
        let mut selection = Selection::from_dataset(&make_dataset());
        let start = selection.revision();
        let err = selection
            .restrict_metrics(&["Ventas".to_string(), "Margen".to_string()])
            .unwrap_err();

        assert_eq!(err.to_string(), "Unknown metric: Margen");
        assert_eq!(selection.selected_metrics(), vec!["Ventas", "Calidad"]);
        assert_eq!(selection.revision(), start);
    }
}
