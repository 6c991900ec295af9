//! Report assembly and rendering.

pub mod generator;

pub use generator::*;

use crate::analysis::{cell_detail, comparison_series, ranking, rating_distribution, Dashboard};
use crate::models::{Report, ReportMetadata};
use crate::sheet::DEFAULT_COMPANY_COLUMN;
use anyhow::Result;
use chrono::Utc;

/// Snapshot the dashboard's current selection into a report.
///
/// `detail` addresses one cell as `(company, metric)`; it must be on the grid.
pub fn build_report(
    dashboard: &mut Dashboard,
    source: &str,
    detail: Option<(&str, &str)>,
) -> Result<Report> {
    let grid = dashboard.grid();

    let detail = match detail {
        Some((company, metric)) => Some(cell_detail(&grid, company, metric).ok_or_else(|| {
            anyhow::anyhow!(
                "No cell '{}:{}' in the current selection",
                company,
                metric
            )
        })?),
        None => None,
    };

    let dataset = dashboard.dataset();
    let selection = dashboard.selection();

    let metadata = ReportMetadata {
        source: source.to_string(),
        generated_at: Utc::now(),
        companies_total: dataset.companies.len(),
        companies_selected: selection.selected_companies().len(),
        metrics_total: dataset.metrics.len(),
        metrics_selected: selection.selected_metrics().len(),
        company_column: if dataset.company_column.is_empty() {
            DEFAULT_COMPANY_COLUMN.to_string()
        } else {
            dataset.company_column.clone()
        },
        rating_filter: dashboard.rating_filter(),
    };

    Ok(Report {
        metadata,
        distribution: rating_distribution(&grid),
        ranking: ranking(&grid),
        series: comparison_series(&grid),
        detail,
        grid,
    })
}
