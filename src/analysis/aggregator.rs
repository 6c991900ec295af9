//! Score aggregation and classification.
//!
//! This module computes row and column averages over the selected part of
//! the sheet and turns them into the emoji grid and its derived statistics.

use crate::models::{CellDetail, CompanyRow, Dataset, Rating};
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Header of the synthetic average column.
pub const AVERAGE_LABEL: &str = "Promedio";

/// Row name of the synthetic column-average row.
pub const OVERALL_LABEL: &str = "Promedio General";

/// Averages over a selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    /// One entry per selected metric, in metric order.
    pub column_averages: Vec<f64>,
    /// One entry per selected company, in row order.
    pub row_averages: Vec<f64>,
}

/// Compute column and row averages over exactly the given rows and metrics.
///
/// An average with nothing to divide by is 0.
pub fn calculate_averages(rows: &[&CompanyRow], metrics: &[&str]) -> Averages {
    let column_averages = metrics
        .iter()
        .map(|metric| mean(rows.iter().map(|row| row.score(metric) as f64), rows.len()))
        .collect();

    let row_averages = rows
        .iter()
        .map(|row| mean(metrics.iter().map(|metric| row.score(metric) as f64), metrics.len()))
        .collect();

    Averages {
        column_averages,
        row_averages,
    }
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

/// One classified cell of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub value: f64,
    pub rating: Rating,
    /// False when a rating filter is active and this cell does not match it.
    pub highlighted: bool,
}

impl GridCell {
    fn new(value: f64, filter: Option<Rating>) -> Self {
        let rating = Rating::classify(value);
        Self {
            value,
            rating,
            highlighted: filter.map_or(true, |wanted| wanted == rating),
        }
    }
}

/// A company's row of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub company: String,
    /// One cell per selected metric.
    pub cells: Vec<GridCell>,
    /// The row average cell.
    pub average: GridCell,
}

/// The emoji grid over the current selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmojiGrid {
    /// Selected metrics (column headers).
    pub metrics: Vec<String>,
    pub rows: Vec<GridRow>,
    /// Footer row, one cell per metric.
    pub column_averages: Vec<GridCell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_filter: Option<Rating>,
}

impl EmojiGrid {
    /// Iterate the raw (non-average) cells.
    pub fn raw_cells(&self) -> impl Iterator<Item = &GridCell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.metrics.is_empty()
    }
}

/// Build the grid for the selected rows and metrics from precomputed averages.
pub fn build_grid(
    rows: &[&CompanyRow],
    metrics: &[&str],
    averages: &Averages,
    filter: Option<Rating>,
) -> EmojiGrid {
    let grid_rows = rows
        .iter()
        .zip(&averages.row_averages)
        .map(|(row, &average)| GridRow {
            company: row.company.clone(),
            cells: metrics
                .iter()
                .map(|metric| GridCell::new(row.score(metric) as f64, filter))
                .collect(),
            average: GridCell::new(average, filter),
        })
        .collect();

    EmojiGrid {
        metrics: metrics.iter().map(|m| m.to_string()).collect(),
        rows: grid_rows,
        column_averages: averages
            .column_averages
            .iter()
            .map(|&average| GridCell::new(average, filter))
            .collect(),
        rating_filter: filter,
    }
}

/// Count raw cells per rating. Every rating is present, possibly with 0.
pub fn rating_distribution(grid: &EmojiGrid) -> BTreeMap<Rating, usize> {
    let mut distribution: BTreeMap<Rating, usize> =
        Rating::ALL.into_iter().map(|rating| (rating, 0)).collect();

    for cell in grid.raw_cells() {
        *distribution.entry(cell.rating).or_default() += 1;
    }

    distribution
}

/// A company's position by row average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCompany {
    /// 1-based position.
    pub rank: usize,
    pub company: String,
    pub average: f64,
    pub rating: Rating,
}

/// Rank the grid's companies by average, best first. Ties keep row order.
pub fn ranking(grid: &EmojiGrid) -> Vec<RankedCompany> {
    let mut rows: Vec<&GridRow> = grid.rows.iter().collect();
    rows.sort_by(|a, b| {
        b.average
            .value
            .partial_cmp(&a.average.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankedCompany {
            rank: i + 1,
            company: row.company.clone(),
            average: row.average.value,
            rating: row.average.rating,
        })
        .collect()
}

/// One company's value within a metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub company: String,
    pub value: f64,
}

/// Values of one metric across the selected companies.
///
/// This is the shape the comparison and 3D bar charts plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: String,
    pub average: f64,
    pub points: Vec<SeriesPoint>,
}

/// Per-metric series in column order.
pub fn comparison_series(grid: &EmojiGrid) -> Vec<MetricSeries> {
    grid.metrics
        .iter()
        .enumerate()
        .map(|(j, metric)| MetricSeries {
            metric: metric.clone(),
            average: grid.column_averages.get(j).map_or(0.0, |c| c.value),
            points: grid
                .rows
                .iter()
                .map(|row| SeriesPoint {
                    company: row.company.clone(),
                    value: row.cells.get(j).map_or(0.0, |c| c.value),
                })
                .collect(),
        })
        .collect()
}

/// Detail record for a grid cell.
///
/// `metric` may be [`AVERAGE_LABEL`] to address a row-average cell and
/// `company` may be [`OVERALL_LABEL`] to address a footer cell. Returns
/// `None` for anything that is not on the grid.
pub fn cell_detail(grid: &EmojiGrid, company: &str, metric: &str) -> Option<CellDetail> {
    if company == OVERALL_LABEL {
        let j = grid.metrics.iter().position(|m| m == metric)?;
        let average = grid.column_averages.get(j)?.value;
        return Some(CellDetail::new(OVERALL_LABEL, metric, average, average, average));
    }

    let i = grid.rows.iter().position(|r| r.company == company)?;
    let row = &grid.rows[i];
    let company_average = row.average.value;

    if metric == AVERAGE_LABEL {
        return Some(CellDetail::new(
            company,
            AVERAGE_LABEL,
            company_average,
            company_average,
            company_average,
        ));
    }

    let j = grid.metrics.iter().position(|m| m == metric)?;
    Some(CellDetail::new(
        company,
        metric,
        row.cells.get(j)?.value,
        grid.column_averages.get(j)?.value,
        company_average,
    ))
}

/// Dataset plus selection, with averages cached per selection revision.
#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: Dataset,
    selection: Selection,
    rating_filter: Option<Rating>,
    cache: Option<(u64, Averages)>,
}

impl Dashboard {
    /// Create a dashboard with everything selected.
    pub fn new(dataset: Dataset) -> Self {
        let selection = Selection::from_dataset(&dataset);
        Self {
            dataset,
            selection,
            rating_filter: None,
            cache: None,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Mutable access to the selection; any change invalidates the averages.
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn rating_filter(&self) -> Option<Rating> {
        self.rating_filter
    }

    pub fn set_rating_filter(&mut self, filter: Option<Rating>) {
        self.rating_filter = filter;
    }

    /// Pick a rating to highlight; picking the active one clears the filter.
    #[allow(dead_code)] // Utility for switching the highlight
    pub fn toggle_rating_filter(&mut self, rating: Rating) {
        self.rating_filter = if self.rating_filter == Some(rating) {
            None
        } else {
            Some(rating)
        };
    }

    /// Rows of the selected companies, in sheet order.
    fn selected_rows(&self) -> Vec<&CompanyRow> {
        self.dataset
            .rows
            .iter()
            .filter(|row| self.selection.is_company_selected(&row.company))
            .collect()
    }

    /// Averages for the current selection, recomputed if it changed.
    pub fn aggregates(&mut self) -> &Averages {
        let revision = self.selection.revision();
        let stale = !matches!(&self.cache, Some((cached, _)) if *cached == revision);

        if stale {
            debug!("Recomputing averages for selection revision {}", revision);
            let averages = {
                let rows = self.selected_rows();
                let metrics = self.selection.selected_metrics();
                calculate_averages(&rows, &metrics)
            };
            self.cache = Some((revision, averages));
        }

        let (_, averages) = self
            .cache
            .get_or_insert_with(|| (revision, Averages::default()));
        averages
    }

    /// The emoji grid for the current selection and rating filter.
    pub fn grid(&mut self) -> EmojiGrid {
        let averages = self.aggregates().clone();
        let rows = self.selected_rows();
        let metrics = self.selection.selected_metrics();
        build_grid(&rows, &metrics, &averages, self.rating_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(company: &str, values: &[(&str, &str)]) -> CompanyRow {
        CompanyRow {
            company: company.to_string(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn create_test_dataset() -> Dataset {
        Dataset {
            companies: vec!["Acme".into(), "Globex".into(), "Initech".into()],
            metrics: vec!["Ventas".into(), "Calidad".into(), "Servicio".into()],
            rows: vec![
                row("Acme", &[("Ventas", "90"), ("Calidad", "80"), ("Servicio", "70")]),
                row("Globex", &[("Ventas", "40"), ("Calidad", "n/a"), ("Servicio", "20")]),
                row("Initech", &[("Ventas", "60"), ("Calidad", "50")]),
            ],
            ..Dataset::default()
        }
    }

    #[test]
    fn test_calculate_averages() {
        let dataset = create_test_dataset();
        let rows: Vec<&CompanyRow> = dataset.rows.iter().collect();
        let averages = calculate_averages(&rows, &["Ventas", "Calidad", "Servicio"]);

        assert_eq!(averages.column_averages, vec![190.0 / 3.0, 130.0 / 3.0, 30.0]);
        // Non-numeric and missing cells count as 0
        assert_eq!(averages.row_averages, vec![80.0, 20.0, 110.0 / 3.0]);
    }

    #[test]
    fn test_calculate_averages_empty_selection() {
        let dataset = create_test_dataset();
        let rows: Vec<&CompanyRow> = dataset.rows.iter().collect();

        let no_metrics = calculate_averages(&rows, &[]);
        assert!(no_metrics.column_averages.is_empty());
        assert_eq!(no_metrics.row_averages, vec![0.0, 0.0, 0.0]);

        let no_rows = calculate_averages(&[], &["Ventas"]);
        assert_eq!(no_rows.column_averages, vec![0.0]);
        assert!(no_rows.row_averages.is_empty());
    }

    #[test]
    fn test_averages_follow_selection_changes() {
        let mut dashboard = Dashboard::new(create_test_dataset());
        assert_eq!(dashboard.aggregates().row_averages[0], 80.0);

        dashboard.selection_mut().toggle_metric_by_name("Servicio").unwrap();
        assert_eq!(dashboard.aggregates().row_averages, vec![85.0, 20.0, 55.0]);
        assert_eq!(dashboard.aggregates().column_averages.len(), 2);

        dashboard.selection_mut().toggle_company_by_name("Globex").unwrap();
        assert_eq!(dashboard.aggregates().column_averages, vec![75.0, 65.0]);
        assert_eq!(dashboard.aggregates().row_averages, vec![85.0, 55.0]);

        dashboard.selection_mut().clear_all();
        assert_eq!(dashboard.aggregates(), &Averages::default());

        dashboard.selection_mut().select_all();
        assert_eq!(dashboard.aggregates().row_averages.len(), 3);
    }

    #[test]
    fn test_replaced_selection_is_not_served_from_cache() {
        let dataset = Dataset {
            companies: vec!["Acme".into(), "Globex".into()],
            metrics: vec!["Ventas".into(), "Calidad".into()],
            rows: vec![
                row("Acme", &[("Ventas", "90"), ("Calidad", "10")]),
                row("Globex", &[("Ventas", "40"), ("Calidad", "60")]),
            ],
            ..Dataset::default()
        };
        let mut dashboard = Dashboard::new(dataset.clone());
        dashboard.selection_mut().toggle_metric_by_name("Calidad").unwrap();
        assert_eq!(dashboard.aggregates().column_averages, vec![65.0]);

        let mut other = Selection::from_dataset(&dataset);
        other.toggle_company_by_name("Acme").unwrap();
        *dashboard.selection_mut() = other;

        let expected = calculate_averages(&[&dataset.rows[1]], &["Ventas", "Calidad"]);
        assert_eq!(dashboard.aggregates(), &expected);
        assert_eq!(expected.row_averages, vec![50.0]);
    }

    #[test]
    fn test_grid_layout() {
        let mut dashboard = Dashboard::new(create_test_dataset());
        let grid = dashboard.grid();

        assert_eq!(grid.metrics, vec!["Ventas", "Calidad", "Servicio"]);
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.column_averages.len(), 3);

        let acme = &grid.rows[0];
        assert_eq!(acme.cells[0].rating, Rating::Excelente);
        assert_eq!(acme.cells[1].rating, Rating::Bueno);
        assert_eq!(acme.average.value, 80.0);
        assert_eq!(acme.average.rating, Rating::Bueno);

        let globex = &grid.rows[1];
        assert_eq!(globex.cells[1].value, 0.0);
        assert_eq!(globex.cells[1].rating, Rating::Critico);
        assert!(grid.raw_cells().all(|c| c.highlighted));
    }

    #[test]
    fn test_rating_filter_highlights_matching_cells() {
        let mut dashboard = Dashboard::new(create_test_dataset());
        dashboard.toggle_rating_filter(Rating::Critico);
        let grid = dashboard.grid();

        let highlighted: Vec<f64> = grid
            .raw_cells()
            .filter(|c| c.highlighted)
            .map(|c| c.value)
            .collect();
        assert_eq!(highlighted, vec![0.0, 20.0, 0.0]);
        assert!(grid.rows[1].average.highlighted);
        assert!(!grid.rows[0].average.highlighted);

        // Same rating again restores everything
        dashboard.toggle_rating_filter(Rating::Critico);
        assert_eq!(dashboard.rating_filter(), None);
        assert!(dashboard.grid().raw_cells().all(|c| c.highlighted));
    }

    #[test]
    fn test_rating_distribution() {
        let mut dashboard = Dashboard::new(create_test_dataset());
        let distribution = rating_distribution(&dashboard.grid());

        assert_eq!(distribution[&Rating::Excelente], 1);
        assert_eq!(distribution[&Rating::Bueno], 2);
        assert_eq!(distribution[&Rating::Regular], 2);
        assert_eq!(distribution[&Rating::Bajo], 1);
        assert_eq!(distribution[&Rating::Critico], 3);
        assert_eq!(distribution.values().sum::<usize>(), 9);
    }

    #[test]
    fn test_ranking() {
        let mut dashboard = Dashboard::new(create_test_dataset());
        let ranked = ranking(&dashboard.grid());

        let order: Vec<&str> = ranked.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(order, vec!["Acme", "Initech", "Globex"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rating, Rating::Critico);
    }

    #[test]
    fn test_comparison_series() {
        let mut dashboard = Dashboard::new(create_test_dataset());
        dashboard
            .selection_mut()
            .restrict_metrics(&["Calidad".to_string()])
            .unwrap();
        let series = comparison_series(&dashboard.grid());

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].metric, "Calidad");
        assert_eq!(series[0].average, 130.0 / 3.0);
        assert_eq!(series[0].points[2].company, "Initech");
        assert_eq!(series[0].points[2].value, 50.0);
    }

    #[test]
    fn test_cell_detail() {
        let mut dashboard = Dashboard::new(create_test_dataset());
        let grid = dashboard.grid();

        let detail = cell_detail(&grid, "Acme", "Servicio").unwrap();
        assert_eq!(detail.value, 70.0);
        assert_eq!(detail.metric_average, 30.0);
        assert_eq!(detail.company_average, 80.0);
        assert_eq!(detail.delta_vs_metric, 40.0);

        let row_average = cell_detail(&grid, "Globex", AVERAGE_LABEL).unwrap();
        assert_eq!(row_average.value, 20.0);
        assert_eq!(row_average.metric_average, 20.0);

        let footer = cell_detail(&grid, OVERALL_LABEL, "Servicio").unwrap();
        assert_eq!(footer.value, 30.0);
        assert_eq!(footer.rating, Rating::Bajo);

        assert!(cell_detail(&grid, "Hooli", "Ventas").is_none());
        assert!(cell_detail(&grid, "Acme", "Margen").is_none());
    }
}
