//! Report rendering.
//!
//! This module turns a [`Report`] into Markdown, a fixed-width terminal
//! grid, or JSON.

use crate::analysis::{EmojiGrid, GridCell, RankedCompany, AVERAGE_LABEL};
use crate::models::{CellDetail, Rating, Report, ReportMetadata};
use anyhow::Result;
use std::collections::BTreeMap;

/// Placeholder for cells dimmed by the rating filter.
const DIMMED: &str = "·";

/// Which optional sections to render.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub compact: bool,
    pub include_distribution: bool,
    pub include_ranking: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            compact: false,
            include_distribution: true,
            include_ranking: true,
        }
    }
}

impl From<&crate::config::ReportConfig> for RenderOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            compact: config.compact,
            include_distribution: config.include_distribution,
            include_ranking: config.include_ranking,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Análisis Empresarial\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_legend_section(report.metadata.rating_filter));
    output.push_str(&generate_grid_section(
        &report.grid,
        &report.metadata.company_column,
    ));

    if options.include_distribution {
        output.push_str(&generate_distribution_section(&report.distribution));
    }
    if options.include_ranking {
        output.push_str(&generate_ranking_section(
            &report.ranking,
            &report.metadata.company_column,
        ));
    }
    if let Some(ref detail) = report.detail {
        output.push_str(&generate_detail_section(detail));
    }

    output.push_str(&generate_footer());
    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Companies:** {} of {}\n",
        metadata.companies_selected, metadata.companies_total
    ));
    section.push_str(&format!(
        "- **Metrics:** {} of {}\n",
        metadata.metrics_selected, metadata.metrics_total
    ));
    if let Some(rating) = metadata.rating_filter {
        section.push_str(&format!(
            "- **Highlighting:** {} {}\n",
            rating.emoji(),
            rating.label()
        ));
    }
    section.push('\n');

    section
}

/// Generate the rating legend.
fn generate_legend_section(filter: Option<Rating>) -> String {
    let mut section = String::new();

    section.push_str("## Legend\n\n");
    section.push_str("| | Rating | Range |\n");
    section.push_str("|:---:|:---|:---:|\n");
    for rating in Rating::ALL {
        let (low, high) = rating.range();
        let label = if filter == Some(rating) {
            format!("**{}**", rating.label())
        } else {
            rating.label().to_string()
        };
        section.push_str(&format!(
            "| {} | {} | {}-{} |\n",
            rating.emoji(),
            label,
            low,
            high
        ));
    }
    section.push('\n');

    section
}

/// Escape text for use inside a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Format a cell as emoji plus value, or the dimmed placeholder.
fn format_cell(cell: &GridCell, is_average: bool) -> String {
    if !cell.highlighted {
        return DIMMED.to_string();
    }
    if is_average {
        format!("{} {:.1}", cell.rating.emoji(), cell.value)
    } else {
        format!("{} {}", cell.rating.emoji(), cell.value)
    }
}

/// Generate the emoji grid as a Markdown table.
fn generate_grid_section(grid: &EmojiGrid, company_column: &str) -> String {
    let mut section = String::new();

    section.push_str("## Grid\n\n");

    if grid.is_empty() {
        section.push_str("No companies or metrics selected.\n\n");
        return section;
    }

    // Header
    section.push_str(&format!("| {} |", escape_cell(company_column)));
    for metric in &grid.metrics {
        section.push_str(&format!(" {} |", escape_cell(metric)));
    }
    section.push_str(&format!(" {} |\n", AVERAGE_LABEL));

    section.push_str("|:---|");
    section.push_str(&":---:|".repeat(grid.metrics.len() + 1));
    section.push('\n');

    // Company rows
    for row in &grid.rows {
        section.push_str(&format!("| {} |", escape_cell(&row.company)));
        for cell in &row.cells {
            section.push_str(&format!(" {} |", format_cell(cell, false)));
        }
        section.push_str(&format!(" {} |\n", format_cell(&row.average, true)));
    }

    // Footer
    section.push_str(&format!("| **{}** |", AVERAGE_LABEL));
    for cell in &grid.column_averages {
        section.push_str(&format!(" {} |", format_cell(cell, true)));
    }
    section.push_str(" |\n\n");

    section
}

/// Generate the rating distribution section.
fn generate_distribution_section(distribution: &BTreeMap<Rating, usize>) -> String {
    let total: usize = distribution.values().sum();
    if total == 0 {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Distribution\n\n");
    section.push_str("| Rating | Cells | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");

    for rating in Rating::ALL {
        let count = distribution.get(&rating).copied().unwrap_or(0);
        section.push_str(&format!(
            "| {} {} | {} | {:.0}% |\n",
            rating.emoji(),
            rating.label(),
            count,
            count as f64 * 100.0 / total as f64
        ));
    }
    section.push('\n');

    section
}

/// Generate the ranking section.
fn generate_ranking_section(ranking: &[RankedCompany], company_column: &str) -> String {
    if ranking.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Ranking\n\n");
    section.push_str(&format!(
        "| # | {} | {} | |\n",
        escape_cell(company_column),
        AVERAGE_LABEL
    ));
    section.push_str("|:---:|:---|:---:|:---:|\n");

    for entry in ranking {
        section.push_str(&format!(
            "| {} | {} | {:.1} | {} {} |\n",
            entry.rank,
            escape_cell(&entry.company),
            entry.average,
            entry.rating.emoji(),
            entry.rating.label()
        ));
    }
    section.push('\n');

    section
}

/// Generate the cell detail section.
fn generate_detail_section(detail: &CellDetail) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## Detail: {} / {}\n\n",
        detail.company, detail.metric
    ));
    section.push_str(&format!(
        "- **Value:** {} {:.1} ({})\n",
        detail.rating.emoji(),
        detail.value,
        detail.rating.label()
    ));
    section.push_str(&format!(
        "- **Metric average:** {} {:.1} ({:+.1})\n",
        detail.metric_rating.emoji(),
        detail.metric_average,
        detail.delta_vs_metric
    ));
    section.push_str(&format!(
        "- **Company average:** {} {:.1} ({:+.1})\n\n",
        detail.company_rating.emoji(),
        detail.company_average,
        detail.delta_vs_company
    ));

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by MetricGrid*\n".to_string()
}

/// Terminal columns taken by a string; emoji occupy two.
fn display_width(s: &str) -> usize {
    s.chars()
        .map(|c| if (c as u32) >= 0x1F000 { 2 } else { 1 })
        .sum()
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{}{}", s, " ".repeat(fill))
}

/// Generate a fixed-width grid for the terminal.
///
/// Compact mode narrows the metric columns and truncates their headers.
pub fn generate_text_report(report: &Report, options: RenderOptions) -> String {
    let grid = &report.grid;
    let mut output = String::new();

    output.push_str("Análisis Empresarial - Gráfico de Emoticones\n\n");

    if grid.is_empty() {
        output.push_str("No companies or metrics selected.\n");
        return output;
    }

    let cell_width = if options.compact { 8 } else { 12 };
    let name_width = grid
        .rows
        .iter()
        .map(|r| display_width(&r.company))
        .chain(std::iter::once(display_width(AVERAGE_LABEL)))
        .max()
        .unwrap_or(0)
        + 2;

    let header = |name: &str| -> String {
        let max = cell_width - 1;
        if options.compact && name.chars().count() > max {
            let truncated: String = name.chars().take(max - 1).collect();
            format!("{}…", truncated)
        } else {
            name.to_string()
        }
    };

    // Header
    output.push_str(&pad("", name_width));
    for metric in &grid.metrics {
        output.push_str(&pad(&header(metric), cell_width));
    }
    output.push_str(AVERAGE_LABEL);
    output.push('\n');

    // Company rows
    for row in &grid.rows {
        output.push_str(&pad(&row.company, name_width));
        for cell in &row.cells {
            output.push_str(&pad(&format_cell(cell, false), cell_width));
        }
        output.push_str(&format_cell(&row.average, true));
        output.push('\n');
    }

    // Footer
    output.push_str(&pad(AVERAGE_LABEL, name_width));
    for cell in &grid.column_averages {
        output.push_str(&pad(&format_cell(cell, true), cell_width));
    }
    output.push('\n');

    // Legend
    output.push('\n');
    let legend: Vec<String> = Rating::ALL
        .iter()
        .map(|r| {
            let marker = if report.metadata.rating_filter == Some(*r) {
                "*"
            } else {
                ""
            };
            format!("{} {}{}", r.emoji(), r.label(), marker)
        })
        .collect();
    output.push_str(&legend.join("  "));
    output.push('\n');

    if options.include_ranking && !report.ranking.is_empty() {
        output.push_str("\nRanking:\n");
        for entry in &report.ranking {
            output.push_str(&format!(
                "  {:>2}. {} {:.1} {}\n",
                entry.rank,
                pad(&entry.company, name_width),
                entry.average,
                entry.rating.emoji()
            ));
        }
    }

    if let Some(ref detail) = report.detail {
        output.push_str(&format!(
            "\n{} / {}: {} {:.1} (metric avg {:.1}, company avg {:.1})\n",
            detail.company,
            detail.metric,
            detail.rating.emoji(),
            detail.value,
            detail.metric_average,
            detail.company_average
        ));
    }

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
