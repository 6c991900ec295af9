//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Rating;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// MetricGrid - company scorecards as emoji grids
///
/// Loads a companies × metrics sheet (scores 0-100), averages the selected
/// rows and columns, and rates every cell from Crítico to Excelente.
///
/// Examples:
///   metricgrid --source empresas.csv
///   metricgrid --source empresas.csv --metrics Ventas,Calidad --format text
///   metricgrid --sheet-id 1AbC... --rating critico
///   metricgrid --source empresas.csv --detail "Acme:Ventas"
///   metricgrid --source empresas.csv --fail-below regular
///   metricgrid --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV file path or http(s) URL of the sheet
    ///
    /// Can also be set via METRICGRID_SOURCE or .metricgrid.toml.
    #[arg(short, long, value_name = "PATH|URL", env = "METRICGRID_SOURCE")]
    pub source: Option<String>,

    /// Google Sheets document id (uses its CSV export)
    #[arg(long, value_name = "ID", conflicts_with = "source")]
    pub sheet_id: Option<String>,

    /// Tab id within the Google Sheets document
    #[arg(long, value_name = "GID", requires = "sheet_id")]
    pub gid: Option<String>,

    /// Header of the column holding company names (default: Empresa)
    #[arg(long, value_name = "NAME")]
    pub company_column: Option<String>,

    /// Companies to include (comma-separated, default: all)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub companies: Option<Vec<String>>,

    /// Metrics to include (comma-separated, default: all)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub metrics: Option<Vec<String>>,

    /// Companies to leave out (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub exclude_companies: Option<Vec<String>>,

    /// Metrics to leave out (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub exclude_metrics: Option<Vec<String>>,

    /// Highlight only cells with this rating
    ///
    /// Values: excelente, bueno, regular, bajo, critico (or the emoji)
    #[arg(long, value_name = "RATING")]
    pub rating: Option<Rating>,

    /// Show the detail panel for one cell, as COMPANY:METRIC
    ///
    /// Use "Promedio" as the metric for a row average and
    /// "Promedio General" as the company for a column average.
    #[arg(long, value_name = "COMPANY:METRIC")]
    pub detail: Option<String>,

    /// Narrow grid columns
    #[arg(long)]
    pub compact: bool,

    /// Output format (markdown, json, text)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path (standard output when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .metricgrid.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// List the companies and metrics with their selection state and exit
    #[arg(long)]
    pub list: bool,

    /// Fail if any selected company's average rates below this level
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is missed.
    #[arg(long, value_name = "RATING")]
    pub fail_below: Option<Rating>,

    /// Generate a default .metricgrid.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// Plain text grid for the terminal
    Text,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref detail) = self.detail {
            if self.detail_target().is_none() {
                return Err(format!(
                    "Invalid --detail '{}': expected COMPANY:METRIC",
                    detail
                ));
            }
        }

        for (flag, names) in [
            ("--companies", &self.companies),
            ("--metrics", &self.metrics),
            ("--exclude-companies", &self.exclude_companies),
            ("--exclude-metrics", &self.exclude_metrics),
        ] {
            if let Some(names) = names {
                if names.iter().any(|n| n.trim().is_empty()) {
                    return Err(format!("{} contains an empty name", flag));
                }
            }
        }

        Ok(())
    }

    /// The cell addressed by `--detail`, split into company and metric.
    pub fn detail_target(&self) -> Option<(String, String)> {
        let (company, metric) = self.detail.as_deref()?.split_once(':')?;
        let (company, metric) = (company.trim(), metric.trim());
        if company.is_empty() || metric.is_empty() {
            return None;
        }
        Some((company.to_string(), metric.to_string()))
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
