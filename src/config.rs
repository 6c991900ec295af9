//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.metricgrid.toml` files.

use crate::cli::OutputFormat;
use crate::models::Rating;
use crate::sheet::{sheet_export_url, DEFAULT_COMPANY_COLUMN};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".metricgrid.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Sheet source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Initial selection.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path. Standard output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Where to read the sheet from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// CSV path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Google Sheets document id, used when `location` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,

    /// Tab id within the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,

    /// Header of the company column.
    #[serde(default = "default_company_column")]
    pub company_column: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: None,
            sheet_id: None,
            gid: None,
            company_column: default_company_column(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_company_column() -> String {
    DEFAULT_COMPANY_COLUMN.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Which companies and metrics start selected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Companies to show. Empty means all.
    #[serde(default)]
    pub companies: Vec<String>,

    /// Metrics to show. Empty means all.
    #[serde(default)]
    pub metrics: Vec<String>,

    /// Rating to highlight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Narrow grid columns in text output.
    #[serde(default)]
    pub compact: bool,

    /// Include the rating distribution section.
    #[serde(default = "default_true")]
    pub include_distribution: bool,

    /// Include the company ranking section.
    #[serde(default = "default_true")]
    pub include_ranking: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            compact: false,
            include_distribution: true,
            include_ranking: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref source) = args.source {
            self.source.location = Some(source.clone());
        }
        if let Some(ref sheet_id) = args.sheet_id {
            self.source.location = None;
            self.source.sheet_id = Some(sheet_id.clone());
        }
        if let Some(ref gid) = args.gid {
            self.source.gid = Some(gid.clone());
        }
        if let Some(ref column) = args.company_column {
            self.source.company_column = column.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        if let Some(ref companies) = args.companies {
            self.selection.companies = companies.clone();
        }
        if let Some(ref metrics) = args.metrics {
            self.selection.metrics = metrics.clone();
        }
        if args.rating.is_some() {
            self.selection.rating = args.rating;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        // Flags always override
        if args.compact {
            self.report.compact = true;
        }
    }

    /// Check merged values that argument validation cannot see.
    pub fn validate(&self) -> Result<()> {
        if self.source.timeout_seconds == 0 {
            anyhow::bail!("[source] timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// The sheet location: an explicit path/URL, else the export URL of `sheet_id`.
    pub fn source_location(&self) -> Option<String> {
        if let Some(ref location) = self.source.location {
            return Some(location.clone());
        }
        self.source
            .sheet_id
            .as_deref()
            .map(|id| sheet_export_url(id, self.source.gid.as_deref()))
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
