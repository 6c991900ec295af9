//! Fetching sheet contents from disk or over HTTP.

use super::{parse_csv, DataError, DEFAULT_COMPANY_COLUMN};
use crate::models::Dataset;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where a sheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Local CSV file.
    File(PathBuf),
    /// `http://` or `https://` URL returning CSV.
    Url(String),
}

impl Source {
    /// Interpret a location string: URLs by scheme, anything else as a path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location.to_string())
        } else {
            Source::File(PathBuf::from(location))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => write!(f, "{}", url),
        }
    }
}

/// CSV export URL for a Google Sheets document.
///
/// `gid` selects a tab; the first tab is used when it is `None`.
pub fn sheet_export_url(sheet_id: &str, gid: Option<&str>) -> String {
    let mut url = format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
        sheet_id.trim()
    );
    if let Some(gid) = gid {
        url.push_str("&gid=");
        url.push_str(gid.trim());
    }
    url
}

/// Options for loading a sheet.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Header of the column holding company names.
    pub company_column: String,
    /// HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to show a spinner while loading.
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            company_column: DEFAULT_COMPANY_COLUMN.to_string(),
            timeout_seconds: 30,
            show_progress: true,
        }
    }
}

/// Load and parse a sheet.
pub async fn load_dataset(source: &Source, options: &LoadOptions) -> Result<Dataset, DataError> {
    info!("Loading sheet from: {}", source);

    let spinner = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Cargando datos...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let text = match source {
        Source::File(path) => read_file(path).await,
        Source::Url(url) => fetch_url(url, options.timeout_seconds).await,
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let text = text?;
    debug!("Read {} bytes from {}", text.len(), source);

    parse_csv(&text, &options.company_column)
}

async fn read_file(path: &Path) -> Result<String, DataError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })
}

async fn fetch_url(url: &str, timeout_seconds: u64) -> Result<String, DataError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?;

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DataError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.text().await?)
}
