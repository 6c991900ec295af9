//! Data models for the scorecard.
//!
//! This module contains the core data structures used throughout
//! the application for representing the sheet, ratings, and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Qualitative bucket a 0-100 score falls into.
///
/// Variants are declared worst to best so that `Ord` follows quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// 0 to 29
    Critico,
    /// 30 to 49
    Bajo,
    /// 50 to 69, also the fallback for out-of-range values
    Regular,
    /// 70 to 89
    Bueno,
    /// 90 to 100
    Excelente,
}

impl Rating {
    /// All ratings in legend order (best first).
    pub const ALL: [Rating; 5] = [
        Rating::Excelente,
        Rating::Bueno,
        Rating::Regular,
        Rating::Bajo,
        Rating::Critico,
    ];

    /// Classify a score into its bucket.
    ///
    /// Ranges are inclusive integer ranges; a fractional value belongs to the
    /// range of its integer part. Anything outside `[0, 100]` is `Regular`.
    pub fn classify(value: f64) -> Rating {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Rating::Regular;
        }

        let whole = value.floor() as u32;
        Rating::ALL
            .into_iter()
            .find(|rating| {
                let (low, high) = rating.range();
                (low..=high).contains(&whole)
            })
            .unwrap_or(Rating::Regular)
    }

    /// Inclusive bounds of the bucket.
    pub fn range(&self) -> (u32, u32) {
        match self {
            Rating::Excelente => (90, 100),
            Rating::Bueno => (70, 89),
            Rating::Regular => (50, 69),
            Rating::Bajo => (30, 49),
            Rating::Critico => (0, 29),
        }
    }

    /// Returns the emoji used on the grid.
    pub fn emoji(&self) -> &'static str {
        match self {
            Rating::Excelente => "😁",
            Rating::Bueno => "😊",
            Rating::Regular => "😐",
            Rating::Bajo => "😕",
            Rating::Critico => "😢",
        }
    }

    /// Returns the display label.
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Excelente => "Excelente",
            Rating::Bueno => "Bueno",
            Rating::Regular => "Regular",
            Rating::Bajo => "Bajo",
            Rating::Critico => "Crítico",
        }
    }

    /// Look up a rating by its emoji.
    pub fn from_emoji(emoji: &str) -> Option<Rating> {
        Rating::ALL.into_iter().find(|r| r.emoji() == emoji.trim())
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rating) = Rating::from_emoji(s) {
            return Ok(rating);
        }

        match s.trim().to_lowercase().as_str() {
            "excelente" => Ok(Rating::Excelente),
            "bueno" => Ok(Rating::Bueno),
            "regular" => Ok(Rating::Regular),
            "bajo" => Ok(Rating::Bajo),
            "crítico" | "critico" => Ok(Rating::Critico),
            other => Err(format!(
                "Unknown rating '{}'. Expected one of: excelente, bueno, regular, bajo, critico",
                other
            )),
        }
    }
}

/// Parse a raw cell into a score.
///
/// Reads the leading integer (optional sign, then digits) and ignores the
/// rest, so `"85.7"` is 85 and `"12abc"` is 12. Blank or non-numeric cells
/// are 0.
pub fn parse_score(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

/// One company's row of raw sheet values, keyed by metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRow {
    /// Company name (the `Empresa` column).
    pub company: String,
    /// Raw cell text per metric.
    pub values: BTreeMap<String, String>,
}

impl CompanyRow {
    /// Parsed score for a metric; missing cells are 0.
    pub fn score(&self, metric: &str) -> i64 {
        self.values.get(metric).map(|v| parse_score(v)).unwrap_or(0)
    }
}

/// The loaded companies × metrics table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Header of the company column, as written in the sheet.
    #[serde(default)]
    pub company_column: String,
    /// Company names in sheet order.
    pub companies: Vec<String>,
    /// Metric names in header order.
    pub metrics: Vec<String>,
    /// One row per company.
    pub rows: Vec<CompanyRow>,
}

impl Dataset {
    /// Find a company's row.
    pub fn row(&self, company: &str) -> Option<&CompanyRow> {
        self.rows.iter().find(|r| r.company == company)
    }

    /// Parsed score for a cell; unknown companies or metrics are 0.
    #[allow(dead_code)] // Lookup utility
    pub fn value(&self, company: &str, metric: &str) -> i64 {
        self.row(company).map(|r| r.score(metric)).unwrap_or(0)
    }

    /// Returns true if the sheet has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything known about one grid cell, as shown in the detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDetail {
    pub company: String,
    pub metric: String,
    pub value: f64,
    pub rating: Rating,
    /// Average of this metric over the selected companies.
    pub metric_average: f64,
    pub metric_rating: Rating,
    /// Average of this company over the selected metrics.
    pub company_average: f64,
    pub company_rating: Rating,
    /// `value - metric_average`
    pub delta_vs_metric: f64,
    /// `value - company_average`
    pub delta_vs_company: f64,
}

impl CellDetail {
    /// Build a detail record and derive the ratings and deltas.
    pub fn new(
        company: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        metric_average: f64,
        company_average: f64,
    ) -> Self {
        Self {
            company: company.into(),
            metric: metric.into(),
            value,
            rating: Rating::classify(value),
            metric_average,
            metric_rating: Rating::classify(metric_average),
            company_average,
            company_rating: Rating::classify(company_average),
            delta_vs_metric: value - metric_average,
            delta_vs_company: value - company_average,
        }
    }
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the sheet was loaded from.
    pub source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Companies in the sheet / currently selected.
    pub companies_total: usize,
    pub companies_selected: usize,
    /// Metrics in the sheet / currently selected.
    pub metrics_total: usize,
    pub metrics_selected: usize,
    /// Header of the company column, used as the grid's first header.
    pub company_column: String,
    /// Active highlight filter, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_filter: Option<Rating>,
}

/// The complete scorecard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// The emoji grid over the current selection.
    pub grid: crate::analysis::EmojiGrid,
    /// Raw cells per rating.
    pub distribution: BTreeMap<Rating, usize>,
    /// Selected companies by average, best first.
    pub ranking: Vec<crate::analysis::RankedCompany>,
    /// Per-metric series for chart consumers.
    pub series: Vec<crate::analysis::MetricSeries>,
    /// Detail record requested with `--detail`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<CellDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_boundaries() {
        assert_eq!(Rating::classify(100.0), Rating::Excelente);
        assert_eq!(Rating::classify(90.0), Rating::Excelente);
        assert_eq!(Rating::classify(89.0), Rating::Bueno);
        assert_eq!(Rating::classify(70.0), Rating::Bueno);
        assert_eq!(Rating::classify(69.0), Rating::Regular);
        assert_eq!(Rating::classify(50.0), Rating::Regular);
        assert_eq!(Rating::classify(49.0), Rating::Bajo);
        assert_eq!(Rating::classify(30.0), Rating::Bajo);
        assert_eq!(Rating::classify(29.0), Rating::Critico);
        assert_eq!(Rating::classify(0.0), Rating::Critico);
    }

    #[test]
    fn test_rating_fractional_values_use_integer_part() {
        assert_eq!(Rating::classify(89.5), Rating::Bueno);
        assert_eq!(Rating::classify(29.99), Rating::Critico);
        assert_eq!(Rating::classify(99.9), Rating::Excelente);
    }

    #[test]
    fn test_rating_out_of_range_falls_back_to_regular() {
        assert_eq!(Rating::classify(-1.0), Rating::Regular);
        assert_eq!(Rating::classify(100.5), Rating::Regular);
        assert_eq!(Rating::classify(250.0), Rating::Regular);
        assert_eq!(Rating::classify(f64::NAN), Rating::Regular);
    }

    #[test]
    fn test_rating_ordering() {
        assert!(Rating::Critico < Rating::Bajo);
        assert!(Rating::Bajo < Rating::Regular);
        assert!(Rating::Regular < Rating::Bueno);
        assert!(Rating::Bueno < Rating::Excelente);
    }

    #[test]
    fn test_rating_from_str() {
        assert_eq!("excelente".parse::<Rating>(), Ok(Rating::Excelente));
        assert_eq!("CRÍTICO".parse::<Rating>(), Ok(Rating::Critico));
        assert_eq!("critico".parse::<Rating>(), Ok(Rating::Critico));
        assert_eq!("😊".parse::<Rating>(), Ok(Rating::Bueno));
        assert!("great".parse::<Rating>().is_err());
    }

    #[test]
    fn test_rating_emoji_and_label() {
        assert_eq!(Rating::Excelente.emoji(), "😁");
        assert_eq!(Rating::Critico.label(), "Crítico");
        assert_eq!(Rating::from_emoji("😕"), Some(Rating::Bajo));
        assert_eq!(Rating::from_emoji("🙂"), None);
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("85"), 85);
        assert_eq!(parse_score(" 85.7"), 85);
        assert_eq!(parse_score("12abc"), 12);
        assert_eq!(parse_score("-5"), -5);
        assert_eq!(parse_score(""), 0);
        assert_eq!(parse_score("n/a"), 0);
        assert_eq!(parse_score("-"), 0);
    }

    #[test]
    fn test_dataset_value_defaults_to_zero() {
        let dataset = Dataset {
            companies: vec!["Acme".to_string()],
            metrics: vec!["Ventas".to_string(), "Calidad".to_string()],
            rows: vec![CompanyRow {
                company: "Acme".to_string(),
                values: [("Ventas".to_string(), "77".to_string())]
                    .into_iter()
                    .collect(),
            }],
            ..Dataset::default()
        };

        assert_eq!(dataset.value("Acme", "Ventas"), 77);
        assert_eq!(dataset.value("Acme", "Calidad"), 0);
        assert_eq!(dataset.value("Globex", "Ventas"), 0);
    }

    #[test]
    fn test_cell_detail_deltas() {
        let detail = CellDetail::new("Acme", "Ventas", 80.0, 60.0, 95.0);
        assert_eq!(detail.rating, Rating::Bueno);
        assert_eq!(detail.metric_rating, Rating::Regular);
        assert_eq!(detail.company_rating, Rating::Excelente);
        assert_eq!(detail.delta_vs_metric, 20.0);
        assert_eq!(detail.delta_vs_company, -15.0);
    }
}
