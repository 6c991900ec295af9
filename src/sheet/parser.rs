//! CSV parsing for exported score sheets.
//!
//! The first non-empty record is the header. One column names the company
//! (`Empresa` by default); every other named column is a metric.

use super::DataError;
use crate::models::{CompanyRow, Dataset};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Default name of the company column.
pub const DEFAULT_COMPANY_COLUMN: &str = "Empresa";

/// Parse CSV text into a dataset.
pub fn parse_csv(text: &str, company_column: &str) -> Result<Dataset, DataError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text)?
        .into_iter()
        .filter(|record| record.iter().any(|field| !field.trim().is_empty()));

    let header = records.next().ok_or(DataError::EmptySheet)?;
    let header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let company_index = header
        .iter()
        .position(|h| h.eq_ignore_ascii_case(company_column.trim()))
        .ok_or_else(|| DataError::MissingCompanyColumn(company_column.to_string()))?;

    let mut metrics: Vec<(usize, String)> = Vec::new();
    for (index, name) in header.iter().enumerate() {
        if index == company_index || name.is_empty() {
            continue;
        }
        if metrics.iter().any(|(_, existing)| existing == name) {
            return Err(DataError::DuplicateMetric(name.clone()));
        }
        metrics.push((index, name.clone()));
    }

    let mut dataset = Dataset {
        company_column: header[company_index].clone(),
        metrics: metrics.iter().map(|(_, name)| name.clone()).collect(),
        ..Dataset::default()
    };
    let mut seen = HashSet::new();

    for record in records {
        let company = record
            .get(company_index)
            .map(|c| c.trim())
            .unwrap_or_default();

        if company.is_empty() {
            warn!("Skipping row with no company name: {:?}", record);
            continue;
        }

        if !seen.insert(company.to_string()) {
            return Err(DataError::DuplicateCompany(company.to_string()));
        }

        let values: BTreeMap<String, String> = metrics
            .iter()
            .filter_map(|(index, name)| {
                record
                    .get(*index)
                    .map(|value| (name.clone(), value.trim().to_string()))
            })
            .collect();

        dataset.companies.push(company.to_string());
        dataset.rows.push(CompanyRow {
            company: company.to_string(),
            values,
        });
    }

    debug!(
        "Parsed sheet: {} companies, {} metrics",
        dataset.companies.len(),
        dataset.metrics.len()
    );

    Ok(dataset)
}

/// Split CSV text into records.
///
/// Handles quoted fields with embedded commas, newlines and doubled quotes.
fn split_records(text: &str) -> Result<Vec<Vec<String>>, DataError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                quote_line = line;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DataError::UnterminatedQuote(quote_line));
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
