//! Normalized record file loading.
//!
//! The extraction collaborator (spreadsheet tooling upstream of this binary)
//! produces one row per taxpayer registration. This module only parses and
//! normalizes those rows — there is no column-mapping or spreadsheet logic
//! here. Rows with an unparseable principal value become non-executable
//! records rather than load failures, so the whole file is always visible to
//! `inspect` and the skip reporting.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use darweb_core_types::{DaeRecord, RefPeriod};
use serde::Deserialize;
use tracing::warn;

/// One row of a normalized record file (.csv with headers, or a .json array).
#[derive(Debug, Deserialize)]
pub struct RecordRow {
    pub ie: String,
    pub due_date: String,
    pub payment_date: String,
    #[serde(default)]
    pub principal_value: Option<String>,
}

/// Load and normalize a record file, attaching the resolved reference period.
pub fn load_records(path: &Path, period: RefPeriod) -> Result<Vec<DaeRecord>> {
    let rows = read_rows(path)?;
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            to_record(row, period).with_context(|| format!("record #{} in {}", index + 1, path.display()))
        })
        .collect()
}

fn read_rows(path: &Path) -> Result<Vec<RecordRow>> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
    } else {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<RecordRow>, _>>()
            .with_context(|| format!("invalid CSV in {}", path.display()))
    }
}

fn to_record(row: RecordRow, period: RefPeriod) -> Result<DaeRecord> {
    let ie = normalize_ie(&row.ie);
    let due_date = parse_date(&row.due_date)
        .with_context(|| format!("invalid due date '{}' for IE {}", row.due_date, ie))?;
    let payment_date = parse_date(&row.payment_date)
        .with_context(|| format!("invalid payment date '{}' for IE {}", row.payment_date, ie))?;

    let principal_value = match row.principal_value.as_deref() {
        None => None,
        Some(raw) => {
            let parsed = parse_decimal(raw);
            if parsed.is_none() && !raw.trim().is_empty() && raw.trim() != "-" {
                warn!(ie = %ie, raw, "principal value not numeric, record will be skipped");
            }
            parsed
        }
    };

    DaeRecord::new(ie, period, due_date, payment_date, principal_value).map_err(Into::into)
}

/// Strip the display punctuation from a registration id.
pub fn normalize_ie(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '/' | ' '))
        .collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(Into::into)
}

/// Accept both pt-BR ("1.234,56", "R$ 250,00") and plain ("1234.56") decimals.
/// Anything non-numeric maps to `None`, marking the record non-executable.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches("R$").trim();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.to_string()
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn period() -> RefPeriod {
        RefPeriod::new(6, 2026).unwrap()
    }

    #[test]
    fn ie_normalization_strips_display_punctuation() {
        assert_eq!(normalize_ie(" 19.012.345-6 "), "190123456");
        assert_eq!(normalize_ie("190123456"), "190123456");
    }

    #[test]
    fn decimal_parsing_accepts_both_conventions() {
        assert_eq!(parse_decimal("1.234,56"), Some(1234.56));
        assert_eq!(parse_decimal("R$ 250,00"), Some(250.0));
        assert_eq!(parse_decimal("1234.56"), Some(1234.56));
        assert_eq!(parse_decimal("0"), Some(0.0));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("-"), None);
        assert_eq!(parse_decimal("sem valor"), None);
    }

    #[test]
    fn csv_files_load_with_headers() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "ie,due_date,payment_date,principal_value").unwrap();
        writeln!(file, "19.012.345-6,15/07/2026,10/07/2026,\"1.234,56\"").unwrap();
        writeln!(file, "190000002,2026-07-15,2026-07-10,").unwrap();

        let records = load_records(file.path(), period()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ie, "190123456");
        assert_eq!(records[0].principal_value, Some(1234.56));
        assert!(records[0].is_executable());
        assert_eq!(records[0].due_date.format("%d/%m/%Y").to_string(), "15/07/2026");
        assert!(!records[1].is_executable());
    }

    #[test]
    fn json_files_load_as_row_arrays() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"ie": "190000001", "due_date": "15/07/2026", "payment_date": "10/07/2026", "principal_value": "100,00"}}]"#
        )
        .unwrap();

        let records = load_records(file.path(), period()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].principal_value, Some(100.0));
        assert_eq!(records[0].reference.formatted(), "06/2026");
    }

    #[test]
    fn bad_dates_fail_loading_with_context() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "ie,due_date,payment_date,principal_value").unwrap();
        writeln!(file, "190000001,31/02/2026,10/07/2026,10").unwrap();

        let err = load_records(file.path(), period()).unwrap_err();
        assert!(format!("{err:#}").contains("due date"));
    }

    #[test]
    fn unparseable_values_mark_the_record_non_executable() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "ie,due_date,payment_date,principal_value").unwrap();
        writeln!(file, "190000001,15/07/2026,10/07/2026,aguardando").unwrap();

        let records = load_records(file.path(), period()).unwrap();
        assert!(!records[0].is_executable());
    }
}
