//! Loading readings from delimited-text and spreadsheet files.
//!
//! Supported formats:
//! * `.csv`                          – header row, one reading per line
//! * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first worksheet, header row first
//!
//! Only the four configured columns are read; any other column is ignored.

use crate::models::Reading;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDateTime, Timelike};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while turning a source file into readings.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file extension: .{0} (expected csv, xlsx, xlsm, xls or ods)")]
    UnsupportedFormat(String),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("spreadsheet contains no worksheets")]
    NoSheets,

    #[error("file has no header row")]
    NoHeader,

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Header names of the four columns a reading is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub test_name: String,
    pub device_id: String,
    pub date: String,
    pub result: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            test_name: "Test Name".to_string(),
            device_id: "Device ID".to_string(),
            date: "Date".to_string(),
            result: "Result".to_string(),
        }
    }
}

impl From<&crate::config::ColumnConfig> for ColumnNames {
    fn from(config: &crate::config::ColumnConfig) -> Self {
        Self {
            test_name: config.test_name.clone(),
            device_id: config.device_id.clone(),
            date: config.date.clone(),
            result: config.result.clone(),
        }
    }
}

impl ColumnNames {
    /// Header names in template order.
    pub fn as_header(&self) -> [&str; 4] {
        [&self.test_name, &self.device_id, &self.date, &self.result]
    }
}

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndices {
    test_name: usize,
    device_id: usize,
    date: usize,
    result: usize,
}

impl ColumnIndices {
    fn resolve(headers: &[String], names: &ColumnNames) -> Result<Self, IngestError> {
        Ok(Self {
            test_name: find_column(headers, &names.test_name)?,
            device_id: find_column(headers, &names.device_id)?,
            date: find_column(headers, &names.date)?,
            result: find_column(headers, &names.result)?,
        })
    }
}

fn find_column(headers: &[String], name: &str) -> Result<usize, IngestError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
}

/// Load readings from a file. Dispatch by extension.
pub fn load_file(path: &Path, columns: &ColumnNames) -> Result<Vec<Reading>, IngestError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let readings = match ext.as_str() {
        "csv" => load_csv(path, columns)?,
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(path, columns)?,
        other => return Err(IngestError::UnsupportedFormat(other.to_string())),
    };

    info!("Loaded {} readings from {}", readings.len(), path.display());
    Ok(readings)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.flexible(true).trim(csv::Trim::All);
    builder
}

fn load_csv(path: &Path, columns: &ColumnNames) -> Result<Vec<Reading>, IngestError> {
    read_csv(File::open(path)?, columns)
}

/// Read CSV data with a header row from any reader.
pub fn read_csv<R: Read>(input: R, columns: &ColumnNames) -> Result<Vec<Reading>, IngestError> {
    let mut reader = csv_builder().from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::NoHeader);
    }
    let indices = ColumnIndices::resolve(&headers, columns)?;

    let mut readings = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            debug!("Skipping blank row {}", line + 2);
            continue;
        }

        let cell = |idx: usize| record.get(idx).unwrap_or("");
        readings.push(Reading {
            test_name: cell(indices.test_name).to_string(),
            device_id: cell(indices.device_id).to_string(),
            date: cell(indices.date).to_string(),
            result: parse_result(cell(indices.result)),
        });
    }

    Ok(readings)
}

/// Parse a result cell. Empty, non-numeric and non-finite cells yield `None`.
pub fn parse_result(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path, columns: &ColumnNames) -> Result<Vec<Reading>, IngestError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(IngestError::NoSheets)?;
    debug!("Reading worksheet '{}'", sheet_name);

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or(IngestError::NoHeader)?
        .iter()
        .map(cell_to_string)
        .collect();
    let indices = ColumnIndices::resolve(&headers, columns)?;

    let text = |row: &[Data], idx: usize| row.get(idx).map(cell_to_string).unwrap_or_default();

    let readings = rows
        .filter(|row| !row.iter().all(|c| matches!(c, Data::Empty)))
        .map(|row| Reading {
            test_name: text(row, indices.test_name),
            device_id: text(row, indices.device_id),
            date: text(row, indices.date),
            result: row.get(indices.result).and_then(cell_to_result),
        })
        .collect();

    Ok(readings)
}

/// Render a spreadsheet cell as trimmed text. Dates become ISO-8601.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(format_datetime)
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.trim().to_string(),
        Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => format!("{e:?}"),
    }
}

fn cell_to_result(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f).filter(|v| v.is_finite()),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_result(s),
        _ => None,
    }
}

fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
