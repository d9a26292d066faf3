//! Ingestion of measurement files.
//!
//! ```text
//!  .csv / .xlsx / .xls / .ods
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse file → Vec<Reading>
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter  │  select one test → readings for the analysis
//!   └──────────┘
//! ```

pub mod filter;
pub mod loader;

pub use loader::{load_file, ColumnNames, IngestError};

/// Build a template CSV with the expected header and two example rows.
pub fn template_csv(columns: &ColumnNames) -> Result<String, IngestError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.as_header())?;
    writer.write_record(["Glucose", "Device-1", "2024-01-01", "5.4"])?;
    writer.write_record(["Glucose", "Device-2", "2024-01-01", "5.6"])?;

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
