//! Data models for the device comparison.
//!
//! This module contains the core data structures used throughout
//! the application for representing readings, per-device statistics,
//! chart series and the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single ingested row, before its result has been validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Name of the test (analyte) the row belongs to.
    pub test_name: String,
    /// Identifier of the device that produced the reading.
    pub device_id: String,
    /// Date of the reading, as supplied by the source file.
    pub date: String,
    /// Numeric result, or `None` when the cell was empty or not a number.
    pub result: Option<f64>,
}

impl Reading {
    /// Creates a reading with a numeric result.
    #[cfg(test)]
    pub fn new(test_name: &str, device_id: &str, date: &str, result: f64) -> Self {
        Self {
            test_name: test_name.to_string(),
            device_id: device_id.to_string(),
            date: date.to_string(),
            result: Some(result),
        }
    }

    /// Returns the result if it is a finite number.
    pub fn finite_result(&self) -> Option<f64> {
        self.result.filter(|v| v.is_finite())
    }
}

/// A validated measurement. The result is always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub test_name: String,
    pub device_id: String,
    pub date: String,
    pub result: f64,
}

/// The working set of records for one analysis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    /// Records with a finite result, in input order.
    pub records: Vec<Record>,
    /// Number of selected readings dropped because their result was unusable.
    pub excluded: usize,
}

impl RecordSet {
    /// Builds a record set from readings, dropping those without a finite result.
    pub fn from_readings<'a, I>(readings: I) -> Self
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let mut set = Self::default();

        for reading in readings {
            match reading.finite_result() {
                Some(result) => set.records.push(Record {
                    test_name: reading.test_name.clone(),
                    device_id: reading.device_id.clone(),
                    date: reading.date.clone(),
                    result,
                }),
                None => set.excluded += 1,
            }
        }

        set
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Descriptive statistics for one device.
///
/// Fields are flat and in export order so a generic tabular
/// serializer can write them without mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub device: String,
    pub mean: f64,
    /// Sample standard deviation, `None` for a single reading.
    pub sd: Option<f64>,
    /// Coefficient of variation in percent, `None` when undefined.
    pub cv: Option<f64>,
    pub median: f64,
    /// Interquartile range using nearest-rank quartiles.
    pub iqr: f64,
    pub count: usize,
}

impl DeviceStats {
    /// Whether the coefficient of variation exceeds `threshold` percent.
    pub fn cv_exceeds(&self, threshold: f64) -> bool {
        self.cv.is_some_and(|cv| cv > threshold)
    }
}

/// Pooled mean and standard deviation across all devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub mean: f64,
    /// Sample standard deviation, 0 when fewer than two results.
    pub sd: f64,
}

/// A record together with its deviation from the overall population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentedRow {
    #[serde(flatten)]
    pub record: Record,
    /// Standardized deviation from the population mean.
    pub z: f64,
    /// Deviation from the population mean, in percent of the mean.
    pub deviation_percent: f64,
}

impl AugmentedRow {
    /// Whether `|z|` exceeds `threshold`.
    pub fn is_outlier(&self, threshold: f64) -> bool {
        self.z.abs() > threshold
    }
}

/// Values of one device aligned to the report's date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTrace {
    pub device: String,
    /// One slot per date; `None` where the device has no reading that day.
    pub values: Vec<Option<f64>>,
}

/// Raw results of one device, in encounter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDistribution {
    pub device: String,
    pub values: Vec<f64>,
}

/// Chart-ready projections of a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// Sorted distinct dates forming the x axis of `time_series`.
    pub dates: Vec<String>,
    pub time_series: Vec<DeviceTrace>,
    pub distribution_series: Vec<DeviceDistribution>,
}

impl ChartSeries {
    /// Looks up the aligned time series of a device.
    #[cfg(test)]
    pub fn trace(&self, device: &str) -> Option<&[Option<f64>]> {
        self.time_series
            .iter()
            .find(|t| t.device == device)
            .map(|t| t.values.as_slice())
    }

    /// Looks up the raw value distribution of a device.
    #[cfg(test)]
    pub fn distribution(&self, device: &str) -> Option<&[f64]> {
        self.distribution_series
            .iter()
            .find(|d| d.device == device)
            .map(|d| d.values.as_slice())
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Per-device statistics in first-seen device order.
    pub device_stats: Vec<DeviceStats>,
    /// One row per analysed record, in input order.
    pub rows: Vec<AugmentedRow>,
    pub series: ChartSeries,
    pub population: PopulationStats,
    /// Selected readings left out because their result was not numeric.
    pub excluded_records: usize,
}

impl AnalysisReport {
    /// Devices whose coefficient of variation exceeds `threshold`.
    pub fn flagged_devices(&self, threshold: f64) -> Vec<&DeviceStats> {
        self.device_stats
            .iter()
            .filter(|s| s.cv_exceeds(threshold))
            .collect()
    }

    /// Rows whose `|z|` exceeds `threshold`.
    pub fn outlier_rows(&self, threshold: f64) -> Vec<&AugmentedRow> {
        self.rows.iter().filter(|r| r.is_outlier(threshold)).collect()
    }
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the ingested file.
    pub source_file: String,
    /// Test the analysis was restricted to, `None` for all tests.
    pub selected_test: Option<String>,
    /// Date and time of the analysis.
    pub generated_at: DateTime<Utc>,
    /// Number of records that entered the analysis.
    pub records_analyzed: usize,
    /// Number of selected readings excluded as malformed.
    pub records_excluded: usize,
    /// Number of distinct devices.
    pub device_count: usize,
    /// Duration of ingestion and analysis in seconds.
    pub duration_seconds: f64,
}

/// The complete comparison report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub analysis: AnalysisReport,
}
