//! Markdown and JSON report generation.
//!
//! This module renders a [`Report`] for reading. Numbers are rounded
//! for display only; the JSON report keeps full precision.

use crate::config::ReportConfig;
use crate::models::{AnalysisReport, DeviceStats, Report, ReportMetadata};
use anyhow::Result;

const FLAG: &str = "⚠️";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, settings: &ReportConfig) -> String {
    let mut output = String::new();
    let analysis = &report.analysis;

    // Title
    output.push_str("# EQA Comparison Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&generate_device_stats_section(analysis, settings));

    if settings.include_rows {
        output.push_str(&generate_rows_section(analysis, settings));
    }

    if settings.include_time_series {
        output.push_str(&generate_time_series_section(analysis, settings));
    }

    if settings.include_distribution {
        output.push_str(&generate_distribution_section(analysis, settings));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source File:** `{}`\n", metadata.source_file));
    section.push_str(&format!(
        "- **Test:** {}\n",
        metadata.selected_test.as_deref().unwrap_or("All tests")
    ));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Devices:** {}\n", metadata.device_count));
    section.push_str(&format!(
        "- **Records Analyzed:** {}\n",
        metadata.records_analyzed
    ));
    if metadata.records_excluded > 0 {
        section.push_str(&format!(
            "- **Records Excluded (no numeric result):** {}\n",
            metadata.records_excluded
        ));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.3}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the per-device statistics table.
fn generate_device_stats_section(analysis: &AnalysisReport, settings: &ReportConfig) -> String {
    let mut section = String::new();
    let decimals = settings.decimals;

    section.push_str("## Device Statistics\n\n");
    section.push_str("| Device | N | Mean | SD | CV % | Median | IQR |\n");
    section.push_str("|:---|---:|---:|---:|---:|---:|---:|\n");

    for stats in &analysis.device_stats {
        section.push_str(&generate_device_row(stats, settings));
    }
    section.push('\n');

    let flagged = analysis.flagged_devices(settings.cv_flag_threshold);
    if !flagged.is_empty() {
        section.push_str(&format!(
            "{} {} device(s) with CV above {}%: {}\n\n",
            FLAG,
            flagged.len(),
            settings.cv_flag_threshold,
            flagged
                .iter()
                .map(|s| escape_cell(&s.device))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    section.push_str(&format!(
        "Overall mean: {} | Overall SD: {}\n\n",
        format_value(analysis.population.mean, decimals),
        format_value(analysis.population.sd, decimals)
    ));

    section
}

/// Generate a single device statistics row.
fn generate_device_row(stats: &DeviceStats, settings: &ReportConfig) -> String {
    let decimals = settings.decimals;

    let cv = match stats.cv {
        Some(cv) if stats.cv_exceeds(settings.cv_flag_threshold) => {
            format!("**{}** {}", format_value(cv, decimals), FLAG)
        }
        other => format_optional(other, decimals),
    };

    format!(
        "| {} | {} | {} | {} | {} | {} | {} |\n",
        escape_cell(&stats.device),
        stats.count,
        format_value(stats.mean, decimals),
        format_optional(stats.sd, decimals),
        cv,
        format_value(stats.median, decimals),
        format_value(stats.iqr, decimals),
    )
}

/// Generate the per-reading deviation table.
fn generate_rows_section(analysis: &AnalysisReport, settings: &ReportConfig) -> String {
    let mut section = String::new();
    let decimals = settings.decimals;

    section.push_str("## Readings\n\n");
    section.push_str("| Test | Device | Date | Result | Z | Deviation % |\n");
    section.push_str("|:---|:---|:---|---:|---:|---:|\n");

    for row in &analysis.rows {
        let z = if row.is_outlier(settings.z_flag_threshold) {
            format!("**{}** {}", format_value(row.z, decimals), FLAG)
        } else {
            format_value(row.z, decimals)
        };

        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            escape_cell(&row.record.test_name),
            escape_cell(&row.record.device_id),
            escape_cell(&row.record.date),
            format_value(row.record.result, decimals),
            z,
            format_value(row.deviation_percent, decimals),
        ));
    }
    section.push('\n');

    let outliers = analysis.outlier_rows(settings.z_flag_threshold).len();
    if outliers > 0 {
        section.push_str(&format!(
            "{} {} reading(s) with |z| above {}\n\n",
            FLAG, outliers, settings.z_flag_threshold
        ));
    }

    section
}

/// Generate the date-aligned time series table. Gaps are shown as `-`.
fn generate_time_series_section(analysis: &AnalysisReport, settings: &ReportConfig) -> String {
    let series = &analysis.series;
    if series.dates.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Time Series\n\n");

    let devices: Vec<_> = series
        .time_series
        .iter()
        .map(|t| escape_cell(&t.device))
        .collect();
    section.push_str(&format!("| Date | {} |\n", devices.join(" | ")));
    section.push_str(&format!("|:---|{}\n", "---:|".repeat(devices.len())));

    for (idx, date) in series.dates.iter().enumerate() {
        let cells: Vec<_> = series
            .time_series
            .iter()
            .map(|t| match t.values.get(idx).copied().flatten() {
                Some(value) => format_value(value, settings.decimals),
                None => "-".to_string(),
            })
            .collect();
        section.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(date),
            cells.join(" | ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-device distribution table.
fn generate_distribution_section(analysis: &AnalysisReport, settings: &ReportConfig) -> String {
    let mut section = String::new();
    let decimals = settings.decimals;

    section.push_str("## Distribution\n\n");
    section.push_str("| Device | N | Min | Max | Values |\n");
    section.push_str("|:---|---:|---:|---:|:---|\n");

    for dist in &analysis.series.distribution_series {
        let min = dist.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = dist.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let values: Vec<_> = dist
            .values
            .iter()
            .map(|v| format_value(*v, decimals))
            .collect();

        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            escape_cell(&dist.device),
            dist.values.len(),
            format_value(min, decimals),
            format_value(max, decimals),
            values.join(", ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by eqa-compare v{}. Rounded for display; export or JSON output keeps full precision.*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

fn format_value(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format_value(v, decimals))
        .unwrap_or_else(|| "n/a".to_string())
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::models::Reading;
    use chrono::Utc;

    fn create_test_report() -> Report {
        let readings = vec![
            Reading::new("Glucose", "A", "2024-01-02", 10.0),
            Reading::new("Glucose", "A", "2024-01-01", 12.0),
            Reading::new("Glucose", "A", "2024-01-03", 14.0),
            Reading::new("Glucose", "B", "2024-01-01", 20.0),
            Reading::new("Glucose", "C|1", "2024-01-01", 11.0),
        ];
        let analysis = analyze(&readings, Some("Glucose")).unwrap();

        let metadata = ReportMetadata {
            source_file: "results.csv".to_string(),
            selected_test: Some("Glucose".to_string()),
            generated_at: Utc::now(),
            records_analyzed: analysis.rows.len(),
            records_excluded: 2,
            device_count: analysis.device_stats.len(),
            duration_seconds: 0.01,
        };

        Report { metadata, analysis }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# EQA Comparison Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Device Statistics"));
        assert!(markdown.contains("## Readings"));
        assert!(markdown.contains("## Time Series"));
        assert!(markdown.contains("## Distribution"));
        assert!(markdown.contains("- **Test:** Glucose"));
        assert!(markdown.contains("Records Excluded"));
    }

    #[test]
    fn test_device_row_flags_high_cv() {
        let report = create_test_report();
        let settings = ReportConfig::default();

        // A: mean 12, sd 2, cv 16.67
        let row = generate_device_row(&report.analysis.device_stats[0], &settings);
        assert_eq!(
            row,
            "| A | 3 | 12.00 | 2.00 | **16.67** ⚠️ | 12.00 | 4.00 |\n"
        );

        // B: single reading
        let row = generate_device_row(&report.analysis.device_stats[1], &settings);
        assert_eq!(row, "| B | 1 | 20.00 | n/a | n/a | 20.00 | 0.00 |\n");
    }

    #[test]
    fn test_time_series_marks_gaps() {
        let report = create_test_report();
        let section = generate_time_series_section(&report.analysis, &ReportConfig::default());

        assert!(section.contains("| Date | A | B | C\\|1 |"));
        assert!(section.contains("| 2024-01-01 | 12.00 | 20.00 | 11.00 |"));
        assert!(section.contains("| 2024-01-02 | 10.00 | - | - |"));
    }

    #[test]
    fn test_sections_can_be_disabled() {
        let report = create_test_report();
        let settings = ReportConfig {
            include_rows: false,
            include_time_series: false,
            include_distribution: false,
            decimals: 1,
            ..ReportConfig::default()
        };

        let markdown = generate_markdown_report(&report, &settings);

        assert!(markdown.contains("## Device Statistics"));
        assert!(!markdown.contains("## Readings"));
        assert!(!markdown.contains("## Time Series"));
        assert!(!markdown.contains("## Distribution"));
        assert!(markdown.contains("| A | 3 | 12.0 | 2.0 |"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["selected_test"], "Glucose");
        assert_eq!(value["analysis"]["device_stats"][1]["sd"], serde_json::Value::Null);
        assert_eq!(
            value["analysis"]["series"]["time_series"][1]["values"][1],
            serde_json::Value::Null
        );
        assert_eq!(value["analysis"]["rows"][0]["device_id"], "A");
    }
}
