//! Analysis pipeline.
//!
//! A record set flows through the aggregator and the normalizer, the
//! series builder reuses the aggregator's device partition, and the
//! results are composed into an [`AnalysisReport`].

pub mod aggregator;
pub mod normalizer;
pub mod series;

use crate::ingest::filter::filter_by_test;
use crate::models::{AnalysisReport, Reading, RecordSet};
use tracing::{debug, info, warn};

/// Analyze the readings of one test, or of all tests when `selected_test`
/// is `None` or empty.
///
/// Returns `None` when no reading with a numeric result remains.
pub fn analyze(readings: &[Reading], selected_test: Option<&str>) -> Option<AnalysisReport> {
    let selected = filter_by_test(readings, selected_test);
    debug!(
        "Selected {} of {} readings for {}",
        selected.len(),
        readings.len(),
        selected_test.filter(|t| !t.is_empty()).unwrap_or("all tests")
    );

    let record_set = RecordSet::from_readings(selected);
    analyze_record_set(&record_set)
}

/// Run the pipeline over an already validated record set.
pub fn analyze_record_set(record_set: &RecordSet) -> Option<AnalysisReport> {
    if record_set.excluded > 0 {
        warn!(
            "Excluded {} readings without a numeric result",
            record_set.excluded
        );
    }

    if record_set.is_empty() {
        info!("Nothing to analyze");
        return None;
    }

    let records = &record_set.records;

    let groups = aggregator::group_by_device(records);
    let device_stats = aggregator::device_stats(&groups);

    let population = normalizer::population_stats(records);
    let rows = normalizer::normalize(records, population);

    let series = series::build_chart_series(records, &groups);

    info!(
        "Analyzed {} records across {} devices",
        record_set.len(),
        device_stats.len()
    );

    Some(AnalysisReport {
        device_stats,
        rows,
        series,
        population,
        excluded_records: record_set.excluded,
    })
}
