//! Chart-ready projections of a record set.
//!
//! Two views are produced from the device partition: a time series per
//! device aligned on the sorted distinct dates, and the raw distribution
//! of each device's results for box-plot style rendering.

use crate::analysis::aggregator::DeviceGroup;
use crate::models::{ChartSeries, DeviceDistribution, DeviceTrace, Record};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Distinct dates of the record set in ascending lexical order.
///
/// ISO-8601 dates therefore come out in chronological order.
pub fn distinct_dates(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.date.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Build both chart series from the records and their device partition.
pub fn build_chart_series(records: &[Record], groups: &[DeviceGroup]) -> ChartSeries {
    let dates = distinct_dates(records);

    // Only the first record for a (device, date) pair is charted.
    let mut first_by_key: HashMap<(&str, &str), f64> = HashMap::new();
    for record in records {
        let key = (record.device_id.as_str(), record.date.as_str());
        if first_by_key.contains_key(&key) {
            debug!(
                "Dropping duplicate reading for device {} on {} from time series",
                record.device_id, record.date
            );
            continue;
        }
        first_by_key.insert(key, record.result);
    }

    let time_series = groups
        .iter()
        .map(|group| DeviceTrace {
            device: group.device.clone(),
            values: dates
                .iter()
                .map(|date| {
                    first_by_key
                        .get(&(group.device.as_str(), date.as_str()))
                        .copied()
                })
                .collect(),
        })
        .collect();

    let distribution_series = groups
        .iter()
        .map(|group| DeviceDistribution {
            device: group.device.clone(),
            values: group.values.clone(),
        })
        .collect();

    ChartSeries {
        dates,
        time_series,
        distribution_series,
    }
}
