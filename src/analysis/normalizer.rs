//! Standardized deviation of every record from the pooled population.

use crate::analysis::aggregator::{mean, sample_sd};
use crate::models::{AugmentedRow, PopulationStats, Record};

/// Pooled mean and sample standard deviation of all results.
///
/// The standard deviation is 0 when there are fewer than two records.
pub fn population_stats(records: &[Record]) -> PopulationStats {
    let values: Vec<f64> = records.iter().map(|r| r.result).collect();
    let mean = mean(&values);
    let sd = sample_sd(&values, mean);
    PopulationStats { mean, sd }
}

/// Attach z-score and percent deviation to each record, in input order.
///
/// Both ratios are taken term by term, so `result - mean` is never formed
/// and cannot overflow.
pub fn normalize(records: &[Record], population: PopulationStats) -> Vec<AugmentedRow> {
    let PopulationStats { mean, sd } = population;

    records
        .iter()
        .map(|record| {
            let result = record.result;
            let z = if sd != 0.0 {
                result / sd - mean / sd
            } else {
                0.0
            };
            let deviation_percent = if mean != 0.0 {
                (result / mean - 1.0) * 100.0
            } else {
                0.0
            };

            AugmentedRow {
                record: record.clone(),
                z,
                deviation_percent,
            }
        })
        .collect()
}
