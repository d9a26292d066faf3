//! Per-device aggregation and descriptive statistics.
//!
//! This module partitions a record set by device and computes
//! mean, sample standard deviation, coefficient of variation,
//! median and interquartile range for each device.

use crate::models::{DeviceStats, Record};
use std::collections::HashMap;

/// Results of one device, in the order they were encountered.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceGroup {
    pub device: String,
    pub values: Vec<f64>,
}

/// Group record results by device, keeping first-seen device order.
pub fn group_by_device(records: &[Record]) -> Vec<DeviceGroup> {
    let mut groups: Vec<DeviceGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.device_id.as_str()).or_insert_with(|| {
            groups.push(DeviceGroup {
                device: record.device_id.clone(),
                values: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].values.push(record.result);
    }

    groups
}

/// Compute statistics for every group.
pub fn device_stats(groups: &[DeviceGroup]) -> Vec<DeviceStats> {
    groups.iter().map(compute_device_stats).collect()
}

/// Compute the statistics of a single, non-empty group.
pub fn compute_device_stats(group: &DeviceGroup) -> DeviceStats {
    let values = &group.values;
    let count = values.len();
    let mean = mean(values);

    let (sd, cv) = if count > 1 {
        let sd = sample_sd(values, mean);
        let cv = if mean != 0.0 {
            Some(sd / mean * 100.0)
        } else {
            None
        };
        (Some(sd), cv)
    } else {
        (None, None)
    };

    let sorted = sorted_ascending(values);
    let median = median(&sorted);
    let iqr = nearest_rank(&sorted, 0.75) - nearest_rank(&sorted, 0.25);

    DeviceStats {
        device: group.device.clone(),
        mean,
        sd,
        cv,
        median,
        iqr,
        count,
    }
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;

    // Dividing before summing keeps large finite inputs from overflowing.
    let mean = values.iter().map(|v| v / n).sum::<f64>();

    // Rounding in the sum can push the mean just outside the sample range.
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    mean.clamp(min, max)
}

/// Bessel-corrected standard deviation around `mean`. Returns 0.0 below two values.
pub fn sample_sd(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    // Work relative to the largest magnitude so the squares stay finite.
    let scale = values.iter().fold(mean.abs(), |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return 0.0;
    }
    let sum_sq = values
        .iter()
        .map(|v| (v / scale - mean / scale).powi(2))
        .sum::<f64>();

    scale * (sum_sq / (n - 1) as f64).sqrt()
}

fn sorted_ascending(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Median of an ascending, non-empty slice.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        sorted[n / 2 - 1] / 2.0 + sorted[n / 2] / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Value at 0-indexed rank `floor(n * p)` of an ascending, non-empty slice.
///
/// No interpolation between neighbouring values is done.
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let rank = (sorted.len() as f64 * p).floor() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn record(device: &str, date: &str, result: f64) -> Record {
        Record {
            test_name: "Glucose".to_string(),
            device_id: device.to_string(),
            date: date.to_string(),
            result,
        }
    }

    fn group(device: &str, values: &[f64]) -> DeviceGroup {
        DeviceGroup {
            device: device.to_string(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_group_by_device_keeps_first_seen_order() {
        let records = vec![
            record("B", "2024-01-01", 1.0),
            record("A", "2024-01-01", 2.0),
            record("B", "2024-01-02", 3.0),
            record("C", "2024-01-01", 4.0),
        ];

        let groups = group_by_device(&records);

        let devices: Vec<_> = groups.iter().map(|g| g.device.as_str()).collect();
        assert_eq!(devices, vec!["B", "A", "C"]);
        assert_eq!(groups[0].values, vec![1.0, 3.0]);

        let total: usize = device_stats(&groups).iter().map(|s| s.count).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn test_group_by_device_empty() {
        assert!(group_by_device(&[]).is_empty());
        assert!(device_stats(&[]).is_empty());
    }

    #[test]
    fn test_three_values() {
        let stats = compute_device_stats(&group("A", &[10.0, 12.0, 14.0]));

        assert_eq!(stats.count, 3);
        assert!(approx(stats.mean, 12.0));
        assert!(approx(stats.sd.unwrap(), 2.0));
        assert!(approx(stats.cv.unwrap(), 16.666_666_666_666_668));
        assert!(approx(stats.median, 12.0));
        // Nearest rank without interpolation: q1 is at rank floor(3 * 0.25) = 0
        // and q3 at floor(3 * 0.75) = 2, so q1 = 10, q3 = 14 and the IQR is 4.
        // An interpolated IQR of 2 would need a different quartile rule; this
        // follows the floor-rank one.
        assert!(approx(stats.iqr, 4.0));
    }

    #[test]
    fn test_single_value() {
        let stats = compute_device_stats(&group("B", &[20.0]));

        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 20.0);
        assert_eq!(stats.sd, None);
        assert_eq!(stats.cv, None);
        assert_eq!(stats.median, 20.0);
        assert_eq!(stats.iqr, 0.0);
    }

    #[test]
    fn test_zero_mean_has_no_cv() {
        let stats = compute_device_stats(&group("Z", &[-1.0, 1.0]));

        assert_eq!(stats.mean, 0.0);
        assert!(approx(stats.sd.unwrap(), 2.0_f64.sqrt()));
        assert_eq!(stats.cv, None);
    }

    #[test]
    fn test_even_median_and_nearest_rank_quartiles() {
        let values = [8.0, 3.0, 5.0, 1.0, 7.0, 2.0, 6.0, 4.0];
        let stats = compute_device_stats(&group("A", &values));

        assert!(approx(stats.median, 4.5));
        assert!(approx(stats.iqr, 4.0));

        let sorted = sorted_ascending(&values);
        assert_eq!(nearest_rank(&sorted, 0.25), 3.0);
        assert_eq!(nearest_rank(&sorted, 0.75), 7.0);
    }

    #[test]
    fn test_mean_within_range() {
        let values = [0.1, 0.1, 0.1];
        assert_eq!(mean(&values), 0.1);

        let values = [3.5, -2.25, 9.0, 0.0];
        let m = mean(&values);
        assert!((-2.25..=9.0).contains(&m));
    }

    #[test]
    fn test_mean_large_values() {
        let values = [1e308, 1.5e308];
        let m = mean(&values);
        assert!(m.is_finite());
        assert!((m / 1.25e308 - 1.0).abs() < 1e-12);

        let stats = compute_device_stats(&group("X", &values));
        let sd = stats.sd.unwrap();
        assert!(sd.is_finite());
        assert!((sd / (2.5e307 * 2.0_f64.sqrt()) - 1.0).abs() < 1e-12);
        assert!(stats.cv.unwrap().is_finite());
        assert!((stats.median / 1.25e308 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_sd_small_inputs() {
        assert_eq!(sample_sd(&[], 0.0), 0.0);
        assert_eq!(sample_sd(&[4.0], 4.0), 0.0);
        assert_eq!(sample_sd(&[0.0, 0.0], 0.0), 0.0);
        assert!(approx(sample_sd(&[10.0, 30.0], 20.0), 200.0_f64.sqrt()));
    }
}
