//! CSV export of per-device statistics.

use crate::models::DeviceStats;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write device statistics as CSV with a `device,mean,sd,cv,median,iqr,count` header.
///
/// Values are written at full precision; an undefined SD or CV is an empty field.
pub fn write_device_stats_csv<W: Write>(stats: &[DeviceStats], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    if stats.is_empty() {
        writer.write_record(["device", "mean", "sd", "cv", "median", "iqr", "count"])?;
    }
    for row in stats {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to serialize stats for device {}", row.device))?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Write device statistics to a CSV file.
pub fn export_device_stats(stats: &[DeviceStats], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_device_stats_csv(stats, file)
        .with_context(|| format!("Failed to export device statistics to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Vec<DeviceStats> {
        vec![
            DeviceStats {
                device: "A".to_string(),
                mean: 12.0,
                sd: Some(2.0),
                cv: Some(16.5),
                median: 12.0,
                iqr: 4.0,
                count: 3,
            },
            DeviceStats {
                device: "B".to_string(),
                mean: 20.0,
                sd: None,
                cv: None,
                median: 20.0,
                iqr: 0.0,
                count: 1,
            },
        ]
    }

    #[test]
    fn test_write_device_stats_csv() {
        let mut buffer = Vec::new();
        write_device_stats_csv(&stats(), &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "device,mean,sd,cv,median,iqr,count");
        assert_eq!(lines[1], "A,12.0,2.0,16.5,12.0,4.0,3");
        assert_eq!(lines[2], "B,20.0,,,20.0,0.0,1");
    }

    #[test]
    fn test_write_empty_stats_keeps_header() {
        let mut buffer = Vec::new();
        write_device_stats_csv(&[], &mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "device,mean,sd,cv,median,iqr,count\n"
        );
    }

    #[test]
    fn test_export_device_stats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");

        export_device_stats(&stats(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<DeviceStats> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, stats());
    }
}
