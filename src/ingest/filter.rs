//! Test selection over ingested readings.

use crate::models::Reading;
use std::collections::HashSet;

/// Distinct test names in the order they first appear.
pub fn test_names(readings: &[Reading]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for reading in readings {
        if seen.insert(reading.test_name.as_str()) {
            names.push(reading.test_name.clone());
        }
    }

    names
}

/// Readings belonging to `test`, or all readings when `test` is `None` or empty.
pub fn filter_by_test<'a>(readings: &'a [Reading], test: Option<&str>) -> Vec<&'a Reading> {
    match test.filter(|t| !t.is_empty()) {
        Some(test) => readings.iter().filter(|r| r.test_name == test).collect(),
        None => readings.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> Vec<Reading> {
        vec![
            Reading::new("Sodium", "A", "2024-01-01", 140.0),
            Reading::new("Glucose", "A", "2024-01-01", 5.0),
            Reading::new("Sodium", "B", "2024-01-01", 138.0),
            Reading::new("Potassium", "B", "2024-01-01", 4.1),
        ]
    }

    #[test]
    fn test_test_names_first_seen_order() {
        assert_eq!(
            test_names(&readings()),
            vec!["Sodium", "Glucose", "Potassium"]
        );
        assert!(test_names(&[]).is_empty());
    }

    #[test]
    fn test_filter_by_test() {
        let readings = readings();

        let sodium = filter_by_test(&readings, Some("Sodium"));
        assert_eq!(sodium.len(), 2);
        assert!(sodium.iter().all(|r| r.test_name == "Sodium"));

        assert_eq!(filter_by_test(&readings, None).len(), 4);
        assert_eq!(filter_by_test(&readings, Some("")).len(), 4);
        assert!(filter_by_test(&readings, Some("sodium")).is_empty());
    }
}
