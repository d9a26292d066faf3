//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.eqacompare.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".eqacompare.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Source column names.
    #[serde(default)]
    pub columns: ColumnConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "eqa_report.md".to_string()
}

/// Header names of the columns read from the source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_test_name_column")]
    pub test_name: String,

    #[serde(default = "default_device_id_column")]
    pub device_id: String,

    #[serde(default = "default_date_column")]
    pub date: String,

    #[serde(default = "default_result_column")]
    pub result: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            test_name: default_test_name_column(),
            device_id: default_device_id_column(),
            date: default_date_column(),
            result: default_result_column(),
        }
    }
}

fn default_test_name_column() -> String {
    "Test Name".to_string()
}

fn default_device_id_column() -> String {
    "Device ID".to_string()
}

fn default_date_column() -> String {
    "Date".to_string()
}

fn default_result_column() -> String {
    "Result".to_string()
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Decimal places shown in rendered tables.
    #[serde(default = "default_decimals")]
    pub decimals: usize,

    /// Devices with a CV (%) above this value are flagged.
    #[serde(default = "default_cv_flag_threshold")]
    pub cv_flag_threshold: f64,

    /// Rows with |z| above this value are flagged.
    #[serde(default = "default_z_flag_threshold")]
    pub z_flag_threshold: f64,

    /// Include the per-row deviation table.
    #[serde(default = "default_true")]
    pub include_rows: bool,

    /// Include the date-aligned time series table.
    #[serde(default = "default_true")]
    pub include_time_series: bool,

    /// Include the per-device distribution table.
    #[serde(default = "default_true")]
    pub include_distribution: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            cv_flag_threshold: default_cv_flag_threshold(),
            z_flag_threshold: default_z_flag_threshold(),
            include_rows: true,
            include_time_series: true,
            include_distribution: true,
        }
    }
}

fn default_decimals() -> usize {
    2
}

fn default_cv_flag_threshold() -> f64 {
    5.0
}

fn default_z_flag_threshold() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.report.decimals > 10 {
            bail!(
                "report.decimals must be at most 10, but is {}",
                self.report.decimals
            );
        }
        for (key, value) in [
            ("cv_flag_threshold", self.report.cv_flag_threshold),
            ("z_flag_threshold", self.report.z_flag_threshold),
        ] {
            if value.is_nan() || value < 0.0 {
                bail!("report.{key} must be a non-negative number, but is {value}");
            }
        }
        for (key, name) in [
            ("test_name", &self.columns.test_name),
            ("device_id", &self.columns.device_id),
            ("date", &self.columns.date),
            ("result", &self.columns.result),
        ] {
            if name.trim().is_empty() {
                bail!("columns.{key} must not be empty");
            }
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(decimals) = args.decimals {
            self.report.decimals = decimals;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "eqa_report.md");
        assert_eq!(config.columns.device_id, "Device ID");
        assert_eq!(config.report.decimals, 2);
        assert_eq!(config.report.cv_flag_threshold, 5.0);
        assert_eq!(config.report.z_flag_threshold, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "glucose.md"
verbose = true

[columns]
device_id = "Analyzer"
result = "Value"

[report]
decimals = 3
cv_flag_threshold = 3.5
include_rows = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "glucose.md");
        assert!(config.general.verbose);
        assert_eq!(config.columns.device_id, "Analyzer");
        assert_eq!(config.columns.test_name, "Test Name");
        assert_eq!(config.columns.result, "Value");
        assert_eq!(config.report.decimals, 3);
        assert_eq!(config.report.cv_flag_threshold, 3.5);
        assert_eq!(config.report.z_flag_threshold, 2.0);
        assert!(!config.report.include_rows);
        assert!(config.report.include_time_series);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.report.decimals = 11;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.report.z_flag_threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.columns.date = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\ndecimals = 42\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let args = crate::cli::Args::try_parse_from([
            "eqa-compare",
            "results.csv",
            "-o",
            "out/glucose.md",
            "--decimals",
            "4",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.general.output, "out/glucose.md");
        assert_eq!(config.report.decimals, 4);
        assert!(!config.general.verbose);
        assert_eq!(config.report.cv_flag_threshold, 5.0);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[columns]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.columns.result, "Result");
    }
}
