//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// EQA Compare - compare device results before official EQA reports
///
/// Reads a CSV or spreadsheet of device readings, groups them by device
/// for one test and reports mean, SD, CV, median, IQR, per-reading
/// z-scores and date-aligned series.
///
/// Examples:
///   eqa-compare results.csv --list-tests
///   eqa-compare results.csv --test Glucose
///   eqa-compare results.xlsx --test Glucose --format json -o glucose.json
///   eqa-compare results.csv --export-stats device_stats.csv
///   eqa-compare --write-template template.csv
///   eqa-compare --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV or spreadsheet file with one reading per row
    ///
    /// Expected columns: Test Name, Device ID, Date, Result
    /// (names can be changed in the config file).
    #[arg(
        value_name = "FILE",
        required_unless_present_any = ["init_config", "write_template"]
    )]
    pub input: Option<PathBuf>,

    /// Restrict the analysis to one test
    ///
    /// If not specified or blank, all tests are analyzed together.
    #[arg(short, long, value_name = "NAME", env = "EQA_TEST")]
    pub test: Option<String>,

    /// Print the distinct test names found in the input and exit
    #[arg(long)]
    pub list_tests: bool,

    /// Output file path for the report
    ///
    /// Default: from config or eqa_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Also write the per-device statistics as CSV
    #[arg(long, value_name = "FILE")]
    pub export_stats: Option<PathBuf>,

    /// Decimal places shown in report tables
    #[arg(long, value_name = "N")]
    pub decimals: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .eqacompare.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .eqacompare.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Write a template CSV with the expected columns and exit
    #[arg(long, value_name = "FILE")]
    pub write_template: Option<PathBuf>,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Nothing to check for the generators
        if self.init_config || self.write_template.is_some() {
            return Ok(());
        }

        let Some(ref input) = self.input else {
            return Err("An input file is required".to_string());
        };

        if !input.exists() {
            return Err(format!("Input file does not exist: {}", input.display()));
        }
        if !input.is_file() {
            return Err(format!("Input path is not a file: {}", input.display()));
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(decimals) = self.decimals {
            if decimals > 10 {
                return Err("Decimals must be at most 10".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The selected test, if any.
    pub fn selected_test(&self) -> Option<&str> {
        self.test.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}
