//! EQA Compare - device comparison for external quality assessment
//!
//! A CLI tool that reads device readings from CSV or spreadsheet files,
//! computes per-device statistics and per-reading deviations for a
//! selected test, and writes Markdown or JSON reports.
//!
//! Exit codes:
//!   0 - Success, including "nothing to analyze"
//!   1 - Runtime error (unreadable input, bad config, etc.)

mod analysis;
mod cli;
mod config;
mod ingest;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use models::{Report, ReportMetadata};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Generators need no logging
    if args.init_config {
        exit_on_error(handle_init_config());
        return;
    }
    if let Some(ref path) = args.write_template {
        exit_on_error(handle_write_template(&args, path));
        return;
    }

    // Load configuration
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("eqa-compare v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    log_config_source(&source);

    match run_comparison(args, config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Comparison failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn exit_on_error(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle --init-config: generate a default .eqacompare.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!(
        "✅ Created {} with default settings.",
        config::DEFAULT_CONFIG_FILE
    );
    println!("   Edit it to customize column names, rounding and flag thresholds.");
    Ok(())
}

/// Handle --write-template: write a CSV with the expected header.
fn handle_write_template(args: &Args, path: &Path) -> Result<()> {
    let (config, _) = load_config(args)?;
    let columns = ingest::ColumnNames::from(&config.columns);

    let template = ingest::template_csv(&columns).context("Failed to build template")?;
    std::fs::write(path, template)
        .with_context(|| format!("Failed to write template to {}", path.display()))?;

    println!("✅ Template written to: {}", path.display());
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over the verbosity flags when set.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete comparison workflow. Returns the exit code.
fn run_comparison(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let input = args
        .input
        .as_deref()
        .context("An input file is required")?;

    // Step 1: Ingest the source file
    let columns = ingest::ColumnNames::from(&config.columns);
    let readings = ingest::load_file(input, &columns)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let test_names = ingest::filter::test_names(&readings);

    // Handle --list-tests: print names and exit
    if args.list_tests {
        return handle_list_tests(&test_names);
    }

    let selected_test = args.selected_test();
    if let Some(test) = selected_test {
        if !test_names.iter().any(|t| t == test) {
            warn!(
                "Test '{}' not found in {} (available: {})",
                test,
                input.display(),
                test_names.join(", ")
            );
        }
    }

    // Step 2: Analyze
    let Some(analysis) = analysis::analyze(&readings, selected_test) else {
        println!(
            "ℹ️  Nothing to analyze: no readings with a numeric result for {}.",
            selected_test.unwrap_or("any test")
        );
        return Ok(0);
    };

    // Step 3: Build the report
    let metadata = ReportMetadata {
        source_file: input.display().to_string(),
        selected_test: selected_test.map(String::from),
        generated_at: Utc::now(),
        records_analyzed: analysis.rows.len(),
        records_excluded: analysis.excluded_records,
        device_count: analysis.device_stats.len(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report { metadata, analysis };

    // Step 4: Generate and save the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if let Some(ref path) = args.export_stats {
        report::export_device_stats(&report.analysis.device_stats, path)?;
        info!("Exported device statistics to {}", path.display());
    }

    print_summary(&report, &config);
    println!(
        "\n✅ Comparison complete! Report saved to: {}",
        output_path.display()
    );

    Ok(0)
}

/// Handle --list-tests: print the distinct test names.
fn handle_list_tests(test_names: &[String]) -> Result<i32> {
    if test_names.is_empty() {
        println!("No tests found.");
    }
    for name in test_names {
        println!("{}", name);
    }
    Ok(0)
}

/// Print a short summary of the analysis to stdout.
fn print_summary(report: &Report, config: &Config) {
    let analysis = &report.analysis;
    let settings = &config.report;

    println!("\n📊 Comparison Summary:");
    println!(
        "   Test: {}",
        report.metadata.selected_test.as_deref().unwrap_or("All tests")
    );
    println!("   Devices: {}", analysis.device_stats.len());
    println!("   Records analyzed: {}", analysis.rows.len());
    if analysis.excluded_records > 0 {
        println!(
            "   Records excluded (no numeric result): {}",
            analysis.excluded_records
        );
    }
    println!(
        "   Devices with CV > {}%: {}",
        settings.cv_flag_threshold,
        analysis.flagged_devices(settings.cv_flag_threshold).len()
    );
    println!(
        "   Readings with |z| > {}: {}",
        settings.z_flag_threshold,
        analysis.outlier_rows(settings.z_flag_threshold).len()
    );
}

/// Where the configuration came from.
#[derive(Debug)]
enum ConfigSource {
    File(PathBuf),
    Defaults,
    /// The default file exists but could not be used.
    Invalid(anyhow::Error),
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized; the outcome is logged afterwards
/// through [`log_config_source`].
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((
            config,
            ConfigSource::File(PathBuf::from(config::DEFAULT_CONFIG_FILE)),
        )),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Invalid(e))),
    }
}

fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
        ConfigSource::Invalid(e) => warn!("Failed to load config, using defaults: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_load_config_explicit_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eqa.toml");
        std::fs::write(&path, "[general]\nverbose = true\n\n[report]\ndecimals = 3\n").unwrap();

        let args =
            Args::try_parse_from(["eqa-compare", "results.csv", "-c", path.to_str().unwrap()])
                .unwrap();
        let (config, source) = load_config(&args).unwrap();

        assert!(config.general.verbose);
        assert_eq!(config.report.decimals, 3);
        assert!(matches!(source, ConfigSource::File(p) if p == path));
    }

    #[test]
    fn test_load_config_explicit_file_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[report]\ndecimals = \"two\"\n").unwrap();

        let args =
            Args::try_parse_from(["eqa-compare", "results.csv", "-c", path.to_str().unwrap()])
                .unwrap();

        assert!(load_config(&args).is_err());
    }
}
