//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::load::SinkKind;
use crate::report::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

/// sales-etl - batch ETL pipeline for e-commerce orders
///
/// Cleans a CSV export of orders, derives calendar fields and segments,
/// aggregates by product, category, month, region and customer, and loads
/// the results as CSV, JSON, SQLite and a warehouse snapshot.
///
/// Examples:
///   sales-etl --input sales.csv
///   sales-etl -i sales.csv -o out --sinks csv,sqlite
///   sales-etl -i sales.csv --dry-run
///   sales-etl -i sales.csv --max-drop-ratio 0.1
///   sales-etl --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Input CSV file with order rows
    ///
    /// Defaults to the config file value, then to sales.csv.
    #[arg(short, long, value_name = "FILE", env = "SALES_ETL_INPUT")]
    pub input: Option<PathBuf>,

    /// Directory that receives all outputs
    #[arg(short, long, value_name = "DIR", env = "SALES_ETL_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sales-etl.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Sinks to write (comma-separated)
    ///
    /// Example: --sinks csv,sqlite
    #[arg(long, value_name = "SINKS", value_delimiter = ',')]
    pub sinks: Option<Vec<SinkKind>>,

    /// Report formats to write (comma-separated)
    ///
    /// Example: --format markdown,json
    #[arg(long, value_name = "FORMATS", value_delimiter = ',')]
    pub format: Option<Vec<ReportFormat>>,

    /// Length of each top-N list in the report
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// Accepted gap between total_amount and quantity * unit_price
    #[arg(long, value_name = "AMOUNT")]
    pub tolerance: Option<f64>,

    /// Fail if more than this fraction of rows is dropped (0.0 - 1.0)
    ///
    /// Useful for CI pipelines. Exit code 2 when the ratio is exceeded.
    #[arg(long, value_name = "RATIO")]
    pub max_drop_ratio: Option<f64>,

    /// Dry run: run every stage except load and report
    ///
    /// Prints the summary without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .sales-etl.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(tolerance) = self.tolerance {
            if !(tolerance > 0.0 && tolerance.is_finite()) {
                return Err("Tolerance must be a positive amount".to_string());
            }
        }

        if self.top_n == Some(0) {
            return Err("Top-N must be at least 1".to_string());
        }

        if let Some(ratio) = self.max_drop_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                return Err("Max drop ratio must be between 0.0 and 1.0".to_string());
            }
        }

        if matches!(self.sinks, Some(ref sinks) if sinks.is_empty()) {
            return Err("At least one sink is required".to_string());
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
}
