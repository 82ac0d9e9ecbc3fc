//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sales-etl.toml` files. The resulting [`Config`] is passed explicitly
//! into every pipeline stage.

use crate::load::SinkKind;
use crate::report::ReportFormat;
use anyhow::{Context, Result};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".sales-etl.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Cleaning settings.
    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Output settings.
    #[serde(default)]
    pub load: LoadConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Input CSV file.
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Directory that receives all outputs.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from("sales.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Cleaner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Largest accepted gap between `total_amount` and `quantity * unit_price`.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Replacement for empty text fields.
    #[serde(default = "default_unknown_label")]
    pub unknown_label: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            unknown_label: default_unknown_label(),
        }
    }
}

impl CleaningConfig {
    /// Tolerance as a decimal amount.
    pub fn tolerance(&self) -> Decimal {
        Decimal::from_f64(self.tolerance)
            .filter(|t| t.is_sign_positive() && !t.is_zero())
            .unwrap_or_else(|| Decimal::new(1, 2))
    }
}

fn default_tolerance() -> f64 {
    0.01
}

fn default_unknown_label() -> String {
    "Unknown".to_string()
}

/// Loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Sinks to write, in order.
    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkKind>,

    /// SQLite database file name.
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// JSON records file name.
    #[serde(default = "default_json_name")]
    pub json_name: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            sinks: default_sinks(),
            database_name: default_database_name(),
            json_name: default_json_name(),
        }
    }
}

fn default_sinks() -> Vec<SinkKind> {
    vec![
        SinkKind::Csv,
        SinkKind::Json,
        SinkKind::Sqlite,
        SinkKind::Warehouse,
    ]
}

fn default_database_name() -> String {
    "sales_analysis.db".to_string()
}

fn default_json_name() -> String {
    "sales_data.json".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Length of each top-N list.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Report files to write.
    #[serde(default = "default_formats")]
    pub formats: Vec<ReportFormat>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            formats: default_formats(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_formats() -> Vec<ReportFormat> {
    vec![ReportFormat::Markdown, ReportFormat::Json]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.general.input = input.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.clone();
        }
        if let Some(ref sinks) = args.sinks {
            self.load.sinks = sinks.clone();
        }
        if let Some(ref formats) = args.format {
            self.report.formats = formats.clone();
        }
        if let Some(top_n) = args.top_n {
            self.report.top_n = top_n;
        }
        if let Some(tolerance) = args.tolerance {
            self.cleaning.tolerance = tolerance;
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

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.input, PathBuf::from("sales.csv"));
        assert_eq!(config.report.top_n, 10);
        assert_eq!(config.load.sinks.len(), 4);
        assert_eq!(config.cleaning.tolerance(), Decimal::new(1, 2));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
input = "data/orders.csv"
output_dir = "out"
verbose = true

[cleaning]
tolerance = 0.05

[load]
sinks = ["csv", "sqlite"]

[report]
top_n = 5
formats = ["json"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.input, PathBuf::from("data/orders.csv"));
        assert_eq!(config.general.output_dir, PathBuf::from("out"));
        assert!(config.general.verbose);
        assert_eq!(config.cleaning.tolerance(), Decimal::new(5, 2));
        assert_eq!(config.cleaning.unknown_label, "Unknown");
        assert_eq!(config.load.sinks, vec![SinkKind::Csv, SinkKind::Sqlite]);
        assert_eq!(config.load.database_name, "sales_analysis.db");
        assert_eq!(config.report.top_n, 5);
        assert_eq!(config.report.formats, vec![ReportFormat::Json]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[report]\ntop_n = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.report.top_n, 3);
        assert_eq!(config.general.output_dir, PathBuf::from("output"));

        std::fs::write(&path, "[report]\ntop_n = \"three\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_invalid_tolerance_falls_back() {
        let config = CleaningConfig {
            tolerance: -1.0,
            ..Default::default()
        };
        assert_eq!(config.tolerance(), Decimal::new(1, 2));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[cleaning]"));
        assert!(toml_str.contains("[load]"));
        assert!(toml_str.contains("[report]"));
    }
}
