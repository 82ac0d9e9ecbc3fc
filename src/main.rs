//! sales-etl - batch ETL pipeline for e-commerce orders
//!
//! Reads a CSV export of orders, cleans and enriches it, and writes
//! summaries and reports to an output directory.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad config, unreadable input, failed stage, etc.)
//!   2 - Dropped row ratio above --max-drop-ratio

use anyhow::{Context, Result};
use sales_etl::cli::Args;
use sales_etl::config::{Config, CONFIG_FILE_NAME};
use sales_etl::pipeline::{Pipeline, RunSummary};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes first so its verbose setting can pick the log level
    let config_path = config_path(&args);
    let config = match load_config(config_path.as_deref(), &args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("sales-etl v{}", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = config_path {
        info!("Loaded config from: {}", path.display());
    }
    debug!("Arguments: {:?}", args);

    match run(&args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Pipeline failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sales-etl.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize input, sinks, tolerance, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` overrides the level picked from the flags.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
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

/// Run the pipeline. Returns exit code (0 or 2).
fn run(args: &Args, config: Config) -> Result<i32> {
    println!("📥 Reading orders from: {}", config.general.input.display());
    if args.dry_run {
        println!("   Dry run: nothing will be written.");
    }

    let summary = Pipeline::new(config)
        .dry_run(args.dry_run)
        .show_progress(!args.quiet)
        .run()?;

    print_summary(&summary);

    // Check --max-drop-ratio threshold
    if let Some(max_ratio) = args.max_drop_ratio {
        let ratio = summary.cleaning.drop_ratio();
        if ratio > max_ratio {
            eprintln!(
                "\n⛔ Dropped {:.1}% of rows, above the allowed {:.1}%. Failing (exit code 2).",
                ratio * 100.0,
                max_ratio * 100.0
            );
            return Ok(2);
        }
    }

    Ok(0)
}

fn print_summary(summary: &RunSummary) {
    let cleaning = &summary.cleaning;
    let overview = &summary.report.overview;

    println!("\n📊 Pipeline Summary:");
    println!(
        "   Rows: {} read | {} kept | {} dropped | {} repairs",
        summary.rows_extracted,
        cleaning.rows_out,
        cleaning.dropped(),
        cleaning.repaired()
    );
    for (reason, count) in &cleaning.dropped_by_reason {
        println!("   - {}: {}", reason, count);
    }
    println!(
        "   Revenue: {:.2} over {} orders (avg {:.2})",
        overview.total_revenue, overview.total_orders, overview.avg_order_value
    );
    if let Some(ref product) = overview.most_popular_product {
        println!("   Most popular product: {}", product);
    }
    println!("   Duration: {:.2}s", summary.duration_seconds);

    if summary.dry_run {
        println!("\n✅ Dry run complete. No files were written.");
    } else {
        println!(
            "\n✅ Pipeline complete! {} files written to: {}",
            summary.outputs.len(),
            summary.output_dir.display()
        );
    }
}

/// Explicit --config path, else the default file when present.
fn config_path(args: &Args) -> Option<PathBuf> {
    if let Some(ref path) = args.config {
        return Some(path.clone());
    }
    let default_path = Path::new(CONFIG_FILE_NAME);
    default_path.exists().then(|| default_path.to_path_buf())
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(path: Option<&Path>, args: &Args) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.merge_with_args(args);
    Ok(config)
}
