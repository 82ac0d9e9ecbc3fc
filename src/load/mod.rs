//! Loader stage: persisting pipeline outputs through sinks.
//!
//! Every sink writes into a hidden staging directory inside the output
//! directory. Files are moved into place only when [`StagedLoad::commit`]
//! is called, so a failed run leaves the output directory untouched.

pub mod csv_sink;
pub mod json_sink;
pub mod sqlite_sink;
pub mod warehouse;

pub use csv_sink::CsvSink;
pub use json_sink::JsonSink;
pub use sqlite_sink::SqliteSink;
pub use warehouse::WarehouseSink;

use crate::config::LoadConfig;
use crate::error::{PipelineError, PipelineResult, SinkError};
use crate::models::{EnrichedOrder, Order, SummarySet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Available sink implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// CSV files for cleaned, transformed and summary data
    Csv,
    /// JSON array of transformed records
    Json,
    /// SQLite database with indexed tables
    Sqlite,
    /// Warehouse snapshot and data dictionary
    Warehouse,
}

/// Everything a sink may persist for one run.
#[derive(Debug, Clone, Copy)]
pub struct LoadBatch<'a> {
    pub cleaned: &'a [Order],
    pub transformed: &'a [EnrichedOrder],
    pub summaries: &'a SummarySet,
}

/// A persistence target, independent of storage format.
pub trait Sink {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Write the batch below `dir`, returning the written paths relative to `dir`.
    fn write(&mut self, dir: &Path, batch: &LoadBatch<'_>) -> Result<Vec<PathBuf>, SinkError>;
}

/// Runs a list of sinks against one output directory.
pub struct Loader {
    output_dir: PathBuf,
    sinks: Vec<Box<dyn Sink>>,
}

impl Loader {
    /// Create a loader with no sinks.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sinks: Vec::new(),
        }
    }

    /// Create a loader with the sinks named in the configuration.
    pub fn from_config(output_dir: &Path, config: &LoadConfig) -> Self {
        let mut loader = Self::new(output_dir);
        let mut seen = Vec::new();
        for kind in &config.sinks {
            if seen.contains(kind) {
                continue;
            }
            seen.push(*kind);
            let sink: Box<dyn Sink> = match kind {
                SinkKind::Csv => Box::new(CsvSink),
                SinkKind::Json => Box::new(JsonSink::new(&config.json_name)),
                SinkKind::Sqlite => Box::new(SqliteSink::new(&config.database_name)),
                SinkKind::Warehouse => Box::new(WarehouseSink),
            };
            loader.sinks.push(sink);
        }
        loader
    }

    /// Append a sink.
    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Names of the configured sinks, in order.
    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Write every sink into a fresh staging directory.
    ///
    /// Nothing becomes visible in the output directory until the returned
    /// [`StagedLoad`] is committed.
    pub fn stage(&mut self, batch: &LoadBatch<'_>) -> PipelineResult<StagedLoad> {
        fs::create_dir_all(&self.output_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.output_dir)?;
        debug!(
            sinks = ?self.sink_names(),
            "Staging outputs in {}",
            staging.path().display()
        );

        let mut files = Vec::new();
        for sink in self.sinks.iter_mut() {
            let written = sink
                .write(staging.path(), batch)
                .map_err(|source| PipelineError::Sink {
                    sink: sink.name().to_string(),
                    source,
                })?;
            info!("Sink '{}' wrote {} files", sink.name(), written.len());
            files.extend(written);
        }

        Ok(StagedLoad {
            staging,
            output_dir: self.output_dir.clone(),
            files,
        })
    }

    /// Stage and commit in one step.
    pub fn load(&mut self, batch: &LoadBatch<'_>) -> PipelineResult<Vec<PathBuf>> {
        self.stage(batch)?.commit()
    }
}

/// Outputs written to the staging directory but not yet published.
///
/// Dropping it without committing deletes everything staged.
#[derive(Debug)]
pub struct StagedLoad {
    staging: TempDir,
    output_dir: PathBuf,
    files: Vec<PathBuf>,
}

impl StagedLoad {
    /// Directory that receives staged files.
    pub fn dir(&self) -> &Path {
        self.staging.path()
    }

    /// Staged files, relative to [`StagedLoad::dir`].
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Register files written directly into the staging directory.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = PathBuf>) {
        self.files.extend(files);
    }

    /// Move every staged file into the output directory.
    ///
    /// Either every file is published or none is. Destinations are checked
    /// before anything moves. Files from a previous run wait in the staging
    /// directory until the commit ends and are put back if a rename fails.
    pub fn commit(self) -> PipelineResult<Vec<PathBuf>> {
        for relative in &self.files {
            let to = self.output_dir.join(relative);
            if to.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a directory", to.display()),
                )
                .into());
            }
        }

        let previous = self.staging.path().join(PREVIOUS_DIR);
        let mut published = Vec::with_capacity(self.files.len());

        for relative in &self.files {
            match self.publish(relative, &previous) {
                Ok(file) => published.push(file),
                Err(e) => {
                    warn!(
                        "Commit failed at {}, rolling back {} files",
                        relative.display(),
                        published.len()
                    );
                    roll_back(&published);
                    return Err(e.into());
                }
            }
        }

        info!(
            "Committed {} files to {}",
            published.len(),
            self.output_dir.display()
        );
        Ok(published.into_iter().map(|file| file.path).collect())
    }

    fn publish(&self, relative: &Path, previous: &Path) -> io::Result<Published> {
        let from = self.staging.path().join(relative);
        let to = self.output_dir.join(relative);

        let mut created_dir = None;
        if let Some(parent) = to.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                created_dir = Some(parent.to_path_buf());
            }
        }

        let mut parked = None;
        if to.exists() {
            let park = previous.join(relative);
            if let Some(parent) = park.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&to, &park)?;
            parked = Some(park);
        }

        if let Err(e) = fs::rename(&from, &to) {
            if let Some(ref park) = parked {
                let _ = fs::rename(park, &to);
            }
            if let Some(ref dir) = created_dir {
                let _ = fs::remove_dir(dir);
            }
            return Err(e);
        }

        Ok(Published {
            path: to,
            parked,
            created_dir,
        })
    }
}

/// Staging subdirectory that holds replaced files until the commit ends.
const PREVIOUS_DIR: &str = ".previous";

/// A file moved into the output directory by an ongoing commit.
struct Published {
    path: PathBuf,
    parked: Option<PathBuf>,
    created_dir: Option<PathBuf>,
}

/// Undo published files, newest first, restoring what they replaced.
fn roll_back(published: &[Published]) {
    for file in published.iter().rev() {
        if let Err(e) = fs::remove_file(&file.path) {
            warn!("Could not remove {}: {}", file.path.display(), e);
        }
        if let Some(ref park) = file.parked {
            if let Err(e) = fs::rename(park, &file.path) {
                warn!("Could not restore {}: {}", file.path.display(), e);
            }
        }
        if let Some(ref dir) = file.created_dir {
            let _ = fs::remove_dir(dir);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::analysis::summarize_all;
    use crate::models::{EnrichedOrder, Order, SummarySet};
    use crate::transform::transform;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    pub fn sample_data() -> (Vec<Order>, Vec<EnrichedOrder>, SummarySet) {
        let orders = vec![
            Order {
                order_id: "O1".to_string(),
                product_name: "Laptop".to_string(),
                category: "Electronics".to_string(),
                quantity: 1,
                unit_price: Decimal::new(99999, 2),
                total_amount: Decimal::new(99999, 2),
                customer_id: "C1".to_string(),
                order_date: NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
                region: "North".to_string(),
            },
            Order {
                order_id: "O2".to_string(),
                product_name: "Desk, Oak".to_string(),
                category: "Furniture".to_string(),
                quantity: 2,
                unit_price: Decimal::new(15050, 2),
                total_amount: Decimal::new(30100, 2),
                customer_id: "C2".to_string(),
                order_date: NaiveDate::from_ymd_opt(2024, 2, 12).unwrap(),
                region: "South".to_string(),
            },
        ];
        let transformed = transform(&orders);
        let summaries = summarize_all(&transformed);
        (orders, transformed, summaries)
    }
}
