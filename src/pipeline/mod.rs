//! Pipeline orchestration.
//!
//! Runs extract, clean, transform, aggregate, load, analyze and report in
//! order. The first failing stage aborts the run. Loader output is staged
//! and only committed after the report stage succeeds, so a failed run
//! never leaves a partial set of files in the output directory.

use crate::analysis::{analyze, summarize_all};
use crate::cleaner;
use crate::config::Config;
use crate::error::PipelineResult;
use crate::extract;
use crate::load::{LoadBatch, Loader};
use crate::models::{CleaningReport, SalesReport};
use crate::report;
use crate::transform::transform;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, info_span};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Clean,
    Transform,
    Aggregate,
    Load,
    Analyze,
    Report,
}

impl Stage {
    /// Stage name as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Clean => "clean",
            Stage::Transform => "transform",
            Stage::Aggregate => "aggregate",
            Stage::Load => "load",
            Stage::Analyze => "analyze",
            Stage::Report => "report",
        }
    }

    /// All stages in execution order.
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Extract,
            Stage::Clean,
            Stage::Transform,
            Stage::Aggregate,
            Stage::Load,
            Stage::Analyze,
            Stage::Report,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Skipped,
    Failed,
}

impl StageStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            StageStatus::Completed => "✅",
            StageStatus::Skipped => "⏭️",
            StageStatus::Failed => "❌",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Completed => write!(f, "completed"),
            StageStatus::Skipped => write!(f, "skipped"),
            StageStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Timing and outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub duration_ms: u64,
    /// Short human-readable result, e.g. row counts.
    pub detail: String,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub dry_run: bool,
    pub stages: Vec<StageRecord>,
    pub rows_extracted: usize,
    /// Lines the CSV reader could not decode.
    pub unreadable_rows: usize,
    pub cleaning: CleaningReport,
    pub report: SalesReport,
    /// Files written to the output directory.
    pub outputs: Vec<PathBuf>,
}

/// Records stage outcomes and drives the progress bar.
struct StageLog {
    records: Vec<StageRecord>,
    progress: Option<ProgressBar>,
}

impl StageLog {
    fn new(show_progress: bool) -> Self {
        let progress = show_progress.then(|| {
            let pb = ProgressBar::new(Stage::all().len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        });
        Self {
            records: Vec::new(),
            progress,
        }
    }

    /// Run one stage, recording its duration and outcome.
    fn run<T>(
        &mut self,
        stage: Stage,
        f: impl FnOnce() -> PipelineResult<(T, String)>,
    ) -> PipelineResult<T> {
        let _span = info_span!("pipeline_stage", stage = stage.name()).entered();
        info!(stage = stage.name(), "Starting stage");
        if let Some(ref pb) = self.progress {
            pb.set_message(stage.name());
        }

        let start = Instant::now();
        let result = f();
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((value, detail)) => {
                info!(stage = stage.name(), duration_ms, "Stage completed: {}", detail);
                self.records.push(StageRecord {
                    stage,
                    status: StageStatus::Completed,
                    duration_ms,
                    detail,
                });
                if let Some(ref pb) = self.progress {
                    pb.inc(1);
                }
                Ok(value)
            }
            Err(e) => {
                error!(stage = stage.name(), error = %e, "Stage failed");
                self.records.push(StageRecord {
                    stage,
                    status: StageStatus::Failed,
                    duration_ms,
                    detail: e.to_string(),
                });
                if let Some(ref pb) = self.progress {
                    pb.abandon_with_message(format!("{} failed", stage));
                }
                Err(e.in_stage(stage))
            }
        }
    }

    fn skip(&mut self, stage: Stage, reason: &str) {
        info!(stage = stage.name(), reason, "Skipping stage");
        self.records.push(StageRecord {
            stage,
            status: StageStatus::Skipped,
            duration_ms: 0,
            detail: reason.to_string(),
        });
        if let Some(ref pb) = self.progress {
            pb.inc(1);
        }
    }

    fn finish(&self) {
        if let Some(ref pb) = self.progress {
            pb.finish_with_message("done");
        }
    }
}

/// The batch pipeline.
pub struct Pipeline {
    config: Config,
    dry_run: bool,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            dry_run: false,
            show_progress: false,
        }
    }

    /// Run every computing stage but write nothing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Show a progress bar on stderr.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the pipeline end to end.
    pub fn run(&self) -> PipelineResult<RunSummary> {
        let config = &self.config;
        let _span = info_span!(
            "pipeline_run",
            input = %config.general.input.display(),
            dry_run = self.dry_run
        )
        .entered();

        let started_at = Utc::now();
        let start = Instant::now();
        let mut log = StageLog::new(self.show_progress);

        info!(
            stages = ?Stage::all().iter().map(|s| s.name()).collect::<Vec<_>>(),
            "Starting pipeline"
        );

        let extracted = log.run(Stage::Extract, || {
            let extracted = extract::read_orders(&config.general.input)?;
            let detail = format!(
                "{} rows read, {} unreadable",
                extracted.rows.len(),
                extracted.unreadable_rows
            );
            Ok((extracted, detail))
        })?;

        let cleaned = log.run(Stage::Clean, || {
            let cleaned = cleaner::clean(&extracted.rows, &config.cleaning)?;
            let detail = format!(
                "{} of {} rows kept, {} repairs",
                cleaned.report.rows_out,
                cleaned.report.rows_in,
                cleaned.report.repaired()
            );
            Ok((cleaned, detail))
        })?;

        let transformed = log.run(Stage::Transform, || {
            let transformed = transform(&cleaned.orders);
            let detail = format!("{} orders enriched", transformed.len());
            Ok((transformed, detail))
        })?;

        let summaries = log.run(Stage::Aggregate, || {
            let summaries = summarize_all(&transformed);
            let detail = summaries
                .iter()
                .map(|(group_by, rows)| format!("{} {}", rows.len(), group_by.key_name()))
                .collect::<Vec<_>>()
                .join(", ");
            Ok((summaries, detail))
        })?;

        let staged = if self.dry_run {
            log.skip(Stage::Load, "dry run");
            None
        } else {
            let batch = LoadBatch {
                cleaned: &cleaned.orders,
                transformed: &transformed,
                summaries: &summaries,
            };
            let mut loader = Loader::from_config(&config.general.output_dir, &config.load);
            Some(log.run(Stage::Load, || {
                let staged = loader.stage(&batch)?;
                let detail = format!("{} files staged", staged.files().len());
                Ok((staged, detail))
            })?)
        };

        let sales_report = log.run(Stage::Analyze, || {
            let sales_report = analyze(&transformed, &summaries, config.report.top_n);
            let detail = format!(
                "total revenue {:.2} over {} orders",
                sales_report.overview.total_revenue, sales_report.overview.total_orders
            );
            Ok((sales_report, detail))
        })?;

        let mut summary = RunSummary {
            input: config.general.input.clone(),
            output_dir: config.general.output_dir.clone(),
            started_at,
            finished_at: started_at,
            duration_seconds: 0.0,
            dry_run: self.dry_run,
            stages: Vec::new(),
            rows_extracted: extracted.rows.len(),
            unreadable_rows: extracted.unreadable_rows,
            cleaning: cleaned.report,
            report: sales_report,
            outputs: Vec::new(),
        };

        match staged {
            None => log.skip(Stage::Report, "dry run"),
            Some(mut staged) => {
                let formats = &config.report.formats;
                summary.stages = log.records.clone();
                summary.outputs = staged.files().to_vec();
                for format in formats {
                    let name = PathBuf::from(format.file_name());
                    if !summary.outputs.contains(&name) {
                        summary.outputs.push(name);
                    }
                }

                let outputs = log.run(Stage::Report, || {
                    let written = report::write_reports(staged.dir(), &summary, formats)?;
                    staged.add_files(written);
                    let committed = staged.commit()?;
                    let detail = format!("{} files committed", committed.len());
                    Ok((committed, detail))
                })?;
                summary.outputs = outputs;
            }
        }

        log.finish();
        summary.stages = log.records;
        summary.finished_at = Utc::now();
        summary.duration_seconds = start.elapsed().as_secs_f64();

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            outputs = summary.outputs.len(),
            "Pipeline completed"
        );

        Ok(summary)
    }
}
