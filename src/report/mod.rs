//! Report generation module.
//!
//! Renders the run summary as Markdown and JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};

use crate::error::PipelineResult;
use crate::pipeline::RunSummary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown document
    Markdown,
    /// JSON document
    Json,
}

impl ReportFormat {
    /// File name the report is written to.
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "analysis_report.md",
            ReportFormat::Json => "analysis_report.json",
        }
    }

    /// Render the summary in this format.
    pub fn render(&self, summary: &RunSummary) -> PipelineResult<String> {
        Ok(match self {
            ReportFormat::Markdown => generate_markdown_report(summary),
            ReportFormat::Json => generate_json_report(summary)?,
        })
    }
}

/// Write one report file per format into `dir`.
///
/// Returns the written file names relative to `dir`.
pub fn write_reports(
    dir: &Path,
    summary: &RunSummary,
    formats: &[ReportFormat],
) -> PipelineResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let name = PathBuf::from(format.file_name());
        if written.contains(&name) {
            continue;
        }
        fs::write(dir.join(format.file_name()), format.render(summary)?)?;
        written.push(name);
    }
    Ok(written)
}
