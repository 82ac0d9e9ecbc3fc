//! Error types for pipeline runs.
//!
//! Row-level defects never show up here; the cleaner filters them and
//! counts them in its report. What remains are stage-fatal errors and
//! errors coming back from sinks.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Input could not be read as CSV
    #[error("Failed to read input {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Header row lacks a required column
    #[error("Input is missing required column '{0}'")]
    MissingColumn(String),

    /// No data rows at all
    #[error("Input is empty: {0}")]
    EmptyInput(String),

    /// Every row was dropped by the cleaner
    #[error("All {rows} input rows were rejected during cleaning")]
    AllRowsRejected { rows: usize },

    /// A sink failed while writing
    #[error("Sink '{sink}' failed: {source}")]
    Sink {
        sink: String,
        #[source]
        source: SinkError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stage aborted the run
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Wrap an error with the stage it aborted.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::StageFailed { .. } => already,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage that failed, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error without its stage wrapper.
    pub fn root(&self) -> &PipelineError {
        match self {
            Self::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors raised by a sink. Passed through to the caller untouched.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stage_wraps_once() {
        let err = PipelineError::AllRowsRejected { rows: 3 }
            .in_stage(Stage::Clean)
            .in_stage(Stage::Transform);

        assert_eq!(err.stage(), Some(Stage::Clean));
        assert!(matches!(
            err.root(),
            PipelineError::AllRowsRejected { rows: 3 }
        ));
    }

    #[test]
    fn test_stage_failed_message() {
        let err = PipelineError::EmptyInput("no data rows".to_string()).in_stage(Stage::Extract);
        let message = err.to_string();
        assert!(message.contains("extract"));
        assert!(message.contains("no data rows"));
    }

    #[test]
    fn test_sink_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PipelineError::Sink {
            sink: "csv".to_string(),
            source: SinkError::from(io),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("denied"));
    }
}
