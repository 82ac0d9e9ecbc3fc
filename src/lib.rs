//! sales-etl: batch ETL for e-commerce order data.
//!
//! The pipeline reads a CSV export of orders, drops or repairs defective
//! rows, derives calendar fields and segments, aggregates by five
//! dimensions and loads everything through pluggable sinks. Each stage is
//! a plain function over owned or borrowed data, so stages can also be
//! used on their own:
//!
//! ```no_run
//! use sales_etl::config::Config;
//! use sales_etl::pipeline::Pipeline;
//!
//! let summary = Pipeline::new(Config::default()).run()?;
//! println!("{} orders", summary.report.overview.total_orders);
//! # Ok::<(), sales_etl::error::PipelineError>(())
//! ```

pub mod analysis;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod transform;

pub use error::{PipelineError, PipelineResult, SinkError};
pub use pipeline::{Pipeline, RunSummary, Stage};
