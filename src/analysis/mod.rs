//! Analysis modules.
//!
//! Grouped summaries per dimension and the descriptive report built on
//! top of them.

pub mod aggregator;
pub mod insights;

pub use aggregator::*;
pub use insights::analyze;
