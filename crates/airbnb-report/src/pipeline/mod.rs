//! Pipeline module.
//!
//! This module provides the report pipeline and its progress reporting.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{
    ClosureProgressReporter, ItemPosition, ProgressReporter, ProgressUpdate, ReportStage,
};
