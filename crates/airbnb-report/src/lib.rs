//! Airbnb Listings Report Library
//!
//! Cleans a raw Airbnb listings export and turns it into a fixed set of
//! descriptive charts, built with Rust, Polars and Plotters.
//!
//! # Overview
//!
//! The pipeline runs five stages in order:
//!
//! - **Loading**: Reads the CSV with polars; headers are normalized, values stay text
//! - **Cleaning**: Currency parsing, categorical standardization, the per-field
//!   missing-value policy and deduplication by listing id
//! - **Feature Engineering**: `days_booked` and the verified/non-verified host category
//! - **Aggregation**: Grouped means, quantiles, distributions and an OLS fit
//! - **Reporting**: Six SVG charts, the cleaned table as CSV and an optional JSON report
//!
//! Bad rows are dropped and counted by reason; they never stop a run.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use airbnb_report::{Pipeline, ReportConfig};
//!
//! let config = ReportConfig::builder()
//!     .input_path("Airbnb_Open_Data.csv")
//!     .output_dir("outputs")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! for chart in &result.charts {
//!     println!("{}", chart.path.display());
//! }
//! ```

pub mod aggregator;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::DataCleaner;
pub use config::{
    ChartStyle, ConfigValidationError, DaysBookedPolicy, ReportConfig, ReportConfigBuilder,
};
pub use error::{ReportError, Result as ReportResult, ResultExt};
pub use features::FeatureEngineer;
pub use imputers::StatisticalImputer;
pub use loader::{DatasetLoader, LoadedDataset};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter, ProgressUpdate,
    ReportStage,
};
pub use reporting::{ChartRenderer, ComprehensiveReport, ProcessingSummaryReport, ReportGenerator};
pub use types::{
    AggregateView, ChartArtifact, ChartKind, CleanedRecord, CleaningSummary, Diagnostics,
    DropReason, EnrichedRecord, GroupKey, GroupStats, HostCategory, Insights, LinearFit, Metric,
    PipelineResult, RawRecord, RepairKind, RoomType, RunSummary, SortOrder,
};
