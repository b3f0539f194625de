//! Progress reporting for the report pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use airbnb_report::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .run();
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the report pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    /// Reading the input file
    Loading,
    /// Parsing, validating and deduplicating rows
    Cleaning,
    /// Computing derived features
    FeatureEngineering,
    /// Grouped statistics and insights
    Aggregation,
    /// Drawing the charts
    Rendering,
    /// Writing the cleaned table
    Export,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl ReportStage {
    /// The stages that do work, in execution order.
    pub const WORKING: [ReportStage; 6] = [
        Self::Loading,
        Self::Cleaning,
        Self::FeatureEngineering,
        Self::Aggregation,
        Self::Rendering,
        Self::Export,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Dataset",
            Self::Cleaning => "Cleaning Data",
            Self::FeatureEngineering => "Engineering Features",
            Self::Aggregation => "Aggregating",
            Self::Rendering => "Rendering Charts",
            Self::Export => "Exporting Results",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run spent in this stage. Chart rendering
    /// dominates on large inputs.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading | Self::Cleaning => 0.20,
            Self::Rendering => 0.30,
            Self::FeatureEngineering | Self::Aggregation | Self::Export => 0.10,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Overall progress at the moment this stage starts.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            stage => Self::WORKING
                .iter()
                .take_while(|s| *s != stage)
                .map(|s| s.weight())
                .sum(),
        }
    }
}

/// Position inside a stage that works through a list of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPosition {
    pub current: usize,
    pub total: usize,
}

/// Progress update emitted between and within stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ReportStage,

    /// Item being worked on, e.g. a chart file name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<ItemPosition>,
}

impl ProgressUpdate {
    /// Update at a fraction of the way through `stage`.
    pub fn new(stage: ReportStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            detail: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            position: None,
        }
    }

    /// Update for item `current` of `total` within `stage`.
    pub fn at_item(
        stage: ReportStage,
        detail: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let fraction = match total {
            0 => 0.0,
            _ => current as f32 / total as f32,
        };
        Self {
            detail: Some(detail.into()),
            position: Some(ItemPosition { current, total }),
            ..Self::new(stage, fraction, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(ReportStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ReportStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates.
///
/// Implementations must be `Send + Sync` so a pipeline can run on a worker
/// thread while updates are consumed elsewhere.
pub trait ProgressReporter: Send + Sync {
    /// Called at each stage boundary and once per rendered chart.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(ReportStage::Cleaning, 0.5, "Cleaning...");
        assert_eq!(update.stage, ReportStage::Cleaning);
        assert!(update.detail.is_none());
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.30).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_at_item() {
        let update = ProgressUpdate::at_item(
            ReportStage::Rendering,
            "price_by_room_type.svg",
            3,
            6,
            "Rendering chart",
        );
        assert_eq!(update.detail.as_deref(), Some("price_by_room_type.svg"));
        assert_eq!(update.stage_progress, 0.5);
        assert_eq!(update.position, Some(ItemPosition { current: 3, total: 6 }));
        assert!((update.progress - 0.75).abs() < 1e-6);

        let empty = ProgressUpdate::at_item(ReportStage::Rendering, "charts", 0, 0, "none");
        assert_eq!(empty.stage_progress, 0.0);
    }

    #[test]
    fn test_progress_update_terminal_states() {
        let done = ProgressUpdate::complete("Done!");
        assert_eq!(done.stage, ReportStage::Complete);
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, ReportStage::Failed);
        assert_eq!(failed.progress, 0.0);
    }

    #[test]
    fn test_stage_weights_cover_run() {
        let total_weight: f32 = ReportStage::WORKING.iter().map(|s| s.weight()).sum();
        assert!((total_weight - 1.0).abs() < 1e-6);

        assert_eq!(ReportStage::Loading.base_progress(), 0.0);
        assert!((ReportStage::Rendering.base_progress() - 0.60).abs() < 1e-6);
        assert!((ReportStage::Export.base_progress() - 0.90).abs() < 1e-6);
    }

    #[test]
    fn test_stage_json_values() {
        assert_eq!(
            serde_json::to_string(&ReportStage::FeatureEngineering).unwrap(),
            "\"feature_engineering\""
        );
        assert_eq!(serde_json::to_string(&ReportStage::Export).unwrap(), "\"export\"");
    }

    #[test]
    fn test_closure_reporter_from_worker_thread() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let reporter: Arc<dyn ProgressReporter> =
            Arc::new(ClosureProgressReporter::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));

        let worker = Arc::clone(&reporter);
        std::thread::spawn(move || {
            worker.report(ProgressUpdate::new(ReportStage::Loading, 0.5, "Loading"));
        })
        .join()
        .unwrap();
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
