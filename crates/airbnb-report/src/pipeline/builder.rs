//! Main report pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating load, clean, enrich, aggregate and render.

use crate::aggregator::{
    aggregate, distributions, price_by_neighborhood_group, room_type_distribution,
    strict_policy_room_type, top_n, yearly_counts,
};
use crate::cleaner::DataCleaner;
use crate::config::ReportConfig;
use crate::error::Result;
use crate::features::FeatureEngineer;
use crate::loader::{DatasetLoader, LoadedDataset};
use crate::pipeline::progress::{
    ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportStage,
};
use crate::reporting::{ChartRenderer, ReportGenerator, review_rate_fit, review_rate_points};
use crate::types::{
    ChartArtifact, ChartKind, DropReason, EnrichedRecord, GroupKey, Insights, Metric,
    PipelineResult, RawRecord, RunSummary, SortOrder,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Share of dropped rows above which the run summary carries a warning.
pub const HIGH_DROP_WARNING_PERCENT: f32 = 30.0;

/// The main report pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use airbnb_report::{Pipeline, ReportConfig};
///
/// let result = Pipeline::builder()
///     .config(ReportConfig::builder().input_path("Airbnb_Open_Data.csv").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// println!("{} rows retained", result.summary.rows_retained);
/// ```
pub struct Pipeline {
    config: ReportConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
    features: FeatureEngineer,
    renderer: ChartRenderer,
    reporter: ReportGenerator,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Load the configured input file and run every stage.
    ///
    /// Structural failures (missing file, missing column, render or export
    /// failure) stop the run. Bad rows never do.
    pub fn run(&self) -> Result<PipelineResult> {
        let start_time = Instant::now();
        self.finish(self.load().and_then(|dataset| self.process_internal(dataset, start_time)))
    }

    /// Run every stage after loading on rows already in memory.
    pub fn process(&self, raw: Vec<RawRecord>) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let dataset = LoadedDataset {
            records: raw,
            malformed_rows: 0,
        };
        self.finish(self.process_internal(dataset, start_time))
    }

    fn finish(&self, outcome: Result<PipelineResult>) -> Result<PipelineResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error [{}]: {}", e.error_code(), e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn load(&self) -> Result<LoadedDataset> {
        self.report_progress(ProgressUpdate::new(
            ReportStage::Loading,
            0.0,
            format!("Loading {}...", self.config.input_path.display()),
        ));
        let dataset = DatasetLoader::load_path(&self.config.input_path)?;
        self.report_progress(ProgressUpdate::new(
            ReportStage::Loading,
            1.0,
            format!("Loaded {} rows", dataset.records.len()),
        ));
        Ok(dataset)
    }

    fn process_internal(
        &self,
        dataset: LoadedDataset,
        start_time: Instant,
    ) -> Result<PipelineResult> {
        info!("Starting report pipeline...");
        let mut summary = RunSummary::new();
        summary.rows_read = dataset.rows_read();
        summary
            .diagnostics
            .record_drops(DropReason::MalformedRow, dataset.malformed_rows);
        let raw = dataset.records;

        // Step 1: Clean
        self.report_progress(ProgressUpdate::new(
            ReportStage::Cleaning,
            0.0,
            "Cleaning rows...",
        ));
        let (cleaned, cleaning) = self.cleaner.clean(raw);
        summary.diagnostics.merge(&cleaning.diagnostics);
        summary.missing_values = cleaning.missing_values;
        if let Some(fill) = cleaning.service_fee_fill {
            debug!("Service fee median fill: {:.2}", fill);
        }
        self.report_progress(ProgressUpdate::new(
            ReportStage::Cleaning,
            1.0,
            format!("{} rows passed validation", cleaning.rows_retained),
        ));

        // Step 2: Derived features
        self.report_progress(ProgressUpdate::new(
            ReportStage::FeatureEngineering,
            0.0,
            "Computing derived features...",
        ));
        let (records, feature_diagnostics) = self.features.enrich(cleaned);
        summary.diagnostics.merge(&feature_diagnostics);
        self.report_progress(ProgressUpdate::new(
            ReportStage::FeatureEngineering,
            1.0,
            "Derived features complete",
        ));

        summary.rows_retained = records.len();
        summary.rows_dropped = summary.diagnostics.total_dropped();
        self.add_summary_warnings(&mut summary);

        // Step 3: Aggregate
        self.report_progress(ProgressUpdate::new(
            ReportStage::Aggregation,
            0.0,
            "Aggregating...",
        ));
        let insights = self.build_insights(&records);
        self.report_progress(ProgressUpdate::new(
            ReportStage::Aggregation,
            1.0,
            "Aggregation complete",
        ));

        // Step 4: Render
        let charts = self.render_charts(&records, &insights)?;

        // Step 5: Export
        let cleaned_data_path = if self.config.export_cleaned {
            self.report_progress(ProgressUpdate::new(
                ReportStage::Export,
                0.0,
                "Exporting cleaned table...",
            ));
            let path = self.reporter.export_cleaned(&records)?;
            self.report_progress(ProgressUpdate::new(
                ReportStage::Export,
                1.0,
                "Export complete",
            ));
            Some(path)
        } else {
            debug!("Skipping cleaned table export (disabled)");
            None
        };

        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Pipeline finished in {} ms: {} read, {} retained, {} dropped",
            summary.duration_ms, summary.rows_read, summary.rows_retained, summary.rows_dropped
        );

        Ok(PipelineResult {
            summary,
            insights,
            charts,
            cleaned_data_path,
        })
    }

    fn add_summary_warnings(&self, summary: &mut RunSummary) {
        let dropped_pct = summary.rows_dropped_percentage();
        if dropped_pct > HIGH_DROP_WARNING_PERCENT {
            let message = format!(
                "{:.1}% of input rows were dropped ({} of {})",
                dropped_pct, summary.rows_dropped, summary.rows_read
            );
            warn!("{}", message);
            summary.add_warning(message);
        }
        if summary.rows_retained == 0 {
            let message = "No rows retained; charts will be empty".to_string();
            warn!("{}", message);
            summary.add_warning(message);
        }
    }

    fn build_insights(&self, records: &[EnrichedRecord]) -> Insights {
        let neighborhoods = aggregate(records, GroupKey::Neighborhood, None);
        let points = review_rate_points(records, self.config.price_cap_quantile);

        Insights {
            room_type_distribution: room_type_distribution(records),
            strict_policy_room_type: strict_policy_room_type(records),
            price_by_neighborhood_group: price_by_neighborhood_group(records),
            most_expensive_neighborhoods: top_n(
                &neighborhoods,
                self.config.top_n,
                SortOrder::Descending,
            ),
            least_expensive_neighborhoods: top_n(
                &neighborhoods,
                self.config.top_n,
                SortOrder::Ascending,
            ),
            review_rate_fit: review_rate_fit(&points),
        }
    }

    fn render_charts(
        &self,
        records: &[EnrichedRecord],
        insights: &Insights,
    ) -> Result<Vec<ChartArtifact>> {
        let total = ChartKind::ALL.len();
        let mut charts = Vec::with_capacity(total);

        for (i, kind) in ChartKind::ALL.into_iter().enumerate() {
            self.report_progress(ProgressUpdate::at_item(
                ReportStage::Rendering,
                kind.file_name(),
                i,
                total,
                format!("Rendering {}...", kind.file_name()),
            ));

            let artifact = match kind {
                ChartKind::ConstructionYearTrend => {
                    self.renderer.construction_year_trend(&yearly_counts(records))?
                }
                ChartKind::TopExpensiveNeighborhoods => self.renderer.neighborhood_bars(
                    kind,
                    &format!("Top {} Most Expensive Neighborhoods", self.config.top_n),
                    &insights.most_expensive_neighborhoods,
                )?,
                ChartKind::TopCheapestNeighborhoods => self.renderer.neighborhood_bars(
                    kind,
                    &format!("Top {} Cheapest Neighborhoods", self.config.top_n),
                    &insights.least_expensive_neighborhoods,
                )?,
                ChartKind::PriceByRoomType => self.renderer.category_boxplot(
                    kind,
                    "Price Distribution by Room Type",
                    "Price ($)",
                    &distributions(records, GroupKey::RoomType, Metric::Price),
                )?,
                ChartKind::ReviewRateVsLogPrice => {
                    let points = review_rate_points(records, self.config.price_cap_quantile);
                    self.renderer
                        .review_rate_scatter(&points, insights.review_rate_fit.as_ref())?
                }
                ChartKind::ReviewsPerMonthByHostType => self.renderer.category_boxplot(
                    kind,
                    "Reviews per Month by Host Type",
                    "Reviews per month",
                    &distributions(records, GroupKey::HostCategory, Metric::ReviewsPerMonth),
                )?,
            };
            charts.push(artifact);
        }

        self.report_progress(ProgressUpdate::at_item(
            ReportStage::Rendering,
            "charts",
            total,
            total,
            "All charts rendered",
        ));
        Ok(charts)
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<ReportConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let renderer = ChartRenderer::new(config.output_dir.clone(), config.chart_style.clone());
        let reporter = ReportGenerator::new(config.output_dir.clone());
        let features = FeatureEngineer::new(config.days_in_period, config.days_booked_policy);

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cleaner: DataCleaner::new(),
            features,
            renderer,
            reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DropReason;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn raw(id: &str, neighborhood: &str, room_type: &str, price: &str) -> RawRecord {
        RawRecord {
            id: Some(id.to_string()),
            neighborhood: Some(neighborhood.to_string()),
            neighborhood_group: Some("Manhattan".to_string()),
            room_type: Some(room_type.to_string()),
            price: Some(price.to_string()),
            construction_year: Some("2010".to_string()),
            review_rate_number: Some("4".to_string()),
            number_of_reviews: Some("2".to_string()),
            reviews_per_month: Some("0.5".to_string()),
            availability_365: Some("100".to_string()),
            ..RawRecord::default()
        }
    }

    fn pipeline_in(dir: &TempDir) -> PipelineBuilder {
        let config = ReportConfig::builder()
            .output_dir(dir.path())
            .top_n(2)
            .build()
            .unwrap();
        Pipeline::builder().config(config)
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().top_n, 10);
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = ReportConfig {
            top_n: 0,
            ..ReportConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_process_records_end_to_end() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            raw("1", "Harlem", "Private room", "$100"),
            raw("2", "Chelsea", "Entire home/apt", "$1,000"),
            raw("3", "Astoria", "Shared room", "$50"),
            raw("3", "Astoria", "Shared room", "$55"),
        ];

        let result = pipeline_in(&dir).build().unwrap().process(rows).unwrap();

        assert_eq!(result.summary.rows_read, 4);
        assert_eq!(result.summary.rows_retained, 3);
        assert_eq!(result.summary.rows_dropped, 1);
        assert_eq!(result.summary.diagnostics.dropped_for(DropReason::DuplicateId), 1);
        assert_eq!(result.charts.len(), 6);
        assert!(result.charts.iter().all(|c| c.path.exists()));
        assert!(result.cleaned_data_path.as_ref().is_some_and(|p| p.exists()));

        let top: Vec<&str> = result
            .insights
            .most_expensive_neighborhoods
            .iter()
            .map(|g| g.key.as_str())
            .collect();
        assert_eq!(top, vec!["Chelsea", "Harlem"]);
    }

    #[test]
    fn test_high_drop_rate_warns() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            raw("1", "Harlem", "Private room", "$100"),
            raw("2", "Harlem", "castle", "$100"),
            raw("3", "Harlem", "Private room", "oops"),
        ];

        let result = pipeline_in(&dir).build().unwrap().process(rows).unwrap();
        assert_eq!(result.summary.rows_retained, 1);
        assert_eq!(result.summary.warnings.len(), 1);
        assert!(result.summary.warnings[0].contains("dropped"));
    }

    #[test]
    fn test_progress_stages_in_order() {
        let dir = TempDir::new().unwrap();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let pipeline = pipeline_in(&dir)
            .on_progress(move |update| {
                if let Ok(mut seen) = stages_clone.lock() {
                    seen.push(update.stage);
                }
            })
            .build()
            .unwrap();
        pipeline.process(vec![raw("1", "Harlem", "Private room", "$100")]).unwrap();

        let mut seen = stages.lock().unwrap().clone();
        seen.dedup();
        assert_eq!(
            seen,
            vec![
                ReportStage::Cleaning,
                ReportStage::FeatureEngineering,
                ReportStage::Aggregation,
                ReportStage::Rendering,
                ReportStage::Export,
                ReportStage::Complete,
            ]
        );
    }

    #[test]
    fn test_run_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let config = ReportConfig::builder()
            .input_path(dir.path().join("absent.csv"))
            .output_dir(dir.path())
            .build()
            .unwrap();

        let failed = Arc::new(Mutex::new(false));
        let failed_clone = failed.clone();
        let err = Pipeline::builder()
            .config(config)
            .on_progress(move |update| {
                if update.stage == ReportStage::Failed
                    && let Ok(mut flag) = failed_clone.lock()
                {
                    *flag = true;
                }
            })
            .build()
            .unwrap()
            .run()
            .unwrap_err();

        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(*failed.lock().unwrap());
        assert!(!dir.path().join("construction_year_trend.svg").exists());
    }
}
