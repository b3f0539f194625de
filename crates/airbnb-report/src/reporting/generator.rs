use crate::error::{ReportError, Result, ResultExt};
use crate::types::{EnrichedRecord, Insights, PipelineResult};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// File name of the exported enriched table.
pub const CLEANED_FILE_NAME: &str = "listings_cleaned.csv";

/// File name of the JSON report.
pub const REPORT_FILE_NAME: &str = "report.json";

// ============================================================================
// Comprehensive Report Types
// ============================================================================

/// Comprehensive report for CLI and library output.
///
/// Use this for both JSON output (`--json`) and file writing (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the exported cleaned table (if written)
    pub cleaned_data_file: Option<String>,
    /// Row counts and per-reason diagnostics
    pub processing_summary: ProcessingSummaryReport,
    /// Descriptive findings
    pub insights: Insights,
    /// Charts written, in report order
    pub charts: Vec<ChartEntry>,
}

/// Row accounting for the comprehensive report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSummaryReport {
    /// Total execution time in milliseconds
    pub duration_ms: u64,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_retained: usize,
    /// Percentage of input rows dropped
    pub rows_dropped_percent: f32,
    /// Drop counts keyed by reason
    pub dropped_by_reason: BTreeMap<String, usize>,
    /// Repair counts keyed by kind
    pub repaired_by_kind: BTreeMap<String, usize>,
    /// Missing values per input column, as loaded
    pub missing_by_column: BTreeMap<String, usize>,
    /// Warnings generated during the run
    pub warnings: Vec<String>,
}

/// One rendered chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartEntry {
    pub name: String,
    pub path: String,
    pub data_points: usize,
}

/// Writes the cleaned dataset and the JSON report.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Build the enriched table as a polars frame.
    ///
    /// Column names match the input headers so the loader can read the
    /// export back.
    pub fn to_dataframe(records: &[EnrichedRecord]) -> Result<DataFrame> {
        let listing = |f: fn(&EnrichedRecord) -> Option<String>| -> Vec<Option<String>> {
            records.iter().map(f).collect()
        };

        let df = df! {
            "id" => records.iter().map(|r| r.listing.id.clone()).collect::<Vec<_>>(),
            "name" => listing(|r| r.listing.name.clone()),
            "host_identity_verified" => listing(|r| r.listing.host_verification.clone()),
            "neighborhood_group" => listing(|r| r.listing.neighborhood_group.clone()),
            "neighborhood" => listing(|r| r.listing.neighborhood.clone()),
            "room_type" => records.iter().map(|r| r.listing.room_type.as_str()).collect::<Vec<_>>(),
            "construction_year" => records.iter().map(|r| r.listing.construction_year).collect::<Vec<_>>(),
            "price" => records.iter().map(|r| r.listing.price).collect::<Vec<_>>(),
            "service_fee" => records.iter().map(|r| r.listing.service_fee).collect::<Vec<_>>(),
            "number_of_reviews" => records.iter().map(|r| r.listing.number_of_reviews).collect::<Vec<_>>(),
            "reviews_per_month" => records.iter().map(|r| r.listing.reviews_per_month).collect::<Vec<_>>(),
            "review_rate_number" => records.iter().map(|r| r.listing.review_rating).collect::<Vec<_>>(),
            "availability_365" => records.iter().map(|r| r.listing.availability_365).collect::<Vec<_>>(),
            "cancellation_policy" => listing(|r| r.listing.cancellation_policy.clone()),
            "days_booked" => records.iter().map(|r| r.days_booked).collect::<Vec<_>>(),
            "host_category" => records.iter().map(|r| r.host_category.as_str()).collect::<Vec<_>>(),
        }?;

        Ok(df)
    }

    /// Write the enriched table to `listings_cleaned.csv`.
    pub fn export_cleaned(&self, records: &[EnrichedRecord]) -> Result<PathBuf> {
        let mut df = Self::to_dataframe(records)?;

        fs::create_dir_all(&self.output_dir)
            .context(format!("Creating '{}'", self.output_dir.display()))?;
        let output_path = self.output_dir.join(CLEANED_FILE_NAME);
        let mut file =
            File::create(&output_path).context(format!("Creating '{}'", output_path.display()))?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut df)
            .map_err(|e| ReportError::ExportFailed(e.to_string()))?;

        info!("Dataset saved: {} ({} rows)", output_path.display(), df.height());
        Ok(output_path)
    }

    /// Build a comprehensive report from pipeline results.
    pub fn build_comprehensive_report(input_file: &str, result: &PipelineResult) -> ComprehensiveReport {
        let summary = &result.summary;

        let processing_summary = ProcessingSummaryReport {
            duration_ms: summary.duration_ms,
            rows_read: summary.rows_read,
            rows_dropped: summary.rows_dropped,
            rows_retained: summary.rows_retained,
            rows_dropped_percent: summary.rows_dropped_percentage(),
            dropped_by_reason: summary
                .diagnostics
                .dropped
                .iter()
                .map(|(reason, count)| (reason.as_str().to_string(), *count))
                .collect(),
            repaired_by_kind: summary
                .diagnostics
                .repaired
                .iter()
                .map(|(kind, count)| (kind.as_str().to_string(), *count))
                .collect(),
            missing_by_column: summary.missing_values.clone(),
            warnings: summary.warnings.clone(),
        };

        let charts = result
            .charts
            .iter()
            .map(|chart| ChartEntry {
                name: chart.kind.file_name().to_string(),
                path: chart.path.display().to_string(),
                data_points: chart.data_points,
            })
            .collect();

        ComprehensiveReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            cleaned_data_file: result
                .cleaned_data_path
                .as_ref()
                .map(|p| p.display().to_string()),
            processing_summary,
            insights: result.insights.clone(),
            charts,
        }
    }

    /// Write a comprehensive report to `report.json` in the output directory.
    pub fn write_report_to_file(&self, report: &ComprehensiveReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context(format!("Creating '{}'", self.output_dir.display()))?;

        let report_path = self.output_dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(report)?;
        let mut file =
            File::create(&report_path).context(format!("Creating '{}'", report_path.display()))?;
        file.write_all(json.as_bytes())?;
        debug!("Report is {} bytes", json.len());

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }
}
