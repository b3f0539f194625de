//! Report generation module.
//!
//! Renders the six SVG charts and writes the supplementary outputs: the
//! enriched table as CSV and an optional JSON report.
//!
//! # Comprehensive Reports
//!
//! Use [`ComprehensiveReport`] for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use airbnb_report::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_comprehensive_report("Airbnb_Open_Data.csv", &result);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new("outputs");
//! generator.write_report_to_file(&report)?;
//! ```

mod charts;
mod generator;

pub use charts::{ChartRenderer, review_rate_fit, review_rate_points};
pub use generator::{
    CLEANED_FILE_NAME, ChartEntry, ComprehensiveReport, ProcessingSummaryReport, REPORT_FILE_NAME,
    ReportGenerator,
};
