//! CLI entry point for the listings report.

use airbnb_report::{
    ComprehensiveReport, DaysBookedPolicy, Pipeline, PipelineResult, ReportConfig, ReportGenerator,
};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};

/// CLI-compatible out-of-range `days_booked` policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDaysBookedPolicy {
    /// Clamp into the availability period
    Clamp,
    /// Drop the listing
    Drop,
}

impl From<CliDaysBookedPolicy> for DaysBookedPolicy {
    fn from(cli: CliDaysBookedPolicy) -> Self {
        match cli {
            CliDaysBookedPolicy::Clamp => DaysBookedPolicy::Clamp,
            CliDaysBookedPolicy::Drop => DaysBookedPolicy::Drop,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Descriptive report for the Airbnb open listings dataset",
    long_about = "Cleans an Airbnb listings CSV and renders six SVG charts.\n\n\
                  EXAMPLES:\n  \
                  # Default input and output locations\n  \
                  airbnb-report\n\n  \
                  # Custom input, top 5 neighborhoods, JSON report\n  \
                  airbnb-report -i listings.csv --top-n 5 -r\n\n  \
                  # Machine-readable summary\n  \
                  airbnb-report --json | jq .processing_summary"
)]
struct Args {
    /// Path to the listings CSV
    #[arg(short, long, default_value = "Airbnb_Open_Data.csv")]
    input: PathBuf,

    /// Output directory for charts and exports
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// Number of neighborhoods in each top-N chart
    #[arg(long, default_value = "10")]
    top_n: usize,

    /// Price quantile above which listings are left out of the scatter
    #[arg(long, default_value = "0.99")]
    price_cap_quantile: f64,

    /// What to do with availability values outside 0..=365
    #[arg(long, value_enum, default_value = "clamp")]
    days_booked_policy: CliDaysBookedPolicy,

    /// Do not write listings_cleaned.csv
    #[arg(long)]
    no_export: bool,

    /// Write a detailed JSON report (report.json) to the output directory
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = ReportConfig::builder()
        .input_path(&args.input)
        .output_dir(&args.output)
        .top_n(args.top_n)
        .price_cap_quantile(args.price_cap_quantile)
        .days_booked_policy(args.days_booked_policy.into())
        .export_cleaned(!args.no_export)
        .build()?;
    debug!("Configuration: {:?}", config);

    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?;

    let result = pipeline.run()?;
    handle_pipeline_output(&args, &result)
}

fn handle_pipeline_output(args: &Args, result: &PipelineResult) -> Result<()> {
    let input = args.input.display().to_string();
    let report = ReportGenerator::build_comprehensive_report(&input, result);

    if args.emit_report {
        let path = ReportGenerator::new(&args.output).write_report_to_file(&report)?;
        info!("Detailed report written to {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        print_human_readable_summary(&report);
    }

    Ok(())
}

/// Print a human-readable summary of the run.
///
/// This is the default output when neither `--json` nor `--quiet` are specified.
fn print_human_readable_summary(report: &ComprehensiveReport) {
    let summary = &report.processing_summary;
    let insights = &report.insights;

    println!();
    println!("{}", "=".repeat(80));
    println!("REPORT COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input: {}", report.input_file);
    if let Some(ref cleaned) = report.cleaned_data_file {
        println!("Cleaned data: {}", cleaned);
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} read, {} retained, {} dropped ({:.1}%)",
        summary.rows_read, summary.rows_retained, summary.rows_dropped, summary.rows_dropped_percent
    );
    for (reason, count) in &summary.dropped_by_reason {
        println!("    - dropped {}: {}", reason, count);
    }
    for (kind, count) in &summary.repaired_by_kind {
        println!("    - {}: {}", kind, count);
    }
    println!();

    let missing: Vec<_> = summary
        .missing_by_column
        .iter()
        .filter(|(_, count)| **count > 0)
        .collect();
    if !missing.is_empty() {
        println!("Missing Values (as loaded):");
        for (column, count) in missing {
            println!("  {:<24} {}", column, count);
        }
        println!();
    }

    if !insights.room_type_distribution.is_empty() {
        println!("Room Types:");
        for (room_type, count) in &insights.room_type_distribution {
            println!("  {:<20} {}", room_type, count);
        }
        if let Some(ref strict) = insights.strict_policy_room_type {
            println!("  Most common under strict cancellation: {}", strict);
        }
        println!();
    }

    if !insights.price_by_neighborhood_group.is_empty() {
        println!("Average Price by Neighborhood Group:");
        for group in &insights.price_by_neighborhood_group {
            println!("  {:<20} ${:.2} ({} listings)", group.key, group.mean_price, group.count);
        }
        println!();
    }

    if let Some(ref fit) = insights.review_rate_fit {
        println!(
            "Review rate vs ln(price): slope {:.4}, intercept {:.4}, R^2 {:.4} (n = {})",
            fit.slope, fit.intercept, fit.r_squared, fit.n
        );
        println!();
    }

    println!("Charts:");
    for chart in &report.charts {
        println!("  {} ({} points)", chart.path, chart.data_points);
    }
    println!();

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
