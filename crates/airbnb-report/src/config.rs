//! Configuration types for the report pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! Chart styling lives here too and is handed to the reporter explicitly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when `days_booked` would fall outside `0..=days_in_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DaysBookedPolicy {
    /// Clamp into `0..=days_in_period` and count the repair
    #[default]
    Clamp,
    /// Drop the row and count it as out of domain
    Drop,
}

/// Visual settings shared by every chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Font family for captions and labels.
    pub font_family: String,
    /// Caption font size.
    pub caption_size: u32,
    /// Axis label font size.
    pub label_size: u32,
    /// Main series color (RGB).
    pub primary_color: [u8; 3],
    /// Regression line and highlight color (RGB).
    pub accent_color: [u8; 3],
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            font_family: "sans-serif".to_string(),
            caption_size: 26,
            label_size: 14,
            primary_color: [76, 114, 176],
            accent_color: [196, 78, 82],
        }
    }
}

/// Configuration for the report pipeline.
///
/// Use [`ReportConfig::builder()`] to create a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use airbnb_report::config::{ReportConfig, DaysBookedPolicy};
///
/// let config = ReportConfig::builder()
///     .input_path("Airbnb_Open_Data.csv")
///     .output_dir("charts")
///     .top_n(10)
///     .days_booked_policy(DaysBookedPolicy::Drop)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Path of the listings CSV.
    /// Default: "Airbnb_Open_Data.csv"
    pub input_path: PathBuf,

    /// Directory receiving charts, the cleaned CSV and the JSON report.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Number of neighborhoods in each top-N chart.
    /// Default: 10
    pub top_n: usize,

    /// Prices above this quantile are left out of the review-rate scatter.
    /// Default: 0.99
    pub price_cap_quantile: f64,

    /// Length of the availability period in days.
    /// Default: 365
    pub days_in_period: u32,

    /// Handling of availability values outside the period.
    /// Default: Clamp
    pub days_booked_policy: DaysBookedPolicy,

    /// Whether to write the enriched table as CSV.
    /// Default: true
    pub export_cleaned: bool,

    /// Chart styling.
    pub chart_style: ChartStyle,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("Airbnb_Open_Data.csv"),
            output_dir: PathBuf::from("outputs"),
            top_n: 10,
            price_cap_quantile: 0.99,
            days_in_period: 365,
            days_booked_policy: DaysBookedPolicy::default(),
            export_cleaned: true,
            chart_style: ChartStyle::default(),
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.top_n == 0 {
            return Err(ConfigValidationError::InvalidTopN(self.top_n));
        }

        if !(self.price_cap_quantile > 0.0 && self.price_cap_quantile <= 1.0) {
            return Err(ConfigValidationError::InvalidQuantile {
                field: "price_cap_quantile".to_string(),
                value: self.price_cap_quantile,
            });
        }

        if self.days_in_period == 0 {
            return Err(ConfigValidationError::InvalidPeriod(self.days_in_period));
        }

        if self.chart_style.width < 200 || self.chart_style.height < 200 {
            return Err(ConfigValidationError::InvalidCanvas {
                width: self.chart_style.width,
                height: self.chart_style.height,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid quantile for '{field}': {value} (must be in (0.0, 1.0])")]
    InvalidQuantile { field: String, value: f64 },

    #[error("Invalid top-N: {0} (must be at least 1)")]
    InvalidTopN(usize),

    #[error("Invalid availability period: {0} days (must be at least 1)")]
    InvalidPeriod(u32),

    #[error("Invalid chart canvas {width}x{height} (both sides must be at least 200px)")]
    InvalidCanvas { width: u32, height: u32 },
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    input_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    top_n: Option<usize>,
    price_cap_quantile: Option<f64>,
    days_in_period: Option<u32>,
    days_booked_policy: Option<DaysBookedPolicy>,
    export_cleaned: Option<bool>,
    chart_style: Option<ChartStyle>,
}

impl ReportConfigBuilder {
    /// Set the input CSV path.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the number of neighborhoods shown in top-N charts.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Set the price quantile above which listings are left out of the
    /// review-rate scatter.
    ///
    /// # Arguments
    /// * `quantile` - Value in (0.0, 1.0] (e.g., 0.99 = 99th percentile)
    pub fn price_cap_quantile(mut self, quantile: f64) -> Self {
        self.price_cap_quantile = Some(quantile);
        self
    }

    /// Set the length of the availability period in days.
    pub fn days_in_period(mut self, days: u32) -> Self {
        self.days_in_period = Some(days);
        self
    }

    /// Set the out-of-range `days_booked` policy.
    pub fn days_booked_policy(mut self, policy: DaysBookedPolicy) -> Self {
        self.days_booked_policy = Some(policy);
        self
    }

    /// Enable or disable export of the cleaned table.
    pub fn export_cleaned(mut self, export: bool) -> Self {
        self.export_cleaned = Some(export);
        self
    }

    /// Set the chart style.
    pub fn chart_style(mut self, style: ChartStyle) -> Self {
        self.chart_style = Some(style);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let defaults = ReportConfig::default();
        let config = ReportConfig {
            input_path: self.input_path.unwrap_or(defaults.input_path),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            top_n: self.top_n.unwrap_or(defaults.top_n),
            price_cap_quantile: self.price_cap_quantile.unwrap_or(defaults.price_cap_quantile),
            days_in_period: self.days_in_period.unwrap_or(defaults.days_in_period),
            days_booked_policy: self.days_booked_policy.unwrap_or_default(),
            export_cleaned: self.export_cleaned.unwrap_or(defaults.export_cleaned),
            chart_style: self.chart_style.unwrap_or(defaults.chart_style),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.top_n, 10);
        assert_eq!(config.price_cap_quantile, 0.99);
        assert_eq!(config.days_in_period, 365);
        assert_eq!(config.days_booked_policy, DaysBookedPolicy::Clamp);
        assert!(config.export_cleaned);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ReportConfig::builder()
            .input_path("listings.csv")
            .output_dir("charts")
            .top_n(5)
            .price_cap_quantile(0.95)
            .days_booked_policy(DaysBookedPolicy::Drop)
            .export_cleaned(false)
            .build()
            .unwrap();

        assert_eq!(config.input_path, PathBuf::from("listings.csv"));
        assert_eq!(config.output_dir, PathBuf::from("charts"));
        assert_eq!(config.top_n, 5);
        assert_eq!(config.price_cap_quantile, 0.95);
        assert_eq!(config.days_booked_policy, DaysBookedPolicy::Drop);
        assert!(!config.export_cleaned);
    }

    #[test]
    fn test_validation_invalid_top_n() {
        let result = ReportConfig::builder().top_n(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidTopN(0)
        ));
    }

    #[test]
    fn test_validation_invalid_quantile() {
        for quantile in [0.0, 1.5, f64::NAN] {
            let result = ReportConfig::builder().price_cap_quantile(quantile).build();
            assert!(matches!(
                result.unwrap_err(),
                ConfigValidationError::InvalidQuantile { .. }
            ));
        }
    }

    #[test]
    fn test_validation_invalid_canvas() {
        let style = ChartStyle {
            width: 100,
            ..ChartStyle::default()
        };
        let result = ReportConfig::builder().chart_style(style).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidCanvas { width: 100, .. }
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "input_path": "data/listings.csv",
            "output_dir": "out",
            "top_n": 3,
            "price_cap_quantile": 0.9,
            "days_in_period": 360,
            "days_booked_policy": "Drop",
            "export_cleaned": false,
            "chart_style": {
                "width": 800,
                "height": 400,
                "font_family": "serif",
                "caption_size": 20,
                "label_size": 12,
                "primary_color": [0, 0, 255],
                "accent_color": [255, 0, 0]
            }
        }"#;

        let config: ReportConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.top_n, 3);
        assert_eq!(config.days_in_period, 360);
        assert_eq!(config.days_booked_policy, DaysBookedPolicy::Drop);
        assert_eq!(config.chart_style.font_family, "serif");
        assert!(config.validate().is_ok());
    }
}
