//! Custom error types for the listings report pipeline.
//!
//! Row-level failures (`Parse`, `Validation`, `Domain`) are produced by the
//! cleaning and feature stages, counted, and the offending row is dropped.
//! Structural failures (`Io`, `MissingColumn`, `Render`, ...) abort the run.
//!
//! Errors are serializable so the final JSON report can carry them.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Malformed numeric or currency text.
    #[error("Failed to parse '{value}' in field '{field}': {reason}")]
    Parse {
        field: String,
        value: String,
        reason: String,
    },

    /// Categorical value outside its known set, or a value violating a
    /// field constraint (e.g. a negative price).
    #[error("Invalid value '{value}' in field '{field}': {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    /// A derived feature would be semantically invalid.
    #[error("Derived feature '{feature}' out of domain: {reason}")]
    Domain { feature: String, reason: String },

    /// Required column missing from the input file.
    #[error("Required column '{0}' not found in dataset")]
    MissingColumn(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Loading the input dataset failed.
    #[error("Failed to load dataset: {0}")]
    LoadFailed(String),

    /// Chart rendering failed.
    #[error("Failed to render chart '{chart}': {reason}")]
    Render { chart: String, reason: String },

    /// Writing the cleaned dataset or the JSON report failed.
    #[error("Failed to export results: {0}")]
    ExportFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Build a [`ReportError::Parse`].
    pub fn parse(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a [`ReportError::Validation`].
    pub fn validation(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a [`ReportError::Domain`].
    pub fn domain(feature: &str, reason: impl Into<String>) -> Self {
        Self::Domain {
            feature: feature.to_string(),
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, used in the JSON report and log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Domain { .. } => "DOMAIN_ERROR",
            Self::MissingColumn(_) => "MISSING_COLUMN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::LoadFailed(_) => "LOAD_FAILED",
            Self::Render { .. } => "RENDER_FAILED",
            Self::ExportFailed(_) => "EXPORT_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error only invalidates a single row.
    ///
    /// Row-level errors are counted and the row dropped; anything else
    /// halts the pipeline.
    pub fn is_row_level(&self) -> bool {
        match self {
            Self::Parse { .. } | Self::Validation { .. } | Self::Domain { .. } => true,
            Self::WithContext { source, .. } => source.is_row_level(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Io(e).with_context(context))
    }
}
