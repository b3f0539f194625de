//! Dataset loading.
//!
//! Reads the listings CSV with polars, every column as text, and extracts
//! typed [`RawRecord`]s by canonical column name. No value is parsed here.
//!
//! Lines that cannot be rows at all (more fields than the header, invalid
//! UTF-8) are screened out first with the `csv` crate and counted, so one
//! bad line never costs the rest of the file.

use crate::error::{ReportError, Result, ResultExt};
use crate::types::RawRecord;
use crate::utils::{non_null, normalize_header};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns whose absence makes the file unusable.
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "neighborhood", "room_type", "price"];

/// Rows loaded from one input file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDataset {
    pub records: Vec<RawRecord>,
    /// Lines skipped before parsing.
    pub malformed_rows: usize,
}

impl LoadedDataset {
    /// Data lines seen in the file, readable or not.
    pub fn rows_read(&self) -> usize {
        self.records.len() + self.malformed_rows
    }
}

/// Loads listing rows from delimited text.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load all rows from a CSV file.
    ///
    /// A missing or unreadable file is fatal. A zero-byte or header-only
    /// file yields an empty vector.
    pub fn load_path(path: &Path) -> Result<LoadedDataset> {
        info!("Loading dataset from: {}", path.display());

        let bytes = fs::read(path).context(format!("Reading '{}'", path.display()))?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            warn!("Input file '{}' is empty", path.display());
            return Ok(LoadedDataset::default());
        }

        let dataset = Self::load_bytes(bytes)?;
        info!(
            "Dataset loaded successfully: {} rows ({} malformed lines skipped)",
            dataset.records.len(),
            dataset.malformed_rows
        );
        Ok(dataset)
    }

    /// Load rows from CSV content already in memory.
    pub fn load_bytes(bytes: Vec<u8>) -> Result<LoadedDataset> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(LoadedDataset::default());
        }

        let (screened, malformed_rows) = screen_rows(&bytes)?;
        if malformed_rows > 0 {
            warn!("Skipped {} malformed lines", malformed_rows);
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .into_reader_with_file_handle(Cursor::new(screened))
            .finish()
            .map_err(|e| ReportError::LoadFailed(e.to_string()))?;

        Ok(LoadedDataset {
            records: Self::records_from_frame(&df)?,
            malformed_rows,
        })
    }

    /// Extract raw records from a frame of text columns.
    pub fn records_from_frame(df: &DataFrame) -> Result<Vec<RawRecord>> {
        // canonical name -> original header; first occurrence wins
        let mut columns: HashMap<String, String> = HashMap::new();
        for name in df.get_column_names() {
            columns
                .entry(normalize_header(name.as_str()))
                .or_insert_with(|| name.to_string());
        }
        debug!("Normalized columns: {:?}", columns.keys().collect::<Vec<_>>());

        for required in REQUIRED_COLUMNS {
            if !columns.contains_key(required) {
                return Err(ReportError::MissingColumn(required.to_string()));
            }
        }

        let height = df.height();
        let text = |canonical: &str| -> Result<Vec<Option<String>>> {
            match columns.get(canonical) {
                Some(original) => column_as_text(df, original),
                None => Ok(vec![None; height]),
            }
        };

        let ids = text("id")?;
        let names = text("name")?;
        let verified = text("host_identity_verified")?;
        let groups = text("neighborhood_group")?;
        let neighborhoods = text("neighborhood")?;
        let room_types = text("room_type")?;
        let years = text("construction_year")?;
        let prices = text("price")?;
        let fees = text("service_fee")?;
        let review_counts = text("number_of_reviews")?;
        let monthly = text("reviews_per_month")?;
        let ratings = text("review_rate_number")?;
        let availability = text("availability_365")?;
        let policies = text("cancellation_policy")?;

        let mut records = Vec::with_capacity(height);
        for i in 0..height {
            records.push(RawRecord {
                id: ids[i].clone(),
                name: names[i].clone(),
                host_identity_verified: verified[i].clone(),
                neighborhood_group: groups[i].clone(),
                neighborhood: neighborhoods[i].clone(),
                room_type: room_types[i].clone(),
                construction_year: years[i].clone(),
                price: prices[i].clone(),
                service_fee: fees[i].clone(),
                number_of_reviews: review_counts[i].clone(),
                reviews_per_month: monthly[i].clone(),
                review_rate_number: ratings[i].clone(),
                availability_365: availability[i].clone(),
                cancellation_policy: policies[i].clone(),
            });
        }

        Ok(records)
    }
}

/// Copy the readable rows of `bytes` into a fresh CSV buffer.
///
/// Rows with more fields than the header or with invalid UTF-8 are skipped
/// and counted. Short rows are padded with empty fields.
fn screen_rows(bytes: &[u8]) -> Result<(Vec<u8>, usize)> {
    let load_failed = |e: ::csv::Error| ReportError::LoadFailed(e.to_string());

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader.byte_headers().map_err(load_failed)?.clone();
    if std::str::from_utf8(headers.as_slice()).is_err() {
        return Err(ReportError::LoadFailed("header is not valid UTF-8".to_string()));
    }
    let width = headers.len();

    let mut writer = ::csv::Writer::from_writer(Vec::with_capacity(bytes.len()));
    writer.write_byte_record(&headers).map_err(load_failed)?;

    let mut malformed = 0;
    let mut record = ::csv::ByteRecord::new();
    while reader.read_byte_record(&mut record).map_err(load_failed)? {
        let line = record.position().map_or(0, |p| p.line());
        if record.len() > width {
            debug!("Skipping line {}: {} fields, header has {}", line, record.len(), width);
            malformed += 1;
            continue;
        }
        if record.iter().any(|field| std::str::from_utf8(field).is_err()) {
            debug!("Skipping line {}: invalid UTF-8", line);
            malformed += 1;
            continue;
        }
        while record.len() < width {
            record.push_field(b"");
        }
        writer.write_byte_record(&record).map_err(load_failed)?;
    }

    let screened = writer
        .into_inner()
        .map_err(|e| ReportError::LoadFailed(e.to_string()))?;
    Ok((screened, malformed))
}

/// Read one column as optional strings, mapping null markers to `None`.
fn column_as_text(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let col = df
        .column(name)
        .context(format!("Reading column '{}'", name))?;
    let series = col.as_materialized_series();
    let series = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };

    let str_series = series.str()?;
    Ok(str_series.into_iter().map(non_null).collect())
}
