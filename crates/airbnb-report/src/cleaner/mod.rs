//! Data cleaning module.
//!
//! Turns loosely formatted [`RawRecord`]s into validated [`CleanedRecord`]s:
//! - Currency and numeric parsing
//! - Categorical standardization
//! - The fixed per-field missing-value policy
//! - Deduplication by listing id
//!
//! Bad rows never abort a run. Each one is counted under a [`DropReason`]
//! and logged at debug level.

mod converters;
mod sanitizers;

use crate::error::ReportError;
use crate::imputers::StatisticalImputer;
use crate::types::{CleanedRecord, CleaningSummary, Diagnostics, DropReason, RawRecord, RepairKind};
use converters::{parse_count, parse_currency, parse_i32, parse_non_negative_float};
use sanitizers::{LabelBook, clean_text, comparison_key, normalize_room_type};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// A row that passed validation but may still need imputation.
#[derive(Debug, Clone)]
struct ValidatedRow {
    record: CleanedRecord,
    service_fee: Option<f64>,
    number_of_reviews: Option<u32>,
}

/// Why a single row was rejected.
#[derive(Debug)]
struct Rejection {
    reason: DropReason,
    error: ReportError,
}

impl Rejection {
    fn missing(field: &str) -> Self {
        Self {
            reason: DropReason::MissingRequired,
            error: ReportError::validation(field, "", "required field is missing"),
        }
    }

    /// Classify a converter error by the field it came from.
    fn from_error(error: ReportError) -> Self {
        let reason = match &error {
            ReportError::Validation { field, .. } if field == "room_type" => {
                DropReason::InvalidRoomType
            }
            ReportError::Validation { .. } => DropReason::NegativeValue,
            _ => DropReason::MalformedNumber,
        };
        Self { reason, error }
    }
}

impl From<ReportError> for Rejection {
    fn from(error: ReportError) -> Self {
        Self::from_error(error)
    }
}

/// Data cleaner applying the listing validation rules.
#[derive(Debug, Default)]
pub struct DataCleaner;

impl DataCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Clean a batch of raw rows.
    ///
    /// Output order follows input order. Running the cleaner again on its
    /// own output retains every row unchanged.
    pub fn clean(&self, raw: Vec<RawRecord>) -> (Vec<CleanedRecord>, CleaningSummary) {
        info!("Cleaning {} rows...", raw.len());

        let rows_read = raw.len();
        let missing_values = count_missing(&raw);
        let mut diagnostics = Diagnostics::new();
        let mut validated = Vec::with_capacity(rows_read);

        for (index, row) in raw.iter().enumerate() {
            match validate_row(row) {
                Ok(row) => validated.push(row),
                Err(rejection) => {
                    debug!(
                        "Dropping row {} ({}): {}",
                        index,
                        rejection.reason.as_str(),
                        rejection.error
                    );
                    diagnostics.record_drop(rejection.reason);
                }
            }
        }

        let (mut validated, duplicates) = deduplicate(validated, |row| row.record.id.as_str());
        for _ in 0..duplicates {
            diagnostics.record_drop(DropReason::DuplicateId);
        }
        if duplicates > 0 {
            debug!("Removed {} duplicate ids", duplicates);
        }

        merge_spellings(&mut validated);
        let service_fee_fill = impute(&mut validated, &mut diagnostics);

        let records: Vec<CleanedRecord> = validated
            .into_iter()
            .map(|row| {
                let mut record = row.record;
                record.service_fee = row.service_fee.unwrap_or(0.0);
                record.number_of_reviews = row.number_of_reviews.unwrap_or(0);
                record
            })
            .collect();

        info!(
            "Cleaning complete: {} retained, {} dropped, {} repaired",
            records.len(),
            diagnostics.total_dropped(),
            diagnostics.total_repaired()
        );

        let summary = CleaningSummary {
            rows_read,
            rows_retained: records.len(),
            diagnostics,
            missing_values,
            service_fee_fill,
        };
        (records, summary)
    }
}

/// Missing values per column over the raw rows. Every column is listed.
fn count_missing(raw: &[RawRecord]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = RawRecord::COLUMNS
        .iter()
        .map(|column| (column.to_string(), 0))
        .collect();
    for row in raw {
        for (column, value) in row.fields() {
            if value.is_none() {
                *counts.entry(column.to_string()).or_insert(0) += 1;
            }
        }
    }
    debug!("Missing values per column: {:?}", counts);
    counts
}

/// Keep the first occurrence of each key, in input order.
///
/// Returns the kept items and the number removed.
pub fn deduplicate<T, F>(items: Vec<T>, key: F) -> (Vec<T>, usize)
where
    F: Fn(&T) -> &str,
{
    let before = items.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    let mut kept = Vec::with_capacity(before);

    for item in items {
        if seen.insert(key(&item).to_string()) {
            kept.push(item);
        }
    }

    let removed = before - kept.len();
    (kept, removed)
}

/// Validate and convert one row. Imputable fields stay `None`.
fn validate_row(raw: &RawRecord) -> Result<ValidatedRow, Rejection> {
    let id = raw
        .id
        .as_deref()
        .and_then(clean_text)
        .ok_or_else(|| Rejection::missing("id"))?;
    let room_type = match raw.room_type.as_deref() {
        Some(value) => normalize_room_type(value)?,
        None => return Err(Rejection::missing("room_type")),
    };
    let price = match raw.price.as_deref() {
        Some(value) => non_negative_currency("price", value)?,
        None => return Err(Rejection::missing("price")),
    };

    let service_fee = raw
        .service_fee
        .as_deref()
        .map(|v| non_negative_currency("service_fee", v))
        .transpose()?;
    let construction_year = raw
        .construction_year
        .as_deref()
        .map(|v| parse_i32("construction_year", v))
        .transpose()?;
    let number_of_reviews = raw
        .number_of_reviews
        .as_deref()
        .map(|v| parse_count("number_of_reviews", v))
        .transpose()?;
    let reviews_per_month = raw
        .reviews_per_month
        .as_deref()
        .map(|v| parse_non_negative_float("reviews_per_month", v))
        .transpose()?;
    let review_rating = raw
        .review_rate_number
        .as_deref()
        .map(|v| parse_non_negative_float("review_rate_number", v))
        .transpose()?;
    let availability_365 = raw
        .availability_365
        .as_deref()
        .map(|v| parse_i32("availability_365", v))
        .transpose()?;

    let record = CleanedRecord {
        id,
        name: raw.name.as_deref().and_then(clean_text),
        neighborhood_group: raw.neighborhood_group.as_deref().and_then(clean_text),
        neighborhood: raw.neighborhood.as_deref().and_then(clean_text),
        room_type,
        price,
        service_fee: 0.0,
        construction_year,
        number_of_reviews: 0,
        reviews_per_month,
        review_rating,
        host_verification: raw.host_identity_verified.as_deref().and_then(comparison_key),
        availability_365,
        cancellation_policy: raw.cancellation_policy.as_deref().and_then(comparison_key),
    };

    Ok(ValidatedRow {
        record,
        service_fee,
        number_of_reviews,
    })
}

/// Give case variants of a place name the spelling of its first retained row.
fn merge_spellings(rows: &mut [ValidatedRow]) {
    let mut neighborhoods = LabelBook::new();
    let mut groups = LabelBook::new();
    for row in rows.iter_mut() {
        let record = &mut row.record;
        if let Some(neighborhood) = record.neighborhood.as_mut() {
            *neighborhood = neighborhoods.canonical(neighborhood);
        }
        if let Some(group) = record.neighborhood_group.as_mut() {
            *group = groups.canonical(group);
        }
    }
}

/// Currency parse that also reports negative amounts as validation errors.
fn non_negative_currency(field: &str, value: &str) -> Result<f64, Rejection> {
    let trimmed = value.trim();
    if let Some(rest) = trimmed.strip_prefix('-')
        && parse_currency(field, rest).is_ok()
    {
        return Err(ReportError::validation(field, value, "must not be negative").into());
    }
    Ok(parse_currency(field, value)?)
}

/// Apply the imputation policy to retained rows.
///
/// Returns the service fee fill value when any fee was filled.
fn impute(rows: &mut [ValidatedRow], diagnostics: &mut Diagnostics) -> Option<f64> {
    let mut fees: Vec<Option<f64>> = rows.iter().map(|r| r.service_fee).collect();
    let fee_fill = StatisticalImputer::fill_with_median(&mut fees, "service_fee");
    if let Some((_, count)) = fee_fill {
        diagnostics.record_repairs(RepairKind::ServiceFeeImputed, count);
    }

    let mut counts: Vec<Option<u32>> = rows.iter().map(|r| r.number_of_reviews).collect();
    let filled_counts = StatisticalImputer::fill_with_constant(&mut counts, 0);
    diagnostics.record_repairs(RepairKind::ReviewsCountImputed, filled_counts);

    let mut filled_monthly = 0;
    for ((row, fee), count) in rows.iter_mut().zip(fees).zip(counts) {
        row.service_fee = fee;
        row.number_of_reviews = count;

        if row.record.reviews_per_month.is_none() && count == Some(0) {
            row.record.reviews_per_month = Some(0.0);
            filled_monthly += 1;
        }
    }
    diagnostics.record_repairs(RepairKind::ReviewsPerMonthImputed, filled_monthly);

    fee_fill.map(|(fill, _)| fill)
}
