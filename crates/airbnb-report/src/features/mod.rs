//! Derived features: days booked and host category.

use crate::config::DaysBookedPolicy;
use crate::error::{ReportError, Result};
use crate::types::{CleanedRecord, Diagnostics, DropReason, EnrichedRecord, HostCategory, RepairKind};
use crate::utils::{is_known_verification_value, is_verified_value};
use tracing::{debug, info};

/// Computes per-listing derived features.
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    days_in_period: u32,
    policy: DaysBookedPolicy,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new(365, DaysBookedPolicy::Clamp)
    }
}

impl FeatureEngineer {
    pub fn new(days_in_period: u32, policy: DaysBookedPolicy) -> Self {
        Self {
            days_in_period,
            policy,
        }
    }

    /// Enrich cleaned records, in order.
    ///
    /// Rows with an out-of-range availability are clamped or dropped
    /// according to the configured policy; either way the event is counted.
    pub fn enrich(&self, records: Vec<CleanedRecord>) -> (Vec<EnrichedRecord>, Diagnostics) {
        info!("Computing derived features for {} rows...", records.len());

        let mut diagnostics = Diagnostics::new();
        let mut enriched = Vec::with_capacity(records.len());

        for listing in records {
            let days_booked = match listing.availability_365 {
                None => None,
                Some(availability) => match self.compute_days_booked(availability) {
                    Ok(days) => Some(days),
                    Err(e) => match self.policy {
                        DaysBookedPolicy::Clamp => {
                            diagnostics.record_repair(RepairKind::DaysBookedClamped);
                            Some(self.clamp_days_booked(availability))
                        }
                        DaysBookedPolicy::Drop => {
                            debug!("Dropping listing {}: {}", listing.id, e);
                            diagnostics.record_drop(DropReason::OutOfDomain);
                            continue;
                        }
                    },
                },
            };

            if let Some(status) = listing.host_verification.as_deref()
                && !is_known_verification_value(status)
            {
                diagnostics.record_repair(RepairKind::UnrecognizedVerification);
            }

            let host_category = host_category(listing.host_verification.as_deref());
            enriched.push(EnrichedRecord {
                listing,
                days_booked,
                host_category,
            });
        }

        info!(
            "Feature engineering complete: {} rows, {} clamped, {} dropped",
            enriched.len(),
            diagnostics.repaired_for(RepairKind::DaysBookedClamped),
            diagnostics.dropped_for(DropReason::OutOfDomain)
        );
        (enriched, diagnostics)
    }

    /// `days_in_period - availability`, failing when the result would leave
    /// `0..=days_in_period`.
    pub fn compute_days_booked(&self, availability: i32) -> Result<u32> {
        let period = i64::from(self.days_in_period);
        let days = period - i64::from(availability);

        if days < 0 {
            return Err(ReportError::domain(
                "days_booked",
                format!("availability {availability} exceeds the {period}-day period"),
            ));
        }
        if days > period {
            return Err(ReportError::domain(
                "days_booked",
                format!("negative availability {availability}"),
            ));
        }

        // bounded by days_in_period
        Ok(days as u32)
    }

    fn clamp_days_booked(&self, availability: i32) -> u32 {
        let period = i64::from(self.days_in_period);
        (period - i64::from(availability)).clamp(0, period) as u32
    }
}

/// Classify a normalized verification status. Missing means non-verified.
pub fn host_category(status: Option<&str>) -> HostCategory {
    match status {
        Some(s) if is_verified_value(s) => HostCategory::Verified,
        _ => HostCategory::NonVerified,
    }
}
