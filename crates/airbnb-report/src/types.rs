use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Record Types (one per pipeline stage)
// ============================================================================

/// One row of the input file exactly as read, every field optional text.
///
/// Null markers (`""`, `NaN`, `N/A`, ...) are already mapped to `None`
/// by the loader; everything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub host_identity_verified: Option<String>,
    pub neighborhood_group: Option<String>,
    pub neighborhood: Option<String>,
    pub room_type: Option<String>,
    pub construction_year: Option<String>,
    pub price: Option<String>,
    pub service_fee: Option<String>,
    pub number_of_reviews: Option<String>,
    pub reviews_per_month: Option<String>,
    pub review_rate_number: Option<String>,
    pub availability_365: Option<String>,
    pub cancellation_policy: Option<String>,
}

impl RawRecord {
    /// Canonical column names, in the order of [`RawRecord::fields`].
    pub const COLUMNS: [&'static str; 14] = [
        "id",
        "name",
        "host_identity_verified",
        "neighborhood_group",
        "neighborhood",
        "room_type",
        "construction_year",
        "price",
        "service_fee",
        "number_of_reviews",
        "reviews_per_month",
        "review_rate_number",
        "availability_365",
        "cancellation_policy",
    ];

    /// Every field paired with its canonical column name.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 14] {
        let values = [
            &self.id,
            &self.name,
            &self.host_identity_verified,
            &self.neighborhood_group,
            &self.neighborhood,
            &self.room_type,
            &self.construction_year,
            &self.price,
            &self.service_fee,
            &self.number_of_reviews,
            &self.reviews_per_month,
            &self.review_rate_number,
            &self.availability_365,
            &self.cancellation_policy,
        ];
        std::array::from_fn(|i| (Self::COLUMNS[i], values[i].as_deref()))
    }
}

/// Listing type, a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "Entire home/apt")]
    EntireHome,
    #[serde(rename = "Private room")]
    PrivateRoom,
    #[serde(rename = "Shared room")]
    SharedRoom,
    #[serde(rename = "Hotel room")]
    HotelRoom,
}

impl RoomType {
    /// Every known room type, in display order.
    pub const ALL: [RoomType; 4] = [
        RoomType::EntireHome,
        RoomType::PrivateRoom,
        RoomType::SharedRoom,
        RoomType::HotelRoom,
    ];

    /// Canonical label as it appears in the dataset.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntireHome => "Entire home/apt",
            Self::PrivateRoom => "Private room",
            Self::SharedRoom => "Shared room",
            Self::HotelRoom => "Hotel room",
        }
    }

    /// Match an already-normalized (trimmed, single-spaced) label,
    /// ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|room_type| room_type.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host bucket derived from the verification status. Always one of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HostCategory {
    #[serde(rename = "verified")]
    Verified,
    #[serde(rename = "non-verified")]
    NonVerified,
}

impl HostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NonVerified => "non-verified",
        }
    }

    /// Axis label used on charts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Verified => "Verified Host",
            Self::NonVerified => "Non-Verified Host",
        }
    }
}

impl fmt::Display for HostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, typed listing.
///
/// Invariants: `id` is unique within a cleaned batch; `price`,
/// `service_fee` and `number_of_reviews` are finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub id: String,
    pub name: Option<String>,
    pub neighborhood_group: Option<String>,
    pub neighborhood: Option<String>,
    pub room_type: RoomType,
    pub price: f64,
    pub service_fee: f64,
    pub construction_year: Option<i32>,
    pub number_of_reviews: u32,
    pub reviews_per_month: Option<f64>,
    pub review_rating: Option<f64>,
    /// Lowercased verification status, `None` when missing.
    pub host_verification: Option<String>,
    pub availability_365: Option<i32>,
    pub cancellation_policy: Option<String>,
}

/// A cleaned listing plus derived features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub listing: CleanedRecord,
    /// Days booked in the availability period, `None` when availability
    /// is unknown.
    pub days_booked: Option<u32>,
    pub host_category: HostCategory,
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// A line could not be read as a row: too many fields or invalid UTF-8.
    MalformedRow,
    /// A required field (id, room type, price) was missing.
    MissingRequired,
    /// A numeric or currency field could not be parsed.
    MalformedNumber,
    /// Room type outside the known set.
    InvalidRoomType,
    /// A non-negative field held a negative value.
    NegativeValue,
    /// A later row repeated an identifier already kept.
    DuplicateId,
    /// A derived feature was out of domain and the policy is to drop.
    OutOfDomain,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRow => "malformed_row",
            Self::MissingRequired => "missing_required",
            Self::MalformedNumber => "malformed_number",
            Self::InvalidRoomType => "invalid_room_type",
            Self::NegativeValue => "negative_value",
            Self::DuplicateId => "duplicate_id",
            Self::OutOfDomain => "out_of_domain",
        }
    }
}

/// A value that was filled in or adjusted instead of dropping the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    ServiceFeeImputed,
    ReviewsCountImputed,
    ReviewsPerMonthImputed,
    DaysBookedClamped,
    UnrecognizedVerification,
}

impl RepairKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceFeeImputed => "service_fee_imputed",
            Self::ReviewsCountImputed => "reviews_count_imputed",
            Self::ReviewsPerMonthImputed => "reviews_per_month_imputed",
            Self::DaysBookedClamped => "days_booked_clamped",
            Self::UnrecognizedVerification => "unrecognized_verification",
        }
    }
}

/// Per-reason drop and repair counters collected by a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub dropped: BTreeMap<DropReason, usize>,
    pub repaired: BTreeMap<RepairKind, usize>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        self.record_drops(reason, 1);
    }

    pub fn record_drops(&mut self, reason: DropReason, count: usize) {
        if count > 0 {
            *self.dropped.entry(reason).or_insert(0) += count;
        }
    }

    pub fn record_repair(&mut self, kind: RepairKind) {
        self.record_repairs(kind, 1);
    }

    pub fn record_repairs(&mut self, kind: RepairKind, count: usize) {
        if count > 0 {
            *self.repaired.entry(kind).or_insert(0) += count;
        }
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn total_repaired(&self) -> usize {
        self.repaired.values().sum()
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    pub fn repaired_for(&self, kind: RepairKind) -> usize {
        self.repaired.get(&kind).copied().unwrap_or(0)
    }

    /// Fold another stage's counters into this one.
    pub fn merge(&mut self, other: &Diagnostics) {
        for (reason, count) in &other.dropped {
            *self.dropped.entry(*reason).or_insert(0) += count;
        }
        for (kind, count) in &other.repaired {
            *self.repaired.entry(*kind).or_insert(0) += count;
        }
    }
}

/// Result of the cleaning stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub rows_read: usize,
    pub rows_retained: usize,
    pub diagnostics: Diagnostics,
    /// Missing values per input column, counted before any row is dropped.
    pub missing_values: BTreeMap<String, usize>,
    /// Median used to fill missing service fees, if any were filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_fee_fill: Option<f64>,
}

/// Final diagnostic summary of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_retained: usize,
    pub diagnostics: Diagnostics,
    /// Missing values per input column, as loaded.
    pub missing_values: BTreeMap<String, usize>,
    /// Warnings and notes generated during the run.
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Percentage of input rows that were dropped.
    pub fn rows_dropped_percentage(&self) -> f32 {
        if self.rows_read == 0 {
            0.0
        } else {
            (self.rows_dropped as f32 / self.rows_read as f32) * 100.0
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Categorical dimension to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Neighborhood,
    NeighborhoodGroup,
    RoomType,
    HostCategory,
}

/// Numeric column a group statistic or distribution is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Price,
    ServiceFee,
    NumberOfReviews,
    ReviewsPerMonth,
    ReviewRating,
}

/// Ordering for top-N views, by mean price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Descending,
    Ascending,
}

/// Summary statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub key: String,
    pub count: usize,
    pub mean_price: f64,
    /// Selected quantile of the secondary metric, when one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_quantile: Option<f64>,
}

/// Group key → statistics, one instance per chart or table.
///
/// Groups are never empty; the default ordering is by key ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateView {
    pub key: GroupKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantile: Option<f64>,
    pub groups: Vec<GroupStats>,
}

impl AggregateView {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.key.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&GroupStats> {
        self.groups.iter().find(|g| g.key == key)
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// The six charts of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    ConstructionYearTrend,
    TopExpensiveNeighborhoods,
    TopCheapestNeighborhoods,
    PriceByRoomType,
    ReviewRateVsLogPrice,
    ReviewsPerMonthByHostType,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::ConstructionYearTrend,
        ChartKind::TopExpensiveNeighborhoods,
        ChartKind::TopCheapestNeighborhoods,
        ChartKind::PriceByRoomType,
        ChartKind::ReviewRateVsLogPrice,
        ChartKind::ReviewsPerMonthByHostType,
    ];

    /// Output file name, fixed per chart purpose.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ConstructionYearTrend => "construction_year_trend.svg",
            Self::TopExpensiveNeighborhoods => "top_expensive_neighborhoods.svg",
            Self::TopCheapestNeighborhoods => "top_cheapest_neighborhoods.svg",
            Self::PriceByRoomType => "price_by_room_type.svg",
            Self::ReviewRateVsLogPrice => "review_rate_vs_log_price.svg",
            Self::ReviewsPerMonthByHostType => "reviews_per_month_by_host_type.svg",
        }
    }
}

/// A chart written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub path: PathBuf,
    /// Number of data points (lines, bars, boxes or dots) drawn.
    pub data_points: usize,
}

/// Ordinary least squares fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Descriptive findings printed alongside the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    /// Listings per room type, most common first.
    pub room_type_distribution: Vec<(String, usize)>,
    /// Room type with the most listings under a strict cancellation policy.
    pub strict_policy_room_type: Option<String>,
    /// Mean price per neighborhood group, most expensive first.
    pub price_by_neighborhood_group: Vec<GroupStats>,
    pub most_expensive_neighborhoods: Vec<GroupStats>,
    pub least_expensive_neighborhoods: Vec<GroupStats>,
    /// OLS fit of log price against review rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_rate_fit: Option<LinearFit>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub summary: RunSummary,
    pub insights: Insights,
    pub charts: Vec<ChartArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_data_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_type_from_label_ignores_case() {
        assert_eq!(RoomType::from_label("entire home/apt"), Some(RoomType::EntireHome));
        assert_eq!(RoomType::from_label("PRIVATE ROOM"), Some(RoomType::PrivateRoom));
        assert_eq!(RoomType::from_label("castle"), None);
    }

    #[test]
    fn test_host_category_serializes_to_two_values() {
        assert_eq!(
            serde_json::to_string(&HostCategory::Verified).unwrap(),
            "\"verified\""
        );
        assert_eq!(
            serde_json::to_string(&HostCategory::NonVerified).unwrap(),
            "\"non-verified\""
        );
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut a = Diagnostics::new();
        a.record_drop(DropReason::DuplicateId);
        a.record_repair(RepairKind::ServiceFeeImputed);

        let mut b = Diagnostics::new();
        b.record_drop(DropReason::DuplicateId);
        b.record_drop(DropReason::OutOfDomain);
        b.record_repairs(RepairKind::DaysBookedClamped, 0);

        a.merge(&b);
        assert_eq!(a.dropped_for(DropReason::DuplicateId), 2);
        assert_eq!(a.total_dropped(), 3);
        assert_eq!(a.total_repaired(), 1);
        assert!(!a.repaired.contains_key(&RepairKind::DaysBookedClamped));
    }

    #[test]
    fn test_diagnostics_serialize_reason_keys() {
        let mut d = Diagnostics::new();
        d.record_drop(DropReason::MalformedNumber);
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"malformed_number\":1"));
    }

    #[test]
    fn test_rows_dropped_percentage_empty() {
        let summary = RunSummary::new();
        assert_eq!(summary.rows_dropped_percentage(), 0.0);
    }

    #[test]
    fn test_chart_file_names_unique() {
        let mut names: Vec<_> = ChartKind::ALL.iter().map(|k| k.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
