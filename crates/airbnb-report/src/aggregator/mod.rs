//! Grouped statistics over enriched listings.
//!
//! Every result is independent of input order: groups are collected in
//! ordered maps and ordering ties are broken by key.

pub mod statistics;

use crate::types::{AggregateView, EnrichedRecord, GroupKey, GroupStats, Metric, SortOrder};
use statistics::{mean, quantile};
use std::collections::BTreeMap;
use tracing::debug;

/// Policy label counted by [`strict_policy_room_type`].
pub const STRICT_POLICY: &str = "strict";

/// Value of the grouping key for a record, `None` when unknown.
pub fn group_value(record: &EnrichedRecord, key: GroupKey) -> Option<String> {
    let listing = &record.listing;
    match key {
        GroupKey::Neighborhood => listing.neighborhood.clone(),
        GroupKey::NeighborhoodGroup => listing.neighborhood_group.clone(),
        GroupKey::RoomType => Some(listing.room_type.as_str().to_string()),
        GroupKey::HostCategory => Some(record.host_category.display_name().to_string()),
    }
}

/// Value of a numeric metric for a record, `None` when unknown.
pub fn metric_value(record: &EnrichedRecord, metric: Metric) -> Option<f64> {
    let listing = &record.listing;
    match metric {
        Metric::Price => Some(listing.price),
        Metric::ServiceFee => Some(listing.service_fee),
        Metric::NumberOfReviews => Some(f64::from(listing.number_of_reviews)),
        Metric::ReviewsPerMonth => listing.reviews_per_month,
        Metric::ReviewRating => listing.review_rating,
    }
}

/// Group records by `key`, with an optional `(metric, quantile)` secondary
/// statistic.
///
/// Records missing the key, or the metric when one is requested, are left
/// out. Groups come back ordered by key ascending.
pub fn aggregate(
    records: &[EnrichedRecord],
    key: GroupKey,
    metric: Option<(Metric, f64)>,
) -> AggregateView {
    let mut groups: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();

    for record in records {
        let Some(group) = group_value(record, key) else {
            continue;
        };
        let secondary = match metric {
            Some((m, _)) => match metric_value(record, m) {
                Some(v) => Some(v),
                None => continue,
            },
            None => None,
        };

        let (prices, values) = groups.entry(group).or_default();
        prices.push(record.listing.price);
        if let Some(v) = secondary {
            values.push(v);
        }
    }

    let groups: Vec<GroupStats> = groups
        .into_iter()
        .filter_map(|(key, (prices, values))| {
            Some(GroupStats {
                count: prices.len(),
                mean_price: mean(&prices)?,
                metric_quantile: metric.and_then(|(_, q)| quantile(&values, q)),
                key,
            })
        })
        .collect();

    debug!("Aggregated {:?} into {} groups", key, groups.len());
    AggregateView {
        key,
        metric: metric.map(|(m, _)| m),
        quantile: metric.map(|(_, q)| q),
        groups,
    }
}

/// The `n` groups with the highest or lowest mean price.
///
/// Ties on mean price are broken by key ascending.
pub fn top_n(view: &AggregateView, n: usize, order: SortOrder) -> Vec<GroupStats> {
    let mut groups = view.groups.clone();
    groups.sort_by(|a, b| {
        let by_price = match order {
            SortOrder::Descending => b.mean_price.total_cmp(&a.mean_price),
            SortOrder::Ascending => a.mean_price.total_cmp(&b.mean_price),
        };
        by_price.then_with(|| a.key.cmp(&b.key))
    });
    groups.truncate(n);
    groups
}

/// Per-group metric values, for boxplots. Ordered by key ascending; groups
/// without any value are omitted.
pub fn distributions(
    records: &[EnrichedRecord],
    key: GroupKey,
    metric: Metric,
) -> Vec<(String, Vec<f64>)> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(group) = group_value(record, key)
            && let Some(value) = metric_value(record, metric)
        {
            groups.entry(group).or_default().push(value);
        }
    }
    groups.into_iter().collect()
}

/// Listings per construction year, ascending by year.
pub fn yearly_counts(records: &[EnrichedRecord]) -> Vec<(i32, usize)> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in records.iter().filter_map(|r| r.listing.construction_year) {
        *counts.entry(year).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

/// Listings per room type, most common first (ties by label).
pub fn room_type_distribution(records: &[EnrichedRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.listing.room_type.as_str()).or_insert(0) += 1;
    }

    let mut distribution: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    distribution
}

/// Room type with the most listings under the strict cancellation policy.
pub fn strict_policy_room_type(records: &[EnrichedRecord]) -> Option<String> {
    let strict: Vec<EnrichedRecord> = records
        .iter()
        .filter(|r| r.listing.cancellation_policy.as_deref() == Some(STRICT_POLICY))
        .cloned()
        .collect();
    room_type_distribution(&strict)
        .into_iter()
        .next()
        .map(|(label, _)| label)
}

/// Mean price per neighborhood group, most expensive first.
pub fn price_by_neighborhood_group(records: &[EnrichedRecord]) -> Vec<GroupStats> {
    let view = aggregate(records, GroupKey::NeighborhoodGroup, None);
    top_n(&view, view.len(), SortOrder::Descending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CleanedRecord, HostCategory, RoomType};
    use pretty_assertions::assert_eq;

    fn record(id: &str, neighborhood: Option<&str>, room_type: RoomType, price: f64) -> EnrichedRecord {
        EnrichedRecord {
            listing: CleanedRecord {
                id: id.to_string(),
                name: None,
                neighborhood_group: Some("Manhattan".to_string()),
                neighborhood: neighborhood.map(str::to_string),
                room_type,
                price,
                service_fee: 0.0,
                construction_year: None,
                number_of_reviews: 0,
                reviews_per_month: None,
                review_rating: None,
                host_verification: None,
                availability_365: None,
                cancellation_policy: None,
            },
            days_booked: None,
            host_category: HostCategory::NonVerified,
        }
    }

    fn sample() -> Vec<EnrichedRecord> {
        vec![
            record("1", Some("Harlem"), RoomType::PrivateRoom, 100.0),
            record("2", Some("Harlem"), RoomType::EntireHome, 300.0),
            record("3", Some("Chelsea"), RoomType::EntireHome, 400.0),
            record("4", Some("Astoria"), RoomType::SharedRoom, 50.0),
            record("5", None, RoomType::PrivateRoom, 999.0),
            record("6", Some("Bushwick"), RoomType::PrivateRoom, 200.0),
        ]
    }

    #[test]
    fn test_aggregate_by_neighborhood() {
        let view = aggregate(&sample(), GroupKey::Neighborhood, None);

        assert_eq!(view.keys(), vec!["Astoria", "Bushwick", "Chelsea", "Harlem"]);
        let harlem = view.get("Harlem").unwrap();
        assert_eq!(harlem.count, 2);
        assert_eq!(harlem.mean_price, 200.0);
        assert!(view.groups.iter().all(|g| g.count > 0));
    }

    #[test]
    fn test_aggregate_is_permutation_invariant() {
        let records = sample();
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(2);

        let expected = aggregate(&records, GroupKey::Neighborhood, Some((Metric::Price, 0.5)));
        for permuted in [reversed, rotated] {
            assert_eq!(
                aggregate(&permuted, GroupKey::Neighborhood, Some((Metric::Price, 0.5))),
                expected
            );
        }
    }

    #[test]
    fn test_aggregate_excludes_missing_metric() {
        let mut records = sample();
        records[0].listing.review_rating = Some(4.0);
        let view = aggregate(&records, GroupKey::Neighborhood, Some((Metric::ReviewRating, 0.5)));

        assert_eq!(view.len(), 1);
        assert_eq!(view.groups[0].key, "Harlem");
        assert_eq!(view.groups[0].count, 1);
        assert_eq!(view.groups[0].metric_quantile, Some(4.0));
    }

    #[test]
    fn test_top_n_orders_and_breaks_ties() {
        // Bushwick ties Harlem on mean price
        let view = aggregate(&sample(), GroupKey::Neighborhood, None);

        let expensive = top_n(&view, 3, SortOrder::Descending);
        let keys: Vec<&str> = expensive.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Chelsea", "Bushwick", "Harlem"]);

        let cheap = top_n(&view, 2, SortOrder::Ascending);
        let keys: Vec<&str> = cheap.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Astoria", "Bushwick"]);

        assert_eq!(top_n(&view, 100, SortOrder::Ascending).len(), 4);
    }

    #[test]
    fn test_empty_input() {
        let view = aggregate(&[], GroupKey::RoomType, None);
        assert!(view.is_empty());
        assert!(top_n(&view, 10, SortOrder::Descending).is_empty());
        assert!(distributions(&[], GroupKey::RoomType, Metric::Price).is_empty());
        assert!(yearly_counts(&[]).is_empty());
        assert_eq!(strict_policy_room_type(&[]), None);
    }

    #[test]
    fn test_distributions_by_room_type() {
        let dists = distributions(&sample(), GroupKey::RoomType, Metric::Price);
        let labels: Vec<&str> = dists.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(labels, vec!["Entire home/apt", "Private room", "Shared room"]);
        assert_eq!(dists[1].1, vec![100.0, 999.0, 200.0]);
    }

    #[test]
    fn test_distributions_by_host_category() {
        let mut records = sample();
        records[0].host_category = HostCategory::Verified;
        records[0].listing.reviews_per_month = Some(1.5);
        records[1].listing.reviews_per_month = Some(0.5);

        let dists = distributions(&records, GroupKey::HostCategory, Metric::ReviewsPerMonth);
        assert_eq!(
            dists,
            vec![
                ("Non-Verified Host".to_string(), vec![0.5]),
                ("Verified Host".to_string(), vec![1.5]),
            ]
        );
    }

    #[test]
    fn test_yearly_counts_ascending() {
        let mut records = sample();
        records[0].listing.construction_year = Some(2010);
        records[1].listing.construction_year = Some(2003);
        records[2].listing.construction_year = Some(2010);

        assert_eq!(yearly_counts(&records), vec![(2003, 1), (2010, 2)]);
    }

    #[test]
    fn test_room_type_insights() {
        let mut records = sample();
        records[1].listing.cancellation_policy = Some("strict".to_string());
        records[2].listing.cancellation_policy = Some("strict".to_string());
        records[3].listing.cancellation_policy = Some("strict".to_string());

        assert_eq!(
            room_type_distribution(&records),
            vec![
                ("Private room".to_string(), 3),
                ("Entire home/apt".to_string(), 2),
                ("Shared room".to_string(), 1),
            ]
        );
        assert_eq!(strict_policy_room_type(&records).as_deref(), Some("Entire home/apt"));
    }

    #[test]
    fn test_price_by_neighborhood_group() {
        let mut records = sample();
        records[3].listing.neighborhood_group = Some("Queens".to_string());
        let groups = price_by_neighborhood_group(&records);

        assert_eq!(groups[0].key, "Manhattan");
        assert_eq!(groups[1].key, "Queens");
        assert_eq!(groups[1].mean_price, 50.0);
    }
}
