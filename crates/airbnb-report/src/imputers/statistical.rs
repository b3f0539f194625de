//! Statistical imputation methods.
//!
//! Provides median and constant fills over optional numeric columns.

use crate::aggregator::statistics::median;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill `None` entries with the median of the present values.
    ///
    /// Returns the fill value and the number of filled entries, or `None`
    /// when nothing was missing. If every entry is missing the column is
    /// filled with `0.0`.
    pub fn fill_with_median(column: &mut [Option<f64>], name: &str) -> Option<(f64, usize)> {
        let missing = column.iter().filter(|v| v.is_none()).count();
        if missing == 0 {
            return None;
        }

        let present: Vec<f64> = column.iter().flatten().copied().collect();
        let fill = median(&present).unwrap_or(0.0);
        Self::fill_with_constant(column, fill);

        debug!("Filled {} missing '{}' values with median {:.2}", missing, name, fill);
        Some((fill, missing))
    }

    /// Fill `None` entries with a constant, returning how many were filled.
    pub fn fill_with_constant<T: Copy>(column: &mut [Option<T>], value: T) -> usize {
        let mut filled = 0;
        for slot in column.iter_mut().filter(|v| v.is_none()) {
            *slot = Some(value);
            filled += 1;
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_with_median() {
        let mut column = vec![Some(10.0), None, Some(30.0), Some(20.0), None];
        let (fill, count) = StatisticalImputer::fill_with_median(&mut column, "service_fee").unwrap();

        assert_eq!(fill, 20.0);
        assert_eq!(count, 2);
        assert!(column.iter().all(|v| v.is_some()));
        assert_eq!(column[1], Some(20.0));
    }

    #[test]
    fn test_fill_with_median_nothing_missing() {
        let mut column = vec![Some(1.0), Some(2.0)];
        assert!(StatisticalImputer::fill_with_median(&mut column, "service_fee").is_none());
        assert_eq!(column, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_fill_with_median_all_missing() {
        let mut column: Vec<Option<f64>> = vec![None, None];
        let (fill, count) = StatisticalImputer::fill_with_median(&mut column, "service_fee").unwrap();
        assert_eq!(fill, 0.0);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_fill_with_constant() {
        let mut column = vec![None, Some(3u32), None];
        assert_eq!(StatisticalImputer::fill_with_constant(&mut column, 0), 2);
        assert_eq!(column, vec![Some(0), Some(3), Some(0)]);
    }
}
