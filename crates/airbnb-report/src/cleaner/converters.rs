//! Numeric conversion functions for data cleaning.
//!
//! Every converter takes already-trimmed, non-null text and fails with
//! [`ReportError::Parse`] on malformed input instead of coercing it.

use crate::error::{ReportError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// `$1,234.56`, `$966`, `1200.0`: optional dollar sign, digits with
/// optional comma grouping in threes, optional fraction.
static CURRENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$?\s*(\d{1,3}(,\d{3})+|\d+)(\.\d+)?$").expect("Invalid regex: currency")
});

/// Parse a currency string to a number.
///
/// Strips the currency symbol and thousands separators. Negative amounts
/// and any other characters are rejected.
pub(crate) fn parse_currency(field: &str, value: &str) -> Result<f64> {
    let trimmed = value.trim();

    if !CURRENCY_PATTERN.is_match(trimmed) {
        return Err(ReportError::parse(field, value, "not a currency amount"));
    }

    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let amount = digits
        .parse::<f64>()
        .map_err(|e| ReportError::parse(field, value, e.to_string()))?;

    if !amount.is_finite() {
        return Err(ReportError::parse(field, value, "amount is not finite"));
    }

    Ok(amount)
}

/// Parse a finite floating point number.
pub(crate) fn parse_float(field: &str, value: &str) -> Result<f64> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|e| ReportError::parse(field, value, e.to_string()))?;

    if !parsed.is_finite() {
        return Err(ReportError::parse(field, value, "value is not finite"));
    }

    Ok(parsed)
}

/// Parse a finite, non-negative floating point number.
pub(crate) fn parse_non_negative_float(field: &str, value: &str) -> Result<f64> {
    let parsed = parse_float(field, value)?;
    if parsed < 0.0 {
        return Err(ReportError::validation(field, value, "must not be negative"));
    }
    Ok(parsed)
}

/// Parse a whole number. `"2004.0"` is accepted, `"2004.5"` is not.
pub(crate) fn parse_integer(field: &str, value: &str) -> Result<i64> {
    let trimmed = value.trim();

    if let Ok(int_val) = trimmed.parse::<i64>() {
        return Ok(int_val);
    }

    let float_val = parse_float(field, trimmed)?;
    if float_val.fract() != 0.0 || float_val.abs() > i32::MAX as f64 {
        return Err(ReportError::parse(field, value, "not a whole number"));
    }

    Ok(float_val as i64)
}

/// Parse a whole number into `i32`.
pub(crate) fn parse_i32(field: &str, value: &str) -> Result<i32> {
    let parsed = parse_integer(field, value)?;
    i32::try_from(parsed).map_err(|_| ReportError::parse(field, value, "out of range"))
}

/// Parse a non-negative count into `u32`.
pub(crate) fn parse_count(field: &str, value: &str) -> Result<u32> {
    let parsed = parse_integer(field, value)?;
    if parsed < 0 {
        return Err(ReportError::validation(field, value, "must not be negative"));
    }
    u32::try_from(parsed).map_err(|_| ReportError::parse(field, value, "out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // parse_currency() tests
    // ========================================================================

    #[test]
    fn test_parse_currency_with_grouping() {
        assert_eq!(parse_currency("price", "$1,000.00").unwrap(), 1000.0);
        assert_eq!(parse_currency("price", "$1,200,500.50").unwrap(), 1_200_500.5);
    }

    #[test]
    fn test_parse_currency_plain_forms() {
        assert_eq!(parse_currency("price", "$966 ").unwrap(), 966.0);
        assert_eq!(parse_currency("price", "142").unwrap(), 142.0);
        assert_eq!(parse_currency("price", "1000.0").unwrap(), 1000.0);
        assert_eq!(parse_currency("price", "$0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_currency_malformed() {
        for bad in ["abc", "$", "$1.2.3", "$1,00", "1,0000", "-$5", "$-5", "12$", "$1 000"] {
            let err = parse_currency("price", bad).unwrap_err();
            assert!(
                matches!(err, ReportError::Parse { .. }),
                "expected parse error for {bad:?}"
            );
        }
    }

    // ========================================================================
    // integer and float tests
    // ========================================================================

    #[test]
    fn test_parse_integer_accepts_whole_floats() {
        assert_eq!(parse_integer("construction_year", "2004").unwrap(), 2004);
        assert_eq!(parse_integer("construction_year", "2004.0").unwrap(), 2004);
        assert!(parse_integer("construction_year", "2004.5").is_err());
        assert!(parse_integer("construction_year", "twenty").is_err());
    }

    #[test]
    fn test_parse_count_rejects_negative() {
        assert_eq!(parse_count("number_of_reviews", "12").unwrap(), 12);
        let err = parse_count("number_of_reviews", "-1").unwrap_err();
        assert!(matches!(err, ReportError::Validation { .. }));
    }

    #[test]
    fn test_parse_i32_allows_negative() {
        assert_eq!(parse_i32("availability_365", "-10").unwrap(), -10);
    }

    #[test]
    fn test_parse_float_rejects_non_finite() {
        assert!(parse_float("review_rate_number", "inf").is_err());
        assert!(parse_float("review_rate_number", "NaN").is_err());
        assert_eq!(parse_float("review_rate_number", " 4.5 ").unwrap(), 4.5);
    }

    #[test]
    fn test_parse_non_negative_float() {
        assert_eq!(parse_non_negative_float("reviews_per_month", "0.21").unwrap(), 0.21);
        assert!(matches!(
            parse_non_negative_float("reviews_per_month", "-0.5").unwrap_err(),
            ReportError::Validation { .. }
        ));
    }
}
