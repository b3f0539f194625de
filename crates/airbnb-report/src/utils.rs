//! Shared utilities for the report pipeline.
//!
//! Helpers used by both the loader and the cleaner: header normalization,
//! null-marker detection and whitespace handling.

// =============================================================================
// Header Utilities
// =============================================================================

/// Normalize a CSV header to its canonical snake_case column name.
///
/// Lowercases, trims, replaces spaces with underscores and standardizes the
/// British spelling of "neighbourhood".
///
/// ```rust,ignore
/// assert_eq!(normalize_header(" Construction year "), "construction_year");
/// assert_eq!(normalize_header("neighbourhood group"), "neighborhood_group");
/// ```
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace("neighbourhood", "neighborhood")
}

// =============================================================================
// Missing Value Utilities
// =============================================================================

/// Text that stands for a missing value.
pub const NULL_MARKERS: [&str; 9] = [
    "", "nan", "null", "none", "n/a", "na", "#n/a", "missing", "unknown",
];

/// Check if a string is a null marker (case-insensitive, surrounding
/// whitespace ignored).
pub fn is_null_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    NULL_MARKERS.iter().any(|&m| m == lower)
}

/// Map a raw cell to `None` when it is a null marker.
pub fn non_null(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !is_null_marker(v))
        .map(|v| v.to_string())
}

// =============================================================================
// Text Utilities
// =============================================================================

/// Trim and collapse runs of internal whitespace to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Verification Status Utilities
// =============================================================================

/// Verification values that mark a verified host.
pub const VERIFIED_VALUES: [&str; 4] = ["verified", "t", "true", "yes"];

/// Verification values that explicitly mark a non-verified host.
pub const UNVERIFIED_VALUES: [&str; 4] = ["unconfirmed", "f", "false", "no"];

/// Check if a normalized verification status means verified.
pub fn is_verified_value(s: &str) -> bool {
    VERIFIED_VALUES.iter().any(|&v| v == s)
}

/// Check if a normalized verification status is a known value.
pub fn is_known_verification_value(s: &str) -> bool {
    is_verified_value(s) || UNVERIFIED_VALUES.iter().any(|&v| v == s)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("id"), "id");
        assert_eq!(normalize_header(" Construction year "), "construction_year");
        assert_eq!(normalize_header("neighbourhood group"), "neighborhood_group");
        assert_eq!(normalize_header("availability 365"), "availability_365");
        assert_eq!(normalize_header("room type"), "room_type");
        assert_eq!(normalize_header("review rate number"), "review_rate_number");
    }

    #[test]
    fn test_is_null_marker() {
        assert!(is_null_marker(""));
        assert!(is_null_marker("   "));
        assert!(is_null_marker("NaN"));
        assert!(is_null_marker("N/A"));
        assert!(is_null_marker("  null "));
        assert!(!is_null_marker("0"));
        assert!(!is_null_marker("$100"));
    }

    #[test]
    fn test_non_null() {
        assert_eq!(non_null(Some("nan")), None);
        assert_eq!(non_null(None), None);
        assert_eq!(non_null(Some(" $5 ")), Some(" $5 ".to_string()));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  entire   home/apt "), "entire home/apt");
        assert_eq!(collapse_whitespace("\tHarlem\n"), "Harlem");
    }

    #[test]
    fn test_verification_values() {
        assert!(is_verified_value("verified"));
        assert!(is_verified_value("t"));
        assert!(!is_verified_value("unconfirmed"));
        assert!(is_known_verification_value("unconfirmed"));
        assert!(!is_known_verification_value("pending"));
    }
}
