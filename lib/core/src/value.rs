//! Cell-level parsing shared by type inference and the typed column views.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Cell contents treated as missing values
pub const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Returns true if the raw cell should be read as null
pub fn is_null(raw: &str) -> bool {
    let trimmed = raw.trim();
    NULL_TOKENS.iter().any(|t| *t == trimmed)
}

/// Parse a cell as a float. NaN never comes back as a value.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Best-effort datetime parsing over the accepted date and datetime layouts
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

/// Parse an ISO `YYYY-MM-DD` date to midnight
pub fn parse_iso_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_tokens() {
        assert!(is_null(""));
        assert!(is_null("   "));
        assert!(is_null("NaN"));
        assert!(is_null(" N/A "));
        assert!(!is_null("0"));
        assert!(!is_null("none of them"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number(" -2.5 "), Some(-2.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("diez"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_parse_datetime_layouts() {
        let midnight = parse_iso_date("2021-06-01").unwrap();
        assert_eq!(parse_datetime("2021-06-01"), Some(midnight));
        assert_eq!(parse_datetime("2021/06/01"), Some(midnight));
        assert_eq!(parse_datetime("01/06/2021"), Some(midnight));
        assert!(parse_datetime("2021-06-01 13:45:00").is_some());
        assert!(parse_datetime("2021-06-01T13:45:00").is_some());
        assert!(parse_datetime("2021-06-01T13:45:00Z").is_some());
        assert_eq!(parse_datetime("manzana"), None);
        assert_eq!(parse_datetime("2021-13-45"), None);
    }
}
