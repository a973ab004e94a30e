// Utility helpers for parsing counts and formatting numbers.
//
// This module centralizes the "dirty" value handling so the rest of the code
// can assume clean, non-negative integer counts.
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Parse a string-like count while being forgiving about formatting issues
/// that are common in government exports (thousands separators, spaces).
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything negative, non-finite or unparseable.
pub fn parse_count_str(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    if !f.is_finite() || f < 0.0 {
        return None;
    }
    Some(f.round() as u64)
}

/// Extract a count from a JSON value: native numbers and numeric strings are
/// accepted, everything else (null, bool, objects, arrays, text) is 0.
pub fn count_from_value(v: &Value) -> u64 {
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f > 0.0 => f.round() as u64,
                    _ => 0,
                }
            }
        }
        Value::String(s) => parse_count_str(s).unwrap_or(0),
        _ => 0,
    }
}

/// Round to two decimal places, the precision used for percentages.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed number of decimals plus locale-aware thousands separators
    // (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numeric_strings_with_separators() {
        assert_eq!(parse_count_str(" 1,234 "), Some(1234));
        assert_eq!(parse_count_str("12.0"), Some(12));
        assert_eq!(parse_count_str("-3"), None);
        assert_eq!(parse_count_str("n/a"), None);
        assert_eq!(parse_count_str(""), None);
    }

    #[test]
    fn non_numeric_values_count_as_zero() {
        assert_eq!(count_from_value(&json!(7)), 7);
        assert_eq!(count_from_value(&json!("15")), 15);
        assert_eq!(count_from_value(&json!(null)), 0);
        assert_eq!(count_from_value(&json!({"a": 1})), 0);
        assert_eq!(count_from_value(&json!([1, 2])), 0);
        assert_eq!(count_from_value(&json!(true)), 0);
        assert_eq!(count_from_value(&json!(-4)), 0);
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_int(1234567u64), "1,234,567");
        assert_eq!(format_number(-1234.5, 2), "-1,234.50");
        assert_eq!(round2(12.3456), 12.35);
    }
}
