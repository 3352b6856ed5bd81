//! Locale-aware parsing for scraped listing cells. Vendor tables arrive with
//! non-breaking spaces as thousands separators, comma decimals and percent or
//! currency marks glued to the numbers. Every function here is total: bad
//! input yields `None` (or a fallback), never a panic.

use bigdecimal::{num_bigint::BigInt, BigDecimal};
use chrono::{DateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

lazy_static! {
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9.\-]").unwrap();
    static ref NON_DIGIT: Regex = Regex::new(r"[^0-9]").unwrap();
    static ref ISIN_SHAPE: Regex = Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").unwrap();
}

/// Normalize a possibly empty cell: NBSP to plain space, trimmed.
pub fn clean_cell(s: &str) -> String {
    s.replace('\u{a0}', " ").trim().to_string()
}

/// Parse a locale-formatted decimal ("1 234,56", "5,2%") into a 2dp value.
pub fn parse_decimal_locale(s: &str) -> Option<BigDecimal> {
    let s = clean_cell(s)
        .replace(' ', "")
        .replace('%', "")
        .replace(',', ".");
    let s = NON_NUMERIC.replace_all(&s, "");
    if s.is_empty() || matches!(s.as_ref(), "." | "-." | ".-" | "-") {
        return None;
    }
    s.parse::<BigDecimal>().ok().map(q2)
}

/// Parse a locale-formatted integer ("1 234", "5 000zł") by digit filtering.
pub fn parse_int_locale(s: &str) -> Option<i64> {
    let cleaned = clean_cell(s);
    let s = NON_DIGIT.replace_all(&cleaned, "");
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Parse a last-trade time ("10:45", "10:45:30") onto today's UTC date.
/// Unparseable input falls back to the current instant.
pub fn parse_last_trade_at(s: &str) -> DateTime<Utc> {
    let s = clean_cell(s);
    if s.is_empty() {
        return Utc::now();
    }
    for fmt in ["%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(&s, fmt) {
            return Utc::now().date_naive().and_time(t).and_utc();
        }
    }
    Utc::now()
}

/// Remove diacritics for accent-insensitive comparisons
/// ("październik" -> "pazdziernik").
pub fn strip_accents(s: &str) -> String {
    s.nfkd().filter(|ch| !is_combining_mark(*ch)).collect()
}

/// Upper-cased, trimmed symbol of length 1..=12, or nothing.
pub fn normalize_symbol(s: &str) -> Option<String> {
    let sym = clean_cell(s).to_uppercase();
    if sym.is_empty() || sym.len() > 12 {
        return None;
    }
    Some(sym)
}

/// Full ISO-6166 validation: two letters, nine alphanumerics, one check
/// digit, verified with the Luhn sum over the letter-expanded digit string.
pub fn validate_isin(s: &str) -> bool {
    if !ISIN_SHAPE.is_match(s) {
        return false;
    }
    let mut digits: Vec<u32> = Vec::with_capacity(24);
    for ch in s.chars() {
        match ch.to_digit(36) {
            Some(v) if v >= 10 => {
                digits.push(v / 10);
                digits.push(v % 10);
            },
            Some(v) => digits.push(v),
            None => return false,
        }
    }
    let mut sum = 0u32;
    for (i, d) in digits.iter().rev().enumerate() {
        let mut d = *d;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

/// Quantize to two decimal places, rounding half up.
pub fn q2(value: BigDecimal) -> BigDecimal {
    value.with_scale_round(2, bigdecimal::RoundingMode::HalfUp)
}

pub fn q2_from(digits: i64, scale: i64) -> BigDecimal {
    BigDecimal::new(BigInt::from(digits), scale).with_scale(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_locale() {
        assert_eq!(parse_decimal_locale("1 234,56"), Some(q2_from(123_456, 2)));
        assert_eq!(parse_decimal_locale("5,2%"), Some(q2_from(520, 2)));
        assert_eq!(parse_decimal_locale("-0,35"), Some(q2_from(-35, 2)));
        assert_eq!(parse_decimal_locale("12\u{a0}000"), Some(q2_from(1_200_000, 2)));
        assert_eq!(parse_decimal_locale(""), None);
        assert_eq!(parse_decimal_locale("-"), None);
        assert_eq!(parse_decimal_locale("b/d"), None);
    }

    #[test]
    fn test_parse_int_locale() {
        assert_eq!(parse_int_locale("1 234"), Some(1234));
        assert_eq!(parse_int_locale("5 000zł"), Some(5000));
        assert_eq!(parse_int_locale("—"), None);
        assert_eq!(parse_int_locale(""), None);
    }

    #[test]
    fn test_parse_last_trade_at_formats() {
        let parsed = parse_last_trade_at("10:45:30");
        assert_eq!(parsed.time(), NaiveTime::from_hms_opt(10, 45, 30).unwrap());
        let parsed = parse_last_trade_at("10:45");
        assert_eq!(parsed.time(), NaiveTime::from_hms_opt(10, 45, 0).unwrap());
        // Garbage falls back to "now"; only sanity-check it does not panic.
        let _ = parse_last_trade_at("yesterday");
    }

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("październik"), "pazdziernik");
        assert_eq!(strip_accents("świeża"), "swieza");
        assert_eq!(strip_accents("plain"), "plain");
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" pkn "), Some("PKN".to_string()));
        assert_eq!(normalize_symbol(""), None);
        assert_eq!(normalize_symbol("WAYTOOLONGSYMBOL"), None);
    }

    #[test]
    fn test_validate_isin() {
        assert!(validate_isin("US0378331005"));
        assert!(validate_isin("PLPKN0000018"));
        // Wrong check digit.
        assert!(!validate_isin("US0378331004"));
        // Wrong shape.
        assert!(!validate_isin("0SUS37833100"));
        assert!(!validate_isin("US03783310"));
        assert!(!validate_isin("nan"));
    }
}
