//! Individual validation rules
//!
//! Rules push Hebrew messages into a [`ValidationErrors`] under the given
//! field name. The Israeli-specific checks (ID checksum, phone numbering plan)
//! are plain predicates so import code can reuse them.

use chrono::{Datelike, NaiveDate};

use super::ValidationErrors;
use crate::models::Money;

/// Earliest and latest years accepted for any record date
pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2100;

pub fn required(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "שדה חובה");
    }
}

pub fn max_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("אורך מקסימלי {} תווים", max));
    }
}

pub fn positive_amount(errors: &mut ValidationErrors, field: &str, amount: Money) {
    if !amount.is_positive() {
        errors.add(field, "הסכום חייב להיות גדול מאפס");
    }
}

pub fn non_negative_amount(errors: &mut ValidationErrors, field: &str, amount: Money) {
    if amount.is_negative() {
        errors.add(field, "הסכום אינו יכול להיות שלילי");
    }
}

pub fn in_range<T>(errors: &mut ValidationErrors, field: &str, value: T, min: T, max: T)
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        errors.add(field, format!("ערך חייב להיות בין {} ל-{}", min, max));
    }
}

/// `end` must not come before `start`; the error is recorded against `field`
pub fn date_order(errors: &mut ValidationErrors, field: &str, start: NaiveDate, end: NaiveDate) {
    if end < start {
        errors.add(field, "תאריך הסיום חייב להיות אחרי תאריך ההתחלה");
    }
}

pub fn date_in_supported_range(errors: &mut ValidationErrors, field: &str, date: NaiveDate) {
    if date.year() < MIN_YEAR || date.year() > MAX_YEAR {
        errors.add(field, "תאריך מחוץ לטווח המותר");
    }
}

/// How far ahead of today a transaction may be dated (post-dated cheques)
pub const MAX_FUTURE_DAYS: i64 = 366;

pub fn date_not_far_in_future(
    errors: &mut ValidationErrors,
    field: &str,
    date: NaiveDate,
    today: NaiveDate,
    max_days: i64,
) {
    if (date - today).num_days() > max_days {
        errors.add(field, format!("התאריך רחוק מדי בעתיד (יותר מ-{} ימים)", max_days));
    }
}

/// Validate an Israeli ID number (teudat zehut)
///
/// Up to nine digits, left-padded with zeros. Digits are weighted 1,2,1,2...
/// from the left, two-digit products are reduced by summing their digits, and
/// the total must be divisible by ten.
pub fn is_valid_israeli_id(id: &str) -> bool {
    let digits: String = id.chars().filter(|c| !matches!(c, '-' | ' ')).collect();
    if digits.is_empty() || digits.len() > 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if digits.chars().all(|c| c == '0') {
        return false;
    }

    let padded = format!("{:0>9}", digits);
    let sum: u32 = padded
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            let product = digit * if i % 2 == 0 { 1 } else { 2 };
            if product > 9 {
                product - 9
            } else {
                product
            }
        })
        .sum();

    sum % 10 == 0
}

/// Strip separators and turn an international `+972` prefix into a leading zero
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if let Some(rest) = digits.strip_prefix("+972") {
        format!("0{}", rest.trim_start_matches('0'))
    } else if digits.starts_with("972") && digits.len() >= 11 {
        format!("0{}", &digits[3..])
    } else {
        digits
    }
}

/// Validate an Israeli phone number
///
/// Mobile (`05X`) and VoIP (`07X`) numbers have ten digits, landlines
/// (`02`, `03`, `04`, `08`, `09`) have nine.
pub fn is_valid_israeli_phone(phone: &str) -> bool {
    let number = normalize_phone(phone);
    if !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let bytes = number.as_bytes();
    match (bytes.len(), bytes.first(), bytes.get(1)) {
        (10, Some(b'0'), Some(b'5')) | (10, Some(b'0'), Some(b'7')) => true,
        (9, Some(b'0'), Some(b'2' | b'3' | b'4' | b'8' | b'9')) => true,
        _ => false,
    }
}

/// `#RGB` or `#RRGGBB`
pub fn is_valid_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_israeli_id_checksum() {
        assert!(is_valid_israeli_id("123456782"));
        assert!(is_valid_israeli_id("000000018"));
        assert!(is_valid_israeli_id("18"));
        assert!(is_valid_israeli_id("12345678-2"));
        assert!(!is_valid_israeli_id("123456789"));
        assert!(!is_valid_israeli_id("000000000"));
        assert!(!is_valid_israeli_id("1234567890"));
        assert!(!is_valid_israeli_id("12345678a"));
        assert!(!is_valid_israeli_id(""));
    }

    #[test]
    fn test_israeli_phone() {
        assert!(is_valid_israeli_phone("050-1234567"));
        assert!(is_valid_israeli_phone("0521234567"));
        assert!(is_valid_israeli_phone("+972-54-123-4567"));
        assert!(is_valid_israeli_phone("972541234567"));
        assert!(is_valid_israeli_phone("03-1234567"));
        assert!(is_valid_israeli_phone("(02) 123 4567"));
        assert!(is_valid_israeli_phone("077-1234567"));

        assert!(!is_valid_israeli_phone("06-1234567"));
        assert!(!is_valid_israeli_phone("050-123456"));
        assert!(!is_valid_israeli_phone("03-12345678"));
        assert!(!is_valid_israeli_phone("phone"));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+972 (0)50-123-4567"), "0501234567");
        assert_eq!(normalize_phone("03.123.4567"), "031234567");
    }

    #[test]
    fn test_hex_color() {
        assert!(is_valid_hex_color("#4CAF50"));
        assert!(is_valid_hex_color("#fff"));
        assert!(!is_valid_hex_color("4CAF50"));
        assert!(!is_valid_hex_color("#12345G"));
    }

    #[test]
    fn test_in_range() {
        let mut errors = ValidationErrors::new();
        in_range(&mut errors, "percent", 120u8, 0, 100);
        in_range(&mut errors, "day", 3u8, 0, 6);
        assert!(errors.has("percent"));
        assert!(!errors.has("day"));
    }
}
