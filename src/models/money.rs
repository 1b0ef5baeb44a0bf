//! Money type for representing shekel amounts
//!
//! Internally stores amounts in agorot (i64) to avoid floating-point precision
//! issues. Provides safe arithmetic operations and Israeli-style formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// The shekel sign
pub const SHEKEL_SIGN: &str = "₪";

/// Represents a monetary amount stored as agorot (hundredths of a shekel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from agorot
    ///
    /// # Examples
    /// ```
    /// use kesef::models::Money;
    /// let amount = Money::from_agorot(1050); // ₪10.50
    /// ```
    pub const fn from_agorot(agorot: i64) -> Self {
        Self(agorot)
    }

    /// Create a Money amount from whole shekels and agorot
    pub const fn from_shekels(shekels: i64, agorot: i64) -> Self {
        Self(shekels * 100 + agorot)
    }

    /// Convert a fractional shekel amount, rounding to the nearest agora
    pub fn from_shekels_f64(shekels: f64) -> Self {
        Self((shekels * 100.0).round() as i64)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in agorot
    pub const fn agorot(&self) -> i64 {
        self.0
    }

    /// Whole shekels portion (truncated toward zero)
    pub const fn shekels(&self) -> i64 {
        self.0 / 100
    }

    /// Agorot portion (0-99)
    pub const fn agorot_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Amount as fractional shekels (for percentages and charts only)
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Percentage this amount represents of `total`, or 0 when total is zero
    pub fn percent_of(&self, total: Money) -> f64 {
        if total.is_zero() {
            0.0
        } else {
            self.0 as f64 / total.0 as f64 * 100.0
        }
    }

    /// Parse a money amount as typed by a user or printed by a bank
    ///
    /// Accepts `1234.5`, `1,234.50`, `₪1,234`, `1,234 ₪`, `50 ש"ח`, `-50`,
    /// `(50.00)` and a trailing minus (`50.00-`).
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let original = s;
        let mut s = s.trim().to_string();
        for marker in [SHEKEL_SIGN, "ש\"ח", "ש״ח", "NIS", "ILS"] {
            s = s.replace(marker, "");
        }
        let mut s = s.trim();

        let mut negative = false;
        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            negative = true;
            s = inner.trim();
        }
        if let Some(rest) = s.strip_prefix('-') {
            negative = !negative;
            s = rest.trim();
        } else if let Some(rest) = s.strip_suffix('-') {
            negative = !negative;
            s = rest.trim();
        }
        let s = s.strip_prefix('+').unwrap_or(s);
        let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();

        if cleaned.is_empty() {
            return Err(MoneyParseError::InvalidFormat(original.to_string()));
        }

        let (whole, fraction) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
            return Err(MoneyParseError::InvalidFormat(original.to_string()));
        }

        let shekels: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| MoneyParseError::InvalidFormat(original.to_string()))?
        };

        let digits: Vec<i64> = fraction.bytes().map(|b| (b - b'0') as i64).collect();
        let mut agorot = digits.first().copied().unwrap_or(0) * 10 + digits.get(1).copied().unwrap_or(0);
        if digits.get(2).copied().unwrap_or(0) >= 5 {
            agorot += 1;
        }

        let total = shekels
            .checked_mul(100)
            .and_then(|v| v.checked_add(agorot))
            .ok_or_else(|| MoneyParseError::InvalidFormat(original.to_string()))?;

        Ok(Self(if negative { -total } else { total }))
    }

    /// Plain decimal form used in CSV files, e.g. `-1234.50`
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.shekels().abs(), self.agorot_part())
    }

    /// Format with a currency symbol and thousands separators
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            symbol,
            group_thousands(self.shekels().unsigned_abs()),
            self.agorot_part()
        )
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_with_symbol(SHEKEL_SIGN))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid money format: {}", s),
        }
    }
}

impl std::error::Error for MoneyParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_agorot() {
        let m = Money::from_agorot(1050);
        assert_eq!(m.agorot(), 1050);
        assert_eq!(m.shekels(), 10);
        assert_eq!(m.agorot_part(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_agorot(1050).to_string(), "₪10.50");
        assert_eq!(Money::from_agorot(0).to_string(), "₪0.00");
        assert_eq!(Money::from_agorot(-1050).to_string(), "-₪10.50");
        assert_eq!(Money::from_agorot(123456789).to_string(), "₪1,234,567.89");
        assert_eq!(Money::from_agorot(100000).to_string(), "₪1,000.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_agorot(1000);
        let b = Money::from_agorot(500);

        assert_eq!((a + b).agorot(), 1500);
        assert_eq!((a - b).agorot(), 500);
        assert_eq!((-a).agorot(), -1000);
    }

    #[test]
    fn test_parse_plain() {
        assert_eq!(Money::parse("10.50").unwrap().agorot(), 1050);
        assert_eq!(Money::parse("10").unwrap().agorot(), 1000);
        assert_eq!(Money::parse("10.5").unwrap().agorot(), 1050);
        assert_eq!(Money::parse("0.05").unwrap().agorot(), 5);
        assert_eq!(Money::parse(".5").unwrap().agorot(), 50);
    }

    #[test]
    fn test_parse_israeli_formats() {
        assert_eq!(Money::parse("₪1,234.50").unwrap().agorot(), 123450);
        assert_eq!(Money::parse("1,234 ₪").unwrap().agorot(), 123400);
        assert_eq!(Money::parse("50 ש\"ח").unwrap().agorot(), 5000);
        assert_eq!(Money::parse("250.00-").unwrap().agorot(), -25000);
        assert_eq!(Money::parse("(75.10)").unwrap().agorot(), -7510);
        assert_eq!(Money::parse("-₪20").unwrap().agorot(), -2000);
    }

    #[test]
    fn test_parse_rounds_third_decimal() {
        assert_eq!(Money::parse("1.005").unwrap().agorot(), 101);
        assert_eq!(Money::parse("1.004").unwrap().agorot(), 100);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Money::parse("").is_err());
        assert!(Money::parse("₪").is_err());
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("1.2.3").is_err());
    }

    #[test]
    fn test_from_shekels_f64() {
        assert_eq!(Money::from_shekels_f64(12.5).agorot(), 1250);
        assert_eq!(Money::from_shekels_f64(0.1 + 0.2).agorot(), 30);
        assert_eq!(Money::from_shekels_f64(-3.999).agorot(), -400);
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(Money::from_agorot(-123450).to_decimal_string(), "-1234.50");
        assert_eq!(Money::from_agorot(5).to_decimal_string(), "0.05");
    }

    #[test]
    fn test_percent_of() {
        let part = Money::from_agorot(2500);
        assert_eq!(part.percent_of(Money::from_agorot(10000)), 25.0);
        assert_eq!(part.percent_of(Money::zero()), 0.0);
    }

    #[test]
    fn test_sum() {
        let amounts = vec![
            Money::from_agorot(100),
            Money::from_agorot(200),
            Money::from_agorot(300),
        ];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.agorot(), 600);
    }

    #[test]
    fn test_serialization() {
        let m = Money::from_agorot(1050);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "1050");
    }
}
