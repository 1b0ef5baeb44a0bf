//! Calendar buckets used for reporting
//!
//! `YearMonth` groups transactions for monthly trends; `TaxYear` groups them
//! for tax exports (April 1 through March 31).

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Month in which the tax year starts
pub const TAX_YEAR_START_MONTH: u32 = 4;

/// A calendar month, e.g. 2025-03
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Create a month; returns None for months outside 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Hebrew month name
    pub fn hebrew_month_name(&self) -> &'static str {
        const NAMES: [&str; 12] = [
            "ינואר", "פברואר", "מרץ", "אפריל", "מאי", "יוני", "יולי", "אוגוסט", "ספטמבר",
            "אוקטובר", "נובמבר", "דצמבר",
        ];
        NAMES[(self.month as usize).saturating_sub(1) % 12]
    }

    /// Every month from `self` through `end`, inclusive
    pub fn range_to(&self, end: YearMonth) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut current = *self;
        while current <= end {
            months.push(current);
            current = current.next();
        }
        months
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Tax year running April 1 of `start_year` through March 31 of the next year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxYear {
    start_year: i32,
}

impl TaxYear {
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The tax year a date falls in
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= TAX_YEAR_START_MONTH {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, TAX_YEAR_START_MONTH, 1).unwrap_or_default()
    }

    pub fn end(&self) -> NaiveDate {
        Self::starting(self.start_year + 1).start() - Duration::days(1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }

    pub fn previous(&self) -> Self {
        Self::starting(self.start_year - 1)
    }

    pub fn next(&self) -> Self {
        Self::starting(self.start_year + 1)
    }

    /// Label such as `2024/25`
    pub fn label(&self) -> String {
        format!("{}/{:02}", self.start_year, (self.start_year + 1).rem_euclid(100))
    }
}

impl fmt::Display for TaxYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_month_bounds() {
        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(feb.first_day(), date(2024, 2, 1));
        assert_eq!(feb.last_day(), date(2024, 2, 29));
        assert!(YearMonth::new(2024, 13).is_none());
    }

    #[test]
    fn test_year_month_wraps() {
        let dec = YearMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), YearMonth::new(2025, 1).unwrap());
        assert_eq!(dec.next().prev(), dec);
        assert_eq!(dec.to_string(), "2024-12");
        assert_eq!(dec.hebrew_month_name(), "דצמבר");
    }

    #[test]
    fn test_range_to() {
        let start = YearMonth::new(2024, 11).unwrap();
        let end = YearMonth::new(2025, 2).unwrap();
        let months = start.range_to(end);
        assert_eq!(months.len(), 4);
        assert_eq!(months[2], YearMonth::new(2025, 1).unwrap());
        assert!(end.range_to(start).is_empty());
    }

    #[test]
    fn test_tax_year_boundaries() {
        assert_eq!(TaxYear::containing(date(2025, 3, 31)).start_year(), 2024);
        assert_eq!(TaxYear::containing(date(2025, 4, 1)).start_year(), 2025);

        let ty = TaxYear::starting(2024);
        assert_eq!(ty.start(), date(2024, 4, 1));
        assert_eq!(ty.end(), date(2025, 3, 31));
        assert!(ty.contains(date(2025, 1, 15)));
        assert!(!ty.contains(date(2025, 4, 1)));
    }

    #[test]
    fn test_tax_year_label() {
        assert_eq!(TaxYear::starting(2024).label(), "2024/25");
        assert_eq!(TaxYear::starting(2099).label(), "2099/00");
        assert_eq!(TaxYear::starting(2024).previous().label(), "2023/24");
    }
}
