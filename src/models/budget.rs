//! Budget model
//!
//! A time-bounded spending plan allocating amounts across categories.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BudgetId, CategoryId};
use super::money::Money;

/// Amount planned for one category within a budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub category_id: CategoryId,
    pub amount: Money,
}

/// A spending plan for a date range (both ends inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[serde(default)]
    pub allocations: Vec<BudgetAllocation>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Budget {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: BudgetId::new(),
            name: name.into(),
            start_date,
            end_date,
            allocations: Vec::new(),
            is_active: true,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set (or replace) the allocation for a category
    pub fn allocate(&mut self, category_id: CategoryId, amount: Money) {
        match self
            .allocations
            .iter_mut()
            .find(|a| a.category_id == category_id)
        {
            Some(existing) => existing.amount = amount,
            None => self.allocations.push(BudgetAllocation {
                category_id,
                amount,
            }),
        }
        self.updated_at = Utc::now();
    }

    pub fn allocation_for(&self, category_id: CategoryId) -> Option<Money> {
        self.allocations
            .iter()
            .find(|a| a.category_id == category_id)
            .map(|a| a.amount)
    }

    pub fn total_allocated(&self) -> Money {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// The budget period ended before `today`
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    /// Number of days in the budget period
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} - {})",
            self.name,
            self.start_date.format("%d/%m/%Y"),
            self.end_date.format("%d/%m/%Y")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_allocate_replaces() {
        let mut budget = Budget::new("ינואר", date(2025, 1, 1), date(2025, 1, 31));
        let cat = CategoryId::new();
        budget.allocate(cat, Money::from_agorot(100000));
        budget.allocate(cat, Money::from_agorot(150000));
        budget.allocate(CategoryId::new(), Money::from_agorot(50000));

        assert_eq!(budget.allocations.len(), 2);
        assert_eq!(budget.allocation_for(cat), Some(Money::from_agorot(150000)));
        assert_eq!(budget.total_allocated().agorot(), 200000);
    }

    #[test]
    fn test_expiry_and_range() {
        let budget = Budget::new("ינואר", date(2025, 1, 1), date(2025, 1, 31));
        assert!(budget.contains(date(2025, 1, 31)));
        assert!(!budget.contains(date(2025, 2, 1)));
        assert!(!budget.is_expired(date(2025, 1, 31)));
        assert!(budget.is_expired(date(2025, 2, 1)));
        assert_eq!(budget.days(), 31);
    }
}
