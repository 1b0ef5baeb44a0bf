//! Transaction search
//!
//! A [`TransactionFilter`] is built up with chained calls and then applied to
//! a slice of transactions. All criteria combine with AND; set-valued
//! criteria (categories, accounts, tags, kinds) match any member.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::{AccountId, CategoryId, Money, Transaction, TransactionKind};

/// Field to order results by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Date,
    Amount,
    Description,
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "date" | "תאריך" => Some(Self::Date),
            "amount" | "סכום" => Some(Self::Amount),
            "description" | "תיאור" => Some(Self::Description),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    /// Newest (or largest) first
    #[default]
    Descending,
}

/// Options for filtering, sorting and paging transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Bounds on the amount magnitude, inclusive
    pub min_amount: Option<Money>,
    pub max_amount: Option<Money>,
    pub categories: HashSet<CategoryId>,
    /// Matches the source account or the transfer target
    pub accounts: HashSet<AccountId>,
    pub tags: Vec<String>,
    pub kinds: HashSet<TransactionKind>,
    pub query: Option<String>,
    pub uncategorized_only: bool,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inclusive date range
    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn from_date(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn to_date(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn min_amount(mut self, amount: Money) -> Self {
        self.min_amount = Some(amount.abs());
        self
    }

    pub fn max_amount(mut self, amount: Money) -> Self {
        self.max_amount = Some(amount.abs());
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.categories.insert(category_id);
        self
    }

    pub fn account(mut self, account_id: AccountId) -> Self {
        self.accounts.insert(account_id);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !tag.trim().is_empty() {
            self.tags.push(tag.trim().to_string());
        }
        self
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    /// Case-insensitive text match against description, notes, tags and reference
    pub fn query(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.query = if text.trim().is_empty() {
            None
        } else {
            Some(text.trim().to_lowercase())
        };
        self
    }

    pub fn uncategorized(mut self) -> Self {
        self.uncategorized_only = true;
        self
    }

    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Whether a single transaction passes every criterion
    pub fn matches(&self, txn: &Transaction) -> bool {
        if self.start_date.is_some_and(|start| txn.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| txn.date > end) {
            return false;
        }
        if self.min_amount.is_some_and(|min| txn.amount.abs() < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| txn.amount.abs() > max) {
            return false;
        }
        if !self.categories.is_empty()
            && !txn
                .category_id
                .is_some_and(|id| self.categories.contains(&id))
        {
            return false;
        }
        if !self.accounts.is_empty() && !self.accounts.iter().any(|a| txn.involves_account(*a)) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| txn.has_tag(t)) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&txn.kind) {
            return false;
        }
        if self.uncategorized_only && (txn.category_id.is_some() || txn.is_transfer()) {
            return false;
        }
        if let Some(query) = &self.query {
            if !text_matches(txn, query) {
                return false;
            }
        }
        true
    }

    /// Filter, sort and page
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        let mut results: Vec<Transaction> = transactions
            .iter()
            .filter(|t| self.matches(t))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            let ordering = compare(a, b, self.sort_by);
            match self.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });

        let paged = results.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => paged.take(limit).collect(),
            None => paged.collect(),
        }
    }

    /// Number of matches before paging
    pub fn count(&self, transactions: &[Transaction]) -> usize {
        transactions.iter().filter(|t| self.matches(t)).count()
    }
}

fn text_matches(txn: &Transaction, query: &str) -> bool {
    txn.description.to_lowercase().contains(query)
        || txn.notes.to_lowercase().contains(query)
        || txn.tags.iter().any(|t| t.to_lowercase().contains(query))
        || txn
            .reference
            .as_deref()
            .is_some_and(|r| r.to_lowercase().contains(query))
}

fn compare(a: &Transaction, b: &Transaction, field: SortField) -> Ordering {
    match field {
        SortField::Date => a
            .date
            .cmp(&b.date)
            .then_with(|| a.created_at.cmp(&b.created_at)),
        SortField::Amount => a.amount.cmp(&b.amount).then_with(|| a.date.cmp(&b.date)),
        SortField::Description => a
            .description
            .to_lowercase()
            .cmp(&b.description.to_lowercase())
            .then_with(|| a.date.cmp(&b.date)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn fixture() -> (Vec<Transaction>, AccountId, AccountId, CategoryId) {
        let checking = AccountId::new();
        let savings = AccountId::new();
        let food = CategoryId::new();

        let mut groceries =
            Transaction::expense(checking, date(3), Money::from_shekels(250, 0), "שופרסל דיל", Some(food));
        groceries.set_tags(["משפחה"]);
        let mut salary = Transaction::income(checking, date(1), Money::from_shekels(12000, 0), "משכורת ינואר", None);
        salary.reference = Some("998877".into());
        let mut coffee = Transaction::expense(checking, date(3), Money::from_shekels(18, 0), "Aroma", None);
        coffee.notes = "פגישה עם לקוח".into();
        coffee.created_at = groceries.created_at + Duration::seconds(5);
        let transfer = Transaction::transfer(checking, savings, date(10), Money::from_shekels(1000, 0), "חיסכון");

        (vec![groceries, salary, coffee, transfer], checking, savings, food)
    }

    #[test]
    fn test_empty_filter_sorts_newest_first() {
        let (txns, ..) = fixture();
        let results = TransactionFilter::new().apply(&txns);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].description, "חיסכון");
        // Same date: later creation first when descending
        assert_eq!(results[1].description, "Aroma");
        assert_eq!(results[2].description, "שופרסל דיל");
        assert_eq!(results[3].description, "משכורת ינואר");
    }

    #[test]
    fn test_date_and_amount_ranges() {
        let (txns, ..) = fixture();
        let results = TransactionFilter::new()
            .date_range(date(2), date(5))
            .min_amount(Money::from_shekels(20, 0))
            .apply(&txns);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].description, "שופרסל דיל");
    }

    #[test]
    fn test_account_matches_transfer_target() {
        let (txns, _, savings, _) = fixture();
        let results = TransactionFilter::new().account(savings).apply(&txns);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_transfer());
    }

    #[test]
    fn test_category_tag_and_kind() {
        let (txns, _, _, food) = fixture();
        assert_eq!(TransactionFilter::new().category(food).count(&txns), 1);
        assert_eq!(TransactionFilter::new().tag("משפחה").count(&txns), 1);
        assert_eq!(TransactionFilter::new().kind(TransactionKind::Income).count(&txns), 1);
        assert_eq!(
            TransactionFilter::new()
                .kind(TransactionKind::Income)
                .kind(TransactionKind::Transfer)
                .count(&txns),
            2
        );
    }

    #[test]
    fn test_query_searches_all_text_fields() {
        let (txns, ..) = fixture();
        assert_eq!(TransactionFilter::new().query("aroma").count(&txns), 1);
        assert_eq!(TransactionFilter::new().query("לקוח").count(&txns), 1);
        assert_eq!(TransactionFilter::new().query("משפחה").count(&txns), 1);
        assert_eq!(TransactionFilter::new().query("9988").count(&txns), 1);
        assert_eq!(TransactionFilter::new().query("   ").count(&txns), 4);
    }

    #[test]
    fn test_uncategorized_excludes_transfers() {
        let (txns, ..) = fixture();
        let results = TransactionFilter::new().uncategorized().apply(&txns);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_sort_and_paging() {
        let (txns, ..) = fixture();
        let page = TransactionFilter::new()
            .sort(SortField::Amount, SortOrder::Ascending)
            .offset(1)
            .limit(2)
            .apply(&txns);
        let amounts: Vec<i64> = page.iter().map(|t| t.amount.shekels()).collect();
        assert_eq!(amounts, vec![250, 1000]);
    }
}
