//! Analytics over transactions
//!
//! Everything here is a pure function of the records passed in; callers pick
//! the date range by filtering first (see [`crate::search::TransactionFilter`]).
//! Transfers move money between accounts and never count as income or
//! expense.

pub mod breakdown;
pub mod budget;

pub use breakdown::{by_account, by_category, AccountFlow, CategoryBreakdown, UNCATEGORIZED_LABEL};
pub use budget::{budget_progress, BudgetLine, BudgetProgress};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Money, TaxYear, Transaction, TransactionKind, YearMonth};

/// Income and expense totals for a set of transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub income: Money,
    pub expenses: Money,
    /// Volume moved by transfers, for information only
    pub transfers: Money,
    pub transaction_count: usize,
}

impl Totals {
    pub fn compute<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut totals = Self::default();
        for txn in transactions {
            totals.add(txn);
        }
        totals
    }

    fn add(&mut self, txn: &Transaction) {
        match txn.kind {
            TransactionKind::Income => self.income += txn.amount,
            TransactionKind::Expense => self.expenses += txn.amount,
            TransactionKind::Transfer => self.transfers += txn.amount,
        }
        self.transaction_count += 1;
    }

    /// Income minus expenses
    pub fn net(&self) -> Money {
        self.income - self.expenses
    }

    pub fn savings_rate(&self) -> Option<f64> {
        savings_rate(self.income, self.expenses)
    }
}

/// Share of income left after expenses, as a percentage
///
/// `None` when there is no income to measure against. Negative when
/// spending exceeded income.
pub fn savings_rate(income: Money, expenses: Money) -> Option<f64> {
    if income.is_zero() {
        return None;
    }
    Some((income - expenses).as_f64() / income.as_f64() * 100.0)
}

/// Totals for one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyPoint {
    pub month: YearMonth,
    pub totals: Totals,
}

/// Monthly totals for every month from `from` through `to`
///
/// Months without transactions appear with zero totals. Transactions outside
/// the range are ignored.
pub fn monthly_trend(transactions: &[Transaction], from: NaiveDate, to: NaiveDate) -> Vec<MonthlyPoint> {
    if from > to {
        return Vec::new();
    }

    let mut buckets: BTreeMap<YearMonth, Totals> = YearMonth::of(from)
        .range_to(YearMonth::of(to))
        .into_iter()
        .map(|m| (m, Totals::default()))
        .collect();

    for txn in transactions.iter().filter(|t| t.date >= from && t.date <= to) {
        if let Some(bucket) = buckets.get_mut(&YearMonth::of(txn.date)) {
            bucket.add(txn);
        }
    }

    buckets
        .into_iter()
        .map(|(month, totals)| MonthlyPoint { month, totals })
        .collect()
}

/// Monthly trend spanning the first through last transaction
pub fn monthly_trend_all(transactions: &[Transaction]) -> Vec<MonthlyPoint> {
    let first = transactions.iter().map(|t| t.date).min();
    let last = transactions.iter().map(|t| t.date).max();
    match (first, last) {
        (Some(from), Some(to)) => monthly_trend(transactions, from, to),
        _ => Vec::new(),
    }
}

/// Totals for one Israeli tax year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxYearSummary {
    pub tax_year: TaxYear,
    pub totals: Totals,
}

/// Totals grouped by tax year, oldest first
pub fn tax_year_summary(transactions: &[Transaction]) -> Vec<TaxYearSummary> {
    let mut years: BTreeMap<TaxYear, Totals> = BTreeMap::new();
    for txn in transactions {
        years
            .entry(TaxYear::containing(txn.date))
            .or_default()
            .add(txn);
    }
    years
        .into_iter()
        .map(|(tax_year, totals)| TaxYearSummary { tax_year, totals })
        .collect()
}
