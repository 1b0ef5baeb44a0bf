//! Per-category and per-account breakdowns

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{
    Account, AccountId, Category, CategoryId, CategoryKind, Money, Transaction, TransactionKind,
};

/// Label for transactions without a (known) category
pub const UNCATEGORIZED_LABEL: &str = "ללא קטגוריה";

/// Totals for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    /// None for the uncategorized bucket
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub kind: CategoryKind,
    pub total: Money,
    pub transaction_count: usize,
    /// Share of the total for this kind, in percent
    pub share: f64,
    /// Monthly budget times the number of months covered
    pub budget: Option<Money>,
}

impl CategoryBreakdown {
    pub fn is_over_budget(&self) -> bool {
        self.budget.is_some_and(|b| self.total > b)
    }

    /// Budget minus total, when a budget is set
    pub fn remaining(&self) -> Option<Money> {
        self.budget.map(|b| b - self.total)
    }
}

/// Income and expense totals per category
///
/// Expenses come first, then income; each group is sorted by total, largest
/// first, with the uncategorized bucket last. `months` scales the monthly
/// budget figure for multi-month ranges.
pub fn by_category(
    transactions: &[Transaction],
    categories: &[Category],
    months: u32,
) -> Vec<CategoryBreakdown> {
    let lookup: HashMap<CategoryId, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    let mut sums: HashMap<(CategoryKind, Option<CategoryId>), (Money, usize)> = HashMap::new();
    for txn in transactions {
        let kind = match txn.kind {
            TransactionKind::Income => CategoryKind::Income,
            TransactionKind::Expense => CategoryKind::Expense,
            TransactionKind::Transfer => continue,
        };
        let category = txn.category_id.filter(|id| lookup.contains_key(id));
        let entry = sums.entry((kind, category)).or_insert((Money::zero(), 0));
        entry.0 += txn.amount;
        entry.1 += 1;
    }

    let mut rows = Vec::new();
    for kind in [CategoryKind::Expense, CategoryKind::Income] {
        let kind_total: Money = sums
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, (total, _))| *total)
            .sum();

        let mut group: Vec<CategoryBreakdown> = sums
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), (total, count))| {
                let category = id.and_then(|id| lookup.get(&id));
                CategoryBreakdown {
                    category_id: *id,
                    name: category
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| UNCATEGORIZED_LABEL.to_string()),
                    kind,
                    total: *total,
                    transaction_count: *count,
                    share: total.percent_of(kind_total),
                    budget: category
                        .and_then(|c| c.monthly_budget)
                        .map(|b| Money::from_agorot(b.agorot() * i64::from(months.max(1)))),
                }
            })
            .collect();

        group.sort_by(|a, b| {
            a.category_id
                .is_none()
                .cmp(&b.category_id.is_none())
                .then_with(|| b.total.cmp(&a.total))
                .then_with(|| a.name.cmp(&b.name))
        });
        rows.extend(group);
    }
    rows
}

/// Money moving in and out of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountFlow {
    pub account_id: AccountId,
    pub name: String,
    /// Income plus incoming transfers
    pub inflow: Money,
    /// Expenses plus outgoing transfers
    pub outflow: Money,
    pub transaction_count: usize,
}

impl AccountFlow {
    pub fn net(&self) -> Money {
        self.inflow - self.outflow
    }
}

/// Inflow and outflow per account, in account order
///
/// Accounts with no activity are included with zero flows.
pub fn by_account(transactions: &[Transaction], accounts: &[Account]) -> Vec<AccountFlow> {
    accounts
        .iter()
        .map(|account| {
            let mut flow = AccountFlow {
                account_id: account.id,
                name: account.name.clone(),
                inflow: Money::zero(),
                outflow: Money::zero(),
                transaction_count: 0,
            };
            for txn in transactions.iter().filter(|t| t.involves_account(account.id)) {
                let effect = txn.effect_on(account.id);
                if effect.is_positive() {
                    flow.inflow += effect;
                } else {
                    flow.outflow += effect.abs();
                }
                flow.transaction_count += 1;
            }
            flow
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountKind;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    #[test]
    fn test_by_category_with_uncategorized_and_budget() {
        let account = AccountId::new();
        let food = Category::with_budget("מזון", CategoryKind::Expense, Money::from_shekels(1000, 0));
        let fuel = Category::new("דלק", CategoryKind::Expense);
        let salary = Category::new("משכורת", CategoryKind::Income);

        let txns = vec![
            Transaction::expense(account, date(1), Money::from_shekels(700, 0), "שופרסל", Some(food.id)),
            Transaction::expense(account, date(2), Money::from_shekels(500, 0), "רמי לוי", Some(food.id)),
            Transaction::expense(account, date(3), Money::from_shekels(300, 0), "פז", Some(fuel.id)),
            Transaction::expense(account, date(4), Money::from_shekels(2000, 0), "?", None),
            Transaction::expense(account, date(5), Money::from_shekels(0, 50), "ghost", Some(CategoryId::new())),
            Transaction::income(account, date(6), Money::from_shekels(9000, 0), "משכורת", Some(salary.id)),
        ];

        let rows = by_category(&txns, &[food.clone(), fuel, salary], 1);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["מזון", "דלק", UNCATEGORIZED_LABEL, "משכורת"]);

        let food_row = &rows[0];
        assert_eq!(food_row.total, Money::from_shekels(1200, 0));
        assert_eq!(food_row.transaction_count, 2);
        assert!(food_row.is_over_budget());
        assert_eq!(food_row.remaining(), Some(Money::from_shekels(-200, 0)));

        let uncategorized = &rows[2];
        assert_eq!(uncategorized.transaction_count, 2);
        assert!(uncategorized.budget.is_none());

        assert!((rows[3].share - 100.0).abs() < 1e-9);

        let quarter = by_category(&txns, &[food], 3);
        assert!(!quarter[0].is_over_budget());
    }

    #[test]
    fn test_by_account_counts_transfers_both_ways() {
        let checking = Account::new("עו\"ש", AccountKind::Bank);
        let savings = Account::new("פיקדון", AccountKind::Savings);
        let idle = Account::new("מזומן", AccountKind::Cash);

        let txns = vec![
            Transaction::income(checking.id, date(1), Money::from_shekels(5000, 0), "משכורת", None),
            Transaction::expense(checking.id, date(2), Money::from_shekels(1000, 0), "שכירות", None),
            Transaction::transfer(checking.id, savings.id, date(3), Money::from_shekels(2000, 0), "חיסכון"),
        ];

        let flows = by_account(&txns, &[checking, savings, idle]);
        assert_eq!(flows[0].inflow, Money::from_shekels(5000, 0));
        assert_eq!(flows[0].outflow, Money::from_shekels(3000, 0));
        assert_eq!(flows[0].net(), Money::from_shekels(2000, 0));
        assert_eq!(flows[1].inflow, Money::from_shekels(2000, 0));
        assert_eq!(flows[1].transaction_count, 1);
        assert_eq!(flows[2].transaction_count, 0);
    }
}
