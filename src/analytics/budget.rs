//! Budget progress: planned against actual spending

use serde::Serialize;

use crate::models::{Budget, BudgetId, Category, CategoryId, Money, Transaction};

/// One allocation line of a budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetLine {
    pub category_id: CategoryId,
    pub category_name: String,
    pub allocated: Money,
    pub spent: Money,
}

impl BudgetLine {
    pub fn remaining(&self) -> Money {
        self.allocated - self.spent
    }

    /// Spent as a percentage of allocated; 0 with no allocation
    pub fn percent_used(&self) -> f64 {
        self.spent.percent_of(self.allocated)
    }

    pub fn is_over_budget(&self) -> bool {
        self.spent > self.allocated
    }
}

/// Progress of a whole budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetProgress {
    pub budget_id: BudgetId,
    pub name: String,
    pub lines: Vec<BudgetLine>,
}

impl BudgetProgress {
    pub fn total_allocated(&self) -> Money {
        self.lines.iter().map(|l| l.allocated).sum()
    }

    pub fn total_spent(&self) -> Money {
        self.lines.iter().map(|l| l.spent).sum()
    }

    pub fn total_remaining(&self) -> Money {
        self.total_allocated() - self.total_spent()
    }

    pub fn percent_used(&self) -> f64 {
        self.total_spent().percent_of(self.total_allocated())
    }

    pub fn over_budget_lines(&self) -> impl Iterator<Item = &BudgetLine> {
        self.lines.iter().filter(|l| l.is_over_budget())
    }
}

/// Spending against each allocation within the budget's dates
///
/// Only expenses count. Income filed under an allocated category does not
/// reduce the amount spent.
pub fn budget_progress(
    budget: &Budget,
    transactions: &[Transaction],
    categories: &[Category],
) -> BudgetProgress {
    let lines = budget
        .allocations
        .iter()
        .map(|allocation| {
            let spent = transactions
                .iter()
                .filter(|t| {
                    t.is_expense()
                        && t.category_id == Some(allocation.category_id)
                        && budget.contains(t.date)
                })
                .map(|t| t.amount)
                .sum();
            let category_name = categories
                .iter()
                .find(|c| c.id == allocation.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| allocation.category_id.short());
            BudgetLine {
                category_id: allocation.category_id,
                category_name,
                allocated: allocation.amount,
                spent,
            }
        })
        .collect();

    BudgetProgress {
        budget_id: budget.id,
        name: budget.name.clone(),
        lines,
    }
}
