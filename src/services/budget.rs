//! Budget service
//!
//! Budgets are spending plans over a date range. Only expense categories can
//! receive allocations. Closing a budget keeps it for history but drops it
//! from the active list.

use chrono::NaiveDate;

use crate::analytics::{budget_progress, BudgetProgress};
use crate::error::{KesefError, KesefResult};
use crate::models::{normalize_name, Budget, BudgetId, CategoryId, CategoryKind, Money, YearMonth};
use crate::storage::Storage;
use crate::validation::Validate;

/// Service for budget management
pub struct BudgetService<'a> {
    storage: &'a Storage,
}

#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocations: Vec<(CategoryId, Money)>,
    pub notes: String,
}

impl<'a> BudgetService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a budget with its initial allocations
    pub fn create(&self, input: CreateBudgetInput) -> KesefResult<Budget> {
        let mut budget = Budget::new(input.name.trim(), input.start_date, input.end_date);
        budget.notes = input.notes;
        for (category_id, amount) in input.allocations {
            self.check_category(category_id)?;
            budget.allocate(category_id, amount);
        }

        budget.validate()?;

        self.storage.budgets.insert(budget.clone())?;
        self.storage.log_create(&budget)?;

        tracing::info!(name = %budget.name, lines = budget.allocations.len(), "budget created");
        Ok(budget)
    }

    /// Budget for a calendar month seeded from each category's monthly figure
    pub fn create_monthly(&self, month: YearMonth) -> KesefResult<Budget> {
        let allocations = self
            .storage
            .categories
            .find(|c| c.kind == CategoryKind::Expense && !c.archived)?
            .into_iter()
            .filter_map(|c| c.monthly_budget.map(|amount| (c.id, amount)))
            .collect();

        self.create(CreateBudgetInput {
            name: format!("{} {}", month.hebrew_month_name(), month.year),
            start_date: month.first_day(),
            end_date: month.last_day(),
            allocations,
            notes: String::new(),
        })
    }

    pub fn get(&self, id: BudgetId) -> KesefResult<Option<Budget>> {
        self.storage.budgets.get(id)
    }

    /// Find a budget by name, full id or short id
    pub fn find(&self, identifier: &str) -> KesefResult<Option<Budget>> {
        let key = normalize_name(identifier);
        if let Some(budget) = self
            .storage
            .budgets
            .find_one(|b| normalize_name(&b.name) == key)?
        {
            return Ok(Some(budget));
        }
        if let Ok(id) = identifier.parse::<BudgetId>() {
            return self.storage.budgets.get(id);
        }
        self.storage.budgets.find_one(|b| b.id.matches_short(identifier))
    }

    pub fn require(&self, identifier: &str) -> KesefResult<Budget> {
        self.find(identifier)?
            .ok_or_else(|| KesefError::budget_not_found(identifier))
    }

    /// All budgets, newest period first
    pub fn list(&self) -> KesefResult<Vec<Budget>> {
        let mut budgets = self.storage.budgets.all()?;
        budgets.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(budgets)
    }

    /// Open budgets whose period has not ended by `today`
    pub fn list_active(&self, today: NaiveDate) -> KesefResult<Vec<Budget>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|b| b.is_active && !b.is_expired(today))
            .collect())
    }

    /// Set the allocation for one category; zero removes the line
    pub fn allocate(&self, id: BudgetId, category_id: CategoryId, amount: Money) -> KesefResult<Budget> {
        let before = self.storage.budgets.require(id)?;
        self.check_category(category_id)?;

        let mut budget = before.clone();
        if amount.is_zero() {
            budget.allocations.retain(|a| a.category_id != category_id);
            budget.touch();
        } else {
            budget.allocate(category_id, amount);
        }
        budget.validate()?;

        self.storage.budgets.update(budget.clone())?;
        self.storage.log_update(&before, &budget)?;
        Ok(budget)
    }

    /// Mark a budget as no longer active
    pub fn close(&self, id: BudgetId) -> KesefResult<Budget> {
        let before = self.storage.budgets.require(id)?;
        if !before.is_active {
            return Err(KesefError::invalid("is_active", format!("התקציב '{}' כבר סגור", before.name)));
        }
        let mut budget = before.clone();
        budget.is_active = false;
        budget.touch();

        self.storage.budgets.update(budget.clone())?;
        self.storage.log_update(&before, &budget)?;

        tracing::info!(name = %budget.name, "budget closed");
        Ok(budget)
    }

    /// Spent against allocated for each line of a budget
    pub fn status(&self, id: BudgetId) -> KesefResult<BudgetProgress> {
        let budget = self.storage.budgets.require(id)?;
        let transactions = self
            .storage
            .transactions
            .find(|t| budget.contains(t.date))?;
        let categories = self.storage.categories.all()?;
        Ok(budget_progress(&budget, &transactions, &categories))
    }

    pub fn delete(&self, id: BudgetId) -> KesefResult<Budget> {
        let budget = self.storage.budgets.require(id)?;
        self.storage.budgets.delete(id)?;
        self.storage.log_delete(&budget)?;
        Ok(budget)
    }

    fn check_category(&self, category_id: CategoryId) -> KesefResult<()> {
        let category = self
            .storage
            .categories
            .get(category_id)?
            .ok_or_else(|| KesefError::category_not_found(category_id.short()))?;
        if category.kind != CategoryKind::Expense {
            return Err(KesefError::invalid(
                "allocations",
                format!("ניתן להקצות תקציב רק לקטגוריות הוצאה ('{}')", category.name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, Category, Transaction};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn input(name: &str, allocations: Vec<(CategoryId, Money)>) -> CreateBudgetInput {
        CreateBudgetInput {
            name: name.into(),
            start_date: date(6, 1),
            end_date: date(6, 30),
            allocations,
            notes: String::new(),
        }
    }

    #[test]
    fn test_create_and_status() {
        let storage = Storage::in_memory();
        let food = Category::new("מזון", CategoryKind::Expense);
        let food_id = food.id;
        storage.categories.insert(food).unwrap();
        storage
            .transactions
            .insert(Transaction::expense(AccountId::new(), date(6, 10), Money::from_shekels(700, 0), "סופר", Some(food_id)))
            .unwrap();

        let service = BudgetService::new(&storage);
        let budget = service
            .create(input("יוני", vec![(food_id, Money::from_shekels(1000, 0))]))
            .unwrap();

        let progress = service.status(budget.id).unwrap();
        assert_eq!(progress.total_spent(), Money::from_shekels(700, 0));
        assert_eq!(progress.total_remaining(), Money::from_shekels(300, 0));
        assert_eq!(service.require("יוני").unwrap().id, budget.id);
    }

    #[test]
    fn test_income_category_cannot_be_allocated() {
        let storage = Storage::in_memory();
        let salary = Category::new("משכורת", CategoryKind::Income);
        let salary_id = salary.id;
        storage.categories.insert(salary).unwrap();

        let err = BudgetService::new(&storage)
            .create(input("יוני", vec![(salary_id, Money::from_shekels(10, 0))]))
            .unwrap_err();
        assert!(err.validation_errors().unwrap().has("allocations"));
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let storage = Storage::in_memory();
        let mut bad = input("הפוך", Vec::new());
        std::mem::swap(&mut bad.start_date, &mut bad.end_date);
        let err = BudgetService::new(&storage).create(bad).unwrap_err();
        assert!(err.validation_errors().unwrap().has("end_date"));
    }

    #[test]
    fn test_close_and_list_active() {
        let storage = Storage::in_memory();
        let service = BudgetService::new(&storage);
        let june = service.create(input("יוני", Vec::new())).unwrap();

        assert_eq!(service.list_active(date(6, 15)).unwrap().len(), 1);
        assert!(service.list_active(date(7, 1)).unwrap().is_empty());

        service.close(june.id).unwrap();
        assert!(service.list_active(date(6, 15)).unwrap().is_empty());
        assert!(service.close(june.id).is_err());
        assert_eq!(service.list().unwrap().len(), 1);
    }

    #[test]
    fn test_create_monthly_from_category_budgets() {
        let storage = Storage::in_memory();
        let fuel = Category::with_budget("דלק", CategoryKind::Expense, Money::from_shekels(400, 0));
        let fuel_id = fuel.id;
        storage.categories.insert(fuel).unwrap();
        storage
            .categories
            .insert(Category::new("שונות", CategoryKind::Expense))
            .unwrap();

        let service = BudgetService::new(&storage);
        let budget = service
            .create_monthly(YearMonth::new(2025, 7).unwrap())
            .unwrap();
        assert_eq!(budget.start_date, date(7, 1));
        assert_eq!(budget.end_date, date(7, 31));
        assert_eq!(budget.allocations.len(), 1);
        assert_eq!(budget.allocation_for(fuel_id), Some(Money::from_shekels(400, 0)));

        let updated = service.allocate(budget.id, fuel_id, Money::zero()).unwrap();
        assert!(updated.allocations.is_empty());
    }
}
