//! Category service
//!
//! Category names are unique per kind, compared case- and
//! whitespace-insensitively. A category that transactions or budgets still
//! point at can only be deleted by reassigning those references first.

use crate::error::{KesefError, KesefResult};
use crate::models::{normalize_name, Category, CategoryId, CategoryKind, Money};
use crate::storage::Storage;
use crate::validation::Validate;

/// Service for category management
pub struct CategoryService<'a> {
    storage: &'a Storage,
}

/// Input for creating a category
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    pub name: String,
    pub kind: CategoryKind,
    pub monthly_budget: Option<Money>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl CreateCategoryInput {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            monthly_budget: None,
            color: None,
            icon: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    /// `Some(None)` removes the monthly budget
    pub monthly_budget: Option<Option<Money>>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub archived: Option<bool>,
}

/// Records that still reference a category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryUsage {
    pub transactions: usize,
    pub budgets: usize,
}

impl CategoryUsage {
    pub fn is_unused(&self) -> bool {
        self.transactions == 0 && self.budgets == 0
    }
}

impl<'a> CategoryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new category
    pub fn create(&self, input: CreateCategoryInput) -> KesefResult<Category> {
        let mut category = Category::new(input.name.trim(), input.kind);
        category.monthly_budget = input.monthly_budget;
        if let Some(color) = input.color {
            category.color = color.trim().to_uppercase();
        }
        if let Some(icon) = input.icon {
            category.icon = icon;
        }

        category.validate()?;
        self.ensure_unique(&category)?;

        self.storage.categories.insert(category.clone())?;
        self.storage.log_create(&category)?;

        tracing::info!(name = %category.name, kind = ?category.kind, "category created");
        Ok(category)
    }

    pub fn get(&self, id: CategoryId) -> KesefResult<Option<Category>> {
        self.storage.categories.get(id)
    }

    /// Find a category by name, full id or short id
    pub fn find(&self, identifier: &str) -> KesefResult<Option<Category>> {
        let key = normalize_name(identifier);
        if let Some(category) = self.storage.categories.find_one(|c| c.name_key() == key)? {
            return Ok(Some(category));
        }
        if let Ok(id) = identifier.parse::<CategoryId>() {
            return self.storage.categories.get(id);
        }
        self.storage
            .categories
            .find_one(|c| c.id.matches_short(identifier))
    }

    pub fn require(&self, identifier: &str) -> KesefResult<Category> {
        self.find(identifier)?
            .ok_or_else(|| KesefError::category_not_found(identifier))
    }

    /// Categories ordered by kind then name, optionally filtered by kind
    pub fn list(&self, kind: Option<CategoryKind>, include_archived: bool) -> KesefResult<Vec<Category>> {
        let mut categories = self.storage.categories.find(|c| {
            kind.map_or(true, |k| c.kind == k) && (include_archived || !c.archived)
        })?;
        categories.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    pub fn update(&self, id: CategoryId, input: UpdateCategoryInput) -> KesefResult<Category> {
        let before = self.storage.categories.require(id)?;
        let mut category = before.clone();

        if let Some(name) = input.name {
            category.name = name.trim().to_string();
        }
        if let Some(monthly_budget) = input.monthly_budget {
            category.monthly_budget = monthly_budget;
        }
        if let Some(color) = input.color {
            category.color = color.trim().to_uppercase();
        }
        if let Some(icon) = input.icon {
            category.icon = icon;
        }
        if let Some(archived) = input.archived {
            category.archived = archived;
        }
        category.touch();

        category.validate()?;
        self.ensure_unique(&category)?;

        self.storage.categories.update(category.clone())?;
        self.storage.log_update(&before, &category)?;
        Ok(category)
    }

    /// Count the transactions and budgets referencing a category
    pub fn usage(&self, id: CategoryId) -> KesefResult<CategoryUsage> {
        Ok(CategoryUsage {
            transactions: self
                .storage
                .transactions
                .find(|t| t.category_id == Some(id))?
                .len(),
            budgets: self
                .storage
                .budgets
                .find(|b| b.allocation_for(id).is_some())?
                .len(),
        })
    }

    /// Delete a category
    ///
    /// While referenced, the category is only deleted when `reassign_to`
    /// names another category of the same kind. Transactions move to it and
    /// budget allocations are added to its allocation.
    pub fn delete(&self, id: CategoryId, reassign_to: Option<CategoryId>) -> KesefResult<CategoryUsage> {
        let category = self.storage.categories.require(id)?;
        let usage = self.usage(id)?;

        if !usage.is_unused() {
            let Some(target_id) = reassign_to else {
                return Err(KesefError::InUse {
                    entity_type: "Category",
                    reason: format!(
                        "'{}' משמשת ב-{} תנועות וב-{} תקציבים",
                        category.name, usage.transactions, usage.budgets
                    ),
                });
            };
            self.reassign(&category, target_id)?;
        }

        self.storage.categories.delete(id)?;
        self.storage.log_delete(&category)?;

        tracing::info!(name = %category.name, moved = usage.transactions, "category deleted");
        Ok(usage)
    }

    fn reassign(&self, from: &Category, target_id: CategoryId) -> KesefResult<()> {
        if target_id == from.id {
            return Err(KesefError::invalid("reassign_to", "לא ניתן להעביר קטגוריה לעצמה"));
        }
        let target = self.storage.categories.require(target_id)?;
        if target.kind != from.kind {
            return Err(KesefError::invalid(
                "reassign_to",
                format!("הקטגוריה '{}' היא מסוג {}", target.name, target.kind),
            ));
        }

        for before in self.storage.transactions.find(|t| t.category_id == Some(from.id))? {
            let mut txn = before.clone();
            txn.category_id = Some(target.id);
            txn.touch();
            self.storage.transactions.update(txn.clone())?;
            self.storage.log_update(&before, &txn)?;
        }

        for before in self.storage.budgets.find(|b| b.allocation_for(from.id).is_some())? {
            let mut budget = before.clone();
            let moved = budget.allocation_for(from.id).unwrap_or_default();
            let existing = budget.allocation_for(target.id).unwrap_or_default();
            budget.allocations.retain(|a| a.category_id != from.id);
            budget.allocate(target.id, existing + moved);
            self.storage.budgets.update(budget.clone())?;
            self.storage.log_update(&before, &budget)?;
        }

        Ok(())
    }

    fn ensure_unique(&self, category: &Category) -> KesefResult<()> {
        let key = category.name_key();
        let clash = self.storage.categories.find_one(|c| {
            c.id != category.id && c.kind == category.kind && c.name_key() == key
        })?;
        match clash {
            Some(_) => Err(KesefError::Duplicate {
                entity_type: "Category",
                identifier: category.name.clone(),
            }),
            None => Ok(()),
        }
    }
}
