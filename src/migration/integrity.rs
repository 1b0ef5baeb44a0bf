//! Referential and consistency checks over the stored data
//!
//! [`check_integrity`] only reads. [`repair`] fixes what it can, audits each
//! change as a repair, and returns what is left.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;

use crate::error::KesefResult;
use crate::models::{
    normalize_name, Account, AccountId, AccountKind, BudgetId, CategoryId, CategoryKind, Money,
    Transaction, TransactionId, TransactionKind,
};
use crate::storage::Storage;

/// Name of the account that collects transactions whose account vanished
pub const RECOVERY_ACCOUNT_NAME: &str = "חשבון שחזור";

/// A single problem found by the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    MissingCategory {
        transaction_id: TransactionId,
        category_id: CategoryId,
    },
    MissingAccount {
        transaction_id: TransactionId,
        account_id: AccountId,
    },
    MissingTransferTarget {
        transaction_id: TransactionId,
        account_id: AccountId,
    },
    OrphanedAllocation {
        budget_id: BudgetId,
        category_id: CategoryId,
    },
    DuplicateCategoryName {
        name: String,
        kind: CategoryKind,
        ids: Vec<CategoryId>,
    },
    DuplicateAccountName {
        name: String,
        ids: Vec<AccountId>,
    },
    ExpiredActiveBudget {
        budget_id: BudgetId,
        end_date: NaiveDate,
    },
    ReversedBudgetDates {
        budget_id: BudgetId,
    },
    BalanceMismatch {
        account_id: AccountId,
        stored: Money,
        expected: Money,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCategory {
                transaction_id,
                category_id,
            } => write!(
                f,
                "תנועה {} מפנה לקטגוריה שאינה קיימת ({})",
                transaction_id.short(),
                category_id.short()
            ),
            Self::MissingAccount {
                transaction_id,
                account_id,
            } => write!(
                f,
                "תנועה {} מפנה לחשבון שאינו קיים ({})",
                transaction_id.short(),
                account_id.short()
            ),
            Self::MissingTransferTarget {
                transaction_id,
                account_id,
            } => write!(
                f,
                "העברה {} לחשבון יעד שאינו קיים ({})",
                transaction_id.short(),
                account_id.short()
            ),
            Self::OrphanedAllocation {
                budget_id,
                category_id,
            } => write!(
                f,
                "תקציב {} כולל הקצאה לקטגוריה שאינה קיימת ({})",
                budget_id.short(),
                category_id.short()
            ),
            Self::DuplicateCategoryName { name, kind, ids } => {
                write!(f, "{} קטגוריות {} בשם \"{}\"", ids.len(), kind, name)
            }
            Self::DuplicateAccountName { name, ids } => {
                write!(f, "{} חשבונות בשם \"{}\"", ids.len(), name)
            }
            Self::ExpiredActiveBudget {
                budget_id,
                end_date,
            } => write!(
                f,
                "תקציב {} הסתיים ב-{} אך עדיין פעיל",
                budget_id.short(),
                end_date.format("%d/%m/%Y")
            ),
            Self::ReversedBudgetDates { budget_id } => {
                write!(f, "בתקציב {} תאריך ההתחלה אחרי תאריך הסיום", budget_id.short())
            }
            Self::BalanceMismatch {
                account_id,
                stored,
                expected,
            } => write!(
                f,
                "יתרת חשבון {} היא {} אך לפי התנועות צריכה להיות {}",
                account_id.short(),
                stored,
                expected
            ),
        }
    }
}

/// Result of a read-only scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// What a repair pass changed, and what it could not fix
#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    /// One line per change, in Hebrew
    pub actions: Vec<String>,
    pub remaining: IntegrityReport,
}

impl RepairReport {
    pub fn changed(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// Scan all tables for broken references and inconsistent values
pub fn check_integrity(storage: &Storage, today: NaiveDate) -> KesefResult<IntegrityReport> {
    let transactions = storage.transactions.all()?;
    let categories = storage.categories.all()?;
    let budgets = storage.budgets.all()?;
    let accounts = storage.accounts.all()?;

    let category_ids: HashSet<CategoryId> = categories.iter().map(|c| c.id).collect();
    let account_ids: HashSet<AccountId> = accounts.iter().map(|a| a.id).collect();

    let mut issues = Vec::new();

    for txn in &transactions {
        if let Some(category_id) = txn.category_id {
            if !category_ids.contains(&category_id) {
                issues.push(IntegrityIssue::MissingCategory {
                    transaction_id: txn.id,
                    category_id,
                });
            }
        }
        if !account_ids.contains(&txn.account_id) {
            issues.push(IntegrityIssue::MissingAccount {
                transaction_id: txn.id,
                account_id: txn.account_id,
            });
        }
        if let Some(target) = txn.to_account_id {
            if !account_ids.contains(&target) {
                issues.push(IntegrityIssue::MissingTransferTarget {
                    transaction_id: txn.id,
                    account_id: target,
                });
            }
        }
    }

    for budget in &budgets {
        for allocation in &budget.allocations {
            if !category_ids.contains(&allocation.category_id) {
                issues.push(IntegrityIssue::OrphanedAllocation {
                    budget_id: budget.id,
                    category_id: allocation.category_id,
                });
            }
        }
        if budget.start_date > budget.end_date {
            issues.push(IntegrityIssue::ReversedBudgetDates {
                budget_id: budget.id,
            });
        }
        if budget.is_active && budget.is_expired(today) {
            issues.push(IntegrityIssue::ExpiredActiveBudget {
                budget_id: budget.id,
                end_date: budget.end_date,
            });
        }
    }

    let mut by_category_name: BTreeMap<(CategoryKind, String), Vec<CategoryId>> = BTreeMap::new();
    for category in &categories {
        by_category_name
            .entry((category.kind, category.name_key()))
            .or_default()
            .push(category.id);
    }
    for ((kind, _), ids) in by_category_name {
        if ids.len() > 1 {
            let name = categories
                .iter()
                .find(|c| c.id == ids[0])
                .map(|c| c.name.clone())
                .unwrap_or_default();
            issues.push(IntegrityIssue::DuplicateCategoryName { name, kind, ids });
        }
    }

    let mut by_account_name: BTreeMap<String, Vec<AccountId>> = BTreeMap::new();
    for account in &accounts {
        by_account_name
            .entry(normalize_name(&account.name))
            .or_default()
            .push(account.id);
    }
    for (_, ids) in by_account_name {
        if ids.len() > 1 {
            let name = accounts
                .iter()
                .find(|a| a.id == ids[0])
                .map(|a| a.name.clone())
                .unwrap_or_default();
            issues.push(IntegrityIssue::DuplicateAccountName { name, ids });
        }
    }

    for account in &accounts {
        let expected = expected_balance(account, &transactions);
        if expected != account.balance {
            issues.push(IntegrityIssue::BalanceMismatch {
                account_id: account.id,
                stored: account.balance,
                expected,
            });
        }
    }

    tracing::debug!(issues = issues.len(), "integrity scan finished");
    Ok(IntegrityReport { issues })
}

/// Opening balance plus the effect of every transaction touching the account
pub fn expected_balance(account: &Account, transactions: &[Transaction]) -> Money {
    account.opening_balance
        + transactions
            .iter()
            .map(|t| t.effect_on(account.id))
            .sum::<Money>()
}

/// Fix every issue that has a mechanical remedy
pub fn repair(storage: &Storage, today: NaiveDate) -> KesefResult<RepairReport> {
    let mut actions = Vec::new();

    repair_categories(storage, &mut actions)?;
    repair_accounts(storage, &mut actions)?;
    repair_budgets(storage, today, &mut actions)?;
    repair_transactions(storage, &mut actions)?;
    repair_balances(storage, &mut actions)?;

    for action in &actions {
        tracing::info!(action = %action, "repaired");
    }

    Ok(RepairReport {
        actions,
        remaining: check_integrity(storage, today)?,
    })
}

/// First of `base (2)`, `base (3)`... not already taken
fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut n = 2;
    loop {
        let candidate = format!("{} ({})", base, n);
        if taken.insert(normalize_name(&candidate)) {
            return candidate;
        }
        n += 1;
    }
}

fn repair_categories(storage: &Storage, actions: &mut Vec<String>) -> KesefResult<()> {
    let categories = storage.categories.all()?;
    let mut taken: HashSet<(CategoryKind, String)> = HashSet::new();
    let mut names_by_kind: BTreeMap<CategoryKind, HashSet<String>> = BTreeMap::new();
    for category in &categories {
        names_by_kind
            .entry(category.kind)
            .or_default()
            .insert(category.name_key());
    }

    let mut changed = Vec::new();
    let mut repaired = Vec::with_capacity(categories.len());
    for category in categories {
        if taken.insert((category.kind, category.name_key())) {
            repaired.push(category);
            continue;
        }
        let before = category.clone();
        let mut after = category;
        let names = names_by_kind.entry(after.kind).or_default();
        after.name = unique_name(&before.name, names);
        after.touch();
        actions.push(format!("קטגוריה \"{}\" שונתה ל-\"{}\"", before.name, after.name));
        changed.push((before, after.clone()));
        repaired.push(after);
    }

    if !changed.is_empty() {
        storage.categories.replace_all(repaired)?;
        for (before, after) in &changed {
            storage.log_repair(before, after)?;
        }
    }
    Ok(())
}

fn repair_accounts(storage: &Storage, actions: &mut Vec<String>) -> KesefResult<()> {
    let accounts = storage.accounts.all()?;
    let mut names: HashSet<String> = accounts.iter().map(|a| normalize_name(&a.name)).collect();
    let mut seen: HashSet<String> = HashSet::new();

    let mut changed = Vec::new();
    let mut repaired = Vec::with_capacity(accounts.len());
    for account in accounts {
        if seen.insert(normalize_name(&account.name)) {
            repaired.push(account);
            continue;
        }
        let before = account.clone();
        let mut after = account;
        after.name = unique_name(&before.name, &mut names);
        after.touch();
        actions.push(format!("חשבון \"{}\" שונה ל-\"{}\"", before.name, after.name));
        changed.push((before, after.clone()));
        repaired.push(after);
    }

    if !changed.is_empty() {
        storage.accounts.replace_all(repaired)?;
        for (before, after) in &changed {
            storage.log_repair(before, after)?;
        }
    }
    Ok(())
}

fn repair_budgets(storage: &Storage, today: NaiveDate, actions: &mut Vec<String>) -> KesefResult<()> {
    let category_ids: HashSet<CategoryId> = storage.categories.all()?.iter().map(|c| c.id).collect();

    for budget in storage.budgets.all()? {
        let before = budget.clone();
        let mut after = budget;

        let allocations = after.allocations.len();
        after
            .allocations
            .retain(|a| category_ids.contains(&a.category_id));
        let dropped = allocations - after.allocations.len();
        if dropped > 0 {
            actions.push(format!(
                "הוסרו {} הקצאות יתומות מתקציב \"{}\"",
                dropped, after.name
            ));
        }

        if after.start_date > after.end_date {
            std::mem::swap(&mut after.start_date, &mut after.end_date);
            actions.push(format!("תאריכי התקציב \"{}\" הוחלפו", after.name));
        }

        if after.is_active && after.is_expired(today) {
            after.is_active = false;
            actions.push(format!("תקציב \"{}\" שהסתיים סומן כלא פעיל", after.name));
        }

        if after != before {
            after.touch();
            storage.budgets.update(after.clone())?;
            storage.log_repair(&before, &after)?;
        }
    }
    Ok(())
}

fn repair_transactions(storage: &Storage, actions: &mut Vec<String>) -> KesefResult<()> {
    let category_ids: HashSet<CategoryId> = storage.categories.all()?.iter().map(|c| c.id).collect();
    let mut account_ids: HashSet<AccountId> = storage.accounts.all()?.iter().map(|a| a.id).collect();
    let mut recovery: Option<AccountId> = None;

    let transactions = storage.transactions.all()?;
    let mut changed = Vec::new();
    let mut repaired = Vec::with_capacity(transactions.len());

    for txn in transactions {
        let before = txn.clone();
        let mut after = txn;

        if let Some(category_id) = after.category_id {
            if !category_ids.contains(&category_id) {
                after.category_id = None;
                actions.push(format!("תנועה {} סומנה כללא קטגוריה", after.id.short()));
            }
        }

        if !account_ids.contains(&after.account_id) {
            let target = match recovery {
                Some(id) => id,
                None => {
                    let id = recovery_account(storage)?;
                    account_ids.insert(id);
                    recovery = Some(id);
                    id
                }
            };
            after.account_id = target;
            actions.push(format!(
                "תנועה {} הועברה ל\"{}\"",
                after.id.short(),
                RECOVERY_ACCOUNT_NAME
            ));
        }

        // A transfer into the recovery account whose source was reassigned there
        if after.is_transfer() && after.to_account_id == Some(after.account_id) {
            after.to_account_id = None;
            after.kind = TransactionKind::Income;
            actions.push(format!(
                "העברה {} ממקור חסר הומרה להכנסה",
                after.id.short()
            ));
        }

        if let Some(target) = after.to_account_id {
            if !account_ids.contains(&target) {
                after.to_account_id = None;
                after.kind = TransactionKind::Expense;
                actions.push(format!(
                    "העברה {} ללא חשבון יעד הומרה להוצאה",
                    after.id.short()
                ));
            }
        }

        if after != before {
            after.touch();
            changed.push((before, after.clone()));
        }
        repaired.push(after);
    }

    if !changed.is_empty() {
        storage.transactions.replace_all(repaired)?;
        for (before, after) in &changed {
            storage.log_repair(before, after)?;
        }
    }
    Ok(())
}

/// Existing recovery account, or a new one
fn recovery_account(storage: &Storage) -> KesefResult<AccountId> {
    if let Some(existing) = storage
        .accounts
        .find_one(|a| a.name == RECOVERY_ACCOUNT_NAME)?
    {
        return Ok(existing.id);
    }
    let account = Account::new(RECOVERY_ACCOUNT_NAME, AccountKind::Cash);
    storage.accounts.insert(account.clone())?;
    storage.log_create(&account)?;
    tracing::warn!(id = %account.id, "created recovery account");
    Ok(account.id)
}

fn repair_balances(storage: &Storage, actions: &mut Vec<String>) -> KesefResult<()> {
    let transactions = storage.transactions.all()?;
    for account in storage.accounts.all()? {
        let expected = expected_balance(&account, &transactions);
        if expected == account.balance {
            continue;
        }
        let before = account.clone();
        let mut after = account;
        after.balance = expected;
        after.touch();
        storage.accounts.update(after.clone())?;
        storage.log_repair(&before, &after)?;
        actions.push(format!(
            "יתרת \"{}\" חושבה מחדש: {} -> {}",
            after.name, before.balance, after.balance
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Budget, Category};
    use crate::validation::Validate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 6, 15)
    }

    fn seeded() -> (Storage, Account, Category) {
        let storage = Storage::in_memory();
        let account = Account::with_opening_balance("עו\"ש", AccountKind::Bank, Money::from_shekels(1000, 0));
        let category = Category::new("מזון", CategoryKind::Expense);
        storage.accounts.insert(account.clone()).unwrap();
        storage.categories.insert(category.clone()).unwrap();
        (storage, account, category)
    }

    #[test]
    fn test_clean_store() {
        let (storage, account, category) = seeded();
        let txn = Transaction::expense(account.id, today(), Money::from_shekels(50, 0), "שופרסל", Some(category.id));
        storage.transactions.insert(txn).unwrap();
        let mut account = account;
        account.balance = Money::from_shekels(950, 0);
        storage.accounts.update(account).unwrap();

        let report = check_integrity(&storage, today()).unwrap();
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_detects_dangling_references() {
        let (storage, account, _) = seeded();
        let ghost_category = CategoryId::new();
        let ghost_account = AccountId::new();

        let txn = Transaction::expense(account.id, today(), Money::from_agorot(100), "x", Some(ghost_category));
        let orphan = Transaction::income(ghost_account, today(), Money::from_agorot(100), "y", None);
        let transfer = Transaction::transfer(account.id, ghost_account, today(), Money::from_agorot(100), "z");
        for t in [txn, orphan, transfer] {
            storage.transactions.insert(t).unwrap();
        }

        let issues = check_integrity(&storage, today()).unwrap().issues;
        assert!(issues.iter().any(|i| matches!(i, IntegrityIssue::MissingCategory { category_id, .. } if *category_id == ghost_category)));
        assert!(issues.iter().any(|i| matches!(i, IntegrityIssue::MissingAccount { .. })));
        assert!(issues.iter().any(|i| matches!(i, IntegrityIssue::MissingTransferTarget { .. })));
        assert!(issues.iter().any(|i| matches!(i, IntegrityIssue::BalanceMismatch { .. })));
    }

    #[test]
    fn test_detects_budget_and_name_problems() {
        let (storage, _, category) = seeded();
        storage
            .categories
            .insert(Category::new("  מזון ", CategoryKind::Expense))
            .unwrap();
        // Same name, different kind: not a duplicate
        storage
            .categories
            .insert(Category::new("מזון", CategoryKind::Income))
            .unwrap();

        let mut expired = Budget::new("מאי", date(2025, 5, 1), date(2025, 5, 31));
        expired.allocate(category.id, Money::from_shekels(100, 0));
        expired.allocate(CategoryId::new(), Money::from_shekels(100, 0));
        storage.budgets.insert(expired).unwrap();
        storage
            .budgets
            .insert(Budget::new("הפוך", date(2025, 7, 31), date(2025, 7, 1)))
            .unwrap();

        let issues = check_integrity(&storage, today()).unwrap().issues;
        let duplicates: Vec<_> = issues
            .iter()
            .filter(|i| matches!(i, IntegrityIssue::DuplicateCategoryName { .. }))
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert!(issues.iter().any(|i| matches!(i, IntegrityIssue::OrphanedAllocation { .. })));
        assert!(issues.iter().any(|i| matches!(i, IntegrityIssue::ExpiredActiveBudget { .. })));
        assert!(issues.iter().any(|i| matches!(i, IntegrityIssue::ReversedBudgetDates { .. })));
    }

    #[test]
    fn test_repair_fixes_everything() {
        let (storage, account, _) = seeded();
        let ghost_account = AccountId::new();

        storage
            .categories
            .insert(Category::new("מזון", CategoryKind::Expense))
            .unwrap();
        storage
            .accounts
            .insert(Account::new("עו\"ש", AccountKind::Cash))
            .unwrap();
        storage
            .transactions
            .insert(Transaction::expense(account.id, today(), Money::from_shekels(20, 0), "a", Some(CategoryId::new())))
            .unwrap();
        storage
            .transactions
            .insert(Transaction::income(ghost_account, today(), Money::from_shekels(30, 0), "b", None))
            .unwrap();
        storage
            .transactions
            .insert(Transaction::transfer(account.id, ghost_account, today(), Money::from_shekels(5, 0), "c"))
            .unwrap();
        storage
            .budgets
            .insert(Budget::new("ישן", date(2024, 1, 1), date(2024, 1, 31)))
            .unwrap();

        let report = repair(&storage, today()).unwrap();
        assert!(report.changed());
        assert!(report.remaining.is_clean(), "{:?}", report.remaining.issues);

        let names: Vec<_> = storage.categories.all().unwrap().into_iter().map(|c| c.name).collect();
        assert!(names.contains(&"מזון (2)".to_string()));

        let recovery = storage
            .accounts
            .find_one(|a| a.name == RECOVERY_ACCOUNT_NAME)
            .unwrap()
            .unwrap();
        assert_eq!(recovery.balance, Money::from_shekels(30, 0));

        let txns = storage.transactions.all().unwrap();
        assert!(txns.iter().all(|t| t.category_id.is_none()));
        assert_eq!(txns.iter().filter(|t| t.is_transfer()).count(), 0);

        let main = storage.accounts.require(account.id).unwrap();
        assert_eq!(main.balance, Money::from_shekels(975, 0));
        assert!(!storage.budgets.all().unwrap()[0].is_active);

        // Second pass has nothing left to do
        assert!(!repair(&storage, today()).unwrap().changed());
    }

    #[test]
    fn test_repair_transfer_into_recovery_account() {
        let (storage, _, _) = seeded();
        let recovery = Account::new(RECOVERY_ACCOUNT_NAME, AccountKind::Cash);
        storage.accounts.insert(recovery.clone()).unwrap();
        storage
            .transactions
            .insert(Transaction::transfer(AccountId::new(), recovery.id, today(), Money::from_shekels(40, 0), "d"))
            .unwrap();

        let report = repair(&storage, today()).unwrap();
        assert!(report.remaining.is_clean(), "{:?}", report.remaining.issues);

        let txn = &storage.transactions.all().unwrap()[0];
        assert!(txn.is_income());
        assert_eq!(txn.account_id, recovery.id);
        assert_eq!(txn.to_account_id, None);
        assert!(txn.validate().is_ok());
        assert_eq!(
            storage.accounts.require(recovery.id).unwrap().balance,
            Money::from_shekels(40, 0)
        );
    }
}
