//! Transaction service
//!
//! Create, update and delete transactions while keeping the stored balance of
//! every affected account in step. A transaction's effect is reversed before
//! an edit and re-applied after it, so the balance always equals the opening
//! balance plus the effect of every stored transaction.

use chrono::{Local, NaiveDate};

use crate::error::{KesefError, KesefResult};
use crate::models::{AccountId, CategoryId, Money, Transaction, TransactionId, TransactionKind};
use crate::search::TransactionFilter;
use crate::storage::Storage;

/// Service for transaction management
pub struct TransactionService<'a> {
    storage: &'a Storage,
}

/// Input for creating a new transaction
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub kind: TransactionKind,
    pub account_id: AccountId,
    /// Target account, transfers only
    pub to_account_id: Option<AccountId>,
    pub date: NaiveDate,
    /// Positive amount; direction comes from `kind`
    pub amount: Money,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub reference: Option<String>,
    pub import_id: Option<String>,
}

impl CreateTransactionInput {
    pub fn new(
        kind: TransactionKind,
        account_id: AccountId,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            account_id,
            to_account_id: None,
            date,
            amount,
            description: description.into(),
            category_id: None,
            tags: Vec::new(),
            notes: None,
            reference: None,
            import_id: None,
        }
    }
}

/// Changes to apply to an existing transaction; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    pub date: Option<NaiveDate>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    /// `Some(None)` clears the category
    pub category_id: Option<Option<CategoryId>>,
    pub account_id: Option<AccountId>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl<'a> TransactionService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new transaction and apply it to account balances
    pub fn create(&self, input: CreateTransactionInput) -> KesefResult<Transaction> {
        let mut txn = Transaction::new(
            input.account_id,
            input.date,
            input.amount,
            input.kind,
            input.description.trim(),
        );
        txn.to_account_id = input.to_account_id;
        txn.category_id = input.category_id;
        txn.set_tags(&input.tags);
        if let Some(notes) = input.notes {
            txn.notes = notes;
        }
        txn.reference = input.reference;
        txn.import_id = input.import_id;

        self.check(&txn)?;

        self.storage.transactions.insert(txn.clone())?;
        self.apply_effect(&txn, false)?;
        self.storage.log_create(&txn)?;

        tracing::info!(id = %txn.id.short(), kind = ?txn.kind, amount = %txn.amount, "transaction created");
        Ok(txn)
    }

    pub fn get(&self, id: TransactionId) -> KesefResult<Option<Transaction>> {
        self.storage.transactions.get(id)
    }

    /// Find a transaction by full id or short id prefix
    pub fn find(&self, identifier: &str) -> KesefResult<Option<Transaction>> {
        if let Ok(id) = identifier.parse::<TransactionId>() {
            return self.storage.transactions.get(id);
        }
        let matches = self
            .storage
            .transactions
            .find(|t| t.id.matches_short(identifier))?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.into_iter().next()),
            n => Err(KesefError::invalid(
                "id",
                format!("המזהה '{}' תואם {} תנועות", identifier, n),
            )),
        }
    }

    /// Find by identifier or fail with a not-found error
    pub fn require(&self, identifier: &str) -> KesefResult<Transaction> {
        self.find(identifier)?
            .ok_or_else(|| KesefError::transaction_not_found(identifier))
    }

    /// Filter, sort and page the stored transactions
    pub fn list(&self, filter: &TransactionFilter) -> KesefResult<Vec<Transaction>> {
        let all = self.storage.transactions.all()?;
        Ok(filter.apply(&all))
    }

    /// Number of transactions matching the filter, ignoring paging
    pub fn count(&self, filter: &TransactionFilter) -> KesefResult<usize> {
        let all = self.storage.transactions.all()?;
        Ok(filter.count(&all))
    }

    /// Update a transaction and move its balance effect accordingly
    pub fn update(
        &self,
        id: TransactionId,
        input: UpdateTransactionInput,
    ) -> KesefResult<Transaction> {
        let before = self.storage.transactions.require(id)?;
        let mut txn = before.clone();

        if let Some(date) = input.date {
            txn.date = date;
        }
        if let Some(amount) = input.amount {
            txn.amount = amount;
        }
        if let Some(description) = input.description {
            txn.description = description.trim().to_string();
        }
        if let Some(category_id) = input.category_id {
            txn.category_id = category_id;
        }
        if let Some(account_id) = input.account_id {
            txn.account_id = account_id;
        }
        if let Some(tags) = input.tags {
            txn.set_tags(&tags);
        }
        if let Some(notes) = input.notes {
            txn.notes = notes;
        }
        txn.touch();

        self.check(&txn)?;

        self.storage.transactions.update(txn.clone())?;
        self.apply_effect(&before, true)?;
        self.apply_effect(&txn, false)?;
        self.storage.log_update(&before, &txn)?;

        tracing::info!(id = %txn.id.short(), "transaction updated");
        Ok(txn)
    }

    /// Delete a transaction and reverse its balance effect
    pub fn delete(&self, id: TransactionId) -> KesefResult<Transaction> {
        let txn = self.storage.transactions.require(id)?;

        self.storage.transactions.delete(id)?;
        self.apply_effect(&txn, true)?;
        self.storage.log_delete(&txn)?;

        tracing::info!(id = %txn.id.short(), "transaction deleted");
        Ok(txn)
    }

    /// Field validation plus the references a record alone cannot check
    fn check(&self, txn: &Transaction) -> KesefResult<()> {
        txn.validate_at(Local::now().date_naive())?;

        let account = self
            .storage
            .accounts
            .get(txn.account_id)?
            .ok_or_else(|| KesefError::account_not_found(txn.account_id.short()))?;
        if !account.is_active {
            return Err(KesefError::invalid(
                "account_id",
                format!("החשבון '{}' אינו פעיל", account.name),
            ));
        }

        if let Some(target) = txn.to_account_id {
            let target = self
                .storage
                .accounts
                .get(target)?
                .ok_or_else(|| KesefError::account_not_found(target.short()))?;
            if !target.is_active {
                return Err(KesefError::invalid(
                    "to_account_id",
                    format!("החשבון '{}' אינו פעיל", target.name),
                ));
            }
        }

        if let Some(cat_id) = txn.category_id {
            let category = self
                .storage
                .categories
                .get(cat_id)?
                .ok_or_else(|| KesefError::category_not_found(cat_id.short()))?;
            if !category.kind.accepts(txn.kind) {
                return Err(KesefError::invalid(
                    "category_id",
                    format!(
                        "הקטגוריה '{}' היא מסוג {} ואינה מתאימה ל{}",
                        category.name, category.kind, txn.kind
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Add (or with `reverse`, remove) the transaction's effect on balances
    fn apply_effect(&self, txn: &Transaction, reverse: bool) -> KesefResult<()> {
        let mut touched = vec![txn.account_id];
        if let Some(target) = txn.to_account_id {
            if target != txn.account_id {
                touched.push(target);
            }
        }

        for account_id in touched {
            let Some(mut account) = self.storage.accounts.get(account_id)? else {
                tracing::warn!(account = %account_id.short(), "balance update skipped for missing account");
                continue;
            };
            let effect = txn.effect_on(account_id);
            account.adjust_balance(if reverse { -effect } else { effect });
            self.storage.accounts.update(account)?;
        }
        Ok(())
    }
}
