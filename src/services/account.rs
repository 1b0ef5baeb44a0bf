//! Account service
//!
//! Provides business logic for account management: creation with Israeli
//! bank details, updates, deactivation and guarded deletion.

use crate::error::{KesefError, KesefResult};
use crate::models::{normalize_name, Account, AccountId, AccountKind, Money};
use crate::storage::Storage;
use crate::validation::{normalize_phone, Validate};

/// Service for account management
pub struct AccountService<'a> {
    storage: &'a Storage,
}

/// Input for creating an account
#[derive(Debug, Clone, Default)]
pub struct CreateAccountInput {
    pub name: String,
    pub kind: AccountKind,
    pub opening_balance: Money,
    pub bank_name: String,
    pub branch_number: String,
    pub account_number: String,
    pub owner_id: String,
    pub owner_phone: String,
}

impl CreateAccountInput {
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }
}

/// Changes to an account; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    pub name: Option<String>,
    pub kind: Option<AccountKind>,
    /// Changing the opening balance shifts the current balance by the same amount
    pub opening_balance: Option<Money>,
    pub bank_name: Option<String>,
    pub branch_number: Option<String>,
    pub account_number: Option<String>,
    pub owner_id: Option<String>,
    pub owner_phone: Option<String>,
}

impl<'a> AccountService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new account
    pub fn create(&self, input: CreateAccountInput) -> KesefResult<Account> {
        let mut account =
            Account::with_opening_balance(input.name.trim(), input.kind, input.opening_balance);
        account.bank_name = input.bank_name.trim().to_string();
        account.branch_number = input.branch_number.trim().to_string();
        account.account_number = input.account_number.trim().to_string();
        account.owner_id = input.owner_id.trim().to_string();
        account.owner_phone = phone_or_empty(&input.owner_phone);

        account.validate()?;
        self.ensure_unique(&account)?;

        self.storage.accounts.insert(account.clone())?;
        self.storage.log_create(&account)?;

        tracing::info!(name = %account.name, kind = ?account.kind, "account created");
        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> KesefResult<Option<Account>> {
        self.storage.accounts.get(id)
    }

    /// Find an account by name, full id or short id
    pub fn find(&self, identifier: &str) -> KesefResult<Option<Account>> {
        let key = normalize_name(identifier);
        if let Some(account) = self
            .storage
            .accounts
            .find_one(|a| normalize_name(&a.name) == key)?
        {
            return Ok(Some(account));
        }
        if let Ok(id) = identifier.parse::<AccountId>() {
            return self.storage.accounts.get(id);
        }
        self.storage
            .accounts
            .find_one(|a| a.id.matches_short(identifier))
    }

    pub fn require(&self, identifier: &str) -> KesefResult<Account> {
        self.find(identifier)?
            .ok_or_else(|| KesefError::account_not_found(identifier))
    }

    /// The account named in settings, falling back to the only active account
    pub fn default_account(&self) -> KesefResult<Option<Account>> {
        if let Some(id) = self.storage.settings()?.default_account_id {
            if let Some(account) = self.storage.accounts.get(id)? {
                return Ok(Some(account));
            }
        }
        let active = self.list(false)?;
        Ok(if active.len() == 1 {
            active.into_iter().next()
        } else {
            None
        })
    }

    /// Accounts sorted by name
    pub fn list(&self, include_inactive: bool) -> KesefResult<Vec<Account>> {
        let mut accounts = self
            .storage
            .accounts
            .find(|a| include_inactive || a.is_active)?;
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    /// Sum of active account balances
    pub fn total_balance(&self) -> KesefResult<Money> {
        Ok(self.list(false)?.iter().map(|a| a.balance).sum())
    }

    pub fn update(&self, id: AccountId, input: UpdateAccountInput) -> KesefResult<Account> {
        let before = self.storage.accounts.require(id)?;
        let mut account = before.clone();

        if let Some(name) = input.name {
            account.name = name.trim().to_string();
        }
        if let Some(kind) = input.kind {
            account.kind = kind;
        }
        if let Some(opening) = input.opening_balance {
            let delta = opening - account.opening_balance;
            account.opening_balance = opening;
            account.adjust_balance(delta);
        }
        if let Some(bank_name) = input.bank_name {
            account.bank_name = bank_name.trim().to_string();
        }
        if let Some(branch) = input.branch_number {
            account.branch_number = branch.trim().to_string();
        }
        if let Some(number) = input.account_number {
            account.account_number = number.trim().to_string();
        }
        if let Some(owner_id) = input.owner_id {
            account.owner_id = owner_id.trim().to_string();
        }
        if let Some(phone) = input.owner_phone {
            account.owner_phone = phone_or_empty(&phone);
        }
        account.touch();

        account.validate()?;
        self.ensure_unique(&account)?;

        self.storage.accounts.update(account.clone())?;
        self.storage.log_update(&before, &account)?;
        Ok(account)
    }

    /// Hide an account from lists and block new transactions on it
    pub fn deactivate(&self, id: AccountId) -> KesefResult<Account> {
        self.set_active(id, false)
    }

    pub fn reactivate(&self, id: AccountId) -> KesefResult<Account> {
        self.set_active(id, true)
    }

    fn set_active(&self, id: AccountId, active: bool) -> KesefResult<Account> {
        let before = self.storage.accounts.require(id)?;
        if before.is_active == active {
            return Ok(before);
        }
        let mut account = before.clone();
        account.is_active = active;
        account.touch();

        self.storage.accounts.update(account.clone())?;
        self.storage.log_update(&before, &account)?;
        Ok(account)
    }

    /// Delete an account that no transaction references
    ///
    /// Accounts with history must be deactivated instead.
    pub fn delete(&self, id: AccountId) -> KesefResult<Account> {
        let account = self.storage.accounts.require(id)?;

        let referenced = self
            .storage
            .transactions
            .find(|t| t.involves_account(id))?
            .len();
        if referenced > 0 {
            return Err(KesefError::InUse {
                entity_type: "Account",
                reason: format!(
                    "'{}' מופיע ב-{} תנועות; ניתן להשבית אותו במקום למחוק",
                    account.name, referenced
                ),
            });
        }

        self.storage.accounts.delete(id)?;
        self.storage.log_delete(&account)?;

        let mut settings = self.storage.settings()?;
        if settings.default_account_id == Some(id) {
            settings.default_account_id = None;
            self.storage.save_settings(&settings)?;
        }

        tracing::info!(name = %account.name, "account deleted");
        Ok(account)
    }

    fn ensure_unique(&self, account: &Account) -> KesefResult<()> {
        let key = normalize_name(&account.name);
        let clash = self
            .storage
            .accounts
            .find_one(|a| a.id != account.id && normalize_name(&a.name) == key)?;
        match clash {
            Some(_) => Err(KesefError::Duplicate {
                entity_type: "Account",
                identifier: account.name.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn phone_or_empty(phone: &str) -> String {
    if phone.trim().is_empty() {
        String::new()
    } else {
        normalize_phone(phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;
    use chrono::NaiveDate;

    #[test]
    fn test_create_account_with_bank_details() {
        let storage = Storage::in_memory();
        let service = AccountService::new(&storage);

        let mut input = CreateAccountInput::new("לאומי", AccountKind::Bank);
        input.opening_balance = Money::from_shekels(2500, 0);
        input.bank_name = "בנק לאומי".into();
        input.branch_number = "802".into();
        input.account_number = "12345678".into();
        input.owner_phone = "+972-52-123-4567".into();
        let account = service.create(input).unwrap();

        assert_eq!(account.balance, Money::from_shekels(2500, 0));
        assert_eq!(account.owner_phone, "0521234567");
        assert_eq!(service.require("לאומי").unwrap().id, account.id);
        assert_eq!(service.total_balance().unwrap(), Money::from_shekels(2500, 0));
    }

    #[test]
    fn test_create_rejects_bad_id_and_duplicates() {
        let storage = Storage::in_memory();
        let service = AccountService::new(&storage);

        let mut input = CreateAccountInput::new("חיסכון", AccountKind::Savings);
        input.owner_id = "123456789".into();
        let err = service.create(input).unwrap_err();
        assert!(err.validation_errors().unwrap().has("owner_id"));

        service
            .create(CreateAccountInput::new("חיסכון", AccountKind::Savings))
            .unwrap();
        let err = service
            .create(CreateAccountInput::new("חיסכון ", AccountKind::Savings))
            .unwrap_err();
        assert!(matches!(err, KesefError::Duplicate { .. }));
    }

    #[test]
    fn test_update_opening_balance_shifts_balance() {
        let storage = Storage::in_memory();
        let service = AccountService::new(&storage);
        let mut input = CreateAccountInput::new("עו\"ש", AccountKind::Bank);
        input.opening_balance = Money::from_shekels(100, 0);
        let account = service.create(input).unwrap();

        let mut stored = storage.accounts.require(account.id).unwrap();
        stored.adjust_balance(Money::from_shekels(-40, 0));
        storage.accounts.update(stored).unwrap();

        let updated = service
            .update(
                account.id,
                UpdateAccountInput {
                    opening_balance: Some(Money::from_shekels(150, 0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.balance, Money::from_shekels(110, 0));
    }

    #[test]
    fn test_delete_referenced_account_is_refused() {
        let storage = Storage::in_memory();
        let service = AccountService::new(&storage);
        let account = service
            .create(CreateAccountInput::new("ויזה", AccountKind::Credit))
            .unwrap();
        storage
            .transactions
            .insert(Transaction::expense(
                account.id,
                NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                Money::from_shekels(30, 0),
                "קפה",
                None,
            ))
            .unwrap();

        let err = service.delete(account.id).unwrap_err();
        assert!(matches!(err, KesefError::InUse { .. }));

        let deactivated = service.deactivate(account.id).unwrap();
        assert!(!deactivated.is_active);
        assert!(service.list(false).unwrap().is_empty());
        assert_eq!(service.list(true).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_clears_default_account() {
        let storage = Storage::in_memory();
        let service = AccountService::new(&storage);
        let account = service
            .create(CreateAccountInput::new("מזומן", AccountKind::Cash))
            .unwrap();
        let mut settings = storage.settings().unwrap();
        settings.default_account_id = Some(account.id);
        storage.save_settings(&settings).unwrap();

        assert_eq!(service.default_account().unwrap().unwrap().id, account.id);
        service.delete(account.id).unwrap();
        assert!(storage.settings().unwrap().default_account_id.is_none());
        assert!(service.default_account().unwrap().is_none());
    }
}
