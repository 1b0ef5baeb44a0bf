//! Generic table over the key-value store
//!
//! Each entity type lives under one key as a JSON array. Every read goes to
//! the store and every mutation writes the whole array back; the data sets
//! are small enough that this stays cheap and there is no cache to go stale.

use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::audit::EntityType;
use crate::crypto::FieldCipher;
use crate::error::{KesefError, KesefResult};
use crate::models::{
    Account, AccountId, Budget, BudgetId, Category, CategoryId, Transaction, TransactionId,
};

use super::kv::{KeyValueStore, KEY_PREFIX};

/// An entity stored in its own table
pub trait Record: Serialize + DeserializeOwned + Clone {
    type Id: Copy + Eq + Display;

    /// Table name; the store key is `kesef_<TABLE>`
    const TABLE: &'static str;
    const ENTITY: EntityType;

    fn id(&self) -> Self::Id;

    /// Short human-readable label for logs and messages
    fn label(&self) -> String;

    /// Obfuscate sensitive fields before writing
    fn seal(&mut self, _cipher: &FieldCipher) {}

    /// Restore sensitive fields after reading
    fn unseal(&mut self, _cipher: &FieldCipher) -> KesefResult<()> {
        Ok(())
    }

    /// Full store key for this table
    fn store_key() -> String {
        format!("{}{}", KEY_PREFIX, Self::TABLE)
    }
}

impl Record for Transaction {
    type Id = TransactionId;
    const TABLE: &'static str = "transactions";
    const ENTITY: EntityType = EntityType::Transaction;

    fn id(&self) -> TransactionId {
        self.id
    }

    fn label(&self) -> String {
        format!("{} {}", self.date.format("%d/%m/%Y"), self.description)
    }

    fn seal(&mut self, cipher: &FieldCipher) {
        self.notes = cipher.seal(&self.notes);
    }

    fn unseal(&mut self, cipher: &FieldCipher) -> KesefResult<()> {
        self.notes = cipher.unseal(&self.notes)?;
        Ok(())
    }
}

impl Record for Category {
    type Id = CategoryId;
    const TABLE: &'static str = "categories";
    const ENTITY: EntityType = EntityType::Category;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Record for Budget {
    type Id = BudgetId;
    const TABLE: &'static str = "budgets";
    const ENTITY: EntityType = EntityType::Budget;

    fn id(&self) -> BudgetId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Record for Account {
    type Id = AccountId;
    const TABLE: &'static str = "accounts";
    const ENTITY: EntityType = EntityType::Account;

    fn id(&self) -> AccountId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn seal(&mut self, cipher: &FieldCipher) {
        self.account_number = cipher.seal(&self.account_number);
        self.owner_id = cipher.seal(&self.owner_id);
    }

    fn unseal(&mut self, cipher: &FieldCipher) -> KesefResult<()> {
        self.account_number = cipher.unseal(&self.account_number)?;
        self.owner_id = cipher.unseal(&self.owner_id)?;
        Ok(())
    }
}

/// CRUD access to one entity table
pub struct Table<R: Record> {
    store: Arc<dyn KeyValueStore>,
    cipher: Option<FieldCipher>,
    _record: PhantomData<R>,
}

impl<R: Record> Table<R> {
    pub fn new(store: Arc<dyn KeyValueStore>, cipher: Option<FieldCipher>) -> Self {
        Self {
            store,
            cipher,
            _record: PhantomData,
        }
    }

    /// Every record, in stored order
    pub fn all(&self) -> KesefResult<Vec<R>> {
        let Some(raw) = self.store.get(&R::store_key())? else {
            return Ok(Vec::new());
        };

        let mut records: Vec<R> = serde_json::from_str(&raw).map_err(|e| {
            KesefError::Storage(format!("Failed to parse table {}: {}", R::TABLE, e))
        })?;

        if let Some(cipher) = &self.cipher {
            for record in &mut records {
                record.unseal(cipher)?;
            }
        }

        Ok(records)
    }

    pub fn get(&self, id: R::Id) -> KesefResult<Option<R>> {
        Ok(self.all()?.into_iter().find(|r| r.id() == id))
    }

    /// Like [`Self::get`] but missing records are an error
    pub fn require(&self, id: R::Id) -> KesefResult<R> {
        self.get(id)?.ok_or_else(|| KesefError::NotFound {
            entity_type: R::ENTITY.as_str(),
            identifier: id.to_string(),
        })
    }

    pub fn find<F>(&self, predicate: F) -> KesefResult<Vec<R>>
    where
        F: Fn(&R) -> bool,
    {
        Ok(self.all()?.into_iter().filter(|r| predicate(r)).collect())
    }

    pub fn find_one<F>(&self, predicate: F) -> KesefResult<Option<R>>
    where
        F: Fn(&R) -> bool,
    {
        Ok(self.all()?.into_iter().find(|r| predicate(r)))
    }

    pub fn exists(&self, id: R::Id) -> KesefResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    pub fn count(&self) -> KesefResult<usize> {
        Ok(self.all()?.len())
    }

    /// Append a new record; an existing id is a `Duplicate` error
    pub fn insert(&self, record: R) -> KesefResult<()> {
        let mut records = self.all()?;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(KesefError::Duplicate {
                entity_type: R::ENTITY.as_str(),
                identifier: record.id().to_string(),
            });
        }
        tracing::debug!(table = R::TABLE, id = %record.id(), "insert");
        records.push(record);
        self.write(records)
    }

    /// Replace an existing record in place; a missing id is a `NotFound` error
    pub fn update(&self, record: R) -> KesefResult<()> {
        let mut records = self.all()?;
        let slot = records
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| KesefError::NotFound {
                entity_type: R::ENTITY.as_str(),
                identifier: record.id().to_string(),
            })?;
        tracing::debug!(table = R::TABLE, id = %record.id(), "update");
        *slot = record;
        self.write(records)
    }

    /// Remove a record, returning whether it existed
    pub fn delete(&self, id: R::Id) -> KesefResult<bool> {
        let mut records = self.all()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        tracing::debug!(table = R::TABLE, id = %id, "delete");
        self.write(records)?;
        Ok(true)
    }

    /// Overwrite the whole table
    pub fn replace_all(&self, records: Vec<R>) -> KesefResult<()> {
        self.write(records)
    }

    /// Stored form of a record (sealed when a cipher is configured)
    pub fn stored_form(&self, record: &R) -> R {
        let mut stored = record.clone();
        if let Some(cipher) = &self.cipher {
            stored.seal(cipher);
        }
        stored
    }

    fn write(&self, records: Vec<R>) -> KesefResult<()> {
        let records: Vec<R> = match &self.cipher {
            Some(_) => records.iter().map(|r| self.stored_form(r)).collect(),
            None => records,
        };
        let json = serde_json::to_string(&records)?;
        self.store.set(&R::store_key(), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ObfuscationKey;
    use crate::models::{AccountKind, CategoryKind, Money};
    use crate::storage::kv::MemoryStore;

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_empty_table() {
        let table: Table<Category> = Table::new(store(), None);
        assert_eq!(table.count().unwrap(), 0);
        assert!(table.all().unwrap().is_empty());
    }

    #[test]
    fn test_insert_get_update_delete() {
        let table: Table<Category> = Table::new(store(), None);
        let mut cat = Category::new("מזון", CategoryKind::Expense);
        let id = cat.id;

        table.insert(cat.clone()).unwrap();
        assert_eq!(table.get(id).unwrap().unwrap().name, "מזון");

        cat.name = "מזון וסופרמרקט".into();
        table.update(cat.clone()).unwrap();
        assert_eq!(table.require(id).unwrap().name, "מזון וסופרמרקט");

        assert!(table.delete(id).unwrap());
        assert!(!table.delete(id).unwrap());
        assert!(table.require(id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let table: Table<Category> = Table::new(store(), None);
        let cat = Category::new("דלק", CategoryKind::Expense);
        table.insert(cat.clone()).unwrap();
        assert!(matches!(
            table.insert(cat),
            Err(KesefError::Duplicate { entity_type: "Category", .. })
        ));
    }

    #[test]
    fn test_update_missing_fails() {
        let table: Table<Category> = Table::new(store(), None);
        let cat = Category::new("דלק", CategoryKind::Expense);
        assert!(table.update(cat).unwrap_err().is_not_found());
    }

    #[test]
    fn test_stored_under_prefixed_key() {
        let kv = store();
        let table: Table<Account> = Table::new(kv.clone(), None);
        table.insert(Account::new("מזומן", AccountKind::Cash)).unwrap();
        let raw = kv.get("kesef_accounts").unwrap().unwrap();
        assert!(raw.starts_with('['));
        assert!(raw.contains("מזומן"));
    }

    #[test]
    fn test_sensitive_fields_sealed_at_rest() {
        let kv = store();
        let cipher = FieldCipher::new(ObfuscationKey::new("key").unwrap());
        let table: Table<Account> = Table::new(kv.clone(), Some(cipher));

        let mut account = Account::with_opening_balance("לאומי", AccountKind::Bank, Money::from_agorot(100));
        account.account_number = "12345678".into();
        account.owner_id = "123456782".into();
        let id = account.id;
        table.insert(account).unwrap();

        let raw = kv.get("kesef_accounts").unwrap().unwrap();
        assert!(!raw.contains("12345678"));
        assert!(raw.contains("enc:v1:"));

        let loaded = table.require(id).unwrap();
        assert_eq!(loaded.account_number, "12345678");
        assert_eq!(loaded.owner_id, "123456782");

        let plain: Table<Account> = Table::new(kv, None);
        assert!(plain.require(id).unwrap().account_number.starts_with("enc:v1:"));
    }

    #[test]
    fn test_corrupt_table_is_storage_error() {
        let kv = store();
        kv.set("kesef_budgets", "not json").unwrap();
        let table: Table<Budget> = Table::new(kv, None);
        assert!(matches!(table.all(), Err(KesefError::Storage(_))));
    }
}
