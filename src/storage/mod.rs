//! Storage layer for Kesef
//!
//! All state sits in a [`KeyValueStore`]; each entity type is a [`Table`]
//! serialized as one JSON array. [`Storage`] ties the tables together with
//! the settings document, the optional field cipher and the audit log.

pub mod file_io;
pub mod init;
pub mod kv;
pub mod table;

pub use file_io::{read_string, write_atomic};
pub use init::initialize_storage;
pub use kv::{FileStore, KeyValueStore, MemoryStore, KEY_PREFIX};
pub use table::{Record, Table};

use std::sync::Arc;

use crate::audit::{AuditEntry, AuditLogger, EntityType, Operation};
use crate::config::{KesefPaths, Settings};
use crate::crypto::{FieldCipher, ObfuscationKey};
use crate::error::{KesefError, KesefResult};
use crate::models::{Account, Budget, Category, Transaction};

/// Main storage coordinator that provides access to all tables
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
    cipher: Option<FieldCipher>,
    audit: Option<AuditLogger>,
    pub transactions: Table<Transaction>,
    pub categories: Table<Category>,
    pub budgets: Table<Budget>,
    pub accounts: Table<Account>,
}

impl Storage {
    /// Wrap an existing store without a cipher or audit log
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            transactions: Table::new(store.clone(), None),
            categories: Table::new(store.clone(), None),
            budgets: Table::new(store.clone(), None),
            accounts: Table::new(store.clone(), None),
            store,
            cipher: None,
            audit: None,
        }
    }

    /// Open the file-backed store under `paths`, with the audit log enabled
    pub fn open(paths: &KesefPaths) -> KesefResult<Self> {
        paths.ensure_directories()?;
        let store = FileStore::open(paths.store_dir())?;
        tracing::debug!(dir = %paths.store_dir().display(), "opened store");
        Ok(Self::new(Arc::new(store)).with_audit_log(AuditLogger::new(paths.audit_log())))
    }

    /// Fresh in-memory storage
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_audit_log(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn audit_logger(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    pub fn cipher(&self) -> Option<&FieldCipher> {
        self.cipher.as_ref()
    }

    /// Install (or remove) the field cipher used by every table
    pub fn set_cipher(&mut self, cipher: Option<FieldCipher>) {
        self.transactions = Table::new(self.store.clone(), cipher.clone());
        self.categories = Table::new(self.store.clone(), cipher.clone());
        self.budgets = Table::new(self.store.clone(), cipher.clone());
        self.accounts = Table::new(self.store.clone(), cipher.clone());
        self.cipher = cipher;
    }

    pub fn settings(&self) -> KesefResult<Settings> {
        Settings::load(self.store.as_ref())
    }

    /// Persist settings, auditing what changed
    pub fn save_settings(&self, settings: &Settings) -> KesefResult<()> {
        let before = self.settings()?;
        settings.save(self.store.as_ref())?;
        self.write_audit(AuditEntry::update(
            Operation::Update,
            EntityType::Settings,
            "settings",
            None,
            &before,
            settings,
        ))
    }

    /// Whether `kesef init` has been run against this store
    pub fn is_initialized(&self) -> KesefResult<bool> {
        Ok(self.settings()?.setup_completed)
    }

    /// Install the cipher for a store whose data is already sealed
    ///
    /// Fails when the key does not match the stored verification token.
    pub fn unlock(&mut self, key: ObfuscationKey) -> KesefResult<()> {
        let settings = self.settings()?;
        if !settings.is_encryption_enabled() {
            return Ok(());
        }
        let cipher = FieldCipher::new(key);
        let token = settings.encryption.verification_token.as_deref().unwrap_or("");
        if !cipher.verify(token) {
            return Err(KesefError::Encryption("Wrong key".into()));
        }
        self.set_cipher(Some(cipher));
        Ok(())
    }

    /// Seal every sensitive field with `key` and record it in settings
    pub fn enable_encryption(&mut self, key: ObfuscationKey) -> KesefResult<()> {
        let mut settings = self.settings()?;
        if settings.is_encryption_enabled() {
            return Err(KesefError::Encryption("Encryption is already enabled".into()));
        }
        let cipher = FieldCipher::new(key);
        settings.encryption.enabled = true;
        settings.encryption.verification_token = Some(cipher.verification_token());

        self.rewrite_tables(Some(cipher))?;
        self.save_settings(&settings)?;
        tracing::info!("field obfuscation enabled");
        Ok(())
    }

    /// Write every sealed field back as plaintext; the store must be unlocked
    pub fn disable_encryption(&mut self) -> KesefResult<()> {
        let mut settings = self.settings()?;
        if !settings.is_encryption_enabled() {
            return Err(KesefError::Encryption("Encryption is not enabled".into()));
        }
        if self.cipher.is_none() {
            return Err(KesefError::Encryption("Store is locked; supply the key first".into()));
        }
        settings.encryption.enabled = false;
        settings.encryption.verification_token = None;

        self.rewrite_tables(None)?;
        self.save_settings(&settings)?;
        tracing::info!("field obfuscation disabled");
        Ok(())
    }

    /// Read every table with the current cipher and write it back with `cipher`
    fn rewrite_tables(&mut self, cipher: Option<FieldCipher>) -> KesefResult<()> {
        let transactions = self.transactions.all()?;
        let categories = self.categories.all()?;
        let budgets = self.budgets.all()?;
        let accounts = self.accounts.all()?;

        self.set_cipher(cipher);

        self.transactions.replace_all(transactions)?;
        self.categories.replace_all(categories)?;
        self.budgets.replace_all(budgets)?;
        self.accounts.replace_all(accounts)?;
        Ok(())
    }

    /// Stored (sealed) form of a record, used for audit snapshots
    fn snapshot<R: Record>(&self, record: &R) -> R {
        let mut stored = record.clone();
        if let Some(cipher) = &self.cipher {
            stored.seal(cipher);
        }
        stored
    }

    fn write_audit(&self, entry: AuditEntry) -> KesefResult<()> {
        match &self.audit {
            Some(logger) => logger.log(&entry),
            None => Ok(()),
        }
    }

    pub fn log_create<R: Record>(&self, record: &R) -> KesefResult<()> {
        self.write_audit(AuditEntry::create(
            R::ENTITY,
            record.id().to_string(),
            Some(record.label()),
            &self.snapshot(record),
        ))
    }

    pub fn log_update<R: Record>(&self, before: &R, after: &R) -> KesefResult<()> {
        self.write_audit(AuditEntry::update(
            Operation::Update,
            R::ENTITY,
            after.id().to_string(),
            Some(after.label()),
            &self.snapshot(before),
            &self.snapshot(after),
        ))
    }

    pub fn log_delete<R: Record>(&self, record: &R) -> KesefResult<()> {
        self.write_audit(AuditEntry::delete(
            R::ENTITY,
            record.id().to_string(),
            Some(record.label()),
            &self.snapshot(record),
        ))
    }

    pub fn log_repair<R: Record>(&self, before: &R, after: &R) -> KesefResult<()> {
        self.write_audit(AuditEntry::update(
            Operation::Repair,
            R::ENTITY,
            after.id().to_string(),
            Some(after.label()),
            &self.snapshot(before),
            &self.snapshot(after),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountKind, CategoryKind, Money};
    use tempfile::TempDir;

    #[test]
    fn test_storage_open() {
        let temp_dir = TempDir::new().unwrap();
        let paths = KesefPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(&paths).unwrap();

        assert!(temp_dir.path().join("store").exists());
        assert!(!storage.is_initialized().unwrap());
        assert!(storage.audit_logger().is_some());
    }

    #[test]
    fn test_audit_entries_written() {
        let temp_dir = TempDir::new().unwrap();
        let paths = KesefPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(&paths).unwrap();

        let before = Category::new("רכב", CategoryKind::Expense);
        let mut after = before.clone();
        after.monthly_budget = Some(Money::from_shekels(800, 0));
        storage.log_create(&before).unwrap();
        storage.log_update(&before, &after).unwrap();
        storage.log_delete(&after).unwrap();

        let entries = storage.audit_logger().unwrap().read_all().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].entity_name.as_deref(), Some("רכב"));
        assert!(entries[1]
            .diff_summary
            .as_deref()
            .unwrap()
            .contains("monthly_budget"));
    }

    #[test]
    fn test_enable_unlock_disable_encryption() {
        let mut storage = Storage::in_memory();
        let mut account = Account::new("הפועלים", AccountKind::Bank);
        account.account_number = "987654".into();
        let id = account.id;
        storage.accounts.insert(account).unwrap();

        storage
            .enable_encryption(ObfuscationKey::new("סוד").unwrap())
            .unwrap();
        let raw = storage.store().get("kesef_accounts").unwrap().unwrap();
        assert!(!raw.contains("987654"));
        assert_eq!(storage.accounts.require(id).unwrap().account_number, "987654");

        // A second handle over the same store starts locked
        let mut other = Storage::new(storage.store().clone());
        assert!(other.unlock(ObfuscationKey::new("wrong").unwrap()).is_err());
        other.unlock(ObfuscationKey::new("סוד").unwrap()).unwrap();
        assert_eq!(other.accounts.require(id).unwrap().account_number, "987654");

        other.disable_encryption().unwrap();
        let raw = other.store().get("kesef_accounts").unwrap().unwrap();
        assert!(raw.contains("987654"));
        assert!(!other.settings().unwrap().is_encryption_enabled());
    }

    #[test]
    fn test_disable_requires_unlock() {
        let mut storage = Storage::in_memory();
        storage
            .enable_encryption(ObfuscationKey::new("k").unwrap())
            .unwrap();
        let mut locked = Storage::new(storage.store().clone());
        assert!(matches!(
            locked.disable_encryption(),
            Err(KesefError::Encryption(_))
        ));
    }
}
