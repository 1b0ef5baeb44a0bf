//! JSON full export and restore
//!
//! The export holds every table plus the settings document, with sensitive
//! fields in plaintext. Restoring replaces all data in the target store.

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{KesefError, KesefResult};
use crate::migration::CURRENT_SCHEMA_VERSION;
use crate::models::{Account, Budget, Category, Transaction};
use crate::storage::Storage;

/// Full database export structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullExport {
    /// Data schema version the export was written with
    pub schema_version: u32,

    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    pub settings: Settings,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub budgets: Vec<Budget>,
    pub transactions: Vec<Transaction>,

    pub metadata: ExportMetadata,
}

/// Export metadata for reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub account_count: usize,
    pub category_count: usize,
    pub budget_count: usize,
    pub transaction_count: usize,

    /// Earliest transaction date (DD/MM/YYYY)
    pub earliest_transaction: Option<String>,

    /// Latest transaction date (DD/MM/YYYY)
    pub latest_transaction: Option<String>,
}

impl FullExport {
    /// Snapshot everything in storage
    pub fn from_storage(storage: &Storage) -> KesefResult<Self> {
        let accounts = storage.accounts.all()?;
        let categories = storage.categories.all()?;
        let budgets = storage.budgets.all()?;
        let transactions = storage.transactions.all()?;

        let format = |d: chrono::NaiveDate| d.format("%d/%m/%Y").to_string();
        let metadata = ExportMetadata {
            account_count: accounts.len(),
            category_count: categories.len(),
            budget_count: budgets.len(),
            transaction_count: transactions.len(),
            earliest_transaction: transactions.iter().map(|t| t.date).min().map(format),
            latest_transaction: transactions.iter().map(|t| t.date).max().map(format),
        };

        Ok(Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            settings: storage.settings()?,
            accounts,
            categories,
            budgets,
            transactions,
            metadata,
        })
    }

    /// Check version and references before restoring
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != CURRENT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                CURRENT_SCHEMA_VERSION, self.schema_version
            ));
        }

        let account_ids: HashSet<_> = self.accounts.iter().map(|a| a.id).collect();
        let category_ids: HashSet<_> = self.categories.iter().map(|c| c.id).collect();

        for txn in &self.transactions {
            if !account_ids.contains(&txn.account_id) {
                return Err(format!(
                    "Transaction {} references unknown account {}",
                    txn.id, txn.account_id
                ));
            }
            if let Some(target) = txn.to_account_id {
                if !account_ids.contains(&target) {
                    return Err(format!(
                        "Transaction {} references unknown account {}",
                        txn.id, target
                    ));
                }
            }
            if let Some(cat_id) = txn.category_id {
                if !category_ids.contains(&cat_id) {
                    return Err(format!(
                        "Transaction {} references unknown category {}",
                        txn.id, cat_id
                    ));
                }
            }
        }

        for budget in &self.budgets {
            for alloc in &budget.allocations {
                if !category_ids.contains(&alloc.category_id) {
                    return Err(format!(
                        "Budget {} allocates to unknown category {}",
                        budget.id, alloc.category_id
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Export the full database to JSON
pub fn export_full_json<W: Write>(storage: &Storage, writer: &mut W, pretty: bool) -> KesefResult<()> {
    let export = FullExport::from_storage(storage)?;

    if pretty {
        serde_json::to_writer_pretty(writer, &export)
    } else {
        serde_json::to_writer(writer, &export)
    }
    .map_err(|e| KesefError::Export(e.to_string()))?;

    Ok(())
}

/// Parse and validate a JSON export
pub fn import_from_json(json_str: &str) -> KesefResult<FullExport> {
    let export: FullExport =
        serde_json::from_str(json_str).map_err(|e| KesefError::Import(e.to_string()))?;

    export.validate().map_err(KesefError::Import)?;

    Ok(export)
}

/// Replace all data in `storage` with the contents of an export
///
/// The store keeps its own encryption settings; restored records are sealed
/// with whatever cipher `storage` currently has.
pub fn restore(storage: &Storage, export: FullExport) -> KesefResult<()> {
    export.validate().map_err(KesefError::Import)?;

    let current = storage.settings()?;
    let mut settings = export.settings;
    settings.encryption = current.encryption;
    settings.schema_version = CURRENT_SCHEMA_VERSION;
    settings.setup_completed = true;

    storage.accounts.replace_all(export.accounts)?;
    storage.categories.replace_all(export.categories)?;
    storage.budgets.replace_all(export.budgets)?;
    storage.transactions.replace_all(export.transactions)?;
    storage.save_settings(&settings)?;

    tracing::info!(
        transactions = export.metadata.transaction_count,
        exported_at = %export.exported_at,
        "restored full export"
    );
    Ok(())
}
