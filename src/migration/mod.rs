//! Schema migrations and data integrity
//!
//! Migrations operate on the raw JSON of each table so they can read shapes
//! the current models no longer accept. Each step upgrades the data by one
//! version; the stored version is bumped only after every pending step has
//! succeeded, and the tables are restored from a snapshot if one fails.

pub mod integrity;

pub use integrity::{check_integrity, repair, IntegrityIssue, IntegrityReport, RepairReport};

use serde_json::{Map, Value};

use crate::error::{KesefError, KesefResult};
use crate::models::{Account, Budget, Category, Transaction};
use crate::storage::{KeyValueStore, Record, KEY_PREFIX};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 4;

/// Store key holding the schema version number
pub fn schema_version_key() -> String {
    format!("{}schema_version", KEY_PREFIX)
}

/// Raw tables keyed by store key
type RawTables = Vec<(String, Value)>;

/// One upgrade step, moving the data to `version`
struct Step {
    version: u32,
    description: &'static str,
    apply: fn(&mut RawTables) -> KesefResult<()>,
}

const STEPS: [Step; 4] = [
    Step {
        version: 1,
        description: "tables stored as JSON arrays",
        apply: tables_as_arrays,
    },
    Step {
        version: 2,
        description: "transaction tags and English kind names",
        apply: transaction_tags_and_kinds,
    },
    Step {
        version: 3,
        description: "account opening balance and budget active flag",
        apply: opening_balance_and_active_flag,
    },
    Step {
        version: 4,
        description: "amounts stored as integer agorot",
        apply: amounts_to_agorot,
    },
];

/// Outcome of a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: u32,
    pub to: u32,
    /// Descriptions of the steps that ran, in order
    pub applied: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

fn table_keys() -> [String; 4] {
    [
        Transaction::store_key(),
        Category::store_key(),
        Budget::store_key(),
        Account::store_key(),
    ]
}

/// Version recorded in the store
///
/// A store without a version number but with data predates versioning and
/// counts as version 0; an empty store is already current.
pub fn stored_version(store: &dyn KeyValueStore) -> KesefResult<u32> {
    if let Some(raw) = store.get(&schema_version_key())? {
        return raw
            .trim()
            .parse()
            .map_err(|_| KesefError::Migration(format!("Invalid schema version: {:?}", raw)));
    }

    for key in table_keys() {
        if store.contains(&key)? {
            return Ok(0);
        }
    }
    Ok(CURRENT_SCHEMA_VERSION)
}

/// Bring the store up to [`CURRENT_SCHEMA_VERSION`]
pub fn migrate(store: &dyn KeyValueStore) -> KesefResult<MigrationReport> {
    let from = stored_version(store)?;

    if from > CURRENT_SCHEMA_VERSION {
        return Err(KesefError::Migration(format!(
            "Data was written by a newer version (schema {}, this build supports {})",
            from, CURRENT_SCHEMA_VERSION
        )));
    }

    let mut report = MigrationReport {
        from,
        to: CURRENT_SCHEMA_VERSION,
        applied: Vec::new(),
    };

    if from == CURRENT_SCHEMA_VERSION {
        if !store.contains(&schema_version_key())? {
            store.set(&schema_version_key(), &CURRENT_SCHEMA_VERSION.to_string())?;
        }
        return Ok(report);
    }

    let snapshot = take_snapshot(store)?;
    tracing::info!(from, to = CURRENT_SCHEMA_VERSION, "migrating data");

    let outcome = run_steps(store, from, &mut report)
        .and_then(|()| store.set(&schema_version_key(), &CURRENT_SCHEMA_VERSION.to_string()));
    match outcome {
        Ok(()) => Ok(report),
        Err(e) => {
            tracing::error!(error = %e, "migration failed, restoring snapshot");
            restore_snapshot(store, &snapshot)?;
            Err(e)
        }
    }
}

fn run_steps(
    store: &dyn KeyValueStore,
    from: u32,
    report: &mut MigrationReport,
) -> KesefResult<()> {
    let mut tables = load_raw(store)?;

    for step in STEPS.iter().filter(|s| s.version > from) {
        tracing::debug!(version = step.version, step = step.description, "applying migration");
        (step.apply)(&mut tables).map_err(|e| {
            KesefError::Migration(format!("Step {} ({}) failed: {}", step.version, step.description, e))
        })?;
        save_raw(store, &tables)?;
        report.applied.push(format!("v{}: {}", step.version, step.description));
    }

    sync_settings_version(store)
}

type Snapshot = Vec<(String, Option<String>)>;

fn take_snapshot(store: &dyn KeyValueStore) -> KesefResult<Snapshot> {
    table_keys()
        .into_iter()
        .chain([crate::config::settings::settings_key()])
        .map(|key| {
            let value = store.get(&key)?;
            Ok((key, value))
        })
        .collect()
}

fn restore_snapshot(store: &dyn KeyValueStore, snapshot: &Snapshot) -> KesefResult<()> {
    for (key, value) in snapshot {
        match value {
            Some(raw) => store.set(key, raw)?,
            None => {
                store.remove(key)?;
            }
        }
    }
    Ok(())
}

fn load_raw(store: &dyn KeyValueStore) -> KesefResult<RawTables> {
    table_keys()
        .into_iter()
        .map(|key| {
            let value = match store.get(&key)? {
                Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                    KesefError::Migration(format!("Table {} is not valid JSON: {}", key, e))
                })?,
                None => Value::Null,
            };
            Ok((key, value))
        })
        .collect()
}

fn save_raw(store: &dyn KeyValueStore, tables: &RawTables) -> KesefResult<()> {
    for (key, value) in tables {
        if value.is_null() {
            continue;
        }
        store.set(key, &serde_json::to_string(value)?)?;
    }
    Ok(())
}

fn sync_settings_version(store: &dyn KeyValueStore) -> KesefResult<()> {
    let key = crate::config::settings::settings_key();
    let Some(raw) = store.get(&key)? else {
        return Ok(());
    };
    let mut settings: Value = serde_json::from_str(&raw)?;
    if let Some(obj) = settings.as_object_mut() {
        obj.insert("schema_version".into(), Value::from(CURRENT_SCHEMA_VERSION));
        store.set(&key, &serde_json::to_string_pretty(&settings)?)?;
    }
    Ok(())
}

fn table_mut<'a>(tables: &'a mut RawTables, key: &str) -> Option<&'a mut Vec<Value>> {
    tables
        .iter_mut()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.as_array_mut())
}

fn records_mut<'a>(
    tables: &'a mut RawTables,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    table_mut(tables, key)
        .into_iter()
        .flat_map(|rows| rows.iter_mut())
        .filter_map(Value::as_object_mut)
}

/// v1: objects keyed by id become arrays; missing tables become empty arrays
fn tables_as_arrays(tables: &mut RawTables) -> KesefResult<()> {
    for (key, value) in tables.iter_mut() {
        *value = match std::mem::take(value) {
            Value::Null => Value::Array(Vec::new()),
            Value::Array(rows) => Value::Array(rows),
            Value::Object(map) => Value::Array(map.into_iter().map(|(_, v)| v).collect()),
            other => {
                return Err(KesefError::Migration(format!(
                    "Table {} holds {} instead of a list",
                    key,
                    json_type(&other)
                )));
            }
        };
    }
    Ok(())
}

/// v2: default tags and English kind names on transactions
fn transaction_tags_and_kinds(tables: &mut RawTables) -> KesefResult<()> {
    for txn in records_mut(tables, &Transaction::store_key()) {
        if !matches!(txn.get("tags"), Some(Value::Array(_))) {
            txn.insert("tags".into(), Value::Array(Vec::new()));
        }

        let kind = txn.get("type").and_then(Value::as_str).map(|s| s.trim().to_string());
        let english = match kind.as_deref() {
            Some("הכנסה") => Some("income"),
            Some("הוצאה") => Some("expense"),
            Some("העברה") => Some("transfer"),
            _ => None,
        };
        if let Some(english) = english {
            txn.insert("type".into(), Value::from(english));
        }
    }
    Ok(())
}

/// v3: accounts get an opening balance, budgets an active flag
fn opening_balance_and_active_flag(tables: &mut RawTables) -> KesefResult<()> {
    for account in records_mut(tables, &Account::store_key()) {
        if !account.contains_key("opening_balance") {
            let balance = account.get("balance").cloned().unwrap_or(Value::from(0));
            account.insert("opening_balance".into(), balance);
        }
    }
    for budget in records_mut(tables, &Budget::store_key()) {
        if !budget.contains_key("is_active") {
            budget.insert("is_active".into(), Value::Bool(true));
        }
    }
    Ok(())
}

/// v4: shekel amounts become integer agorot
///
/// Before v4 every amount was in shekels, whole ones included (`50` as well
/// as `50.5`), so integers are scaled too.
fn amounts_to_agorot(tables: &mut RawTables) -> KesefResult<()> {
    for txn in records_mut(tables, &Transaction::store_key()) {
        convert_field(txn, "amount")?;
    }
    for account in records_mut(tables, &Account::store_key()) {
        convert_field(account, "balance")?;
        convert_field(account, "opening_balance")?;
    }
    for category in records_mut(tables, &Category::store_key()) {
        convert_field(category, "monthly_budget")?;
    }
    for budget in records_mut(tables, &Budget::store_key()) {
        if let Some(Value::Array(allocations)) = budget.get_mut("allocations") {
            for allocation in allocations.iter_mut().filter_map(Value::as_object_mut) {
                convert_field(allocation, "amount")?;
            }
        }
    }
    Ok(())
}

fn convert_field(record: &mut Map<String, Value>, field: &str) -> KesefResult<()> {
    let Some(value) = record.get_mut(field) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    if let Some(whole) = value.as_i64() {
        let agorot = whole.checked_mul(100).ok_or_else(|| {
            KesefError::Migration(format!("Field {} is out of range: {}", field, whole))
        })?;
        *value = Value::from(agorot);
        return Ok(());
    }
    let shekels = value.as_f64().ok_or_else(|| {
        KesefError::Migration(format!("Field {} is {}, expected a number", field, json_type(value)))
    })?;
    *value = Value::from((shekels * 100.0).round() as i64);
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Storage};
    use serde_json::json;
    use std::sync::Arc;

    fn legacy_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let txn = json!({
            "id": "6f1c1d0e-8a43-4b4f-9d55-0c1e0b9f2a11",
            "date": "2024-05-02",
            "amount": 123.45,
            "type": "הוצאה",
            "description": "רמי לוי",
            "category_id": null,
            "account_id": "0b4f6a8e-3a27-4e3a-8c61-5e0d1f7d2b90",
            "created_at": "2024-05-02T10:00:00Z",
            "updated_at": "2024-05-02T10:00:00Z"
        });
        store
            .set("kesef_transactions", &json!({ "a": txn }).to_string())
            .unwrap();
        store
            .set(
                "kesef_accounts",
                &json!([{
                    "id": "0b4f6a8e-3a27-4e3a-8c61-5e0d1f7d2b90",
                    "name": "עו\"ש",
                    "type": "bank",
                    "balance": 1000.5,
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                }])
                .to_string(),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_empty_store_is_current() {
        let store = MemoryStore::new();
        let report = migrate(&store).unwrap();
        assert!(report.is_noop());
        assert_eq!(stored_version(&store).unwrap(), CURRENT_SCHEMA_VERSION);
        assert!(store.contains("kesef_schema_version").unwrap());
    }

    #[test]
    fn test_legacy_data_migrates_to_current() {
        let store = legacy_store();
        assert_eq!(stored_version(store.as_ref()).unwrap(), 0);

        let report = migrate(store.as_ref()).unwrap();
        assert_eq!(report.from, 0);
        assert_eq!(report.to, 4);
        assert_eq!(report.applied.len(), 4);

        let storage = Storage::new(store.clone());
        let txns = storage.transactions.all().unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount.agorot(), 12345);
        assert!(txns[0].is_expense());
        assert!(txns[0].tags.is_empty());

        let accounts = storage.accounts.all().unwrap();
        assert_eq!(accounts[0].balance.agorot(), 100050);
        assert_eq!(accounts[0].opening_balance.agorot(), 100050);

        assert!(storage.budgets.all().unwrap().is_empty());
        assert!(migrate(store.as_ref()).unwrap().is_noop());
    }

    #[test]
    fn test_partial_upgrade_runs_remaining_steps() {
        let store = MemoryStore::new();
        store.set("kesef_schema_version", "3").unwrap();
        store
            .set("kesef_categories", r#"[{"name":"מזון","monthly_budget":1500.0}]"#)
            .unwrap();

        let report = migrate(&store).unwrap();
        assert_eq!(report.applied, vec!["v4: amounts stored as integer agorot"]);
        let raw: Value = serde_json::from_str(&store.get("kesef_categories").unwrap().unwrap()).unwrap();
        assert_eq!(raw[0]["monthly_budget"], json!(150000));
    }

    #[test]
    fn test_whole_shekel_amounts_scaled() {
        let store = MemoryStore::new();
        store.set("kesef_schema_version", "3").unwrap();
        store
            .set("kesef_transactions", r#"[{"amount":50},{"amount":0},{"amount":12.5}]"#)
            .unwrap();
        store
            .set("kesef_accounts", r#"[{"balance":1000,"opening_balance":-250}]"#)
            .unwrap();
        store
            .set("kesef_budgets", r#"[{"allocations":[{"amount":700}]}]"#)
            .unwrap();

        migrate(&store).unwrap();

        let raw = |key: &str| -> Value { serde_json::from_str(&store.get(key).unwrap().unwrap()).unwrap() };
        let txns = raw("kesef_transactions");
        assert_eq!(txns[0]["amount"], json!(5000));
        assert_eq!(txns[1]["amount"], json!(0));
        assert_eq!(txns[2]["amount"], json!(1250));
        let accounts = raw("kesef_accounts");
        assert_eq!(accounts[0]["balance"], json!(100000));
        assert_eq!(accounts[0]["opening_balance"], json!(-25000));
        assert_eq!(raw("kesef_budgets")[0]["allocations"][0]["amount"], json!(70000));
    }

    #[test]
    fn test_current_store_amounts_untouched() {
        let store = MemoryStore::new();
        store.set("kesef_schema_version", "4").unwrap();
        store.set("kesef_transactions", r#"[{"amount":5000}]"#).unwrap();
        assert!(migrate(&store).unwrap().is_noop());
        assert_eq!(store.get("kesef_transactions").unwrap().as_deref(), Some(r#"[{"amount":5000}]"#));
    }

    /// Store whose schema version write always fails
    #[derive(Default)]
    struct VersionWriteFails(MemoryStore);

    impl KeyValueStore for VersionWriteFails {
        fn get(&self, key: &str) -> KesefResult<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> KesefResult<()> {
            if key == schema_version_key() && value == CURRENT_SCHEMA_VERSION.to_string() {
                return Err(KesefError::Storage("disk full".into()));
            }
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> KesefResult<bool> {
            self.0.remove(key)
        }
        fn keys(&self) -> KesefResult<Vec<String>> {
            self.0.keys()
        }
    }

    #[test]
    fn test_failed_version_write_restores_settings() {
        let store = VersionWriteFails::default();
        store.set("kesef_schema_version", "3").unwrap();
        store.set("kesef_settings", r#"{"schema_version":3}"#).unwrap();
        store.set("kesef_categories", r#"[{"monthly_budget":15}]"#).unwrap();

        assert!(migrate(&store).is_err());
        assert_eq!(store.get("kesef_settings").unwrap().as_deref(), Some(r#"{"schema_version":3}"#));
        assert_eq!(
            store.get("kesef_categories").unwrap().as_deref(),
            Some(r#"[{"monthly_budget":15}]"#)
        );
        assert_eq!(stored_version(&store).unwrap(), 3);
    }

    #[test]
    fn test_newer_version_rejected() {
        let store = MemoryStore::new();
        store.set("kesef_schema_version", "99").unwrap();
        assert!(matches!(migrate(&store), Err(KesefError::Migration(_))));
    }

    #[test]
    fn test_failed_step_restores_snapshot() {
        let store = MemoryStore::new();
        store.set("kesef_schema_version", "1").unwrap();
        store.set("kesef_transactions", r#"[{"type":"הכנסה"}]"#).unwrap();
        store.set("kesef_accounts", r#"[{"balance":"lots"}]"#).unwrap();

        let err = migrate(&store).unwrap_err();
        assert!(err.to_string().contains("Step 4"));

        // Step 2 had rewritten the transaction kind; the snapshot puts it back
        assert_eq!(
            store.get("kesef_transactions").unwrap().as_deref(),
            Some(r#"[{"type":"הכנסה"}]"#)
        );
        assert_eq!(stored_version(&store).unwrap(), 1);
    }

    #[test]
    fn test_settings_version_synced() {
        let store = MemoryStore::new();
        store.set("kesef_schema_version", "2").unwrap();
        store.set("kesef_settings", r#"{"schema_version": 2}"#).unwrap();
        migrate(&store).unwrap();
        let settings = crate::config::Settings::load(&store).unwrap();
        assert_eq!(settings.schema_version, CURRENT_SCHEMA_VERSION);
    }
}
