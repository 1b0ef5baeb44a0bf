//! Storage initialization
//!
//! First-run seeding of default categories and a cash account.

use crate::error::KesefResult;
use crate::models::{Account, AccountKind, Category, CategoryKind};

use super::Storage;

/// Default expense categories with their display colors
const DEFAULT_EXPENSE_CATEGORIES: [(&str, &str); 10] = [
    ("מזון וסופרמרקט", "#4CAF50"),
    ("דיור ושכירות", "#3F51B5"),
    ("חשבונות ומיסים", "#FF9800"),
    ("תחבורה ודלק", "#795548"),
    ("בריאות", "#E91E63"),
    ("חינוך וילדים", "#9C27B0"),
    ("בילויים ופנאי", "#00BCD4"),
    ("ביגוד והנעלה", "#FF5722"),
    ("ביטוחים", "#607D8B"),
    ("שונות", "#9E9E9E"),
];

const DEFAULT_INCOME_CATEGORIES: [(&str, &str); 4] = [
    ("משכורת", "#2E7D32"),
    ("עסק עצמאי", "#1565C0"),
    ("קצבאות והחזרים", "#6A1B9A"),
    ("הכנסות אחרות", "#558B2F"),
];

/// Name of the cash account created on first run
pub const DEFAULT_CASH_ACCOUNT: &str = "מזומן";

/// Initialize storage for a fresh installation
///
/// Seeds categories only when the category table is empty and the cash
/// account only when there are no accounts, then marks setup complete.
/// Running it again leaves existing data untouched.
pub fn initialize_storage(storage: &Storage) -> KesefResult<()> {
    if storage.categories.count()? == 0 {
        create_default_categories(storage)?;
    }

    if storage.accounts.count()? == 0 {
        let cash = Account::new(DEFAULT_CASH_ACCOUNT, AccountKind::Cash);
        storage.accounts.insert(cash.clone())?;
        storage.log_create(&cash)?;

        let mut settings = storage.settings()?;
        if settings.default_account_id.is_none() {
            settings.default_account_id = Some(cash.id);
            settings.save(storage.store().as_ref())?;
        }
    }

    let mut settings = storage.settings()?;
    if !settings.setup_completed {
        settings.setup_completed = true;
        storage.save_settings(&settings)?;
    }

    Ok(())
}

fn create_default_categories(storage: &Storage) -> KesefResult<()> {
    let expense = DEFAULT_EXPENSE_CATEGORIES
        .iter()
        .map(|(name, color)| (*name, *color, CategoryKind::Expense));
    let income = DEFAULT_INCOME_CATEGORIES
        .iter()
        .map(|(name, color)| (*name, *color, CategoryKind::Income));

    let categories: Vec<Category> = expense
        .chain(income)
        .map(|(name, color, kind)| {
            let mut category = Category::new(name, kind);
            category.color = color.to_string();
            category.is_default = true;
            category
        })
        .collect();

    tracing::info!(count = categories.len(), "seeding default categories");
    storage.categories.replace_all(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KesefPaths;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_storage() {
        let temp_dir = TempDir::new().unwrap();
        let paths = KesefPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(&paths).unwrap();

        assert!(!storage.is_initialized().unwrap());
        initialize_storage(&storage).unwrap();
        assert!(storage.is_initialized().unwrap());

        assert!(temp_dir.path().join("store").join("kesef_categories.json").exists());
    }

    #[test]
    fn test_default_categories_created() {
        let storage = Storage::in_memory();
        initialize_storage(&storage).unwrap();

        let categories = storage.categories.all().unwrap();
        assert_eq!(categories.len(), 14);
        assert!(categories.iter().all(|c| c.is_default));

        let income: Vec<_> = categories
            .iter()
            .filter(|c| c.kind == CategoryKind::Income)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(income, vec!["משכורת", "עסק עצמאי", "קצבאות והחזרים", "הכנסות אחרות"]);

        let accounts = storage.accounts.all().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, DEFAULT_CASH_ACCOUNT);
        assert_eq!(
            storage.settings().unwrap().default_account_id,
            Some(accounts[0].id)
        );
    }

    #[test]
    fn test_doesnt_overwrite_existing() {
        let storage = Storage::in_memory();
        storage
            .categories
            .insert(Category::new("קטגוריה שלי", CategoryKind::Expense))
            .unwrap();

        initialize_storage(&storage).unwrap();
        initialize_storage(&storage).unwrap();

        let categories = storage.categories.all().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "קטגוריה שלי");
        assert_eq!(storage.accounts.count().unwrap(), 1);
    }
}
