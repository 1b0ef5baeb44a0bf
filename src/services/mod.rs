//! Service layer for Kesef
//!
//! The service layer provides business logic on top of the storage layer,
//! handling validation, balance upkeep, cross-entity checks and auditing.

pub mod account;
pub mod budget;
pub mod category;
pub mod import;
pub mod transaction;

pub use account::{AccountService, CreateAccountInput, UpdateAccountInput};
pub use budget::{BudgetService, CreateBudgetInput};
pub use category::{CategoryService, CategoryUsage, CreateCategoryInput, UpdateCategoryInput};
pub use import::{ColumnMapping, ImportPreset, ImportPreviewEntry, ImportResult, ImportService, ImportStatus};
pub use transaction::{CreateTransactionInput, TransactionService, UpdateTransactionInput};
