//! Core data models for Kesef
//!
//! Plain record shapes for the finance domain: transactions, categories,
//! budgets and accounts, plus the money and calendar types they share.

pub mod account;
pub mod budget;
pub mod category;
pub mod ids;
pub mod money;
pub mod period;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use budget::{Budget, BudgetAllocation};
pub use category::{normalize_name, Category, CategoryKind};
pub use ids::{AccountId, BudgetId, CategoryId, TransactionId};
pub use money::{Money, MoneyParseError, SHEKEL_SIGN};
pub use period::{TaxYear, YearMonth};
pub use transaction::{Transaction, TransactionKind};
