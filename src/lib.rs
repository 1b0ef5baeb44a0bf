//! Kesef - personal finance tracking for Israeli households
//!
//! Records income, expenses and transfers in shekels and agorot, keeps
//! account balances, budgets per category, and reports by calendar month and
//! by Israeli tax year (April 1 to March 31). Bank statements from Israeli
//! banks can be imported from CSV, and all data can be exported to CSV, JSON
//! or YAML.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `models`: Core data types (money, accounts, transactions, categories, budgets, periods)
//! - `validation`: Field-keyed validation errors and shared rules
//! - `storage`: Key-value store with one JSON table per entity type
//! - `crypto`: Reversible field obfuscation for sensitive values
//! - `audit`: Append-only audit log of every change
//! - `config`: Paths and user settings
//! - `migration`: Schema upgrades and integrity checks
//! - `search`: Transaction filtering and sorting
//! - `analytics`: Totals, breakdowns, trends and budget progress
//! - `export`: CSV, JSON and YAML export and full restore
//! - `services`: Business operations used by the CLI
//! - `display`: Terminal tables
//! - `cli`: Command handlers for the `kesef` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use kesef::config::KesefPaths;
//! use kesef::storage::Storage;
//!
//! let paths = KesefPaths::new()?;
//! let storage = Storage::open(&paths)?;
//! kesef::migration::migrate(storage.store().as_ref())?;
//! ```

pub mod analytics;
pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod export;
pub mod migration;
pub mod models;
pub mod search;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{KesefError, KesefResult};
