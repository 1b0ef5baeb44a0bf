//! Configuration module for Kesef
//!
//! - Data directory resolution (`KESEF_DATA_DIR` or the platform default)
//! - User settings persisted in the key-value store

pub mod paths;
pub mod settings;

pub use paths::KesefPaths;
pub use settings::{EncryptionSettings, Settings};
