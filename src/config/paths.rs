//! Path management for Kesef
//!
//! ## Path Resolution Order
//!
//! 1. `KESEF_DATA_DIR` environment variable (if set)
//! 2. The platform data directory from `directories`
//!    (`~/.local/share/kesef` on Linux, `~/Library/Application Support/il.Kesef.kesef`
//!    on macOS, `%APPDATA%\Kesef\kesef\data` on Windows)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{KesefError, KesefResult};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "KESEF_DATA_DIR";

/// Manages all paths used by Kesef
#[derive(Debug, Clone)]
pub struct KesefPaths {
    base_dir: PathBuf,
}

impl KesefPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> KesefResult<Self> {
        if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            if !custom.trim().is_empty() {
                return Ok(Self::with_base_dir(PathBuf::from(custom)));
            }
        }

        let dirs = ProjectDirs::from("il", "Kesef", "kesef").ok_or_else(|| {
            KesefError::Config("Could not determine a home directory for Kesef data".into())
        })?;
        Ok(Self::with_base_dir(dirs.data_dir().to_path_buf()))
    }

    /// Create KesefPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the key-value store (`<key>.json` files)
    pub fn store_dir(&self) -> PathBuf {
        self.base_dir.join("store")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> KesefResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| KesefError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.store_dir())
            .map_err(|e| KesefError::Io(format!("Failed to create store directory: {}", e)))?;

        Ok(())
    }
}
