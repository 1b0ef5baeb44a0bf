//! User settings for Kesef
//!
//! Settings live in the key-value store under `kesef_settings` next to the
//! data tables, so an export/restore carries them along.

use serde::{Deserialize, Serialize};

use crate::error::{KesefError, KesefResult};
use crate::models::{AccountId, SHEKEL_SIGN};
use crate::storage::kv::{KeyValueStore, KEY_PREFIX};
use crate::validation::{rules, Validate, ValidationErrors};

/// Store key holding the settings document
pub fn settings_key() -> String {
    format!("{}settings", KEY_PREFIX)
}

/// At-rest obfuscation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncryptionSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Sealed known value used to check a key before unsealing any data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
}

/// User settings for Kesef
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version the data was last written with
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// ISO 4217 code
    #[serde(default = "default_currency_code")]
    pub currency_code: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// First day of week (0 = Sunday, 1 = Monday)
    #[serde(default)]
    pub first_day_of_week: u8,

    #[serde(default)]
    pub encryption: EncryptionSettings,

    /// Account preselected for new transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account_id: Option<AccountId>,

    /// Target share of income to save each month
    #[serde(default = "default_savings_goal")]
    pub savings_goal_percent: u8,

    /// Whether `kesef init` has run
    #[serde(default)]
    pub setup_completed: bool,
}

fn default_schema_version() -> u32 {
    crate::migration::CURRENT_SCHEMA_VERSION
}

fn default_currency_code() -> String {
    "ILS".to_string()
}

fn default_currency_symbol() -> String {
    SHEKEL_SIGN.to_string()
}

fn default_locale() -> String {
    "he-IL".to_string()
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_savings_goal() -> u8 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_code: default_currency_code(),
            currency_symbol: default_currency_symbol(),
            locale: default_locale(),
            date_format: default_date_format(),
            first_day_of_week: 0,
            encryption: EncryptionSettings::default(),
            default_account_id: None,
            savings_goal_percent: default_savings_goal(),
            setup_completed: false,
        }
    }
}

impl Settings {
    pub fn is_encryption_enabled(&self) -> bool {
        self.encryption.enabled
    }

    /// Load settings from the store, or defaults when none were saved yet
    pub fn load(store: &dyn KeyValueStore) -> KesefResult<Self> {
        match store.get(&settings_key())? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| KesefError::Config(format!("Failed to parse settings: {}", e))),
            None => Ok(Settings::default()),
        }
    }

    /// Validate and persist
    pub fn save(&self, store: &dyn KeyValueStore) -> KesefResult<()> {
        self.validate()?;
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| KesefError::Config(format!("Failed to serialize settings: {}", e)))?;
        store.set(&settings_key(), &contents)
    }

    /// Format a date with the configured format
    pub fn format_date(&self, date: chrono::NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    /// Set one setting from its key and a textual value (used by `kesef config set`)
    pub fn set_value(&mut self, key: &str, value: &str) -> KesefResult<()> {
        match key {
            "currency_symbol" => self.currency_symbol = value.to_string(),
            "currency_code" => self.currency_code = value.to_uppercase(),
            "locale" => self.locale = value.to_string(),
            "date_format" => self.date_format = value.to_string(),
            "first_day_of_week" => {
                self.first_day_of_week = value
                    .parse()
                    .map_err(|_| KesefError::invalid(key, "יש להזין מספר בין 0 ל-6"))?;
            }
            "savings_goal_percent" => {
                self.savings_goal_percent = value
                    .trim_end_matches('%')
                    .parse()
                    .map_err(|_| KesefError::invalid(key, "יש להזין מספר בין 0 ל-100"))?;
            }
            "default_account_id" => {
                self.default_account_id = if value.is_empty() {
                    None
                } else {
                    Some(
                        value
                            .parse()
                            .map_err(|_| KesefError::invalid(key, "מזהה חשבון לא תקין"))?,
                    )
                };
            }
            _ => {
                return Err(KesefError::Config(format!("Unknown setting: {}", key)));
            }
        }
        Ok(())
    }
}

impl Validate for Settings {
    fn validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::required(&mut errors, "currency_symbol", &self.currency_symbol);
        if self.currency_code.len() != 3 || !self.currency_code.chars().all(|c| c.is_ascii_uppercase()) {
            errors.add("currency_code", "קוד מטבע חייב להיות בן 3 אותיות");
        }
        rules::required(&mut errors, "date_format", &self.date_format);
        rules::in_range(&mut errors, "first_day_of_week", self.first_day_of_week, 0, 6);
        rules::in_range(&mut errors, "savings_goal_percent", self.savings_goal_percent, 0, 100);
        errors
    }
}
