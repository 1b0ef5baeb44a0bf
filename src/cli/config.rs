//! Configuration CLI commands

use clap::Subcommand;

use crate::config::KesefPaths;
use crate::error::KesefResult;
use crate::services::AccountService;
use crate::storage::Storage;

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show settings and data paths
    Show,
    /// Change a setting
    Set {
        /// currency_symbol, currency_code, locale, date_format,
        /// first_day_of_week, savings_goal_percent, default_account_id
        key: String,
        value: String,
    },
    /// Print the data directory
    Path,
}

/// Handle a config command
pub fn handle_config_command(
    paths: &KesefPaths,
    storage: &Storage,
    cmd: ConfigCommands,
) -> KesefResult<()> {
    match cmd {
        ConfigCommands::Show => {
            let settings = storage.settings()?;
            let default_account = AccountService::new(storage)
                .default_account()?
                .map(|a| a.name)
                .unwrap_or_else(|| "-".to_string());

            println!("Kesef");
            println!("  תיקיית נתונים:     {}", paths.base_dir().display());
            println!("  מאגר:              {}", paths.store_dir().display());
            println!("  יומן ביקורת:       {}", paths.audit_log().display());
            println!();
            println!("  מטבע:              {} ({})", settings.currency_symbol, settings.currency_code);
            println!("  אזור:              {}", settings.locale);
            println!("  תבנית תאריך:       {}", settings.date_format);
            println!("  יעד חיסכון:        {}%", settings.savings_goal_percent);
            println!("  חשבון ברירת מחדל:  {}", default_account);
            println!(
                "  הצפנה:             {}",
                if settings.is_encryption_enabled() { "פעילה" } else { "כבויה" }
            );
            println!(
                "  אותחל:             {}",
                if settings.setup_completed { "כן" } else { "לא (kesef init)" }
            );
        }
        ConfigCommands::Set { key, value } => {
            let mut settings = storage.settings()?;
            settings.set_value(&key, &value)?;
            storage.save_settings(&settings)?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::Path => {
            println!("{}", paths.base_dir().display());
        }
    }
    Ok(())
}
