//! Encryption CLI commands
//!
//! Enabling, disabling and inspecting field obfuscation. The key comes from
//! `KESEF_KEY` when set, otherwise from a hidden prompt.

use clap::Subcommand;
use zeroize::Zeroizing;

use crate::crypto::ObfuscationKey;
use crate::error::{KesefError, KesefResult};
use crate::storage::Storage;

/// Environment variable supplying the key non-interactively
pub const KEY_ENV: &str = "KESEF_KEY";

/// Encryption management commands
#[derive(Subcommand)]
pub enum EncryptCommands {
    /// Obfuscate account numbers, ID numbers, phones and notes at rest
    Enable,

    /// Store everything as plaintext again
    Disable,

    /// Show encryption status
    Status,
}

/// Handle encryption commands
///
/// `storage` must already be unlocked when encryption is enabled.
pub fn handle_encrypt_command(storage: &mut Storage, cmd: EncryptCommands) -> KesefResult<()> {
    match cmd {
        EncryptCommands::Enable => enable_encryption(storage),
        EncryptCommands::Disable => disable_encryption(storage),
        EncryptCommands::Status => show_status(storage),
    }
}

fn enable_encryption(storage: &mut Storage) -> KesefResult<()> {
    if storage.settings()?.is_encryption_enabled() {
        println!("ההצפנה כבר פעילה.");
        return Ok(());
    }

    println!("הפעלת הצפנה");
    println!();
    println!("מספרי חשבון, תעודות זהות, טלפונים והערות יישמרו בצורה מוסתרת.");
    println!("זו הסתרה בלבד ואינה מחליפה הצפנה אמיתית.");
    println!("ללא המפתח לא ניתן יהיה לקרוא את השדות האלה.");
    println!();

    let key = read_key("מפתח חדש: ", true)?;
    storage.enable_encryption(key)?;

    println!("ההצפנה הופעלה.");
    Ok(())
}

fn disable_encryption(storage: &mut Storage) -> KesefResult<()> {
    if !storage.settings()?.is_encryption_enabled() {
        println!("ההצפנה אינה פעילה.");
        return Ok(());
    }

    storage.disable_encryption()?;
    println!("ההצפנה בוטלה; כל השדות נשמרים כטקסט רגיל.");
    Ok(())
}

fn show_status(storage: &Storage) -> KesefResult<()> {
    let settings = storage.settings()?;
    if settings.is_encryption_enabled() {
        println!("הצפנה: פעילה");
        println!(
            "  מצב: {}",
            if storage.cipher().is_some() { "פתוח" } else { "נעול" }
        );
    } else {
        println!("הצפנה: כבויה");
        println!("  להפעלה: kesef encrypt enable");
    }
    Ok(())
}

/// Read the obfuscation key from `KESEF_KEY` or prompt for it
///
/// With `confirm`, a prompted key must be typed twice.
pub fn read_key(prompt: &str, confirm: bool) -> KesefResult<ObfuscationKey> {
    if let Ok(value) = std::env::var(KEY_ENV).map(Zeroizing::new) {
        if !value.is_empty() {
            return ObfuscationKey::new(&value);
        }
    }

    let first = prompt_key(prompt)?;
    if confirm {
        let second = prompt_key("אימות מפתח: ")?;
        if *first != *second {
            return Err(KesefError::Encryption("המפתחות אינם תואמים".into()));
        }
    }
    ObfuscationKey::new(&first)
}

/// Prompt for a key (hidden input)
fn prompt_key(prompt: &str) -> KesefResult<Zeroizing<String>> {
    rpassword::prompt_password(prompt)
        .map(Zeroizing::new)
        .map_err(|e| KesefError::Encryption(format!("Failed to read key: {}", e)))
}
