//! CLI commands for importing bank exports and restoring full backups

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::error::{KesefError, KesefResult};
use crate::export::{import_from_json, import_from_yaml, restore, FullExport};
use crate::services::{
    AccountService, CategoryService, ColumnMapping, ImportPreset, ImportPreviewEntry,
    ImportService, ImportStatus,
};
use crate::storage::{read_string, Storage};

/// Import subcommands
#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Import transactions from a bank or Kesef CSV file
    Csv {
        /// Path to the CSV file (UTF-8)
        file: PathBuf,

        /// Target account name or ID
        #[arg(short, long)]
        account: String,

        /// Column layout: standard, hapoalim, leumi, discount (detected when omitted)
        #[arg(short, long)]
        preset: Option<String>,

        /// Category for rows without one (used when its kind matches)
        #[arg(long)]
        default_category: Option<String>,

        /// Field separator when it is not a comma
        #[arg(long)]
        delimiter: Option<char>,

        /// Show what would be imported without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Replace all data with a JSON full export
    Json {
        file: PathBuf,

        /// Confirm replacing existing data
        #[arg(long)]
        yes: bool,
    },

    /// Replace all data with a YAML full export
    Yaml {
        file: PathBuf,

        #[arg(long)]
        yes: bool,
    },
}

/// Handle import commands
pub fn handle_import_command(storage: &Storage, cmd: ImportCommands) -> KesefResult<()> {
    match cmd {
        ImportCommands::Csv {
            file,
            account,
            preset,
            default_category,
            delimiter,
            dry_run,
        } => handle_import_csv(
            storage,
            &file,
            &account,
            preset.as_deref(),
            default_category,
            delimiter,
            dry_run,
        ),
        ImportCommands::Json { file, yes } => {
            let export = import_from_json(&read_file(&file)?)?;
            handle_restore(storage, export, yes)
        }
        ImportCommands::Yaml { file, yes } => {
            let export = import_from_yaml(&read_file(&file)?)?;
            handle_restore(storage, export, yes)
        }
    }
}

fn handle_import_csv(
    storage: &Storage,
    file: &Path,
    account: &str,
    preset: Option<&str>,
    default_category: Option<String>,
    delimiter: Option<char>,
    dry_run: bool,
) -> KesefResult<()> {
    let account = AccountService::new(storage).require(account)?;
    let default_category = default_category
        .as_deref()
        .map(|c| CategoryService::new(storage).require(c))
        .transpose()?;
    let data = read_file(file)?;

    let mapping = match preset {
        Some(name) => {
            let preset = ImportPreset::parse(name).ok_or_else(|| {
                KesefError::invalid(
                    "preset",
                    format!("פורמט לא מוכר: '{}' (standard, hapoalim, leumi, discount)", name),
                )
            })?;
            println!("פורמט: {}", preset);
            preset.mapping()
        }
        None => ColumnMapping::detect(&data).ok_or_else(|| {
            KesefError::Import(
                "לא ניתן לזהות את מבנה הקובץ; יש לציין --preset".into(),
            )
        })?,
    };
    let mapping = match delimiter {
        Some(c) if c.is_ascii() => mapping.with_delimiter(c as u8),
        Some(c) => {
            return Err(KesefError::invalid(
                "delimiter",
                format!("תו הפרדה לא נתמך: '{}'", c),
            ))
        }
        None => mapping,
    };

    let service = ImportService::new(storage);
    let parsed = service.parse_csv(&data, &mapping)?;
    if parsed.is_empty() {
        return Err(KesefError::Import("לא נמצאו שורות לייבוא".into()));
    }
    let preview = service.preview(&parsed, account.id)?;

    if dry_run {
        print!("{}", format_preview(&preview));
        return Ok(());
    }

    let result = service.commit(&preview, account.id, default_category.as_ref())?;
    println!("ייבוא לחשבון '{}':", account.name);
    println!("  יובאו:            {}", result.imported);
    println!("  כפולים שדולגו:    {}", result.duplicates_skipped);
    println!("  שגיאות:           {}", result.errors);

    let mut errors: Vec<_> = result.error_messages.iter().collect();
    errors.sort_by_key(|(row, _)| **row);
    for (row, message) in errors {
        println!("  שורה {}: {}", row, message);
    }
    Ok(())
}

fn format_preview(preview: &[ImportPreviewEntry]) -> String {
    let mut output = String::new();
    let mut new = 0;
    let mut duplicates = 0;
    let mut errors = 0;

    for entry in preview {
        let (mark, detail) = match &entry.status {
            ImportStatus::New => {
                new += 1;
                ("+", String::new())
            }
            ImportStatus::Duplicate => {
                duplicates += 1;
                ("=", " (כפול)".to_string())
            }
            ImportStatus::Error(message) => {
                errors += 1;
                ("!", format!(" {}", message))
            }
        };
        let summary = match &entry.row {
            Some(row) => format!(
                "{} {} {} {}",
                row.date.format("%d/%m/%Y"),
                row.kind,
                row.amount.to_decimal_string(),
                row.description
            ),
            None => String::new(),
        };
        output.push_str(&format!(
            "{} שורה {:>4}: {}{}\n",
            mark, entry.row_number, summary, detail
        ));
    }

    output.push_str(&format!(
        "\nחדשות: {}, כפולות: {}, שגיאות: {} (לא נשמר דבר)\n",
        new, duplicates, errors
    ));
    output
}

fn handle_restore(storage: &Storage, export: FullExport, yes: bool) -> KesefResult<()> {
    let has_data = storage.transactions.count()? > 0 || storage.accounts.count()? > 0;
    if has_data && !yes {
        return Err(KesefError::Import(
            "השחזור יחליף את כל הנתונים הקיימים; יש להוסיף --yes לאישור".into(),
        ));
    }

    let counts = (
        export.accounts.len(),
        export.categories.len(),
        export.budgets.len(),
        export.transactions.len(),
    );
    restore(storage, export)?;

    println!("השחזור הושלם:");
    println!("  חשבונות:   {}", counts.0);
    println!("  קטגוריות:  {}", counts.1);
    println!("  תקציבים:   {}", counts.2);
    println!("  תנועות:    {}", counts.3);
    Ok(())
}

fn read_file(path: &Path) -> KesefResult<String> {
    let data = read_string(path)?
        .ok_or_else(|| KesefError::Import(format!("File not found: {}", path.display())))?;
    // spreadsheet exports often start with a BOM
    Ok(match data.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, TransactionKind};
    use crate::services::import::ParsedRow;
    use chrono::NaiveDate;

    #[test]
    fn test_preview_counts() {
        let row = ParsedRow {
            row_number: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            kind: TransactionKind::Expense,
            amount: Money::from_shekels(84, 90),
            description: "שופרסל".into(),
            category_name: None,
            tags: vec![],
            notes: String::new(),
            reference: None,
            fingerprint: "x".into(),
        };
        let preview = vec![
            ImportPreviewEntry {
                row_number: 1,
                row: Some(row.clone()),
                status: ImportStatus::New,
                category_id: None,
                existing_id: None,
            },
            ImportPreviewEntry {
                row_number: 2,
                row: Some(row),
                status: ImportStatus::Duplicate,
                category_id: None,
                existing_id: None,
            },
            ImportPreviewEntry {
                row_number: 3,
                row: None,
                status: ImportStatus::Error("תאריך חסר".into()),
                category_id: None,
                existing_id: None,
            },
        ];
        let out = format_preview(&preview);
        assert!(out.contains("02/03/2025"));
        assert!(out.contains("84.90"));
        assert!(out.contains("תאריך חסר"));
        assert!(out.contains("חדשות: 1, כפולות: 1, שגיאות: 1"));
    }

    #[test]
    fn test_read_file_strips_bom() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bank.csv");
        std::fs::write(&path, "\u{feff}תאריך,תיאור\n").unwrap();
        assert!(read_file(&path).unwrap().starts_with("תאריך"));
        assert!(read_file(&dir.path().join("missing.csv")).is_err());
    }
}
