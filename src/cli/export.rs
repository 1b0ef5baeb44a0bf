//! CLI commands for data export
//!
//! Output goes to stdout unless `--output` names a file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Subcommand;

use super::PeriodArgs;
use crate::error::{KesefError, KesefResult};
use crate::export::{export_csv, export_full_json, export_full_yaml, CsvExportOptions, CsvLayout};
use crate::services::AccountService;
use crate::storage::Storage;

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export transactions to CSV with Hebrew headers
    Csv {
        /// Layout: standard, tax, bank-statement, category-summary
        #[arg(short, long, default_value = "standard")]
        layout: String,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prefix a UTF-8 byte order mark so Excel shows Hebrew correctly
        #[arg(long)]
        bom: bool,

        /// Only this account (required by the bank-statement layout)
        #[arg(short, long)]
        account: Option<String>,

        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Export the full database as JSON
    Json {
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line output
        #[arg(long)]
        compact: bool,
    },

    /// Export the full database as YAML
    Yaml {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle export commands
pub fn handle_export_command(storage: &Storage, cmd: ExportCommands) -> KesefResult<()> {
    match cmd {
        ExportCommands::Csv {
            layout,
            output,
            bom,
            account,
            period,
        } => handle_export_csv(storage, &layout, output, bom, account, period),
        ExportCommands::Json { output, compact } => {
            let mut writer = open_output(output.as_ref())?;
            export_full_json(storage, &mut writer, !compact)?;
            finish(writer, output.as_ref())
        }
        ExportCommands::Yaml { output } => {
            let mut writer = open_output(output.as_ref())?;
            export_full_yaml(storage, &mut writer)?;
            finish(writer, output.as_ref())
        }
    }
}

fn handle_export_csv(
    storage: &Storage,
    layout: &str,
    output: Option<PathBuf>,
    bom: bool,
    account: Option<String>,
    period: PeriodArgs,
) -> KesefResult<()> {
    let layout = CsvLayout::parse(layout).ok_or_else(|| {
        KesefError::invalid(
            "layout",
            format!(
                "פורמט לא מוכר: '{}' (standard, tax, bank-statement, category-summary)",
                layout
            ),
        )
    })?;
    let account_id = account
        .as_deref()
        .map(|a| AccountService::new(storage).require(a))
        .transpose()?
        .map(|a| a.id);
    let period = period.resolve(None)?;

    let transactions = storage.transactions.find(|t| {
        period.contains(t.date) && account_id.map_or(true, |id| t.involves_account(id))
    })?;

    let options = CsvExportOptions {
        layout,
        include_bom: bom,
        account_id,
    };
    let mut writer = open_output(output.as_ref())?;
    let rows = export_csv(storage, &transactions, &mut writer, &options)?;
    if output.is_some() {
        eprintln!("{} שורות נכתבו", rows);
    }
    finish(writer, output.as_ref())
}

fn open_output(output: Option<&PathBuf>) -> KesefResult<Box<dyn Write>> {
    Ok(match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                KesefError::Export(format!("Failed to create file {}: {}", path.display(), e))
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    })
}

fn finish(mut writer: Box<dyn Write>, output: Option<&PathBuf>) -> KesefResult<()> {
    writer.flush()?;
    if let Some(path) = output {
        eprintln!("נשמר: {}", path.display());
    }
    Ok(())
}
