use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kesef::cli::{
    handle_account_command, handle_budget_command, handle_category_command, handle_check_command,
    handle_config_command, handle_encrypt_command, handle_export_command, handle_import_command,
    handle_report_command, handle_transaction_command, read_key, AccountCommands, BudgetCommands,
    CategoryCommands, ConfigCommands, EncryptCommands, ExportCommands, ImportCommands,
    ReportCommands, TransactionCommands,
};
use kesef::config::KesefPaths;
use kesef::migration::migrate;
use kesef::storage::{initialize_storage, Storage};

/// Environment variable holding the log filter
const LOG_ENV: &str = "KESEF_LOG";

#[derive(Parser)]
#[command(
    name = "kesef",
    version,
    about = "מעקב הוצאות והכנסות בשקלים",
    long_about = "Kesef is a personal finance tracker for Israeli households. \
                  It records income and expenses in shekels, reports by \
                  calendar month and by tax year (April to March), and \
                  imports statements from Israeli banks."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data store with default categories and a cash account
    Init,

    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Transaction management commands
    #[command(subcommand, alias = "txn")]
    Transaction(TransactionCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Budget management commands
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export data
    #[command(subcommand)]
    Export(ExportCommands),

    /// Import bank statements or restore a full export
    #[command(subcommand)]
    Import(ImportCommands),

    /// Check data integrity
    Check {
        /// Fix what can be fixed automatically
        #[arg(long)]
        repair: bool,
    },

    /// Field obfuscation for sensitive data
    #[command(subcommand)]
    Encrypt(EncryptCommands),
}

impl Commands {
    /// Whether the command reads or writes data that may be sealed
    fn needs_key(&self) -> bool {
        !matches!(
            self,
            Commands::Init | Commands::Config(_) | Commands::Encrypt(EncryptCommands::Status)
        )
    }

    /// Whether the command needs `kesef init` to have run
    fn needs_setup(&self) -> bool {
        !matches!(
            self,
            Commands::Init | Commands::Config(_) | Commands::Import(_) | Commands::Encrypt(_)
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("Kesef - מעקב הוצאות והכנסות");
        println!();
        println!("להתחלה: kesef init");
        println!("לעזרה:  kesef --help");
        return Ok(());
    };

    let paths = KesefPaths::new()?;
    let mut storage = Storage::open(&paths)?;

    let report = migrate(storage.store().as_ref())?;
    if !report.is_noop() {
        tracing::info!(from = report.from, to = report.to, "data migrated");
        eprintln!("הנתונים עודכנו לגרסה {}", report.to);
    }

    let settings = storage.settings()?;
    if command.needs_setup() && !settings.setup_completed {
        bail!("Kesef לא אותחל עדיין; יש להריץ 'kesef init'");
    }
    if command.needs_key() && settings.is_encryption_enabled() {
        storage.unlock(read_key("מפתח: ", false)?)?;
    }

    match command {
        Commands::Init => {
            let first_run = !settings.setup_completed;
            initialize_storage(&storage)?;
            if first_run {
                println!("Kesef אותחל ב: {}", paths.base_dir().display());
                println!();
                println!("נוצרו קטגוריות ברירת מחדל וחשבון מזומן.");
                println!("להוספת חשבון בנק: kesef account add <שם> --bank <בנק>");
            } else {
                println!("Kesef כבר מאותחל ב: {}", paths.base_dir().display());
            }
        }
        Commands::Config(cmd) => handle_config_command(&paths, &storage, cmd)?,
        Commands::Transaction(cmd) => handle_transaction_command(&storage, cmd)?,
        Commands::Category(cmd) => handle_category_command(&storage, cmd)?,
        Commands::Account(cmd) => handle_account_command(&storage, cmd)?,
        Commands::Budget(cmd) => handle_budget_command(&storage, cmd)?,
        Commands::Report(cmd) => handle_report_command(&storage, cmd)?,
        Commands::Export(cmd) => handle_export_command(&storage, cmd)?,
        Commands::Import(cmd) => handle_import_command(&storage, cmd)?,
        Commands::Check { repair } => {
            if !handle_check_command(&storage, repair)? {
                std::process::exit(1);
            }
        }
        Commands::Encrypt(cmd) => handle_encrypt_command(&mut storage, cmd)?,
    }

    Ok(())
}
