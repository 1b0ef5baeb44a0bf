//! Account CLI commands
//!
//! Implements CLI commands for account management.

use clap::Subcommand;

use super::parse_money_arg;
use crate::display::{format_account_details, format_account_table};
use crate::error::{KesefError, KesefResult};
use crate::models::AccountKind;
use crate::services::{AccountService, CreateAccountInput, UpdateAccountInput};
use crate::storage::Storage;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Add {
        /// Account name
        name: String,
        /// Account type (bank, cash, credit, savings)
        #[arg(short = 't', long, default_value = "bank")]
        kind: String,
        /// Opening balance (e.g., "1000.00" or "₪1,000")
        #[arg(short, long, default_value = "0")]
        balance: String,
        /// Bank name
        #[arg(long)]
        bank: Option<String>,
        /// Branch number (סניף)
        #[arg(long)]
        branch: Option<String>,
        /// Account number
        #[arg(long)]
        number: Option<String>,
        /// Owner's ID number (ת"ז)
        #[arg(long)]
        owner_id: Option<String>,
        /// Owner's phone number
        #[arg(long)]
        phone: Option<String>,
        /// Use as the default account for new transactions
        #[arg(long)]
        default: bool,
    },
    /// List accounts with balances
    List {
        /// Show inactive accounts
        #[arg(short, long)]
        all: bool,
    },
    /// Show account details
    Show {
        /// Account name or ID
        account: String,
    },
    /// Edit an account
    Edit {
        /// Account name or ID
        account: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short = 't', long)]
        kind: Option<String>,
        /// New opening balance; the current balance shifts by the difference
        #[arg(long)]
        opening_balance: Option<String>,
        #[arg(long)]
        bank: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        owner_id: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Deactivate an account
    Deactivate {
        /// Account name or ID
        account: String,
    },
    /// Reactivate an account
    Reactivate {
        /// Account name or ID
        account: String,
    },
    /// Delete an account without transactions
    Delete {
        /// Account name or ID
        account: String,
    },
    /// Set the default account for new transactions
    SetDefault {
        /// Account name or ID
        account: String,
    },
}

/// Handle an account command
pub fn handle_account_command(storage: &Storage, cmd: AccountCommands) -> KesefResult<()> {
    let service = AccountService::new(storage);
    let settings = storage.settings()?;

    match cmd {
        AccountCommands::Add {
            name,
            kind,
            balance,
            bank,
            branch,
            number,
            owner_id,
            phone,
            default,
        } => {
            let mut input = CreateAccountInput::new(name, parse_kind(&kind)?);
            input.opening_balance = parse_money_arg("balance", &balance)?;
            input.bank_name = bank.unwrap_or_default();
            input.branch_number = branch.unwrap_or_default();
            input.account_number = number.unwrap_or_default();
            input.owner_id = owner_id.unwrap_or_default();
            input.owner_phone = phone.unwrap_or_default();

            let account = service.create(input)?;
            if default {
                set_default(storage, &account.id.to_string())?;
            }

            println!("נוצר חשבון: {}", account.name);
            println!("  סוג: {}", account.kind);
            println!(
                "  יתרת פתיחה: {}",
                account.opening_balance.format_with_symbol(&settings.currency_symbol)
            );
            println!("  מזהה: {}", account.id.short());
        }

        AccountCommands::List { all } => {
            let accounts = service.list(all)?;
            print!("{}", format_account_table(&accounts, &settings));
        }

        AccountCommands::Show { account } => {
            let found = service.require(&account)?;
            print!("{}", format_account_details(&found, &settings));
        }

        AccountCommands::Edit {
            account,
            name,
            kind,
            opening_balance,
            bank,
            branch,
            number,
            owner_id,
            phone,
        } => {
            let found = service.require(&account)?;

            let input = UpdateAccountInput {
                name,
                kind: kind.as_deref().map(parse_kind).transpose()?,
                opening_balance: opening_balance
                    .as_deref()
                    .map(|b| parse_money_arg("opening_balance", b))
                    .transpose()?,
                bank_name: bank,
                branch_number: branch,
                account_number: number,
                owner_id,
                owner_phone: phone,
            };

            let updated = service.update(found.id, input)?;
            println!("עודכן חשבון: {}", updated.name);
        }

        AccountCommands::Deactivate { account } => {
            let found = service.require(&account)?;
            let updated = service.deactivate(found.id)?;
            println!("החשבון '{}' הושבת", updated.name);
        }

        AccountCommands::Reactivate { account } => {
            let found = service.require(&account)?;
            let updated = service.reactivate(found.id)?;
            println!("החשבון '{}' הופעל מחדש", updated.name);
        }

        AccountCommands::Delete { account } => {
            let found = service.require(&account)?;
            let deleted = service.delete(found.id)?;
            println!("נמחק חשבון: {}", deleted.name);
        }

        AccountCommands::SetDefault { account } => {
            let name = set_default(storage, &account)?;
            println!("חשבון ברירת המחדל: {}", name);
        }
    }

    Ok(())
}

fn set_default(storage: &Storage, identifier: &str) -> KesefResult<String> {
    let account = AccountService::new(storage).require(identifier)?;
    if !account.is_active {
        return Err(KesefError::invalid(
            "account",
            format!("החשבון '{}' אינו פעיל", account.name),
        ));
    }
    let mut settings = storage.settings()?;
    settings.default_account_id = Some(account.id);
    storage.save_settings(&settings)?;
    Ok(account.name)
}

fn parse_kind(s: &str) -> KesefResult<AccountKind> {
    AccountKind::parse(s).ok_or_else(|| {
        KesefError::invalid(
            "kind",
            format!("סוג חשבון לא מוכר: '{}' (bank, cash, credit, savings)", s),
        )
    })
}
