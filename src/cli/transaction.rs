//! Transaction CLI commands

use clap::Subcommand;

use super::{parse_date_arg, parse_money_arg, today, PeriodArgs};
use crate::display::{format_transaction_details, format_transaction_table, NameLookup};
use crate::error::{KesefError, KesefResult};
use crate::models::{Account, TransactionKind};
use crate::search::{SortField, SortOrder, TransactionFilter};
use crate::services::{
    AccountService, CategoryService, CreateTransactionInput, TransactionService,
    UpdateTransactionInput,
};
use crate::storage::Storage;

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a new transaction
    Add {
        /// Description (payee or purpose)
        description: String,
        /// Amount in shekels (e.g. "120.50" or "₪1,200")
        amount: String,
        /// Kind: expense, income or transfer
        #[arg(short, long, default_value = "expense")]
        kind: String,
        /// Account name or ID (defaults to the default account)
        #[arg(short, long)]
        account: Option<String>,
        /// Target account for transfers
        #[arg(long)]
        to: Option<String>,
        /// Category name or ID
        #[arg(short, long)]
        category: Option<String>,
        /// Date (DD/MM/YYYY, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Bank reference number (אסמכתא)
        #[arg(long)]
        reference: Option<String>,
    },
    /// List recent transactions
    List {
        /// Account name or ID
        #[arg(short, long)]
        account: Option<String>,
        #[command(flatten)]
        period: PeriodArgs,
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Search transactions
    Search {
        /// Free text matched against description, notes, tags and reference
        query: Option<String>,
        #[command(flatten)]
        period: PeriodArgs,
        /// Category name or ID (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,
        /// Account name or ID (repeatable)
        #[arg(short, long = "account")]
        accounts: Vec<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Kind: expense, income or transfer (repeatable)
        #[arg(short, long = "kind")]
        kinds: Vec<String>,
        #[arg(long)]
        min: Option<String>,
        #[arg(long)]
        max: Option<String>,
        /// Only transactions without a category
        #[arg(long)]
        uncategorized: bool,
        /// Sort by date, amount or description
        #[arg(long, default_value = "date")]
        sort: String,
        /// Oldest (or smallest) first
        #[arg(long)]
        asc: bool,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Show one transaction
    Show {
        /// Transaction ID or short ID
        id: String,
    },
    /// Edit a transaction
    Edit {
        /// Transaction ID or short ID
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        /// Category name or ID
        #[arg(short, long, conflicts_with = "clear_category")]
        category: Option<String>,
        /// Remove the category
        #[arg(long)]
        clear_category: bool,
        /// Move to another account
        #[arg(short, long)]
        account: Option<String>,
        /// Replace the tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Delete a transaction
    Delete {
        /// Transaction ID or short ID
        id: String,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(storage: &Storage, cmd: TransactionCommands) -> KesefResult<()> {
    let service = TransactionService::new(storage);
    let accounts = AccountService::new(storage);
    let categories = CategoryService::new(storage);
    let settings = storage.settings()?;

    match cmd {
        TransactionCommands::Add {
            description,
            amount,
            kind,
            account,
            to,
            category,
            date,
            tags,
            notes,
            reference,
        } => {
            let kind = parse_kind(&kind)?;
            let account = resolve_account(&accounts, account.as_deref())?;
            let amount = parse_money_arg("amount", &amount)?;
            let date = match date {
                Some(d) => parse_date_arg("date", &d)?,
                None => today(),
            };

            let mut input = CreateTransactionInput::new(kind, account.id, date, amount, description);
            if let Some(to) = to {
                input.to_account_id = Some(accounts.require(&to)?.id);
            }
            if let Some(category) = category {
                input.category_id = Some(categories.require(&category)?.id);
            }
            input.tags = tags;
            input.notes = notes;
            input.reference = reference;

            let txn = service.create(input)?;
            println!(
                "נרשמה {}: {} {} ({})",
                txn.kind,
                txn.description,
                txn.amount.format_with_symbol(&settings.currency_symbol),
                settings.format_date(txn.date)
            );
            println!("  מזהה: {}", txn.id.short());
        }

        TransactionCommands::List {
            account,
            period,
            limit,
        } => {
            let period = period.resolve(None)?;
            let mut filter = TransactionFilter::new().limit(limit);
            if let Some(start) = period.start {
                filter = filter.from_date(start);
            }
            if let Some(end) = period.end {
                filter = filter.to_date(end);
            }
            if let Some(account) = account {
                filter = filter.account(accounts.require(&account)?.id);
            }

            let txns = service.list(&filter)?;
            let names = NameLookup::load(storage)?;
            print!("{}", format_transaction_table(&txns, &names, &settings));
        }

        TransactionCommands::Search {
            query,
            period,
            categories: category_args,
            accounts: account_args,
            tags,
            kinds,
            min,
            max,
            uncategorized,
            sort,
            asc,
            limit,
            offset,
        } => {
            let period = period.resolve(None)?;
            let sort_field = SortField::parse(&sort)
                .ok_or_else(|| KesefError::invalid("sort", format!("שדה מיון לא מוכר: '{}'", sort)))?;
            let order = if asc {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            };

            let mut filter = TransactionFilter::new().sort(sort_field, order).offset(offset);
            if let Some(query) = query {
                filter = filter.query(query);
            }
            if let Some(start) = period.start {
                filter = filter.from_date(start);
            }
            if let Some(end) = period.end {
                filter = filter.to_date(end);
            }
            for category in &category_args {
                filter = filter.category(categories.require(category)?.id);
            }
            for account in &account_args {
                filter = filter.account(accounts.require(account)?.id);
            }
            for tag in tags {
                filter = filter.tag(tag);
            }
            for kind in &kinds {
                filter = filter.kind(parse_kind(kind)?);
            }
            if let Some(min) = min {
                filter = filter.min_amount(parse_money_arg("min", &min)?);
            }
            if let Some(max) = max {
                filter = filter.max_amount(parse_money_arg("max", &max)?);
            }
            if uncategorized {
                filter = filter.uncategorized();
            }
            if let Some(limit) = limit {
                filter = filter.limit(limit);
            }

            let total = service.count(&filter)?;
            let txns = service.list(&filter)?;
            let names = NameLookup::load(storage)?;
            print!("{}", format_transaction_table(&txns, &names, &settings));
            if total > txns.len() {
                println!("מוצגות {} מתוך {} תנועות", txns.len(), total);
            }
        }

        TransactionCommands::Show { id } => {
            let txn = service.require(&id)?;
            let names = NameLookup::load(storage)?;
            print!("{}", format_transaction_details(&txn, &names, &settings));
        }

        TransactionCommands::Edit {
            id,
            description,
            amount,
            date,
            category,
            clear_category,
            account,
            tags,
            notes,
        } => {
            let txn = service.require(&id)?;

            let mut input = UpdateTransactionInput {
                description,
                notes,
                ..Default::default()
            };
            if let Some(amount) = amount {
                input.amount = Some(parse_money_arg("amount", &amount)?);
            }
            if let Some(date) = date {
                input.date = Some(parse_date_arg("date", &date)?);
            }
            if clear_category {
                input.category_id = Some(None);
            } else if let Some(category) = category {
                input.category_id = Some(Some(categories.require(&category)?.id));
            }
            if let Some(account) = account {
                input.account_id = Some(accounts.require(&account)?.id);
            }
            if !tags.is_empty() {
                input.tags = Some(tags);
            }

            let updated = service.update(txn.id, input)?;
            println!("עודכנה תנועה {}: {}", updated.id.short(), updated.description);
        }

        TransactionCommands::Delete { id } => {
            let txn = service.require(&id)?;
            let deleted = service.delete(txn.id)?;
            println!(
                "נמחקה תנועה {}: {} {}",
                deleted.id.short(),
                deleted.description,
                deleted.amount.format_with_symbol(&settings.currency_symbol)
            );
        }
    }

    Ok(())
}

fn parse_kind(s: &str) -> KesefResult<TransactionKind> {
    TransactionKind::parse(s).ok_or_else(|| {
        KesefError::invalid(
            "kind",
            format!("סוג תנועה לא מוכר: '{}' (expense, income, transfer)", s),
        )
    })
}

/// The named account, or the default account when none is given
fn resolve_account(service: &AccountService, name: Option<&str>) -> KesefResult<Account> {
    match name {
        Some(name) => service.require(name),
        None => service.default_account()?.ok_or_else(|| {
            KesefError::invalid("account", "לא הוגדר חשבון ברירת מחדל; יש לציין --account")
        }),
    }
}
