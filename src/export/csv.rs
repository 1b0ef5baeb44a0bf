//! CSV export
//!
//! Fixed layouts with Hebrew headers. Dates are written `DD/MM/YYYY` and
//! amounts as plain decimals so spreadsheets read them as numbers. An
//! optional UTF-8 byte order mark makes Excel pick the right encoding.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::analytics::by_category;
use crate::error::{KesefError, KesefResult};
use crate::models::{AccountId, CategoryId, Money, TaxYear, Transaction, TransactionId, YearMonth};
use crate::storage::Storage;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Headers of the standard layout, also understood by the CSV importer
pub const STANDARD_HEADERS: [&str; 8] = [
    "תאריך", "תיאור", "סוג", "קטגוריה", "חשבון", "סכום", "תגיות", "הערות",
];

const TAX_HEADERS: [&str; 7] = ["שנת מס", "חודש", "תאריך", "תיאור", "קטגוריה", "הכנסה", "הוצאה"];

const BANK_STATEMENT_HEADERS: [&str; 6] = ["תאריך", "אסמכתא", "תיאור", "חובה", "זכות", "יתרה"];

const CATEGORY_SUMMARY_HEADERS: [&str; 5] = ["קטגוריה", "סוג", "סה\"כ", "מספר תנועות", "תקציב חודשי"];

/// Separator between tags in a single cell
pub const TAG_SEPARATOR: &str = ", ";

/// Column layout of a CSV export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvLayout {
    /// Every field of every transaction
    #[default]
    Standard,
    /// Income and expenses grouped by tax year, transfers omitted
    Tax,
    /// One account's movements with a running balance
    BankStatement,
    /// One row per category
    CategorySummary,
}

impl CsvLayout {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "standard" => Some(Self::Standard),
            "tax" => Some(Self::Tax),
            "bank-statement" | "statement" => Some(Self::BankStatement),
            "category-summary" | "categories" => Some(Self::CategorySummary),
            _ => None,
        }
    }
}

/// Options for [`export_csv`]
#[derive(Debug, Clone, Default)]
pub struct CsvExportOptions {
    pub layout: CsvLayout,
    /// Prefix the output with a UTF-8 byte order mark
    pub include_bom: bool,
    /// Account for the bank statement layout
    pub account_id: Option<AccountId>,
}

fn export_err(e: impl std::fmt::Display) -> KesefError {
    KesefError::Export(e.to_string())
}

fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Write `transactions` in the chosen layout, returning the number of data rows
pub fn export_csv<W: Write>(
    storage: &Storage,
    transactions: &[Transaction],
    mut writer: W,
    options: &CsvExportOptions,
) -> KesefResult<usize> {
    if options.include_bom {
        writer.write_all(UTF8_BOM).map_err(export_err)?;
    }
    let mut csv_writer = csv::Writer::from_writer(writer);

    let rows = match options.layout {
        CsvLayout::Standard => write_standard(storage, transactions, &mut csv_writer)?,
        CsvLayout::Tax => write_tax(storage, transactions, &mut csv_writer)?,
        CsvLayout::BankStatement => {
            let account_id = options.account_id.ok_or_else(|| {
                KesefError::Export("The bank statement layout needs an account".into())
            })?;
            write_bank_statement(storage, transactions, account_id, &mut csv_writer)?
        }
        CsvLayout::CategorySummary => write_category_summary(storage, transactions, &mut csv_writer)?,
    };

    csv_writer.flush().map_err(export_err)?;
    tracing::debug!(rows, layout = ?options.layout, "csv export written");
    Ok(rows)
}

fn category_names(storage: &Storage) -> KesefResult<HashMap<CategoryId, String>> {
    Ok(storage
        .categories
        .all()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

fn account_names(storage: &Storage) -> KesefResult<HashMap<AccountId, String>> {
    Ok(storage
        .accounts
        .all()?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect())
}

fn sorted_by_date(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
    sorted
}

fn write_standard<W: Write>(
    storage: &Storage,
    transactions: &[Transaction],
    out: &mut csv::Writer<W>,
) -> KesefResult<usize> {
    let categories = category_names(storage)?;
    let accounts = account_names(storage)?;
    let name_of = |id: &AccountId| accounts.get(id).cloned().unwrap_or_else(|| id.short());

    out.write_record(STANDARD_HEADERS).map_err(export_err)?;

    let sorted = sorted_by_date(transactions);
    for txn in &sorted {
        let category = txn
            .category_id
            .and_then(|id| categories.get(&id).cloned())
            .unwrap_or_default();
        let account = match txn.to_account_id {
            Some(target) => format!("{} → {}", name_of(&txn.account_id), name_of(&target)),
            None => name_of(&txn.account_id),
        };
        out.write_record([
            format_date(txn.date),
            txn.description.clone(),
            txn.kind.label().to_string(),
            category,
            account,
            txn.amount.to_decimal_string(),
            txn.tags.join(TAG_SEPARATOR),
            txn.notes.clone(),
        ])
        .map_err(export_err)?;
    }
    Ok(sorted.len())
}

fn write_tax<W: Write>(
    storage: &Storage,
    transactions: &[Transaction],
    out: &mut csv::Writer<W>,
) -> KesefResult<usize> {
    let categories = category_names(storage)?;
    out.write_record(TAX_HEADERS).map_err(export_err)?;

    let mut rows = 0;
    for txn in sorted_by_date(transactions).into_iter().filter(|t| !t.is_transfer()) {
        let month = YearMonth::of(txn.date);
        let (income, expense) = if txn.is_income() {
            (txn.amount.to_decimal_string(), String::new())
        } else {
            (String::new(), txn.amount.to_decimal_string())
        };
        out.write_record([
            TaxYear::containing(txn.date).label(),
            format!("{} {}", month.hebrew_month_name(), month.year),
            format_date(txn.date),
            txn.description.clone(),
            txn.category_id
                .and_then(|id| categories.get(&id).cloned())
                .unwrap_or_default(),
            income,
            expense,
        ])
        .map_err(export_err)?;
        rows += 1;
    }
    Ok(rows)
}

fn write_bank_statement<W: Write>(
    storage: &Storage,
    transactions: &[Transaction],
    account_id: AccountId,
    out: &mut csv::Writer<W>,
) -> KesefResult<usize> {
    let account = storage
        .accounts
        .get(account_id)?
        .ok_or_else(|| KesefError::account_not_found(account_id.to_string()))?;

    out.write_record(BANK_STATEMENT_HEADERS).map_err(export_err)?;

    let movements: Vec<&Transaction> = sorted_by_date(transactions)
        .into_iter()
        .filter(|t| t.involves_account(account_id))
        .collect();

    // Balance carried in from stored movements ahead of the first exported row
    let mut balance = account.opening_balance;
    if let Some(first) = movements.first() {
        let first_key = (first.date, first.created_at);
        let exported: HashSet<TransactionId> = movements.iter().map(|t| t.id).collect();
        balance += storage
            .transactions
            .find(|t| {
                t.involves_account(account_id)
                    && !exported.contains(&t.id)
                    && (t.date, t.created_at) < first_key
            })?
            .iter()
            .map(|t| t.effect_on(account_id))
            .sum::<Money>();
    }

    let mut rows = 0;
    for txn in movements {
        let effect = txn.effect_on(account_id);
        balance += effect;
        let (debit, credit) = if effect.is_negative() {
            (effect.abs().to_decimal_string(), String::new())
        } else {
            (String::new(), effect.to_decimal_string())
        };
        out.write_record([
            format_date(txn.date),
            txn.reference.clone().unwrap_or_default(),
            txn.description.clone(),
            debit,
            credit,
            balance.to_decimal_string(),
        ])
        .map_err(export_err)?;
        rows += 1;
    }
    Ok(rows)
}

fn write_category_summary<W: Write>(
    storage: &Storage,
    transactions: &[Transaction],
    out: &mut csv::Writer<W>,
) -> KesefResult<usize> {
    let categories = storage.categories.all()?;
    let budgets: HashMap<CategoryId, Money> = categories
        .iter()
        .filter_map(|c| c.monthly_budget.map(|b| (c.id, b)))
        .collect();

    out.write_record(CATEGORY_SUMMARY_HEADERS).map_err(export_err)?;

    let rows = by_category(transactions, &categories, 1);
    for row in &rows {
        let budget = row
            .category_id
            .and_then(|id| budgets.get(&id))
            .map(|b| b.to_decimal_string())
            .unwrap_or_default();
        out.write_record([
            row.name.clone(),
            row.kind.label().to_string(),
            row.total.to_decimal_string(),
            row.transaction_count.to_string(),
            budget,
        ])
        .map_err(export_err)?;
    }
    Ok(rows.len())
}
