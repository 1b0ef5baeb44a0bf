//! Transaction display formatting

use tabled::Tabled;

use super::{money, render_table, truncate, NameLookup};
use crate::config::Settings;
use crate::models::Transaction;

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "מזהה")]
    id: String,
    #[tabled(rename = "תאריך")]
    date: String,
    #[tabled(rename = "סוג")]
    kind: String,
    #[tabled(rename = "תיאור")]
    description: String,
    #[tabled(rename = "קטגוריה")]
    category: String,
    #[tabled(rename = "חשבון")]
    account: String,
    #[tabled(rename = "סכום")]
    amount: String,
    #[tabled(rename = "תגיות")]
    tags: String,
}

/// Register table; expenses and outgoing transfers show as negative
pub fn format_transaction_table(
    transactions: &[Transaction],
    names: &NameLookup,
    settings: &Settings,
) -> String {
    if transactions.is_empty() {
        return "לא נמצאו תנועות.\n".to_string();
    }

    let rows: Vec<TransactionRow> = transactions
        .iter()
        .map(|txn| {
            let account = match txn.to_account_id {
                Some(target) => format!("{} → {}", names.account(txn.account_id), names.account(target)),
                None => names.account(txn.account_id),
            };
            let shown = if txn.is_income() { txn.amount } else { -txn.amount };
            TransactionRow {
                id: txn.id.short(),
                date: settings.format_date(txn.date),
                kind: txn.kind.label().to_string(),
                description: truncate(&txn.description, 30),
                category: names.category(txn.category_id),
                account,
                amount: money(shown, settings),
                tags: txn.tags.join(", "),
            }
        })
        .collect();

    let mut output = render_table(rows, &[6]);
    output.push('\n');
    output
}

/// Full details of one transaction
pub fn format_transaction_details(txn: &Transaction, names: &NameLookup, settings: &Settings) -> String {
    let mut output = String::new();

    output.push_str(&format!("תנועה:     {} ({})\n", txn.id.short(), txn.id));
    output.push_str(&format!("תאריך:     {}\n", settings.format_date(txn.date)));
    output.push_str(&format!("סוג:       {}\n", txn.kind));
    output.push_str(&format!("סכום:      {}\n", money(txn.amount, settings)));
    output.push_str(&format!("תיאור:     {}\n", txn.description));
    output.push_str(&format!("חשבון:     {}\n", names.account(txn.account_id)));
    if let Some(target) = txn.to_account_id {
        output.push_str(&format!("לחשבון:    {}\n", names.account(target)));
    }
    if !txn.is_transfer() {
        let category = names.category(txn.category_id);
        output.push_str(&format!(
            "קטגוריה:   {}\n",
            if category.is_empty() { "(ללא)" } else { category.as_str() }
        ));
    }
    if !txn.tags.is_empty() {
        output.push_str(&format!("תגיות:     {}\n", txn.tags.join(", ")));
    }
    if let Some(reference) = &txn.reference {
        output.push_str(&format!("אסמכתא:    {}\n", reference));
    }
    if !txn.notes.is_empty() {
        output.push_str(&format!("הערות:     {}\n", txn.notes));
    }

    output
}
