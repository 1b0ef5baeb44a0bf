//! Account display formatting
//!
//! Account numbers are masked in tables; ID numbers are never printed.

use tabled::Tabled;

use super::{money, render_table};
use crate::config::Settings;
use crate::models::{Account, Money};

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "שם")]
    name: String,
    #[tabled(rename = "סוג")]
    kind: String,
    #[tabled(rename = "בנק")]
    bank: String,
    #[tabled(rename = "מספר חשבון")]
    number: String,
    #[tabled(rename = "יתרה")]
    balance: String,
    #[tabled(rename = "סטטוס")]
    status: String,
}

/// Accounts with balances and a total row
pub fn format_account_table(accounts: &[Account], settings: &Settings) -> String {
    if accounts.is_empty() {
        return "לא נמצאו חשבונות.\n".to_string();
    }

    let mut rows: Vec<AccountRow> = accounts
        .iter()
        .map(|account| AccountRow {
            name: account.name.clone(),
            kind: account.kind.label().to_string(),
            bank: match (account.bank_name.as_str(), account.branch_number.as_str()) {
                ("", _) => String::new(),
                (bank, "") => bank.to_string(),
                (bank, branch) => format!("{} ({})", bank, branch),
            },
            number: account.masked_account_number(),
            balance: money(account.balance, settings),
            status: if account.is_active { "" } else { "לא פעיל" }.to_string(),
        })
        .collect();

    let total: Money = accounts
        .iter()
        .filter(|a| a.is_active)
        .map(|a| a.balance)
        .sum();
    rows.push(AccountRow {
        name: "סה\"כ".to_string(),
        kind: String::new(),
        bank: String::new(),
        number: String::new(),
        balance: money(total, settings),
        status: String::new(),
    });

    let mut output = render_table(rows, &[4]);
    output.push('\n');
    output
}

/// A single account's details
pub fn format_account_details(account: &Account, settings: &Settings) -> String {
    let mut output = String::new();

    output.push_str(&format!("חשבון: {}\n", account.name));
    output.push_str(&format!("  סוג:            {}\n", account.kind));
    output.push_str(&format!("  מזהה:           {}\n", account.id.short()));
    if !account.bank_name.is_empty() {
        output.push_str(&format!("  בנק:            {}\n", account.bank_name));
    }
    if !account.branch_number.is_empty() {
        output.push_str(&format!("  סניף:           {}\n", account.branch_number));
    }
    if !account.account_number.is_empty() {
        output.push_str(&format!("  מספר חשבון:     {}\n", account.masked_account_number()));
    }
    if !account.owner_phone.is_empty() {
        output.push_str(&format!("  טלפון:          {}\n", account.owner_phone));
    }
    output.push_str(&format!("  יתרת פתיחה:     {}\n", money(account.opening_balance, settings)));
    output.push_str(&format!("  יתרה נוכחית:    {}\n", money(account.balance, settings)));
    if !account.is_active {
        output.push_str("  סטטוס:          לא פעיל\n");
    }

    output
}
