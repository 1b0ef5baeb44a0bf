//! Display formatting for terminal output
//!
//! Tables are rendered with `tabled`. Amounts use the currency symbol and
//! dates use the format from [`Settings`].

pub mod account;
pub mod budget;
pub mod category;
pub mod report;
pub mod transaction;

use std::collections::HashMap;

use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use crate::config::Settings;
use crate::error::KesefResult;
use crate::models::{AccountId, CategoryId, Money};
use crate::storage::Storage;

pub use account::{format_account_details, format_account_table};
pub use budget::{format_budget_progress, format_budget_table};
pub use category::format_category_table;
pub use report::{
    format_account_flows, format_category_breakdown, format_integrity_report, format_repair_report,
    format_tax_years, format_totals, format_trend,
};
pub use transaction::{format_transaction_details, format_transaction_table};

/// Account and category names by id, loaded once per command
#[derive(Debug, Clone, Default)]
pub struct NameLookup {
    accounts: HashMap<AccountId, String>,
    categories: HashMap<CategoryId, String>,
}

impl NameLookup {
    pub fn load(storage: &Storage) -> KesefResult<Self> {
        Ok(Self {
            accounts: storage
                .accounts
                .all()?
                .into_iter()
                .map(|a| (a.id, a.name))
                .collect(),
            categories: storage
                .categories
                .all()?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect(),
        })
    }

    pub fn account(&self, id: AccountId) -> String {
        self.accounts.get(&id).cloned().unwrap_or_else(|| id.short())
    }

    /// Empty for uncategorized
    pub fn category(&self, id: Option<CategoryId>) -> String {
        match id {
            Some(id) => self.categories.get(&id).cloned().unwrap_or_else(|| id.short()),
            None => String::new(),
        }
    }
}

/// Amount with the configured currency symbol
pub fn money(amount: Money, settings: &Settings) -> String {
    amount.format_with_symbol(&settings.currency_symbol)
}

/// Render rows as a table, right-aligning the given columns
pub fn render_table<T: Tabled>(rows: Vec<T>, numeric_columns: &[usize]) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    for &column in numeric_columns {
        table.with(Modify::new(Columns::single(column)).with(Alignment::right()));
    }
    table.to_string()
}

pub fn format_percentage(pct: f64) -> String {
    if pct > 0.0 && pct < 10.0 {
        format!("{:.1}%", pct)
    } else {
        format!("{:.0}%", pct)
    }
}

/// Horizontal bar scaled against `max_value`
pub fn format_bar(value: f64, max_value: f64, width: usize) -> String {
    if max_value <= 0.0 || value <= 0.0 {
        return " ".repeat(width);
    }
    let filled = (((value / max_value) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Shorten to `max_chars` characters with an ellipsis
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "שם")]
        name: String,
        #[tabled(rename = "סכום")]
        amount: String,
    }

    #[test]
    fn test_render_table() {
        let out = render_table(
            vec![Row {
                name: "מזון".into(),
                amount: "₪1,200.00".into(),
            }],
            &[1],
        );
        assert!(out.contains("שם"));
        assert!(out.contains("₪1,200.00"));
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("שופרסל", 10), "שופרסל");
        assert_eq!(truncate("שופרסל דיל", 5), "שופר…");
    }

    #[test]
    fn test_format_bar_and_percentage() {
        assert_eq!(format_bar(5.0, 10.0, 4), "██░░");
        assert_eq!(format_bar(0.0, 10.0, 3), "   ");
        assert_eq!(format_percentage(7.26), "7.3%");
        assert_eq!(format_percentage(42.4), "42%");
    }

    #[test]
    fn test_money_uses_settings_symbol() {
        let mut settings = Settings::default();
        settings.currency_symbol = "NIS ".into();
        assert_eq!(money(Money::from_shekels(12, 5), &settings), "NIS 12.05");
    }
}
