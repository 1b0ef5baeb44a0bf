//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod account;
pub mod budget;
pub mod category;
pub mod check;
pub mod config;
pub mod encrypt;
pub mod export;
pub mod import;
pub mod report;
pub mod transaction;

use chrono::{Local, NaiveDate};
use clap::Args;

use crate::error::{KesefError, KesefResult};
use crate::models::{Money, TaxYear, YearMonth};
use crate::services::import::parse_date;

pub use account::{handle_account_command, AccountCommands};
pub use budget::{handle_budget_command, BudgetCommands};
pub use category::{handle_category_command, CategoryCommands};
pub use check::handle_check_command;
pub use config::{handle_config_command, ConfigCommands};
pub use encrypt::{handle_encrypt_command, read_key, EncryptCommands, KEY_ENV};
pub use export::{handle_export_command, ExportCommands};
pub use import::{handle_import_command, ImportCommands};
pub use report::{handle_report_command, ReportCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a date argument (DD/MM/YYYY, DD/MM/YY or YYYY-MM-DD)
pub fn parse_date_arg(field: &str, value: &str) -> KesefResult<NaiveDate> {
    parse_date(value).map_err(|message| KesefError::invalid(field, message))
}

pub fn parse_money_arg(field: &str, value: &str) -> KesefResult<Money> {
    Money::parse(value).map_err(|e| KesefError::invalid(field, e.to_string()))
}

/// Parse `YYYY-MM` or `MM/YYYY`
pub fn parse_month_arg(value: &str) -> KesefResult<YearMonth> {
    let value = value.trim();
    let parts = value
        .split_once('-')
        .or_else(|| value.split_once('/').map(|(m, y)| (y, m)));
    parts
        .and_then(|(y, m)| {
            let year = y.trim().parse().ok()?;
            let month = m.trim().parse().ok()?;
            YearMonth::new(year, month)
        })
        .ok_or_else(|| KesefError::invalid("month", format!("חודש לא תקין: '{}' (YYYY-MM)", value)))
}

/// Period selection shared by reports and exports
#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// Calendar month (YYYY-MM)
    #[arg(short, long, conflicts_with_all = ["from", "to", "tax_year"])]
    pub month: Option<String>,

    /// Start date (DD/MM/YYYY)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (DD/MM/YYYY)
    #[arg(long)]
    pub to: Option<String>,

    /// Tax year by its starting calendar year (2024 = 01/04/2024 - 31/03/2025)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub tax_year: Option<i32>,
}

/// A resolved date range with a display title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub title: String,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

impl PeriodArgs {
    /// Resolve the arguments, defaulting to `default` when none are given
    pub fn resolve(&self, default: Option<YearMonth>) -> KesefResult<Period> {
        if let Some(month) = &self.month {
            return Ok(month_period(parse_month_arg(month)?));
        }
        if let Some(year) = self.tax_year {
            let tax_year = TaxYear::starting(year);
            return Ok(Period {
                start: Some(tax_year.start()),
                end: Some(tax_year.end()),
                title: format!("שנת מס {}", tax_year.label()),
            });
        }
        let start = self.from.as_deref().map(|s| parse_date_arg("from", s)).transpose()?;
        let end = self.to.as_deref().map(|s| parse_date_arg("to", s)).transpose()?;
        if start.is_some() || end.is_some() {
            if let (Some(s), Some(e)) = (start, end) {
                if e < s {
                    return Err(KesefError::invalid("to", "תאריך הסיום לפני תאריך ההתחלה"));
                }
            }
            let fmt = |d: Option<NaiveDate>| d.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default();
            return Ok(Period {
                start,
                end,
                title: format!("{} - {}", fmt(start), fmt(end)),
            });
        }
        Ok(match default {
            Some(month) => month_period(month),
            None => Period {
                start: None,
                end: None,
                title: "כל התקופה".to_string(),
            },
        })
    }
}

fn month_period(month: YearMonth) -> Period {
    Period {
        start: Some(month.first_day()),
        end: Some(month.last_day()),
        title: format!("{} {}", month.hebrew_month_name(), month.year),
    }
}
