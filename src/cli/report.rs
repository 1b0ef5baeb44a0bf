//! CLI commands for reports
//!
//! Reports default to the current calendar month; `--tax-year` switches to
//! the Israeli tax year (April through March).

use clap::Subcommand;

use super::{today, Period, PeriodArgs};
use crate::analytics::{
    by_account, by_category, monthly_trend, monthly_trend_all, tax_year_summary, Totals,
};
use crate::display::{
    format_account_flows, format_category_breakdown, format_tax_years, format_totals, format_trend,
};
use crate::error::KesefResult;
use crate::models::{TaxYear, Transaction, YearMonth};
use crate::storage::Storage;

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Income, expenses and savings rate for a period
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Totals per category, with monthly budgets for comparison
    #[command(alias = "spending")]
    Categories {
        #[command(flatten)]
        period: PeriodArgs,

        /// Show the N largest categories of each kind only
        #[arg(long)]
        top: Option<usize>,
    },

    /// Inflow and outflow per account, transfers included
    Accounts {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Month by month totals
    Trend {
        /// Number of months back from the current month
        #[arg(short = 'n', long, default_value = "12")]
        months: u32,

        /// Cover every month from the first transaction to the last
        #[arg(long)]
        all: bool,
    },

    /// Totals per tax year, or the detail of a single tax year
    TaxYear {
        /// Starting calendar year (2024 = 01/04/2024 - 31/03/2025)
        year: Option<i32>,
    },
}

/// Handle report commands
pub fn handle_report_command(storage: &Storage, cmd: ReportCommands) -> KesefResult<()> {
    match cmd {
        ReportCommands::Summary { period } => handle_summary_report(storage, period),
        ReportCommands::Categories { period, top } => handle_category_report(storage, period, top),
        ReportCommands::Accounts { period } => handle_account_report(storage, period),
        ReportCommands::Trend { months, all } => handle_trend_report(storage, months, all),
        ReportCommands::TaxYear { year } => handle_tax_year_report(storage, year),
    }
}

fn handle_summary_report(storage: &Storage, args: PeriodArgs) -> KesefResult<()> {
    let settings = storage.settings()?;
    let period = args.resolve(Some(YearMonth::of(today())))?;
    let transactions = transactions_in(storage, &period)?;

    let totals = Totals::compute(&transactions);
    print!("{}", format_totals(&period.title, &totals, &settings));
    Ok(())
}

fn handle_category_report(storage: &Storage, args: PeriodArgs, top: Option<usize>) -> KesefResult<()> {
    let settings = storage.settings()?;
    let period = args.resolve(Some(YearMonth::of(today())))?;
    let transactions = transactions_in(storage, &period)?;
    let categories = storage.categories.all()?;

    let mut rows = by_category(&transactions, &categories, months_covered(&period, &transactions));
    if let Some(top) = top {
        let mut kept = Vec::with_capacity(rows.len());
        let mut seen = std::collections::HashMap::new();
        for row in rows {
            let count = seen.entry(row.kind).or_insert(0usize);
            if *count < top {
                *count += 1;
                kept.push(row);
            }
        }
        rows = kept;
    }

    println!("{}\n", period.title);
    print!("{}", format_category_breakdown(&rows, &settings));
    Ok(())
}

fn handle_account_report(storage: &Storage, args: PeriodArgs) -> KesefResult<()> {
    let settings = storage.settings()?;
    let period = args.resolve(Some(YearMonth::of(today())))?;
    let transactions = transactions_in(storage, &period)?;
    let accounts = storage.accounts.find(|a| a.is_active)?;

    println!("{}\n", period.title);
    print!("{}", format_account_flows(&by_account(&transactions, &accounts), &settings));
    Ok(())
}

fn handle_trend_report(storage: &Storage, months: u32, all: bool) -> KesefResult<()> {
    let settings = storage.settings()?;
    let transactions = storage.transactions.all()?;

    let points = if all {
        monthly_trend_all(&transactions)
    } else {
        let end = YearMonth::of(today());
        let mut start = end;
        for _ in 1..months.max(1) {
            start = start.prev();
        }
        monthly_trend(&transactions, start.first_day(), end.last_day())
    };

    print!("{}", format_trend(&points, &settings));
    Ok(())
}

fn handle_tax_year_report(storage: &Storage, year: Option<i32>) -> KesefResult<()> {
    let settings = storage.settings()?;
    let transactions = storage.transactions.all()?;

    match year {
        Some(year) => {
            let tax_year = TaxYear::starting(year);
            let in_year: Vec<Transaction> = transactions
                .into_iter()
                .filter(|t| tax_year.contains(t.date))
                .collect();
            let title = format!(
                "שנת מס {} ({} - {})",
                tax_year.label(),
                settings.format_date(tax_year.start()),
                settings.format_date(tax_year.end())
            );
            print!("{}", format_totals(&title, &Totals::compute(&in_year), &settings));
            println!();

            let categories = storage.categories.all()?;
            print!(
                "{}",
                format_category_breakdown(&by_category(&in_year, &categories, 12), &settings)
            );
        }
        None => {
            print!("{}", format_tax_years(&tax_year_summary(&transactions), &settings));
        }
    }
    Ok(())
}

fn transactions_in(storage: &Storage, period: &Period) -> KesefResult<Vec<Transaction>> {
    storage.transactions.find(|t| period.contains(t.date))
}

/// Calendar months the period spans, for scaling monthly budgets
fn months_covered(period: &Period, transactions: &[Transaction]) -> u32 {
    let start = period.start.or_else(|| transactions.iter().map(|t| t.date).min());
    let end = period.end.or_else(|| transactions.iter().map(|t| t.date).max());
    match (start, end) {
        (Some(start), Some(end)) if start <= end => {
            YearMonth::of(start).range_to(YearMonth::of(end)).len() as u32
        }
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_covered() {
        let quarter = Period {
            start: Some(date(2025, 1, 15)),
            end: Some(date(2025, 3, 2)),
            title: String::new(),
        };
        assert_eq!(months_covered(&quarter, &[]), 3);

        let open = Period {
            start: None,
            end: None,
            title: String::new(),
        };
        assert_eq!(months_covered(&open, &[]), 1);
    }
}
