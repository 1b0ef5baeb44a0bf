//! Report formatting for terminal output

use tabled::Tabled;

use super::{format_bar, format_percentage, money, render_table};
use crate::analytics::{AccountFlow, CategoryBreakdown, MonthlyPoint, TaxYearSummary, Totals};
use crate::config::Settings;
use crate::migration::{IntegrityReport, RepairReport};
use crate::models::CategoryKind;

/// Income, expenses, net and savings rate for a period
pub fn format_totals(title: &str, totals: &Totals, settings: &Settings) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}\n", title));
    output.push_str(&format!("{}\n", "─".repeat(40)));
    output.push_str(&format!("  הכנסות:        {:>16}\n", money(totals.income, settings)));
    output.push_str(&format!("  הוצאות:        {:>16}\n", money(totals.expenses, settings)));
    output.push_str(&format!("  נטו:           {:>16}\n", money(totals.net(), settings)));
    if !totals.transfers.is_zero() {
        output.push_str(&format!("  העברות:        {:>16}\n", money(totals.transfers, settings)));
    }
    output.push_str(&format!("  מספר תנועות:   {:>16}\n", totals.transaction_count));

    match totals.savings_rate() {
        Some(rate) => {
            output.push_str(&format!("  שיעור חיסכון:  {:>16}\n", format_percentage(rate)));
            let goal = settings.savings_goal_percent as f64;
            if goal > 0.0 && rate < goal {
                output.push_str(&format!("  מתחת ליעד החיסכון ({}%)\n", settings.savings_goal_percent));
            }
        }
        None => output.push_str("  שיעור חיסכון:  אין הכנסות בתקופה\n"),
    }
    output
}

#[derive(Tabled)]
struct BreakdownRow {
    #[tabled(rename = "קטגוריה")]
    name: String,
    #[tabled(rename = "סה\"כ")]
    total: String,
    #[tabled(rename = "תנועות")]
    count: usize,
    #[tabled(rename = "חלק")]
    share: String,
    #[tabled(rename = "תקציב")]
    budget: String,
    #[tabled(rename = "")]
    bar: String,
}

/// Category breakdown, expenses then income
pub fn format_category_breakdown(rows: &[CategoryBreakdown], settings: &Settings) -> String {
    if rows.is_empty() {
        return "אין תנועות בתקופה.\n".to_string();
    }

    let mut output = String::new();
    for kind in [CategoryKind::Expense, CategoryKind::Income] {
        let group: Vec<&CategoryBreakdown> = rows.iter().filter(|r| r.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        let max = group.iter().map(|r| r.total.as_f64()).fold(0.0, f64::max);

        let table_rows: Vec<BreakdownRow> = group
            .iter()
            .map(|r| BreakdownRow {
                name: if r.is_over_budget() {
                    format!("{} ⚠", r.name)
                } else {
                    r.name.clone()
                },
                total: money(r.total, settings),
                count: r.transaction_count,
                share: format_percentage(r.share),
                budget: r.budget.map(|b| money(b, settings)).unwrap_or_default(),
                bar: format_bar(r.total.as_f64(), max, 15),
            })
            .collect();

        let title = match kind {
            CategoryKind::Expense => "הוצאות לפי קטגוריה",
            CategoryKind::Income => "הכנסות לפי קטגוריה",
        };
        output.push_str(&format!("{}\n", title));
        output.push_str(&render_table(table_rows, &[1, 2, 3, 4]));
        output.push_str("\n\n");
    }
    output
}

#[derive(Tabled)]
struct FlowRow {
    #[tabled(rename = "חשבון")]
    name: String,
    #[tabled(rename = "נכנס")]
    inflow: String,
    #[tabled(rename = "יוצא")]
    outflow: String,
    #[tabled(rename = "נטו")]
    net: String,
    #[tabled(rename = "תנועות")]
    count: usize,
}

pub fn format_account_flows(flows: &[AccountFlow], settings: &Settings) -> String {
    if flows.is_empty() {
        return "אין חשבונות.\n".to_string();
    }
    let rows: Vec<FlowRow> = flows
        .iter()
        .map(|f| FlowRow {
            name: f.name.clone(),
            inflow: money(f.inflow, settings),
            outflow: money(f.outflow, settings),
            net: money(f.net(), settings),
            count: f.transaction_count,
        })
        .collect();
    let mut output = render_table(rows, &[1, 2, 3, 4]);
    output.push('\n');
    output
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "חודש")]
    month: String,
    #[tabled(rename = "הכנסות")]
    income: String,
    #[tabled(rename = "הוצאות")]
    expenses: String,
    #[tabled(rename = "נטו")]
    net: String,
    #[tabled(rename = "הוצאות (גרף)")]
    bar: String,
}

/// One row per month with an expense bar
pub fn format_trend(points: &[MonthlyPoint], settings: &Settings) -> String {
    if points.is_empty() {
        return "אין נתונים להצגה.\n".to_string();
    }
    let max = points
        .iter()
        .map(|p| p.totals.expenses.as_f64())
        .fold(0.0, f64::max);

    let rows: Vec<TrendRow> = points
        .iter()
        .map(|p| TrendRow {
            month: format!("{} {}", p.month.hebrew_month_name(), p.month.year),
            income: money(p.totals.income, settings),
            expenses: money(p.totals.expenses, settings),
            net: money(p.totals.net(), settings),
            bar: format_bar(p.totals.expenses.as_f64(), max, 20),
        })
        .collect();
    let mut output = render_table(rows, &[1, 2, 3]);
    output.push('\n');
    output
}

#[derive(Tabled)]
struct TaxYearRow {
    #[tabled(rename = "שנת מס")]
    label: String,
    #[tabled(rename = "תקופה")]
    period: String,
    #[tabled(rename = "הכנסות")]
    income: String,
    #[tabled(rename = "הוצאות")]
    expenses: String,
    #[tabled(rename = "נטו")]
    net: String,
    #[tabled(rename = "חיסכון")]
    savings: String,
}

pub fn format_tax_years(summaries: &[TaxYearSummary], settings: &Settings) -> String {
    if summaries.is_empty() {
        return "אין תנועות.\n".to_string();
    }
    let rows: Vec<TaxYearRow> = summaries
        .iter()
        .map(|s| TaxYearRow {
            label: s.tax_year.label(),
            period: format!(
                "{} - {}",
                settings.format_date(s.tax_year.start()),
                settings.format_date(s.tax_year.end())
            ),
            income: money(s.totals.income, settings),
            expenses: money(s.totals.expenses, settings),
            net: money(s.totals.net(), settings),
            savings: s
                .totals
                .savings_rate()
                .map(format_percentage)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    let mut output = render_table(rows, &[2, 3, 4, 5]);
    output.push('\n');
    output
}

pub fn format_integrity_report(report: &IntegrityReport) -> String {
    if report.is_clean() {
        return "✓ לא נמצאו בעיות בנתונים\n".to_string();
    }
    let mut output = format!("נמצאו {} בעיות:\n", report.len());
    for issue in &report.issues {
        output.push_str(&format!("  • {}\n", issue));
    }
    output
}

pub fn format_repair_report(report: &RepairReport) -> String {
    let mut output = String::new();
    if report.changed() {
        output.push_str(&format!("בוצעו {} תיקונים:\n", report.actions.len()));
        for action in &report.actions {
            output.push_str(&format!("  • {}\n", action));
        }
    } else {
        output.push_str("לא נדרשו תיקונים\n");
    }
    if !report.remaining.is_clean() {
        output.push('\n');
        output.push_str(&format_integrity_report(&report.remaining));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, TaxYear, YearMonth};

    fn totals(income: i64, expenses: i64) -> Totals {
        Totals {
            income: Money::from_shekels(income, 0),
            expenses: Money::from_shekels(expenses, 0),
            transfers: Money::zero(),
            transaction_count: 2,
        }
    }

    #[test]
    fn test_totals_flag_low_savings() {
        let out = format_totals("מרץ 2025", &totals(10000, 9500), &Settings::default());
        assert!(out.contains("₪10,000.00"));
        assert!(out.contains("5.0%"));
        assert!(out.contains("מתחת ליעד"));

        let out = format_totals("ריק", &totals(0, 100), &Settings::default());
        assert!(out.contains("אין הכנסות"));
    }

    #[test]
    fn test_tax_year_rows() {
        let summaries = vec![TaxYearSummary {
            tax_year: TaxYear::starting(2024),
            totals: totals(120000, 90000),
        }];
        let out = format_tax_years(&summaries, &Settings::default());
        assert!(out.contains("2024/25"));
        assert!(out.contains("01/04/2024 - 31/03/2025"));
        assert!(out.contains("25%"));
    }

    #[test]
    fn test_trend_uses_hebrew_months() {
        let points = vec![MonthlyPoint {
            month: YearMonth::new(2025, 1).unwrap(),
            totals: totals(100, 50),
        }];
        let out = format_trend(&points, &Settings::default());
        assert!(out.contains("ינואר 2025"));
    }

    #[test]
    fn test_clean_integrity_report() {
        let out = format_integrity_report(&IntegrityReport::default());
        assert!(out.contains("לא נמצאו בעיות"));
    }
}
