//! Budget display formatting

use tabled::Tabled;

use super::{format_bar, format_percentage, money, render_table};
use crate::analytics::BudgetProgress;
use crate::config::Settings;
use crate::models::Budget;

#[derive(Tabled)]
struct BudgetRow {
    #[tabled(rename = "שם")]
    name: String,
    #[tabled(rename = "מתאריך")]
    start: String,
    #[tabled(rename = "עד תאריך")]
    end: String,
    #[tabled(rename = "סה\"כ מוקצה")]
    allocated: String,
    #[tabled(rename = "סטטוס")]
    status: String,
    #[tabled(rename = "מזהה")]
    id: String,
}

pub fn format_budget_table(budgets: &[Budget], settings: &Settings) -> String {
    if budgets.is_empty() {
        return "לא נמצאו תקציבים.\n".to_string();
    }

    let rows: Vec<BudgetRow> = budgets
        .iter()
        .map(|b| BudgetRow {
            name: b.name.clone(),
            start: settings.format_date(b.start_date),
            end: settings.format_date(b.end_date),
            allocated: money(b.total_allocated(), settings),
            status: if b.is_active { "פעיל" } else { "סגור" }.to_string(),
            id: b.id.short(),
        })
        .collect();

    let mut output = render_table(rows, &[3]);
    output.push('\n');
    output
}

#[derive(Tabled)]
struct ProgressRow {
    #[tabled(rename = "קטגוריה")]
    category: String,
    #[tabled(rename = "מוקצה")]
    allocated: String,
    #[tabled(rename = "נוצל")]
    spent: String,
    #[tabled(rename = "נותר")]
    remaining: String,
    #[tabled(rename = "%")]
    percent: String,
    #[tabled(rename = "")]
    bar: String,
}

/// Per-category progress with an over-budget marker
pub fn format_budget_progress(progress: &BudgetProgress, settings: &Settings) -> String {
    let mut output = format!("תקציב: {}\n", progress.name);
    if progress.lines.is_empty() {
        output.push_str("אין הקצאות בתקציב זה.\n");
        return output;
    }

    let mut rows: Vec<ProgressRow> = progress
        .lines
        .iter()
        .map(|line| ProgressRow {
            category: if line.is_over_budget() {
                format!("{} ⚠", line.category_name)
            } else {
                line.category_name.clone()
            },
            allocated: money(line.allocated, settings),
            spent: money(line.spent, settings),
            remaining: money(line.remaining(), settings),
            percent: format_percentage(line.percent_used()),
            bar: format_bar(line.percent_used().min(100.0), 100.0, 20),
        })
        .collect();
    rows.push(ProgressRow {
        category: "סה\"כ".to_string(),
        allocated: money(progress.total_allocated(), settings),
        spent: money(progress.total_spent(), settings),
        remaining: money(progress.total_remaining(), settings),
        percent: format_percentage(progress.percent_used()),
        bar: String::new(),
    });

    output.push_str(&render_table(rows, &[1, 2, 3, 4]));
    output.push('\n');

    let over = progress.over_budget_lines().count();
    if over > 0 {
        output.push_str(&format!("{} קטגוריות חרגו מהתקציב\n", over));
    }
    output
}
