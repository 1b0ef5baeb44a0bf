//! Category display formatting

use tabled::Tabled;

use super::{money, render_table};
use crate::config::Settings;
use crate::models::Category;

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "שם")]
    name: String,
    #[tabled(rename = "סוג")]
    kind: String,
    #[tabled(rename = "תקציב חודשי")]
    budget: String,
    #[tabled(rename = "צבע")]
    color: String,
    #[tabled(rename = "מזהה")]
    id: String,
}

pub fn format_category_table(categories: &[Category], settings: &Settings) -> String {
    if categories.is_empty() {
        return "לא נמצאו קטגוריות.\n".to_string();
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            name: if c.archived {
                format!("{} (בארכיון)", c.name)
            } else {
                c.name.clone()
            },
            kind: c.kind.label().to_string(),
            budget: c
                .monthly_budget
                .map(|b| money(b, settings))
                .unwrap_or_default(),
            color: c.color.clone(),
            id: c.id.short(),
        })
        .collect();

    let mut output = render_table(rows, &[2]);
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryKind, Money};

    #[test]
    fn test_category_table() {
        let cats = vec![
            Category::with_budget("מזון", CategoryKind::Expense, Money::from_shekels(2500, 0)),
            Category::new("משכורת", CategoryKind::Income),
        ];
        let out = format_category_table(&cats, &Settings::default());
        assert!(out.contains("₪2,500.00"));
        assert!(out.contains("הכנסה"));
    }
}
