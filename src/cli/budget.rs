//! Budget CLI commands

use clap::Subcommand;

use super::{parse_date_arg, parse_money_arg, parse_month_arg, today};
use crate::display::{format_budget_progress, format_budget_table};
use crate::error::{KesefError, KesefResult};
use crate::models::{CategoryId, Money};
use crate::services::{BudgetService, CategoryService, CreateBudgetInput};
use crate::storage::Storage;
use crate::validation::Validate;

/// Budget subcommands
#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget for a date range or a calendar month
    Create {
        /// Budget name (defaults to the month name with --month)
        #[arg(short, long)]
        name: Option<String>,
        /// Calendar month (YYYY-MM); seeded from category monthly budgets
        #[arg(short, long, conflicts_with_all = ["from", "to"])]
        month: Option<String>,
        /// Start date (DD/MM/YYYY)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// End date (DD/MM/YYYY)
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Allocation as CATEGORY=AMOUNT (repeatable)
        #[arg(short, long = "alloc")]
        allocations: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List budgets
    List {
        /// Only active, unexpired budgets
        #[arg(short, long)]
        active: bool,
    },
    /// Show spending against a budget (all active budgets by default)
    Status {
        /// Budget name or ID
        budget: Option<String>,
    },
    /// Set a category's allocation; zero removes it
    Allocate {
        /// Budget name or ID
        budget: String,
        /// Category name or ID
        category: String,
        /// Amount in shekels
        amount: String,
    },
    /// Close a budget
    Close {
        /// Budget name or ID
        budget: String,
    },
    /// Delete a budget
    Delete {
        /// Budget name or ID
        budget: String,
    },
}

/// Handle a budget command
pub fn handle_budget_command(storage: &Storage, cmd: BudgetCommands) -> KesefResult<()> {
    let service = BudgetService::new(storage);
    let categories = CategoryService::new(storage);
    let settings = storage.settings()?;

    match cmd {
        BudgetCommands::Create {
            name,
            month,
            from,
            to,
            allocations,
            notes,
        } => {
            let allocations = allocations
                .iter()
                .map(|value| parse_allocation(&categories, value))
                .collect::<KesefResult<Vec<_>>>()?;

            let budget = match (month, from, to) {
                (Some(month), _, _) => {
                    let month = parse_month_arg(&month)?;
                    let mut budget = service.create_monthly(month)?;
                    for (category_id, amount) in allocations {
                        budget = service.allocate(budget.id, category_id, amount)?;
                    }
                    if name.is_some() || notes.is_some() {
                        let before = budget.clone();
                        if let Some(name) = name {
                            budget.name = name;
                        }
                        if let Some(notes) = notes {
                            budget.notes = notes;
                        }
                        budget.touch();
                        budget.validate()?;
                        storage.budgets.update(budget.clone())?;
                        storage.log_update(&before, &budget)?;
                    }
                    budget
                }
                (None, Some(from), Some(to)) => {
                    let name = name.ok_or_else(|| {
                        KesefError::invalid("name", "יש לציין שם לתקציב (--name)")
                    })?;
                    service.create(CreateBudgetInput {
                        name,
                        start_date: parse_date_arg("from", &from)?,
                        end_date: parse_date_arg("to", &to)?,
                        allocations,
                        notes: notes.unwrap_or_default(),
                    })?
                }
                _ => {
                    return Err(KesefError::invalid(
                        "period",
                        "יש לציין --month או --from ו---to",
                    ))
                }
            };

            println!("נוצר תקציב: {}", budget.name);
            println!(
                "  {} - {}",
                settings.format_date(budget.start_date),
                settings.format_date(budget.end_date)
            );
            println!(
                "  סה\"כ מוקצה: {} ב-{} קטגוריות",
                budget.total_allocated().format_with_symbol(&settings.currency_symbol),
                budget.allocations.len()
            );
            println!("  מזהה: {}", budget.id.short());
        }

        BudgetCommands::List { active } => {
            let budgets = if active {
                service.list_active(today())?
            } else {
                service.list()?
            };
            print!("{}", format_budget_table(&budgets, &settings));
        }

        BudgetCommands::Status { budget } => {
            let budgets = match budget {
                Some(identifier) => vec![service.require(&identifier)?],
                None => service.list_active(today())?,
            };
            if budgets.is_empty() {
                println!("אין תקציבים פעילים.");
            }
            for (i, budget) in budgets.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                let progress = service.status(budget.id)?;
                print!("{}", format_budget_progress(&progress, &settings));
            }
        }

        BudgetCommands::Allocate {
            budget,
            category,
            amount,
        } => {
            let found = service.require(&budget)?;
            let category = categories.require(&category)?;
            let amount = parse_money_arg("amount", &amount)?;
            let updated = service.allocate(found.id, category.id, amount)?;
            println!(
                "{}: {} ל'{}'",
                updated.name,
                amount.format_with_symbol(&settings.currency_symbol),
                category.name
            );
        }

        BudgetCommands::Close { budget } => {
            let found = service.require(&budget)?;
            let closed = service.close(found.id)?;
            println!("התקציב '{}' נסגר", closed.name);
        }

        BudgetCommands::Delete { budget } => {
            let found = service.require(&budget)?;
            let deleted = service.delete(found.id)?;
            println!("נמחק תקציב: {}", deleted.name);
        }
    }

    Ok(())
}

/// Parse `CATEGORY=AMOUNT`
fn parse_allocation(categories: &CategoryService, value: &str) -> KesefResult<(CategoryId, Money)> {
    let (name, amount) = value.rsplit_once('=').ok_or_else(|| {
        KesefError::invalid("alloc", format!("הקצאה לא תקינה: '{}' (קטגוריה=סכום)", value))
    })?;
    let category = categories.require(name.trim())?;
    let amount = parse_money_arg("alloc", amount)?;
    Ok((category.id, amount))
}
