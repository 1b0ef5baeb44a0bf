//! Category CLI commands

use clap::Subcommand;

use super::parse_money_arg;
use crate::display::format_category_table;
use crate::error::{KesefError, KesefResult};
use crate::models::CategoryKind;
use crate::services::{CategoryService, CreateCategoryInput, UpdateCategoryInput};
use crate::storage::Storage;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Add {
        /// Category name
        name: String,
        /// Kind: expense or income
        #[arg(short, long, default_value = "expense")]
        kind: String,
        /// Monthly budget in shekels
        #[arg(short, long)]
        budget: Option<String>,
        /// Display color (#RRGGBB)
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// List categories
    List {
        /// Only this kind (expense or income)
        #[arg(short, long)]
        kind: Option<String>,
        /// Include archived categories
        #[arg(short, long)]
        all: bool,
    },
    /// Edit a category
    Edit {
        /// Category name or ID
        category: String,
        #[arg(short, long)]
        name: Option<String>,
        /// New monthly budget
        #[arg(short, long, conflicts_with = "clear_budget")]
        budget: Option<String>,
        /// Remove the monthly budget
        #[arg(long)]
        clear_budget: bool,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        /// Hide from pickers without deleting
        #[arg(long, conflicts_with = "unarchive")]
        archive: bool,
        #[arg(long)]
        unarchive: bool,
    },
    /// Delete a category
    Delete {
        /// Category name or ID
        category: String,
        /// Move its transactions and budget lines to this category first
        #[arg(long)]
        reassign_to: Option<String>,
    },
}

/// Handle a category command
pub fn handle_category_command(storage: &Storage, cmd: CategoryCommands) -> KesefResult<()> {
    let service = CategoryService::new(storage);
    let settings = storage.settings()?;

    match cmd {
        CategoryCommands::Add {
            name,
            kind,
            budget,
            color,
            icon,
        } => {
            let mut input = CreateCategoryInput::new(name, parse_kind(&kind)?);
            if let Some(budget) = budget {
                input.monthly_budget = Some(parse_money_arg("budget", &budget)?);
            }
            input.color = color;
            input.icon = icon;

            let category = service.create(input)?;
            println!("נוצרה קטגוריה: {} ({})", category.name, category.kind);
            if let Some(budget) = category.monthly_budget {
                println!(
                    "  תקציב חודשי: {}",
                    budget.format_with_symbol(&settings.currency_symbol)
                );
            }
            println!("  מזהה: {}", category.id.short());
        }

        CategoryCommands::List { kind, all } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let categories = service.list(kind, all)?;
            print!("{}", format_category_table(&categories, &settings));
        }

        CategoryCommands::Edit {
            category,
            name,
            budget,
            clear_budget,
            color,
            icon,
            archive,
            unarchive,
        } => {
            let found = service.require(&category)?;

            let mut input = UpdateCategoryInput {
                name,
                color,
                icon,
                ..Default::default()
            };
            if clear_budget {
                input.monthly_budget = Some(None);
            } else if let Some(budget) = budget {
                input.monthly_budget = Some(Some(parse_money_arg("budget", &budget)?));
            }
            if archive {
                input.archived = Some(true);
            } else if unarchive {
                input.archived = Some(false);
            }

            let updated = service.update(found.id, input)?;
            println!("עודכנה קטגוריה: {}", updated.name);
        }

        CategoryCommands::Delete {
            category,
            reassign_to,
        } => {
            let found = service.require(&category)?;
            let target = reassign_to
                .as_deref()
                .map(|name| service.require(name))
                .transpose()?;

            let usage = service.delete(found.id, target.as_ref().map(|c| c.id))?;
            println!("נמחקה קטגוריה: {}", found.name);
            if let Some(target) = target {
                if !usage.is_unused() {
                    println!(
                        "  {} תנועות ו-{} תקציבים הועברו אל '{}'",
                        usage.transactions, usage.budgets, target.name
                    );
                }
            }
        }
    }

    Ok(())
}

fn parse_kind(s: &str) -> KesefResult<CategoryKind> {
    CategoryKind::parse(s).ok_or_else(|| {
        KesefError::invalid("kind", format!("סוג קטגוריה לא מוכר: '{}' (expense, income)", s))
    })
}
