//! Category model
//!
//! A named spending or income bucket with an optional monthly budget figure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::CategoryId;
use super::money::Money;
use super::transaction::TransactionKind;

/// Whether a category collects income or expenses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    #[default]
    Expense,
}

impl CategoryKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "הכנסה",
            Self::Expense => "הוצאה",
        }
    }

    /// Whether transactions of `kind` may be filed under this category
    pub fn accepts(&self, kind: TransactionKind) -> bool {
        matches!(
            (self, kind),
            (Self::Income, TransactionKind::Income) | (Self::Expense, TransactionKind::Expense)
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "הכנסה" => Some(Self::Income),
            "expense" | "הוצאה" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A spending or income category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: CategoryKind,

    /// Planned amount per calendar month
    #[serde(default)]
    pub monthly_budget: Option<Money>,

    /// Display color (`#RRGGBB`)
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub icon: String,

    /// Seeded on first run
    #[serde(default)]
    pub is_default: bool,

    #[serde(default)]
    pub archived: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_color() -> String {
    "#607D8B".to_string()
}

impl Category {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            name: name.into(),
            kind,
            monthly_budget: None,
            color: default_color(),
            icon: String::new(),
            is_default: false,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a category with a monthly budget
    pub fn with_budget(name: impl Into<String>, kind: CategoryKind, monthly: Money) -> Self {
        let mut category = Self::new(name, kind);
        category.monthly_budget = Some(monthly);
        category
    }

    /// Key used for duplicate-name detection
    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Case- and whitespace-insensitive form of a display name
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
